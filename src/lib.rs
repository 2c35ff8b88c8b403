//! EthTip Library
//!
//! Wallet session and tip submission for a sub-account based tipping app.

pub mod cli;
pub mod config;
pub mod error;
pub mod provider;
pub mod session;
pub mod shell;
pub mod tipping;
pub mod units;
pub mod validation;

// Re-export commonly used types
pub use config::Config;
pub use error::{Error, Result};
