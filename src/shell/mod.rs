//! Presentation shell
//!
//! Reads session snapshots and renders them; never drives the session
//! itself beyond what the CLI layer asks of it.

pub mod form;
pub mod view;

pub use form::TipForm;
pub use view::{render, ExplorerLink, PrimaryAction, StatusIcon, View};
