//! Error types for the tipping client

use thiserror::Error;

use crate::provider::ProviderError;
use crate::tipping::SubmissionError;
use crate::validation::FieldErrors;

/// Result type alias using our custom Error
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for the tipping client
#[derive(Error, Debug)]
pub enum Error {
    // Session lifecycle errors
    #[error("Wallet SDK initialization failed: {0}")]
    Initialization(String),

    #[error("Wallet connection failed: {0}")]
    Connection(ProviderError),

    #[error("Sub-account creation failed: {0}")]
    SubAccountCreation(ProviderError),

    #[error("Tip submission failed: {0}")]
    Submission(#[from] SubmissionError),

    // Local input errors
    #[error("Validation failed: {0}")]
    Validation(FieldErrors),

    // Workflow guard errors
    #[error("Another wallet operation is already in progress")]
    Busy,

    #[error("No sub-account available; create one before sending tips")]
    NoSubAccount,

    #[error("Operation '{operation}' is not valid while {state}")]
    InvalidState {
        operation: &'static str,
        state: String,
    },

    #[error("Session closed before the wallet responded")]
    Abandoned,
}

impl Error {
    /// Check if the user can recover by retrying the action.
    ///
    /// A failed SDK initialization or a closed session is fatal; the
    /// process has to be restarted to get a fresh provider.
    pub fn is_recoverable(&self) -> bool {
        !matches!(self, Error::Initialization(_) | Error::Abandoned)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_initialization_is_fatal() {
        assert!(!Error::Initialization("bad endpoint".into()).is_recoverable());
        assert!(Error::Busy.is_recoverable());
        assert!(Error::Connection(ProviderError::user_rejected()).is_recoverable());
    }

    #[test]
    fn test_closed_session_is_not_recoverable() {
        assert!(!Error::Abandoned.is_recoverable());
        assert!(Error::NoSubAccount.is_recoverable());
        assert!(Error::Validation(FieldErrors::default()).is_recoverable());
    }
}
