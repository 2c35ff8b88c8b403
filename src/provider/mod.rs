//! Wallet provider capability
//!
//! The wallet SDK is an external collaborator with hidden state. Everything
//! the session needs from it fits in four calls:
//!
//! ```text
//! request_accounts → get_sub_accounts → add_sub_account → send_calls
//! ```
//!
//! [`JsonRpcProvider`] speaks these as EIP-1193 JSON-RPC to a wallet bridge.
//! [`DryRunProvider`] simulates a wallet locally.

pub mod dry_run;
pub mod rpc;
pub mod types;

use async_trait::async_trait;
use std::fmt;

pub use dry_run::DryRunProvider;
pub use rpc::JsonRpcProvider;
pub use types::{
    Call, CreateSubAccount, ProviderOptions, SendCallsRequest, SubAccount, SubAccountCreation,
};

use crate::units::Address;

/// EIP-1193 error code for a request the user declined
pub const USER_REJECTED_CODE: i64 = 4001;

/// Failure reported by the wallet provider.
///
/// The message is kept verbatim so it can be shown to the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderError {
    pub code: Option<i64>,
    pub message: String,
}

impl ProviderError {
    pub fn new(code: Option<i64>, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    /// Transport-level failure with no provider code
    pub fn transport(message: impl Into<String>) -> Self {
        Self::new(None, message)
    }

    pub fn user_rejected() -> Self {
        Self::new(Some(USER_REJECTED_CODE), "User rejected the request.")
    }

    pub fn is_user_rejection(&self) -> bool {
        self.code == Some(USER_REJECTED_CODE)
    }
}

impl fmt::Display for ProviderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

impl std::error::Error for ProviderError {}

pub type ProviderResult<T> = std::result::Result<T, ProviderError>;

/// The four wallet calls the tipping workflow depends on
#[async_trait]
pub trait WalletProvider: Send + Sync {
    /// Ask the wallet for its accounts; index 0 is the universal account
    async fn request_accounts(&self) -> ProviderResult<Vec<Address>>;

    /// Existing sub-accounts of `account` scoped to `domain`
    async fn get_sub_accounts(&self, account: &Address, domain: &str)
        -> ProviderResult<Vec<SubAccount>>;

    /// Create a new sub-account
    async fn add_sub_account(&self, request: CreateSubAccount) -> ProviderResult<SubAccount>;

    /// Submit a call batch; returns the provider's request identifier
    async fn send_calls(&self, request: SendCallsRequest) -> ProviderResult<String>;
}

/// Builds a provider from fixed application metadata.
///
/// Construction is local only; no network call is made.
pub trait ProviderFactory {
    fn create(&self, options: &ProviderOptions) -> ProviderResult<Box<dyn WalletProvider>>;
}

impl<F> ProviderFactory for F
where
    F: Fn(&ProviderOptions) -> ProviderResult<Box<dyn WalletProvider>>,
{
    fn create(&self, options: &ProviderOptions) -> ProviderResult<Box<dyn WalletProvider>> {
        self(options)
    }
}

/// Factory for the production JSON-RPC bridge
pub struct JsonRpcFactory;

impl ProviderFactory for JsonRpcFactory {
    fn create(&self, options: &ProviderOptions) -> ProviderResult<Box<dyn WalletProvider>> {
        Ok(Box::new(JsonRpcProvider::new(options)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_rejection() {
        assert!(ProviderError::user_rejected().is_user_rejection());
        assert!(!ProviderError::transport("connection refused").is_user_rejection());
        assert_eq!(
            ProviderError::new(Some(-32000), "insufficient funds").to_string(),
            "insufficient funds"
        );
    }

    #[test]
    fn test_closure_factory() {
        let factory = |_: &ProviderOptions| -> ProviderResult<Box<dyn WalletProvider>> {
            Err(ProviderError::transport("no wallet"))
        };
        let result = factory.create(&crate::config::Config::default().provider_options());
        assert!(result.is_err());
    }
}
