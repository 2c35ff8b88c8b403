//! Wire types for the wallet provider calls

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::units::{self, Address, ChainId};

/// Delegated account derived from the universal account
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubAccount {
    pub address: Address,
    /// Smart account factory, when the wallet reports one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub factory: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub factory_data: Option<String>,
}

impl SubAccount {
    pub fn new(address: Address) -> Self {
        Self {
            address,
            factory: None,
            factory_data: None,
        }
    }
}

/// `wallet_getSubAccounts` result
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GetSubAccountsResponse {
    #[serde(default)]
    pub sub_accounts: Vec<SubAccount>,
}

/// How a new sub-account should be provisioned
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum SubAccountSpec {
    /// Let the wallet create a fresh smart account
    Create,
}

/// `wallet_addSubAccount` parameter
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CreateSubAccount {
    pub account: SubAccountSpec,
}

impl CreateSubAccount {
    pub fn create() -> Self {
        Self {
            account: SubAccountSpec::Create,
        }
    }
}

/// A single call inside a batch
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Call {
    pub to: Address,
    /// Hex quantity in smallest units
    pub value: String,
    /// Calldata, `0x` for a plain transfer
    pub data: String,
}

impl Call {
    /// Plain value transfer with empty calldata
    pub fn transfer(to: Address, value_wei: u128) -> Self {
        Self {
            to,
            value: units::to_hex_quantity(value_wei),
            data: "0x".to_string(),
        }
    }
}

/// `wallet_sendCalls` parameter (EIP-5792)
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SendCallsRequest {
    pub version: String,
    pub atomic_required: bool,
    pub chain_id: String,
    pub from: Address,
    pub calls: Vec<Call>,
    pub capabilities: serde_json::Map<String, serde_json::Value>,
}

impl SendCallsRequest {
    /// All-or-nothing batch on `chain` from `from`
    pub fn atomic(chain: ChainId, from: Address, calls: Vec<Call>) -> Self {
        Self {
            version: "2.0".to_string(),
            atomic_required: true,
            chain_id: chain.to_hex(),
            from,
            calls,
            capabilities: serde_json::Map::new(),
        }
    }
}

/// When the wallet should provision a sub-account
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SubAccountCreation {
    /// Create one automatically during connect
    OnConnect,
    /// Only on an explicit `wallet_addSubAccount`
    Manual,
}

/// Fixed application metadata handed to the SDK at initialization
#[derive(Debug, Clone)]
pub struct ProviderOptions {
    pub app_name: String,
    pub app_logo_url: String,
    pub app_chain_ids: Vec<ChainId>,
    pub sub_account_creation: SubAccountCreation,
    /// Wallet bridge JSON-RPC endpoint
    pub endpoint: String,
    pub timeout: Duration,
}

impl ProviderOptions {
    pub fn supports_chain(&self, chain: ChainId) -> bool {
        self.app_chain_ids.contains(&chain)
    }
}
