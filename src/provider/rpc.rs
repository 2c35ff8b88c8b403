//! JSON-RPC wallet bridge client
//!
//! Forwards the EIP-1193 wallet methods to a bridge endpoint that fronts
//! the user's wallet (the wallet owns keys and shows approval prompts):
//! - `eth_requestAccounts`
//! - `wallet_getSubAccounts`
//! - `wallet_addSubAccount`
//! - `wallet_sendCalls` (EIP-5792)

use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::debug;

use super::types::{
    CreateSubAccount, GetSubAccountsResponse, ProviderOptions, SendCallsRequest, SubAccount,
};
use super::{ProviderError, ProviderResult, WalletProvider};
use crate::units::{Address, ChainId};

#[derive(Debug, Deserialize)]
struct RpcResponse {
    #[serde(default)]
    result: Option<Value>,
    #[serde(default)]
    error: Option<RpcError>,
}

#[derive(Debug, Deserialize)]
struct RpcError {
    code: i64,
    message: String,
}

/// Wallet provider backed by a JSON-RPC bridge
pub struct JsonRpcProvider {
    client: Client,
    endpoint: String,
    options: ProviderOptions,
    next_id: AtomicU64,
}

impl JsonRpcProvider {
    /// Build the client. Validates the endpoint but does not contact it.
    pub fn new(options: &ProviderOptions) -> ProviderResult<Self> {
        let endpoint = url::Url::parse(&options.endpoint).map_err(|e| {
            ProviderError::transport(format!("Invalid provider endpoint {}: {}", options.endpoint, e))
        })?;
        if !matches!(endpoint.scheme(), "http" | "https") {
            return Err(ProviderError::transport(format!(
                "Unsupported provider endpoint scheme: {}",
                endpoint.scheme()
            )));
        }

        let client = Client::builder()
            .timeout(options.timeout)
            .user_agent(format!("{}/{}", options.app_name, env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| ProviderError::transport(format!("Failed to create HTTP client: {}", e)))?;

        debug!(
            "Wallet bridge client ready for {} (chains {:?})",
            endpoint, options.app_chain_ids
        );

        Ok(Self {
            client,
            endpoint: endpoint.to_string(),
            options: options.clone(),
            next_id: AtomicU64::new(1),
        })
    }

    async fn call<T: DeserializeOwned>(&self, method: &str, params: Value) -> ProviderResult<T> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let payload = json!({
            "jsonrpc": "2.0",
            "id": id,
            "method": method,
            "params": params,
        });

        debug!("-> {} #{}: {}", method, id, params);

        let response = self
            .client
            .post(&self.endpoint)
            .json(&payload)
            .send()
            .await
            .map_err(|e| ProviderError::transport(format!("{} request failed: {}", method, e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(ProviderError::transport(format!(
                "{} returned HTTP {}: {}",
                method, status, body
            )));
        }

        let rpc_response: RpcResponse = response.json().await.map_err(|e| {
            ProviderError::transport(format!("Failed to parse {} response: {}", method, e))
        })?;

        if let Some(error) = rpc_response.error {
            return Err(ProviderError::new(Some(error.code), error.message));
        }

        let result = rpc_response
            .result
            .ok_or_else(|| ProviderError::transport(format!("No result in {} response", method)))?;

        debug!("<- {} #{}: {}", method, id, result);

        serde_json::from_value(result).map_err(|e| {
            ProviderError::transport(format!("Unexpected {} result: {}", method, e))
        })
    }

    fn check_chain(&self, chain_id: &str) -> ProviderResult<()> {
        let supported = chain_id
            .strip_prefix("0x")
            .and_then(|hex| u64::from_str_radix(hex, 16).ok())
            .is_some_and(|id| self.options.supports_chain(ChainId(id)));
        if supported {
            Ok(())
        } else {
            Err(ProviderError::transport(format!(
                "Chain {} is not configured for {}",
                chain_id, self.options.app_name
            )))
        }
    }
}

/// `wallet_sendCalls` returns a bare id (early drafts) or `{ "id": ... }`
fn parse_calls_id(result: Value) -> ProviderResult<String> {
    match result {
        Value::String(id) => Ok(id),
        Value::Object(mut map) => match map.remove("id") {
            Some(Value::String(id)) => Ok(id),
            _ => Err(ProviderError::transport("wallet_sendCalls result has no id")),
        },
        other => Err(ProviderError::transport(format!(
            "Unexpected wallet_sendCalls result: {}",
            other
        ))),
    }
}

#[async_trait]
impl WalletProvider for JsonRpcProvider {
    async fn request_accounts(&self) -> ProviderResult<Vec<Address>> {
        self.call("eth_requestAccounts", json!([])).await
    }

    async fn get_sub_accounts(
        &self,
        account: &Address,
        domain: &str,
    ) -> ProviderResult<Vec<SubAccount>> {
        let response: GetSubAccountsResponse = self
            .call(
                "wallet_getSubAccounts",
                json!([{ "account": account, "domain": domain }]),
            )
            .await?;
        Ok(response.sub_accounts)
    }

    async fn add_sub_account(&self, request: CreateSubAccount) -> ProviderResult<SubAccount> {
        self.call("wallet_addSubAccount", json!([request])).await
    }

    async fn send_calls(&self, request: SendCallsRequest) -> ProviderResult<String> {
        self.check_chain(&request.chain_id)?;
        let result: Value = self.call("wallet_sendCalls", json!([request])).await?;
        parse_calls_id(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::provider::types::Call;
    use std::time::Duration;

    fn options(endpoint: &str) -> ProviderOptions {
        ProviderOptions {
            endpoint: endpoint.to_string(),
            timeout: Duration::from_secs(2),
            ..Config::default().provider_options()
        }
    }

    #[test]
    fn test_rejects_bad_endpoint() {
        assert!(JsonRpcProvider::new(&options("not a url")).is_err());
        assert!(JsonRpcProvider::new(&options("ftp://wallet.local")).is_err());
        assert!(JsonRpcProvider::new(&options("http://127.0.0.1:8545")).is_ok());
    }

    #[test]
    fn test_parse_calls_id() {
        assert_eq!(parse_calls_id(json!("0xabc")).unwrap(), "0xabc");
        assert_eq!(parse_calls_id(json!({ "id": "0xdef" })).unwrap(), "0xdef");
        assert!(parse_calls_id(json!({ "capabilities": {} })).is_err());
        assert!(parse_calls_id(json!(42)).is_err());
    }

    #[tokio::test]
    async fn test_unsupported_chain_rejected_locally() {
        let provider = JsonRpcProvider::new(&options("http://127.0.0.1:1")).unwrap();
        let request = SendCallsRequest::atomic(
            ChainId(1),
            Address::zero(),
            vec![Call::transfer(Address::zero(), 1)],
        );
        let err = provider.send_calls(request).await.unwrap_err();
        assert!(err.message.contains("0x1"));
        assert!(err.code.is_none());
    }

    #[tokio::test]
    async fn test_unreachable_bridge_is_transport_error() {
        let provider = JsonRpcProvider::new(&options("http://127.0.0.1:1")).unwrap();
        let err = provider.request_accounts().await.unwrap_err();
        assert!(err.code.is_none());
        assert!(err.message.contains("eth_requestAccounts"));
    }
}
