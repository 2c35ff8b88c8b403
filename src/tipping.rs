//! Tip submission
//!
//! One tip is one atomic call batch holding a single plain transfer,
//! sent from the sub-account so the wallet does not prompt per tip.

use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::config::ChainConfig;
use crate::provider::{Call, ProviderError, SendCallsRequest, WalletProvider};
use crate::session::ReadySession;
use crate::units::{self, Address, UnitsError};
use crate::validation::TipRequest;

/// Fallback shown when the provider gives no message
pub const DEFAULT_FAILURE_MESSAGE: &str = "The tip could not be sent. Please try again.";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SubmissionError {
    #[error("amount cannot be sent: {0}")]
    Amount(#[from] UnitsError),

    /// Provider message, verbatim
    #[error("{}", display_message(.0))]
    Provider(ProviderError),
}

fn display_message(error: &ProviderError) -> &str {
    if error.message.trim().is_empty() {
        DEFAULT_FAILURE_MESSAGE
    } else {
        &error.message
    }
}

/// A submitted tip
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TipResult {
    /// Provider-assigned call batch identifier
    pub request_id: String,
    pub from: Address,
    pub recipient: Address,
    /// Native-unit amount as entered
    pub amount: String,
    pub value_wei: u128,
    pub submitted_at: DateTime<Utc>,
}

impl TipResult {
    pub fn explorer_url(&self, chain: &ChainConfig) -> String {
        chain.tx_url(&self.request_id)
    }
}

/// Build the single-call batch for a tip
pub fn build_batch(
    ready: &ReadySession,
    request: &TipRequest,
    chain: &ChainConfig,
) -> Result<(SendCallsRequest, u128), SubmissionError> {
    let value_wei = units::parse_units(&request.amount, chain.decimals)?;
    let call = Call::transfer(request.recipient.clone(), value_wei);
    let batch = SendCallsRequest::atomic(
        chain.chain_id(),
        ready.sub_account().address.clone(),
        vec![call],
    );
    Ok((batch, value_wei))
}

/// Send one tip through the sub-account. Never retries.
pub async fn submit(
    provider: &dyn WalletProvider,
    ready: &ReadySession,
    request: &TipRequest,
    chain: &ChainConfig,
) -> Result<TipResult, SubmissionError> {
    let (batch, value_wei) = build_batch(ready, request, chain)?;
    let from = batch.from.clone();

    debug!(
        "Submitting {} wei to {} from {} on chain {}",
        value_wei, request.recipient, from, batch.chain_id
    );

    let request_id = provider.send_calls(batch).await.map_err(|e| {
        warn!("wallet_sendCalls failed: {}", e);
        SubmissionError::Provider(e)
    })?;

    info!(
        "Tip of {} {} to {} submitted (request {})",
        request.amount, chain.native_symbol, request.recipient, request_id
    );

    Ok(TipResult {
        request_id,
        from,
        recipient: request.recipient.clone(),
        amount: request.amount.clone(),
        value_wei,
        submitted_at: Utc::now(),
    })
}
