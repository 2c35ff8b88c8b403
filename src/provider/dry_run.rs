//! Local wallet simulation
//!
//! Used by `--dry-run` and as the test double for the session workflow.
//! Nothing leaves the process: accounts are fixed, request ids are random,
//! and every submitted batch is recorded for inspection.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, Notify};
use tracing::{debug, info};
use uuid::Uuid;

use super::types::{CreateSubAccount, ProviderOptions, SendCallsRequest, SubAccount, SubAccountCreation};
use super::{ProviderError, ProviderResult, WalletProvider};
use crate::units::Address;

/// Provider operations that can be scripted to fail
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    RequestAccounts,
    GetSubAccounts,
    AddSubAccount,
    SendCalls,
}

struct Inner {
    universal: Address,
    next_sub_account: Address,
    creation: SubAccountCreation,
    latency: Duration,
    sub_account: Mutex<Option<SubAccount>>,
    failures: Mutex<HashMap<Operation, ProviderError>>,
    sent: Mutex<Vec<SendCallsRequest>>,
    connect_gate: Option<Arc<Notify>>,
    calls: [AtomicUsize; 4],
}

/// Simulated wallet. Clones share state.
#[derive(Clone)]
pub struct DryRunProvider {
    inner: Arc<Inner>,
}

/// Builder for [`DryRunProvider`]
pub struct DryRunBuilder {
    universal: Address,
    next_sub_account: Address,
    existing_sub_account: Option<SubAccount>,
    creation: SubAccountCreation,
    latency: Duration,
    failures: HashMap<Operation, ProviderError>,
    connect_gate: Option<Arc<Notify>>,
}

pub const DRY_RUN_UNIVERSAL: &str = "0x1000000000000000000000000000000000000001";
pub const DRY_RUN_SUB_ACCOUNT: &str = "0x5000000000000000000000000000000000000005";

fn fixed(address: &str) -> Address {
    address.parse().unwrap_or_else(|_| Address::zero())
}

impl Default for DryRunBuilder {
    fn default() -> Self {
        Self {
            universal: fixed(DRY_RUN_UNIVERSAL),
            next_sub_account: fixed(DRY_RUN_SUB_ACCOUNT),
            existing_sub_account: None,
            creation: SubAccountCreation::Manual,
            latency: Duration::ZERO,
            failures: HashMap::new(),
            connect_gate: None,
        }
    }
}

impl DryRunBuilder {
    /// Wallet already has a sub-account for this origin
    pub fn with_existing_sub_account(mut self) -> Self {
        self.existing_sub_account = Some(SubAccount::new(self.next_sub_account.clone()));
        self
    }

    pub fn creation(mut self, creation: SubAccountCreation) -> Self {
        self.creation = creation;
        self
    }

    pub fn latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    pub fn fail(mut self, operation: Operation, error: ProviderError) -> Self {
        self.failures.insert(operation, error);
        self
    }

    /// Hold `request_accounts` open until the gate is notified
    pub fn gate_connect(mut self, gate: Arc<Notify>) -> Self {
        self.connect_gate = Some(gate);
        self
    }

    pub fn build(self) -> DryRunProvider {
        DryRunProvider {
            inner: Arc::new(Inner {
                universal: self.universal,
                next_sub_account: self.next_sub_account,
                creation: self.creation,
                latency: self.latency,
                sub_account: Mutex::new(self.existing_sub_account),
                failures: Mutex::new(self.failures),
                sent: Mutex::new(Vec::new()),
                connect_gate: self.connect_gate,
                calls: Default::default(),
            }),
        }
    }
}

impl DryRunProvider {
    pub fn builder() -> DryRunBuilder {
        DryRunBuilder::default()
    }

    /// Simulated wallet honoring the configured sub-account policy
    pub fn from_options(options: &ProviderOptions) -> Self {
        info!("Using simulated wallet for {} (no funds move)", options.app_name);
        Self::builder()
            .creation(options.sub_account_creation)
            .latency(Duration::from_millis(250))
            .build()
    }

    /// Make `operation` fail until [`recover`](Self::recover) is called
    pub async fn fail(&self, operation: Operation, error: ProviderError) {
        self.inner.failures.lock().await.insert(operation, error);
    }

    pub async fn recover(&self, operation: Operation) {
        self.inner.failures.lock().await.remove(&operation);
    }

    /// Batches accepted so far
    pub async fn sent_calls(&self) -> Vec<SendCallsRequest> {
        self.inner.sent.lock().await.clone()
    }

    /// How many times `operation` was invoked
    pub fn call_count(&self, operation: Operation) -> usize {
        self.inner.calls[operation as usize].load(Ordering::SeqCst)
    }

    async fn enter(&self, operation: Operation) -> ProviderResult<()> {
        self.inner.calls[operation as usize].fetch_add(1, Ordering::SeqCst);
        if !self.inner.latency.is_zero() {
            tokio::time::sleep(self.inner.latency).await;
        }
        match self.inner.failures.lock().await.get(&operation) {
            Some(error) => Err(error.clone()),
            None => Ok(()),
        }
    }

    async fn provision_sub_account(&self) -> SubAccount {
        let mut slot = self.inner.sub_account.lock().await;
        slot.get_or_insert_with(|| SubAccount::new(self.inner.next_sub_account.clone()))
            .clone()
    }
}

#[async_trait]
impl WalletProvider for DryRunProvider {
    async fn request_accounts(&self) -> ProviderResult<Vec<Address>> {
        if let Some(gate) = &self.inner.connect_gate {
            gate.notified().await;
        }
        self.enter(Operation::RequestAccounts).await?;

        if self.inner.creation == SubAccountCreation::OnConnect {
            self.provision_sub_account().await;
        }
        Ok(vec![self.inner.universal.clone()])
    }

    async fn get_sub_accounts(
        &self,
        account: &Address,
        domain: &str,
    ) -> ProviderResult<Vec<SubAccount>> {
        self.enter(Operation::GetSubAccounts).await?;
        debug!("Simulated sub-account lookup for {} on {}", account, domain);

        if account != &self.inner.universal {
            return Ok(Vec::new());
        }
        Ok(self.inner.sub_account.lock().await.iter().cloned().collect())
    }

    async fn add_sub_account(&self, _request: CreateSubAccount) -> ProviderResult<SubAccount> {
        self.enter(Operation::AddSubAccount).await?;
        Ok(self.provision_sub_account().await)
    }

    async fn send_calls(&self, request: SendCallsRequest) -> ProviderResult<String> {
        self.enter(Operation::SendCalls).await?;

        let known = self.inner.sub_account.lock().await.clone();
        if known.map(|s| s.address) != Some(request.from.clone()) {
            return Err(ProviderError::new(
                Some(4100),
                format!("Account {} is not authorized", request.from),
            ));
        }

        let id = format!("0x{}", Uuid::new_v4().simple());
        self.inner.sent.lock().await.push(request);
        Ok(id)
    }
}
