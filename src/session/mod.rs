//! Wallet session manager
//!
//! Owns the single session of a process run: provider handle, state
//! machine, status line and the last submitted tip. Operations are user
//! triggered and strictly one at a time; a second call while one is in
//! flight is rejected with [`Error::Busy`] rather than queued.
//!
//! Closing the session cancels any outstanding wallet request. A response
//! arriving afterwards is dropped without touching state.

pub mod state;
pub mod status;

use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::{broadcast, RwLock};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

pub use state::{ReadySession, Session, SessionSnapshot, SessionState};
pub use status::{Notification, NotificationLevel, StatusMessage};

use crate::config::Config;
use crate::error::{Error, Result};
use crate::provider::{CreateSubAccount, ProviderError, ProviderFactory, WalletProvider};
use crate::tipping::{self, TipResult};
use crate::units::Address;
use crate::validation::ValidationRules;

const NOTIFICATION_CAPACITY: usize = 32;

struct Inner {
    provider: Option<Arc<dyn WalletProvider>>,
    state: SessionState,
    status: StatusMessage,
    last_tip: Option<TipResult>,
}

/// Releases the busy flag on every exit path
struct BusyGuard<'a>(&'a AtomicBool);

impl Drop for BusyGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

/// Owner of the wallet session
pub struct SessionManager {
    config: Config,
    rules: ValidationRules,
    inner: RwLock<Inner>,
    busy: AtomicBool,
    closed: CancellationToken,
    notifications: broadcast::Sender<Notification>,
}

impl SessionManager {
    pub fn new(config: Config) -> Self {
        let rules = config.validation_rules();
        let (notifications, _) = broadcast::channel(NOTIFICATION_CAPACITY);
        Self {
            config,
            rules,
            inner: RwLock::new(Inner {
                provider: None,
                state: SessionState::Uninitialized,
                status: StatusMessage::Initializing,
                last_tip: None,
            }),
            busy: AtomicBool::new(false),
            closed: CancellationToken::new(),
            notifications,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn rules(&self) -> &ValidationRules {
        &self.rules
    }

    /// Receive transient notifications raised from now on
    pub fn subscribe(&self) -> broadcast::Receiver<Notification> {
        self.notifications.subscribe()
    }

    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::SeqCst)
    }

    pub async fn snapshot(&self) -> SessionSnapshot {
        let inner = self.inner.read().await;
        SessionSnapshot {
            state: inner.state.clone(),
            loading: self.is_busy(),
            status: inner.status.clone(),
            last_tip: inner.last_tip.clone(),
        }
    }

    /// Abandon the session. Outstanding wallet requests are dropped and
    /// later operations fail with [`Error::Abandoned`].
    pub fn close(&self) {
        if !self.closed.is_cancelled() {
            info!("Closing wallet session");
            self.closed.cancel();
        }
    }

    /// Build the wallet provider from the fixed app metadata
    pub async fn initialize(&self, factory: &dyn ProviderFactory) -> Result<()> {
        let _busy = self.claim()?;
        self.expect_state("initialize", |s| matches!(s, SessionState::Uninitialized))
            .await?;

        let options = self.config.provider_options();
        match factory.create(&options) {
            Ok(provider) => {
                let mut inner = self.inner.write().await;
                inner.provider = Some(Arc::from(provider));
                inner.state = SessionState::Ready { universal: None };
                inner.status = StatusMessage::ReadyToConnect;
                info!(
                    "Wallet SDK initialized for {} on chain {}",
                    options.app_name, self.config.chain.id
                );
                Ok(())
            }
            Err(e) => {
                error!("SDK initialization failed: {}", e);
                {
                    let mut inner = self.inner.write().await;
                    inner.state = SessionState::InitFailed {
                        reason: e.message.clone(),
                    };
                    inner.status = StatusMessage::InitFailed;
                }
                self.notify(Notification::error(
                    "Error",
                    "Could not initialize wallet SDK. Please restart the app.",
                ));
                Err(Error::Initialization(e.message))
            }
        }
    }

    /// Request wallet accounts, then look for an existing sub-account
    pub async fn connect(&self) -> Result<Session> {
        let _busy = self.claim()?;
        let provider = self.provider().await?;

        let retained = {
            let mut inner = self.inner.write().await;
            let retained = match &inner.state {
                SessionState::Ready { universal } => universal.clone(),
                other => {
                    return Err(Error::InvalidState {
                        operation: "connect",
                        state: other.to_string(),
                    })
                }
            };
            inner.state = SessionState::Connecting;
            inner.status = StatusMessage::Connecting;
            inner.last_tip = None;
            retained
        };
        info!("Connecting wallet...");

        let accounts = match self.until_closed(provider.request_accounts()).await? {
            Ok(accounts) => accounts,
            Err(e) => return Err(self.connect_failed(retained, e).await),
        };
        let Some(universal) = accounts.into_iter().next() else {
            let e = ProviderError::transport("Wallet returned no accounts");
            return Err(self.connect_failed(retained, e).await);
        };

        {
            let mut inner = self.inner.write().await;
            inner.state = SessionState::Connected {
                universal: universal.clone(),
            };
            inner.status = StatusMessage::CheckingSubAccount;
        }
        info!("Connected universal account {}", universal);

        let lookup = provider.get_sub_accounts(&universal, &self.config.app.origin);
        let existing = match self.until_closed(lookup).await? {
            Ok(subs) => subs.into_iter().next(),
            Err(e) => return Err(self.connect_failed(Some(universal), e).await),
        };

        let mut inner = self.inner.write().await;
        match existing {
            Some(sub_account) => {
                info!("Found sub-account {}", sub_account.address);
                inner.state =
                    SessionState::SubAccountReady(ReadySession::new(universal, sub_account));
                inner.status = StatusMessage::SubAccountFound;
            }
            None => {
                info!("No sub-account for {}", self.config.app.origin);
                inner.status = StatusMessage::NeedsSubAccount;
            }
        }
        Ok(inner.state.session())
    }

    /// Ask the wallet to provision a sub-account
    pub async fn create_sub_account(&self) -> Result<Session> {
        let _busy = self.claim()?;
        let provider = self.provider().await?;

        let universal = {
            let mut inner = self.inner.write().await;
            let universal = match &inner.state {
                SessionState::Connected { universal } => universal.clone(),
                other => {
                    return Err(Error::InvalidState {
                        operation: "create sub-account",
                        state: other.to_string(),
                    })
                }
            };
            inner.status = StatusMessage::CreatingSubAccount;
            inner.last_tip = None;
            universal
        };
        info!("Creating sub-account for {}", universal);

        let created = self
            .until_closed(provider.add_sub_account(CreateSubAccount::create()))
            .await?;

        let mut inner = self.inner.write().await;
        match created {
            Ok(sub_account) => {
                info!("Sub-account created: {}", sub_account.address);
                inner.state =
                    SessionState::SubAccountReady(ReadySession::new(universal, sub_account));
                inner.status = StatusMessage::SubAccountCreated;
                Ok(inner.state.session())
            }
            Err(e) => {
                warn!("Sub-account creation failed: {}", e);
                inner.status = StatusMessage::SubAccountCreationFailed {
                    reason: e.message.clone(),
                };
                drop(inner);
                let description = if e.is_user_rejection() {
                    "User rejected the sub-account creation.".to_string()
                } else {
                    e.message.clone()
                };
                self.notify(Notification::error("Creation Failed", description));
                Err(Error::SubAccountCreation(e))
            }
        }
    }

    /// Validate the form input and send one tip from the sub-account
    pub async fn send_tip(&self, recipient: &str, amount: &str) -> Result<TipResult> {
        let _busy = self.claim()?;

        let request = self.rules.validate(recipient, amount).map_err(|errors| {
            debug!("Tip form rejected: {}", errors);
            Error::Validation(errors)
        })?;

        let provider = self.provider().await?;
        let ready = {
            let mut inner = self.inner.write().await;
            let ready = match &inner.state {
                SessionState::SubAccountReady(ready) => ready.clone(),
                other => {
                    warn!("Refusing to send a tip while {}", other);
                    return Err(Error::NoSubAccount);
                }
            };
            inner.status = StatusMessage::Sending;
            inner.last_tip = None;
            ready
        };
        info!(
            "Sending {} {} to {}",
            request.amount, self.config.chain.native_symbol, request.recipient
        );

        let submitted = self
            .until_closed(tipping::submit(
                provider.as_ref(),
                &ready,
                &request,
                &self.config.chain,
            ))
            .await?;

        let mut inner = self.inner.write().await;
        match submitted {
            Ok(result) => {
                inner.status = StatusMessage::TipSent {
                    request_id: result.request_id.clone(),
                };
                inner.last_tip = Some(result.clone());
                drop(inner);
                self.notify(Notification::success(
                    "Transaction Sent!",
                    format!(
                        "View on {}: {}",
                        self.config.chain.explorer_name,
                        result.explorer_url(&self.config.chain)
                    ),
                ));
                Ok(result)
            }
            Err(e) => {
                inner.status = StatusMessage::TipFailed {
                    reason: e.to_string(),
                };
                drop(inner);
                self.notify(Notification::error("Transaction Failed", e.to_string()));
                Err(Error::Submission(e))
            }
        }
    }

    fn claim(&self) -> Result<BusyGuard<'_>> {
        if self.closed.is_cancelled() {
            return Err(Error::Abandoned);
        }
        self.busy
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .map_err(|_| {
                debug!("Rejected wallet operation: another one is in flight");
                Error::Busy
            })?;
        Ok(BusyGuard(&self.busy))
    }

    async fn provider(&self) -> Result<Arc<dyn WalletProvider>> {
        let inner = self.inner.read().await;
        match &inner.provider {
            Some(provider) => Ok(Arc::clone(provider)),
            None => Err(Error::InvalidState {
                operation: "wallet request",
                state: inner.state.to_string(),
            }),
        }
    }

    async fn expect_state(
        &self,
        operation: &'static str,
        allowed: impl Fn(&SessionState) -> bool,
    ) -> Result<()> {
        let inner = self.inner.read().await;
        if allowed(&inner.state) {
            Ok(())
        } else {
            Err(Error::InvalidState {
                operation,
                state: inner.state.to_string(),
            })
        }
    }

    /// Race a wallet call against session close
    async fn until_closed<T, F>(&self, call: F) -> Result<T>
    where
        F: Future<Output = T>,
    {
        tokio::select! {
            biased;
            _ = self.closed.cancelled() => {
                debug!("Discarding wallet response: session closed");
                Err(Error::Abandoned)
            }
            result = call => Ok(result),
        }
    }

    async fn connect_failed(&self, universal: Option<Address>, e: ProviderError) -> Error {
        warn!("Connection failed: {}", e);
        {
            let mut inner = self.inner.write().await;
            inner.state = SessionState::Ready { universal };
            inner.status = StatusMessage::ConnectionFailed {
                reason: e.message.clone(),
            };
        }
        let description = if e.is_user_rejection() {
            "User rejected the connection request.".to_string()
        } else {
            e.message.clone()
        };
        self.notify(Notification::error("Connection Failed", description));
        Error::Connection(e)
    }

    fn notify(&self, notification: Notification) {
        // No subscriber is fine; the failure is already logged
        let _ = self.notifications.send(notification);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::dry_run::{DryRunProvider, Operation, DRY_RUN_SUB_ACCOUNT};
    use crate::provider::{ProviderOptions, ProviderResult};
    use tokio::sync::Notify;
    use tokio_test::{assert_err, assert_ok};

    const RECIPIENT: &str = "0xabc0000000000000000000000000000000000abc";

    fn factory(provider: &DryRunProvider) -> impl ProviderFactory {
        let provider = provider.clone();
        move |_: &ProviderOptions| -> ProviderResult<Box<dyn WalletProvider>> {
            Ok(Box::new(provider.clone()))
        }
    }

    async fn ready_manager(provider: &DryRunProvider) -> SessionManager {
        let manager = SessionManager::new(Config::default());
        assert_ok!(manager.initialize(&factory(provider)).await);
        manager
    }

    #[tokio::test]
    async fn test_initialize_reaches_ready() {
        let manager = SessionManager::new(Config::default());
        assert_eq!(manager.snapshot().await.status, StatusMessage::Initializing);

        let provider = DryRunProvider::builder().build();
        assert_ok!(manager.initialize(&factory(&provider)).await);

        let snapshot = manager.snapshot().await;
        assert_eq!(snapshot.state, SessionState::Ready { universal: None });
        assert_eq!(snapshot.status, StatusMessage::ReadyToConnect);
        assert!(!snapshot.loading);

        // Only once per session
        let err = manager.initialize(&factory(&provider)).await.unwrap_err();
        assert!(matches!(err, Error::InvalidState { .. }));
    }

    #[tokio::test]
    async fn test_initialize_failure_is_terminal() {
        let manager = SessionManager::new(Config::default());
        let mut notifications = manager.subscribe();
        let broken = |_: &ProviderOptions| -> ProviderResult<Box<dyn WalletProvider>> {
            Err(ProviderError::transport("no wallet bridge"))
        };

        let err = manager.initialize(&broken).await.unwrap_err();
        assert!(!err.is_recoverable());

        let snapshot = manager.snapshot().await;
        assert!(matches!(snapshot.state, SessionState::InitFailed { .. }));
        assert_eq!(snapshot.status, StatusMessage::InitFailed);
        assert_eq!(notifications.try_recv().unwrap().title, "Error");

        assert_err!(manager.connect().await);
    }

    #[tokio::test]
    async fn test_connect_without_sub_account() {
        let provider = DryRunProvider::builder().build();
        let manager = ready_manager(&provider).await;

        let session = manager.connect().await.unwrap();
        assert!(session.connected);
        assert!(session.sub_account.is_none());

        let snapshot = manager.snapshot().await;
        assert!(matches!(snapshot.state, SessionState::Connected { .. }));
        assert_eq!(snapshot.status, StatusMessage::NeedsSubAccount);
        assert_eq!(provider.call_count(Operation::GetSubAccounts), 1);
    }

    #[tokio::test]
    async fn test_connect_rejected_returns_to_ready() {
        let provider = DryRunProvider::builder()
            .fail(Operation::RequestAccounts, ProviderError::user_rejected())
            .build();
        let manager = ready_manager(&provider).await;
        let mut notifications = manager.subscribe();

        let err = manager.connect().await.unwrap_err();
        assert!(matches!(err, Error::Connection(ref e) if e.is_user_rejection()));

        let snapshot = manager.snapshot().await;
        assert_eq!(snapshot.state, SessionState::Ready { universal: None });
        assert!(!snapshot.loading);
        assert!(snapshot.status.is_failure());

        let toast = notifications.try_recv().unwrap();
        assert_eq!(toast.title, "Connection Failed");
        assert_eq!(toast.description, "User rejected the connection request.");

        // Retry is allowed
        provider.recover(Operation::RequestAccounts).await;
        assert_ok!(manager.connect().await);
    }

    #[tokio::test]
    async fn test_failed_lookup_keeps_universal_address() {
        let provider = DryRunProvider::builder()
            .fail(Operation::GetSubAccounts, ProviderError::new(Some(-32603), "lookup failed"))
            .build();
        let manager = ready_manager(&provider).await;

        assert_err!(manager.connect().await);
        let snapshot = manager.snapshot().await;
        match snapshot.state {
            SessionState::Ready { universal: Some(addr) } => {
                assert_eq!(addr.as_str(), crate::provider::dry_run::DRY_RUN_UNIVERSAL)
            }
            other => panic!("unexpected state {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_create_sub_account() {
        let provider = DryRunProvider::builder()
            .fail(Operation::AddSubAccount, ProviderError::user_rejected())
            .build();
        let manager = ready_manager(&provider).await;
        manager.connect().await.unwrap();

        // Failure leaves state unchanged
        let err = manager.create_sub_account().await.unwrap_err();
        assert!(matches!(err, Error::SubAccountCreation(_)));
        let snapshot = manager.snapshot().await;
        assert!(matches!(snapshot.state, SessionState::Connected { .. }));
        assert!(snapshot.status.is_failure());

        provider.recover(Operation::AddSubAccount).await;
        let session = manager.create_sub_account().await.unwrap();
        assert_eq!(
            session.sub_account.unwrap().address.as_str(),
            DRY_RUN_SUB_ACCOUNT
        );
        assert_eq!(manager.snapshot().await.status, StatusMessage::SubAccountCreated);

        // Not valid once a sub-account exists
        let err = manager.create_sub_account().await.unwrap_err();
        assert!(matches!(err, Error::InvalidState { .. }));
    }

    #[tokio::test]
    async fn test_happy_path_with_existing_sub_account() {
        let provider = DryRunProvider::builder().with_existing_sub_account().build();
        let manager = ready_manager(&provider).await;

        let session = manager.connect().await.unwrap();
        assert!(session.sub_account.is_some());
        assert_eq!(manager.snapshot().await.status, StatusMessage::SubAccountFound);

        let result = manager.send_tip(RECIPIENT, "0.01").await.unwrap();
        assert_eq!(result.value_wei, 10_000_000_000_000_000);
        assert!(result
            .explorer_url(&manager.config().chain)
            .ends_with(&format!("/tx/{}", result.request_id)));

        let snapshot = manager.snapshot().await;
        assert_eq!(
            snapshot.status,
            StatusMessage::TipSent {
                request_id: result.request_id.clone()
            }
        );
        assert_eq!(snapshot.last_tip, Some(result));
        assert!(!snapshot.loading);
    }

    #[tokio::test]
    async fn test_no_submission_without_sub_account() {
        let provider = DryRunProvider::builder().build();
        let manager = ready_manager(&provider).await;
        manager.connect().await.unwrap();

        let err = manager.send_tip(RECIPIENT, "0.01").await.unwrap_err();
        assert!(matches!(err, Error::NoSubAccount));
        assert_eq!(provider.call_count(Operation::SendCalls), 0);
    }

    #[tokio::test]
    async fn test_invalid_form_never_reaches_wallet() {
        let provider = DryRunProvider::builder().with_existing_sub_account().build();
        let manager = ready_manager(&provider).await;
        manager.connect().await.unwrap();

        let err = manager.send_tip("0xZZZ", "0").await.unwrap_err();
        match err {
            Error::Validation(fields) => {
                assert!(fields.recipient.is_some());
                assert!(fields.amount.is_some());
            }
            other => panic!("unexpected error {:?}", other),
        }
        assert_eq!(provider.call_count(Operation::SendCalls), 0);
        assert_eq!(manager.snapshot().await.status, StatusMessage::SubAccountFound);
    }

    #[tokio::test]
    async fn test_failed_tip_keeps_session() {
        let provider = DryRunProvider::builder().with_existing_sub_account().build();
        let manager = ready_manager(&provider).await;
        manager.connect().await.unwrap();
        let mut notifications = manager.subscribe();

        provider
            .fail(Operation::SendCalls, ProviderError::new(Some(-32000), "insufficient funds"))
            .await;
        let err = manager.send_tip(RECIPIENT, "0.01").await.unwrap_err();
        assert!(matches!(err, Error::Submission(_)));

        let snapshot = manager.snapshot().await;
        assert!(matches!(snapshot.state, SessionState::SubAccountReady(_)));
        assert_eq!(
            snapshot.status,
            StatusMessage::TipFailed {
                reason: "insufficient funds".to_string()
            }
        );
        assert!(snapshot.last_tip.is_none());
        assert_eq!(notifications.try_recv().unwrap().description, "insufficient funds");
        assert_eq!(provider.call_count(Operation::SendCalls), 1);
    }

    #[tokio::test]
    async fn test_reentrant_connect_rejected() {
        let gate = Arc::new(Notify::new());
        let provider = DryRunProvider::builder().gate_connect(gate.clone()).build();
        let manager = Arc::new(ready_manager(&provider).await);

        let first = tokio::spawn({
            let manager = manager.clone();
            async move { manager.connect().await }
        });
        while !manager.is_busy() {
            tokio::task::yield_now().await;
        }
        assert!(manager.snapshot().await.loading);

        let err = manager.connect().await.unwrap_err();
        assert!(matches!(err, Error::Busy));
        assert!(matches!(
            manager.send_tip(RECIPIENT, "0.01").await,
            Err(Error::Busy)
        ));

        gate.notify_one();
        assert_ok!(first.await.unwrap());
        assert_eq!(provider.call_count(Operation::RequestAccounts), 1);
        assert!(!manager.is_busy());
    }

    #[tokio::test]
    async fn test_close_discards_late_response() {
        let gate = Arc::new(Notify::new());
        let provider = DryRunProvider::builder()
            .with_existing_sub_account()
            .gate_connect(gate.clone())
            .build();
        let manager = Arc::new(ready_manager(&provider).await);
        let mut notifications = manager.subscribe();

        let pending = tokio::spawn({
            let manager = manager.clone();
            async move { manager.connect().await }
        });
        while !manager.is_busy() {
            tokio::task::yield_now().await;
        }

        manager.close();
        gate.notify_one();
        assert!(matches!(pending.await.unwrap(), Err(Error::Abandoned)));

        let snapshot = manager.snapshot().await;
        assert!(snapshot.state.sub_account().is_none());
        assert!(!snapshot.loading);
        assert!(notifications.try_recv().is_err());
        assert!(matches!(manager.connect().await, Err(Error::Abandoned)));
    }
}
