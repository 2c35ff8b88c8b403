//! Session state machine
//!
//! ```text
//! Uninitialized ──► Ready ──► Connecting ──► Connected ──► SubAccountReady
//!       │             ▲            │              (create)
//!       ▼             └── failure ─┘
//!   InitFailed
//! ```

use serde::Serialize;
use std::fmt;

use super::status::StatusMessage;
use crate::provider::SubAccount;
use crate::tipping::TipResult;
use crate::units::Address;

/// Universal account plus the sub-account that signs tips.
///
/// Only obtainable from [`SessionState::SubAccountReady`], so a tip
/// cannot be built for a session without a sub-account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReadySession {
    universal: Address,
    sub_account: SubAccount,
}

impl ReadySession {
    pub(crate) fn new(universal: Address, sub_account: SubAccount) -> Self {
        Self {
            universal,
            sub_account,
        }
    }

    pub fn universal(&self) -> &Address {
        &self.universal
    }

    pub fn sub_account(&self) -> &SubAccount {
        &self.sub_account
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionState {
    /// Provider not built yet
    Uninitialized,
    /// Provider could not be built; the process must be restarted
    InitFailed { reason: String },
    /// Provider available. A universal address survives a failed connect.
    Ready { universal: Option<Address> },
    /// Account request outstanding
    Connecting,
    /// Wallet connected, no sub-account for this origin
    Connected { universal: Address },
    /// Sub-account present; tips can be sent
    SubAccountReady(ReadySession),
}

impl SessionState {
    pub fn universal_address(&self) -> Option<&Address> {
        match self {
            SessionState::Ready { universal } => universal.as_ref(),
            SessionState::Connected { universal } => Some(universal),
            SessionState::SubAccountReady(ready) => Some(ready.universal()),
            _ => None,
        }
    }

    pub fn sub_account(&self) -> Option<&SubAccount> {
        match self {
            SessionState::SubAccountReady(ready) => Some(ready.sub_account()),
            _ => None,
        }
    }

    pub fn is_connected(&self) -> bool {
        matches!(
            self,
            SessionState::Connected { .. } | SessionState::SubAccountReady(_)
        )
    }

    /// Flat view of the session entity
    pub fn session(&self) -> Session {
        Session {
            universal_address: self.universal_address().cloned(),
            sub_account: self.sub_account().cloned(),
            connected: self.is_connected(),
        }
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionState::Uninitialized => write!(f, "uninitialized"),
            SessionState::InitFailed { .. } => write!(f, "initialization failed"),
            SessionState::Ready { .. } => write!(f, "ready"),
            SessionState::Connecting => write!(f, "connecting"),
            SessionState::Connected { .. } => write!(f, "connected without sub-account"),
            SessionState::SubAccountReady(_) => write!(f, "connected with sub-account"),
        }
    }
}

/// Page-lifetime session data
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Session {
    pub universal_address: Option<Address>,
    pub sub_account: Option<SubAccount>,
    pub connected: bool,
}

/// Read-only copy of everything the presentation layer needs
#[derive(Debug, Clone)]
pub struct SessionSnapshot {
    pub state: SessionState,
    pub loading: bool,
    pub status: StatusMessage,
    pub last_tip: Option<TipResult>,
}
