//! Session snapshot → terminal view

use std::fmt;

use crate::config::Config;
use crate::session::{SessionSnapshot, SessionState};

/// The one action offered for the current state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrimaryAction {
    /// Provider could not be built; nothing to offer
    Unavailable,
    Connect { enabled: bool },
    CreateSubAccount { enabled: bool },
    TipForm { enabled: bool },
}

impl PrimaryAction {
    pub fn is_enabled(&self) -> bool {
        match self {
            PrimaryAction::Unavailable => false,
            PrimaryAction::Connect { enabled }
            | PrimaryAction::CreateSubAccount { enabled }
            | PrimaryAction::TipForm { enabled } => *enabled,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            PrimaryAction::Unavailable => "Unavailable",
            PrimaryAction::Connect { .. } => "Connect Wallet",
            PrimaryAction::CreateSubAccount { .. } => "Create Sub-Account",
            PrimaryAction::TipForm { .. } => "Send Tip",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusIcon {
    Busy,
    Failed,
    Success,
    Info,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExplorerLink {
    pub label: String,
    pub url: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct View {
    pub app_name: String,
    pub tagline: String,
    pub heading: String,
    pub description: String,
    pub primary: PrimaryAction,
    pub status_icon: StatusIcon,
    pub status_line: String,
    pub universal_account: Option<String>,
    pub sub_account: Option<String>,
    pub transaction: Option<ExplorerLink>,
    pub manage_permissions_url: String,
}

/// Pure mapping from session state to what the user sees
pub fn render(snapshot: &SessionSnapshot, config: &Config) -> View {
    let enabled = !snapshot.loading;
    let primary = match &snapshot.state {
        SessionState::InitFailed { .. } => PrimaryAction::Unavailable,
        SessionState::Uninitialized => PrimaryAction::Connect { enabled: false },
        SessionState::Ready { .. } | SessionState::Connecting => PrimaryAction::Connect { enabled },
        SessionState::Connected { .. } => PrimaryAction::CreateSubAccount { enabled },
        SessionState::SubAccountReady(_) => PrimaryAction::TipForm { enabled },
    };

    let transaction = snapshot.last_tip.as_ref().map(|tip| ExplorerLink {
        label: format!("View on {}", config.chain.explorer_name),
        url: tip.explorer_url(&config.chain),
    });

    let status_icon = if snapshot.loading {
        StatusIcon::Busy
    } else if snapshot.status.is_failure() {
        StatusIcon::Failed
    } else if snapshot.status.is_success() || transaction.is_some() {
        StatusIcon::Success
    } else {
        StatusIcon::Info
    };

    View {
        app_name: config.app.name.clone(),
        tagline: config.app.tagline.clone(),
        heading: format!("Frictionless Tips on {}", config.chain.name),
        description: format!(
            "Send tips on {} without constant wallet pop-ups.",
            config.chain.name
        ),
        primary,
        status_icon,
        status_line: snapshot.status.to_string(),
        universal_account: snapshot.state.universal_address().map(|a| a.to_string()),
        sub_account: snapshot
            .state
            .sub_account()
            .map(|s| s.address.to_string()),
        transaction,
        manage_permissions_url: config.app.manage_permissions_url.clone(),
    }
}

impl fmt::Display for View {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "== {} :: {} ==", self.app_name, self.tagline)?;
        writeln!(f, "{}", self.heading)?;
        writeln!(f, "{}", self.description)?;
        writeln!(f)?;

        let icon = match self.status_icon {
            StatusIcon::Busy => "...",
            StatusIcon::Failed => "(!)",
            StatusIcon::Success => "(ok)",
            StatusIcon::Info => "(i)",
        };
        writeln!(f, "{} Status: {}", icon, self.status_line)?;

        if let Some(universal) = &self.universal_account {
            writeln!(f, "Universal Account: {}", universal)?;
        }
        if let Some(sub) = &self.sub_account {
            writeln!(f, "Sub-Account: {}", sub)?;
        }
        if let Some(link) = &self.transaction {
            writeln!(f, "Transaction Sent! {}: {}", link.label, link.url)?;
        }

        writeln!(f)?;
        write!(f, "Manage Permissions: {}", self.manage_permissions_url)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::SubAccount;
    use crate::session::{ReadySession, StatusMessage};
    use crate::tipping::TipResult;
    use crate::units::Address;

    fn snapshot(state: SessionState, loading: bool, status: StatusMessage) -> SessionSnapshot {
        SessionSnapshot {
            state,
            loading,
            status,
            last_tip: None,
        }
    }

    fn ready_state() -> SessionState {
        SessionState::SubAccountReady(ReadySession::new(
            Address::zero(),
            SubAccount::new("0x5000000000000000000000000000000000000005".parse().unwrap()),
        ))
    }

    #[test]
    fn test_primary_action_follows_state() {
        let config = Config::default();

        let view = render(
            &snapshot(SessionState::Uninitialized, false, StatusMessage::Initializing),
            &config,
        );
        assert_eq!(view.primary, PrimaryAction::Connect { enabled: false });

        let view = render(
            &snapshot(
                SessionState::Ready { universal: None },
                false,
                StatusMessage::ReadyToConnect,
            ),
            &config,
        );
        assert_eq!(view.primary, PrimaryAction::Connect { enabled: true });
        assert_eq!(view.status_icon, StatusIcon::Info);

        let view = render(
            &snapshot(
                SessionState::Connected {
                    universal: Address::zero(),
                },
                false,
                StatusMessage::NeedsSubAccount,
            ),
            &config,
        );
        assert_eq!(view.primary, PrimaryAction::CreateSubAccount { enabled: true });
        assert!(view.universal_account.is_some());
        assert!(view.sub_account.is_none());

        let view = render(&snapshot(ready_state(), true, StatusMessage::Sending), &config);
        assert_eq!(view.primary, PrimaryAction::TipForm { enabled: false });
        assert_eq!(view.status_icon, StatusIcon::Busy);

        let view = render(
            &snapshot(
                SessionState::InitFailed {
                    reason: "x".into(),
                },
                false,
                StatusMessage::InitFailed,
            ),
            &config,
        );
        assert_eq!(view.primary, PrimaryAction::Unavailable);
        assert_eq!(view.status_icon, StatusIcon::Failed);
    }

    #[test]
    fn test_found_sub_account_is_informational() {
        let config = Config::default();
        let view = render(
            &snapshot(ready_state(), false, StatusMessage::SubAccountFound),
            &config,
        );
        assert_eq!(view.status_icon, StatusIcon::Info);

        let view = render(
            &snapshot(ready_state(), false, StatusMessage::SubAccountCreated),
            &config,
        );
        assert_eq!(view.status_icon, StatusIcon::Success);
    }

    #[test]
    fn test_transaction_link() {
        let config = Config::default();
        let mut snap = snapshot(
            ready_state(),
            false,
            StatusMessage::TipSent {
                request_id: "0xbeef".into(),
            },
        );
        snap.last_tip = Some(TipResult {
            request_id: "0xbeef".into(),
            from: Address::zero(),
            recipient: Address::zero(),
            amount: "0.01".into(),
            value_wei: 10_000_000_000_000_000,
            submitted_at: chrono::Utc::now(),
        });

        let view = render(&snap, &config);
        assert_eq!(view.status_icon, StatusIcon::Success);
        let link = view.transaction.clone().unwrap();
        assert_eq!(link.label, "View on Basescan");
        assert_eq!(link.url, "https://basescan.org/tx/0xbeef");

        let text = view.to_string();
        assert!(text.contains("Tip sent successfully!"));
        assert!(text.contains("https://basescan.org/tx/0xbeef"));
        assert!(text.contains("Frictionless Tips on Base"));
    }
}
