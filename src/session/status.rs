//! Status line and transient notifications

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt;

/// Human-readable phase shown on the status line
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum StatusMessage {
    Initializing,
    ReadyToConnect,
    InitFailed,
    Connecting,
    CheckingSubAccount,
    SubAccountFound,
    NeedsSubAccount,
    ConnectionFailed { reason: String },
    CreatingSubAccount,
    SubAccountCreated,
    SubAccountCreationFailed { reason: String },
    Sending,
    TipSent { request_id: String },
    TipFailed { reason: String },
}

impl StatusMessage {
    pub fn is_failure(&self) -> bool {
        matches!(
            self,
            StatusMessage::InitFailed
                | StatusMessage::ConnectionFailed { .. }
                | StatusMessage::SubAccountCreationFailed { .. }
                | StatusMessage::TipFailed { .. }
        )
    }

    /// Completed actions only; a found sub-account is informational
    pub fn is_success(&self) -> bool {
        matches!(
            self,
            StatusMessage::SubAccountCreated | StatusMessage::TipSent { .. }
        )
    }
}

impl fmt::Display for StatusMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StatusMessage::Initializing => write!(f, "Initializing..."),
            StatusMessage::ReadyToConnect => write!(f, "Ready to connect."),
            StatusMessage::InitFailed => write!(f, "SDK initialization failed."),
            StatusMessage::Connecting => write!(f, "Connecting wallet..."),
            StatusMessage::CheckingSubAccount => write!(f, "Checking for Sub-account..."),
            StatusMessage::SubAccountFound => write!(f, "Sub-account found. Ready to tip!"),
            StatusMessage::NeedsSubAccount => write!(
                f,
                "Wallet connected! Please create a Sub-account to start tipping."
            ),
            StatusMessage::ConnectionFailed { reason } => {
                write!(f, "Wallet connection failed: {}", reason)
            }
            StatusMessage::CreatingSubAccount => write!(f, "Creating Sub-account..."),
            StatusMessage::SubAccountCreated => {
                write!(f, "Sub-account created successfully! You can now send tips.")
            }
            StatusMessage::SubAccountCreationFailed { reason } => {
                write!(f, "Sub-account creation failed: {}", reason)
            }
            StatusMessage::Sending => write!(f, "Sending tip..."),
            StatusMessage::TipSent { .. } => write!(f, "Tip sent successfully!"),
            StatusMessage::TipFailed { reason } => write!(f, "Tip transaction failed: {}", reason),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationLevel {
    Success,
    Error,
}

/// Transient toast-style message
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notification {
    pub level: NotificationLevel,
    pub title: String,
    pub description: String,
    pub at: DateTime<Utc>,
}

impl Notification {
    pub fn error(title: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            level: NotificationLevel::Error,
            title: title.into(),
            description: description.into(),
            at: Utc::now(),
        }
    }

    pub fn success(title: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            level: NotificationLevel::Success,
            title: title.into(),
            description: description.into(),
            at: Utc::now(),
        }
    }
}

impl fmt::Display for Notification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let marker = match self.level {
            NotificationLevel::Success => "+",
            NotificationLevel::Error => "!",
        };
        write!(f, "[{}] {}: {}", marker, self.title, self.description)
    }
}
