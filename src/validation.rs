//! Tip form validation
//!
//! Turns raw form strings into a [`TipRequest`]. Both fields are checked in
//! one pass so the form can show every problem at once. Nothing here
//! touches the wallet.

use serde::Serialize;
use std::fmt;

use crate::units::{self, Address, UnitsError, ETHER_DECIMALS};

pub const INVALID_ADDRESS: &str = "Please enter a valid Ethereum address.";
pub const INVALID_AMOUNT: &str = "Please enter a valid amount.";

/// A validated tip, ready for submission
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TipRequest {
    pub recipient: Address,
    /// Amount in the native unit, as entered (trimmed)
    pub amount: String,
}

/// Field-scoped validation messages
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldErrors {
    pub recipient: Option<String>,
    pub amount: Option<String>,
}

impl FieldErrors {
    pub fn is_empty(&self) -> bool {
        self.recipient.is_none() && self.amount.is_none()
    }
}

impl fmt::Display for FieldErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut parts = Vec::new();
        if let Some(msg) = &self.recipient {
            parts.push(format!("recipient: {}", msg));
        }
        if let Some(msg) = &self.amount {
            parts.push(format!("amount: {}", msg));
        }
        write!(f, "{}", parts.join("; "))
    }
}

impl std::error::Error for FieldErrors {}

/// Acceptance rules for the tip form
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationRules {
    /// Decimals of the chain's native unit
    pub decimals: u32,
    /// Smallest accepted tip, in smallest units
    pub min_value: u128,
}

impl Default for ValidationRules {
    fn default() -> Self {
        Self {
            decimals: ETHER_DECIMALS,
            min_value: 1,
        }
    }
}

impl ValidationRules {
    /// Build rules from a native-unit minimum such as `"0.000000000000001"`
    pub fn new(decimals: u32, min_amount: &str) -> Result<Self, UnitsError> {
        let min_value = units::parse_units(min_amount, decimals)?.max(1);
        Ok(Self {
            decimals,
            min_value,
        })
    }

    /// Validate raw recipient and amount strings
    pub fn validate(&self, recipient: &str, amount: &str) -> Result<TipRequest, FieldErrors> {
        let mut errors = FieldErrors::default();

        let recipient = match recipient.parse::<Address>() {
            Ok(address) => Some(address),
            Err(_) => {
                errors.recipient = Some(INVALID_ADDRESS.to_string());
                None
            }
        };

        let amount = amount.trim();
        if let Err(msg) = self.check_amount(amount) {
            errors.amount = Some(msg);
        }

        match recipient {
            Some(recipient) if errors.is_empty() => Ok(TipRequest {
                recipient,
                amount: amount.to_string(),
            }),
            _ => Err(errors),
        }
    }

    fn check_amount(&self, amount: &str) -> Result<(), String> {
        match units::parse_units(amount, self.decimals) {
            Ok(0) | Err(UnitsError::Negative) | Err(UnitsError::Unparseable(_)) => {
                Err(INVALID_AMOUNT.to_string())
            }
            Ok(value) if value < self.min_value => Err(format!(
                "Amount must be at least {}.",
                units::format_units(self.min_value, self.decimals)
            )),
            Ok(_) => Ok(()),
            Err(UnitsError::TooPrecise { decimals }) => Err(format!(
                "Amount cannot have more than {} decimal places.",
                decimals
            )),
            Err(UnitsError::Overflow) => Err("Amount is too large.".to_string()),
        }
    }
}

/// Validate with the default rules (18 decimals, any positive amount)
pub fn validate(recipient: &str, amount: &str) -> Result<TipRequest, FieldErrors> {
    ValidationRules::default().validate(recipient, amount)
}
