//! Tip form input state

use crate::config::TipConfig;
use crate::validation::FieldErrors;

/// Raw form fields plus the messages from the last validation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TipForm {
    pub recipient: String,
    pub amount: String,
    pub errors: FieldErrors,
}

impl TipForm {
    /// Form prefilled with the configured defaults
    pub fn new(defaults: &TipConfig) -> Self {
        Self {
            recipient: defaults.default_recipient.clone(),
            amount: defaults.default_amount.clone(),
            errors: FieldErrors::default(),
        }
    }

    /// Back to defaults after a successful tip
    pub fn reset(&mut self, defaults: &TipConfig) {
        *self = Self::new(defaults);
    }

    /// Keep the entered values so the user can fix and retry
    pub fn reject(&mut self, errors: FieldErrors) {
        self.errors = errors;
    }
}
