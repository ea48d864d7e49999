//! Wizard Error Types

use thiserror::Error;

use super::pin::PinError;
use super::state::WizardStep;
use crate::codec::DecodeError;
use crate::money::MoneyError;
use crate::payment::PaymentError;

/// Errors surfaced by the send-money wizard.
///
/// Local errors leave the wizard exactly as it was.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum WizardError {
    // === Navigation ===
    #[error("{event} is not allowed in step {step}")]
    InvalidTransition {
        step: WizardStep,
        event: &'static str,
    },

    #[error("A payment is already being processed")]
    SubmissionInFlight,

    // === Local validation ===
    #[error("Amount must be greater than zero")]
    InvalidAmount,

    #[error("Invalid amount: {0}")]
    Amount(#[from] MoneyError),

    #[error("Insufficient balance")]
    InsufficientBalance { requested: u64, available: u64 },

    #[error("Note is longer than {max} characters")]
    NoteTooLong { max: usize },

    #[error("Recipient is missing a user id")]
    InvalidRecipient,

    #[error(transparent)]
    Pin(#[from] PinError),

    #[error(transparent)]
    Decode(#[from] DecodeError),

    // === Backend ===
    #[error("Search failed: {0}")]
    Search(PaymentError),

    #[error(transparent)]
    Payment(#[from] PaymentError),
}

impl WizardError {
    pub fn code(&self) -> &'static str {
        match self {
            WizardError::InvalidTransition { .. } => "INVALID_STATE_TRANSITION",
            WizardError::SubmissionInFlight => "SUBMISSION_IN_FLIGHT",
            WizardError::InvalidAmount => "INVALID_AMOUNT",
            WizardError::Amount(_) => "INVALID_AMOUNT",
            WizardError::InsufficientBalance { .. } => "INSUFFICIENT_BALANCE",
            WizardError::NoteTooLong { .. } => "NOTE_TOO_LONG",
            WizardError::InvalidRecipient => "INVALID_RECIPIENT",
            WizardError::Pin(e) => e.code(),
            WizardError::Decode(e) => e.code(),
            WizardError::Search(_) => "SEARCH_FAILED",
            WizardError::Payment(e) => e.code(),
        }
    }
}
