//! Transfer draft: what the wizard has collected so far.

use crate::core_types::Recipient;
use crate::money;

use super::pin::PinBuffer;

/// Who receives the money.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Payee {
    User(Recipient),
    /// From a scanned payment code
    Merchant {
        name: String,
        reference: Option<String>,
    },
}

impl Payee {
    pub fn display_name(&self) -> &str {
        match self {
            Payee::User(recipient) => &recipient.display_name,
            Payee::Merchant { name, .. } => name,
        }
    }
}

/// Lives for one wizard session only; never persisted.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TransferDraft {
    pub(super) payee: Option<Payee>,
    pub(super) amount_minor: Option<u64>,
    pub(super) note: String,
    /// Supplied by the backend or zero; never computed locally
    pub(super) fee_minor: u64,
    pub(super) pin: PinBuffer,
}

impl TransferDraft {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn payee(&self) -> Option<&Payee> {
        self.payee.as_ref()
    }

    pub fn amount_minor(&self) -> Option<u64> {
        self.amount_minor
    }

    pub fn note(&self) -> &str {
        &self.note
    }

    pub fn fee_minor(&self) -> u64 {
        self.fee_minor
    }

    pub fn total_minor(&self) -> Option<u64> {
        self.amount_minor?.checked_add(self.fee_minor)
    }

    pub fn pin(&self) -> &PinBuffer {
        &self.pin
    }

    pub fn pin_len(&self) -> usize {
        self.pin.len()
    }

    /// One-line recap for the confirmation step
    pub fn summary(&self) -> String {
        let to = self.payee.as_ref().map(Payee::display_name).unwrap_or("-");
        match (self.amount_minor, self.total_minor()) {
            (Some(amount), Some(total)) => format!(
                "{} to {} (total {})",
                money::format_amount(amount),
                to,
                money::format_amount(total)
            ),
            _ => format!("to {}", to),
        }
    }

    pub(super) fn clear_amount(&mut self) {
        self.amount_minor = None;
        self.note.clear();
        self.fee_minor = 0;
    }
}
