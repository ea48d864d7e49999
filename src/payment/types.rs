//! Payment Types

use chrono::{DateTime, Utc};
use std::fmt;
use ulid::Ulid;

use super::error::PaymentError;
use crate::codec::CodePayload;
use crate::config::TopUpConfig;
use crate::core_types::{UserId, is_valid_phone_number};
use crate::money;
use crate::transfer::{Payee, Pin, TransferDraft};

// ============================================================================
// Orders
// ============================================================================

/// Where the money goes, normalized from a wizard payee or a scanned code.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PaymentTarget {
    User {
        recipient_id: UserId,
        display_name: String,
    },
    Merchant {
        name: String,
        reference: Option<String>,
    },
}

impl PaymentTarget {
    pub fn display_name(&self) -> &str {
        match self {
            PaymentTarget::User { display_name, .. } => display_name,
            PaymentTarget::Merchant { name, .. } => name,
        }
    }
}

impl From<&Payee> for PaymentTarget {
    fn from(payee: &Payee) -> Self {
        match payee {
            Payee::User(recipient) => PaymentTarget::User {
                recipient_id: recipient.id.clone(),
                display_name: recipient.display_name.clone(),
            },
            Payee::Merchant { name, reference } => PaymentTarget::Merchant {
                name: name.clone(),
                reference: reference.clone(),
            },
        }
    }
}

/// One finalized, ready-to-send transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaymentOrder {
    pub target: PaymentTarget,
    pub amount_minor: u64,
    pub note: String,
    pub pin: Pin,
}

impl PaymentOrder {
    /// A draft is complete once it has a payee, an amount and four PIN digits.
    pub fn from_draft(draft: &TransferDraft) -> Result<Self, PaymentError> {
        let payee = draft
            .payee()
            .ok_or_else(|| PaymentError::Validation("Recipient is required".to_string()))?;
        let amount_minor = draft
            .amount_minor()
            .ok_or_else(|| PaymentError::Validation("Amount is required".to_string()))?;
        let pin = draft
            .pin()
            .to_pin()
            .map_err(|e| PaymentError::Validation(e.to_string()))?;

        Ok(Self {
            target: PaymentTarget::from(payee),
            amount_minor,
            note: draft.note().to_string(),
            pin,
        })
    }

    /// Pay straight from a decoded code. `amount_minor` overrides the code's
    /// suggested amount; a receive code carries none and needs one.
    pub fn from_code(
        payload: &CodePayload,
        amount_minor: Option<u64>,
        note: impl Into<String>,
        pin: Pin,
    ) -> Result<Self, PaymentError> {
        let (target, suggested) = match payload {
            CodePayload::Receive(intent) => (
                PaymentTarget::User {
                    recipient_id: intent.user_id.clone(),
                    display_name: intent.name.clone(),
                },
                None,
            ),
            CodePayload::Payment(intent) => (
                PaymentTarget::Merchant {
                    name: intent.merchant_name.clone(),
                    reference: intent.reference.clone(),
                },
                intent.amount,
            ),
        };

        let amount_minor = match (amount_minor, suggested) {
            (Some(amount), _) => amount,
            (None, Some(suggested)) => money::decimal_to_minor(suggested)
                .map_err(|e| PaymentError::Validation(e.to_string()))?,
            (None, None) => {
                return Err(PaymentError::Validation("Amount is required".to_string()));
            }
        };

        Ok(Self {
            target,
            amount_minor,
            note: note.into(),
            pin,
        })
    }
}

// ============================================================================
// Results
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransferStatus {
    Completed,
    /// Accepted but not settled yet (e.g. awaiting M-Pesa confirmation)
    Pending,
    Rejected(String),
}

impl TransferStatus {
    /// Map the backend's `status` string. Unknown values are treated as
    /// pending: the money may have moved.
    pub fn from_backend(status: &str) -> Result<Self, PaymentError> {
        match status.trim().to_ascii_lowercase().as_str() {
            "completed" | "success" | "successful" => Ok(TransferStatus::Completed),
            "pending" | "processing" | "initiated" => Ok(TransferStatus::Pending),
            "failed" | "rejected" | "cancelled" => Err(PaymentError::Business(format!(
                "Transaction {}",
                status.trim().to_ascii_lowercase()
            ))),
            _ => Ok(TransferStatus::Pending),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TransferStatus::Completed => "COMPLETED",
            TransferStatus::Pending => "PENDING",
            TransferStatus::Rejected(_) => "REJECTED",
        }
    }
}

impl fmt::Display for TransferStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransferStatus::Rejected(reason) => write!(f, "REJECTED: {}", reason),
            other => write!(f, "{}", other.as_str()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferResult {
    pub status: TransferStatus,
    /// Backend transaction id, when it returned one
    pub transaction_id: Option<String>,
    /// Client-side id of this attempt, for log correlation
    pub attempt_id: Ulid,
    pub settled_at: DateTime<Utc>,
}

impl TransferResult {
    pub fn new(status: TransferStatus, transaction_id: Option<String>, attempt_id: Ulid) -> Self {
        Self {
            status,
            transaction_id,
            attempt_id,
            settled_at: Utc::now(),
        }
    }
}

// ============================================================================
// Top-up
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TopUpMethod {
    Mpesa,
    Card,
    Bank,
}

impl TopUpMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            TopUpMethod::Mpesa => "mpesa",
            TopUpMethod::Card => "card",
            TopUpMethod::Bank => "bank",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "mpesa" | "m-pesa" => Some(TopUpMethod::Mpesa),
            "card" => Some(TopUpMethod::Card),
            "bank" => Some(TopUpMethod::Bank),
            _ => None,
        }
    }
}

/// Deposit from an external funding source into the wallet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TopUpRequest {
    pub amount_minor: u64,
    pub phone_number: String,
    pub method: TopUpMethod,
}

impl TopUpRequest {
    pub fn mpesa(amount_minor: u64, phone_number: impl Into<String>) -> Self {
        Self {
            amount_minor,
            phone_number: phone_number.into(),
            method: TopUpMethod::Mpesa,
        }
    }

    /// Local checks only; the backend validates again.
    pub fn validate(&self, limits: &TopUpConfig) -> Result<(), PaymentError> {
        if self.method != TopUpMethod::Mpesa {
            return Err(PaymentError::Validation(format!(
                "Top-up via {} is not available yet",
                self.method.as_str()
            )));
        }
        if self.amount_minor == 0 {
            return Err(PaymentError::Validation(
                "Please enter a valid amount".to_string(),
            ));
        }
        let min_minor = limits.min_amount.saturating_mul(100);
        let max_minor = limits.max_amount.saturating_mul(100);
        if self.amount_minor < min_minor {
            return Err(PaymentError::Validation(format!(
                "Minimum top-up is {}",
                money::format_amount(min_minor)
            )));
        }
        if self.amount_minor > max_minor {
            return Err(PaymentError::Validation(format!(
                "Maximum top-up is {}",
                money::format_amount(max_minor)
            )));
        }
        if !is_valid_phone_number(self.phone_number.trim()) {
            return Err(PaymentError::Validation(
                "Please enter a valid phone number".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::{PaymentIntent, ReceiveIntent};
    use crate::payment::FailureClass;
    use rust_decimal::Decimal;

    fn pin() -> Pin {
        Pin::parse("1234").unwrap()
    }

    #[test]
    fn test_order_from_payment_code_uses_suggested_amount() {
        let payload = CodePayload::Payment(PaymentIntent {
            merchant_name: "Java House".into(),
            amount: Some(Decimal::new(45_050, 2)),
            reference: Some("TBL-12".into()),
        });
        let order = PaymentOrder::from_code(&payload, None, "", pin()).unwrap();
        assert_eq!(order.amount_minor, 45_050);
        assert_eq!(
            order.target,
            PaymentTarget::Merchant {
                name: "Java House".into(),
                reference: Some("TBL-12".into())
            }
        );

        let edited = PaymentOrder::from_code(&payload, Some(40_000), "", pin()).unwrap();
        assert_eq!(edited.amount_minor, 40_000);
    }

    #[test]
    fn test_order_from_receive_code_needs_amount() {
        let payload = CodePayload::Receive(ReceiveIntent {
            user_id: UserId::from("u-2"),
            name: "Otieno Odhiambo".into(),
            phone_number: "0798765432".into(),
        });
        let err = PaymentOrder::from_code(&payload, None, "", pin()).unwrap_err();
        assert_eq!(err.to_string(), "Amount is required");

        let order = PaymentOrder::from_code(&payload, Some(10_000), "lunch", pin()).unwrap();
        assert_eq!(order.target.display_name(), "Otieno Odhiambo");
        assert_eq!(order.note, "lunch");
    }

    #[test]
    fn test_incomplete_draft_rejected() {
        let err = PaymentOrder::from_draft(&TransferDraft::new()).unwrap_err();
        assert_eq!(err.to_string(), "Recipient is required");
    }

    #[test]
    fn test_backend_status_mapping() {
        assert_eq!(
            TransferStatus::from_backend("completed"),
            Ok(TransferStatus::Completed)
        );
        assert_eq!(
            TransferStatus::from_backend("SUCCESS"),
            Ok(TransferStatus::Completed)
        );
        assert_eq!(
            TransferStatus::from_backend("pending"),
            Ok(TransferStatus::Pending)
        );
        assert_eq!(
            TransferStatus::from_backend("queued"),
            Ok(TransferStatus::Pending)
        );
        assert!(TransferStatus::from_backend("failed").is_err());
    }

    #[test]
    fn test_top_up_validation() {
        let limits = TopUpConfig::default();
        TopUpRequest::mpesa(100_000, "0712345678")
            .validate(&limits)
            .unwrap();

        let too_small = TopUpRequest::mpesa(500, "0712345678").validate(&limits);
        assert_eq!(
            too_small.unwrap_err().to_string(),
            "Minimum top-up is KES 10.00"
        );

        let too_large = TopUpRequest::mpesa(15_000_001, "0712345678").validate(&limits);
        assert!(too_large.is_err());

        let bad_phone = TopUpRequest::mpesa(100_000, "0712").validate(&limits);
        assert!(bad_phone.is_err());

        let card = TopUpRequest {
            method: TopUpMethod::Card,
            ..TopUpRequest::mpesa(100_000, "0712345678")
        };
        assert_eq!(
            card.validate(&limits).unwrap_err().class(),
            FailureClass::Validation
        );
    }

    #[test]
    fn test_top_up_method_parse() {
        assert_eq!(TopUpMethod::parse("M-Pesa"), Some(TopUpMethod::Mpesa));
        assert_eq!(TopUpMethod::parse("paypal"), None);
    }
}
