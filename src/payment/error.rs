//! Payment Failure Classification
//!
//! Every failed money-moving call ends up in exactly one [`FailureClass`]:
//!
//! | Class | Meaning | Caller reaction |
//! |-------|---------|-----------------|
//! | Validation | request was malformed or the PIN was wrong | re-prompt the same step |
//! | Unauthorized | token rejected | session already torn down, re-authenticate |
//! | Business | insufficient funds, limit exceeded, refused | report, user starts over |
//! | Transient | timeout, connectivity | safe to resubmit the same request |

use std::fmt;
use thiserror::Error;

use crate::api::ApiError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailureClass {
    Validation,
    Unauthorized,
    Business,
    Transient,
}

impl FailureClass {
    pub fn as_str(&self) -> &'static str {
        match self {
            FailureClass::Validation => "VALIDATION",
            FailureClass::Unauthorized => "UNAUTHORIZED",
            FailureClass::Business => "BUSINESS",
            FailureClass::Transient => "TRANSIENT",
        }
    }
}

impl fmt::Display for FailureClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Classified payment failure. The message is shown to the user as is.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PaymentError {
    // === Validation ===
    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    InvalidPin(String),

    // === Business ===
    #[error("{0}")]
    InsufficientFunds(String),

    #[error("{0}")]
    LimitExceeded(String),

    #[error("{0}")]
    Business(String),

    // === Session ===
    #[error("{0}")]
    Unauthorized(String),

    // === Retryable ===
    #[error("{0}")]
    Transient(String),
}

impl PaymentError {
    pub fn class(&self) -> FailureClass {
        match self {
            PaymentError::Validation(_) | PaymentError::InvalidPin(_) => FailureClass::Validation,
            PaymentError::InsufficientFunds(_)
            | PaymentError::LimitExceeded(_)
            | PaymentError::Business(_) => FailureClass::Business,
            PaymentError::Unauthorized(_) => FailureClass::Unauthorized,
            PaymentError::Transient(_) => FailureClass::Transient,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            PaymentError::Validation(_) => "VALIDATION_ERROR",
            PaymentError::InvalidPin(_) => "INVALID_PIN",
            PaymentError::InsufficientFunds(_) => "INSUFFICIENT_FUNDS",
            PaymentError::LimitExceeded(_) => "LIMIT_EXCEEDED",
            PaymentError::Business(_) => "PAYMENT_REJECTED",
            PaymentError::Unauthorized(_) => "UNAUTHORIZED",
            PaymentError::Transient(_) => "TRANSIENT",
        }
    }

    /// Only transient failures may be resubmitted unchanged.
    #[inline]
    pub fn is_retryable(&self) -> bool {
        self.class() == FailureClass::Transient
    }
}

/// Map a backend failure onto the taxonomy: machine code first, then the
/// message, then the HTTP status.
pub fn classify(error: ApiError) -> PaymentError {
    match error {
        ApiError::Unauthorized(message) => PaymentError::Unauthorized(message),
        ApiError::Timeout => PaymentError::Transient("Request timed out".to_string()),
        ApiError::Network(message) => PaymentError::Transient(message),
        // The request may or may not have been applied: never resubmit
        ApiError::Decode(message) => PaymentError::Business(format!(
            "Unexpected response from server, check your balance before retrying ({})",
            message
        )),
        ApiError::Rejected {
            status,
            code,
            message,
        } => {
            if let Some(classified) = code
                .as_deref()
                .and_then(|code| classify_code(code, &message))
            {
                return classified;
            }
            if let Some(classified) = classify_message(&message) {
                return classified;
            }
            match status {
                408 | 429 | 502 | 503 | 504 => PaymentError::Transient(message),
                400 | 422 => PaymentError::Validation(message),
                _ => PaymentError::Business(message),
            }
        }
    }
}

fn classify_code(code: &str, message: &str) -> Option<PaymentError> {
    let message = message.to_string();
    let classified = match code.to_ascii_uppercase().as_str() {
        "INVALID_PIN" | "PIN_MISMATCH" | "WRONG_PIN" | "INCORRECT_PIN" => {
            PaymentError::InvalidPin(message)
        }
        "INSUFFICIENT_FUNDS" | "INSUFFICIENT_BALANCE" => PaymentError::InsufficientFunds(message),
        "LIMIT_EXCEEDED" | "DAILY_LIMIT_EXCEEDED" | "TRANSACTION_LIMIT_EXCEEDED" => {
            PaymentError::LimitExceeded(message)
        }
        "VALIDATION_ERROR" | "INVALID_REQUEST" | "INVALID_AMOUNT" => {
            PaymentError::Validation(message)
        }
        _ => return None,
    };
    Some(classified)
}

fn classify_message(message: &str) -> Option<PaymentError> {
    let lower = message.to_ascii_lowercase();
    let words: Vec<&str> = lower
        .split(|c: char| !c.is_ascii_alphanumeric())
        .filter(|w| !w.is_empty())
        .collect();
    let has = |prefix: &str| words.iter().any(|w| w.starts_with(prefix));

    if words.iter().any(|w| matches!(*w, "pin" | "pins")) {
        Some(PaymentError::InvalidPin(message.to_string()))
    } else if has("insufficient") {
        Some(PaymentError::InsufficientFunds(message.to_string()))
    } else if has("limit") {
        Some(PaymentError::LimitExceeded(message.to_string()))
    } else {
        None
    }
}
