//! Backend Wire Types
//!
//! Request/response bodies for the REST contract. Every response is wrapped
//! in [`ApiEnvelope`].

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::core_types::{Recipient, UserId};
use crate::session::{AuthToken, UserProfile, WalletSnapshot};

// ============================================================================
// Envelope
// ============================================================================

/// `{ success, data?, message?, code? }`
#[derive(Debug, Deserialize)]
pub struct ApiEnvelope<T> {
    #[serde(default)]
    pub success: bool,
    pub data: Option<T>,
    pub message: Option<String>,
    pub code: Option<String>,
}

// ============================================================================
// Auth
// ============================================================================

/// `POST /auth/login`
#[derive(Clone, Serialize)]
pub struct LoginRequest {
    pub identifier: String,
    pub password: String,
}

impl LoginRequest {
    pub fn new(identifier: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            identifier: identifier.into(),
            password: password.into(),
        }
    }
}

impl fmt::Debug for LoginRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoginRequest")
            .field("identifier", &self.identifier)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// `POST /auth/register`
#[derive(Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RegistrationForm {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone_number: String,
    pub password: String,
}

impl fmt::Debug for RegistrationForm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RegistrationForm")
            .field("first_name", &self.first_name)
            .field("last_name", &self.last_name)
            .field("email", &self.email)
            .field("phone_number", &self.phone_number)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// `data` of login/register
#[derive(Debug, Clone, Deserialize)]
pub struct AuthPayload {
    pub user: UserProfile,
    #[serde(default)]
    pub wallet: Option<WalletSnapshot>,
    pub token: AuthToken,
}

/// `data` of `GET /auth/profile`
#[derive(Debug, Clone, Deserialize)]
pub struct ProfilePayload {
    pub user: UserProfile,
    #[serde(default)]
    pub wallet: Option<WalletSnapshot>,
}

// ============================================================================
// Directory
// ============================================================================

/// One hit of `GET /users/search`
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DirectoryUser {
    #[serde(rename = "_id")]
    pub id: UserId,
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    pub phone_number: String,
}

impl From<DirectoryUser> for Recipient {
    fn from(user: DirectoryUser) -> Self {
        let display_name = format!("{} {}", user.first_name, user.last_name)
            .trim()
            .to_string();
        Recipient::new(user.id, display_name, user.phone_number)
    }
}

#[derive(Debug, Deserialize)]
pub struct SearchPayload {
    #[serde(default)]
    pub users: Vec<DirectoryUser>,
}

// ============================================================================
// Transactions
// ============================================================================

/// `POST /mpesa/send-money`
#[derive(Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SendMoneyRequest {
    pub recipient_id: UserId,
    #[serde(with = "rust_decimal::serde::float")]
    pub amount: Decimal,
    pub description: String,
    pub pin: String,
}

impl fmt::Debug for SendMoneyRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SendMoneyRequest")
            .field("recipient_id", &self.recipient_id)
            .field("amount", &self.amount)
            .field("description", &self.description)
            .field("pin", &"<redacted>")
            .finish()
    }
}

/// `POST /payments/merchant`
#[derive(Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MerchantPaymentRequest {
    pub merchant_name: String,
    #[serde(with = "rust_decimal::serde::float")]
    pub amount: Decimal,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reference: Option<String>,
    pub description: String,
    pub pin: String,
}

impl fmt::Debug for MerchantPaymentRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MerchantPaymentRequest")
            .field("merchant_name", &self.merchant_name)
            .field("amount", &self.amount)
            .field("reference", &self.reference)
            .field("pin", &"<redacted>")
            .finish()
    }
}

/// `POST /mpesa/stk-push`
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StkPushRequest {
    #[serde(with = "rust_decimal::serde::float")]
    pub amount: Decimal,
    pub phone_number: String,
    pub method: String,
}

/// `data` of every transaction call
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionAck {
    pub status: String,
    #[serde(default, alias = "_id")]
    pub transaction_id: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}
