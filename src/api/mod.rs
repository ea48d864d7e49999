//! Backend Contract
//!
//! The core only talks to the backend through these traits. [`HttpBackend`]
//! is the production implementation; tests plug in `mock::MockBackend`.
//!
//! | Trait | Endpoints |
//! |-------|-----------|
//! | [`AuthApi`] | `/auth/login`, `/auth/register`, `/auth/profile`, `/auth/logout` |
//! | [`DirectoryApi`] | `/users/search` |
//! | [`TransactionExecutor`] | `/mpesa/send-money`, `/payments/merchant`, `/mpesa/stk-push`, `/mpesa/transaction/:id/status` |

pub mod error;
pub mod http;
pub mod types;

pub use error::ApiError;
pub use http::HttpBackend;
pub use types::{
    AuthPayload, LoginRequest, MerchantPaymentRequest, ProfilePayload, RegistrationForm,
    SendMoneyRequest, StkPushRequest, TransactionAck,
};

use async_trait::async_trait;

use crate::core_types::Recipient;
use crate::session::AuthToken;

/// Identity endpoints
#[async_trait]
pub trait AuthApi: Send + Sync {
    async fn login(&self, request: &LoginRequest) -> Result<AuthPayload, ApiError>;

    async fn register(&self, form: &RegistrationForm) -> Result<AuthPayload, ApiError>;

    async fn profile(&self, token: &AuthToken) -> Result<ProfilePayload, ApiError>;

    /// Best-effort server-side token revocation
    async fn revoke(&self, token: &AuthToken) -> Result<(), ApiError>;
}

/// User directory lookup
#[async_trait]
pub trait DirectoryApi: Send + Sync {
    async fn search_users(&self, token: &AuthToken, query: &str)
    -> Result<Vec<Recipient>, ApiError>;
}

/// The backend capability that performs the authoritative money movement.
///
/// None of the money-moving calls are idempotent on the backend: callers must
/// never retry them automatically. `transaction_status` is a read and is safe
/// to repeat.
#[async_trait]
pub trait TransactionExecutor: Send + Sync {
    async fn send_money(
        &self,
        token: &AuthToken,
        request: &SendMoneyRequest,
    ) -> Result<TransactionAck, ApiError>;

    async fn pay_merchant(
        &self,
        token: &AuthToken,
        request: &MerchantPaymentRequest,
    ) -> Result<TransactionAck, ApiError>;

    async fn top_up(
        &self,
        token: &AuthToken,
        request: &StkPushRequest,
    ) -> Result<TransactionAck, ApiError>;

    async fn transaction_status(
        &self,
        token: &AuthToken,
        transaction_id: &str,
    ) -> Result<TransactionAck, ApiError>;
}
