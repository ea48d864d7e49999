use thiserror::Error;

use crate::api::ApiError;
use crate::storage::CacheError;

#[derive(Error, Debug)]
pub enum SessionError {
    /// The backend refused the credentials or the registration; the message
    /// is the backend's, unchanged.
    #[error("{0}")]
    Rejected(String),

    #[error(transparent)]
    Backend(ApiError),

    #[error("Invalid auth response: {0}")]
    InvalidResponse(String),

    #[error("Failed to persist session: {0}")]
    Storage(#[from] CacheError),

    #[error("Failed to encode session data: {0}")]
    Encode(#[from] serde_json::Error),
}

impl SessionError {
    /// Classify a failed login/register call. A 401 here means bad
    /// credentials, not a revoked session.
    pub(crate) fn from_auth_failure(e: ApiError) -> Self {
        match e {
            ApiError::Unauthorized(message) => SessionError::Rejected(message),
            ApiError::Rejected { message, .. } => SessionError::Rejected(message),
            other => SessionError::Backend(other),
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            SessionError::Rejected(_) => "AUTH_REJECTED",
            SessionError::Backend(e) => e.code(),
            SessionError::InvalidResponse(_) => "INVALID_RESPONSE",
            SessionError::Storage(_) => "STORAGE_ERROR",
            SessionError::Encode(_) => "ENCODE_ERROR",
        }
    }
}
