//! Backend Error Types

use thiserror::Error;

/// Outcome of a failed backend call, before any domain classification.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ApiError {
    /// HTTP 401: the bearer token is missing, expired or revoked
    #[error("{0}")]
    Unauthorized(String),

    /// The backend answered and refused the request
    #[error("{message}")]
    Rejected {
        status: u16,
        code: Option<String>,
        message: String,
    },

    #[error("Request timed out")]
    Timeout,

    #[error("Network error: {0}")]
    Network(String),

    /// The backend answered with a body we could not understand
    #[error("Invalid response: {0}")]
    Decode(String),
}

impl ApiError {
    #[inline]
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, ApiError::Unauthorized(_))
    }

    /// Failures where the request most likely never reached the ledger.
    pub fn is_transient(&self) -> bool {
        match self {
            ApiError::Timeout | ApiError::Network(_) => true,
            ApiError::Rejected { status, .. } => matches!(status, 408 | 429 | 502 | 503 | 504),
            ApiError::Unauthorized(_) | ApiError::Decode(_) => false,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            ApiError::Unauthorized(_) => "UNAUTHORIZED",
            ApiError::Rejected { .. } => "REJECTED",
            ApiError::Timeout => "TIMEOUT",
            ApiError::Network(_) => "NETWORK_ERROR",
            ApiError::Decode(_) => "INVALID_RESPONSE",
        }
    }
}

impl From<reqwest::Error> for ApiError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            ApiError::Timeout
        } else if e.is_decode() {
            ApiError::Decode(e.to_string())
        } else {
            ApiError::Network(e.to_string())
        }
    }
}
