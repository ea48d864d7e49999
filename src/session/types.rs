//! Session Data Model

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::core_types::UserId;
use crate::money;

/// Opaque bearer token. `Debug` never prints the value.
#[derive(Clone, PartialEq, Eq, Deserialize)]
#[serde(transparent)]
pub struct AuthToken(String);

impl AuthToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    /// Raw value, for the `Authorization` header and the cache only.
    #[inline]
    pub fn expose(&self) -> &str {
        &self.0
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.0.trim().is_empty()
    }
}

impl fmt::Debug for AuthToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "AuthToken(<redacted, {} chars>)", self.0.len())
    }
}

/// Identity of the logged-in user, as returned by the backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    #[serde(rename = "_id")]
    pub id: UserId,
    pub first_name: String,
    pub last_name: String,
    #[serde(default)]
    pub email: String,
    pub phone_number: String,
    #[serde(default)]
    pub role: String,
    #[serde(default)]
    pub is_verified: bool,
}

impl UserProfile {
    pub fn display_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
            .trim()
            .to_string()
    }
}

/// Point-in-time copy of the wallet. Advisory only: every money-moving call
/// is re-validated by the backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WalletSnapshot {
    pub balance: Decimal,
    #[serde(default = "default_currency")]
    pub currency: String,
    #[serde(rename = "isPinSet", default)]
    pub pin_configured: bool,
}

fn default_currency() -> String {
    money::CURRENCY.to_string()
}

impl WalletSnapshot {
    pub fn balance_minor(&self) -> u64 {
        money::balance_to_minor(self.balance)
    }
}

/// Authenticated identity plus bearer token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub user: UserProfile,
    /// `walletData` is optional in the cache; its absence does not block
    /// authentication.
    pub wallet: Option<WalletSnapshot>,
    pub token: AuthToken,
}

/// SessionStore lifecycle
///
/// ```text
/// Uninitialized → Loading → Authenticated ⇄ Anonymous
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AuthPhase {
    Uninitialized,
    Loading,
    Authenticated,
    Anonymous,
}

impl AuthPhase {
    /// Loading has finished and the auth state can be read.
    #[inline]
    pub fn is_settled(&self) -> bool {
        matches!(self, AuthPhase::Authenticated | AuthPhase::Anonymous)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            AuthPhase::Uninitialized => "UNINITIALIZED",
            AuthPhase::Loading => "LOADING",
            AuthPhase::Authenticated => "AUTHENTICATED",
            AuthPhase::Anonymous => "ANONYMOUS",
        }
    }
}

impl fmt::Display for AuthPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// What subscribers observe. `session.is_some()` exactly when the phase is
/// `Authenticated`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionSnapshot {
    phase: AuthPhase,
    session: Option<Session>,
}

impl SessionSnapshot {
    pub(crate) fn with_phase(phase: AuthPhase) -> Self {
        debug_assert!(phase != AuthPhase::Authenticated);
        Self {
            phase,
            session: None,
        }
    }

    pub(crate) fn authenticated(session: Session) -> Self {
        Self {
            phase: AuthPhase::Authenticated,
            session: Some(session),
        }
    }

    pub(crate) fn session_mut(&mut self) -> Option<&mut Session> {
        self.session.as_mut()
    }

    #[inline]
    pub fn phase(&self) -> AuthPhase {
        self.phase
    }

    pub fn session(&self) -> Option<&Session> {
        self.session.as_ref()
    }

    #[inline]
    pub fn is_authenticated(&self) -> bool {
        self.session.is_some()
    }

    pub fn into_session(self) -> Option<Session> {
        self.session
    }
}
