//! Session Lifecycle
//!
//! [`SessionStore`] owns the authenticated identity, the bearer token and
//! the last known wallet snapshot. Every other component reads through it
//! and reports unauthorized responses back via [`SessionStore::guard`].

pub mod error;
pub mod store;
pub mod types;

pub use error::SessionError;
pub use store::{RefreshOutcome, SessionStore, TOKEN_KEY, USER_KEY, WALLET_KEY};
pub use types::{AuthPhase, AuthToken, Session, SessionSnapshot, UserProfile, WalletSnapshot};
