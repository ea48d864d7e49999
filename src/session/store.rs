//! SessionStore
//!
//! Single owner of "who is logged in". Reads and writes the three session
//! keys through [`PersistentCache`] and publishes every change on a `watch`
//! channel.
//!
//! # Ordering
//!
//! - `load()` runs once; `ready()` resolves only after it settled
//! - every login/register/logout bumps an epoch; a refresh that started in an
//!   older epoch is discarded when it completes
//! - refreshes take increasing tickets and a result is applied only if its
//!   ticket is newer than the last applied one
//! - cache writes and the publish that follows them happen under one write
//!   lock, so a logout never interleaves with a login or refresh mid-write

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use tokio::sync::{Mutex, watch};
use tracing::{debug, error, info, warn};

use super::error::SessionError;
use super::types::{AuthPhase, AuthToken, Session, SessionSnapshot, UserProfile, WalletSnapshot};
use crate::api::{ApiError, AuthApi, AuthPayload, LoginRequest, ProfilePayload, RegistrationForm};
use crate::storage::PersistentCache;

pub const TOKEN_KEY: &str = "authToken";
pub const USER_KEY: &str = "userData";
pub const WALLET_KEY: &str = "walletData";
pub const SESSION_KEYS: [&str; 3] = [TOKEN_KEY, USER_KEY, WALLET_KEY];

/// Result of a [`SessionStore::refresh`] call. Failures are already logged.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshOutcome {
    /// No token, nothing to refresh
    Skipped,
    Applied,
    /// A newer refresh, a logout or a login landed first
    Stale,
    /// The backend rejected the token; the session was torn down
    Expired,
    /// Transient failure; the cached session is untouched
    Failed,
}

pub struct SessionStore {
    cache: Arc<dyn PersistentCache>,
    auth: Arc<dyn AuthApi>,
    state: watch::Sender<SessionSnapshot>,
    /// Held across every cache write and the state change it backs
    writes: Mutex<()>,
    load_started: AtomicBool,
    epoch: AtomicU64,
    refresh_ticket: AtomicU64,
    applied_ticket: AtomicU64,
}

impl SessionStore {
    pub fn new(cache: Arc<dyn PersistentCache>, auth: Arc<dyn AuthApi>) -> Self {
        let (state, _) = watch::channel(SessionSnapshot::with_phase(AuthPhase::Uninitialized));
        Self {
            cache,
            auth,
            state,
            writes: Mutex::new(()),
            load_started: AtomicBool::new(false),
            epoch: AtomicU64::new(0),
            refresh_ticket: AtomicU64::new(0),
            applied_ticket: AtomicU64::new(0),
        }
    }

    // ========================================================================
    // Read side
    // ========================================================================

    pub fn snapshot(&self) -> SessionSnapshot {
        self.state.borrow().clone()
    }

    pub fn phase(&self) -> AuthPhase {
        self.state.borrow().phase()
    }

    pub fn is_authenticated(&self) -> bool {
        self.state.borrow().is_authenticated()
    }

    pub fn token(&self) -> Option<AuthToken> {
        self.state.borrow().session().map(|s| s.token.clone())
    }

    pub fn user(&self) -> Option<UserProfile> {
        self.state.borrow().session().map(|s| s.user.clone())
    }

    pub fn wallet(&self) -> Option<WalletSnapshot> {
        self.state.borrow().session().and_then(|s| s.wallet.clone())
    }

    /// Change notifications for UI bindings.
    pub fn subscribe(&self) -> watch::Receiver<SessionSnapshot> {
        self.state.subscribe()
    }

    /// Wait until loading has settled into `Authenticated` or `Anonymous`.
    pub async fn ready(&self) -> AuthPhase {
        let mut rx = self.state.subscribe();
        match rx.wait_for(|snapshot| snapshot.phase().is_settled()).await {
            Ok(snapshot) => snapshot.phase(),
            // Sender lives as long as self
            Err(_) => AuthPhase::Anonymous,
        }
    }

    // ========================================================================
    // Lifecycle
    // ========================================================================

    /// Restore the session from the cache. Runs at most once; later calls
    /// wait for the first one. Never fails: unreadable state means Anonymous.
    pub async fn load(&self) -> AuthPhase {
        if self.load_started.swap(true, Ordering::SeqCst) {
            return self.ready().await;
        }

        let epoch = self.epoch.load(Ordering::SeqCst);
        self.state.send_if_modified(|snapshot| {
            if snapshot.phase() == AuthPhase::Uninitialized {
                *snapshot = SessionSnapshot::with_phase(AuthPhase::Loading);
                true
            } else {
                false
            }
        });

        let restored = match self.read_cached().await {
            Ok(session) => session,
            Err(e) => {
                warn!(error = %e, "Failed to restore cached session");
                None
            }
        };

        self.state.send_if_modified(|snapshot| {
            // A login that completed while we were reading wins
            if self.epoch.load(Ordering::SeqCst) != epoch {
                return false;
            }
            *snapshot = match restored {
                Some(session) => SessionSnapshot::authenticated(session),
                None => SessionSnapshot::with_phase(AuthPhase::Anonymous),
            };
            true
        });

        let phase = self.phase();
        info!(phase = %phase, "Session loaded");
        phase
    }

    async fn read_cached(&self) -> Result<Option<Session>, SessionError> {
        let token = match self.cache.get(TOKEN_KEY).await? {
            Some(bytes) => AuthToken::new(String::from_utf8_lossy(&bytes).into_owned()),
            None => return Ok(None),
        };
        if token.is_empty() {
            return Ok(None);
        }

        let user: UserProfile = match self.cache.get(USER_KEY).await? {
            Some(bytes) => serde_json::from_slice(&bytes)?,
            None => return Ok(None),
        };

        let wallet = match self.cache.get(WALLET_KEY).await {
            Ok(Some(bytes)) => match serde_json::from_slice::<WalletSnapshot>(&bytes) {
                Ok(wallet) => Some(wallet),
                Err(e) => {
                    warn!(error = %e, "Ignoring unreadable cached wallet");
                    None
                }
            },
            Ok(None) => None,
            Err(e) => {
                warn!(error = %e, "Ignoring unreadable cached wallet");
                None
            }
        };

        Ok(Some(Session {
            user,
            wallet,
            token,
        }))
    }

    pub async fn login(&self, identifier: &str, password: &str) -> Result<Session, SessionError> {
        let request = LoginRequest::new(identifier, password);
        let payload = self.auth.login(&request).await.map_err(|e| {
            warn!(error = %e, "Login failed");
            SessionError::from_auth_failure(e)
        })?;
        self.establish(payload, "login").await
    }

    pub async fn register(&self, form: &RegistrationForm) -> Result<Session, SessionError> {
        let payload = self.auth.register(form).await.map_err(|e| {
            warn!(error = %e, "Registration failed");
            SessionError::from_auth_failure(e)
        })?;
        self.establish(payload, "register").await
    }

    /// Persist first, then publish. On any failure the previous in-memory
    /// session stays as it was.
    async fn establish(
        &self,
        payload: AuthPayload,
        origin: &'static str,
    ) -> Result<Session, SessionError> {
        if payload.token.is_empty() {
            return Err(SessionError::InvalidResponse("empty token".to_string()));
        }

        let session = Session {
            user: payload.user,
            wallet: payload.wallet,
            token: payload.token,
        };

        let _writes = self.writes.lock().await;
        if let Err(e) = self.persist(&session).await {
            error!(error = %e, origin = origin, "Failed to persist new session");
            self.restore_cache().await;
            return Err(e);
        }

        self.epoch.fetch_add(1, Ordering::SeqCst);
        self.load_started.store(true, Ordering::SeqCst);
        self.state
            .send_replace(SessionSnapshot::authenticated(session.clone()));
        info!(user_id = %session.user.id, origin = origin, "Session established");
        Ok(session)
    }

    /// Clear local state unconditionally, then revoke the token remotely on a
    /// best-effort basis.
    pub async fn logout(&self) {
        if let Some(token) = self.clear("logout").await
            && let Err(e) = self.auth.revoke(&token).await
        {
            warn!(error = %e, "Remote token revocation failed");
        }
    }

    /// Tear down after the backend rejected our token. No remote call.
    pub async fn expire(&self) {
        self.clear("unauthorized").await;
    }

    async fn clear(&self, reason: &'static str) -> Option<AuthToken> {
        let _writes = self.writes.lock().await;
        self.epoch.fetch_add(1, Ordering::SeqCst);
        self.load_started.store(true, Ordering::SeqCst);
        let previous = self
            .state
            .send_replace(SessionSnapshot::with_phase(AuthPhase::Anonymous));

        if let Err(e) = self.cache.remove_many(&SESSION_KEYS).await {
            error!(error = %e, "Failed to clear cached session");
        }

        info!(reason = reason, "Session cleared");
        previous.into_session().map(|s| s.token)
    }

    /// Re-fetch profile and wallet. Never clears a valid session on a
    /// transient failure; only a rejected token tears it down.
    pub async fn refresh(&self) -> RefreshOutcome {
        let Some(token) = self.token() else {
            return RefreshOutcome::Skipped;
        };
        let epoch = self.epoch.load(Ordering::SeqCst);
        let ticket = self.refresh_ticket.fetch_add(1, Ordering::SeqCst) + 1;

        match self.auth.profile(&token).await {
            Ok(profile) => self.apply_refresh(epoch, ticket, profile).await,
            Err(e) if e.is_unauthorized() => {
                if self.epoch.load(Ordering::SeqCst) != epoch {
                    return RefreshOutcome::Stale;
                }
                warn!(error = %e, "Profile refresh rejected, ending session");
                self.expire().await;
                RefreshOutcome::Expired
            }
            Err(e) => {
                warn!(error = %e, ticket = ticket, "Profile refresh failed");
                RefreshOutcome::Failed
            }
        }
    }

    async fn apply_refresh(&self, epoch: u64, ticket: u64, profile: ProfilePayload) -> RefreshOutcome {
        let _writes = self.writes.lock().await;
        // Login and logout bump the epoch under the same lock
        if self.epoch.load(Ordering::SeqCst) != epoch
            || !self.is_authenticated()
            || !advance_if_greater(&self.applied_ticket, ticket)
        {
            debug!(ticket = ticket, "Discarding stale profile refresh");
            return RefreshOutcome::Stale;
        }

        if let Err(e) = self.persist_profile(&profile.user, profile.wallet.as_ref()).await {
            error!(error = %e, "Failed to cache refreshed profile");
        }
        self.state.send_if_modified(|snapshot| {
            let Some(session) = snapshot.session_mut() else {
                return false;
            };
            session.user = profile.user;
            session.wallet = profile.wallet;
            true
        });
        debug!(ticket = ticket, "Profile refreshed");
        RefreshOutcome::Applied
    }

    /// Apply the unauthorized rule to any backend result obtained with
    /// `token`: the session is torn down before the error propagates.
    pub async fn guard<T>(
        &self,
        token: &AuthToken,
        result: Result<T, ApiError>,
    ) -> Result<T, ApiError> {
        if let Err(e) = &result
            && e.is_unauthorized()
            && self.token().as_ref() == Some(token)
        {
            warn!(error = %e, "Backend rejected session token");
            self.expire().await;
        }
        result
    }

    // ========================================================================
    // Cache helpers
    // ========================================================================

    async fn persist(&self, session: &Session) -> Result<(), SessionError> {
        self.cache
            .set(TOKEN_KEY, session.token.expose().as_bytes())
            .await?;
        self.persist_profile(&session.user, session.wallet.as_ref())
            .await
    }

    async fn persist_profile(
        &self,
        user: &UserProfile,
        wallet: Option<&WalletSnapshot>,
    ) -> Result<(), SessionError> {
        self.cache
            .set(USER_KEY, &serde_json::to_vec(user)?)
            .await?;
        match wallet {
            Some(wallet) => {
                self.cache
                    .set(WALLET_KEY, &serde_json::to_vec(wallet)?)
                    .await?
            }
            None => self.cache.remove(WALLET_KEY).await?,
        }
        Ok(())
    }

    /// Put the cache back in line with the in-memory session after a failed
    /// write, so a restart never resurrects a half-written login.
    async fn restore_cache(&self) {
        let current = self.state.borrow().session().cloned();
        let restored = match current {
            Some(session) => self.persist(&session).await,
            None => self
                .cache
                .remove_many(&SESSION_KEYS)
                .await
                .map_err(SessionError::from),
        };
        if let Err(e) = restored {
            error!(error = %e, "Failed to restore session cache");
        }
    }
}

/// CAS loop: store `value` only if it is greater than the current one.
fn advance_if_greater(slot: &AtomicU64, value: u64) -> bool {
    let mut current = slot.load(Ordering::Acquire);
    loop {
        if value <= current {
            return false;
        }
        match slot.compare_exchange(current, value, Ordering::Release, Ordering::Acquire) {
            Ok(_) => return true,
            Err(actual) => current = actual,
        }
    }
}
