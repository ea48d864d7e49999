//! Debounced directory search for the recipient step.
//!
//! Every call takes a generation number. A call waits out the debounce
//! window and only then hits the directory; if a newer call started in the
//! meantime it returns [`SearchOutcome::Superseded`] without a request. Late
//! responses to superseded queries are dropped the same way.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tracing::debug;

use super::error::WizardError;
use crate::api::DirectoryApi;
use crate::config::TransferConfig;
use crate::core_types::Recipient;
use crate::payment::{PaymentError, classify};
use crate::session::SessionStore;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SearchOutcome {
    /// Query below the minimum length; nothing was sent
    TooShort,
    /// A newer query replaced this one
    Superseded,
    Results(Vec<Recipient>),
}

pub struct RecipientSearch {
    directory: Arc<dyn DirectoryApi>,
    session: Arc<SessionStore>,
    min_chars: usize,
    debounce: Duration,
    generation: AtomicU64,
}

impl RecipientSearch {
    pub fn new(
        directory: Arc<dyn DirectoryApi>,
        session: Arc<SessionStore>,
        config: &TransferConfig,
    ) -> Self {
        Self {
            directory,
            session,
            min_chars: config.search_min_chars,
            debounce: config.search_debounce(),
            generation: AtomicU64::new(0),
        }
    }

    fn is_current(&self, generation: u64) -> bool {
        self.generation.load(Ordering::SeqCst) == generation
    }

    pub async fn search(&self, query: &str) -> Result<SearchOutcome, WizardError> {
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        let query = query.trim();
        if query.chars().count() < self.min_chars {
            return Ok(SearchOutcome::TooShort);
        }

        tokio::time::sleep(self.debounce).await;
        if !self.is_current(generation) {
            return Ok(SearchOutcome::Superseded);
        }

        let token = self.session.token().ok_or_else(|| {
            WizardError::Search(PaymentError::Unauthorized(
                "Please log in again".to_string(),
            ))
        })?;
        let response = self.directory.search_users(&token, query).await;
        let response = self.session.guard(&token, response).await;

        if !self.is_current(generation) {
            debug!(generation = generation, "Dropping stale search results");
            return Ok(SearchOutcome::Superseded);
        }

        let users = response.map_err(|e| WizardError::Search(classify(e)))?;
        debug!(results = users.len(), "Directory search completed");
        Ok(SearchOutcome::Results(users))
    }
}
