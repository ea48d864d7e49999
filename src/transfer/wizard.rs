//! TransferWizard
//!
//! Async driver around [`TransferMachine`]: reads the advisory balance from
//! the session, runs the directory search and hands the finished order to
//! the [`PaymentDispatcher`].
//!
//! The backend call runs on its own task. Dropping the `submit` future (or
//! the whole wizard) does not cancel it: the payment still completes and the
//! session is still refreshed, only the wizard no longer observes it. A
//! wizard whose `submit` future was dropped stays in `Submitting` until
//! [`TransferWizard::resume`] collects the outcome.

use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use super::draft::TransferDraft;
use super::error::WizardError;
use super::machine::{TransferMachine, WizardEvent};
use super::search::{RecipientSearch, SearchOutcome};
use super::state::WizardStep;
use crate::api::DirectoryApi;
use crate::codec::{self, CodePayload};
use crate::config::TransferConfig;
use crate::core_types::Recipient;
use crate::money;
use crate::payment::{PaymentDispatcher, PaymentError, TransferResult};
use crate::session::SessionStore;

type Submission = JoinHandle<Result<TransferResult, PaymentError>>;

pub struct TransferWizard {
    machine: TransferMachine,
    session: Arc<SessionStore>,
    dispatcher: Arc<PaymentDispatcher>,
    search: RecipientSearch,
    in_flight: Option<Submission>,
}

impl TransferWizard {
    pub fn new(
        session: Arc<SessionStore>,
        dispatcher: Arc<PaymentDispatcher>,
        directory: Arc<dyn DirectoryApi>,
        config: &TransferConfig,
    ) -> Self {
        Self {
            machine: TransferMachine::new(config.max_note_chars),
            search: RecipientSearch::new(directory, Arc::clone(&session), config),
            session,
            dispatcher,
            in_flight: None,
        }
    }

    pub fn step(&self) -> WizardStep {
        self.machine.step()
    }

    pub fn draft(&self) -> &TransferDraft {
        self.machine.draft()
    }

    pub fn last_failure(&self) -> Option<&PaymentError> {
        self.machine.last_failure()
    }

    pub fn result(&self) -> Option<&TransferResult> {
        self.machine.result()
    }

    /// Latest wallet balance in minor units; no wallet means nothing to spend.
    fn available_minor(&self) -> u64 {
        self.session
            .wallet()
            .map(|wallet| wallet.balance_minor())
            .unwrap_or(0)
    }

    fn apply(&mut self, event: WizardEvent) -> Result<WizardStep, WizardError> {
        let available = self.available_minor();
        self.machine.apply(event, available)
    }

    // ========================================================================
    // Step 1: recipient
    // ========================================================================

    pub async fn search(&self, query: &str) -> Result<SearchOutcome, WizardError> {
        if self.step() != WizardStep::RecipientSelection {
            return Err(WizardError::InvalidTransition {
                step: self.step(),
                event: "Search",
            });
        }
        self.search.search(query).await
    }

    pub fn select_recipient(&mut self, recipient: Recipient) -> Result<WizardStep, WizardError> {
        self.apply(WizardEvent::SelectRecipient(recipient))
    }

    /// Decode a scanned string and apply it. A bad code changes nothing.
    pub fn scan(&mut self, raw: &str) -> Result<WizardStep, WizardError> {
        let payload = codec::decode(raw).inspect_err(|e| {
            warn!(error = %e, "Rejected scanned code");
        })?;
        self.apply_code(payload)
    }

    pub fn apply_code(&mut self, payload: CodePayload) -> Result<WizardStep, WizardError> {
        self.apply(WizardEvent::ApplyCode(payload))
    }

    // ========================================================================
    // Steps 2-3: amount and recap
    // ========================================================================

    /// `amount` is user text in major units, e.g. `"500"` or `"99.50"`.
    pub fn enter_amount(&mut self, amount: &str, note: &str) -> Result<WizardStep, WizardError> {
        let amount_minor = money::parse_amount(amount)?;
        self.enter_amount_minor(amount_minor, note)
    }

    pub fn enter_amount_minor(
        &mut self,
        amount_minor: u64,
        note: &str,
    ) -> Result<WizardStep, WizardError> {
        self.apply(WizardEvent::EnterAmount {
            amount_minor,
            note: note.to_string(),
        })
    }

    pub fn set_fee(&mut self, fee_minor: u64) -> Result<WizardStep, WizardError> {
        self.apply(WizardEvent::SetFee(fee_minor))
    }

    pub fn confirm(&mut self) -> Result<WizardStep, WizardError> {
        self.apply(WizardEvent::Confirm)
    }

    // ========================================================================
    // Step 4: PIN
    // ========================================================================

    pub fn push_digit(&mut self, digit: char) -> Result<WizardStep, WizardError> {
        self.apply(WizardEvent::PinDigit(digit))
    }

    pub fn backspace(&mut self) -> Result<WizardStep, WizardError> {
        self.apply(WizardEvent::PinBackspace)
    }

    pub fn back(&mut self, target: WizardStep) -> Result<WizardStep, WizardError> {
        self.apply(WizardEvent::Back(target))
    }

    // ========================================================================
    // Step 5: submission
    // ========================================================================

    /// Submit with the four entered digits. On failure the wizard has already
    /// moved to the step matching the failure class, and the reason stays
    /// available from `last_failure()`.
    pub async fn submit(&mut self) -> Result<TransferResult, WizardError> {
        if self.in_flight.is_some() {
            return Err(WizardError::SubmissionInFlight);
        }
        self.apply(WizardEvent::SubmitPin)?;

        let order = match self.machine.pending_order() {
            Ok(order) => order,
            Err(e) => {
                // Draft incomplete: treat as a local validation failure
                let failure = PaymentError::Validation(e.to_string());
                self.apply(WizardEvent::Resolve(Err(failure.clone())))?;
                return Err(WizardError::Payment(failure));
            }
        };

        let dispatcher = Arc::clone(&self.dispatcher);
        let session = Arc::clone(&self.session);
        self.in_flight = Some(tokio::spawn(async move {
            let outcome = dispatcher.dispatch(&order).await;
            if outcome.is_ok() {
                let refreshed = session.refresh().await;
                info!(refresh = ?refreshed, "Post-transfer balance refresh");
            }
            outcome
        }));

        self.resume().await
    }

    /// Wait for a submission whose `submit` future was dropped.
    pub async fn resume(&mut self) -> Result<TransferResult, WizardError> {
        let step = self.step();
        let Some(handle) = self.in_flight.as_mut() else {
            return Err(WizardError::InvalidTransition {
                step,
                event: "Resume",
            });
        };

        let outcome = match handle.await {
            Ok(outcome) => outcome,
            Err(e) => {
                // Outcome unknown: must not look retryable
                warn!(error = %e, "Submission task did not finish");
                Err(PaymentError::Business(
                    "Payment status unknown, check your balance before trying again".to_string(),
                ))
            }
        };
        self.in_flight = None;

        self.apply(WizardEvent::Resolve(outcome.clone()))?;
        info!(step = %self.step(), "Submission resolved");
        outcome.map_err(WizardError::Payment)
    }

    pub fn is_submitting(&self) -> bool {
        self.in_flight.is_some()
    }

    /// Discard the wizard. An outstanding submission still runs to completion
    /// and refreshes the session.
    pub fn cancel(self) {
        if self.in_flight.is_some() {
            info!("Wizard closed with a submission in flight");
        }
    }
}
