//! Transfer Machine
//!
//! The wizard as a pure transition function: `(step, draft) + event ->
//! (step', draft')`. No I/O, no clock; the async driver in `wizard.rs` feeds
//! it events and the backend outcome.
//!
//! A rejected event leaves step and draft untouched.
//!
//! # Submission outcomes
//!
//! | Outcome | Next step | Draft |
//! |---------|-----------|-------|
//! | accepted | `Completed` | PIN cleared |
//! | wrong PIN / validation | `PinAuthentication` | PIN cleared |
//! | business rejection | `AmountEntry` | payee and amount kept, PIN cleared |
//! | transient | `Confirmation` | kept, PIN included |
//! | unauthorized | `Completed` (rejected) | PIN cleared |

use tracing::debug;
use ulid::Ulid;

use super::draft::{Payee, TransferDraft};
use super::error::WizardError;
use super::state::WizardStep;
use crate::codec::CodePayload;
use crate::core_types::Recipient;
use crate::money;
use crate::payment::{FailureClass, PaymentError, PaymentOrder, TransferResult, TransferStatus};

#[derive(Debug, Clone)]
pub enum WizardEvent {
    SelectRecipient(Recipient),
    /// A decoded receive or payment code
    ApplyCode(CodePayload),
    EnterAmount {
        amount_minor: u64,
        note: String,
    },
    /// Server-supplied fee for the confirmation recap
    SetFee(u64),
    Confirm,
    PinDigit(char),
    PinBackspace,
    SubmitPin,
    Back(WizardStep),
    /// Backend outcome of the submission
    Resolve(Result<TransferResult, PaymentError>),
}

impl WizardEvent {
    pub fn name(&self) -> &'static str {
        match self {
            WizardEvent::SelectRecipient(_) => "SelectRecipient",
            WizardEvent::ApplyCode(_) => "ApplyCode",
            WizardEvent::EnterAmount { .. } => "EnterAmount",
            WizardEvent::SetFee(_) => "SetFee",
            WizardEvent::Confirm => "Confirm",
            WizardEvent::PinDigit(_) => "PinDigit",
            WizardEvent::PinBackspace => "PinBackspace",
            WizardEvent::SubmitPin => "SubmitPin",
            WizardEvent::Back(_) => "Back",
            WizardEvent::Resolve(_) => "Resolve",
        }
    }
}

#[derive(Debug, Clone)]
pub struct TransferMachine {
    step: WizardStep,
    draft: TransferDraft,
    max_note_chars: usize,
    last_failure: Option<PaymentError>,
    result: Option<TransferResult>,
}

impl TransferMachine {
    pub fn new(max_note_chars: usize) -> Self {
        Self {
            step: WizardStep::RecipientSelection,
            draft: TransferDraft::new(),
            max_note_chars,
            last_failure: None,
            result: None,
        }
    }

    pub fn step(&self) -> WizardStep {
        self.step
    }

    pub fn draft(&self) -> &TransferDraft {
        &self.draft
    }

    /// Reason of the last failed submission, until the next one starts
    pub fn last_failure(&self) -> Option<&PaymentError> {
        self.last_failure.as_ref()
    }

    pub fn result(&self) -> Option<&TransferResult> {
        self.result.as_ref()
    }

    /// The order to send, once the machine is in `Submitting`.
    pub fn pending_order(&self) -> Result<PaymentOrder, WizardError> {
        if self.step != WizardStep::Submitting {
            return Err(WizardError::InvalidTransition {
                step: self.step,
                event: "Dispatch",
            });
        }
        Ok(PaymentOrder::from_draft(&self.draft)?)
    }

    fn reject(&self, event: &WizardEvent) -> WizardError {
        if self.step == WizardStep::Submitting {
            return WizardError::SubmissionInFlight;
        }
        WizardError::InvalidTransition {
            step: self.step,
            event: event.name(),
        }
    }

    /// Apply one event. `available_minor` is the advisory wallet balance at
    /// the time of the call.
    pub fn apply(
        &mut self,
        event: WizardEvent,
        available_minor: u64,
    ) -> Result<WizardStep, WizardError> {
        let from = self.step;
        match (self.step, event) {
            (WizardStep::RecipientSelection, WizardEvent::SelectRecipient(recipient)) => {
                if recipient.id.is_empty() {
                    return Err(WizardError::InvalidRecipient);
                }
                self.draft.payee = Some(Payee::User(recipient));
                self.step = WizardStep::AmountEntry;
            }

            (WizardStep::RecipientSelection, WizardEvent::ApplyCode(payload)) => {
                match payload {
                    CodePayload::Receive(intent) => {
                        self.draft.payee = Some(Payee::User(intent.to_recipient()));
                    }
                    CodePayload::Payment(intent) => {
                        // Suggestion only: AmountEntry validates whatever is finally entered
                        self.draft.amount_minor =
                            intent.amount.and_then(|a| money::decimal_to_minor(a).ok());
                        self.draft.payee = Some(Payee::Merchant {
                            name: intent.merchant_name,
                            reference: intent.reference,
                        });
                    }
                }
                self.step = WizardStep::AmountEntry;
            }

            (WizardStep::AmountEntry, WizardEvent::EnterAmount { amount_minor, note }) => {
                if amount_minor == 0 {
                    return Err(WizardError::InvalidAmount);
                }
                if amount_minor > available_minor {
                    return Err(WizardError::InsufficientBalance {
                        requested: amount_minor,
                        available: available_minor,
                    });
                }
                let note = note.trim();
                if note.chars().count() > self.max_note_chars {
                    return Err(WizardError::NoteTooLong {
                        max: self.max_note_chars,
                    });
                }
                self.draft.amount_minor = Some(amount_minor);
                self.draft.note = note.to_string();
                self.draft.fee_minor = 0;
                self.step = WizardStep::Confirmation;
            }

            (WizardStep::Confirmation, WizardEvent::SetFee(fee_minor)) => {
                self.draft.fee_minor = fee_minor;
            }

            (WizardStep::Confirmation, WizardEvent::Confirm) => {
                self.step = WizardStep::PinAuthentication;
            }

            (WizardStep::PinAuthentication, WizardEvent::PinDigit(digit)) => {
                self.draft.pin.push(digit)?;
            }

            (WizardStep::PinAuthentication, WizardEvent::PinBackspace) => {
                self.draft.pin.backspace();
            }

            (WizardStep::PinAuthentication, WizardEvent::SubmitPin) => {
                // Fails with Incomplete and stays put
                self.draft.pin.to_pin()?;
                self.last_failure = None;
                self.step = WizardStep::Submitting;
            }

            (WizardStep::Submitting, WizardEvent::Resolve(outcome)) => {
                self.resolve(outcome);
            }

            (step, WizardEvent::Back(target)) if step.allows_back() && target < step => {
                self.back_to(target);
            }

            (_, event) => return Err(self.reject(&event)),
        }

        if from != self.step {
            debug!(from = %from, to = %self.step, "Wizard transition");
        }
        Ok(self.step)
    }

    fn resolve(&mut self, outcome: Result<TransferResult, PaymentError>) {
        match outcome {
            Ok(result) => {
                self.draft.pin.clear();
                self.result = Some(result);
                self.step = WizardStep::Completed;
            }
            Err(err) => {
                match err.class() {
                    FailureClass::Validation => {
                        self.draft.pin.clear();
                        self.step = WizardStep::PinAuthentication;
                    }
                    FailureClass::Business => {
                        self.draft.pin.clear();
                        self.step = WizardStep::AmountEntry;
                    }
                    FailureClass::Transient => {
                        self.step = WizardStep::Confirmation;
                    }
                    FailureClass::Unauthorized => {
                        self.draft.pin.clear();
                        self.result = Some(TransferResult::new(
                            TransferStatus::Rejected(err.to_string()),
                            None,
                            Ulid::new(),
                        ));
                        self.step = WizardStep::Completed;
                    }
                }
                self.last_failure = Some(err);
            }
        }
    }

    /// Clear everything strictly downstream of `target`.
    fn back_to(&mut self, target: WizardStep) {
        match target {
            WizardStep::RecipientSelection => {
                self.draft.clear_amount();
                self.draft.pin.clear();
            }
            WizardStep::AmountEntry => {
                self.draft.fee_minor = 0;
                self.draft.pin.clear();
            }
            WizardStep::Confirmation => {
                self.draft.pin.clear();
            }
            _ => {}
        }
        self.last_failure = None;
        self.step = target;
    }
}
