//! Send-Money Wizard
//!
//! Five-step flow that turns a recipient and an amount into one backend
//! transaction.
//!
//! # State Machine
//!
//! ```text
//! RECIPIENT → AMOUNT → CONFIRMATION → PIN → SUBMITTING → COMPLETED
//!                ↑           ↑         ↑          │
//!                └───────────┴─────────┴──────────┘
//!                  business / transient / validation failures
//! ```
//!
//! # Invariants
//!
//! 1. **Single Submission**: at most one backend call per wizard at a time
//! 2. **Advisory Balance**: amounts above the cached balance are refused
//!    locally, the backend stays authoritative
//! 3. **PIN Hygiene**: digits are never logged and are cleared whenever the
//!    user leaves the PIN step

pub mod draft;
pub mod error;
pub mod machine;
pub mod pin;
pub mod search;
pub mod state;
pub mod wizard;

mod integration_tests;

pub use draft::{Payee, TransferDraft};
pub use error::WizardError;
pub use machine::{TransferMachine, WizardEvent};
pub use pin::{PIN_LENGTH, Pin, PinBuffer, PinError, PinSetup, PinSetupPhase};
pub use search::{RecipientSearch, SearchOutcome};
pub use state::WizardStep;
pub use wizard::TransferWizard;
