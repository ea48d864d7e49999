//! PesaSoft Core - Mobile Wallet Client Orchestration
//!
//! Everything the wallet screens need besides drawing pixels: the session
//! lifecycle, the send-money wizard, scannable payment codes and the single
//! path through which money actually leaves the wallet.
//!
//! # Modules
//!
//! - [`core_types`] - Shared identifiers and `Recipient`
//! - [`money`] - Minor-unit amount parsing and formatting
//! - [`config`] - YAML client configuration
//! - [`logging`] - Tracing subscriber setup
//! - [`storage`] - Persistent key-value cache
//! - [`api`] - Backend contract and HTTP implementation
//! - [`session`] - Auth session store
//! - [`codec`] - QR payload encode/decode
//! - [`transfer`] - Send-money wizard
//! - [`payment`] - Payment dispatch and failure classification

// Core types - must be first!
pub mod core_types;
pub mod money;

// Ambient
pub mod config;
pub mod logging;

// Infrastructure
pub mod api;
pub mod storage;

// Wallet flows
pub mod codec;
pub mod payment;
pub mod session;
pub mod transfer;

// Convenient re-exports at crate root
pub use api::{ApiError, AuthApi, DirectoryApi, HttpBackend, TransactionExecutor};
pub use codec::{CodePayload, DecodeError, PaymentIntent, ReceiveIntent};
pub use config::ClientConfig;
pub use core_types::{Recipient, UserId};
pub use payment::{
    FailureClass, PaymentDispatcher, PaymentError, TopUpRequest, TransferResult, TransferStatus,
};
pub use session::{AuthPhase, SessionError, SessionSnapshot, SessionStore};
pub use storage::{FileCache, MemoryCache, PersistentCache};
pub use transfer::{TransferWizard, WizardError, WizardStep};
