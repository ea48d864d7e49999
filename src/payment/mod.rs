//! Payments
//!
//! [`PaymentDispatcher`] turns a finalized [`PaymentOrder`] (from the send
//! wizard or a scanned code) or a [`TopUpRequest`] into exactly one backend
//! call and classifies the outcome.

pub mod dispatcher;
pub mod error;
pub mod types;

pub use dispatcher::PaymentDispatcher;
pub use error::{FailureClass, PaymentError, classify};
pub use types::{
    PaymentOrder, PaymentTarget, TopUpMethod, TopUpRequest, TransferResult, TransferStatus,
};
