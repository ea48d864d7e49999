//! PaymentDispatcher
//!
//! Single choke point between a finalized order and the backend. Exactly one
//! backend call per `dispatch`; failures come back classified and are never
//! retried here, since the transaction endpoints carry no idempotency key.
//! A `Pending` result is settled later with [`PaymentDispatcher::recheck`],
//! which only reads the backend's status for the transaction.

use std::sync::Arc;
use tracing::{debug, info, warn};
use ulid::Ulid;

use super::error::{PaymentError, classify};
use super::types::{PaymentOrder, PaymentTarget, TopUpRequest, TransferResult, TransferStatus};
use crate::api::{MerchantPaymentRequest, SendMoneyRequest, StkPushRequest, TransactionExecutor};
use crate::codec::CodePayload;
use crate::config::TopUpConfig;
use crate::money;
use crate::session::{AuthToken, SessionStore};
use crate::transfer::{Pin, TransferDraft};

pub struct PaymentDispatcher {
    executor: Arc<dyn TransactionExecutor>,
    session: Arc<SessionStore>,
    top_up_limits: TopUpConfig,
}

impl PaymentDispatcher {
    pub fn new(
        executor: Arc<dyn TransactionExecutor>,
        session: Arc<SessionStore>,
        top_up_limits: TopUpConfig,
    ) -> Self {
        Self {
            executor,
            session,
            top_up_limits,
        }
    }

    pub fn session(&self) -> &Arc<SessionStore> {
        &self.session
    }

    fn current_token(&self) -> Result<AuthToken, PaymentError> {
        self.session
            .token()
            .ok_or_else(|| PaymentError::Unauthorized("Please log in again".to_string()))
    }

    pub async fn dispatch(&self, order: &PaymentOrder) -> Result<TransferResult, PaymentError> {
        if order.amount_minor == 0 {
            return Err(PaymentError::Validation(
                "Please enter a valid amount".to_string(),
            ));
        }
        let token = self.current_token()?;
        let attempt_id = Ulid::new();
        let amount = money::minor_to_decimal(order.amount_minor);

        info!(
            attempt_id = %attempt_id,
            payee = order.target.display_name(),
            amount_minor = order.amount_minor,
            "Dispatching payment"
        );

        let response = match &order.target {
            PaymentTarget::User { recipient_id, .. } => {
                let request = SendMoneyRequest {
                    recipient_id: recipient_id.clone(),
                    amount,
                    description: order.note.clone(),
                    pin: order.pin.expose().to_string(),
                };
                self.executor.send_money(&token, &request).await
            }
            PaymentTarget::Merchant { name, reference } => {
                let request = MerchantPaymentRequest {
                    merchant_name: name.clone(),
                    amount,
                    reference: reference.clone(),
                    description: order.note.clone(),
                    pin: order.pin.expose().to_string(),
                };
                self.executor.pay_merchant(&token, &request).await
            }
        };

        let ack = self.session.guard(&token, response).await.map_err(|e| {
            let err = classify(e);
            warn!(
                attempt_id = %attempt_id,
                class = %err.class(),
                code = err.code(),
                error = %err,
                "Payment failed"
            );
            err
        })?;

        let status = TransferStatus::from_backend(&ack.status).inspect_err(|e| {
            warn!(
                attempt_id = %attempt_id,
                status = %ack.status,
                error = %e,
                "Payment refused by backend"
            );
        })?;
        info!(
            attempt_id = %attempt_id,
            status = %status,
            transaction_id = ack.transaction_id.as_deref().unwrap_or("-"),
            "Payment accepted"
        );
        Ok(TransferResult::new(status, ack.transaction_id, attempt_id))
    }

    /// Send a completed wizard draft.
    pub async fn dispatch_draft(
        &self,
        draft: &TransferDraft,
    ) -> Result<TransferResult, PaymentError> {
        let order = PaymentOrder::from_draft(draft)?;
        self.dispatch(&order).await
    }

    /// Pay a decoded code directly. See [`PaymentOrder::from_code`].
    pub async fn dispatch_code(
        &self,
        payload: &CodePayload,
        amount_minor: Option<u64>,
        note: &str,
        pin: Pin,
    ) -> Result<TransferResult, PaymentError> {
        let order = PaymentOrder::from_code(payload, amount_minor, note, pin)?;
        self.dispatch(&order).await
    }

    /// Start an STK push. `Pending` is the normal outcome: the user confirms
    /// on their phone.
    pub async fn top_up(&self, request: &TopUpRequest) -> Result<TransferResult, PaymentError> {
        request.validate(&self.top_up_limits)?;
        let token = self.current_token()?;
        let attempt_id = Ulid::new();

        let body = StkPushRequest {
            amount: money::minor_to_decimal(request.amount_minor),
            phone_number: request.phone_number.trim().to_string(),
            method: request.method.as_str().to_string(),
        };
        info!(attempt_id = %attempt_id, amount_minor = request.amount_minor, "Requesting top-up");

        let response = self.executor.top_up(&token, &body).await;
        let ack = self.session.guard(&token, response).await.map_err(|e| {
            let err = classify(e);
            warn!(attempt_id = %attempt_id, class = %err.class(), error = %err, "Top-up failed");
            err
        })?;

        let status = TransferStatus::from_backend(&ack.status)?;
        info!(attempt_id = %attempt_id, status = %status, "Top-up accepted");
        Ok(TransferResult::new(status, ack.transaction_id, attempt_id))
    }

    /// Current backend status of a transaction. A failed transaction comes
    /// back as a `Business` error, same as at submission.
    pub async fn transaction_status(
        &self,
        transaction_id: &str,
    ) -> Result<TransferStatus, PaymentError> {
        let transaction_id = transaction_id.trim();
        if transaction_id.is_empty() {
            return Err(PaymentError::Validation(
                "No transaction to look up".to_string(),
            ));
        }
        let token = self.current_token()?;

        let response = self.executor.transaction_status(&token, transaction_id).await;
        let ack = self.session.guard(&token, response).await.map_err(|e| {
            let err = classify(e);
            warn!(transaction_id, class = %err.class(), error = %err, "Status lookup failed");
            err
        })?;
        let status = TransferStatus::from_backend(&ack.status)?;
        debug!(transaction_id, status = %status, "Transaction status");
        Ok(status)
    }

    /// Re-read a pending result. Settled results are returned as they are;
    /// a pending one that has since completed refreshes the session so the
    /// balance catches up.
    pub async fn recheck(&self, result: &TransferResult) -> Result<TransferResult, PaymentError> {
        if result.status != TransferStatus::Pending {
            return Ok(result.clone());
        }
        let Some(transaction_id) = result.transaction_id.as_deref() else {
            return Err(PaymentError::Validation(
                "The backend did not return a transaction id".to_string(),
            ));
        };

        let status = self.transaction_status(transaction_id).await?;
        if status == TransferStatus::Pending {
            return Ok(result.clone());
        }
        info!(
            attempt_id = %result.attempt_id,
            transaction_id,
            status = %status,
            "Pending transaction settled"
        );
        self.session.refresh().await;
        Ok(TransferResult::new(
            status,
            result.transaction_id.clone(),
            result.attempt_id,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::ApiError;
    use crate::api::mock::{MockBackend, ack, rejected};
    use crate::codec::{PaymentIntent, ReceiveIntent};
    use crate::core_types::UserId;
    use crate::payment::FailureClass;
    use crate::storage::MemoryCache;
    use rust_decimal::Decimal;

    async fn logged_in() -> (Arc<MockBackend>, PaymentDispatcher) {
        let backend = Arc::new(MockBackend::new());
        let session = Arc::new(SessionStore::new(
            Arc::new(MemoryCache::new()),
            backend.clone(),
        ));
        session.load().await;
        session.login("0712345678", "secret1").await.unwrap();
        let dispatcher = PaymentDispatcher::new(backend.clone(), session, TopUpConfig::default());
        (backend, dispatcher)
    }

    fn user_order(amount_minor: u64) -> PaymentOrder {
        PaymentOrder {
            target: PaymentTarget::User {
                recipient_id: UserId::from("u-2"),
                display_name: "Otieno Odhiambo".into(),
            },
            amount_minor,
            note: "rent".into(),
            pin: Pin::parse("1234").unwrap(),
        }
    }

    #[tokio::test]
    async fn test_send_money_request_shape() {
        let (backend, dispatcher) = logged_in().await;
        let result = dispatcher.dispatch(&user_order(50_000)).await.unwrap();
        assert_eq!(result.status, TransferStatus::Completed);
        assert_eq!(result.transaction_id.as_deref(), Some("tx-1"));

        let sent = backend.last_send().unwrap();
        assert_eq!(sent.recipient_id, UserId::from("u-2"));
        assert_eq!(sent.amount, Decimal::from(500));
        assert_eq!(sent.description, "rent");
        assert_eq!(sent.pin, "1234");
        assert_eq!(backend.send_count(), 1);
    }

    #[tokio::test]
    async fn test_code_payload_routes_to_merchant_endpoint() {
        let (backend, dispatcher) = logged_in().await;
        let payload = CodePayload::Payment(PaymentIntent {
            merchant_name: "Naivas".into(),
            amount: Some(Decimal::from(250)),
            reference: Some("INV-9".into()),
        });
        dispatcher
            .dispatch_code(&payload, None, "", Pin::parse("1234").unwrap())
            .await
            .unwrap();

        assert_eq!(backend.send_count(), 0);
        let request = backend.last_merchant().unwrap();
        assert_eq!(request.merchant_name, "Naivas");
        assert_eq!(request.amount, Decimal::from(250));
        assert_eq!(request.reference.as_deref(), Some("INV-9"));
    }

    #[tokio::test]
    async fn test_receive_code_and_draft_share_request_shape() {
        let (backend, dispatcher) = logged_in().await;
        let payload = CodePayload::Receive(ReceiveIntent {
            user_id: UserId::from("u-2"),
            name: "Otieno Odhiambo".into(),
            phone_number: "0798765432".into(),
        });
        dispatcher
            .dispatch_code(&payload, Some(50_000), "rent", Pin::parse("1234").unwrap())
            .await
            .unwrap();
        let from_code = backend.last_send().unwrap();

        dispatcher.dispatch(&user_order(50_000)).await.unwrap();
        let from_order = backend.last_send().unwrap();

        assert_eq!(
            serde_json::to_value(&from_code).unwrap(),
            serde_json::to_value(&from_order).unwrap()
        );
    }

    #[tokio::test]
    async fn test_zero_amount_never_reaches_network() {
        let (backend, dispatcher) = logged_in().await;
        let err = dispatcher.dispatch(&user_order(0)).await.unwrap_err();
        assert_eq!(err.class(), FailureClass::Validation);
        assert_eq!(backend.send_count(), 0);
    }

    #[tokio::test]
    async fn test_failures_are_classified_and_not_retried() {
        let (backend, dispatcher) = logged_in().await;
        backend.push_transaction(Err(ApiError::Timeout));
        let err = dispatcher.dispatch(&user_order(1_000)).await.unwrap_err();
        assert!(err.is_retryable());
        assert_eq!(backend.send_count(), 1);

        backend.push_transaction(Err(rejected(
            400,
            Some("INSUFFICIENT_FUNDS"),
            "Insufficient funds",
        )));
        let err = dispatcher.dispatch(&user_order(1_000)).await.unwrap_err();
        assert_eq!(err, PaymentError::InsufficientFunds("Insufficient funds".into()));

        backend.push_transaction(Ok(ack("failed")));
        let err = dispatcher.dispatch(&user_order(1_000)).await.unwrap_err();
        assert_eq!(err.class(), FailureClass::Business);
    }

    #[tokio::test]
    async fn test_unauthorized_tears_down_session() {
        let (backend, dispatcher) = logged_in().await;
        backend.push_transaction(Err(ApiError::Unauthorized("Token expired".into())));

        let err = dispatcher.dispatch(&user_order(1_000)).await.unwrap_err();
        assert_eq!(err.class(), FailureClass::Unauthorized);
        assert!(!dispatcher.session().is_authenticated());

        // Nothing to send with anymore
        let err = dispatcher.dispatch(&user_order(1_000)).await.unwrap_err();
        assert_eq!(err.class(), FailureClass::Unauthorized);
        assert_eq!(backend.send_count(), 1);
    }

    #[tokio::test]
    async fn test_top_up_pending() {
        let (backend, dispatcher) = logged_in().await;
        let result = dispatcher
            .top_up(&TopUpRequest::mpesa(100_000, "0712345678"))
            .await
            .unwrap();
        assert_eq!(result.status, TransferStatus::Pending);

        let sent = backend.last_top_up().unwrap();
        assert_eq!(sent.amount, Decimal::from(1000));
        assert_eq!(sent.method, "mpesa");
    }

    #[tokio::test]
    async fn test_recheck_settles_pending_top_up() {
        let (backend, dispatcher) = logged_in().await;
        let pending = dispatcher
            .top_up(&TopUpRequest::mpesa(100_000, "0712345678"))
            .await
            .unwrap();
        assert_eq!(pending.status, TransferStatus::Pending);
        let profile_reads = backend.profile_count();

        backend.push_status(Ok(ack("processing")));
        let still = dispatcher.recheck(&pending).await.unwrap();
        assert_eq!(still.status, TransferStatus::Pending);
        assert_eq!(backend.profile_count(), profile_reads);

        let settled = dispatcher.recheck(&pending).await.unwrap();
        assert_eq!(settled.status, TransferStatus::Completed);
        assert_eq!(settled.attempt_id, pending.attempt_id);
        assert_eq!(backend.last_status_id().as_deref(), Some("tx-1"));
        assert_eq!(backend.status_count(), 2);
        assert_eq!(backend.profile_count(), profile_reads + 1);
        // Reads only: nothing was resubmitted
        assert_eq!(backend.top_up_count(), 1);
    }

    #[tokio::test]
    async fn test_recheck_reports_failed_transaction() {
        let (backend, dispatcher) = logged_in().await;
        let pending = TransferResult::new(TransferStatus::Pending, Some("tx-9".into()), Ulid::new());
        backend.push_status(Ok(ack("failed")));
        let err = dispatcher.recheck(&pending).await.unwrap_err();
        assert_eq!(err.class(), FailureClass::Business);
    }

    #[tokio::test]
    async fn test_recheck_skips_settled_and_needs_transaction_id() {
        let (backend, dispatcher) = logged_in().await;
        let completed = dispatcher.dispatch(&user_order(1_000)).await.unwrap();
        assert_eq!(dispatcher.recheck(&completed).await.unwrap(), completed);

        let no_id = TransferResult::new(TransferStatus::Pending, None, Ulid::new());
        let err = dispatcher.recheck(&no_id).await.unwrap_err();
        assert_eq!(err.class(), FailureClass::Validation);
        assert_eq!(backend.status_count(), 0);
    }

    #[tokio::test]
    async fn test_status_lookup_unauthorized_tears_down_session() {
        let (backend, dispatcher) = logged_in().await;
        backend.push_status(Err(ApiError::Unauthorized("Token expired".into())));
        let err = dispatcher.transaction_status("tx-1").await.unwrap_err();
        assert_eq!(err.class(), FailureClass::Unauthorized);
        assert!(!dispatcher.session().is_authenticated());
    }

    #[tokio::test]
    async fn test_top_up_validation_is_local() {
        let (backend, dispatcher) = logged_in().await;
        let err = dispatcher
            .top_up(&TopUpRequest::mpesa(100, "0712345678"))
            .await
            .unwrap_err();
        assert_eq!(err.class(), FailureClass::Validation);
        assert_eq!(backend.top_up_count(), 0);
    }
}
