//! Integration Tests for the Send-Money Wizard
//!
//! Full flows through session, wizard, dispatcher and a scripted backend.

#[cfg(test)]
mod integration_tests {
    use rust_decimal::Decimal;
    use std::sync::Arc;
    use std::time::Duration;

    use crate::api::ApiError;
    use crate::api::mock::{MockBackend, ack, profile_payload, rejected};
    use crate::config::{TopUpConfig, TransferConfig};
    use crate::core_types::Recipient;
    use crate::money::MoneyError;
    use crate::payment::{PaymentDispatcher, PaymentError, TransferStatus};
    use crate::session::SessionStore;
    use crate::storage::MemoryCache;
    use crate::transfer::{Payee, SearchOutcome, TransferWizard, WizardError, WizardStep};

    struct Harness {
        backend: Arc<MockBackend>,
        session: Arc<SessionStore>,
        wizard: TransferWizard,
    }

    /// Logged in as Wanjiru with a cached balance of KES 1,000
    async fn harness() -> Harness {
        let backend = Arc::new(MockBackend::new());
        let session = Arc::new(SessionStore::new(
            Arc::new(MemoryCache::new()),
            backend.clone(),
        ));
        session.load().await;
        let established = session.login("0712345678", "secret1").await.unwrap();
        assert!(!established.token.is_empty());

        let dispatcher = Arc::new(PaymentDispatcher::new(
            backend.clone(),
            session.clone(),
            TopUpConfig::default(),
        ));
        let wizard = TransferWizard::new(
            session.clone(),
            dispatcher,
            backend.clone(),
            &TransferConfig::default(),
        );
        Harness {
            backend,
            session,
            wizard,
        }
    }

    fn otieno() -> Recipient {
        Recipient::new("u-2", "Otieno Odhiambo", "0798765432")
    }

    fn enter_pin(wizard: &mut TransferWizard, digits: &str) {
        for d in digits.chars() {
            wizard.push_digit(d).unwrap();
        }
    }

    /// Recipient chosen, KES 500 entered, confirmed, PIN typed
    fn ready_to_submit(wizard: &mut TransferWizard) {
        wizard.select_recipient(otieno()).unwrap();
        wizard.enter_amount("500", "rent").unwrap();
        wizard.confirm().unwrap();
        enter_pin(wizard, "1234");
    }

    // ========================================================================
    // Happy Path
    // ========================================================================

    #[tokio::test(start_paused = true)]
    async fn test_send_money_completes_and_refreshes_balance() {
        let mut h = harness().await;
        h.backend.set_search_results(Ok(vec![otieno()]));
        h.backend.push_profile(Ok(profile_payload(500)));

        let SearchOutcome::Results(users) = h.wizard.search("0798765432").await.unwrap() else {
            panic!("expected search results");
        };
        assert_eq!(
            h.wizard.select_recipient(users[0].clone()),
            Ok(WizardStep::AmountEntry)
        );
        assert_eq!(
            h.wizard.enter_amount("500", ""),
            Ok(WizardStep::Confirmation)
        );
        assert_eq!(h.wizard.confirm(), Ok(WizardStep::PinAuthentication));
        enter_pin(&mut h.wizard, "1234");

        let result = h.wizard.submit().await.unwrap();
        assert_eq!(result.status, TransferStatus::Completed);
        assert_eq!(h.wizard.step(), WizardStep::Completed);

        let sent = h.backend.last_send().unwrap();
        assert_eq!(sent.amount, Decimal::from(500));
        assert_eq!(sent.pin, "1234");

        assert_eq!(h.backend.profile_count(), 1);
        assert_eq!(
            h.session.wallet().unwrap().balance,
            Decimal::from(500)
        );
    }

    #[tokio::test]
    async fn test_completed_wizard_accepts_nothing() {
        let mut h = harness().await;
        ready_to_submit(&mut h.wizard);
        h.wizard.submit().await.unwrap();

        assert!(h.wizard.back(WizardStep::AmountEntry).is_err());
        assert!(h.wizard.push_digit('1').is_err());
        assert!(h.wizard.confirm().is_err());
        assert!(h.wizard.submit().await.is_err());
        assert_eq!(h.backend.send_count(), 1);
    }

    // ========================================================================
    // Amount Entry
    // ========================================================================

    #[tokio::test]
    async fn test_amount_above_balance_refused() {
        let mut h = harness().await;
        h.wizard.select_recipient(otieno()).unwrap();

        let err = h.wizard.enter_amount("1500", "").unwrap_err();
        assert_eq!(err.to_string(), "Insufficient balance");
        assert!(matches!(
            err,
            WizardError::InsufficientBalance {
                requested: 150_000,
                available: 100_000
            }
        ));
        assert_eq!(h.wizard.step(), WizardStep::AmountEntry);
    }

    #[tokio::test]
    async fn test_non_positive_amounts_refused() {
        let mut h = harness().await;
        h.wizard.select_recipient(otieno()).unwrap();

        for raw in ["0", "0.00", "-5"] {
            assert_eq!(
                h.wizard.enter_amount(raw, ""),
                Err(WizardError::Amount(MoneyError::InvalidAmount)),
                "accepted {}",
                raw
            );
        }
        assert_eq!(
            h.wizard.enter_amount_minor(0, ""),
            Err(WizardError::InvalidAmount)
        );
        assert_eq!(h.wizard.step(), WizardStep::AmountEntry);
        assert_eq!(h.backend.send_count(), 0);
    }

    #[tokio::test]
    async fn test_advisory_check_uses_latest_refresh() {
        let mut h = harness().await;
        h.backend.push_profile(Ok(profile_payload(300)));
        h.wizard.select_recipient(otieno()).unwrap();

        h.session.refresh().await;
        assert!(matches!(
            h.wizard.enter_amount("500", ""),
            Err(WizardError::InsufficientBalance {
                available: 30_000,
                ..
            })
        ));
        assert_eq!(h.wizard.enter_amount("300", ""), Ok(WizardStep::Confirmation));
    }

    // ========================================================================
    // Submission Failures
    // ========================================================================

    #[tokio::test]
    async fn test_wrong_pin_returns_to_pin_entry() {
        let mut h = harness().await;
        h.backend
            .push_transaction(Err(rejected(400, Some("INVALID_PIN"), "Invalid PIN")));
        ready_to_submit(&mut h.wizard);

        let err = h.wizard.submit().await.unwrap_err();
        assert_eq!(err.to_string(), "Invalid PIN");
        assert_eq!(h.wizard.step(), WizardStep::PinAuthentication);
        assert_eq!(h.wizard.draft().pin_len(), 0);
        assert_eq!(h.wizard.draft().amount_minor(), Some(50_000));
        assert_eq!(h.wizard.draft().payee(), Some(&Payee::User(otieno())));
        assert_eq!(h.backend.profile_count(), 0);

        // Fewer than four digits does not submit
        enter_pin(&mut h.wizard, "432");
        assert!(matches!(h.wizard.submit().await, Err(WizardError::Pin(_))));
        assert_eq!(h.backend.send_count(), 1);

        enter_pin(&mut h.wizard, "1");
        h.wizard.submit().await.unwrap();
        assert_eq!(h.backend.last_send().unwrap().pin, "4321");
    }

    #[tokio::test]
    async fn test_business_rejection_returns_to_amount_entry() {
        let mut h = harness().await;
        h.backend.push_transaction(Err(rejected(
            400,
            Some("LIMIT_EXCEEDED"),
            "Daily limit exceeded",
        )));
        ready_to_submit(&mut h.wizard);

        let err = h.wizard.submit().await.unwrap_err();
        assert_eq!(
            err,
            WizardError::Payment(PaymentError::LimitExceeded("Daily limit exceeded".into()))
        );
        assert_eq!(h.wizard.step(), WizardStep::AmountEntry);
        assert_eq!(h.wizard.draft().amount_minor(), Some(50_000));
        assert_eq!(h.wizard.draft().pin_len(), 0);
    }

    #[tokio::test]
    async fn test_transient_failure_allows_retry_without_pin() {
        let mut h = harness().await;
        h.backend.push_transaction(Err(ApiError::Timeout));
        ready_to_submit(&mut h.wizard);

        let err = h.wizard.submit().await.unwrap_err();
        assert!(matches!(err, WizardError::Payment(ref e) if e.is_retryable()));
        assert_eq!(h.wizard.step(), WizardStep::Confirmation);
        assert_eq!(h.wizard.draft().pin_len(), 4);
        assert_eq!(h.backend.send_count(), 1);

        h.wizard.confirm().unwrap();
        h.wizard.submit().await.unwrap();
        assert_eq!(h.wizard.step(), WizardStep::Completed);
        assert_eq!(h.backend.send_count(), 2);
    }

    #[tokio::test]
    async fn test_unauthorized_logs_out_and_ends_wizard() {
        let mut h = harness().await;
        h.backend
            .push_transaction(Err(ApiError::Unauthorized("Token expired".into())));
        ready_to_submit(&mut h.wizard);

        let err = h.wizard.submit().await.unwrap_err();
        assert!(matches!(
            err,
            WizardError::Payment(PaymentError::Unauthorized(_))
        ));
        assert!(!h.session.is_authenticated());
        assert_eq!(h.wizard.step(), WizardStep::Completed);
        assert!(matches!(
            h.wizard.result().unwrap().status,
            TransferStatus::Rejected(_)
        ));
    }

    #[tokio::test]
    async fn test_backend_reported_pending() {
        let mut h = harness().await;
        h.backend.push_transaction(Ok(ack("pending")));
        ready_to_submit(&mut h.wizard);

        let result = h.wizard.submit().await.unwrap();
        assert_eq!(result.status, TransferStatus::Pending);
        assert_eq!(h.wizard.step(), WizardStep::Completed);
    }

    // ========================================================================
    // In-flight Submission
    // ========================================================================

    #[tokio::test(start_paused = true)]
    async fn test_dropped_submit_blocks_second_submission() {
        let mut h = harness().await;
        h.backend
            .push_transaction_delayed(Duration::from_secs(5), Ok(ack("completed")));
        ready_to_submit(&mut h.wizard);

        let abandoned = tokio::time::timeout(Duration::from_millis(100), h.wizard.submit()).await;
        assert!(abandoned.is_err());
        assert!(h.wizard.is_submitting());
        assert_eq!(h.wizard.step(), WizardStep::Submitting);

        assert_eq!(
            h.wizard.submit().await.unwrap_err(),
            WizardError::SubmissionInFlight
        );
        assert!(h.wizard.back(WizardStep::Confirmation).is_err());
        assert_eq!(h.backend.send_count(), 1);

        let result = h.wizard.resume().await.unwrap();
        assert_eq!(result.status, TransferStatus::Completed);
        assert_eq!(h.wizard.step(), WizardStep::Completed);
        assert_eq!(h.backend.send_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_closed_wizard_still_settles_and_refreshes() {
        let Harness {
            backend,
            session,
            mut wizard,
        } = harness().await;
        backend.push_transaction_delayed(Duration::from_secs(2), Ok(ack("completed")));
        backend.push_profile(Ok(profile_payload(500)));
        ready_to_submit(&mut wizard);

        let abandoned = tokio::time::timeout(Duration::from_millis(100), wizard.submit()).await;
        assert!(abandoned.is_err());
        wizard.cancel();

        tokio::time::sleep(Duration::from_secs(5)).await;
        assert_eq!(backend.send_count(), 1);
        assert_eq!(backend.profile_count(), 1);
        assert_eq!(session.wallet().unwrap().balance, Decimal::from(500));
    }

    // ========================================================================
    // Scanned Codes
    // ========================================================================

    #[tokio::test]
    async fn test_receive_code_fills_recipient() {
        let mut h = harness().await;
        let raw = r#"{"type":"receive","userId":"u-2","name":"Otieno Odhiambo","phoneNumber":"0798765432"}"#;
        assert_eq!(h.wizard.scan(raw), Ok(WizardStep::AmountEntry));
        assert_eq!(h.wizard.draft().payee(), Some(&Payee::User(otieno())));
    }

    #[tokio::test]
    async fn test_payment_code_pays_merchant() {
        let mut h = harness().await;
        let raw = r#"{"type":"payment","merchantName":"Naivas","amount":250,"reference":"INV-9"}"#;
        h.wizard.scan(raw).unwrap();
        let suggested = h.wizard.draft().amount_minor().unwrap();
        assert_eq!(suggested, 25_000);

        h.wizard.enter_amount_minor(suggested, "").unwrap();
        h.wizard.confirm().unwrap();
        enter_pin(&mut h.wizard, "1234");
        h.wizard.submit().await.unwrap();

        assert_eq!(h.backend.send_count(), 0);
        let request = h.backend.last_merchant().unwrap();
        assert_eq!(request.merchant_name, "Naivas");
        assert_eq!(request.reference.as_deref(), Some("INV-9"));
        assert_eq!(request.amount, Decimal::from(250));
    }

    #[tokio::test]
    async fn test_bad_code_changes_nothing() {
        let mut h = harness().await;
        for raw in ["not json", r#"{"type":"unknown"}"#] {
            assert!(matches!(h.wizard.scan(raw), Err(WizardError::Decode(_))));
        }
        assert_eq!(h.wizard.step(), WizardStep::RecipientSelection);
        assert!(h.wizard.draft().payee().is_none());
    }

    // ========================================================================
    // Navigation
    // ========================================================================

    #[tokio::test]
    async fn test_back_then_forward_again() {
        let mut h = harness().await;
        ready_to_submit(&mut h.wizard);

        h.wizard.back(WizardStep::AmountEntry).unwrap();
        assert_eq!(h.wizard.draft().pin_len(), 0);
        assert!(matches!(
            h.wizard.search("Otieno").await,
            Err(WizardError::InvalidTransition { .. })
        ));

        h.wizard.enter_amount("200", "").unwrap();
        h.wizard.confirm().unwrap();
        enter_pin(&mut h.wizard, "1234");
        h.wizard.submit().await.unwrap();
        assert_eq!(h.backend.last_send().unwrap().amount, Decimal::from(200));
    }
}
