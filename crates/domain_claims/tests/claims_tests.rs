//! Comprehensive tests for domain_claims

use std::sync::Arc;
use std::time::Duration;

use chrono::NaiveDate;
use rust_decimal_macros::dec;

use core_kernel::ClaimId;

use domain_claims::ports::mock::{op, AuditScript, MockClaimFilingPort};
use domain_claims::{
    AuditStatus, AuditView, Claim, EstimateComparison, FilingError, FilingStep, ParseStatus,
    PaymentReceipt, PaymentType, PipelineState, PollOutcome, SelectedFile, StepProgressionController,
    StepStatus,
};

type Controller = StepProgressionController<MockClaimFilingPort>;

async fn claim_at(current: u8, done: &[u8]) -> (Arc<MockClaimFilingPort>, Controller) {
    let mut claim = Claim::new(ClaimId::new_v7());
    claim.current_step = current;
    claim.steps_completed = done.to_vec();
    claim.deductible = Some(dec!(5000));
    let port = Arc::new(MockClaimFilingPort::with_claim(claim.clone()).await);
    let controller = StepProgressionController::load(Arc::clone(&port), claim.id)
        .await
        .unwrap();
    (port, controller)
}

fn estimate_pdf() -> SelectedFile {
    SelectedFile::new("carrier-estimate.pdf", "application/pdf", b"%PDF-1.7 estimate".to_vec())
}

fn receipt() -> PaymentReceipt {
    PaymentReceipt {
        received_date: NaiveDate::from_ymd_opt(2026, 3, 2).unwrap(),
        check_number: Some("10452".to_string()),
    }
}

// ============================================================================
// Step Progression Tests
// ============================================================================

mod progression_tests {
    use super::*;

    #[tokio::test]
    async fn test_new_claim_through_estimate() {
        let (port, mut controller) = claim_at(1, &[]).await;
        assert_eq!(controller.status(1), StepStatus::Current);
        assert_eq!(controller.status(2), StepStatus::Upcoming);

        controller.invite_contractor("Acme Roofing", "a@b.com").await.unwrap();
        assert_eq!(controller.progress().completed_numbers(), vec![1, 2]);
        assert_eq!(controller.progress().current_step(), FilingStep::EstimateComparison);

        let comparison = *controller.update_estimate(dec!(15000), dec!(5000)).unwrap();
        assert_eq!(
            comparison,
            EstimateComparison { estimate: dec!(15000), deductible: dec!(5000), worth_filing: true }
        );

        controller.submit_estimate().await.unwrap();
        assert_eq!(controller.progress().completed_numbers(), vec![1, 2, 3]);
        assert_eq!(controller.progress().current_step(), FilingStep::DamageDescription);

        let stored = port.claim(controller.claim().id).await.unwrap();
        assert_eq!(stored.contractor_name.as_deref(), Some("Acme Roofing"));
        assert_eq!(stored.contractor_estimate, Some(dec!(15000)));
        assert_eq!(stored.worth_filing, Some(true));
        assert_eq!(stored.current_step, 4);
    }

    #[tokio::test]
    async fn test_estimate_editable_after_completion() {
        let (_port, mut controller) = claim_at(5, &[1, 2, 3, 4]).await;

        controller.update_estimate(dec!(4000), dec!(5000)).unwrap();
        controller.submit_estimate().await.unwrap();

        assert_eq!(controller.progress().current_step(), FilingStep::AdjusterDetails);
        assert_eq!(controller.status(3), StepStatus::Completed);
        assert_eq!(controller.claim().worth_filing, Some(false));
    }

    #[tokio::test]
    async fn test_locked_step_controls_do_not_mutate() {
        let (port, mut controller) = claim_at(2, &[1]).await;
        let before = controller.progress().clone();

        assert!(matches!(
            controller.update_estimate(dec!(10), dec!(5)),
            Err(FilingError::StepLocked(FilingStep::EstimateComparison))
        ));
        assert!(controller.submit_adjuster().await.is_err());
        assert!(controller.upload_carrier_estimate(estimate_pdf()).await.is_err());
        assert!(controller.request_close().is_err());

        assert_eq!(controller.progress(), &before);
        assert!(controller.comparison().is_none());
        assert_eq!(port.calls().await, vec![op::GET_CLAIM, op::LIST_ESTIMATES]);
    }

    #[tokio::test]
    async fn test_description_length_gate() {
        let (port, mut controller) = claim_at(4, &[1, 2, 3]).await;

        let err = controller.submit_description(&"d".repeat(19)).await.unwrap_err();
        assert!(err.is_client_side());
        assert!(controller.inline_error(FilingStep::DamageDescription).is_some());
        assert!(!port.calls().await.contains(&op::UPDATE_STEP.to_string()));

        controller.submit_description(&"d".repeat(20)).await.unwrap();
        assert_eq!(controller.progress().current_step(), FilingStep::AdjusterDetails);
        assert_eq!(controller.inline_error(FilingStep::DamageDescription), None);
    }

    #[tokio::test]
    async fn test_description_notify_failure_keeps_step() {
        let (port, mut controller) = claim_at(4, &[1, 2, 3]).await;
        port.fail(op::NOTIFY, Some("Insurer gateway unavailable")).await;

        let err = controller
            .submit_description("Hail damage across the north slope of the roof")
            .await
            .unwrap_err();

        assert_eq!(err.to_string(), "Insurer gateway unavailable");
        assert_eq!(controller.progress().current_step(), FilingStep::DamageDescription);
    }

    #[tokio::test]
    async fn test_description_resend_keeps_step() {
        let (port, mut controller) = claim_at(6, &[1, 2, 3, 4, 5]).await;

        controller
            .submit_description("Wind lifted shingles along the ridge line")
            .await
            .unwrap();

        assert_eq!(controller.progress().current_step(), FilingStep::EstimateAudit);
        assert!(port.calls().await.contains(&op::NOTIFY.to_string()));
    }

    #[tokio::test]
    async fn test_adjuster_form_clears_after_success() {
        let (_port, mut controller) = claim_at(5, &[1, 2, 3, 4]).await;
        let mut form = controller.adjuster_form().clone();
        form.adjuster_name = Some("Pat Lee".to_string());
        form.insurer_claim_number = "HO-2291".to_string();
        controller.set_adjuster_form(form).unwrap();

        controller.submit_adjuster().await.unwrap();

        assert!(controller.adjuster_form().is_empty());
        assert_eq!(controller.claim().insurer_claim_number.as_deref(), Some("HO-2291"));
        assert_eq!(controller.progress().current_step(), FilingStep::EstimateAudit);
    }

    #[tokio::test]
    async fn test_adjuster_requires_claim_number() {
        let (port, mut controller) = claim_at(5, &[1, 2, 3, 4]).await;

        let err = controller.submit_adjuster().await.unwrap_err();

        assert_eq!(err.to_string(), "Claim number is required");
        assert!(!port.calls().await.contains(&op::UPDATE_STEP.to_string()));
    }
}

// ============================================================================
// Carrier Estimate Pipeline Tests
// ============================================================================

mod pipeline_tests {
    use super::*;

    #[tokio::test]
    async fn test_upload_choreography_then_parse_trigger() {
        let (port, mut controller) = claim_at(6, &[1, 2, 3, 4, 5]).await;

        controller.upload_carrier_estimate(estimate_pdf()).await.unwrap();

        let calls = port.calls().await;
        assert_eq!(&calls[..3], &[op::GET_CLAIM, op::LIST_ESTIMATES, op::LATEST_AUDIT]);
        assert_eq!(
            &calls[3..],
            &[op::REQUEST_UPLOAD, op::PUT_BYTES, op::CONFIRM_UPLOAD, op::TRIGGER_PARSE]
        );
        assert!(matches!(controller.documents().state(), PipelineState::Parsing { .. }));
        assert!(controller.documents().is_polling());
    }

    #[tokio::test]
    async fn test_poll_flag_sequence() {
        let (port, mut controller) = claim_at(6, &[1, 2, 3, 4, 5]).await;
        controller.upload_carrier_estimate(estimate_pdf()).await.unwrap();
        port.script_parse(
            vec![ParseStatus::Pending, ParseStatus::Processing, ParseStatus::Completed],
            None,
        )
        .await;

        let mut flags = Vec::new();
        for _ in 0..3 {
            controller.poll_parse().await.unwrap();
            flags.push(controller.documents().is_polling());
        }

        assert_eq!(flags, vec![true, true, false]);
        assert!(controller.documents().is_parsed());

        // Stopped polls make no further calls
        let before = port.calls().await.len();
        assert_eq!(controller.poll_parse().await.unwrap(), PollOutcome::Idle);
        assert_eq!(port.calls().await.len(), before);
    }

    #[tokio::test]
    async fn test_failed_parse_then_retry_clears_client_cache() {
        let (port, mut controller) = claim_at(6, &[1, 2, 3, 4, 5]).await;
        controller.upload_carrier_estimate(estimate_pdf()).await.unwrap();
        port.script_parse(vec![ParseStatus::Failed], Some("Unreadable scan")).await;

        assert_eq!(controller.poll_parse().await.unwrap(), PollOutcome::Failed);
        assert_eq!(
            controller.documents().state(),
            &PipelineState::Failed { message: "Unreadable scan".to_string() }
        );

        controller.retry_carrier_estimate().unwrap();
        assert_eq!(controller.documents().state(), &PipelineState::None);
        assert!(controller.documents().cached_document().is_none());
        assert_eq!(port.document_count().await, 1);
    }

    #[tokio::test]
    async fn test_failed_upload_confirm_is_surfaced() {
        let (port, mut controller) = claim_at(6, &[1, 2, 3, 4, 5]).await;
        port.fail(op::CONFIRM_UPLOAD, Some("Upload expired")).await;

        let err = controller.upload_carrier_estimate(estimate_pdf()).await.unwrap_err();

        assert_eq!(err.to_string(), "Upload expired");
        assert!(matches!(controller.documents().state(), PipelineState::Failed { .. }));
        assert!(!controller.documents().is_polling());
        assert!(!port.calls().await.contains(&op::TRIGGER_PARSE.to_string()));
    }

    #[tokio::test]
    async fn test_non_pdf_is_rejected_locally() {
        let (port, mut controller) = claim_at(6, &[1, 2, 3, 4, 5]).await;
        let file = SelectedFile::new("estimate.png", "image/png", vec![1, 2, 3]);

        assert!(controller.upload_carrier_estimate(file).await.is_err());
        assert_eq!(controller.documents().state(), &PipelineState::None);
        // Only the calls made by load
        assert_eq!(port.calls().await.len(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_poll_task_ticks_every_interval_and_stops() {
        let (port, mut controller) = claim_at(6, &[1, 2, 3, 4, 5]).await;
        controller.upload_carrier_estimate(estimate_pdf()).await.unwrap();
        port.script_parse(
            vec![ParseStatus::Pending, ParseStatus::Processing, ParseStatus::Completed],
            None,
        )
        .await;

        let started = tokio::time::Instant::now();
        let task = controller.watch_parse(Duration::from_secs(3)).unwrap();
        let mut snapshots = task.subscribe();

        let mut flags = Vec::new();
        while snapshots.changed().await.is_ok() {
            let snapshot = snapshots.borrow_and_update().clone();
            flags.push(snapshot.polling);
            controller.apply_parse_snapshot(&snapshot);
            if !snapshot.polling {
                break;
            }
        }

        assert_eq!(flags, vec![true, true, false]);
        assert!(started.elapsed() >= Duration::from_secs(9));
        assert!(controller.documents().is_parsed());

        tokio::time::sleep(Duration::from_secs(30)).await;
        let polls = port
            .calls()
            .await
            .iter()
            .filter(|c| c.as_str() == op::LIST_ESTIMATES)
            .count();
        // One from load, three from the task
        assert_eq!(polls, 4);
    }

    #[tokio::test(start_paused = true)]
    async fn test_teardown_discards_in_flight_snapshot() {
        let (port, mut controller) = claim_at(6, &[1, 2, 3, 4, 5]).await;
        controller.upload_carrier_estimate(estimate_pdf()).await.unwrap();
        port.script_parse(vec![ParseStatus::Completed], None).await;

        let mut task = controller.watch_parse(Duration::from_secs(3)).unwrap();
        controller.teardown();
        let snapshot = task.wait_terminal().await.unwrap();

        assert_eq!(controller.apply_parse_snapshot(&snapshot), PollOutcome::Discarded);
        assert!(!controller.documents().is_parsed());
    }
}

// ============================================================================
// Audit Tests
// ============================================================================

mod audit_tests {
    use super::*;

    async fn parsed_controller() -> (Arc<MockClaimFilingPort>, Controller) {
        let (port, mut controller) = claim_at(6, &[1, 2, 3, 4, 5]).await;
        controller.upload_carrier_estimate(estimate_pdf()).await.unwrap();
        port.script_parse(vec![ParseStatus::Completed], None).await;
        controller.poll_parse().await.unwrap();
        (port, controller)
    }

    #[tokio::test]
    async fn test_audit_requires_parsed_estimate() {
        let (port, mut controller) = claim_at(6, &[1, 2, 3, 4, 5]).await;

        assert!(controller.run_audit().await.is_err());
        assert!(!port.calls().await.contains(&op::GENERATE_AUDIT.to_string()));
    }

    #[tokio::test]
    async fn test_audit_then_continue() {
        let (port, mut controller) = parsed_controller().await;
        port.script_audit(AuditScript {
            status: AuditStatus::Completed,
            comparison_data: Some(
                r#"{"discrepancies":[{"item":"Ridge cap","industry_price":820,"carrier_price":610,"delta":210,"justification":"Below market"}],"summary":{"total_industry":820,"total_carrier":610,"total_delta":210}}"#
                    .to_string(),
            ),
            error_message: None,
        })
        .await;

        assert!(!controller.can_continue_audit_step());
        controller.run_audit().await.unwrap();
        assert!(controller.audit().has_result());
        assert!(controller.can_continue_audit_step());

        controller.complete_audit_step().await.unwrap();
        assert_eq!(controller.progress().current_step(), FilingStep::Payments);
    }

    #[tokio::test]
    async fn test_malformed_comparison_is_no_data() {
        let (port, mut controller) = parsed_controller().await;
        port.script_audit(AuditScript {
            status: AuditStatus::Completed,
            comparison_data: Some("not-json".to_string()),
            error_message: None,
        })
        .await;

        controller.run_audit().await.unwrap();

        assert!(matches!(controller.audit().view(), AuditView::NoData { .. }));
        assert!(!controller.can_continue_audit_step());
        assert!(controller.complete_audit_step().await.is_err());
    }

    #[tokio::test]
    async fn test_compare_failure_then_retry() {
        let (port, mut controller) = parsed_controller().await;
        port.fail(op::COMPARE_AUDIT, None).await;

        let err = controller.run_audit().await.unwrap_err();
        assert_eq!(err.to_string(), "Failed to compare estimates");
        assert!(matches!(controller.audit().view(), AuditView::Failed { .. }));

        controller.retry_audit().await.unwrap();
        assert!(controller.audit().has_result());
        let generates = port
            .calls()
            .await
            .iter()
            .filter(|c| c.as_str() == op::GENERATE_AUDIT)
            .count();
        assert_eq!(generates, 2);
    }

    #[tokio::test]
    async fn test_processing_report_blocks_run_but_not_retry() {
        let (port, mut controller) = parsed_controller().await;
        port.script_audit(AuditScript {
            status: AuditStatus::Processing,
            comparison_data: None,
            error_message: None,
        })
        .await;

        controller.run_audit().await.unwrap();
        assert_eq!(controller.audit().view(), &AuditView::Running);
        assert!(controller.run_audit().await.is_err());

        port.script_audit(AuditScript {
            status: AuditStatus::Completed,
            comparison_data: Some(
                r#"{"discrepancies":[],"summary":{"total_industry":0,"total_carrier":0,"total_delta":0}}"#.to_string(),
            ),
            error_message: None,
        })
        .await;
        controller.retry_audit().await.unwrap();

        assert!(controller.audit().has_result());
        assert_eq!(controller.inline_error(FilingStep::EstimateAudit), None);
    }

    #[tokio::test]
    async fn test_reload_restores_completed_audit() {
        let (port, mut controller) = parsed_controller().await;
        controller.run_audit().await.unwrap();
        let claim_id = controller.claim().id;
        let report_id = controller.audit().report_id();
        controller.teardown();
        drop(controller);

        let reloaded = StepProgressionController::load(Arc::clone(&port), claim_id)
            .await
            .unwrap();

        assert_eq!(reloaded.audit().report_id(), report_id);
        assert!(reloaded.can_continue_audit_step());
        let generates = port
            .calls()
            .await
            .iter()
            .filter(|c| c.as_str() == op::GENERATE_AUDIT)
            .count();
        assert_eq!(generates, 1);
    }
}

// ============================================================================
// Payment and Closing Tests
// ============================================================================

mod payment_tests {
    use super::*;

    #[tokio::test]
    async fn test_record_acv_and_rcv() {
        let (_port, mut controller) = claim_at(7, &[1, 2, 3, 4, 5, 6]).await;

        controller.record_payment(PaymentType::Acv, dec!(8200), receipt()).await.unwrap();
        controller.record_payment(PaymentType::Rcv, dec!(1800), receipt()).await.unwrap();

        assert_eq!(controller.payments().total_received(), dec!(10000));
        assert!(matches!(
            controller.record_payment(PaymentType::Acv, dec!(8200), receipt()).await,
            Err(FilingError::PaymentAlreadyRecorded(PaymentType::Acv))
        ));
    }

    #[tokio::test]
    async fn test_partial_failure_resumes_at_mark_received() {
        let (port, mut controller) = claim_at(7, &[1, 2, 3, 4, 5, 6]).await;
        port.fail(op::MARK_RECEIVED, None).await;

        assert!(controller.record_payment(PaymentType::Acv, dec!(8200), receipt()).await.is_err());
        assert!(controller.payments().pending(PaymentType::Acv).is_some());

        controller.record_payment(PaymentType::Acv, dec!(8200), receipt()).await.unwrap();

        assert_eq!(port.payment_count().await, 1);
        assert!(controller.payments().is_received(PaymentType::Acv));
    }

    #[tokio::test]
    async fn test_recorded_payment_survives_reload() {
        let (port, mut controller) = claim_at(7, &[1, 2, 3, 4, 5, 6]).await;
        controller.record_payment(PaymentType::Acv, dec!(8200), receipt()).await.unwrap();
        let claim_id = controller.claim().id;
        drop(controller);

        let mut reloaded = StepProgressionController::load(Arc::clone(&port), claim_id)
            .await
            .unwrap();

        assert!(reloaded.payments().is_received(PaymentType::Acv));
        assert!(matches!(
            reloaded.record_payment(PaymentType::Acv, dec!(8200), receipt()).await,
            Err(FilingError::PaymentAlreadyRecorded(PaymentType::Acv))
        ));
        assert_eq!(port.payment_count().await, 1);
    }

    #[tokio::test]
    async fn test_partial_payment_resumes_after_reload() {
        let (port, mut controller) = claim_at(7, &[1, 2, 3, 4, 5, 6]).await;
        port.fail(op::MARK_RECEIVED, None).await;
        assert!(controller.record_payment(PaymentType::Rcv, dec!(1800), receipt()).await.is_err());
        let claim_id = controller.claim().id;
        drop(controller);

        let mut reloaded = StepProgressionController::load(Arc::clone(&port), claim_id)
            .await
            .unwrap();
        assert!(reloaded.payments().pending(PaymentType::Rcv).is_some());
        reloaded.record_payment(PaymentType::Rcv, dec!(1800), receipt()).await.unwrap();

        assert_eq!(port.payment_count().await, 1);
        assert!(reloaded.payments().is_received(PaymentType::Rcv));
    }

    #[tokio::test]
    async fn test_load_fails_when_payments_cannot_be_read() {
        let mut claim = Claim::new(ClaimId::new_v7());
        claim.current_step = 7;
        claim.steps_completed = vec![1, 2, 3, 4, 5, 6];
        let port = Arc::new(MockClaimFilingPort::with_claim(claim.clone()).await);
        port.fail(op::LIST_PAYMENTS, None).await;

        let result = StepProgressionController::load(Arc::clone(&port), claim.id).await;

        match result {
            Err(err) => assert_eq!(err.to_string(), "Failed to load payments"),
            Ok(_) => panic!("load should fail without the payment list"),
        }
        assert!(!port.calls().await.contains(&op::CREATE_PAYMENT.to_string()));
    }

    #[tokio::test]
    async fn test_zero_amount_rejected() {
        let (port, mut controller) = claim_at(7, &[1, 2, 3, 4, 5, 6]).await;

        assert!(controller.record_payment(PaymentType::Rcv, dec!(0), receipt()).await.is_err());
        assert_eq!(port.payment_count().await, 0);
    }

    #[tokio::test]
    async fn test_close_is_two_stage() {
        let (port, mut controller) = claim_at(7, &[1, 2, 3, 4, 5, 6]).await;

        controller.request_close().unwrap();
        controller.cancel_close();
        assert!(controller.confirm_close().await.is_err());
        assert!(!port.claim(controller.claim().id).await.unwrap().is_closed());

        controller.request_close().unwrap();
        controller.confirm_close().await.unwrap();

        assert!(port.claim(controller.claim().id).await.unwrap().is_closed());
        assert!(controller.progress().is_finished());
    }
}
