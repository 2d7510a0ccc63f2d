//! Integration Tests for the claim guide
//!
//! End-to-end journeys across the filing flow and the contractor wizard,
//! built from the shared fixtures, plus property checks over the
//! generators.

use proptest::prelude::*;
use rust_decimal_macros::dec;

use domain_claims::{AuditView, FilingStep, ParseStatus, PaymentType, PipelineState, StepStatus};
use domain_scope::{SubmissionState, WizardDraft, WizardPhase, WizardSession};
use test_utils::*;

// ============================================================================
// Claim Journey
// ============================================================================

mod claim_journey {
    use super::*;

    #[tokio::test]
    async fn test_new_claim_to_closed() {
        let (port, mut controller) = ClaimFixtures::controller(ClaimFixtures::new_claim()).await;
        assert_progress(&controller, &[], FilingStep::Overview);

        controller
            .invite_contractor(&PartyFixtures::contractor_name(), &PartyFixtures::contractor_email())
            .await
            .unwrap();
        assert!(controller.contractor_token().is_some());
        assert_progress(&controller, &[1, 2], FilingStep::EstimateComparison);

        controller.update_estimate(dec!(15000), ClaimFixtures::deductible()).unwrap();
        controller.submit_estimate().await.unwrap();
        controller
            .submit_description("Hail damage across the north slope of the roof")
            .await
            .unwrap();
        controller.set_adjuster_form(PartyFixtures::adjuster_form()).unwrap();
        controller.submit_adjuster().await.unwrap();
        assert_progress(&controller, &[1, 2, 3, 4, 5], FilingStep::EstimateAudit);

        controller.upload_carrier_estimate(DocumentFixtures::estimate_pdf()).await.unwrap();
        port.script_parse(vec![ParseStatus::Completed], None).await;
        controller.poll_parse().await.unwrap();
        assert!(matches!(controller.documents().state(), PipelineState::Parsed(_)));

        port.script_audit(DocumentFixtures::completed_audit()).await;
        controller.run_audit().await.unwrap();
        match controller.audit().view() {
            AuditView::Ready { data, .. } => {
                assert_eq!(data.flagged_count(), 1);
                assert_eq!(data.largest_discrepancy().map(|d| d.item.as_str()), Some("Ridge cap"));
            }
            other => panic!("expected a ready audit, got {:?}", other),
        }
        controller.complete_audit_step().await.unwrap();
        assert_progress(&controller, &[1, 2, 3, 4, 5, 6], FilingStep::Payments);

        controller
            .record_payment(PaymentType::Acv, dec!(8200), PaymentFixtures::receipt())
            .await
            .unwrap();
        controller
            .record_payment(PaymentType::Rcv, dec!(1800), PaymentFixtures::receipt())
            .await
            .unwrap();
        controller.request_close().unwrap();
        controller.confirm_close().await.unwrap();

        assert!(controller.progress().is_finished());
        assert_no_inline_errors(&controller);
        let stored = port.claim(controller.claim().id).await.unwrap();
        assert!(stored.is_closed());
        assert_eq!(stored.current_step, 7);
    }

    #[tokio::test]
    async fn test_reload_restores_parsed_estimate() {
        let claim = ClaimBuilder::new().on_step(6).build();
        let claim_id = claim.id;
        let (port, mut controller) = ClaimFixtures::controller(claim).await;
        controller.upload_carrier_estimate(DocumentFixtures::estimate_pdf()).await.unwrap();
        port.script_parse(vec![ParseStatus::Completed], None).await;
        controller.teardown();
        drop(controller);

        let reloaded = domain_claims::StepProgressionController::load(port, claim_id)
            .await
            .unwrap();

        assert!(reloaded.documents().is_parsed());
        assert!(!reloaded.documents().is_polling());
    }

    #[tokio::test]
    async fn test_audit_against_built_comparison() {
        let (port, mut controller) = ClaimFixtures::controller(ClaimBuilder::new().on_step(6).build()).await;
        controller.upload_carrier_estimate(DocumentFixtures::estimate_pdf()).await.unwrap();
        port.script_parse(vec![ParseStatus::Completed], None).await;
        controller.poll_parse().await.unwrap();

        let comparison = ComparisonDataBuilder::new()
            .with_item("Starter strip", dec!(310.50), dec!(240))
            .with_item("Drip edge", dec!(95), dec!(95))
            .build();
        port.script_audit(domain_claims::ports::mock::AuditScript {
            status: domain_claims::AuditStatus::Completed,
            comparison_data: Some(serde_json::to_string(&comparison).unwrap()),
            error_message: None,
        })
        .await;

        controller.run_audit().await.unwrap();

        match controller.audit().view() {
            AuditView::Ready { data, .. } => {
                assert_eq!(data, &comparison);
                assert_eq!(data.summary.total_delta, dec!(70.50));
            }
            other => panic!("expected a ready audit, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_failed_audit_blocks_step_completion() {
        let (port, mut controller) = ClaimFixtures::controller(ClaimBuilder::new().on_step(6).build()).await;
        controller.upload_carrier_estimate(DocumentFixtures::estimate_pdf()).await.unwrap();
        port.script_parse(vec![ParseStatus::Completed], None).await;
        controller.poll_parse().await.unwrap();
        port.script_audit(DocumentFixtures::failed_audit("Pricing data unavailable")).await;

        let _ = controller.run_audit().await;

        assert!(matches!(controller.audit().view(), AuditView::Failed { .. }));
        assert!(!controller.can_continue_audit_step());
        assert_eq!(controller.status(6), StepStatus::Current);
    }
}

// ============================================================================
// Wizard Journey
// ============================================================================

mod wizard_journey {
    use super::*;

    #[tokio::test]
    async fn test_tour_photos_and_submit() {
        let (port, _token, mut session) = WizardFixtures::session_in_tour(&["roof", "gutters"]).await;

        session.toggle_tag("hail_impact").unwrap();
        session.set_dimension("squares", 24.0).unwrap();
        let results = session
            .upload_photos(vec![WizardFixtures::jpeg("north.jpg"), WizardFixtures::jpeg("south.jpg")])
            .await
            .unwrap();
        assert!(results.iter().all(|(_, r)| r.is_ok()));
        session.complete_area().unwrap();
        session.complete_area().unwrap();
        assert_eq!(session.phase(), WizardPhase::Review);

        session.set_general_notes("Access via side gate").unwrap();
        session.submit().await.unwrap();
        assert_eq!(session.submission_state(), SubmissionState::Submitted);

        let submissions = port.submissions().await;
        assert_eq!(submissions.len(), 1);
        let roof = &submissions[0].areas[0];
        assert_eq!(roof.category_key, "roof");
        assert_eq!(roof.photo_ids.len(), 2);
        submissions[0].areas.iter().for_each(assert_area_in_catalog);
    }

    #[tokio::test]
    async fn test_resume_from_built_draft() {
        let builder = WizardDraftBuilder::new()
            .with_area(ScopeAreaBuilder::new("roof").with_tag("wind_lift").with_photo().build())
            .with_area(ScopeAreaBuilder::new("interior_ceilings").with_notes("Stained ceiling").build())
            .at(WizardPhase::Tour(1))
            .with_revision(7);
        let expected = builder.state().clone();

        let (port, token, _fresh) = WizardFixtures::fresh_session().await;
        port.with_draft(&token, builder.build()).await;
        let resumed = WizardSession::resume(port, token).await.unwrap();

        assert_eq!(resumed.phase(), WizardPhase::Tour(1));
        assert_eq!(resumed.revision(), 7);
        assert_same_areas(resumed.state(), &expected);
    }
}

// ============================================================================
// Generator Properties
// ============================================================================

mod generator_properties {
    use super::*;

    proptest! {
        #[test]
        fn generated_areas_respect_catalog(area in scope_area_strategy()) {
            assert_area_in_catalog(&area);
        }

        #[test]
        fn draft_preserves_wizard_position(state in wizard_state_strategy(), revision in 1u64..1000) {
            let restored = WizardDraft::from_state(&state, revision).unwrap().into_state();
            prop_assert_eq!(restored.phase, state.phase);
            assert_same_areas(&restored, &state);
        }

        #[test]
        fn linear_claim_has_one_current_step(claim in linear_claim_strategy()) {
            let progress = claim.progress().unwrap();
            for step in FilingStep::ALL {
                let expected = match step.number().cmp(&claim.current_step) {
                    std::cmp::Ordering::Less => StepStatus::Completed,
                    std::cmp::Ordering::Equal => StepStatus::Current,
                    std::cmp::Ordering::Greater => StepStatus::Upcoming,
                };
                prop_assert_eq!(progress.status(step), expected);
            }
        }

        #[test]
        fn amounts_are_positive_cents(amount in amount_strategy()) {
            prop_assert!(amount > rust_decimal::Decimal::ZERO);
            prop_assert!(amount.scale() <= 2);
        }
    }
}
