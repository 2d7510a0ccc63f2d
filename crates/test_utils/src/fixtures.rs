//! Pre-built Test Fixtures
//!
//! Ready-to-use data for the claim filing flow and the contractor wizard.
//! Names and emails are generated with `fake`; everything that a test
//! asserts on is fixed.

use std::sync::Arc;

use chrono::NaiveDate;
use fake::faker::company::en::CompanyName;
use fake::faker::internet::en::SafeEmail;
use fake::faker::name::en::Name;
use fake::Fake;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use core_kernel::ClaimId;
use domain_claims::ports::mock::AuditScript;
use domain_claims::{
    AdjusterForm, AuditStatus, Claim, MockClaimFilingPort, PaymentReceipt, SelectedFile,
    StepProgressionController,
};
use domain_scope::{AccessToken, MockScopeSheetPort, PhotoFile, RebuildConfirmation, WizardSession};

/// Claims positioned at a given step, with their mock port
pub struct ClaimFixtures;

impl ClaimFixtures {
    /// Standard policy deductible
    pub fn deductible() -> Decimal {
        dec!(5000)
    }

    /// A fresh claim on step 1
    pub fn new_claim() -> Claim {
        Self::claim_at(1, &[])
    }

    /// A claim whose owner is working on `current` with `done` completed
    pub fn claim_at(current: u8, done: &[u8]) -> Claim {
        let mut claim = Claim::new(ClaimId::new_v7());
        claim.current_step = current;
        claim.steps_completed = done.to_vec();
        claim.deductible = Some(Self::deductible());
        claim
    }

    /// Mock port holding `claim` and a controller loaded from it
    pub async fn controller(
        claim: Claim,
    ) -> (Arc<MockClaimFilingPort>, StepProgressionController<MockClaimFilingPort>) {
        let claim_id = claim.id;
        let port = Arc::new(MockClaimFilingPort::with_claim(claim).await);
        let controller = StepProgressionController::load(Arc::clone(&port), claim_id)
            .await
            .expect("fixture claim should load");
        (port, controller)
    }
}

/// People and companies for form fields
pub struct PartyFixtures;

impl PartyFixtures {
    pub fn contractor_name() -> String {
        CompanyName().fake()
    }

    pub fn contractor_email() -> String {
        SafeEmail().fake()
    }

    /// A complete, valid adjuster form
    pub fn adjuster_form() -> AdjusterForm {
        AdjusterForm {
            adjuster_name: Some(Name().fake()),
            adjuster_phone: Some("555-0142".to_string()),
            adjuster_email: Some(SafeEmail().fake()),
            insurer_claim_number: "HO-2026-118204".to_string(),
        }
    }
}

/// Carrier estimate files and audit outcomes
pub struct DocumentFixtures;

impl DocumentFixtures {
    pub const ESTIMATE_FILE_NAME: &'static str = "carrier-estimate.pdf";

    pub fn estimate_pdf() -> SelectedFile {
        SelectedFile::new(
            Self::ESTIMATE_FILE_NAME,
            "application/pdf",
            b"%PDF-1.7 carrier estimate".to_vec(),
        )
    }

    /// A comparison with one underpriced and one overpriced line item
    pub fn comparison_json() -> String {
        r#"{"discrepancies":[{"item":"Ridge cap","industry_price":820,"carrier_price":610,"delta":210,"justification":"Below regional pricing"},{"item":"Dumpster","industry_price":450,"carrier_price":500,"delta":-50,"justification":"Above market"}],"summary":{"total_industry":1270,"total_carrier":1110,"total_delta":160}}"#
            .to_string()
    }

    pub fn completed_audit() -> AuditScript {
        AuditScript {
            status: AuditStatus::Completed,
            comparison_data: Some(Self::comparison_json()),
            error_message: None,
        }
    }

    pub fn failed_audit(message: &str) -> AuditScript {
        AuditScript {
            status: AuditStatus::Failed,
            comparison_data: None,
            error_message: Some(message.to_string()),
        }
    }
}

/// Payment receipts
pub struct PaymentFixtures;

impl PaymentFixtures {
    pub fn receipt() -> PaymentReceipt {
        PaymentReceipt {
            received_date: NaiveDate::from_ymd_opt(2026, 3, 2).unwrap(),
            check_number: Some("10452".to_string()),
        }
    }
}

/// Wizard sessions and photos
pub struct WizardFixtures;

impl WizardFixtures {
    pub fn jpeg(name: &str) -> PhotoFile {
        PhotoFile::new(name, "image/jpeg", vec![0xFF, 0xD8, 0xFF, 0xE0])
    }

    /// A session resumed from a freshly issued token
    pub async fn fresh_session() -> (Arc<MockScopeSheetPort>, AccessToken, WizardSession<MockScopeSheetPort>) {
        let port = Arc::new(MockScopeSheetPort::new());
        let token = port.issue_token().await;
        let session = WizardSession::resume(Arc::clone(&port), token.clone())
            .await
            .expect("fixture token should be accepted");
        (port, token, session)
    }

    /// A session on the first tour step for the given categories
    pub async fn session_in_tour(
        categories: &[&str],
    ) -> (Arc<MockScopeSheetPort>, AccessToken, WizardSession<MockScopeSheetPort>) {
        let (port, token, mut session) = Self::fresh_session().await;
        session.begin().unwrap();
        for key in categories {
            session.toggle_category(key).unwrap();
        }
        session.start_tour(RebuildConfirmation::Unconfirmed).unwrap();
        (port, token, session)
    }
}
