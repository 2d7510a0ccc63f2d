//! HTTP adapter for the claim owner's filing flow
//!
//! | call                       | request                                              |
//! |----------------------------|------------------------------------------------------|
//! | get_claim                  | `GET /api/claims/{id}`                               |
//! | update_step                | `PATCH /api/claims/{id}`                             |
//! | issue_contractor_token     | `POST /api/claims/{id}/contractor-token`             |
//! | notify_damage_description  | `POST /api/claims/{id}/notifications/description`    |
//! | request_document_upload    | `POST /api/claims/{id}/documents/upload-url`         |
//! | confirm_document_upload    | `POST /api/documents/{id}/confirm`                   |
//! | trigger_parse              | `POST /api/documents/{id}/parse`                     |
//! | list_carrier_estimates     | `GET /api/claims/{id}/documents?document_type=...`   |
//! | generate_audit             | `POST /api/claims/{id}/audit-reports`                |
//! | compare_audit              | `POST /api/audit-reports/{id}/compare`               |
//! | fetch_audit                | `GET /api/audit-reports/{id}`                        |
//! | latest_audit               | `GET /api/claims/{id}/audit-reports/latest`          |
//! | list_payments              | `GET /api/claims/{id}/payments`                      |
//! | create_expected_payment    | `POST /api/claims/{id}/payments`                     |
//! | mark_payment_received      | `PATCH /api/payments/{id}/received`                  |

use async_trait::async_trait;
use reqwest::Method;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use core_kernel::{
    AuditReportId, ClaimId, DocumentId, DomainPort, HealthCheckResult, HealthCheckable, PaymentId,
    PortError, UploadRequest, UploadTicket,
};
use domain_claims::{
    AuditReport, CarrierEstimateDocument, Claim, ClaimFilingPort, ContractorInvite,
    ContractorTokenGrant, Payment, PaymentReceipt, PaymentType, StepUpdate,
};

use crate::client::HttpClient;
use crate::config::{ConfigError, HttpAdapterConfig};

const CARRIER_ESTIMATE: &str = "carrier_estimate";

#[derive(Debug, Deserialize)]
struct GeneratedAudit {
    audit_report_id: AuditReportId,
}

#[derive(Debug, Serialize)]
struct ExpectedPaymentBody {
    #[serde(rename = "type")]
    payment_type: PaymentType,
    #[serde(with = "rust_decimal::serde::float")]
    amount: Decimal,
}

/// [`ClaimFilingPort`] over the REST collaborator
#[derive(Debug, Clone)]
pub struct HttpClaimFilingAdapter {
    http: HttpClient,
}

impl HttpClaimFilingAdapter {
    pub fn new(config: HttpAdapterConfig) -> Result<Self, ConfigError> {
        Ok(Self {
            http: HttpClient::new(config)?,
        })
    }

    pub fn from_client(http: HttpClient) -> Self {
        Self { http }
    }
}

impl DomainPort for HttpClaimFilingAdapter {}

#[async_trait]
impl HealthCheckable for HttpClaimFilingAdapter {
    async fn health_check(&self) -> HealthCheckResult {
        self.http.health("http-claim-filing-adapter").await
    }
}

#[async_trait]
impl ClaimFilingPort for HttpClaimFilingAdapter {
    async fn get_claim(&self, claim_id: ClaimId) -> Result<Claim, PortError> {
        self.http.get_json(&format!("/api/claims/{}", claim_id)).await
    }

    #[instrument(skip(self, update), fields(claim_id = %claim_id, current_step = update.current_step))]
    async fn update_step(&self, claim_id: ClaimId, update: &StepUpdate) -> Result<Claim, PortError> {
        self.http
            .send_json(Method::PATCH, &format!("/api/claims/{}", claim_id), update)
            .await
    }

    async fn issue_contractor_token(
        &self,
        claim_id: ClaimId,
        invite: &ContractorInvite,
    ) -> Result<ContractorTokenGrant, PortError> {
        self.http
            .send_json(
                Method::POST,
                &format!("/api/claims/{}/contractor-token", claim_id),
                invite,
            )
            .await
    }

    async fn notify_damage_description(&self, claim_id: ClaimId) -> Result<(), PortError> {
        self.http
            .send_unit::<()>(
                Method::POST,
                &format!("/api/claims/{}/notifications/description", claim_id),
                None,
            )
            .await
    }

    async fn request_document_upload(
        &self,
        claim_id: ClaimId,
        request: &UploadRequest,
    ) -> Result<UploadTicket, PortError> {
        self.http
            .send_json(
                Method::POST,
                &format!("/api/claims/{}/documents/upload-url", claim_id),
                request,
            )
            .await
    }

    async fn put_upload_bytes(
        &self,
        upload_url: &str,
        content_type: &str,
        bytes: Vec<u8>,
    ) -> Result<(), PortError> {
        self.http.put_bytes(upload_url, content_type, bytes).await
    }

    async fn confirm_document_upload(&self, document_id: DocumentId) -> Result<(), PortError> {
        self.http
            .send_unit::<()>(Method::POST, &format!("/api/documents/{}/confirm", document_id), None)
            .await
    }

    async fn trigger_parse(&self, document_id: DocumentId) -> Result<(), PortError> {
        self.http
            .send_unit::<()>(Method::POST, &format!("/api/documents/{}/parse", document_id), None)
            .await
    }

    async fn list_carrier_estimates(
        &self,
        claim_id: ClaimId,
    ) -> Result<Vec<CarrierEstimateDocument>, PortError> {
        let mut documents: Vec<CarrierEstimateDocument> = self
            .http
            .get_json(&format!(
                "/api/claims/{}/documents?document_type={}",
                claim_id, CARRIER_ESTIMATE
            ))
            .await?;
        // Callers read the first record as the newest
        documents.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        debug!(claim_id = %claim_id, count = documents.len(), "Carrier estimates listed");
        Ok(documents)
    }

    async fn generate_audit(&self, claim_id: ClaimId) -> Result<AuditReportId, PortError> {
        let generated: GeneratedAudit = self
            .http
            .send_json(
                Method::POST,
                &format!("/api/claims/{}/audit-reports", claim_id),
                &serde_json::json!({}),
            )
            .await?;
        Ok(generated.audit_report_id)
    }

    async fn compare_audit(&self, report_id: AuditReportId) -> Result<(), PortError> {
        self.http
            .send_unit::<()>(
                Method::POST,
                &format!("/api/audit-reports/{}/compare", report_id),
                None,
            )
            .await
    }

    async fn fetch_audit(&self, report_id: AuditReportId) -> Result<AuditReport, PortError> {
        self.http
            .get_json(&format!("/api/audit-reports/{}", report_id))
            .await
    }

    /// A 404 means no audit has been generated for the claim
    async fn latest_audit(&self, claim_id: ClaimId) -> Result<Option<AuditReport>, PortError> {
        self.http
            .get_optional(&format!("/api/claims/{}/audit-reports/latest", claim_id))
            .await
    }

    async fn list_payments(&self, claim_id: ClaimId) -> Result<Vec<Payment>, PortError> {
        self.http
            .get_json(&format!("/api/claims/{}/payments", claim_id))
            .await
    }

    async fn create_expected_payment(
        &self,
        claim_id: ClaimId,
        payment_type: PaymentType,
        amount: Decimal,
    ) -> Result<Payment, PortError> {
        let body = ExpectedPaymentBody { payment_type, amount };
        self.http
            .send_json(Method::POST, &format!("/api/claims/{}/payments", claim_id), &body)
            .await
    }

    async fn mark_payment_received(
        &self,
        payment_id: PaymentId,
        receipt: &PaymentReceipt,
    ) -> Result<Payment, PortError> {
        self.http
            .send_json(
                Method::PATCH,
                &format!("/api/payments/{}/received", payment_id),
                receipt,
            )
            .await
    }
}
