//! Claim Filing Ports
//!
//! `ClaimFilingPort` lists every remote call the claim owner's flow makes.
//! The HTTP adapter lives in `infra_http`; [`mock::MockClaimFilingPort`]
//! keeps everything in memory and lets tests script parse/audit outcomes and
//! inject failures per operation.
//!
//! ```rust,ignore
//! let port: Arc<dyn ClaimFilingPort> = Arc::new(HttpClaimFilingAdapter::new(config)?);
//! let mut controller = StepProgressionController::load(port, claim_id).await?;
//! ```

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use core_kernel::{
    AuditReportId, ClaimId, DocumentId, DomainPort, HealthCheckable, PaymentId, PortError,
    UploadPort, UploadRequest, UploadTicket,
};

use crate::audit::AuditReport;
use crate::claim::{Claim, StepUpdate};
use crate::document::CarrierEstimateDocument;
use crate::forms::ContractorInvite;
use crate::payment::{Payment, PaymentReceipt, PaymentType};

/// Contractor access token issued in step 2
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContractorTokenGrant {
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

/// Remote calls made by the claim owner's filing flow
#[async_trait]
pub trait ClaimFilingPort: DomainPort + HealthCheckable {
    /// Fetches the claim record
    async fn get_claim(&self, claim_id: ClaimId) -> Result<Claim, PortError>;

    /// Patches progress and step fields; returns the updated claim
    async fn update_step(&self, claim_id: ClaimId, update: &StepUpdate) -> Result<Claim, PortError>;

    /// Issues a contractor access token (valid for a fixed window)
    async fn issue_contractor_token(
        &self,
        claim_id: ClaimId,
        invite: &ContractorInvite,
    ) -> Result<ContractorTokenGrant, PortError>;

    /// Notifies the insurer that a damage description was filed
    async fn notify_damage_description(&self, claim_id: ClaimId) -> Result<(), PortError>;

    /// Upload call 1 for a claim document
    async fn request_document_upload(
        &self,
        claim_id: ClaimId,
        request: &UploadRequest,
    ) -> Result<UploadTicket, PortError>;

    /// Upload call 2: raw PUT to the signed URL
    async fn put_upload_bytes(
        &self,
        upload_url: &str,
        content_type: &str,
        bytes: Vec<u8>,
    ) -> Result<(), PortError>;

    /// Upload call 3 for a claim document
    async fn confirm_document_upload(&self, document_id: DocumentId) -> Result<(), PortError>;

    /// Starts the server-side parse job; fire-and-forget
    async fn trigger_parse(&self, document_id: DocumentId) -> Result<(), PortError>;

    /// Carrier-estimate documents for the claim, newest first
    async fn list_carrier_estimates(
        &self,
        claim_id: ClaimId,
    ) -> Result<Vec<CarrierEstimateDocument>, PortError>;

    /// Audit call 1: creates a report and returns its id
    async fn generate_audit(&self, claim_id: ClaimId) -> Result<AuditReportId, PortError>;

    /// Audit call 2: populates the report's comparison data
    async fn compare_audit(&self, report_id: AuditReportId) -> Result<(), PortError>;

    /// Reads the report's authoritative state
    async fn fetch_audit(&self, report_id: AuditReportId) -> Result<AuditReport, PortError>;

    /// The claim's most recently generated audit report, if any
    async fn latest_audit(&self, claim_id: ClaimId) -> Result<Option<AuditReport>, PortError>;

    /// Every payment recorded against the claim
    async fn list_payments(&self, claim_id: ClaimId) -> Result<Vec<Payment>, PortError>;

    /// Payment call 1
    async fn create_expected_payment(
        &self,
        claim_id: ClaimId,
        payment_type: PaymentType,
        amount: Decimal,
    ) -> Result<Payment, PortError>;

    /// Payment call 2
    async fn mark_payment_received(
        &self,
        payment_id: PaymentId,
        receipt: &PaymentReceipt,
    ) -> Result<Payment, PortError>;
}

/// Carrier-estimate uploads for one claim, expressed as the shared upload choreography
pub struct EstimateUploads<'a, P: ?Sized> {
    port: &'a P,
    claim_id: ClaimId,
}

impl<'a, P: ClaimFilingPort + ?Sized> EstimateUploads<'a, P> {
    pub fn new(port: &'a P, claim_id: ClaimId) -> Self {
        Self { port, claim_id }
    }
}

#[async_trait]
impl<'a, P: ClaimFilingPort + ?Sized> UploadPort for EstimateUploads<'a, P> {
    async fn request_upload(&self, request: &UploadRequest) -> Result<UploadTicket, PortError> {
        self.port.request_document_upload(self.claim_id, request).await
    }

    async fn put_bytes(
        &self,
        upload_url: &str,
        content_type: &str,
        bytes: Vec<u8>,
    ) -> Result<(), PortError> {
        self.port.put_upload_bytes(upload_url, content_type, bytes).await
    }

    async fn confirm_upload(&self, id: Uuid) -> Result<(), PortError> {
        self.port.confirm_document_upload(DocumentId::from(id)).await
    }
}

/// In-memory implementation of ClaimFilingPort for testing
#[cfg(any(test, feature = "mock"))]
pub mod mock {
    use super::*;
    use chrono::Duration;
    use std::collections::{HashMap, HashSet, VecDeque};
    use tokio::sync::RwLock;

    use crate::audit::AuditStatus;
    use crate::document::ParseStatus;
    use crate::payment::PaymentStatus;

    /// Operation names accepted by [`MockClaimFilingPort::fail`]
    pub mod op {
        pub const GET_CLAIM: &str = "get_claim";
        pub const UPDATE_STEP: &str = "update_step";
        pub const ISSUE_TOKEN: &str = "issue_contractor_token";
        pub const NOTIFY: &str = "notify_damage_description";
        pub const REQUEST_UPLOAD: &str = "request_document_upload";
        pub const PUT_BYTES: &str = "put_upload_bytes";
        pub const CONFIRM_UPLOAD: &str = "confirm_document_upload";
        pub const TRIGGER_PARSE: &str = "trigger_parse";
        pub const LIST_ESTIMATES: &str = "list_carrier_estimates";
        pub const GENERATE_AUDIT: &str = "generate_audit";
        pub const COMPARE_AUDIT: &str = "compare_audit";
        pub const FETCH_AUDIT: &str = "fetch_audit";
        pub const LATEST_AUDIT: &str = "latest_audit";
        pub const LIST_PAYMENTS: &str = "list_payments";
        pub const CREATE_PAYMENT: &str = "create_expected_payment";
        pub const MARK_RECEIVED: &str = "mark_payment_received";
    }

    /// What `fetch_audit` reports once compare has run
    #[derive(Debug, Clone)]
    pub struct AuditScript {
        pub status: AuditStatus,
        pub comparison_data: Option<String>,
        pub error_message: Option<String>,
    }

    #[derive(Debug, Default)]
    struct MockState {
        claims: HashMap<ClaimId, Claim>,
        uploads: HashMap<DocumentId, (ClaimId, UploadRequest)>,
        documents: Vec<(ClaimId, CarrierEstimateDocument)>,
        parse_script: VecDeque<ParseStatus>,
        parse_error: Option<String>,
        audits: HashMap<AuditReportId, (ClaimId, AuditReport)>,
        audit_script: Option<AuditScript>,
        payments: HashMap<PaymentId, (ClaimId, Payment)>,
        failures: HashMap<String, Option<String>>,
        sticky_failures: HashSet<String>,
        calls: Vec<String>,
    }

    /// In-memory mock implementation of ClaimFilingPort
    #[derive(Debug, Default)]
    pub struct MockClaimFilingPort {
        state: RwLock<MockState>,
    }

    impl MockClaimFilingPort {
        /// Creates a new mock port
        pub fn new() -> Self {
            Self::default()
        }

        /// Pre-populates with a claim
        pub async fn with_claim(claim: Claim) -> Self {
            let port = Self::new();
            port.state.write().await.claims.insert(claim.id, claim);
            port
        }

        /// The next call to `operation` fails with the given server message
        pub async fn fail(&self, operation: &str, server_message: Option<&str>) {
            self.state
                .write()
                .await
                .failures
                .insert(operation.to_string(), server_message.map(str::to_string));
        }

        /// Every call to `operation` fails until [`Self::clear_failures`]
        pub async fn fail_always(&self, operation: &str, server_message: Option<&str>) {
            let mut state = self.state.write().await;
            state.failures.insert(operation.to_string(), server_message.map(str::to_string));
            state.sticky_failures.insert(operation.to_string());
        }

        pub async fn clear_failures(&self) {
            let mut state = self.state.write().await;
            state.failures.clear();
            state.sticky_failures.clear();
        }

        /// Parse statuses returned by successive `list_carrier_estimates` calls
        pub async fn script_parse(&self, statuses: Vec<ParseStatus>, parse_error: Option<&str>) {
            let mut state = self.state.write().await;
            state.parse_script = statuses.into();
            state.parse_error = parse_error.map(str::to_string);
        }

        /// Outcome of the next audit generate/compare
        pub async fn script_audit(&self, script: AuditScript) {
            self.state.write().await.audit_script = Some(script);
        }

        /// Names of the operations called so far, in order
        pub async fn calls(&self) -> Vec<String> {
            self.state.read().await.calls.clone()
        }

        pub async fn claim(&self, claim_id: ClaimId) -> Option<Claim> {
            self.state.read().await.claims.get(&claim_id).cloned()
        }

        pub async fn document_count(&self) -> usize {
            self.state.read().await.documents.len()
        }

        pub async fn payment_count(&self) -> usize {
            self.state.read().await.payments.len()
        }

        async fn enter(&self, operation: &str) -> Result<(), PortError> {
            let mut state = self.state.write().await;
            state.calls.push(operation.to_string());
            let failure = if state.sticky_failures.contains(operation) {
                state.failures.get(operation).cloned()
            } else {
                state.failures.remove(operation)
            };
            match failure {
                Some(message) => Err(PortError::Rejected { status: 500, message }),
                None => Ok(()),
            }
        }
    }

    impl DomainPort for MockClaimFilingPort {}

    #[async_trait]
    impl HealthCheckable for MockClaimFilingPort {
        async fn health_check(&self) -> core_kernel::HealthCheckResult {
            core_kernel::HealthCheckResult {
                adapter_id: "mock-claim-filing-port".to_string(),
                status: core_kernel::AdapterHealth::Healthy,
                latency_ms: 0,
                message: Some("Mock adapter always healthy".to_string()),
                checked_at: Utc::now(),
            }
        }
    }

    #[async_trait]
    impl ClaimFilingPort for MockClaimFilingPort {
        async fn get_claim(&self, claim_id: ClaimId) -> Result<Claim, PortError> {
            self.enter(op::GET_CLAIM).await?;
            self.state
                .read()
                .await
                .claims
                .get(&claim_id)
                .cloned()
                .ok_or_else(|| PortError::not_found("Claim", claim_id))
        }

        async fn update_step(&self, claim_id: ClaimId, update: &StepUpdate) -> Result<Claim, PortError> {
            self.enter(op::UPDATE_STEP).await?;
            let mut state = self.state.write().await;
            let claim = state
                .claims
                .get_mut(&claim_id)
                .ok_or_else(|| PortError::not_found("Claim", claim_id))?;
            claim.apply(update);
            Ok(claim.clone())
        }

        async fn issue_contractor_token(
            &self,
            claim_id: ClaimId,
            _invite: &ContractorInvite,
        ) -> Result<ContractorTokenGrant, PortError> {
            self.enter(op::ISSUE_TOKEN).await?;
            if !self.state.read().await.claims.contains_key(&claim_id) {
                return Err(PortError::not_found("Claim", claim_id));
            }
            Ok(ContractorTokenGrant {
                token: Uuid::new_v4().simple().to_string(),
                expires_at: Utc::now() + Duration::days(7),
            })
        }

        async fn notify_damage_description(&self, _claim_id: ClaimId) -> Result<(), PortError> {
            self.enter(op::NOTIFY).await
        }

        async fn request_document_upload(
            &self,
            claim_id: ClaimId,
            request: &UploadRequest,
        ) -> Result<UploadTicket, PortError> {
            self.enter(op::REQUEST_UPLOAD).await?;
            let id = DocumentId::new_v7();
            self.state
                .write()
                .await
                .uploads
                .insert(id, (claim_id, request.clone()));
            Ok(UploadTicket {
                upload_url: format!("https://storage.test/uploads/{}", id),
                id: *id.as_uuid(),
            })
        }

        async fn put_upload_bytes(
            &self,
            _upload_url: &str,
            _content_type: &str,
            _bytes: Vec<u8>,
        ) -> Result<(), PortError> {
            self.enter(op::PUT_BYTES).await
        }

        async fn confirm_document_upload(&self, document_id: DocumentId) -> Result<(), PortError> {
            self.enter(op::CONFIRM_UPLOAD).await?;
            let mut state = self.state.write().await;
            let (claim_id, request) = state
                .uploads
                .remove(&document_id)
                .ok_or_else(|| PortError::not_found("Upload", document_id))?;
            let document = CarrierEstimateDocument {
                id: document_id,
                file_name: request.file_name,
                file_size: request.file_size,
                mime_type: request.mime_type,
                parse_status: ParseStatus::Pending,
                parse_error: None,
                created_at: Utc::now(),
            };
            state.documents.insert(0, (claim_id, document));
            Ok(())
        }

        async fn trigger_parse(&self, document_id: DocumentId) -> Result<(), PortError> {
            self.enter(op::TRIGGER_PARSE).await?;
            let state = self.state.read().await;
            if state.documents.iter().any(|(_, d)| d.id == document_id) {
                Ok(())
            } else {
                Err(PortError::not_found("Document", document_id))
            }
        }

        async fn list_carrier_estimates(
            &self,
            claim_id: ClaimId,
        ) -> Result<Vec<CarrierEstimateDocument>, PortError> {
            self.enter(op::LIST_ESTIMATES).await?;
            let mut state = self.state.write().await;
            let next = state.parse_script.pop_front();
            let parse_error = state.parse_error.clone();
            let mut newest = true;
            let mut listed = Vec::new();
            for (owner, document) in state.documents.iter_mut() {
                if *owner != claim_id {
                    continue;
                }
                if newest {
                    if let Some(status) = next {
                        document.parse_status = status;
                        if status == ParseStatus::Failed {
                            document.parse_error = parse_error.clone();
                        }
                    }
                    newest = false;
                }
                listed.push(document.clone());
            }
            Ok(listed)
        }

        async fn generate_audit(&self, claim_id: ClaimId) -> Result<AuditReportId, PortError> {
            self.enter(op::GENERATE_AUDIT).await?;
            let id = AuditReportId::new_v7();
            let report = AuditReport {
                id,
                comparison_data: None,
                status: AuditStatus::Pending,
                error_message: None,
            };
            self.state.write().await.audits.insert(id, (claim_id, report));
            Ok(id)
        }

        async fn compare_audit(&self, report_id: AuditReportId) -> Result<(), PortError> {
            self.enter(op::COMPARE_AUDIT).await?;
            let mut state = self.state.write().await;
            let script = state.audit_script.clone().unwrap_or(AuditScript {
                status: AuditStatus::Completed,
                comparison_data: Some(r#"{"discrepancies":[],"summary":{"total_industry":0,"total_carrier":0,"total_delta":0}}"#.to_string()),
                error_message: None,
            });
            let (_, report) = state
                .audits
                .get_mut(&report_id)
                .ok_or_else(|| PortError::not_found("AuditReport", report_id))?;
            report.status = script.status;
            report.comparison_data = script.comparison_data;
            report.error_message = script.error_message;
            Ok(())
        }

        async fn fetch_audit(&self, report_id: AuditReportId) -> Result<AuditReport, PortError> {
            self.enter(op::FETCH_AUDIT).await?;
            self.state
                .read()
                .await
                .audits
                .get(&report_id)
                .map(|(_, report)| report.clone())
                .ok_or_else(|| PortError::not_found("AuditReport", report_id))
        }

        async fn latest_audit(&self, claim_id: ClaimId) -> Result<Option<AuditReport>, PortError> {
            self.enter(op::LATEST_AUDIT).await?;
            Ok(self
                .state
                .read()
                .await
                .audits
                .values()
                .filter(|(owner, _)| *owner == claim_id)
                .map(|(_, report)| report)
                .max_by_key(|report| report.id)
                .cloned())
        }

        async fn list_payments(&self, claim_id: ClaimId) -> Result<Vec<Payment>, PortError> {
            self.enter(op::LIST_PAYMENTS).await?;
            let state = self.state.read().await;
            let mut payments: Vec<Payment> = state
                .payments
                .values()
                .filter(|(owner, _)| *owner == claim_id)
                .map(|(_, payment)| payment.clone())
                .collect();
            payments.sort_by_key(|p| p.id);
            Ok(payments)
        }

        async fn create_expected_payment(
            &self,
            claim_id: ClaimId,
            payment_type: PaymentType,
            amount: Decimal,
        ) -> Result<Payment, PortError> {
            self.enter(op::CREATE_PAYMENT).await?;
            let payment = Payment::expected(payment_type, amount);
            self.state
                .write()
                .await
                .payments
                .insert(payment.id, (claim_id, payment.clone()));
            Ok(payment)
        }

        async fn mark_payment_received(
            &self,
            payment_id: PaymentId,
            receipt: &PaymentReceipt,
        ) -> Result<Payment, PortError> {
            self.enter(op::MARK_RECEIVED).await?;
            let mut state = self.state.write().await;
            let (_, payment) = state
                .payments
                .get_mut(&payment_id)
                .ok_or_else(|| PortError::not_found("Payment", payment_id))?;
            payment.status = PaymentStatus::Received;
            payment.received_date = Some(receipt.received_date);
            payment.check_number = receipt.check_number.clone();
            Ok(payment.clone())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::mock::{op, MockClaimFilingPort};
    use super::*;
    use core_kernel::run_upload;

    #[tokio::test]
    async fn test_estimate_upload_uses_shared_choreography() {
        let claim = Claim::new(ClaimId::new_v7());
        let port = MockClaimFilingPort::with_claim(claim.clone()).await;

        let uploads = EstimateUploads::new(&port, claim.id);
        let request = UploadRequest::new("estimate.pdf", 4, "application/pdf")
            .with_document_type("carrier_estimate");
        run_upload(&uploads, request, vec![1, 2, 3, 4]).await.unwrap();

        assert_eq!(
            port.calls().await,
            vec![op::REQUEST_UPLOAD, op::PUT_BYTES, op::CONFIRM_UPLOAD]
        );
        assert_eq!(port.document_count().await, 1);
    }

    #[tokio::test]
    async fn test_mock_failure_is_one_shot() {
        let claim = Claim::new(ClaimId::new_v7());
        let port = MockClaimFilingPort::with_claim(claim.clone()).await;
        port.fail(op::GET_CLAIM, Some("Claim is archived")).await;

        let err = port.get_claim(claim.id).await.unwrap_err();
        assert_eq!(err.server_message(), Some("Claim is archived"));
        assert!(port.get_claim(claim.id).await.is_ok());
    }

    #[tokio::test]
    async fn test_mock_not_found() {
        let port = MockClaimFilingPort::new();
        let err = port.get_claim(ClaimId::new_v7()).await.unwrap_err();
        assert!(err.is_not_found());
    }
}
