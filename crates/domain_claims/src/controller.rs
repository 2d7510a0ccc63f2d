//! Step progression controller
//!
//! Drives the claim owner through the seven filing steps. Each action is a
//! short, strictly ordered chain of port calls; a later call only fires if
//! the earlier ones succeeded, and local progress is swapped in only after
//! the whole chain has succeeded. A failure leaves `current_step` where it
//! was and is kept as the step's inline error.
//!
//! Earlier calls of a failed chain are not rolled back. A token issued before
//! a failed patch, or a patch before a failed notification, stays on the
//! server.

use rust_decimal::Decimal;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

use core_kernel::{ClaimId, DocumentId};

use crate::audit::AuditEngine;
use crate::claim::{Claim, ClaimStatus, StepFields, StepUpdate};
use crate::closing::CloseConfirmation;
use crate::document::{DocumentPipeline, ParsePollTask, ParseSnapshot, PollOutcome, SelectedFile};
use crate::error::FilingError;
use crate::forms::{AdjusterForm, ContractorInvite, DamageDescription, EstimateComparison};
use crate::payment::{PaymentLedger, PaymentReceipt, PaymentType};
use crate::ports::{ClaimFilingPort, ContractorTokenGrant};
use crate::progress::ClaimProgress;
use crate::step::{FilingStep, StepStatus};

const SAVE_FALLBACK: &str = "Failed to save your progress";
const INVITE_FALLBACK: &str = "Failed to send contractor invite";
const NOTIFY_FALLBACK: &str = "Failed to notify your insurer";
const PAYMENT_FALLBACK: &str = "Failed to record payment";
const CLOSE_FALLBACK: &str = "Failed to close claim";
const LOAD_PAYMENTS_FALLBACK: &str = "Failed to load payments";

/// Gates and advances the claim's filing steps
pub struct StepProgressionController<P: ClaimFilingPort + ?Sized> {
    port: Arc<P>,
    claim: Claim,
    progress: ClaimProgress,
    contractor_token: Option<ContractorTokenGrant>,
    comparison: Option<EstimateComparison>,
    adjuster_form: AdjusterForm,
    documents: DocumentPipeline,
    audit: AuditEngine,
    payments: PaymentLedger,
    close: CloseConfirmation,
    inline_errors: HashMap<FilingStep, String>,
}

impl<P: ClaimFilingPort + ?Sized> StepProgressionController<P> {
    /// Fetches the claim and restores the server-side state of steps 6 and 7
    ///
    /// The carrier estimate and the latest audit are best effort. Payments
    /// are required once step 7 is reachable: without them a second
    /// expected payment of the same type could be created.
    pub async fn load(port: Arc<P>, claim_id: ClaimId) -> Result<Self, FilingError> {
        let claim = port
            .get_claim(claim_id)
            .await
            .map_err(|e| FilingError::remote("get_claim", "Failed to load claim", e))?;
        let mut controller = Self::new(port, claim)?;

        match controller.port.list_carrier_estimates(claim_id).await {
            Ok(documents) => controller.documents.hydrate(documents.into_iter().next()),
            Err(e) => warn!(claim_id = %claim_id, error = %e, "Could not restore carrier estimate"),
        }

        if controller.progress.status(FilingStep::EstimateAudit) != StepStatus::Upcoming {
            match controller.port.latest_audit(claim_id).await {
                Ok(Some(report)) => {
                    debug!(claim_id = %claim_id, report_id = %report.id, status = ?report.status, "Audit restored");
                    controller.audit.apply_report(report);
                }
                Ok(None) => {}
                Err(e) => warn!(claim_id = %claim_id, error = %e, "Could not restore audit report"),
            }
        }

        if controller.progress.status(FilingStep::Payments) != StepStatus::Upcoming {
            let payments = controller
                .port
                .list_payments(claim_id)
                .await
                .map_err(|e| FilingError::remote("list_payments", LOAD_PAYMENTS_FALLBACK, e))?;
            debug!(claim_id = %claim_id, count = payments.len(), "Payments restored");
            for payment in payments {
                controller.payments.restore(payment);
            }
        }
        Ok(controller)
    }

    pub fn new(port: Arc<P>, claim: Claim) -> Result<Self, FilingError> {
        let progress = claim.progress()?;
        let comparison = match (claim.contractor_estimate, claim.deductible) {
            (Some(estimate), Some(deductible)) => EstimateComparison::compute(estimate, deductible).ok(),
            _ => None,
        };
        Ok(Self {
            port,
            claim,
            progress,
            contractor_token: None,
            comparison,
            adjuster_form: AdjusterForm::default(),
            documents: DocumentPipeline::new(),
            audit: AuditEngine::new(),
            payments: PaymentLedger::new(),
            close: CloseConfirmation::default(),
            inline_errors: HashMap::new(),
        })
    }

    pub fn claim(&self) -> &Claim {
        &self.claim
    }

    pub fn progress(&self) -> &ClaimProgress {
        &self.progress
    }

    /// Pure status of any step number
    pub fn status(&self, step_num: u8) -> StepStatus {
        self.progress.status_of(step_num)
    }

    pub fn is_editable(&self, step: FilingStep) -> bool {
        self.guard(step).is_ok()
    }

    /// Last error shown under a step, cleared by the step's next success
    pub fn inline_error(&self, step: FilingStep) -> Option<&str> {
        self.inline_errors.get(&step).map(String::as_str)
    }

    pub fn contractor_token(&self) -> Option<&ContractorTokenGrant> {
        self.contractor_token.as_ref()
    }

    pub fn comparison(&self) -> Option<&EstimateComparison> {
        self.comparison.as_ref()
    }

    pub fn adjuster_form(&self) -> &AdjusterForm {
        &self.adjuster_form
    }

    pub fn documents(&self) -> &DocumentPipeline {
        &self.documents
    }

    pub fn audit(&self) -> &AuditEngine {
        &self.audit
    }

    pub fn payments(&self) -> &PaymentLedger {
        &self.payments
    }

    pub fn close_confirmation(&self) -> CloseConfirmation {
        self.close
    }

    // ------------------------------------------------------------------
    // Step 2: contractor invite
    // ------------------------------------------------------------------

    /// Issues a contractor token, then records the contractor and advances to step 3
    ///
    /// Once step 2 is completed this is a resend: a new token is issued and
    /// progress is left alone.
    pub async fn invite_contractor(&mut self, name: &str, email: &str) -> Result<(), FilingError> {
        let step = FilingStep::ContractorInvite;
        self.guard(step)?;
        let result = self.invite_contractor_chain(name, email).await;
        self.settle(step, result)
    }

    async fn invite_contractor_chain(&mut self, name: &str, email: &str) -> Result<(), FilingError> {
        let invite = ContractorInvite::new(name, email)?;
        let grant = self
            .port
            .issue_contractor_token(self.claim.id, &invite)
            .await
            .map_err(|e| FilingError::remote("issue_contractor_token", INVITE_FALLBACK, e))?;

        if self.progress.is_completed(FilingStep::ContractorInvite) {
            info!(claim_id = %self.claim.id, "Contractor invite resent");
            self.contractor_token = Some(grant);
            return Ok(());
        }

        let next = self.progress.completing(
            &[FilingStep::Overview, FilingStep::ContractorInvite],
            FilingStep::EstimateComparison,
        );
        let fields = StepFields::Contractor {
            contractor_name: invite.name,
            contractor_email: invite.email,
        };
        let claim = self.patch(&next, fields, SAVE_FALLBACK).await?;
        self.contractor_token = Some(grant);
        self.adopt(claim, next);
        Ok(())
    }

    // ------------------------------------------------------------------
    // Step 3: estimate vs deductible
    // ------------------------------------------------------------------

    /// Recomputes the comparison for new inputs; nothing is sent
    pub fn update_estimate(
        &mut self,
        estimate: Decimal,
        deductible: Decimal,
    ) -> Result<&EstimateComparison, FilingError> {
        let step = FilingStep::EstimateComparison;
        self.guard(step)?;
        let comparison = self.settle(step, EstimateComparison::compute(estimate, deductible))?;
        let stored = self.comparison.insert(comparison);
        Ok(&*stored)
    }

    /// Persists the estimate and worth-filing flag and advances to step 4
    pub async fn submit_estimate(&mut self) -> Result<(), FilingError> {
        let step = FilingStep::EstimateComparison;
        self.guard(step)?;
        let result = self.submit_estimate_chain().await;
        self.settle(step, result)
    }

    async fn submit_estimate_chain(&mut self) -> Result<(), FilingError> {
        let comparison = self
            .comparison
            .ok_or_else(|| FilingError::validation("Enter the contractor's estimate"))?;
        let next = self
            .progress
            .completing(&[FilingStep::EstimateComparison], FilingStep::DamageDescription);
        let fields = StepFields::Estimate {
            contractor_estimate: comparison.estimate,
            worth_filing: comparison.worth_filing,
        };
        let claim = self.patch(&next, fields, SAVE_FALLBACK).await?;
        self.adopt(claim, next);
        Ok(())
    }

    // ------------------------------------------------------------------
    // Step 4: damage description
    // ------------------------------------------------------------------

    /// Saves the description, then notifies the insurer
    ///
    /// After completion a submission is a resend; the step does not change.
    pub async fn submit_description(&mut self, text: &str) -> Result<(), FilingError> {
        let step = FilingStep::DamageDescription;
        self.guard(step)?;
        let result = self.submit_description_chain(text).await;
        self.settle(step, result)
    }

    async fn submit_description_chain(&mut self, text: &str) -> Result<(), FilingError> {
        let description = DamageDescription::parse(text)?;
        let next = self
            .progress
            .completing(&[FilingStep::DamageDescription], FilingStep::AdjusterDetails);
        let fields = StepFields::Description {
            damage_description: description.into_inner(),
        };
        let claim = self.patch(&next, fields, SAVE_FALLBACK).await?;
        self.port
            .notify_damage_description(self.claim.id)
            .await
            .map_err(|e| FilingError::remote("notify_damage_description", NOTIFY_FALLBACK, e))?;
        self.adopt(claim, next);
        Ok(())
    }

    // ------------------------------------------------------------------
    // Step 5: adjuster details
    // ------------------------------------------------------------------

    pub fn set_adjuster_form(&mut self, form: AdjusterForm) -> Result<(), FilingError> {
        self.guard(FilingStep::AdjusterDetails)?;
        self.adjuster_form = form;
        Ok(())
    }

    /// Saves the adjuster details and advances to step 6; the form is cleared on success
    pub async fn submit_adjuster(&mut self) -> Result<(), FilingError> {
        let step = FilingStep::AdjusterDetails;
        self.guard(step)?;
        let result = self.submit_adjuster_chain().await;
        self.settle(step, result)
    }

    async fn submit_adjuster_chain(&mut self) -> Result<(), FilingError> {
        let form = self.adjuster_form.validated()?;
        let next = self
            .progress
            .completing(&[FilingStep::AdjusterDetails], FilingStep::EstimateAudit);
        let fields = StepFields::Adjuster {
            adjuster_name: form.adjuster_name,
            adjuster_phone: form.adjuster_phone,
            adjuster_email: form.adjuster_email,
            insurer_claim_number: form.insurer_claim_number,
        };
        let claim = self.patch(&next, fields, SAVE_FALLBACK).await?;
        self.adopt(claim, next);
        self.adjuster_form = AdjusterForm::default();
        Ok(())
    }

    // ------------------------------------------------------------------
    // Step 6: carrier estimate and audit
    // ------------------------------------------------------------------

    pub async fn upload_carrier_estimate(&mut self, file: SelectedFile) -> Result<DocumentId, FilingError> {
        let step = FilingStep::EstimateAudit;
        self.guard(step)?;
        let port = Arc::clone(&self.port);
        let result = self.documents.upload(port.as_ref(), self.claim.id, file).await;
        self.settle(step, result)
    }

    /// One parse-status poll tick
    pub async fn poll_parse(&mut self) -> Result<PollOutcome, FilingError> {
        let port = Arc::clone(&self.port);
        self.documents.poll_once(port.as_ref(), self.claim.id).await
    }

    /// Starts the background poll loop if the pipeline is parsing
    pub fn watch_parse(&self, interval: Duration) -> Option<ParsePollTask> {
        self.documents.watch(Arc::clone(&self.port), self.claim.id, interval)
    }

    pub fn apply_parse_snapshot(&mut self, snapshot: &ParseSnapshot) -> PollOutcome {
        self.documents.apply_snapshot(snapshot)
    }

    /// Clears a failed estimate so another can be uploaded
    pub fn retry_carrier_estimate(&mut self) -> Result<(), FilingError> {
        let step = FilingStep::EstimateAudit;
        self.guard(step)?;
        let result = self.documents.retry();
        self.settle(step, result)
    }

    /// Runs generate then compare against the parsed carrier estimate
    pub async fn run_audit(&mut self) -> Result<(), FilingError> {
        let step = FilingStep::EstimateAudit;
        self.guard(step)?;
        if !self.documents.is_parsed() {
            let result = Err(FilingError::invalid_state(
                "Upload your carrier estimate and wait for it to be read first",
            ));
            return self.settle(step, result);
        }
        let port = Arc::clone(&self.port);
        let result = self.audit.run(port.as_ref(), self.claim.id).await.map(|_| ());
        self.settle(step, result)
    }

    pub async fn refresh_audit(&mut self) -> Result<(), FilingError> {
        let step = FilingStep::EstimateAudit;
        self.guard(step)?;
        let port = Arc::clone(&self.port);
        let result = self.audit.refresh(port.as_ref()).await.map(|_| ());
        self.settle(step, result)
    }

    pub async fn retry_audit(&mut self) -> Result<(), FilingError> {
        let step = FilingStep::EstimateAudit;
        self.guard(step)?;
        if !self.audit.can_retry() {
            return self.settle(step, Err(FilingError::invalid_state("There is no failed or stalled audit to retry")));
        }
        let port = Arc::clone(&self.port);
        let result = self.audit.retry(port.as_ref(), self.claim.id).await.map(|_| ());
        self.settle(step, result)
    }

    /// Both sub-flows must have succeeded before step 6 can be completed
    pub fn can_continue_audit_step(&self) -> bool {
        self.documents.is_parsed() && self.audit.has_result()
    }

    pub async fn complete_audit_step(&mut self) -> Result<(), FilingError> {
        let step = FilingStep::EstimateAudit;
        self.guard(step)?;
        let result = self.complete_audit_chain().await;
        self.settle(step, result)
    }

    async fn complete_audit_chain(&mut self) -> Result<(), FilingError> {
        if !self.can_continue_audit_step() {
            return Err(FilingError::invalid_state(
                "Finish parsing and auditing the carrier estimate first",
            ));
        }
        let next = self
            .progress
            .completing(&[FilingStep::EstimateAudit], FilingStep::Payments);
        let claim = self.patch(&next, StepFields::ProgressOnly {}, SAVE_FALLBACK).await?;
        self.adopt(claim, next);
        Ok(())
    }

    /// Stops polling and drops any in-flight parse result
    pub fn teardown(&mut self) {
        self.documents.teardown();
    }

    // ------------------------------------------------------------------
    // Step 7: payments and closing
    // ------------------------------------------------------------------

    /// Records a payment as expected and then received
    ///
    /// If an earlier attempt created the expected record but failed to mark
    /// it received, the retry resumes at mark-received with that record.
    pub async fn record_payment(
        &mut self,
        payment_type: PaymentType,
        amount: Decimal,
        receipt: PaymentReceipt,
    ) -> Result<(), FilingError> {
        let step = FilingStep::Payments;
        self.guard(step)?;
        let result = self.record_payment_chain(payment_type, amount, receipt).await;
        self.settle(step, result)
    }

    async fn record_payment_chain(
        &mut self,
        payment_type: PaymentType,
        amount: Decimal,
        receipt: PaymentReceipt,
    ) -> Result<(), FilingError> {
        if self.payments.is_received(payment_type) {
            return Err(FilingError::PaymentAlreadyRecorded(payment_type));
        }

        let expected = match self.payments.pending(payment_type).cloned() {
            Some(pending) => {
                if pending.amount != amount {
                    warn!(
                        payment_id = %pending.id,
                        recorded = %pending.amount,
                        entered = %amount,
                        "Resuming payment with the amount already recorded"
                    );
                }
                pending
            }
            None => {
                if amount <= Decimal::ZERO {
                    return Err(FilingError::validation("Payment amount must be greater than zero"));
                }
                let created = self
                    .port
                    .create_expected_payment(self.claim.id, payment_type, amount)
                    .await
                    .map_err(|e| FilingError::remote("create_expected_payment", PAYMENT_FALLBACK, e))?;
                self.payments.store(created.clone());
                created
            }
        };

        let received = self
            .port
            .mark_payment_received(expected.id, &receipt)
            .await
            .map_err(|e| FilingError::remote("mark_payment_received", PAYMENT_FALLBACK, e))?;
        info!(claim_id = %self.claim.id, payment_type = %payment_type, amount = %received.amount, "Payment received");
        self.payments.store(received);
        Ok(())
    }

    pub fn request_close(&mut self) -> Result<(), FilingError> {
        self.guard(FilingStep::Payments)?;
        self.close.request();
        Ok(())
    }

    pub fn cancel_close(&mut self) {
        self.close.cancel();
    }

    /// Patches the claim closed; only after [`Self::request_close`]
    pub async fn confirm_close(&mut self) -> Result<(), FilingError> {
        let step = FilingStep::Payments;
        self.guard(step)?;
        let result = self.confirm_close_chain().await;
        self.settle(step, result)
    }

    async fn confirm_close_chain(&mut self) -> Result<(), FilingError> {
        self.close.ensure_requested()?;
        let next = self.progress.completing(&[FilingStep::Payments], FilingStep::Payments);
        let claim = self
            .patch(&next, StepFields::Close { status: ClaimStatus::Closed }, CLOSE_FALLBACK)
            .await?;
        self.adopt(claim, next);
        self.close.cancel();
        info!(claim_id = %self.claim.id, "Claim closed");
        Ok(())
    }

    // ------------------------------------------------------------------
    // Helpers
    // ------------------------------------------------------------------

    /// Refuses actions on locked steps and closed claims before anything changes
    fn guard(&self, step: FilingStep) -> Result<(), FilingError> {
        if self.claim.is_closed() {
            return Err(FilingError::ClaimClosed);
        }
        // Step 1 has no action of its own; the invite completes it
        if step == FilingStep::ContractorInvite && self.progress.current_step() == FilingStep::Overview {
            return Ok(());
        }
        self.progress.ensure_editable(step)
    }

    async fn patch(
        &self,
        next: &ClaimProgress,
        fields: StepFields,
        fallback: &str,
    ) -> Result<Claim, FilingError> {
        let update = StepUpdate::new(next, fields);
        debug!(
            claim_id = %self.claim.id,
            current_step = update.current_step,
            steps_completed = ?update.steps_completed,
            "Patching claim step"
        );
        self.port
            .update_step(self.claim.id, &update)
            .await
            .map_err(|e| FilingError::remote("update_step", fallback, e))
    }

    fn adopt(&mut self, claim: Claim, next: ClaimProgress) {
        if next.current_step() != self.progress.current_step() {
            info!(
                claim_id = %claim.id,
                from = self.progress.current_step().number(),
                to = next.current_step().number(),
                "Claim advanced"
            );
        }
        self.claim = claim;
        self.progress = next;
    }

    fn settle<T>(&mut self, step: FilingStep, result: Result<T, FilingError>) -> Result<T, FilingError> {
        match &result {
            Ok(_) => {
                self.inline_errors.remove(&step);
            }
            Err(e) => {
                debug!(step = ?step, error = %e, "Step action failed");
                self.inline_errors.insert(step, e.to_string());
            }
        }
        result
    }
}
