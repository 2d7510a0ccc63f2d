//! Command implementations
//!
//! Every command takes its port as a parameter, so the same code runs
//! against the HTTP adapters and the in-memory mocks.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

use core_kernel::{AdapterHealth, ClaimId, HealthCheckResult, HealthCheckable};
use domain_claims::{
    AuditView, ClaimFilingPort, ClaimStatus, FilingStep, PipelineState,
    StepProgressionController, StepStatus,
};
use domain_scope::{AccessToken, AreaCatalog, ScopeSheetPort, WizardPhase, WizardSession};

use crate::error::CliError;

pub fn parse_claim_id(raw: &str) -> Result<ClaimId, CliError> {
    raw.parse()
        .map_err(|e| CliError::invalid_argument(format!("'{}' is not a claim id: {}", raw, e)))
}

// ============================================================================
// claim status
// ============================================================================

/// Step-by-step view of one claim
#[derive(Debug, Clone, PartialEq)]
pub struct ClaimStatusReport {
    pub claim_id: ClaimId,
    pub claim_number: Option<String>,
    pub status: ClaimStatus,
    pub steps: Vec<(FilingStep, StepStatus)>,
    pub carrier_estimate: PipelineState,
}

impl<P: ClaimFilingPort + ?Sized> From<&StepProgressionController<P>> for ClaimStatusReport {
    fn from(controller: &StepProgressionController<P>) -> Self {
        let claim = controller.claim();
        Self {
            claim_id: claim.id,
            claim_number: claim.claim_number.clone(),
            status: claim.status,
            steps: FilingStep::ALL
                .iter()
                .map(|step| (*step, controller.progress().status(*step)))
                .collect(),
            carrier_estimate: controller.documents().state().clone(),
        }
    }
}

impl fmt::Display for ClaimStatusReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let status = match self.status {
            ClaimStatus::Open => "open",
            ClaimStatus::Closed => "closed",
        };
        writeln!(
            f,
            "Claim {} ({}) - {}",
            self.claim_id.labelled(),
            self.claim_number.as_deref().unwrap_or("no claim number"),
            status
        )?;
        for (step, step_status) in &self.steps {
            let marker = match step_status {
                StepStatus::Completed => "[x]",
                StepStatus::Current => "[>]",
                StepStatus::Upcoming => "[ ]",
            };
            writeln!(f, "  {} {}. {}", marker, step.number(), step.title())?;
        }
        write!(f, "Carrier estimate: {}", describe_pipeline(&self.carrier_estimate))
    }
}

pub async fn claim_status<P>(port: Arc<P>, claim_id: ClaimId) -> Result<ClaimStatusReport, CliError>
where
    P: ClaimFilingPort + ?Sized,
{
    let controller = StepProgressionController::load(port, claim_id).await?;
    Ok(ClaimStatusReport::from(&controller))
}

// ============================================================================
// claim watch-parse
// ============================================================================

/// Polls the newest carrier estimate until its parse finishes
///
/// Returns right away when nothing is being parsed.
pub async fn watch_parse<P>(
    port: Arc<P>,
    claim_id: ClaimId,
    interval: Duration,
) -> Result<PipelineState, CliError>
where
    P: ClaimFilingPort + ?Sized,
{
    let mut controller = StepProgressionController::load(port, claim_id).await?;
    let Some(mut task) = controller.watch_parse(interval) else {
        info!(claim_id = %claim_id, "No carrier estimate is being read");
        return Ok(controller.documents().state().clone());
    };

    info!(claim_id = %claim_id, interval_secs = interval.as_secs(), "Watching carrier estimate");
    if let Some(snapshot) = task.wait_terminal().await {
        controller.apply_parse_snapshot(&snapshot);
    }
    controller.teardown();
    Ok(controller.documents().state().clone())
}

pub fn describe_pipeline(state: &PipelineState) -> String {
    match state {
        PipelineState::None => "not uploaded".to_string(),
        PipelineState::Uploading => "uploading".to_string(),
        PipelineState::Parsing { document_id } => format!("being read ({})", document_id.labelled()),
        PipelineState::Parsed(document) => format!("{} read", document.file_name),
        PipelineState::Failed { message } => format!("failed: {}", message),
    }
}

// ============================================================================
// claim audit
// ============================================================================

pub async fn run_audit<P>(port: Arc<P>, claim_id: ClaimId) -> Result<AuditView, CliError>
where
    P: ClaimFilingPort + ?Sized,
{
    let mut controller = StepProgressionController::load(port, claim_id).await?;
    if controller.audit().is_server_pending() {
        info!(claim_id = %claim_id, "Audit still in progress, refreshing");
        controller.refresh_audit().await?;
    } else {
        controller.run_audit().await?;
    }
    Ok(controller.audit().view().clone())
}

pub fn describe_audit(view: &AuditView) -> String {
    match view {
        AuditView::Idle => "No audit has been run".to_string(),
        AuditView::Running => "The audit is still running".to_string(),
        AuditView::Ready { data, .. } => {
            let mut text = format!(
                "{} flagged line items; carrier {} vs industry {} (difference {})",
                data.flagged_count(),
                data.summary.total_carrier,
                data.summary.total_industry,
                data.summary.total_delta
            );
            if let Some(largest) = data.largest_discrepancy() {
                text.push_str(&format!("\nLargest gap: {} ({})", largest.item, largest.delta));
            }
            text
        }
        AuditView::NoData { reason: Some(_), .. } => {
            "The audit finished, but its comparison data could not be read".to_string()
        }
        AuditView::NoData { reason: None, .. } => "The audit finished without comparison data".to_string(),
        AuditView::Failed { message, .. } => format!("Audit failed: {}", message),
    }
}

// ============================================================================
// wizard show
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
pub struct AreaSummary {
    pub label: String,
    pub tags: usize,
    pub dimensions: usize,
    pub photos: usize,
}

/// Where a contractor's saved wizard stands
#[derive(Debug, Clone, PartialEq)]
pub struct WizardSummary {
    pub phase: WizardPhase,
    pub revision: u64,
    pub areas: Vec<AreaSummary>,
    pub general_notes: String,
}

impl fmt::Display for WizardSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Phase: {} (draft revision {})", self.phase, self.revision)?;
        if self.areas.is_empty() {
            write!(f, "No areas selected yet")?;
        }
        for (i, area) in self.areas.iter().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            write!(
                f,
                "  {}: {} tags, {} measurements, {} photos",
                area.label, area.tags, area.dimensions, area.photos
            )?;
        }
        if !self.general_notes.is_empty() {
            write!(f, "\nNotes: {}", self.general_notes)?;
        }
        Ok(())
    }
}

pub async fn wizard_show<P>(port: Arc<P>, token: &str) -> Result<WizardSummary, CliError>
where
    P: ScopeSheetPort + ?Sized,
{
    let token = AccessToken::parse(token)?;
    let session = WizardSession::resume(port, token).await?;
    let state = session.state();

    Ok(WizardSummary {
        phase: state.phase,
        revision: session.revision(),
        areas: state
            .areas
            .iter()
            .map(|area| AreaSummary {
                label: AreaCatalog::get(&area.category_key)
                    .map(|c| c.label.to_string())
                    .unwrap_or_else(|| area.category_key.clone()),
                tags: area.tags.len(),
                dimensions: area.dimensions.len(),
                photos: area.photo_ids.len(),
            })
            .collect(),
        general_notes: state.general_notes.clone(),
    })
}

// ============================================================================
// health
// ============================================================================

pub async fn health(adapters: &[&dyn HealthCheckable]) -> Vec<HealthCheckResult> {
    let mut results = Vec::with_capacity(adapters.len());
    for adapter in adapters {
        results.push(adapter.health_check().await);
    }
    results
}

pub fn all_healthy(results: &[HealthCheckResult]) -> bool {
    results.iter().all(|r| r.status == AdapterHealth::Healthy)
}
