//! Estimate audit (step 6)
//!
//! Two sequential calls: generate creates a report, compare fills in its
//! comparison data. The report is then fetched and its `status` decides the
//! outcome; the progress phases shown meanwhile are purely time-driven.
//!
//! `comparison_data` arrives as a JSON-encoded string. Anything unreadable
//! becomes [`ComparisonOutcome::Malformed`] and the view shows an explicit
//! "no data" state instead of an error.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, info, warn};

use core_kernel::{AuditReportId, ClaimId};

use crate::error::FilingError;
use crate::ports::ClaimFilingPort;

/// How long each cosmetic progress phase is shown
pub const AUDIT_PHASE_PERIOD: Duration = Duration::from_millis(2500);

const GENERATE_FALLBACK: &str = "Failed to generate audit report";
const COMPARE_FALLBACK: &str = "Failed to compare estimates";
const FETCH_FALLBACK: &str = "Failed to load audit report";
const AUDIT_FAILED_FALLBACK: &str = "The audit could not be completed";

/// Server-side audit status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditStatus {
    Pending,
    Processing,
    Completed,
    Failed,
}

/// An audit report as the collaborator returns it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditReport {
    pub id: AuditReportId,
    /// JSON-encoded [`ComparisonData`]
    #[serde(default)]
    pub comparison_data: Option<String>,
    pub status: AuditStatus,
    #[serde(default)]
    pub error_message: Option<String>,
}

impl AuditReport {
    /// Completed and carrying comparison data
    pub fn has_result(&self) -> bool {
        self.status == AuditStatus::Completed && self.comparison_data.is_some()
    }

    /// Parses the comparison data without ever failing
    pub fn comparison(&self) -> ComparisonOutcome {
        let Some(raw) = self.comparison_data.as_deref() else {
            return ComparisonOutcome::Absent;
        };
        match serde_json::from_str::<ComparisonData>(raw) {
            Ok(data) => ComparisonOutcome::Parsed(data),
            Err(e) => ComparisonOutcome::Malformed { reason: e.to_string() },
        }
    }
}

/// One line item where carrier and industry pricing differ
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Discrepancy {
    pub item: String,
    #[serde(with = "rust_decimal::serde::float")]
    pub industry_price: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub carrier_price: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub delta: Decimal,
    #[serde(default)]
    pub justification: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComparisonSummary {
    #[serde(with = "rust_decimal::serde::float")]
    pub total_industry: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub total_carrier: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub total_delta: Decimal,
}

/// Decoded `comparison_data`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComparisonData {
    #[serde(default)]
    pub discrepancies: Vec<Discrepancy>,
    pub summary: ComparisonSummary,
}

impl ComparisonData {
    /// Line items where the carrier priced below the industry rate
    pub fn flagged_count(&self) -> usize {
        self.discrepancies
            .iter()
            .filter(|d| d.delta > Decimal::ZERO)
            .count()
    }

    /// The discrepancy with the largest absolute delta
    pub fn largest_discrepancy(&self) -> Option<&Discrepancy> {
        self.discrepancies.iter().max_by_key(|d| d.delta.abs())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ComparisonOutcome {
    Parsed(ComparisonData),
    Absent,
    Malformed { reason: String },
}

/// Cosmetic progress phase shown while the audit runs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AnalysisPhase {
    ReadingEstimate,
    PricingLineItems,
    ComparingIndustryRates,
    DraftingReport,
}

impl AnalysisPhase {
    pub const ALL: [AnalysisPhase; 4] = [
        AnalysisPhase::ReadingEstimate,
        AnalysisPhase::PricingLineItems,
        AnalysisPhase::ComparingIndustryRates,
        AnalysisPhase::DraftingReport,
    ];

    /// Phase for the time elapsed since the audit started; cycles forever
    pub fn at(elapsed: Duration, period: Duration) -> AnalysisPhase {
        let period_ms = period.as_millis().max(1);
        let index = (elapsed.as_millis() / period_ms) % Self::ALL.len() as u128;
        Self::ALL[index as usize]
    }

    pub fn label(self) -> &'static str {
        match self {
            AnalysisPhase::ReadingEstimate => "Reading your carrier's estimate",
            AnalysisPhase::PricingLineItems => "Pricing each line item",
            AnalysisPhase::ComparingIndustryRates => "Comparing against industry rates",
            AnalysisPhase::DraftingReport => "Drafting your audit report",
        }
    }
}

/// What the audit panel shows
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuditView {
    Idle,
    Running,
    Ready {
        report: AuditReport,
        data: ComparisonData,
    },
    /// Completed, but nothing usable to show
    NoData {
        report: AuditReport,
        reason: Option<String>,
    },
    Failed {
        message: String,
        report_id: Option<AuditReportId>,
    },
}

/// Runs the generate/compare sequence and tracks the result
#[derive(Debug, Clone)]
pub struct AuditEngine {
    view: AuditView,
    report_id: Option<AuditReportId>,
    /// The last fetched report was still pending or processing
    server_pending: bool,
}

impl Default for AuditEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl AuditEngine {
    pub fn new() -> Self {
        Self {
            view: AuditView::Idle,
            report_id: None,
            server_pending: false,
        }
    }

    pub fn view(&self) -> &AuditView {
        &self.view
    }

    pub fn report_id(&self) -> Option<AuditReportId> {
        self.report_id
    }

    /// True only for a completed report with readable comparison data
    pub fn has_result(&self) -> bool {
        matches!(self.view, AuditView::Ready { .. })
    }

    pub fn is_running(&self) -> bool {
        self.view == AuditView::Running
    }

    /// The collaborator reported the current report as still in progress
    pub fn is_server_pending(&self) -> bool {
        self.is_running() && self.server_pending
    }

    /// Failed, or left running by a report or call that never finished
    pub fn can_retry(&self) -> bool {
        matches!(self.view, AuditView::Failed { .. } | AuditView::Running)
    }

    /// generate, then compare, then read the report's terminal state
    ///
    /// `&mut self` rules out a second call in flight, so a `Running` view
    /// only blocks a new run while the server is still working on a report.
    /// A view left behind by a dropped future does not.
    pub async fn run<P>(&mut self, port: &P, claim_id: ClaimId) -> Result<&AuditView, FilingError>
    where
        P: ClaimFilingPort + ?Sized,
    {
        if self.is_server_pending() {
            return Err(FilingError::invalid_state("An audit is already running"));
        }
        self.view = AuditView::Running;
        self.server_pending = false;
        info!(claim_id = %claim_id, "Generating estimate audit");

        let report_id = match port.generate_audit(claim_id).await {
            Ok(id) => id,
            Err(e) => return Err(self.fail(FilingError::remote("generate_audit", GENERATE_FALLBACK, e), None)),
        };
        self.report_id = Some(report_id);

        // A failed compare leaves the generated report orphaned on the server
        if let Err(e) = port.compare_audit(report_id).await {
            return Err(self.fail(
                FilingError::remote("compare_audit", COMPARE_FALLBACK, e),
                Some(report_id),
            ));
        }

        self.refresh_with(port, report_id).await
    }

    /// Re-reads the current report
    pub async fn refresh<P>(&mut self, port: &P) -> Result<&AuditView, FilingError>
    where
        P: ClaimFilingPort + ?Sized,
    {
        let report_id = self
            .report_id
            .ok_or_else(|| FilingError::invalid_state("No audit has been generated"))?;
        self.refresh_with(port, report_id).await
    }

    /// Re-invokes the full two-call sequence after a failure or a stalled run
    pub async fn retry<P>(&mut self, port: &P, claim_id: ClaimId) -> Result<&AuditView, FilingError>
    where
        P: ClaimFilingPort + ?Sized,
    {
        debug!(claim_id = %claim_id, previous = ?self.report_id, "Retrying audit");
        self.view = AuditView::Idle;
        self.server_pending = false;
        self.run(port, claim_id).await
    }

    /// Applies a fetched report
    pub fn apply_report(&mut self, report: AuditReport) -> &AuditView {
        self.report_id = Some(report.id);
        self.server_pending = matches!(report.status, AuditStatus::Pending | AuditStatus::Processing);
        self.view = match report.status {
            AuditStatus::Failed => {
                let message = report
                    .error_message
                    .clone()
                    .filter(|m| !m.trim().is_empty())
                    .unwrap_or_else(|| AUDIT_FAILED_FALLBACK.to_string());
                warn!(report_id = %report.id, %message, "Audit failed");
                AuditView::Failed {
                    message,
                    report_id: Some(report.id),
                }
            }
            AuditStatus::Pending | AuditStatus::Processing => AuditView::Running,
            AuditStatus::Completed => match report.comparison() {
                ComparisonOutcome::Parsed(data) => AuditView::Ready { report, data },
                ComparisonOutcome::Absent => AuditView::NoData { report, reason: None },
                ComparisonOutcome::Malformed { reason } => {
                    warn!(report_id = %report.id, %reason, "Unreadable comparison data");
                    AuditView::NoData {
                        report,
                        reason: Some(reason),
                    }
                }
            },
        };
        &self.view
    }

    async fn refresh_with<P>(&mut self, port: &P, report_id: AuditReportId) -> Result<&AuditView, FilingError>
    where
        P: ClaimFilingPort + ?Sized,
    {
        match port.fetch_audit(report_id).await {
            Ok(report) => Ok(self.apply_report(report)),
            Err(e) => Err(self.fail(FilingError::remote("fetch_audit", FETCH_FALLBACK, e), Some(report_id))),
        }
    }

    fn fail(&mut self, error: FilingError, report_id: Option<AuditReportId>) -> FilingError {
        warn!(error = %error, "Audit call failed");
        self.server_pending = false;
        self.view = AuditView::Failed {
            message: error.to_string(),
            report_id,
        };
        error
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ports::mock::{AuditScript, MockClaimFilingPort};
    use rust_decimal_macros::dec;

    fn report(status: AuditStatus, data: Option<&str>) -> AuditReport {
        AuditReport {
            id: AuditReportId::new_v7(),
            comparison_data: data.map(str::to_string),
            status,
            error_message: None,
        }
    }

    const SAMPLE: &str = r#"{
        "discrepancies": [
            {"item": "Shingles", "industry_price": 4200, "carrier_price": 3100, "delta": 1100, "justification": "Regional pricing"},
            {"item": "Drip edge", "industry_price": 300.5, "carrier_price": 350.5, "delta": -50, "justification": ""}
        ],
        "summary": {"total_industry": 4500.5, "total_carrier": 3450.5, "total_delta": 1050}
    }"#;

    #[test]
    fn test_phase_cycles_with_elapsed_time() {
        let period = AUDIT_PHASE_PERIOD;
        assert_eq!(AnalysisPhase::at(Duration::ZERO, period), AnalysisPhase::ReadingEstimate);
        assert_eq!(AnalysisPhase::at(Duration::from_millis(2499), period), AnalysisPhase::ReadingEstimate);
        assert_eq!(AnalysisPhase::at(Duration::from_millis(2500), period), AnalysisPhase::PricingLineItems);
        assert_eq!(AnalysisPhase::at(Duration::from_millis(7500), period), AnalysisPhase::DraftingReport);
        assert_eq!(AnalysisPhase::at(Duration::from_secs(10), period), AnalysisPhase::ReadingEstimate);
    }

    #[test]
    fn test_has_result_requires_completed_and_data() {
        assert!(report(AuditStatus::Completed, Some(SAMPLE)).has_result());
        assert!(!report(AuditStatus::Completed, None).has_result());
        assert!(!report(AuditStatus::Processing, Some(SAMPLE)).has_result());
    }

    #[test]
    fn test_comparison_parses_numbers() {
        let ComparisonOutcome::Parsed(data) = report(AuditStatus::Completed, Some(SAMPLE)).comparison() else {
            panic!("expected parsed comparison");
        };
        assert_eq!(data.summary.total_delta, dec!(1050));
        assert_eq!(data.flagged_count(), 1);
        assert_eq!(data.largest_discrepancy().map(|d| d.item.as_str()), Some("Shingles"));
    }

    #[test]
    fn test_malformed_comparison_degrades_to_no_data() {
        let mut engine = AuditEngine::new();
        let view = engine.apply_report(report(AuditStatus::Completed, Some("{not json")));

        assert!(matches!(view, AuditView::NoData { reason: Some(_), .. }));
        assert!(!engine.has_result());
    }

    #[test]
    fn test_processing_report_blocks_a_new_run_but_allows_retry() {
        let mut engine = AuditEngine::new();
        engine.apply_report(report(AuditStatus::Processing, None));

        assert!(engine.is_server_pending());
        assert!(engine.can_retry());
    }

    #[tokio::test]
    async fn test_abandoned_run_does_not_block_a_new_one() {
        let port = MockClaimFilingPort::new();
        let mut engine = AuditEngine::new();
        // Future dropped before generate returned
        engine.view = AuditView::Running;

        engine.run(&port, ClaimId::new_v7()).await.unwrap();

        assert!(engine.has_result());
        assert!(!engine.is_server_pending());
    }

    #[tokio::test]
    async fn test_run_refused_while_server_is_processing() {
        let port = MockClaimFilingPort::new();
        port.script_audit(AuditScript {
            status: AuditStatus::Processing,
            comparison_data: None,
            error_message: None,
        })
        .await;
        let mut engine = AuditEngine::new();

        engine.run(&port, ClaimId::new_v7()).await.unwrap();
        assert!(engine.is_server_pending());
        assert!(engine.run(&port, ClaimId::new_v7()).await.is_err());

        port.script_audit(AuditScript {
            status: AuditStatus::Completed,
            comparison_data: Some(SAMPLE.to_string()),
            error_message: None,
        })
        .await;
        engine.retry(&port, ClaimId::new_v7()).await.unwrap();
        assert!(engine.has_result());
    }

    #[test]
    fn test_failed_report_surfaces_error_message() {
        let mut engine = AuditEngine::new();
        let mut failed = report(AuditStatus::Failed, None);
        failed.error_message = Some("Estimate has no line items".to_string());

        match engine.apply_report(failed) {
            AuditView::Failed { message, .. } => assert_eq!(message, "Estimate has no line items"),
            other => panic!("unexpected view: {:?}", other),
        }
    }
}
