//! Claim Filing Domain
//!
//! This crate guides a claim owner through the seven filing steps, from the
//! contractor invite to payments and closing.
//!
//! # Filing Steps
//!
//! ```text
//! Overview -> Contractor -> Estimate -> Description -> Adjuster -> Audit -> Payments
//! ```
//!
//! A step is editable iff it is completed or current. Step 6 embeds two
//! sub-flows, the carrier-estimate [`DocumentPipeline`] and the
//! [`AuditEngine`]; both must succeed before the step can be completed.

pub mod audit;
pub mod claim;
pub mod closing;
pub mod controller;
pub mod document;
pub mod error;
pub mod forms;
pub mod payment;
pub mod ports;
pub mod progress;
pub mod step;

pub use audit::{
    AnalysisPhase, AuditEngine, AuditReport, AuditStatus, AuditView, ComparisonData,
    ComparisonOutcome, Discrepancy, AUDIT_PHASE_PERIOD,
};
pub use claim::{Claim, ClaimStatus, StepFields, StepUpdate};
pub use closing::CloseConfirmation;
pub use controller::StepProgressionController;
pub use document::{
    CarrierEstimateDocument, DocumentPipeline, ParsePollTask, ParsePoller, ParseSnapshot,
    ParseStatus, PipelineState, PollOutcome, SelectedFile, PARSE_POLL_INTERVAL,
};
pub use error::FilingError;
pub use forms::{AdjusterForm, ContractorInvite, DamageDescription, EstimateComparison};
pub use payment::{Payment, PaymentLedger, PaymentReceipt, PaymentStatus, PaymentType};
pub use ports::{ClaimFilingPort, ContractorTokenGrant};
pub use progress::ClaimProgress;
pub use step::{FilingStep, StepStatus};

#[cfg(any(test, feature = "mock"))]
pub use ports::mock::MockClaimFilingPort;
