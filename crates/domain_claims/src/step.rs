//! The seven filing steps

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::FilingError;

/// A step of the claim filing process
///
/// Serialized as its step number (1..=7), which is what the claim record
/// stores in `current_step` and `steps_completed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum FilingStep {
    /// Informational overview of the process
    Overview = 1,
    /// Invite a contractor to inspect the damage
    ContractorInvite = 2,
    /// Compare the contractor's estimate with the deductible
    EstimateComparison = 3,
    /// Describe the damage and notify the insurer
    DamageDescription = 4,
    /// Record adjuster and insurer claim number
    AdjusterDetails = 5,
    /// Parse the carrier estimate and audit it
    EstimateAudit = 6,
    /// Track ACV/RCV payments and close the claim
    Payments = 7,
}

impl FilingStep {
    /// Every step in filing order
    pub const ALL: [FilingStep; 7] = [
        FilingStep::Overview,
        FilingStep::ContractorInvite,
        FilingStep::EstimateComparison,
        FilingStep::DamageDescription,
        FilingStep::AdjusterDetails,
        FilingStep::EstimateAudit,
        FilingStep::Payments,
    ];

    /// The step number as stored on the claim
    pub fn number(self) -> u8 {
        self as u8
    }

    /// The following step; the last step is its own successor
    pub fn next(self) -> FilingStep {
        match self {
            FilingStep::Overview => FilingStep::ContractorInvite,
            FilingStep::ContractorInvite => FilingStep::EstimateComparison,
            FilingStep::EstimateComparison => FilingStep::DamageDescription,
            FilingStep::DamageDescription => FilingStep::AdjusterDetails,
            FilingStep::AdjusterDetails => FilingStep::EstimateAudit,
            FilingStep::EstimateAudit | FilingStep::Payments => FilingStep::Payments,
        }
    }

    pub fn title(self) -> &'static str {
        match self {
            FilingStep::Overview => "How filing works",
            FilingStep::ContractorInvite => "Invite your contractor",
            FilingStep::EstimateComparison => "Is it worth filing?",
            FilingStep::DamageDescription => "Describe the damage",
            FilingStep::AdjusterDetails => "Adjuster details",
            FilingStep::EstimateAudit => "Audit the carrier estimate",
            FilingStep::Payments => "Payments and closing",
        }
    }
}

impl TryFrom<u8> for FilingStep {
    type Error = FilingError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        FilingStep::ALL
            .get(usize::from(value).wrapping_sub(1))
            .copied()
            .ok_or(FilingError::InvalidStep(value))
    }
}

impl From<FilingStep> for u8 {
    fn from(step: FilingStep) -> u8 {
        step.number()
    }
}

impl fmt::Display for FilingStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.number())
    }
}

/// How a step renders for the claim owner
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepStatus {
    Completed,
    Current,
    Upcoming,
}
