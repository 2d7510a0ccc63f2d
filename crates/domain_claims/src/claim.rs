//! Claim record and the step-update request

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use core_kernel::ClaimId;
use crate::error::FilingError;
use crate::progress::ClaimProgress;

/// Claim status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClaimStatus {
    /// Filing in progress
    Open,
    /// Closed by the claim owner after payments
    Closed,
}

/// A claim as returned by the collaborator
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Claim {
    /// Unique identifier
    pub id: ClaimId,
    /// Internal claim reference
    #[serde(default)]
    pub claim_number: Option<String>,
    /// Status
    pub status: ClaimStatus,
    /// Step the owner is working on (1..=7)
    pub current_step: u8,
    /// Completed step numbers
    #[serde(default)]
    pub steps_completed: Vec<u8>,
    /// Policy deductible
    #[serde(default, with = "rust_decimal::serde::float_option")]
    pub deductible: Option<Decimal>,
    /// Invited contractor
    #[serde(default)]
    pub contractor_name: Option<String>,
    #[serde(default)]
    pub contractor_email: Option<String>,
    /// Contractor's repair estimate
    #[serde(default, with = "rust_decimal::serde::float_option")]
    pub contractor_estimate: Option<Decimal>,
    /// Whether the estimate exceeded the deductible when last submitted
    #[serde(default)]
    pub worth_filing: Option<bool>,
    /// Damage description sent to the insurer
    #[serde(default)]
    pub damage_description: Option<String>,
    /// Insurer's adjuster
    #[serde(default)]
    pub adjuster_name: Option<String>,
    #[serde(default)]
    pub adjuster_phone: Option<String>,
    #[serde(default)]
    pub adjuster_email: Option<String>,
    /// Claim number issued by the insurer
    #[serde(default)]
    pub insurer_claim_number: Option<String>,
    /// Updated timestamp
    pub updated_at: DateTime<Utc>,
}

impl Claim {
    /// Creates a fresh open claim on step 1
    pub fn new(id: ClaimId) -> Self {
        Self {
            id,
            claim_number: None,
            status: ClaimStatus::Open,
            current_step: 1,
            steps_completed: Vec::new(),
            deductible: None,
            contractor_name: None,
            contractor_email: None,
            contractor_estimate: None,
            worth_filing: None,
            damage_description: None,
            adjuster_name: None,
            adjuster_phone: None,
            adjuster_email: None,
            insurer_claim_number: None,
            updated_at: Utc::now(),
        }
    }

    /// Derives the step progress stored on the record
    pub fn progress(&self) -> Result<ClaimProgress, FilingError> {
        ClaimProgress::from_numbers(self.current_step, &self.steps_completed)
    }

    pub fn is_closed(&self) -> bool {
        self.status == ClaimStatus::Closed
    }

    /// Applies an update the way the collaborator does
    pub fn apply(&mut self, update: &StepUpdate) {
        self.current_step = update.current_step;
        self.steps_completed = update.steps_completed.clone();
        match &update.fields {
            StepFields::Contractor { contractor_name, contractor_email } => {
                self.contractor_name = Some(contractor_name.clone());
                self.contractor_email = Some(contractor_email.clone());
            }
            StepFields::Estimate { contractor_estimate, worth_filing } => {
                self.contractor_estimate = Some(*contractor_estimate);
                self.worth_filing = Some(*worth_filing);
            }
            StepFields::Description { damage_description } => {
                self.damage_description = Some(damage_description.clone());
            }
            StepFields::Adjuster {
                adjuster_name,
                adjuster_phone,
                adjuster_email,
                insurer_claim_number,
            } => {
                if adjuster_name.is_some() {
                    self.adjuster_name = adjuster_name.clone();
                }
                if adjuster_phone.is_some() {
                    self.adjuster_phone = adjuster_phone.clone();
                }
                if adjuster_email.is_some() {
                    self.adjuster_email = adjuster_email.clone();
                }
                self.insurer_claim_number = Some(insurer_claim_number.clone());
            }
            StepFields::Close { status } => {
                self.status = *status;
            }
            StepFields::ProgressOnly {} => {}
        }
        self.updated_at = Utc::now();
    }
}

/// Body of a step update: progress plus the step's own fields
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StepUpdate {
    pub current_step: u8,
    pub steps_completed: Vec<u8>,
    #[serde(flatten)]
    pub fields: StepFields,
}

impl StepUpdate {
    pub fn new(progress: &ClaimProgress, fields: StepFields) -> Self {
        Self {
            current_step: progress.current_step().number(),
            steps_completed: progress.completed_numbers(),
            fields,
        }
    }
}

/// Step-specific fields carried by a step update
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum StepFields {
    Contractor {
        contractor_name: String,
        contractor_email: String,
    },
    Estimate {
        #[serde(with = "rust_decimal::serde::float")]
        contractor_estimate: Decimal,
        worth_filing: bool,
    },
    Description {
        damage_description: String,
    },
    Adjuster {
        #[serde(skip_serializing_if = "Option::is_none")]
        adjuster_name: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        adjuster_phone: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        adjuster_email: Option<String>,
        insurer_claim_number: String,
    },
    Close {
        status: ClaimStatus,
    },
    ProgressOnly {},
}
