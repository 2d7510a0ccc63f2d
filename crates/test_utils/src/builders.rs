//! Test Data Builders
//!
//! Builders for constructing test data with sensible defaults. Tests set
//! only the fields they care about.

use rust_decimal::Decimal;

use core_kernel::{ClaimId, PhotoId};
use domain_claims::audit::ComparisonSummary;
use domain_claims::{Claim, ClaimStatus, ComparisonData, Discrepancy};
use domain_scope::{ScopeArea, WizardDraft, WizardPhase, WizardState};

use crate::fixtures::ClaimFixtures;

/// Builder for claim records
pub struct ClaimBuilder {
    claim: Claim,
}

impl Default for ClaimBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ClaimBuilder {
    /// An open claim on step 1 with the standard deductible
    pub fn new() -> Self {
        Self { claim: ClaimFixtures::new_claim() }
    }

    pub fn with_id(mut self, id: ClaimId) -> Self {
        self.claim.id = id;
        self
    }

    /// Puts the owner on `step` with every earlier step completed
    pub fn on_step(mut self, step: u8) -> Self {
        self.claim.current_step = step;
        self.claim.steps_completed = (1..step).collect();
        self
    }

    pub fn with_completed(mut self, steps: &[u8]) -> Self {
        self.claim.steps_completed = steps.to_vec();
        self
    }

    pub fn with_deductible(mut self, deductible: Option<Decimal>) -> Self {
        self.claim.deductible = deductible;
        self
    }

    pub fn with_contractor(mut self, name: impl Into<String>, email: impl Into<String>) -> Self {
        self.claim.contractor_name = Some(name.into());
        self.claim.contractor_email = Some(email.into());
        self
    }

    pub fn with_contractor_estimate(mut self, estimate: Decimal) -> Self {
        self.claim.contractor_estimate = Some(estimate);
        self
    }

    pub fn with_claim_number(mut self, number: impl Into<String>) -> Self {
        self.claim.claim_number = Some(number.into());
        self
    }

    pub fn closed(mut self) -> Self {
        self.claim.status = ClaimStatus::Closed;
        self
    }

    pub fn build(self) -> Claim {
        self.claim
    }
}

/// Builder for scope areas
pub struct ScopeAreaBuilder {
    area: ScopeArea,
}

impl ScopeAreaBuilder {
    pub fn new(category_key: impl Into<String>) -> Self {
        Self { area: ScopeArea::new(category_key) }
    }

    /// Adds a tag without checking it against the catalog
    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.area.tags.insert(tag.into());
        self
    }

    pub fn with_dimension(mut self, key: impl Into<String>, value: f64) -> Self {
        self.area.dimensions.insert(key.into(), value);
        self
    }

    pub fn with_photo(mut self) -> Self {
        self.area.photo_ids.push(PhotoId::new_v7());
        self
    }

    pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
        self.area.notes = notes.into();
        self
    }

    pub fn build(self) -> ScopeArea {
        self.area
    }
}

/// Builder for saved wizard drafts
///
/// Areas are added to the triage selections in the same order, which is
/// what a tour started from triage produces.
pub struct WizardDraftBuilder {
    state: WizardState,
    revision: u64,
}

impl Default for WizardDraftBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl WizardDraftBuilder {
    pub fn new() -> Self {
        Self { state: WizardState::new(), revision: 1 }
    }

    pub fn with_area(mut self, area: ScopeArea) -> Self {
        self.state.triage_selections.push(area.category_key.clone());
        self.state.areas.push(area);
        self
    }

    pub fn at(mut self, phase: WizardPhase) -> Self {
        self.state.phase = phase;
        self
    }

    pub fn with_general_notes(mut self, notes: impl Into<String>) -> Self {
        self.state.general_notes = notes.into();
        self
    }

    pub fn with_revision(mut self, revision: u64) -> Self {
        self.revision = revision;
        self
    }

    pub fn state(&self) -> &WizardState {
        &self.state
    }

    /// Builds the draft; panics if the phase cannot be encoded
    pub fn build(self) -> WizardDraft {
        WizardDraft::from_state(&self.state, self.revision).expect("phase should encode")
    }
}

/// Builder for audit comparison data; the summary is derived from the items
#[derive(Default)]
pub struct ComparisonDataBuilder {
    discrepancies: Vec<Discrepancy>,
}

impl ComparisonDataBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_item(mut self, item: impl Into<String>, industry_price: Decimal, carrier_price: Decimal) -> Self {
        self.discrepancies.push(Discrepancy {
            item: item.into(),
            industry_price,
            carrier_price,
            delta: industry_price - carrier_price,
            justification: String::new(),
        });
        self
    }

    pub fn build(self) -> ComparisonData {
        let total_industry: Decimal = self.discrepancies.iter().map(|d| d.industry_price).sum();
        let total_carrier: Decimal = self.discrepancies.iter().map(|d| d.carrier_price).sum();
        ComparisonData {
            discrepancies: self.discrepancies,
            summary: ComparisonSummary {
                total_industry,
                total_carrier,
                total_delta: total_industry - total_carrier,
            },
        }
    }

    /// The `comparison_data` string the collaborator would store
    pub fn into_json(self) -> String {
        serde_json::to_string(&self.build()).expect("comparison data should serialize")
    }
}
