//! Draft persistence payloads
//!
//! A [`WizardDraft`] is the full wizard state as persisted under the access
//! token. Each write carries a `revision` that grows with every local
//! transition, so the collaborator can refuse a write older than the last
//! one it acknowledged.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::area::ScopeArea;
use crate::encoding;
use crate::error::WizardError;
use crate::wizard::{WizardPhase, WizardState};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WizardDraft {
    #[serde(default)]
    pub areas: Vec<ScopeArea>,
    #[serde(default)]
    pub triage_selections: Vec<String>,
    #[serde(default)]
    pub general_notes: String,
    /// Packed phase, see [`crate::encoding`]
    #[serde(default)]
    pub draft_step: Option<i64>,
    #[serde(default)]
    pub revision: u64,
}

impl WizardDraft {
    pub fn from_state(state: &WizardState, revision: u64) -> Result<Self, WizardError> {
        Ok(Self {
            areas: state.areas.clone(),
            triage_selections: state.triage_selections.clone(),
            general_notes: state.general_notes.clone(),
            draft_step: Some(encoding::encode(state.phase)?),
            revision,
        })
    }

    /// Restores the wizard state
    ///
    /// A tour index past the stored areas lands on the last area, or on
    /// triage when there are none.
    pub fn into_state(self) -> WizardState {
        let mut phase = encoding::decode(self.draft_step);
        if let WizardPhase::Tour(i) = phase {
            if i >= self.areas.len() {
                let clamped = match self.areas.len() {
                    0 => WizardPhase::Triage,
                    n => WizardPhase::Tour(n - 1),
                };
                debug!(stored = i, restored = %clamped, "Clamped draft tour index");
                phase = clamped;
            }
        }
        WizardState {
            phase,
            triage_selections: self.triage_selections,
            areas: self.areas,
            general_notes: self.general_notes,
        }
    }
}

/// The final, non-draft submission
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScopeSheetSubmission {
    pub areas: Vec<ScopeArea>,
    pub triage_selections: Vec<String>,
    pub general_notes: String,
}

impl ScopeSheetSubmission {
    /// Only a wizard in review can be submitted
    pub fn from_state(state: &WizardState) -> Result<Self, WizardError> {
        if state.phase != WizardPhase::Review {
            return Err(WizardError::InvalidTransition {
                action: "submit",
                phase: state.phase,
            });
        }
        Ok(Self {
            areas: state.areas.clone(),
            triage_selections: state.triage_selections.clone(),
            general_notes: state.general_notes.clone(),
        })
    }
}
