//! Wizard state machine
//!
//! ```text
//! Welcome -> Triage -> Tour(0) -> Tour(1) -> ... -> Tour(n-1) -> Review
//!              ^          |                                        |
//!              +-- back --+               Tour(n-1) <---- back ----+
//! ```
//!
//! Every transition is a pure function from one [`WizardState`] to the next.
//! The session applies the result locally and persists it separately.

use std::fmt;

use crate::area::ScopeArea;
use crate::catalog::AreaCatalog;
use crate::error::WizardError;

/// Where the contractor is in the wizard
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WizardPhase {
    Welcome,
    Triage,
    /// Index into `areas` of the area being inspected
    Tour(usize),
    Review,
}

impl fmt::Display for WizardPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WizardPhase::Welcome => write!(f, "welcome"),
            WizardPhase::Triage => write!(f, "triage"),
            WizardPhase::Tour(i) => write!(f, "tour ({})", i),
            WizardPhase::Review => write!(f, "review"),
        }
    }
}

/// How to treat existing area data when the tour is started again
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RebuildConfirmation {
    /// Refuse if any existing area holds data
    #[default]
    Unconfirmed,
    /// Rebuild even if that drops recorded data
    DiscardExisting,
}

/// The complete wizard state
#[derive(Debug, Clone, PartialEq)]
pub struct WizardState {
    pub phase: WizardPhase,
    /// Selected category keys, in the order they were selected
    pub triage_selections: Vec<String>,
    pub areas: Vec<ScopeArea>,
    pub general_notes: String,
}

impl Default for WizardState {
    fn default() -> Self {
        Self::new()
    }
}

impl WizardState {
    pub fn new() -> Self {
        Self {
            phase: WizardPhase::Welcome,
            triage_selections: Vec::new(),
            areas: Vec::new(),
            general_notes: String::new(),
        }
    }

    /// The tour index; zero outside the tour
    pub fn tour_index(&self) -> usize {
        match self.phase {
            WizardPhase::Tour(i) => i,
            _ => 0,
        }
    }

    /// The area the current tour step owns
    pub fn current_area(&self) -> Option<&ScopeArea> {
        match self.phase {
            WizardPhase::Tour(i) => self.areas.get(i),
            _ => None,
        }
    }

    /// welcome -> triage
    pub fn begin(&self) -> Result<WizardState, WizardError> {
        self.expect_phase("begin", |p| p == WizardPhase::Welcome)?;
        Ok(self.with_phase(WizardPhase::Triage))
    }

    /// Adds or removes a category from the triage selection
    pub fn toggle_category(&self, key: &str) -> Result<WizardState, WizardError> {
        self.expect_phase("change the selection", |p| p == WizardPhase::Triage)?;
        if !AreaCatalog::contains(key) {
            return Err(WizardError::UnknownCategory(key.to_string()));
        }
        let mut next = self.clone();
        match next.triage_selections.iter().position(|k| k == key) {
            Some(index) => {
                next.triage_selections.remove(index);
            }
            None => next.triage_selections.push(key.to_string()),
        }
        Ok(next)
    }

    /// triage -> tour(0), rebuilding `areas` 1:1 from the selections
    pub fn start_tour(&self, confirmation: RebuildConfirmation) -> Result<WizardState, WizardError> {
        self.expect_phase("start the tour", |p| p == WizardPhase::Triage)?;
        if self.triage_selections.is_empty() {
            return Err(WizardError::NoCategoriesSelected);
        }

        let with_data: Vec<String> = self
            .areas
            .iter()
            .filter(|a| !a.is_blank())
            .map(|a| a.category_key.clone())
            .collect();
        if !with_data.is_empty() && confirmation != RebuildConfirmation::DiscardExisting {
            return Err(WizardError::RebuildNeedsConfirmation { areas: with_data });
        }

        let mut next = self.clone();
        next.areas = self.triage_selections.iter().map(ScopeArea::new).collect();
        next.phase = WizardPhase::Tour(0);
        Ok(next)
    }

    /// Merges the edited area back by id, then moves to the next area or to review
    pub fn complete_area(&self, edited: ScopeArea) -> Result<WizardState, WizardError> {
        let WizardPhase::Tour(index) = self.phase else {
            return Err(self.invalid("complete an area"));
        };
        let position = self
            .areas
            .iter()
            .position(|a| a.id == edited.id)
            .ok_or(WizardError::UnknownArea(edited.id))?;

        let mut next = self.clone();
        next.areas[position] = edited;
        next.phase = if index + 1 < next.areas.len() {
            WizardPhase::Tour(index + 1)
        } else {
            WizardPhase::Review
        };
        Ok(next)
    }

    /// One step backwards
    pub fn back(&self) -> Result<WizardState, WizardError> {
        let phase = match self.phase {
            WizardPhase::Tour(0) => WizardPhase::Triage,
            WizardPhase::Tour(i) => WizardPhase::Tour(i - 1),
            WizardPhase::Review if self.areas.is_empty() => WizardPhase::Triage,
            WizardPhase::Review => WizardPhase::Tour(self.areas.len() - 1),
            WizardPhase::Welcome | WizardPhase::Triage => return Err(self.invalid("go back")),
        };
        Ok(self.with_phase(phase))
    }

    pub fn with_general_notes(&self, notes: impl Into<String>) -> WizardState {
        let mut next = self.clone();
        next.general_notes = notes.into();
        next
    }

    fn with_phase(&self, phase: WizardPhase) -> WizardState {
        let mut next = self.clone();
        next.phase = phase;
        next
    }

    fn expect_phase(
        &self,
        action: &'static str,
        allowed: impl Fn(WizardPhase) -> bool,
    ) -> Result<(), WizardError> {
        if allowed(self.phase) {
            Ok(())
        } else {
            Err(self.invalid(action))
        }
    }

    fn invalid(&self, action: &'static str) -> WizardError {
        WizardError::InvalidTransition {
            action,
            phase: self.phase,
        }
    }
}
