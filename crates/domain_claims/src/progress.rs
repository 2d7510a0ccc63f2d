//! Claim progress through the filing steps
//!
//! `ClaimProgress` is the single state object behind step gating. All
//! functions here are pure; the controller computes the next value, runs the
//! remote calls, and only then swaps it in.
//!
//! # Invariants
//!
//! - A step is editable iff it is completed or current
//! - `steps_completed` never shrinks
//! - `current_step` never moves backwards

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use crate::error::FilingError;
use crate::step::{FilingStep, StepStatus};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClaimProgress {
    current_step: FilingStep,
    steps_completed: BTreeSet<FilingStep>,
}

impl Default for ClaimProgress {
    fn default() -> Self {
        Self::new()
    }
}

impl ClaimProgress {
    /// Progress of a brand new claim: on step 1, nothing completed
    pub fn new() -> Self {
        Self {
            current_step: FilingStep::Overview,
            steps_completed: BTreeSet::new(),
        }
    }

    /// Rebuilds progress from the raw numbers stored on a claim record
    pub fn from_numbers(current_step: u8, steps_completed: &[u8]) -> Result<Self, FilingError> {
        let current_step = FilingStep::try_from(current_step)?;
        let steps_completed = steps_completed
            .iter()
            .map(|n| FilingStep::try_from(*n))
            .collect::<Result<BTreeSet<_>, _>>()?;
        Ok(Self { current_step, steps_completed })
    }

    pub fn current_step(&self) -> FilingStep {
        self.current_step
    }

    pub fn steps_completed(&self) -> &BTreeSet<FilingStep> {
        &self.steps_completed
    }

    /// Step numbers in ascending order, as sent to the collaborator
    pub fn completed_numbers(&self) -> Vec<u8> {
        self.steps_completed.iter().map(|s| s.number()).collect()
    }

    pub fn is_completed(&self, step: FilingStep) -> bool {
        self.steps_completed.contains(&step)
    }

    /// Status of a step
    pub fn status(&self, step: FilingStep) -> StepStatus {
        self.status_of(step.number())
    }

    /// Status of an arbitrary step number; numbers outside 1..=7 are upcoming
    pub fn status_of(&self, step_num: u8) -> StepStatus {
        if self.steps_completed.iter().any(|s| s.number() == step_num) {
            StepStatus::Completed
        } else if self.current_step.number() == step_num {
            StepStatus::Current
        } else {
            StepStatus::Upcoming
        }
    }

    /// A locked step still renders, but none of its controls may mutate state
    pub fn is_editable(&self, step: FilingStep) -> bool {
        self.steps_completed.contains(&step) || self.current_step == step
    }

    pub fn ensure_editable(&self, step: FilingStep) -> Result<(), FilingError> {
        if self.is_editable(step) {
            Ok(())
        } else {
            Err(FilingError::StepLocked(step))
        }
    }

    /// Progress after completing `steps` and moving on to `next`
    ///
    /// Re-completing an earlier step (a resend or an edit) keeps the current
    /// step where it is.
    pub fn completing(&self, steps: &[FilingStep], next: FilingStep) -> ClaimProgress {
        let mut steps_completed = self.steps_completed.clone();
        steps_completed.extend(steps.iter().copied());
        ClaimProgress {
            current_step: self.current_step.max(next),
            steps_completed,
        }
    }

    /// True once every step has been completed
    pub fn is_finished(&self) -> bool {
        FilingStep::ALL.iter().all(|s| self.steps_completed.contains(s))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_new_claim_is_on_overview() {
        let progress = ClaimProgress::new();
        assert_eq!(progress.status(FilingStep::Overview), StepStatus::Current);
        assert_eq!(progress.status(FilingStep::ContractorInvite), StepStatus::Upcoming);
        assert!(progress.is_editable(FilingStep::Overview));
        assert!(!progress.is_editable(FilingStep::ContractorInvite));
    }

    #[test]
    fn test_completing_never_moves_current_backwards() {
        let progress = ClaimProgress::from_numbers(5, &[1, 2, 3, 4]).unwrap();
        let edited = progress.completing(&[FilingStep::EstimateComparison], FilingStep::DamageDescription);

        assert_eq!(edited.current_step(), FilingStep::AdjusterDetails);
        assert_eq!(edited.completed_numbers(), vec![1, 2, 3, 4]);
    }

    #[test]
    fn test_from_numbers_rejects_unknown_steps() {
        assert!(ClaimProgress::from_numbers(0, &[]).is_err());
        assert!(ClaimProgress::from_numbers(3, &[1, 9]).is_err());
    }

    #[test]
    fn test_ensure_editable() {
        let progress = ClaimProgress::from_numbers(3, &[1, 2]).unwrap();
        assert!(progress.ensure_editable(FilingStep::ContractorInvite).is_ok());
        assert!(progress.ensure_editable(FilingStep::EstimateComparison).is_ok());
        assert!(matches!(
            progress.ensure_editable(FilingStep::DamageDescription),
            Err(FilingError::StepLocked(FilingStep::DamageDescription))
        ));
    }

    fn progress_strategy() -> impl Strategy<Value = ClaimProgress> {
        (1u8..=7, proptest::collection::btree_set(1u8..=7, 0..=7)).prop_map(|(current, done)| {
            let done: Vec<u8> = done.into_iter().collect();
            ClaimProgress::from_numbers(current, &done).unwrap()
        })
    }

    proptest! {
        #[test]
        fn status_is_determined_by_progress(progress in progress_strategy(), step_num in 0u8..=10) {
            let status = progress.status_of(step_num);
            let completed = progress.steps_completed().iter().any(|s| s.number() == step_num);
            let expected = if completed {
                StepStatus::Completed
            } else if progress.current_step().number() == step_num {
                StepStatus::Current
            } else {
                StepStatus::Upcoming
            };
            prop_assert_eq!(status, expected);
        }

        #[test]
        fn completing_only_grows(progress in progress_strategy(), step in 1u8..=7, next in 1u8..=7) {
            let step = FilingStep::try_from(step).unwrap();
            let next = FilingStep::try_from(next).unwrap();
            let after = progress.completing(&[step], next);

            prop_assert!(progress.steps_completed().is_subset(after.steps_completed()));
            prop_assert!(after.current_step() >= progress.current_step());
            prop_assert!(after.is_completed(step));
        }
    }
}
