//! Packed `draft_step` wire format
//!
//! Drafts store the wizard position as one integer. Only the persistence
//! boundary uses it; everywhere else the position is a [`WizardPhase`].
//!
//! Version 1:
//!
//! | phase       | value    |
//! |-------------|----------|
//! | welcome     | 1        |
//! | triage      | 2        |
//! | tour(i)     | 10 + i   |
//! | review      | 99       |
//!
//! Tour indices are limited to `0..=88` so they never collide with review.
//! Any value that does not decode (including a missing one) means welcome.

use crate::error::WizardError;
use crate::wizard::WizardPhase;

pub const DRAFT_STEP_VERSION: u32 = 1;

const WELCOME: i64 = 1;
const TRIAGE: i64 = 2;
const TOUR_BASE: i64 = 10;
const REVIEW: i64 = 99;

/// Largest tour index that fits below the review value
pub const MAX_TOUR_INDEX: usize = (REVIEW - TOUR_BASE - 1) as usize;

pub fn encode(phase: WizardPhase) -> Result<i64, WizardError> {
    match phase {
        WizardPhase::Welcome => Ok(WELCOME),
        WizardPhase::Triage => Ok(TRIAGE),
        WizardPhase::Tour(i) if i <= MAX_TOUR_INDEX => Ok(TOUR_BASE + i as i64),
        WizardPhase::Tour(i) => Err(WizardError::EncodingOutOfRange(i)),
        WizardPhase::Review => Ok(REVIEW),
    }
}

pub fn decode(value: Option<i64>) -> WizardPhase {
    match value {
        Some(TRIAGE) => WizardPhase::Triage,
        Some(REVIEW) => WizardPhase::Review,
        Some(v) if (TOUR_BASE..REVIEW).contains(&v) => WizardPhase::Tour((v - TOUR_BASE) as usize),
        _ => WizardPhase::Welcome,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_fixed_values() {
        assert_eq!(encode(WizardPhase::Welcome).unwrap(), 1);
        assert_eq!(encode(WizardPhase::Triage).unwrap(), 2);
        assert_eq!(encode(WizardPhase::Tour(0)).unwrap(), 10);
        assert_eq!(encode(WizardPhase::Tour(5)).unwrap(), 15);
        assert_eq!(encode(WizardPhase::Review).unwrap(), 99);
    }

    #[test]
    fn test_unrecognized_values_decode_to_welcome() {
        for value in [None, Some(0), Some(3), Some(9), Some(100), Some(-10), Some(i64::MAX)] {
            assert_eq!(decode(value), WizardPhase::Welcome, "value {:?}", value);
        }
    }

    #[test]
    fn test_tour_index_limit() {
        assert_eq!(encode(WizardPhase::Tour(MAX_TOUR_INDEX)).unwrap(), 98);
        assert!(matches!(
            encode(WizardPhase::Tour(MAX_TOUR_INDEX + 1)),
            Err(WizardError::EncodingOutOfRange(89))
        ));
    }

    proptest! {
        #[test]
        fn tour_round_trips(i in 0usize..=MAX_TOUR_INDEX) {
            let phase = WizardPhase::Tour(i);
            prop_assert_eq!(decode(Some(encode(phase).unwrap())), phase);
        }

        #[test]
        fn every_integer_decodes(value in any::<i64>()) {
            let phase = decode(Some(value));
            let reencoded = encode(phase).unwrap();
            prop_assert!(reencoded == value || phase == WizardPhase::Welcome);
        }
    }

    #[test]
    fn test_non_tour_phases_round_trip() {
        for phase in [WizardPhase::Welcome, WizardPhase::Triage, WizardPhase::Review] {
            assert_eq!(decode(Some(encode(phase).unwrap())), phase);
        }
    }
}
