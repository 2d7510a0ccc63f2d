//! Per-step inputs and their client-side validation
//!
//! Everything here runs before a remote call is made. A failure is a
//! [`FilingError::Validation`] and never reaches the network.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationErrors};

use crate::error::FilingError;

/// Shortest accepted damage description, in characters after trimming
pub const DESCRIPTION_MIN_CHARS: usize = 20;
/// Longest accepted damage description, in characters after trimming
pub const DESCRIPTION_MAX_CHARS: usize = 2000;

fn first_message(errors: &ValidationErrors) -> String {
    let mut fields: Vec<_> = errors.field_errors().into_iter().collect();
    fields.sort_by(|a, b| a.0.cmp(&b.0));
    fields
        .into_iter()
        .flat_map(|(field, errs)| errs.iter().map(move |e| (field.clone(), e)))
        .map(|(field, e)| match &e.message {
            Some(message) => message.to_string(),
            None => format!("{} is invalid", field),
        })
        .next()
        .unwrap_or_else(|| "Invalid input".to_string())
}

/// Step 2: the contractor to invite
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate)]
pub struct ContractorInvite {
    #[validate(length(min = 1, message = "Contractor name is required"))]
    pub name: String,
    #[validate(email(message = "Enter a valid contractor email"))]
    pub email: String,
}

impl ContractorInvite {
    /// Trims and validates the invite
    pub fn new(name: impl Into<String>, email: impl Into<String>) -> Result<Self, FilingError> {
        let invite = Self {
            name: name.into().trim().to_string(),
            email: email.into().trim().to_string(),
        };
        invite
            .validate()
            .map_err(|e| FilingError::Validation(first_message(&e)))?;
        Ok(invite)
    }
}

/// Step 3: the contractor's estimate against the policy deductible
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EstimateComparison {
    pub estimate: Decimal,
    pub deductible: Decimal,
    pub worth_filing: bool,
}

impl EstimateComparison {
    /// Recomputes the comparison; worth filing only if the estimate is strictly larger
    pub fn compute(estimate: Decimal, deductible: Decimal) -> Result<Self, FilingError> {
        if estimate.is_sign_negative() {
            return Err(FilingError::validation("Estimate cannot be negative"));
        }
        if deductible.is_sign_negative() {
            return Err(FilingError::validation("Deductible cannot be negative"));
        }
        Ok(Self {
            estimate,
            deductible,
            worth_filing: estimate > deductible,
        })
    }

    /// How much the estimate exceeds the deductible (zero if it does not)
    pub fn expected_payout(&self) -> Decimal {
        (self.estimate - self.deductible).max(Decimal::ZERO)
    }
}

/// Step 4: the damage description, trimmed
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DamageDescription(String);

impl DamageDescription {
    pub fn parse(text: &str) -> Result<Self, FilingError> {
        let trimmed = text.trim();
        let chars = trimmed.chars().count();
        if chars < DESCRIPTION_MIN_CHARS {
            return Err(FilingError::validation(format!(
                "Description must be at least {} characters ({} so far)",
                DESCRIPTION_MIN_CHARS, chars
            )));
        }
        if chars > DESCRIPTION_MAX_CHARS {
            return Err(FilingError::validation(format!(
                "Description must be at most {} characters ({} entered)",
                DESCRIPTION_MAX_CHARS, chars
            )));
        }
        Ok(Self(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_inner(self) -> String {
        self.0
    }
}

/// Step 5: adjuster details; each submission adds information, the form is
/// cleared after it succeeds
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, Validate)]
pub struct AdjusterForm {
    pub adjuster_name: Option<String>,
    pub adjuster_phone: Option<String>,
    #[validate(email(message = "Enter a valid adjuster email"))]
    pub adjuster_email: Option<String>,
    #[validate(length(min = 1, message = "Claim number is required"))]
    pub insurer_claim_number: String,
}

fn non_blank(value: &Option<String>) -> Option<String> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

impl AdjusterForm {
    /// Returns a trimmed copy with blank optionals dropped, or the first problem
    pub fn validated(&self) -> Result<AdjusterForm, FilingError> {
        let cleaned = AdjusterForm {
            adjuster_name: non_blank(&self.adjuster_name),
            adjuster_phone: non_blank(&self.adjuster_phone),
            adjuster_email: non_blank(&self.adjuster_email),
            insurer_claim_number: self.insurer_claim_number.trim().to_string(),
        };
        cleaned
            .validate()
            .map_err(|e| FilingError::Validation(first_message(&e)))?;
        Ok(cleaned)
    }

    pub fn is_empty(&self) -> bool {
        *self == AdjusterForm::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_invite_trims_and_validates() {
        let invite = ContractorInvite::new("  Acme Roofing ", " a@b.com").unwrap();
        assert_eq!(invite.name, "Acme Roofing");
        assert_eq!(invite.email, "a@b.com");
    }

    #[test]
    fn test_invite_rejects_blank_name() {
        let err = ContractorInvite::new("   ", "a@b.com").unwrap_err();
        assert_eq!(err.to_string(), "Contractor name is required");
    }

    #[test]
    fn test_invite_rejects_bad_email() {
        let err = ContractorInvite::new("Acme", "not-an-email").unwrap_err();
        assert_eq!(err.to_string(), "Enter a valid contractor email");
    }

    #[test]
    fn test_comparison_boundary() {
        let equal = EstimateComparison::compute(dec!(5000), dec!(5000)).unwrap();
        assert!(!equal.worth_filing);
        assert_eq!(equal.expected_payout(), dec!(0));

        let above = EstimateComparison::compute(dec!(15000), dec!(5000)).unwrap();
        assert!(above.worth_filing);
        assert_eq!(above.expected_payout(), dec!(10000));
    }

    #[test]
    fn test_comparison_rejects_negative_inputs() {
        assert!(EstimateComparison::compute(dec!(-1), dec!(0)).is_err());
        assert!(EstimateComparison::compute(dec!(1), dec!(-0.01)).is_err());
    }

    #[test]
    fn test_description_length_bounds() {
        assert!(DamageDescription::parse(&"x".repeat(19)).is_err());
        assert!(DamageDescription::parse(&"x".repeat(20)).is_ok());
        assert!(DamageDescription::parse(&"x".repeat(2000)).is_ok());
        assert!(DamageDescription::parse(&"x".repeat(2001)).is_err());
    }

    #[test]
    fn test_description_is_trimmed_before_counting() {
        let padded = format!("   {}   ", "x".repeat(19));
        assert!(DamageDescription::parse(&padded).is_err());

        let ok = DamageDescription::parse(&format!("  {}\n", "y".repeat(20))).unwrap();
        assert_eq!(ok.as_str().len(), 20);
    }

    #[test]
    fn test_description_counts_characters_not_bytes() {
        let accented = "é".repeat(20);
        assert!(DamageDescription::parse(&accented).is_ok());
    }

    #[test]
    fn test_adjuster_requires_claim_number() {
        let form = AdjusterForm {
            adjuster_name: Some("Pat Lee".to_string()),
            insurer_claim_number: "   ".to_string(),
            ..Default::default()
        };
        assert_eq!(form.validated().unwrap_err().to_string(), "Claim number is required");
    }

    #[test]
    fn test_adjuster_drops_blank_optionals() {
        let form = AdjusterForm {
            adjuster_name: Some("  ".to_string()),
            adjuster_email: Some(" pat@insurer.com ".to_string()),
            insurer_claim_number: " HO-2291 ".to_string(),
            ..Default::default()
        };
        let cleaned = form.validated().unwrap();
        assert_eq!(cleaned.adjuster_name, None);
        assert_eq!(cleaned.adjuster_email.as_deref(), Some("pat@insurer.com"));
        assert_eq!(cleaned.insurer_claim_number, "HO-2291");
    }

    proptest! {
        #[test]
        fn worth_filing_iff_estimate_exceeds_deductible(
            estimate in 0i64..10_000_000i64,
            deductible in 0i64..10_000_000i64,
        ) {
            let estimate = Decimal::new(estimate, 2);
            let deductible = Decimal::new(deductible, 2);
            let comparison = EstimateComparison::compute(estimate, deductible).unwrap();
            prop_assert_eq!(comparison.worth_filing, estimate > deductible);
        }
    }
}
