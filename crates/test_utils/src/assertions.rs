//! Custom Test Assertions
//!
//! Assertion helpers for the filing flow and the wizard that print the
//! whole picture on failure instead of a single mismatched field.

use domain_claims::{ClaimFilingPort, FilingStep, StepProgressionController, StepStatus};
use domain_scope::{AreaCatalog, ScopeArea, WizardState};

/// Asserts the completed steps and the current step of a controller
///
/// # Panics
///
/// Panics with the status of every step if either differs.
pub fn assert_progress<P>(controller: &StepProgressionController<P>, completed: &[u8], current: FilingStep)
where
    P: ClaimFilingPort + ?Sized,
{
    let progress = controller.progress();
    let statuses: Vec<(u8, StepStatus)> = FilingStep::ALL
        .iter()
        .map(|s| (s.number(), progress.status(*s)))
        .collect();

    assert_eq!(
        progress.completed_numbers(),
        completed,
        "Completed steps differ; statuses: {:?}",
        statuses
    );
    assert_eq!(
        progress.current_step(),
        current,
        "Current step differs; statuses: {:?}",
        statuses
    );
}

/// Asserts that no step shows an inline error
pub fn assert_no_inline_errors<P>(controller: &StepProgressionController<P>)
where
    P: ClaimFilingPort + ?Sized,
{
    let errors: Vec<(FilingStep, &str)> = FilingStep::ALL
        .iter()
        .filter_map(|s| controller.inline_error(*s).map(|e| (*s, e)))
        .collect();
    assert!(errors.is_empty(), "Unexpected inline errors: {:?}", errors);
}

/// Asserts that an area only carries tags and dimensions its category offers
pub fn assert_area_in_catalog(area: &ScopeArea) {
    let category = AreaCatalog::get(&area.category_key)
        .unwrap_or_else(|| panic!("Unknown area category '{}'", area.category_key));

    for tag in &area.tags {
        assert!(
            category.allows_tag(tag),
            "Tag '{}' is not offered for {}",
            tag,
            category.key
        );
    }
    for key in area.dimensions.keys() {
        assert!(
            category.dimension(key).is_some(),
            "Dimension '{}' is not offered for {}",
            key,
            category.key
        );
    }
}

/// Asserts that two wizard states hold the same areas in the same order
///
/// Area ids are compared too, so a rebuilt area is a mismatch.
pub fn assert_same_areas(actual: &WizardState, expected: &WizardState) {
    let keys = |state: &WizardState| -> Vec<String> {
        state.areas.iter().map(|a| a.category_key.clone()).collect()
    };
    assert_eq!(keys(actual), keys(expected), "Area order differs");
    assert_eq!(actual.areas, expected.areas, "Area contents differ");
}
