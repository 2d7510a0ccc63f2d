//! Property-Based Test Generators
//!
//! Proptest strategies that produce claims and wizard states which keep
//! the domain's invariants: linear step progress, catalog-valid areas, and
//! wizard phases that point at an existing area.

use proptest::prelude::*;
use rust_decimal::Decimal;

use domain_claims::Claim;
use domain_scope::{AreaCatalog, ScopeArea, WizardPhase, WizardState};

use crate::builders::{ClaimBuilder, ScopeAreaBuilder};

/// Positive dollar amounts with cents, up to one million
pub fn amount_strategy() -> impl Strategy<Value = Decimal> {
    (1i64..100_000_000i64).prop_map(|cents| Decimal::new(cents, 2))
}

/// A claim on step 1..=7 with every earlier step completed
pub fn linear_claim_strategy() -> impl Strategy<Value = Claim> {
    (1u8..=7).prop_map(|step| ClaimBuilder::new().on_step(step).build())
}

pub fn category_key_strategy() -> impl Strategy<Value = &'static str> {
    let keys: Vec<&'static str> = AreaCatalog::categories().iter().map(|c| c.key).collect();
    proptest::sample::select(keys)
}

/// An area whose tags and dimension keys all come from its category
pub fn scope_area_strategy() -> impl Strategy<Value = ScopeArea> {
    category_key_strategy().prop_flat_map(|key| {
        let category = AreaCatalog::get(key).expect("sampled from the catalog");
        let tags: Vec<&'static str> = category.tags.to_vec();
        let dims: Vec<&'static str> = category.dimensions.iter().map(|d| d.key).collect();
        let tag_count = tags.len();
        let dim_count = dims.len();
        (
            proptest::sample::subsequence(tags, 0..=tag_count),
            proptest::collection::vec(proptest::option::of(1.0f64..500.0), dim_count..=dim_count),
            "[a-zA-Z ]{0,40}",
        )
            .prop_map(move |(tags, values, notes)| {
                let mut builder = ScopeAreaBuilder::new(key).with_notes(notes);
                for tag in tags {
                    builder = builder.with_tag(tag);
                }
                for (dim, value) in dims.iter().zip(values) {
                    if let Some(value) = value {
                        builder = builder.with_dimension(*dim, value);
                    }
                }
                builder.build()
            })
    })
}

/// Wizard state with up to four distinct areas and a phase that fits them
pub fn wizard_state_strategy() -> impl Strategy<Value = WizardState> {
    proptest::collection::vec(scope_area_strategy(), 0..=4)
        .prop_map(|areas| {
            let mut seen = std::collections::HashSet::new();
            areas
                .into_iter()
                .filter(|a| seen.insert(a.category_key.clone()))
                .collect::<Vec<_>>()
        })
        .prop_flat_map(|areas| {
            let count = areas.len();
            let phase = if count == 0 {
                prop_oneof![Just(WizardPhase::Welcome), Just(WizardPhase::Triage)].boxed()
            } else {
                prop_oneof![
                    Just(WizardPhase::Triage),
                    (0..count).prop_map(WizardPhase::Tour),
                    Just(WizardPhase::Review),
                ]
                .boxed()
            };
            (Just(areas), phase)
        })
        .prop_map(|(areas, phase)| WizardState {
            phase,
            triage_selections: areas.iter().map(|a| a.category_key.clone()).collect(),
            areas,
            general_notes: String::new(),
        })
}
