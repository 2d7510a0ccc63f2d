//! Area catalog
//!
//! The fixed set of area categories a contractor can select in triage. Each
//! category lists the damage tags and the dimension fields its tour step
//! offers; area edits are checked against it.

/// A measurable field on an area
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DimensionField {
    pub key: &'static str,
    pub label: &'static str,
    pub unit: &'static str,
}

/// One selectable area category
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CategoryDefinition {
    pub key: &'static str,
    pub label: &'static str,
    pub tags: &'static [&'static str],
    pub dimensions: &'static [DimensionField],
}

impl CategoryDefinition {
    pub fn allows_tag(&self, tag: &str) -> bool {
        self.tags.contains(&tag)
    }

    pub fn dimension(&self, key: &str) -> Option<&'static DimensionField> {
        self.dimensions.iter().find(|d| d.key == key)
    }
}

const fn dim(key: &'static str, label: &'static str, unit: &'static str) -> DimensionField {
    DimensionField { key, label, unit }
}

static CATEGORIES: [CategoryDefinition; 8] = [
    CategoryDefinition {
        key: "roof",
        label: "Roof",
        tags: &["missing_shingles", "hail_impact", "wind_lift", "flashing", "leak", "granule_loss"],
        dimensions: &[
            dim("squares", "Roof area", "sq"),
            dim("pitch", "Pitch", "x/12"),
            dim("ridge_length", "Ridge length", "ft"),
        ],
    },
    CategoryDefinition {
        key: "exterior_walls",
        label: "Exterior walls",
        tags: &["siding_cracked", "siding_missing", "dented", "stucco_damage", "paint"],
        dimensions: &[dim("wall_area", "Wall area", "sq ft"), dim("height", "Height", "ft")],
    },
    CategoryDefinition {
        key: "windows_doors",
        label: "Windows & doors",
        tags: &["broken_glass", "screen_damage", "frame_damage", "seal_failure"],
        dimensions: &[dim("window_count", "Windows", "count"), dim("door_count", "Doors", "count")],
    },
    CategoryDefinition {
        key: "gutters",
        label: "Gutters",
        tags: &["dented", "detached", "downspout_damage", "clogged"],
        dimensions: &[dim("linear_feet", "Length", "ft"), dim("downspouts", "Downspouts", "count")],
    },
    CategoryDefinition {
        key: "interior_ceilings",
        label: "Interior ceilings",
        tags: &["water_stain", "sagging", "drywall_damage", "mold"],
        dimensions: &[dim("ceiling_area", "Ceiling area", "sq ft")],
    },
    CategoryDefinition {
        key: "interior_walls",
        label: "Interior walls",
        tags: &["water_stain", "drywall_damage", "mold", "paint"],
        dimensions: &[dim("wall_area", "Wall area", "sq ft")],
    },
    CategoryDefinition {
        key: "flooring",
        label: "Flooring",
        tags: &["water_damage", "warping", "stains", "subfloor_damage"],
        dimensions: &[dim("floor_area", "Floor area", "sq ft")],
    },
    CategoryDefinition {
        key: "fencing",
        label: "Fencing",
        tags: &["leaning", "broken_pickets", "post_damage", "gate_damage"],
        dimensions: &[dim("linear_feet", "Length", "ft"), dim("height", "Height", "ft")],
    },
];

/// Lookup over the fixed category list
#[derive(Debug, Clone, Copy, Default)]
pub struct AreaCatalog;

impl AreaCatalog {
    /// Every category, in display order
    pub fn categories() -> &'static [CategoryDefinition] {
        &CATEGORIES
    }

    pub fn get(key: &str) -> Option<&'static CategoryDefinition> {
        CATEGORIES.iter().find(|c| c.key == key)
    }

    pub fn contains(key: &str) -> bool {
        Self::get(key).is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_catalog_has_unique_keys() {
        let keys: HashSet<_> = AreaCatalog::categories().iter().map(|c| c.key).collect();
        assert_eq!(keys.len(), 8);
        assert!(AreaCatalog::contains("roof"));
        assert!(AreaCatalog::contains("exterior_walls"));
        assert!(!AreaCatalog::contains("pool"));
    }

    #[test]
    fn test_category_lookups() {
        let roof = AreaCatalog::get("roof").unwrap();
        assert!(roof.allows_tag("hail_impact"));
        assert!(!roof.allows_tag("mold"));
        assert_eq!(roof.dimension("squares").map(|d| d.unit), Some("sq"));
        assert!(roof.dimension("floor_area").is_none());
    }
}
