//! Scope areas
//!
//! One `ScopeArea` per category selected in triage. Areas are created when
//! the tour starts, edited in place by the tour step that owns them, and only
//! ever removed by re-running triage.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

use core_kernel::{PhotoId, ScopeAreaId};

use crate::catalog::{AreaCatalog, CategoryDefinition};
use crate::error::WizardError;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScopeArea {
    pub id: ScopeAreaId,
    pub category_key: String,
    #[serde(default)]
    pub tags: BTreeSet<String>,
    #[serde(default)]
    pub dimensions: BTreeMap<String, f64>,
    #[serde(default)]
    pub photo_ids: Vec<PhotoId>,
    #[serde(default)]
    pub notes: String,
}

impl ScopeArea {
    /// A fresh area with no tags, dimensions, photos or notes
    pub fn new(category_key: impl Into<String>) -> Self {
        Self {
            id: ScopeAreaId::new_v7(),
            category_key: category_key.into(),
            tags: BTreeSet::new(),
            dimensions: BTreeMap::new(),
            photo_ids: Vec::new(),
            notes: String::new(),
        }
    }

    /// True if nothing has been recorded on the area yet
    pub fn is_blank(&self) -> bool {
        self.tags.is_empty()
            && self.dimensions.is_empty()
            && self.photo_ids.is_empty()
            && self.notes.trim().is_empty()
    }

    pub fn category(&self) -> Result<&'static CategoryDefinition, WizardError> {
        AreaCatalog::get(&self.category_key)
            .ok_or_else(|| WizardError::UnknownCategory(self.category_key.clone()))
    }

    /// Turns a damage tag on or off; returns whether it is now set
    pub fn toggle_tag(&mut self, tag: &str) -> Result<bool, WizardError> {
        let category = self.category()?;
        if !category.allows_tag(tag) {
            return Err(WizardError::validation(format!(
                "'{}' is not a {} tag",
                tag, category.label
            )));
        }
        if self.tags.remove(tag) {
            Ok(false)
        } else {
            self.tags.insert(tag.to_string());
            Ok(true)
        }
    }

    /// Sets a measurement; it must be a catalog field, finite and non-negative
    pub fn set_dimension(&mut self, key: &str, value: f64) -> Result<(), WizardError> {
        let category = self.category()?;
        let field = category.dimension(key).ok_or_else(|| {
            WizardError::validation(format!("{} has no '{}' measurement", category.label, key))
        })?;
        if !value.is_finite() || value < 0.0 {
            return Err(WizardError::validation(format!(
                "{} must be a non-negative number",
                field.label
            )));
        }
        self.dimensions.insert(key.to_string(), value);
        Ok(())
    }

    pub fn clear_dimension(&mut self, key: &str) {
        self.dimensions.remove(key);
    }

    pub fn set_notes(&mut self, notes: impl Into<String>) {
        self.notes = notes.into();
    }

    pub fn add_photo(&mut self, photo_id: PhotoId) {
        if !self.photo_ids.contains(&photo_id) {
            self.photo_ids.push(photo_id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_area_is_blank() {
        let area = ScopeArea::new("roof");
        assert!(area.is_blank());
        assert_eq!(area.category_key, "roof");
    }

    #[test]
    fn test_toggle_tag_validates_against_catalog() {
        let mut area = ScopeArea::new("gutters");
        assert!(area.toggle_tag("dented").unwrap());
        assert!(!area.toggle_tag("dented").unwrap());
        assert!(area.toggle_tag("hail_impact").is_err());
        assert!(area.is_blank());
    }

    #[test]
    fn test_set_dimension_rejects_bad_values() {
        let mut area = ScopeArea::new("roof");
        area.set_dimension("squares", 24.5).unwrap();
        assert!(area.set_dimension("squares", -1.0).is_err());
        assert!(area.set_dimension("squares", f64::NAN).is_err());
        assert!(area.set_dimension("floor_area", 10.0).is_err());
        assert_eq!(area.dimensions.get("squares"), Some(&24.5));
    }

    #[test]
    fn test_photos_are_not_duplicated() {
        let mut area = ScopeArea::new("fencing");
        let photo = PhotoId::new_v7();
        area.add_photo(photo);
        area.add_photo(photo);
        assert_eq!(area.photo_ids, vec![photo]);
        assert!(!area.is_blank());
    }
}
