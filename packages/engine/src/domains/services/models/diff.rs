//! Proposed edits to a service profile.
//!
//! A diff either applies directly (cosmetic fields) or forces
//! re-verification: changes to location, category, or emergency eligibility
//! are significant and route the listing back through review.

use serde::{Deserialize, Serialize};

use crate::common::GeoPoint;
use crate::domains::services::models::{OperatingHours, ServiceCategory};

/// Partial update to a service profile. `None` fields are untouched.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ServiceDiff {
    pub name: Option<String>,
    pub description: Option<String>,
    pub tags: Option<Vec<String>>,
    pub hours: Option<OperatingHours>,
    pub max_capacity: Option<u32>,
    pub position: Option<GeoPoint>,
    pub category: Option<ServiceCategory>,
    pub is_emergency_service: Option<bool>,
}

impl ServiceDiff {
    /// Significant edits force re-verification: location, category/type, or
    /// emergency-eligibility changes.
    pub fn is_significant(&self) -> bool {
        self.position.is_some() || self.category.is_some() || self.is_emergency_service.is_some()
    }

    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.description.is_none()
            && self.tags.is_none()
            && self.hours.is_none()
            && self.max_capacity.is_none()
            && self.position.is_none()
            && self.category.is_none()
            && self.is_emergency_service.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cosmetic_diff_is_not_significant() {
        let diff = ServiceDiff {
            name: Some("New Name".into()),
            description: Some("Updated description".into()),
            ..Default::default()
        };
        assert!(!diff.is_significant());
        assert!(!diff.is_empty());
    }

    #[test]
    fn test_location_category_eligibility_are_significant() {
        let position = ServiceDiff {
            position: Some(GeoPoint::new(44.98, -93.27).unwrap()),
            ..Default::default()
        };
        let category = ServiceDiff {
            category: Some(ServiceCategory::Shelter),
            ..Default::default()
        };
        let eligibility = ServiceDiff {
            is_emergency_service: Some(true),
            ..Default::default()
        };
        assert!(position.is_significant());
        assert!(category.is_significant());
        assert!(eligibility.is_significant());
    }

    #[test]
    fn test_empty_diff() {
        assert!(ServiceDiff::default().is_empty());
    }
}
