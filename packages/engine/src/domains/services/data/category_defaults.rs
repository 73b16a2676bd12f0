//! Per-category construction defaults.
//!
//! A single declarative table consulted by `build_service`. Explicit input
//! always wins; the table only fills the gaps.

use crate::domains::services::models::ServiceCategory;

/// Defaults applied when the caller leaves a field unset.
#[derive(Debug, Clone, Copy)]
pub struct CategoryDefaults {
    pub is_24_7: bool,
    pub is_emergency_service: bool,
    pub default_max_capacity: u32,
    pub base_tags: &'static [&'static str],
}

/// Defaults table, one row per category.
pub fn defaults_for(category: ServiceCategory) -> CategoryDefaults {
    match category {
        ServiceCategory::Healthcare => CategoryDefaults {
            is_24_7: false,
            is_emergency_service: false,
            default_max_capacity: 30,
            base_tags: &["medical", "healthcare"],
        },
        ServiceCategory::Shelter => CategoryDefaults {
            is_24_7: true,
            is_emergency_service: true,
            default_max_capacity: 50,
            base_tags: &["shelter", "housing"],
        },
        ServiceCategory::Food => CategoryDefaults {
            is_24_7: false,
            is_emergency_service: false,
            default_max_capacity: 100,
            base_tags: &["food", "meals"],
        },
        ServiceCategory::Education => CategoryDefaults {
            is_24_7: false,
            is_emergency_service: false,
            default_max_capacity: 40,
            base_tags: &["education", "learning"],
        },
        ServiceCategory::Emergency => CategoryDefaults {
            is_24_7: true,
            is_emergency_service: true,
            default_max_capacity: 25,
            base_tags: &["emergency"],
        },
        ServiceCategory::Social => CategoryDefaults {
            is_24_7: false,
            is_emergency_service: false,
            default_max_capacity: 40,
            base_tags: &["social services"],
        },
        ServiceCategory::Employment => CategoryDefaults {
            is_24_7: false,
            is_emergency_service: false,
            default_max_capacity: 20,
            base_tags: &["employment", "training"],
        },
        ServiceCategory::Legal => CategoryDefaults {
            is_24_7: false,
            is_emergency_service: false,
            default_max_capacity: 15,
            base_tags: &["legal aid"],
        },
        ServiceCategory::Transportation => CategoryDefaults {
            is_24_7: false,
            is_emergency_service: false,
            default_max_capacity: 30,
            base_tags: &["transportation"],
        },
        ServiceCategory::Utilities => CategoryDefaults {
            is_24_7: false,
            is_emergency_service: false,
            default_max_capacity: 25,
            base_tags: &["utilities", "basic needs"],
        },
        ServiceCategory::Recreation => CategoryDefaults {
            is_24_7: false,
            is_emergency_service: false,
            default_max_capacity: 60,
            base_tags: &["recreation", "community"],
        },
        ServiceCategory::Other => CategoryDefaults {
            is_24_7: false,
            is_emergency_service: false,
            default_max_capacity: 25,
            base_tags: &[],
        },
    }
}
