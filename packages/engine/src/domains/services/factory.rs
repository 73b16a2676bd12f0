//! Single constructor for new service listings.
//!
//! Validates input, consults the per-category defaults table, and produces a
//! draft record ready for the store. Explicit input always overrides the
//! defaults.

use chrono::{DateTime, Utc};

use crate::common::{EngineError, EngineResult, GeoPoint, ServiceId, UserId};
use crate::domains::services::data::defaults_for;
use crate::domains::services::models::{
    OperatingHours, OperatingStatus, PublicationState, Service, ServiceCategory,
};

/// Input for creating a listing. Optional fields fall back to the category
/// defaults table.
#[derive(Debug, Clone)]
pub struct NewService {
    pub name: String,
    pub description: String,
    pub category: ServiceCategory,
    pub position: GeoPoint,
    pub manager_id: UserId,
    pub max_capacity: Option<u32>,
    pub tags: Vec<String>,
    pub hours: Option<OperatingHours>,
    pub is_emergency_service: Option<bool>,
    pub alert_radius_km: Option<f64>,
}

/// Build a draft service from caller input plus category defaults.
pub fn build_service(
    input: NewService,
    default_alert_radius_km: f64,
    now: DateTime<Utc>,
) -> EngineResult<Service> {
    let name = input.name.trim();
    if name.is_empty() {
        return Err(EngineError::Validation("service name is required".into()));
    }
    if input.description.trim().is_empty() {
        return Err(EngineError::Validation(
            "service description is required".into(),
        ));
    }
    if input.max_capacity == Some(0) {
        return Err(EngineError::Validation(
            "max_capacity must be positive".into(),
        ));
    }
    if let Some(radius) = input.alert_radius_km {
        if !radius.is_finite() || radius <= 0.0 {
            return Err(EngineError::Validation(
                "alert_radius_km must be positive".into(),
            ));
        }
    }

    let defaults = defaults_for(input.category);

    let mut tags: Vec<String> = defaults
        .base_tags
        .iter()
        .map(|t| t.to_string())
        .chain(input.tags.into_iter())
        .collect();
    tags.sort();
    tags.dedup();

    let hours = input.hours.unwrap_or(if defaults.is_24_7 {
        OperatingHours::always_open()
    } else {
        OperatingHours::default()
    });

    Ok(Service {
        id: ServiceId::new(),
        slug: slugify(name),
        name: name.to_string(),
        description: input.description.trim().to_string(),
        tags,
        category: input.category,
        position: input.position,
        is_emergency_service: input
            .is_emergency_service
            .unwrap_or(defaults.is_emergency_service),
        alert_radius_km: input.alert_radius_km.unwrap_or(default_alert_radius_km),
        hours,
        max_capacity: input.max_capacity.unwrap_or(defaults.default_max_capacity),
        current_capacity: 0,
        publication: PublicationState::Draft,
        is_active: true,
        is_verified: false,
        verified_by: None,
        verified_at: None,
        last_significant_edit: None,
        operating_status: OperatingStatus::Open,
        status_is_manual: false,
        stale: false,
        last_capacity_update: now,
        manager_id: input.manager_id,
        created_at: now,
        updated_at: now,
        version: 0,
    })
}

/// URL-friendly identifier derived from the name.
fn slugify(name: &str) -> String {
    let mut slug = String::with_capacity(name.len());
    let mut last_dash = true;
    for ch in name.chars() {
        if ch.is_ascii_alphanumeric() {
            slug.push(ch.to_ascii_lowercase());
            last_dash = false;
        } else if !last_dash {
            slug.push('-');
            last_dash = true;
        }
    }
    slug.trim_end_matches('-').to_string()
}
