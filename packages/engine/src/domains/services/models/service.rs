//! Service model - a community-service listing.
//!
//! The record is owned by the store, never shared in memory: the status side
//! (capacity, operating status) and the moderation side (publication,
//! profile fields) mutate disjoint subsets through version-checked intents.

use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::common::{GeoPoint, ServiceId, UserId};
use crate::domains::services::models::{OperatingHours, ServiceCategory};

/// Publication lifecycle state.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum PublicationState {
    Draft,
    PendingReview,
    Public,
    Rejected,
}

impl std::fmt::Display for PublicationState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PublicationState::Draft => write!(f, "draft"),
            PublicationState::PendingReview => write!(f, "pending_review"),
            PublicationState::Public => write!(f, "public"),
            PublicationState::Rejected => write!(f, "rejected"),
        }
    }
}

impl std::str::FromStr for PublicationState {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "draft" => Ok(PublicationState::Draft),
            "pending_review" => Ok(PublicationState::PendingReview),
            "public" => Ok(PublicationState::Public),
            "rejected" => Ok(PublicationState::Rejected),
            _ => Err(anyhow::anyhow!("Invalid publication state: {}", s)),
        }
    }
}

/// Real-time operating status.
///
/// `Open`, `NearCapacity` and `Full` are derived from the capacity ratio;
/// `Closed` comes from operating hours; the rest are manager-declared.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum OperatingStatus {
    Open,
    NearCapacity,
    Full,
    Closed,
    TemporarilyClosed,
    EmergencyOnly,
}

impl std::fmt::Display for OperatingStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OperatingStatus::Open => write!(f, "open"),
            OperatingStatus::NearCapacity => write!(f, "near_capacity"),
            OperatingStatus::Full => write!(f, "full"),
            OperatingStatus::Closed => write!(f, "closed"),
            OperatingStatus::TemporarilyClosed => write!(f, "temporarily_closed"),
            OperatingStatus::EmergencyOnly => write!(f, "emergency_only"),
        }
    }
}

impl std::str::FromStr for OperatingStatus {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "open" => Ok(OperatingStatus::Open),
            "near_capacity" => Ok(OperatingStatus::NearCapacity),
            "full" => Ok(OperatingStatus::Full),
            "closed" => Ok(OperatingStatus::Closed),
            "temporarily_closed" => Ok(OperatingStatus::TemporarilyClosed),
            "emergency_only" => Ok(OperatingStatus::EmergencyOnly),
            _ => Err(anyhow::anyhow!("Invalid operating status: {}", s)),
        }
    }
}

/// A community-service listing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Service {
    pub id: ServiceId,

    // Profile
    pub name: String,
    pub slug: String,
    pub description: String,
    pub tags: Vec<String>,
    pub category: ServiceCategory,

    // Location
    pub position: GeoPoint,

    // Emergency eligibility
    pub is_emergency_service: bool,
    /// Radius for emergency alert fan-out, in kilometers.
    pub alert_radius_km: f64,

    // Operating information
    pub hours: OperatingHours,

    // Capacity. Over-capacity (current > max) is representable and meaningful.
    pub max_capacity: u32,
    pub current_capacity: u32,

    // Publication side (moderation-owned)
    pub publication: PublicationState,
    pub is_active: bool,
    pub is_verified: bool,
    pub verified_by: Option<UserId>,
    pub verified_at: Option<DateTime<Utc>>,
    pub last_significant_edit: Option<DateTime<Utc>>,

    // Status side (status-engine-owned)
    pub operating_status: OperatingStatus,
    /// Manager-declared status latch; cleared by the next capacity update.
    pub status_is_manual: bool,
    /// Set by the silence sweep, cleared by any accepted update.
    pub stale: bool,
    pub last_capacity_update: DateTime<Utc>,

    // Administrative
    pub manager_id: UserId,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,

    /// Conditional-write guard. Bumped by every applied mutation.
    pub version: i64,
}

impl Service {
    /// current_capacity / max_capacity. May exceed 1.0.
    pub fn capacity_ratio(&self) -> f64 {
        self.current_capacity as f64 / self.max_capacity as f64
    }

    /// Visible to public search iff published and active.
    pub fn is_publicly_visible(&self) -> bool {
        self.publication == PublicationState::Public && self.is_active
    }

    /// Open for business right now: schedule says open and the status is not
    /// a closure. Full still counts as open (people can queue or be routed).
    pub fn is_open_now(&self, now: DateTime<Utc>) -> bool {
        if matches!(
            self.operating_status,
            OperatingStatus::Closed | OperatingStatus::TemporarilyClosed
        ) {
            return false;
        }
        self.hours.is_open_at(now)
    }
}
