//! Append-only status log entries.
//!
//! One record per accepted StatusEngine transition. Records are never
//! mutated or deleted; per service, `recorded_at` is strictly increasing.

use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::common::{ServiceId, UpdateId, UserId};
use crate::domains::services::models::OperatingStatus;

/// What an accepted update changed.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ChangeKind {
    Capacity,
    OperatingStatus,
    Both,
}

impl std::fmt::Display for ChangeKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ChangeKind::Capacity => write!(f, "capacity"),
            ChangeKind::OperatingStatus => write!(f, "operating_status"),
            ChangeKind::Both => write!(f, "both"),
        }
    }
}

impl std::str::FromStr for ChangeKind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "capacity" => Ok(ChangeKind::Capacity),
            "operating_status" => Ok(ChangeKind::OperatingStatus),
            "both" => Ok(ChangeKind::Both),
            _ => Err(anyhow::anyhow!("Invalid change kind: {}", s)),
        }
    }
}

/// Immutable audit-trail entry for one accepted status transition.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusUpdateRecord {
    pub id: UpdateId,
    pub service_id: ServiceId,
    pub change: ChangeKind,
    pub old_capacity: u32,
    pub new_capacity: u32,
    pub old_status: OperatingStatus,
    pub new_status: OperatingStatus,
    pub actor_id: UserId,
    pub note: Option<String>,
    pub recorded_at: DateTime<Utc>,
}

impl StatusUpdateRecord {
    /// Direction of the capacity change, for display surfaces.
    pub fn capacity_direction(&self) -> std::cmp::Ordering {
        self.new_capacity.cmp(&self.old_capacity)
    }
}
