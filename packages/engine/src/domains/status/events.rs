//! Status domain events - FACT EVENTS ONLY
//!
//! Events are immutable facts about what happened, returned as values from
//! engine operations. The dispatch loop fans them out to observers.

use chrono::{DateTime, Utc};

use crate::common::{EventId, ServiceId, UserId};
use crate::domains::services::models::OperatingStatus;

/// Status domain events.
#[derive(Debug, Clone)]
pub enum StatusEvent {
    /// An accepted status update changed the service's denormalized
    /// capacity/status fields.
    StatusChanged {
        event_id: EventId,
        service_id: ServiceId,
        manager_id: UserId,
        old_capacity: u32,
        new_capacity: u32,
        max_capacity: u32,
        old_status: OperatingStatus,
        new_status: OperatingStatus,
        /// The capacity ratio crossed a threshold band.
        band_crossed: bool,
        /// Closure of an emergency-eligible service, or a move into an
        /// emergency status.
        is_emergency_related: bool,
        recorded_at: DateTime<Utc>,
    },

    /// The silence sweep flagged a service whose last update exceeded the
    /// configured window.
    ServiceFlaggedStale {
        event_id: EventId,
        service_id: ServiceId,
        manager_id: UserId,
        last_capacity_update: DateTime<Utc>,
        flagged_at: DateTime<Utc>,
    },
}

impl StatusEvent {
    pub fn event_id(&self) -> EventId {
        match self {
            StatusEvent::StatusChanged { event_id, .. } => *event_id,
            StatusEvent::ServiceFlaggedStale { event_id, .. } => *event_id,
        }
    }

    pub fn service_id(&self) -> ServiceId {
        match self {
            StatusEvent::StatusChanged { service_id, .. } => *service_id,
            StatusEvent::ServiceFlaggedStale { service_id, .. } => *service_id,
        }
    }
}
