//! Moderation domain events - FACT EVENTS ONLY

use chrono::{DateTime, Utc};

use crate::common::{EventId, ModerationId, ServiceId, UserId};
use crate::domains::moderation::models::Decision;

/// Moderation domain events.
#[derive(Debug, Clone)]
pub enum ModerationEvent {
    /// A listing entered the review queue.
    SubmittedForReview {
        event_id: EventId,
        record_id: ModerationId,
        service_id: ServiceId,
        submitted_by: UserId,
        /// Whether a significant edit forced the re-verification.
        significant: bool,
        submitted_at: DateTime<Utc>,
    },

    /// A reviewer approved or rejected an open record.
    ModerationResolved {
        event_id: EventId,
        record_id: ModerationId,
        service_id: ServiceId,
        /// The manager who submitted the service for review.
        manager_id: UserId,
        decision: Decision,
        reason: Option<String>,
        resolved_at: DateTime<Utc>,
    },

    /// An admin suspended or reinstated a listing.
    ActivationChanged {
        event_id: EventId,
        service_id: ServiceId,
        is_active: bool,
        changed_at: DateTime<Utc>,
    },
}

impl ModerationEvent {
    pub fn event_id(&self) -> EventId {
        match self {
            ModerationEvent::SubmittedForReview { event_id, .. } => *event_id,
            ModerationEvent::ModerationResolved { event_id, .. } => *event_id,
            ModerationEvent::ActivationChanged { event_id, .. } => *event_id,
        }
    }

    pub fn service_id(&self) -> ServiceId {
        match self {
            ModerationEvent::SubmittedForReview { service_id, .. } => *service_id,
            ModerationEvent::ModerationResolved { service_id, .. } => *service_id,
            ModerationEvent::ActivationChanged { service_id, .. } => *service_id,
        }
    }
}
