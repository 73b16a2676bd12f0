//! Record-store traits and mutation intents.
//!
//! The engine never mutates a shared in-memory Service. Writers describe
//! what they want as a `ServiceMutation` and the store applies it atomically
//! under a version check. StatusEngine and ModerationEngine own disjoint
//! field subsets, so their intents never overlap.

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::common::{GeoPoint, ModerationId, ServiceId, UserId};
use crate::domains::moderation::models::{Decision, ModerationRecord};
use crate::domains::notifications::models::Subscription;
use crate::domains::services::models::{
    OperatingStatus, PublicationState, Service, ServiceDiff, StatusUpdateRecord,
};

// =============================================================================
// Mutation intents
// =============================================================================

/// Status-side fields, written only by StatusEngine. Applying one also
/// clears the stale flag.
#[derive(Debug, Clone)]
pub struct StatusPatch {
    pub current_capacity: u32,
    pub operating_status: OperatingStatus,
    pub status_is_manual: bool,
    pub last_capacity_update: DateTime<Utc>,
}

/// Review resolution, written only by ModerationEngine.
#[derive(Debug, Clone)]
pub struct ResolutionPatch {
    pub decision: Decision,
    pub reviewer: UserId,
    pub resolved_at: DateTime<Utc>,
}

/// An accepted mutation applied atomically by the store.
#[derive(Debug, Clone)]
pub enum ServiceMutation {
    /// StatusEngine: capacity / operating-status fields.
    Status(StatusPatch),
    /// Silence sweep: mark the service stale.
    FlagStale,
    /// ModerationEngine: apply an edit diff and move to pending review.
    Review {
        diff: ServiceDiff,
        submitted_at: DateTime<Utc>,
    },
    /// ModerationEngine: approve or reject the pending listing.
    Resolve(ResolutionPatch),
    /// Admin suspension lever.
    Activation { is_active: bool },
    /// Cosmetic edit applied without review.
    Profile { diff: ServiceDiff },
}

/// Outcome of a conditional write.
#[derive(Debug, Clone)]
pub enum CasResult {
    Applied(Service),
    VersionMismatch { current_version: i64 },
}

/// Apply a mutation to a service snapshot, bumping the version.
///
/// Shared by every store implementation so the field semantics live in one
/// place; stores contribute only the atomicity.
pub(crate) fn apply_to(service: &mut Service, mutation: &ServiceMutation, now: DateTime<Utc>) {
    match mutation {
        ServiceMutation::Status(patch) => {
            service.current_capacity = patch.current_capacity;
            service.operating_status = patch.operating_status;
            service.status_is_manual = patch.status_is_manual;
            service.last_capacity_update = patch.last_capacity_update;
            service.stale = false;
        }
        ServiceMutation::FlagStale => {
            service.stale = true;
        }
        ServiceMutation::Review { diff, submitted_at } => {
            let significant = diff.is_significant();
            apply_diff(service, diff);
            service.publication = PublicationState::PendingReview;
            if significant {
                service.last_significant_edit = Some(*submitted_at);
            }
        }
        ServiceMutation::Resolve(patch) => match patch.decision {
            Decision::Approved => {
                service.publication = PublicationState::Public;
                service.is_verified = true;
                service.verified_by = Some(patch.reviewer);
                service.verified_at = Some(patch.resolved_at);
            }
            Decision::Rejected => {
                service.publication = PublicationState::Rejected;
            }
        },
        ServiceMutation::Activation { is_active } => {
            service.is_active = *is_active;
        }
        ServiceMutation::Profile { diff } => {
            apply_diff(service, diff);
        }
    }
    service.updated_at = now;
    service.version += 1;
}

fn apply_diff(service: &mut Service, diff: &ServiceDiff) {
    if let Some(name) = &diff.name {
        service.name = name.clone();
    }
    if let Some(description) = &diff.description {
        service.description = description.clone();
    }
    if let Some(tags) = &diff.tags {
        service.tags = tags.clone();
    }
    if let Some(hours) = &diff.hours {
        service.hours = hours.clone();
    }
    if let Some(max_capacity) = diff.max_capacity {
        service.max_capacity = max_capacity;
    }
    if let Some(position) = diff.position {
        service.position = position;
    }
    if let Some(category) = diff.category {
        service.category = category;
    }
    if let Some(is_emergency) = diff.is_emergency_service {
        service.is_emergency_service = is_emergency;
    }
}

// =============================================================================
// Store traits
// =============================================================================

/// Durable store for Service records with conditional writes.
#[async_trait]
pub trait ServiceStore: Send + Sync {
    async fn get(&self, id: ServiceId) -> Result<Option<Service>>;

    async fn insert(&self, service: Service) -> Result<()>;

    /// Apply a mutation iff the stored version matches `expected_version`.
    async fn apply(
        &self,
        id: ServiceId,
        mutation: ServiceMutation,
        expected_version: i64,
    ) -> Result<CasResult>;

    /// All services, ordered by id.
    async fn list_all(&self) -> Result<Vec<Service>>;

    /// Services visible to public search (public + active), ordered by id.
    async fn list_visible(&self) -> Result<Vec<Service>>;

    /// Service ids within `radius_km` of `center` with their distances,
    /// ordered by distance then id.
    async fn find_within_radius(
        &self,
        center: GeoPoint,
        radius_km: f64,
    ) -> Result<Vec<(ServiceId, f64)>>;
}

/// Append-only status log. Per service, `recorded_at` must be strictly
/// increasing; implementations reject out-of-order appends.
#[async_trait]
pub trait StatusLogStore: Send + Sync {
    async fn append(&self, record: StatusUpdateRecord) -> Result<()>;

    async fn list_for_service(&self, service_id: ServiceId) -> Result<Vec<StatusUpdateRecord>>;
}

/// Store for moderation records.
#[async_trait]
pub trait ModerationStore: Send + Sync {
    async fn insert(&self, record: ModerationRecord) -> Result<()>;

    async fn get(&self, id: ModerationId) -> Result<Option<ModerationRecord>>;

    /// The open record for a service, if any. At most one exists.
    async fn find_open_for_service(&self, service_id: ServiceId)
        -> Result<Option<ModerationRecord>>;

    async fn mark_resolved(
        &self,
        id: ModerationId,
        reviewer: UserId,
        decision: Decision,
        reason: Option<String>,
        resolved_at: DateTime<Utc>,
    ) -> Result<ModerationRecord>;

    async fn list_open(&self) -> Result<Vec<ModerationRecord>>;
}

/// Store for bookmark subscriptions.
#[async_trait]
pub trait SubscriptionStore: Send + Sync {
    /// Create or refresh the (subscriber, service) subscription.
    async fn upsert(&self, subscription: Subscription) -> Result<Subscription>;

    async fn remove(&self, subscriber_id: UserId, service_id: ServiceId) -> Result<bool>;

    /// Drop everything for a deleted subscriber.
    async fn remove_all_for_subscriber(&self, subscriber_id: UserId) -> Result<u64>;

    async fn find(
        &self,
        subscriber_id: UserId,
        service_id: ServiceId,
    ) -> Result<Option<Subscription>>;

    async fn list_for_service(&self, service_id: ServiceId) -> Result<Vec<Subscription>>;

    /// Subscribers who opted into emergency alerts, across all services.
    async fn list_emergency_opt_ins(&self) -> Result<Vec<Subscription>>;
}
