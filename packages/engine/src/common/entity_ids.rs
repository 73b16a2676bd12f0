//! Typed ID definitions for all domain entities.
//!
//! This module defines type aliases for each domain entity, providing
//! compile-time type safety for ID usage throughout the engine.

// Re-export the core Id type and version markers
pub use super::id::{Id, V4, V7};

// ============================================================================
// Entity marker types
// ============================================================================

/// Marker type for user accounts (managers, moderators, subscribers).
pub struct Account;

/// Marker type for Service entities (community-service listings).
pub struct Service;

/// Marker type for StatusUpdateRecord entries (append-only status log).
pub struct StatusUpdate;

/// Marker type for ModerationRecord entities (review queue entries).
pub struct ModerationReview;

/// Marker type for Subscription entities (bookmarks with preferences).
pub struct Bookmark;

/// Marker type for emitted domain events.
pub struct DomainEvent;

// ============================================================================
// Type aliases - the primary API
// ============================================================================

/// Typed ID for user accounts.
pub type UserId = Id<Account>;

/// Typed ID for Service entities.
pub type ServiceId = Id<Service>;

/// Typed ID for StatusUpdateRecord entries.
pub type UpdateId = Id<StatusUpdate>;

/// Typed ID for ModerationRecord entities.
pub type ModerationId = Id<ModerationReview>;

/// Typed ID for Subscription entities.
pub type SubscriptionId = Id<Bookmark>;

/// Typed ID for emitted domain events (dedup anchor for dispatch).
pub type EventId = Id<DomainEvent>;
