//! Bookmark subscriptions with delivery preferences.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::common::{GeoPoint, ServiceId, SubscriptionId, UserId};

/// A (subscriber, service) bookmark. Created by bookmarking, destroyed on
/// unbookmark or subscriber deletion.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Subscription {
    pub id: SubscriptionId,
    pub subscriber_id: UserId,
    pub service_id: ServiceId,
    /// Opt-in to emergency alert fan-out.
    pub emergency_alerts: bool,
    /// Subscriber location used to scope emergency alerts to the service's
    /// declared radius.
    pub location: Option<GeoPoint>,
    pub created_at: DateTime<Utc>,
}

impl Subscription {
    pub fn new(subscriber_id: UserId, service_id: ServiceId, created_at: DateTime<Utc>) -> Self {
        Self {
            id: SubscriptionId::new(),
            subscriber_id,
            service_id,
            emergency_alerts: false,
            location: None,
            created_at,
        }
    }

    pub fn with_emergency_alerts(mut self, location: Option<GeoPoint>) -> Self {
        self.emergency_alerts = true;
        self.location = location;
        self
    }
}
