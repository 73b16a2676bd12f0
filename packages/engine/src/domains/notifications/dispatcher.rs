//! NotificationDispatcher - fans events out to interested subscribers.
//!
//! Runs on the dispatch-loop task, so the emitting transition never waits on
//! it. Delivery is at-least-once; each item carries a deterministic dedup
//! key (`service:event:subscriber`) and the dispatcher itself skips events
//! it has already processed.

use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use anyhow::Result;
use serde_json::json;
use tracing::{debug, error};

use crate::common::{EventId, ServiceId, UserId};
use crate::domains::moderation::events::ModerationEvent;
use crate::domains::status::events::StatusEvent;
use crate::kernel::delivery::BaseDeliveryChannel;
use crate::kernel::deps::EngineDeps;
use crate::kernel::event_bus::EngineEvent;
use crate::kernel::store::{ServiceStore, SubscriptionStore};

/// Resolves subscribers per event type and enqueues into the delivery
/// channel.
pub struct NotificationDispatcher {
    deps: Arc<EngineDeps>,
    processed: Mutex<HashSet<EventId>>,
}

impl NotificationDispatcher {
    pub fn new(deps: Arc<EngineDeps>) -> Self {
        Self {
            deps,
            processed: Mutex::new(HashSet::new()),
        }
    }

    /// Handle one event. Failures are logged, never propagated back to the
    /// emitting transition.
    pub async fn notify(&self, event: &EngineEvent) {
        if !self.first_sighting(event.event_id()) {
            debug!(event_id = %event.event_id(), "Skipping already-dispatched event");
            return;
        }

        let outcome = match event {
            EngineEvent::Status(status_event) => self.route_status(status_event).await,
            EngineEvent::Moderation(moderation_event) => {
                self.route_moderation(moderation_event).await
            }
        };

        match outcome {
            Ok(enqueued) => {
                debug!(event_id = %event.event_id(), enqueued = enqueued, "Event dispatched")
            }
            Err(e) => {
                error!(event_id = %event.event_id(), error = %e, "Notification dispatch failed")
            }
        }
    }

    fn first_sighting(&self, event_id: EventId) -> bool {
        self.processed.lock().unwrap().insert(event_id)
    }

    async fn route_status(&self, event: &StatusEvent) -> Result<usize> {
        match event {
            StatusEvent::StatusChanged {
                event_id,
                service_id,
                old_capacity,
                new_capacity,
                max_capacity,
                old_status,
                new_status,
                band_crossed,
                is_emergency_related,
                ..
            } => {
                let mut enqueued = 0;
                let mut already_sent: HashSet<UserId> = HashSet::new();

                // Threshold crossings go to everyone who bookmarked the
                // service.
                if *band_crossed {
                    let payload = json!({
                        "type": "capacity_alert",
                        "service_id": service_id,
                        "old_capacity": old_capacity,
                        "new_capacity": new_capacity,
                        "max_capacity": max_capacity,
                        "old_status": old_status,
                        "new_status": new_status,
                    });

                    for subscription in
                        self.deps.subscriptions.list_for_service(*service_id).await?
                    {
                        if already_sent.insert(subscription.subscriber_id) {
                            self.enqueue(
                                *service_id,
                                *event_id,
                                subscription.subscriber_id,
                                payload.clone(),
                            )
                            .await;
                            enqueued += 1;
                        }
                    }
                }

                // Emergency-related changes also reach opted-in subscribers
                // inside the service's declared radius.
                if *is_emergency_related {
                    if let Some(service) = self.deps.services.get(*service_id).await? {
                        let payload = json!({
                            "type": "emergency_alert",
                            "service_id": service_id,
                            "service_name": service.name,
                            "new_status": new_status,
                        });

                        for subscription in self.deps.subscriptions.list_emergency_opt_ins().await?
                        {
                            let in_radius = subscription
                                .location
                                .map(|location| {
                                    location.distance_km(&service.position)
                                        <= service.alert_radius_km
                                })
                                .unwrap_or(false);
                            if in_radius && already_sent.insert(subscription.subscriber_id) {
                                self.enqueue(
                                    *service_id,
                                    *event_id,
                                    subscription.subscriber_id,
                                    payload.clone(),
                                )
                                .await;
                                enqueued += 1;
                            }
                        }
                    }
                }

                Ok(enqueued)
            }
            StatusEvent::ServiceFlaggedStale {
                event_id,
                service_id,
                manager_id,
                last_capacity_update,
                ..
            } => {
                let payload = json!({
                    "type": "status_update_reminder",
                    "service_id": service_id,
                    "last_capacity_update": last_capacity_update,
                });
                self.enqueue(*service_id, *event_id, *manager_id, payload)
                    .await;
                Ok(1)
            }
        }
    }

    async fn route_moderation(&self, event: &ModerationEvent) -> Result<usize> {
        match event {
            // Reviewer rosters live outside the engine; nothing to enqueue.
            ModerationEvent::SubmittedForReview { service_id, .. } => {
                debug!(service_id = %service_id, "Service queued for review");
                Ok(0)
            }
            ModerationEvent::ModerationResolved {
                event_id,
                service_id,
                manager_id,
                decision,
                reason,
                ..
            } => {
                let payload = json!({
                    "type": "moderation_resolved",
                    "service_id": service_id,
                    "decision": decision,
                    "reason": reason,
                });
                self.enqueue(*service_id, *event_id, *manager_id, payload)
                    .await;
                Ok(1)
            }
            ModerationEvent::ActivationChanged {
                event_id,
                service_id,
                is_active,
                ..
            } => {
                let payload = json!({
                    "type": "service_availability_changed",
                    "service_id": service_id,
                    "is_active": is_active,
                });
                let mut enqueued = 0;
                for subscription in self.deps.subscriptions.list_for_service(*service_id).await? {
                    self.enqueue(
                        *service_id,
                        *event_id,
                        subscription.subscriber_id,
                        payload.clone(),
                    )
                    .await;
                    enqueued += 1;
                }
                Ok(enqueued)
            }
        }
    }

    /// Enqueue one item. An enqueue failure is logged and dropped; the
    /// delivery channel owns transport retries, not this component.
    async fn enqueue(
        &self,
        service_id: ServiceId,
        event_id: EventId,
        subscriber_id: UserId,
        payload: serde_json::Value,
    ) {
        let dedup_key = format!("{service_id}:{event_id}:{subscriber_id}");
        if let Err(e) = self
            .deps
            .delivery
            .enqueue(subscriber_id, payload, &dedup_key)
            .await
        {
            error!(
                subscriber_id = %subscriber_id,
                dedup_key = dedup_key,
                error = %e,
                "Failed to enqueue notification"
            );
        }
    }
}
