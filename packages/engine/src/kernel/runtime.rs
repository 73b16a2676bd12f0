//! Engine facade: wires the components together and runs the dispatch loop.
//!
//! Components return their emitted events as values; the facade forwards
//! them onto the bus, and a single background task delivers them to the
//! notification dispatcher and invalidates the search snapshot. Everything
//! is constructed explicitly from `EngineDeps` + `EngineConfig`.

use std::sync::Arc;

use chrono::Utc;
use tokio::sync::mpsc;
use tracing::info;

use crate::common::{Actor, EngineError, EngineResult, GeoPoint, ModerationId, ServiceId};
use crate::config::EngineConfig;
use crate::domains::moderation::engine::{EditOutcome, ModerationEngine};
use crate::domains::moderation::models::{Decision, ModerationRecord};
use crate::domains::notifications::dispatcher::NotificationDispatcher;
use crate::domains::notifications::models::Subscription;
use crate::domains::search::engine::SearchEngine;
use crate::domains::search::query::SearchQuery;
use crate::domains::services::factory::{build_service, NewService};
use crate::domains::services::models::{Service, ServiceDiff, StatusUpdateRecord};
use crate::domains::status::engine::{StatusAccepted, StatusEngine, SubmitStatusUpdate};
use crate::domains::status::sweep::flag_stale_services;
use crate::kernel::deps::EngineDeps;
use crate::kernel::event_bus::{BusMessage, EngineEvent, EventBus};
use crate::kernel::store::{ServiceStore, SubscriptionStore};

/// The assembled engine. One per process; cheap to share behind an Arc.
pub struct Engine {
    deps: Arc<EngineDeps>,
    config: EngineConfig,
    status: StatusEngine,
    moderation: ModerationEngine,
    search: Arc<SearchEngine>,
    bus: EventBus,
}

impl Engine {
    /// Construct the components and spawn the dispatch loop.
    pub fn start(deps: Arc<EngineDeps>, config: EngineConfig) -> Self {
        let (bus, rx) = EventBus::channel();

        let search = Arc::new(SearchEngine::new(deps.clone(), config.clone()));
        let dispatcher = Arc::new(NotificationDispatcher::new(deps.clone()));
        tokio::spawn(run_dispatch_loop(rx, dispatcher, search.clone()));

        Self {
            status: StatusEngine::new(deps.clone(), config.clone()),
            moderation: ModerationEngine::new(deps.clone(), config.clone()),
            search,
            bus,
            deps,
            config,
        }
    }

    pub fn bus(&self) -> &EventBus {
        &self.bus
    }

    /// Wait until every event emitted so far has been dispatched.
    pub async fn settle(&self) {
        self.bus.settle().await;
    }

    // =========================================================================
    // Listings
    // =========================================================================

    /// Create a draft listing through the category-defaults constructor.
    pub async fn create_service(&self, actor: Actor, input: NewService) -> EngineResult<Service> {
        if !actor.can_manage() {
            return Err(EngineError::Authorization(
                "manager access required to create a service".into(),
            ));
        }
        if input.manager_id != actor.id && !actor.is_admin() {
            return Err(EngineError::Authorization(
                "a manager may only create services they manage".into(),
            ));
        }

        let service = build_service(input, self.config.default_alert_radius_km, Utc::now())?;
        self.deps.services.insert(service.clone()).await?;

        info!(service_id = %service.id, name = %service.name, "Service created");
        Ok(service)
    }

    // =========================================================================
    // Status
    // =========================================================================

    pub async fn submit_status_update(
        &self,
        actor: Actor,
        req: SubmitStatusUpdate,
    ) -> EngineResult<StatusAccepted> {
        let accepted = self.status.submit_update(actor, req).await?;
        self.bus
            .emit_all(accepted.events.iter().cloned().map(EngineEvent::Status));
        Ok(accepted)
    }

    pub async fn status_history(
        &self,
        service_id: ServiceId,
    ) -> EngineResult<Vec<StatusUpdateRecord>> {
        self.status.history(service_id).await
    }

    /// Run the silence sweep once, emitting any stale flags.
    pub async fn run_stale_sweep(&self) -> EngineResult<usize> {
        let events = flag_stale_services(&self.deps, &self.config, Utc::now()).await?;
        let flagged = events.len();
        self.bus.emit_all(events.into_iter().map(EngineEvent::Status));
        Ok(flagged)
    }

    // =========================================================================
    // Moderation
    // =========================================================================

    pub async fn submit_for_review(
        &self,
        actor: Actor,
        service_id: ServiceId,
        diff: ServiceDiff,
    ) -> EngineResult<ModerationRecord> {
        let (record, events) = self
            .moderation
            .submit_for_review(actor, service_id, diff)
            .await?;
        self.bus
            .emit_all(events.into_iter().map(EngineEvent::Moderation));
        Ok(record)
    }

    pub async fn apply_edit(
        &self,
        actor: Actor,
        service_id: ServiceId,
        diff: ServiceDiff,
    ) -> EngineResult<EditOutcome> {
        let (outcome, events) = self.moderation.apply_edit(actor, service_id, diff).await?;
        self.bus
            .emit_all(events.into_iter().map(EngineEvent::Moderation));
        Ok(outcome)
    }

    pub async fn resolve_moderation(
        &self,
        reviewer: Actor,
        record_id: ModerationId,
        decision: Decision,
        reason: Option<String>,
    ) -> EngineResult<Service> {
        let (service, events) = self
            .moderation
            .resolve(reviewer, record_id, decision, reason)
            .await?;
        self.bus
            .emit_all(events.into_iter().map(EngineEvent::Moderation));
        Ok(service)
    }

    pub async fn set_service_active(
        &self,
        actor: Actor,
        service_id: ServiceId,
        is_active: bool,
    ) -> EngineResult<Service> {
        let (service, events) = self
            .moderation
            .set_active(actor, service_id, is_active)
            .await?;
        self.bus
            .emit_all(events.into_iter().map(EngineEvent::Moderation));
        Ok(service)
    }

    pub async fn overdue_moderation(&self) -> EngineResult<Vec<ModerationRecord>> {
        self.moderation.list_overdue(Utc::now()).await
    }

    // =========================================================================
    // Search
    // =========================================================================

    pub async fn search(&self, query: &SearchQuery) -> EngineResult<Vec<Service>> {
        self.search.search(query).await
    }

    // =========================================================================
    // Subscriptions
    // =========================================================================

    /// Bookmark a service, optionally opting into radius-scoped emergency
    /// alerts.
    pub async fn bookmark(
        &self,
        actor: Actor,
        service_id: ServiceId,
        emergency_alerts: bool,
        location: Option<GeoPoint>,
    ) -> EngineResult<Subscription> {
        if self.deps.services.get(service_id).await?.is_none() {
            return Err(EngineError::NotFound(format!("service {service_id}")));
        }

        let mut subscription = Subscription::new(actor.id, service_id, Utc::now());
        if emergency_alerts {
            subscription = subscription.with_emergency_alerts(location);
        }
        Ok(self.deps.subscriptions.upsert(subscription).await?)
    }

    pub async fn unbookmark(&self, actor: Actor, service_id: ServiceId) -> EngineResult<bool> {
        Ok(self.deps.subscriptions.remove(actor.id, service_id).await?)
    }

    /// Drop every subscription for a deleted subscriber account.
    pub async fn remove_subscriber(&self, subscriber: Actor) -> EngineResult<u64> {
        Ok(self
            .deps
            .subscriptions
            .remove_all_for_subscriber(subscriber.id)
            .await?)
    }
}

/// Deliver bus messages: refresh the search view, then fan out
/// notifications. Runs until every bus sender is dropped.
async fn run_dispatch_loop(
    mut rx: mpsc::UnboundedReceiver<BusMessage>,
    dispatcher: Arc<NotificationDispatcher>,
    search: Arc<SearchEngine>,
) {
    while let Some(message) = rx.recv().await {
        match message {
            BusMessage::Event(event) => {
                // Any lifecycle or status event can change what search sees.
                search.invalidate().await;
                dispatcher.notify(&event).await;
            }
            BusMessage::Flush(ack) => {
                let _ = ack.send(());
            }
        }
    }
}
