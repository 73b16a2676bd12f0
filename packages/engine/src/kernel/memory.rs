//! In-memory store implementation.
//!
//! Backs tests and embedded deployments. Implements the same conditional
//! write discipline as the Postgres store: every mutation is applied under a
//! version check while holding the map's write lock.

use std::collections::{BTreeMap, HashMap};
use std::sync::RwLock;

use anyhow::{anyhow, bail, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::common::{GeoPoint, ModerationId, ServiceId, SubscriptionId, UserId};
use crate::domains::moderation::models::{Decision, ModerationRecord};
use crate::domains::notifications::models::Subscription;
use crate::domains::services::models::{Service, StatusUpdateRecord};
use crate::kernel::geo_index::GeoIndex;
use crate::kernel::store::{
    apply_to, CasResult, ModerationStore, ServiceMutation, ServiceStore, StatusLogStore,
    SubscriptionStore,
};

/// All four stores plus the geo index behind one in-process state bag.
pub struct InMemoryEngineStore {
    services: RwLock<BTreeMap<ServiceId, Service>>,
    log: RwLock<HashMap<ServiceId, Vec<StatusUpdateRecord>>>,
    moderation: RwLock<BTreeMap<ModerationId, ModerationRecord>>,
    subscriptions: RwLock<BTreeMap<SubscriptionId, Subscription>>,
    geo: GeoIndex,
}

impl InMemoryEngineStore {
    pub fn new() -> Self {
        Self {
            services: RwLock::new(BTreeMap::new()),
            log: RwLock::new(HashMap::new()),
            moderation: RwLock::new(BTreeMap::new()),
            subscriptions: RwLock::new(BTreeMap::new()),
            geo: GeoIndex::new(),
        }
    }
}

impl Default for InMemoryEngineStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ServiceStore for InMemoryEngineStore {
    async fn get(&self, id: ServiceId) -> Result<Option<Service>> {
        Ok(self.services.read().unwrap().get(&id).cloned())
    }

    async fn insert(&self, service: Service) -> Result<()> {
        let mut services = self.services.write().unwrap();
        if services.contains_key(&service.id) {
            bail!("service {} already exists", service.id);
        }
        self.geo.upsert(service.id, service.position);
        services.insert(service.id, service);
        Ok(())
    }

    async fn apply(
        &self,
        id: ServiceId,
        mutation: ServiceMutation,
        expected_version: i64,
    ) -> Result<CasResult> {
        let mut services = self.services.write().unwrap();
        let service = services
            .get_mut(&id)
            .ok_or_else(|| anyhow!("service {} not found", id))?;

        if service.version != expected_version {
            return Ok(CasResult::VersionMismatch {
                current_version: service.version,
            });
        }

        apply_to(service, &mutation, Utc::now());
        self.geo.upsert(service.id, service.position);
        Ok(CasResult::Applied(service.clone()))
    }

    async fn list_all(&self) -> Result<Vec<Service>> {
        Ok(self.services.read().unwrap().values().cloned().collect())
    }

    async fn list_visible(&self) -> Result<Vec<Service>> {
        Ok(self
            .services
            .read()
            .unwrap()
            .values()
            .filter(|service| service.is_publicly_visible())
            .cloned()
            .collect())
    }

    async fn find_within_radius(
        &self,
        center: GeoPoint,
        radius_km: f64,
    ) -> Result<Vec<(ServiceId, f64)>> {
        Ok(self.geo.within_radius(&center, radius_km))
    }
}

#[async_trait]
impl StatusLogStore for InMemoryEngineStore {
    async fn append(&self, record: StatusUpdateRecord) -> Result<()> {
        let mut log = self.log.write().unwrap();
        let entries = log.entry(record.service_id).or_default();

        // Per-service timestamps must be strictly increasing
        if let Some(last) = entries.last() {
            if record.recorded_at <= last.recorded_at {
                bail!(
                    "out-of-order status record for service {}: {} <= {}",
                    record.service_id,
                    record.recorded_at,
                    last.recorded_at
                );
            }
        }
        entries.push(record);
        Ok(())
    }

    async fn list_for_service(&self, service_id: ServiceId) -> Result<Vec<StatusUpdateRecord>> {
        Ok(self
            .log
            .read()
            .unwrap()
            .get(&service_id)
            .cloned()
            .unwrap_or_default())
    }
}

#[async_trait]
impl ModerationStore for InMemoryEngineStore {
    async fn insert(&self, record: ModerationRecord) -> Result<()> {
        let mut records = self.moderation.write().unwrap();
        if record.is_open()
            && records
                .values()
                .any(|existing| existing.service_id == record.service_id && existing.is_open())
        {
            bail!(
                "service {} already has an open moderation record",
                record.service_id
            );
        }
        records.insert(record.id, record);
        Ok(())
    }

    async fn get(&self, id: ModerationId) -> Result<Option<ModerationRecord>> {
        Ok(self.moderation.read().unwrap().get(&id).cloned())
    }

    async fn find_open_for_service(
        &self,
        service_id: ServiceId,
    ) -> Result<Option<ModerationRecord>> {
        Ok(self
            .moderation
            .read()
            .unwrap()
            .values()
            .find(|record| record.service_id == service_id && record.is_open())
            .cloned())
    }

    async fn mark_resolved(
        &self,
        id: ModerationId,
        reviewer: UserId,
        decision: Decision,
        reason: Option<String>,
        resolved_at: DateTime<Utc>,
    ) -> Result<ModerationRecord> {
        let mut records = self.moderation.write().unwrap();
        let record = records
            .get_mut(&id)
            .ok_or_else(|| anyhow!("moderation record {} not found", id))?;
        if !record.is_open() {
            bail!("moderation record {} is already resolved", id);
        }
        record.reviewer_id = Some(reviewer);
        record.decision = Some(decision);
        record.reason = reason;
        record.resolved_at = Some(resolved_at);
        Ok(record.clone())
    }

    async fn list_open(&self) -> Result<Vec<ModerationRecord>> {
        Ok(self
            .moderation
            .read()
            .unwrap()
            .values()
            .filter(|record| record.is_open())
            .cloned()
            .collect())
    }
}

#[async_trait]
impl SubscriptionStore for InMemoryEngineStore {
    async fn upsert(&self, subscription: Subscription) -> Result<Subscription> {
        let mut subscriptions = self.subscriptions.write().unwrap();

        // One row per (subscriber, service); re-bookmarking refreshes
        // preferences but keeps the original id and timestamp.
        if let Some(existing) = subscriptions.values_mut().find(|existing| {
            existing.subscriber_id == subscription.subscriber_id
                && existing.service_id == subscription.service_id
        }) {
            existing.emergency_alerts = subscription.emergency_alerts;
            existing.location = subscription.location;
            return Ok(existing.clone());
        }

        subscriptions.insert(subscription.id, subscription.clone());
        Ok(subscription)
    }

    async fn remove(&self, subscriber_id: UserId, service_id: ServiceId) -> Result<bool> {
        let mut subscriptions = self.subscriptions.write().unwrap();
        let before = subscriptions.len();
        subscriptions.retain(|_, subscription| {
            !(subscription.subscriber_id == subscriber_id
                && subscription.service_id == service_id)
        });
        Ok(subscriptions.len() < before)
    }

    async fn remove_all_for_subscriber(&self, subscriber_id: UserId) -> Result<u64> {
        let mut subscriptions = self.subscriptions.write().unwrap();
        let before = subscriptions.len();
        subscriptions.retain(|_, subscription| subscription.subscriber_id != subscriber_id);
        Ok((before - subscriptions.len()) as u64)
    }

    async fn find(
        &self,
        subscriber_id: UserId,
        service_id: ServiceId,
    ) -> Result<Option<Subscription>> {
        Ok(self
            .subscriptions
            .read()
            .unwrap()
            .values()
            .find(|subscription| {
                subscription.subscriber_id == subscriber_id
                    && subscription.service_id == service_id
            })
            .cloned())
    }

    async fn list_for_service(&self, service_id: ServiceId) -> Result<Vec<Subscription>> {
        Ok(self
            .subscriptions
            .read()
            .unwrap()
            .values()
            .filter(|subscription| subscription.service_id == service_id)
            .cloned()
            .collect())
    }

    async fn list_emergency_opt_ins(&self) -> Result<Vec<Subscription>> {
        Ok(self
            .subscriptions
            .read()
            .unwrap()
            .values()
            .filter(|subscription| subscription.emergency_alerts)
            .cloned()
            .collect())
    }
}
