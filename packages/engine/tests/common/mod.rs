//! Shared test harness: in-memory dependencies, a running engine, and
//! seeding helpers.

#![allow(dead_code)]

use std::sync::Arc;

use engine_core::common::{Actor, GeoPoint, Role, UserId};
use engine_core::config::EngineConfig;
use engine_core::domains::moderation::models::Decision;
use engine_core::domains::services::factory::NewService;
use engine_core::domains::services::models::{Service, ServiceCategory, ServiceDiff};
use engine_core::kernel::test_dependencies::RecordingDeliveryChannel;
use engine_core::kernel::{Engine, EngineDeps};

pub struct TestHarness {
    pub engine: Engine,
    pub deps: Arc<EngineDeps>,
    pub delivery: RecordingDeliveryChannel,
    pub admin: Actor,
    pub moderator: Actor,
}

impl TestHarness {
    pub fn new() -> Self {
        Self::with_config(EngineConfig::default())
    }

    pub fn with_config(config: EngineConfig) -> Self {
        let delivery = RecordingDeliveryChannel::new();
        let deps = EngineDeps::in_memory_with_delivery(Arc::new(delivery.clone()));
        let engine = Engine::start(deps.clone(), config);
        Self {
            engine,
            deps,
            delivery,
            admin: Actor::new(UserId::new(), Role::Admin),
            moderator: Actor::new(UserId::new(), Role::Moderator),
        }
    }

    pub fn manager() -> Actor {
        Actor::new(UserId::new(), Role::Manager)
    }

    pub fn plain_user() -> Actor {
        Actor::new(UserId::new(), Role::User)
    }

    /// Listing input at the given coordinates.
    pub fn listing(
        name: &str,
        category: ServiceCategory,
        latitude: f64,
        longitude: f64,
        manager: Actor,
    ) -> NewService {
        NewService {
            name: name.into(),
            description: format!("{name} community services"),
            category,
            position: GeoPoint::new(latitude, longitude).unwrap(),
            manager_id: manager.id,
            max_capacity: Some(10),
            tags: vec![],
            hours: None,
            is_emergency_service: None,
            alert_radius_km: None,
        }
    }

    /// Create a draft listing.
    pub async fn seed_draft(&self, input: NewService, manager: Actor) -> Service {
        self.engine.create_service(manager, input).await.unwrap()
    }

    /// Create, submit, and approve a listing so it is publicly visible.
    pub async fn seed_public(&self, input: NewService, manager: Actor) -> Service {
        let service = self.seed_draft(input, manager).await;
        let record = self
            .engine
            .submit_for_review(manager, service.id, ServiceDiff::default())
            .await
            .unwrap();
        let service = self
            .engine
            .resolve_moderation(self.moderator, record.id, Decision::Approved, None)
            .await
            .unwrap();
        self.engine.settle().await;
        service
    }
}
