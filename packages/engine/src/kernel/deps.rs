//! Engine dependencies (using traits for testability)
//!
//! Central dependency container handed to each component at startup. All
//! external collaborators sit behind trait objects so tests can swap them.

use std::sync::Arc;

use sqlx::PgPool;

use crate::kernel::delivery::{BaseDeliveryChannel, TracingDeliveryChannel};
use crate::kernel::memory::InMemoryEngineStore;
use crate::kernel::postgres::PgEngineStore;
use crate::kernel::store::{ModerationStore, ServiceStore, StatusLogStore, SubscriptionStore};

/// Engine dependencies accessible to every component.
pub struct EngineDeps {
    pub services: Arc<dyn ServiceStore>,
    pub status_log: Arc<dyn StatusLogStore>,
    pub moderation: Arc<dyn ModerationStore>,
    pub subscriptions: Arc<dyn SubscriptionStore>,
    pub delivery: Arc<dyn BaseDeliveryChannel>,
}

impl EngineDeps {
    pub fn new(
        services: Arc<dyn ServiceStore>,
        status_log: Arc<dyn StatusLogStore>,
        moderation: Arc<dyn ModerationStore>,
        subscriptions: Arc<dyn SubscriptionStore>,
        delivery: Arc<dyn BaseDeliveryChannel>,
    ) -> Self {
        Self {
            services,
            status_log,
            moderation,
            subscriptions,
            delivery,
        }
    }

    /// Fully in-memory dependencies with the logging delivery sink.
    pub fn in_memory() -> Arc<Self> {
        Self::in_memory_with_delivery(Arc::new(TracingDeliveryChannel))
    }

    /// In-memory dependencies with a caller-supplied delivery channel.
    pub fn in_memory_with_delivery(delivery: Arc<dyn BaseDeliveryChannel>) -> Arc<Self> {
        let store = Arc::new(InMemoryEngineStore::new());
        Arc::new(Self {
            services: store.clone(),
            status_log: store.clone(),
            moderation: store.clone(),
            subscriptions: store,
            delivery,
        })
    }

    /// Postgres-backed dependencies.
    pub fn postgres(pool: PgPool, delivery: Arc<dyn BaseDeliveryChannel>) -> Arc<Self> {
        let store = Arc::new(PgEngineStore::new(pool));
        Arc::new(Self {
            services: store.clone(),
            status_log: store.clone(),
            moderation: store.clone(),
            subscriptions: store,
            delivery,
        })
    }
}
