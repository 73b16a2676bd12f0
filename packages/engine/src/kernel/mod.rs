pub mod delivery;
pub mod deps;
pub mod event_bus;
pub mod geo_index;
pub mod memory;
pub mod postgres;
pub mod runtime;
pub mod scheduler;
pub mod store;
pub mod telemetry;
pub mod test_dependencies;

pub use delivery::{BaseDeliveryChannel, TracingDeliveryChannel};
pub use deps::EngineDeps;
pub use event_bus::{EngineEvent, EventBus};
pub use geo_index::GeoIndex;
pub use memory::InMemoryEngineStore;
pub use postgres::PgEngineStore;
pub use runtime::Engine;
pub use store::{
    CasResult, ModerationStore, ServiceMutation, ServiceStore, StatusLogStore, SubscriptionStore,
};
