pub mod auth;
pub mod entity_ids;
pub mod errors;
pub mod geo;
pub mod id;

pub use auth::{Actor, Role};
pub use entity_ids::*;
pub use errors::{EngineError, EngineResult};
pub use geo::{BoundingBox, GeoPoint};
pub use id::{Id, V4, V7};
