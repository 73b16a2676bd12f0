//! The Service aggregate: the listing record itself, its operating-hours
//! schedule, the append-only status log, edit diffs, and the per-category
//! defaults consulted at construction time.

pub mod data;
pub mod factory;
pub mod models;

pub use factory::{build_service, NewService};
pub use models::*;
