// Community Service Atlas - Lifecycle & Discovery Engine
//
// This crate owns the lifecycle of a community-service listing (draft review,
// publication, suspension), the real-time capacity/status state machine, the
// pluggable search strategies, and notification fan-out to subscribers.
// Transport (HTTP/RPC), identity, and delivery retry policies live outside.

pub mod common;
pub mod config;
pub mod domains;
pub mod kernel;

pub use config::*;
