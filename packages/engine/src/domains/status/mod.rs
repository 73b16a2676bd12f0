//! Real-time capacity and operating-status state machine.

pub mod engine;
pub mod events;
pub mod sweep;

pub use engine::{StatusAccepted, StatusEngine, SubmitStatusUpdate};
pub use events::StatusEvent;
pub use sweep::flag_stale_services;
