//! Publication lifecycle: draft review, re-verification of significant
//! edits, and suspension.

pub mod engine;
pub mod events;
pub mod models;

pub use engine::{EditOutcome, ModerationEngine};
pub use events::ModerationEvent;
pub use models::{Decision, ModerationRecord};
