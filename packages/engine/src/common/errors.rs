//! Error taxonomy for the lifecycle & discovery engine.
//!
//! Every fallible engine operation returns `EngineResult<T>`. Variants map to
//! the caller-facing failure classes: malformed input, missing permission,
//! state moved underneath the caller, operation illegal in the current state,
//! and fatal misconfiguration. Store-level failures pass through unmodified.

use thiserror::Error;

use crate::common::ServiceId;

/// Engine error taxonomy.
#[derive(Error, Debug)]
pub enum EngineError {
    /// Malformed input. Local and user-correctable.
    #[error("validation failed: {0}")]
    Validation(String),

    /// Caller lacks the required role or ownership (403-equivalent).
    #[error("permission denied: {0}")]
    Authorization(String),

    /// State moved under the caller (e.g., duplicate submission).
    #[error("conflict: {0}")]
    Conflict(String),

    /// A conditional write lost against a concurrent writer. The caller must
    /// re-read and retry with fresh state.
    #[error("service {service_id} is at version {current_version}, expected {expected_version}")]
    ConcurrencyConflict {
        service_id: ServiceId,
        expected_version: i64,
        current_version: i64,
    },

    /// Operation illegal in the record's current state.
    #[error("invalid state: {0}")]
    InvalidState(String),

    /// Routine ping submitted inside the configured minimum interval.
    #[error("rate limit exceeded: {0}")]
    RateLimited(String),

    /// Unknown strategy, threshold, or other setup error. Fatal, not retryable.
    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("not found: {0}")]
    NotFound(String),

    /// Record-store failure, propagated unmodified.
    #[error("store error: {0}")]
    Store(#[from] anyhow::Error),
}

pub type EngineResult<T> = Result<T, EngineError>;

impl EngineError {
    /// True when the caller can recover by re-reading and retrying.
    pub fn is_retryable(&self) -> bool {
        matches!(self, EngineError::ConcurrencyConflict { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_concurrency_conflict_is_retryable() {
        let err = EngineError::ConcurrencyConflict {
            service_id: ServiceId::nil(),
            expected_version: 1,
            current_version: 2,
        };
        assert!(err.is_retryable());
        assert!(!EngineError::Validation("bad".into()).is_retryable());
    }

    #[test]
    fn test_display_includes_versions() {
        let err = EngineError::ConcurrencyConflict {
            service_id: ServiceId::nil(),
            expected_version: 3,
            current_version: 5,
        };
        let msg = err.to_string();
        assert!(msg.contains("version 5"));
        assert!(msg.contains("expected 3"));
    }
}
