//! StatusEngine - manager-submitted capacity and status updates.
//!
//! Every accepted update appends one immutable log record, rewrites the
//! service's denormalized status fields through a version-checked intent,
//! and returns the emitted events as values.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::info;

use crate::common::{Actor, EngineError, EngineResult, EventId, ServiceId, UpdateId};
use crate::config::EngineConfig;
use crate::domains::services::models::{
    ChangeKind, OperatingHours, OperatingStatus, Service, StatusUpdateRecord,
};
use crate::domains::status::events::StatusEvent;
use crate::kernel::deps::EngineDeps;
use crate::kernel::store::{
    CasResult, ServiceMutation, ServiceStore, StatusLogStore, StatusPatch,
};

/// Capacity ratio at which a service is full.
pub const FULL_RATIO: f64 = 1.0;

/// Capacity ratio at which a service is nearly full.
pub const NEAR_CAPACITY_RATIO: f64 = 0.9;

/// Threshold band the capacity ratio falls into.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CapacityBand {
    Open,
    NearCapacity,
    Full,
}

/// Band for a capacity/max pair.
pub fn capacity_band(current: u32, max: u32) -> CapacityBand {
    let ratio = current as f64 / max as f64;
    if ratio >= FULL_RATIO {
        CapacityBand::Full
    } else if ratio >= NEAR_CAPACITY_RATIO {
        CapacityBand::NearCapacity
    } else {
        CapacityBand::Open
    }
}

/// Capacity-derived status; closed operating hours override the bands.
pub fn derived_status(
    current: u32,
    max: u32,
    hours: &OperatingHours,
    now: DateTime<Utc>,
) -> OperatingStatus {
    if !hours.is_open_at(now) {
        return OperatingStatus::Closed;
    }
    match capacity_band(current, max) {
        CapacityBand::Full => OperatingStatus::Full,
        CapacityBand::NearCapacity => OperatingStatus::NearCapacity,
        CapacityBand::Open => OperatingStatus::Open,
    }
}

/// A manager's status submission.
#[derive(Debug, Clone)]
pub struct SubmitStatusUpdate {
    pub service_id: ServiceId,
    /// New occupancy. Negative values are rejected.
    pub new_capacity: Option<i64>,
    /// Explicit status override; latches until the next capacity update.
    pub new_status: Option<OperatingStatus>,
    pub note: Option<String>,
    /// When set, the write is attempted exactly once against this version
    /// and a mismatch surfaces as `ConcurrencyConflict`. When unset, the
    /// engine re-reads and retries with backoff up to the configured bound.
    pub expected_version: Option<i64>,
}

impl SubmitStatusUpdate {
    pub fn capacity(service_id: ServiceId, new_capacity: i64) -> Self {
        Self {
            service_id,
            new_capacity: Some(new_capacity),
            new_status: None,
            note: None,
            expected_version: None,
        }
    }

    pub fn status(service_id: ServiceId, new_status: OperatingStatus) -> Self {
        Self {
            service_id,
            new_capacity: None,
            new_status: Some(new_status),
            note: None,
            expected_version: None,
        }
    }
}

/// Result of an accepted update.
#[derive(Debug, Clone)]
pub struct StatusAccepted {
    pub service: Service,
    pub record: StatusUpdateRecord,
    pub events: Vec<StatusEvent>,
}

/// Owns the per-service capacity/operating-status state machine.
pub struct StatusEngine {
    deps: Arc<EngineDeps>,
    config: EngineConfig,
}

impl StatusEngine {
    pub fn new(deps: Arc<EngineDeps>, config: EngineConfig) -> Self {
        Self { deps, config }
    }

    /// Validate and apply one status submission.
    pub async fn submit_update(
        &self,
        actor: Actor,
        req: SubmitStatusUpdate,
    ) -> EngineResult<StatusAccepted> {
        if req.new_capacity.is_none() && req.new_status.is_none() {
            return Err(EngineError::Validation(
                "update must include a capacity or an operating status".into(),
            ));
        }
        if let Some(capacity) = req.new_capacity {
            if capacity < 0 {
                return Err(EngineError::Validation(format!(
                    "capacity cannot be negative: {capacity}"
                )));
            }
            if capacity > u32::MAX as i64 {
                return Err(EngineError::Validation(format!(
                    "capacity out of range: {capacity}"
                )));
            }
        }

        let strict = req.expected_version.is_some();
        let mut attempt: u32 = 0;

        loop {
            let service = self
                .deps
                .services
                .get(req.service_id)
                .await?
                .ok_or_else(|| EngineError::NotFound(format!("service {}", req.service_id)))?;

            actor.require_manager_of(service.manager_id)?;

            let expected_version = req.expected_version.unwrap_or(service.version);

            // Per-service record timestamps are strictly increasing; guard
            // against coarse clocks by stepping past the last update.
            let mut now = Utc::now();
            if now <= service.last_capacity_update {
                now = service.last_capacity_update + chrono::Duration::microseconds(1);
            }

            let planned = self.plan(&service, &req, now)?;

            let patch = StatusPatch {
                current_capacity: planned.new_capacity,
                operating_status: planned.new_status,
                status_is_manual: planned.status_is_manual,
                last_capacity_update: now,
            };

            match self
                .deps
                .services
                .apply(req.service_id, ServiceMutation::Status(patch), expected_version)
                .await?
            {
                CasResult::Applied(updated) => {
                    let record = StatusUpdateRecord {
                        id: UpdateId::new(),
                        service_id: service.id,
                        change: planned.change,
                        old_capacity: service.current_capacity,
                        new_capacity: planned.new_capacity,
                        old_status: service.operating_status,
                        new_status: planned.new_status,
                        actor_id: actor.id,
                        note: req.note.clone(),
                        recorded_at: now,
                    };
                    self.deps.status_log.append(record.clone()).await?;

                    info!(
                        service_id = %service.id,
                        change = %record.change,
                        old_status = %record.old_status,
                        new_status = %record.new_status,
                        "Accepted status update"
                    );

                    let events = vec![StatusEvent::StatusChanged {
                        event_id: EventId::new(),
                        service_id: service.id,
                        manager_id: service.manager_id,
                        old_capacity: record.old_capacity,
                        new_capacity: record.new_capacity,
                        max_capacity: updated.max_capacity,
                        old_status: record.old_status,
                        new_status: record.new_status,
                        band_crossed: planned.band_crossed,
                        is_emergency_related: planned.is_emergency_related,
                        recorded_at: now,
                    }];

                    return Ok(StatusAccepted {
                        service: updated,
                        record,
                        events,
                    });
                }
                CasResult::VersionMismatch { current_version } => {
                    if strict || attempt >= self.config.max_cas_retries {
                        return Err(EngineError::ConcurrencyConflict {
                            service_id: req.service_id,
                            expected_version,
                            current_version,
                        });
                    }
                    attempt += 1;
                    tokio::time::sleep(self.config.cas_backoff * attempt).await;
                }
            }
        }
    }

    /// Compute the post-update fields without touching the store.
    fn plan(
        &self,
        service: &Service,
        req: &SubmitStatusUpdate,
        now: DateTime<Utc>,
    ) -> EngineResult<PlannedUpdate> {
        let new_capacity = match req.new_capacity {
            Some(capacity) => capacity as u32,
            None => service.current_capacity,
        };

        // Explicit status latches; a capacity-only update reverts to derived.
        let (new_status, status_is_manual) = match (req.new_status, req.new_capacity) {
            (Some(status), _) => (status, true),
            (None, Some(_)) => (
                derived_status(new_capacity, service.max_capacity, &service.hours, now),
                false,
            ),
            (None, None) => unreachable!("validated above"),
        };

        let change = match (req.new_capacity, req.new_status) {
            (Some(_), Some(_)) => ChangeKind::Both,
            (Some(_), None) => ChangeKind::Capacity,
            (None, Some(_)) => ChangeKind::OperatingStatus,
            (None, None) => unreachable!("validated above"),
        };

        let old_band = capacity_band(service.current_capacity, service.max_capacity);
        let new_band = capacity_band(new_capacity, service.max_capacity);
        let band_crossed = old_band != new_band;

        // Routine ping: nothing observable changes. Only these are subject
        // to the optional minimum-interval floor.
        let routine = req.new_status.is_none()
            && !band_crossed
            && new_status == service.operating_status;

        if routine {
            if let Some(min_interval) = self.config.min_update_interval {
                let elapsed = now - service.last_capacity_update;
                if elapsed < min_interval {
                    return Err(EngineError::RateLimited(format!(
                        "routine ping within {} minutes of the last update",
                        min_interval.num_minutes()
                    )));
                }
            }
        }

        let status_changed = new_status != service.operating_status;
        let is_emergency_related = status_changed
            && (matches!(
                new_status,
                OperatingStatus::EmergencyOnly | OperatingStatus::TemporarilyClosed
            ) || service.is_emergency_service);

        Ok(PlannedUpdate {
            new_capacity,
            new_status,
            status_is_manual,
            change,
            band_crossed,
            is_emergency_related,
        })
    }

    /// Full status log for a service, oldest first.
    pub async fn history(&self, service_id: ServiceId) -> EngineResult<Vec<StatusUpdateRecord>> {
        Ok(self.deps.status_log.list_for_service(service_id).await?)
    }
}

struct PlannedUpdate {
    new_capacity: u32,
    new_status: OperatingStatus,
    status_is_manual: bool,
    change: ChangeKind,
    band_crossed: bool,
    is_emergency_related: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_band_thresholds() {
        assert_eq!(capacity_band(5, 10), CapacityBand::Open);
        assert_eq!(capacity_band(8, 10), CapacityBand::Open);
        assert_eq!(capacity_band(9, 10), CapacityBand::NearCapacity);
        assert_eq!(capacity_band(10, 10), CapacityBand::Full);
        // Over-capacity is representable and still full
        assert_eq!(capacity_band(14, 10), CapacityBand::Full);
    }

    #[test]
    fn test_derived_status_follows_bands() {
        let hours = OperatingHours::always_open();
        let now = Utc::now();
        assert_eq!(
            derived_status(5, 10, &hours, now),
            OperatingStatus::Open
        );
        assert_eq!(
            derived_status(9, 10, &hours, now),
            OperatingStatus::NearCapacity
        );
        assert_eq!(derived_status(10, 10, &hours, now), OperatingStatus::Full);
    }

    #[test]
    fn test_closed_hours_override_capacity() {
        use chrono::Weekday;
        use crate::domains::services::models::DailyWindow;

        // Open one minute on Mondays at midnight; Tuesday noon is closed.
        let hours = OperatingHours::with_windows(vec![DailyWindow {
            day: Weekday::Mon,
            open: "00:00:00".parse().unwrap(),
            close: "00:01:00".parse().unwrap(),
        }]);
        let tuesday_noon = chrono::TimeZone::with_ymd_and_hms(&Utc, 2024, 3, 5, 12, 0, 0).unwrap();
        assert_eq!(
            derived_status(5, 10, &hours, tuesday_noon),
            OperatingStatus::Closed
        );
    }
}
