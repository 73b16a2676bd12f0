//! Silence sweep: flag services that have gone quiet.
//!
//! The engine never rejects a late update; instead this sweep marks services
//! whose last accepted update exceeds the configured window as stale. The
//! flag clears on the next accepted update. Nothing auto-expires.

use chrono::{DateTime, Utc};
use tracing::{debug, warn};

use crate::common::{EngineResult, EventId};
use crate::config::EngineConfig;
use crate::domains::status::events::StatusEvent;
use crate::kernel::deps::EngineDeps;
use crate::kernel::store::{CasResult, ServiceMutation, ServiceStore};

/// Flag every service silent for longer than `config.max_silence`.
///
/// Returns one `ServiceFlaggedStale` event per newly flagged service.
pub async fn flag_stale_services(
    deps: &EngineDeps,
    config: &EngineConfig,
    now: DateTime<Utc>,
) -> EngineResult<Vec<StatusEvent>> {
    let services = deps.services.list_all().await?;
    let mut events = Vec::new();

    for service in services {
        if service.stale || now - service.last_capacity_update <= config.max_silence {
            continue;
        }

        match deps
            .services
            .apply(service.id, ServiceMutation::FlagStale, service.version)
            .await?
        {
            CasResult::Applied(_) => {
                warn!(
                    service_id = %service.id,
                    last_update = %service.last_capacity_update,
                    "Service flagged stale"
                );
                events.push(StatusEvent::ServiceFlaggedStale {
                    event_id: EventId::new(),
                    service_id: service.id,
                    manager_id: service.manager_id,
                    last_capacity_update: service.last_capacity_update,
                    flagged_at: now,
                });
            }
            CasResult::VersionMismatch { .. } => {
                // A concurrent update just landed; the service is no longer
                // silent, or the next sweep will catch it.
                debug!(service_id = %service.id, "Skipped stale flag, service moved");
            }
        }
    }

    Ok(events)
}
