//! Scheduled background tasks using tokio-cron-scheduler.
//!
//! Two periodic sweeps:
//! - staleness: flag services silent for longer than the configured window
//! - moderation: report open records past the review deadline
//!
//! Tasks emit events or log; neither auto-resolves or auto-expires anything.

use std::sync::Arc;

use anyhow::Result;
use chrono::Utc;
use tokio_cron_scheduler::{Job, JobScheduler};
use tracing::{info, warn};

use crate::config::EngineConfig;
use crate::domains::status::sweep::flag_stale_services;
use crate::kernel::deps::EngineDeps;
use crate::kernel::event_bus::{EngineEvent, EventBus};
use crate::kernel::store::ModerationStore;

/// Start all scheduled tasks.
pub async fn start_scheduler(
    deps: Arc<EngineDeps>,
    config: EngineConfig,
    bus: EventBus,
) -> Result<JobScheduler> {
    let scheduler = JobScheduler::new().await?;

    // Staleness sweep - runs every hour
    let sweep_deps = deps.clone();
    let sweep_config = config.clone();
    let sweep_bus = bus.clone();
    let sweep_job = Job::new_async("0 0 * * * *", move |_uuid, _lock| {
        let deps = sweep_deps.clone();
        let config = sweep_config.clone();
        let bus = sweep_bus.clone();
        Box::pin(async move {
            match flag_stale_services(&deps, &config, Utc::now()).await {
                Ok(events) => {
                    if !events.is_empty() {
                        info!("Stale sweep flagged {} services", events.len());
                    }
                    bus.emit_all(events.into_iter().map(EngineEvent::Status));
                }
                Err(e) => tracing::error!("Stale sweep failed: {}", e),
            }
        })
    })?;
    scheduler.add(sweep_job).await?;

    // Overdue moderation report - runs every hour, offset by 30 minutes
    let report_deps = deps.clone();
    let report_config = config.clone();
    let report_job = Job::new_async("0 30 * * * *", move |_uuid, _lock| {
        let deps = report_deps.clone();
        let config = report_config.clone();
        Box::pin(async move {
            if let Err(e) = report_overdue_reviews(&deps, &config).await {
                tracing::error!("Overdue review report failed: {}", e);
            }
        })
    })?;
    scheduler.add(report_job).await?;

    scheduler.start().await?;

    info!("Scheduled tasks started (stale sweep hourly, overdue review report hourly)");
    Ok(scheduler)
}

/// Surface open records past the deadline. Reporting only; absence of
/// reviewer action is never converted into a decision.
async fn report_overdue_reviews(deps: &EngineDeps, config: &EngineConfig) -> Result<()> {
    let now = Utc::now();
    let open = deps.moderation.list_open().await?;

    for record in open
        .iter()
        .filter(|record| record.is_overdue(now, config.moderation_deadline))
    {
        warn!(
            record_id = %record.id,
            service_id = %record.service_id,
            submitted_at = %record.submitted_at,
            "Moderation record overdue"
        );
    }

    Ok(())
}
