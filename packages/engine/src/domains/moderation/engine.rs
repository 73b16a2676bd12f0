//! ModerationEngine - the publication state machine.
//!
//! draft → pending_review → { public, rejected }; public re-enters review on
//! a significant edit; rejected re-enters on resubmission with edits. One
//! open record per service, enforced idempotently.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::info;

use crate::common::{Actor, EngineError, EngineResult, EventId, ModerationId, ServiceId};
use crate::config::EngineConfig;
use crate::domains::moderation::events::ModerationEvent;
use crate::domains::moderation::models::{Decision, ModerationRecord};
use crate::domains::services::models::{PublicationState, Service, ServiceDiff};
use crate::kernel::deps::EngineDeps;
use crate::kernel::store::{
    CasResult, ModerationStore, ResolutionPatch, ServiceMutation, ServiceStore,
};

/// What happened to a submitted edit.
#[derive(Debug, Clone)]
pub enum EditOutcome {
    /// Cosmetic change, applied directly.
    Applied(Service),
    /// Significant change, routed through review.
    RoutedToReview(ModerationRecord),
}

/// Owns the per-service publication state machine.
pub struct ModerationEngine {
    deps: Arc<EngineDeps>,
    config: EngineConfig,
}

impl ModerationEngine {
    pub fn new(deps: Arc<EngineDeps>, config: EngineConfig) -> Self {
        Self { deps, config }
    }

    /// Put a listing into the review queue, applying the proposed edit.
    ///
    /// Idempotent: if an open record already exists for the service it is
    /// returned as-is instead of creating a duplicate.
    pub async fn submit_for_review(
        &self,
        actor: Actor,
        service_id: ServiceId,
        diff: ServiceDiff,
    ) -> EngineResult<(ModerationRecord, Vec<ModerationEvent>)> {
        let service = self.get_service(service_id).await?;
        actor.require_manager_of(service.manager_id)?;

        if let Some(open) = self.deps.moderation.find_open_for_service(service_id).await? {
            return Ok((open, Vec::new()));
        }

        match service.publication {
            PublicationState::Draft | PublicationState::PendingReview => {}
            PublicationState::Public => {
                if !diff.is_significant() {
                    return Err(EngineError::InvalidState(
                        "published listings only re-enter review for significant edits".into(),
                    ));
                }
            }
            PublicationState::Rejected => {
                if diff.is_empty() {
                    return Err(EngineError::Validation(
                        "resubmission requires edits".into(),
                    ));
                }
            }
        }

        let now = Utc::now();
        let significant = diff.is_significant();
        let review_diff = diff.clone();
        let service = self
            .apply_with_retry(service_id, move |_| {
                Ok(ServiceMutation::Review {
                    diff: review_diff.clone(),
                    submitted_at: now,
                })
            })
            .await?;

        let record = ModerationRecord::new(service_id, actor.id, diff, now);
        self.deps.moderation.insert(record.clone()).await?;

        info!(
            service_id = %service_id,
            record_id = %record.id,
            significant = significant,
            "Service submitted for review"
        );

        let events = vec![ModerationEvent::SubmittedForReview {
            event_id: EventId::new(),
            record_id: record.id,
            service_id: service.id,
            submitted_by: actor.id,
            significant,
            submitted_at: now,
        }];

        Ok((record, events))
    }

    /// Apply an edit, routing significant changes through review.
    pub async fn apply_edit(
        &self,
        actor: Actor,
        service_id: ServiceId,
        diff: ServiceDiff,
    ) -> EngineResult<(EditOutcome, Vec<ModerationEvent>)> {
        if diff.is_empty() {
            return Err(EngineError::Validation("edit contains no changes".into()));
        }

        if diff.is_significant() {
            let (record, events) = self.submit_for_review(actor, service_id, diff).await?;
            return Ok((EditOutcome::RoutedToReview(record), events));
        }

        let service = self.get_service(service_id).await?;
        actor.require_manager_of(service.manager_id)?;

        let updated = self
            .apply_with_retry(service_id, move |_| {
                Ok(ServiceMutation::Profile { diff: diff.clone() })
            })
            .await?;

        info!(service_id = %service_id, "Applied cosmetic edit");
        Ok((EditOutcome::Applied(updated), Vec::new()))
    }

    /// Resolve an open record. Approval publishes and stamps the verifier;
    /// rejection requires a non-empty reason.
    pub async fn resolve(
        &self,
        reviewer: Actor,
        record_id: ModerationId,
        decision: Decision,
        reason: Option<String>,
    ) -> EngineResult<(Service, Vec<ModerationEvent>)> {
        reviewer.require_moderator()?;

        let record = self
            .deps
            .moderation
            .get(record_id)
            .await?
            .ok_or_else(|| EngineError::NotFound(format!("moderation record {record_id}")))?;

        if !record.is_open() {
            return Err(EngineError::InvalidState(
                "moderation record is already resolved".into(),
            ));
        }

        let reason = reason.map(|r| r.trim().to_string()).filter(|r| !r.is_empty());
        if decision == Decision::Rejected && reason.is_none() {
            return Err(EngineError::Validation(
                "rejection requires a reason".into(),
            ));
        }

        let now = Utc::now();
        let service = self
            .apply_with_retry(record.service_id, move |service| {
                if service.publication != PublicationState::PendingReview {
                    return Err(EngineError::InvalidState(format!(
                        "service is {} rather than pending review",
                        service.publication
                    )));
                }
                Ok(ServiceMutation::Resolve(ResolutionPatch {
                    decision,
                    reviewer: reviewer.id,
                    resolved_at: now,
                }))
            })
            .await?;

        let resolved = self
            .deps
            .moderation
            .mark_resolved(record_id, reviewer.id, decision, reason.clone(), now)
            .await?;

        info!(
            record_id = %record_id,
            service_id = %service.id,
            decision = %decision,
            "Moderation record resolved"
        );

        let events = vec![ModerationEvent::ModerationResolved {
            event_id: EventId::new(),
            record_id: resolved.id,
            service_id: service.id,
            manager_id: service.manager_id,
            decision,
            reason,
            resolved_at: now,
        }];

        Ok((service, events))
    }

    /// Admin suspension lever: a suspended listing keeps its publication
    /// state but drops out of public search.
    pub async fn set_active(
        &self,
        actor: Actor,
        service_id: ServiceId,
        is_active: bool,
    ) -> EngineResult<(Service, Vec<ModerationEvent>)> {
        actor.require_admin()?;

        let service = self.get_service(service_id).await?;
        if service.is_active == is_active {
            return Ok((service, Vec::new()));
        }

        let now = Utc::now();
        let updated = self
            .apply_with_retry(service_id, move |_| {
                Ok(ServiceMutation::Activation { is_active })
            })
            .await?;

        info!(service_id = %service_id, is_active = is_active, "Service activation changed");

        let events = vec![ModerationEvent::ActivationChanged {
            event_id: EventId::new(),
            service_id,
            is_active,
            changed_at: now,
        }];

        Ok((updated, events))
    }

    /// Open records past the review deadline, for the moderator dashboard.
    /// Absence of action is reported, never converted into a decision.
    pub async fn list_overdue(&self, now: DateTime<Utc>) -> EngineResult<Vec<ModerationRecord>> {
        let open = self.deps.moderation.list_open().await?;
        Ok(open
            .into_iter()
            .filter(|record| record.is_overdue(now, self.config.moderation_deadline))
            .collect())
    }

    async fn get_service(&self, service_id: ServiceId) -> EngineResult<Service> {
        self.deps
            .services
            .get(service_id)
            .await?
            .ok_or_else(|| EngineError::NotFound(format!("service {service_id}")))
    }

    /// Re-read, re-check, and apply under CAS with bounded backoff.
    async fn apply_with_retry(
        &self,
        service_id: ServiceId,
        prepare: impl Fn(&Service) -> EngineResult<ServiceMutation>,
    ) -> EngineResult<Service> {
        let mut attempt: u32 = 0;
        loop {
            let service = self.get_service(service_id).await?;
            let mutation = prepare(&service)?;

            match self
                .deps
                .services
                .apply(service_id, mutation, service.version)
                .await?
            {
                CasResult::Applied(updated) => return Ok(updated),
                CasResult::VersionMismatch { current_version } => {
                    if attempt >= self.config.max_cas_retries {
                        return Err(EngineError::ConcurrencyConflict {
                            service_id,
                            expected_version: service.version,
                            current_version,
                        });
                    }
                    attempt += 1;
                    tokio::time::sleep(self.config.cas_backoff * attempt).await;
                }
            }
        }
    }
}
