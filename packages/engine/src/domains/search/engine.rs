//! SearchEngine - composes the visibility predicate with a named strategy.
//!
//! Search is a pure read: it never writes, and repeated invocations with
//! identical arguments over unchanged state return identical orderings. The
//! visible-candidate snapshot is invalidated by the dispatch loop whenever a
//! lifecycle or status event lands.

use std::collections::HashSet;
use std::sync::Arc;

use chrono::Utc;
use tokio::sync::RwLock;
use tracing::debug;

use crate::common::{EngineError, EngineResult, ServiceId};
use crate::config::EngineConfig;
use crate::domains::search::query::SearchQuery;
use crate::domains::search::strategies::{score_and_order, RankContext, Strategy};
use crate::domains::services::models::Service;
use crate::kernel::deps::EngineDeps;
use crate::kernel::store::ServiceStore;

/// Read-side search over publicly visible services.
pub struct SearchEngine {
    deps: Arc<EngineDeps>,
    config: EngineConfig,
    /// Materialized view of visible candidates, id-ordered.
    snapshot: RwLock<Option<Arc<Vec<Service>>>>,
}

impl SearchEngine {
    pub fn new(deps: Arc<EngineDeps>, config: EngineConfig) -> Self {
        Self {
            deps,
            config,
            snapshot: RwLock::new(None),
        }
    }

    /// Rank visible services for one query.
    pub async fn search(&self, query: &SearchQuery) -> EngineResult<Vec<Service>> {
        let strategy = Strategy::parse(&query.strategy)?;

        if let Some(radius) = query.max_distance_km {
            if !radius.is_finite() || radius <= 0.0 {
                return Err(EngineError::Validation(format!(
                    "max_distance_km must be positive: {radius}"
                )));
            }
        }

        let mut candidates = self.visible_candidates().await?;

        // Radius prefilter through the store's geo query. Out-of-radius
        // candidates drop out before any scoring happens.
        let radius = match strategy {
            Strategy::Emergency => Some(
                query
                    .max_distance_km
                    .unwrap_or(self.config.emergency_radius_km),
            ),
            _ => query.max_distance_km,
        };
        if let (Some(user), Some(radius)) = (query.user_location, radius) {
            let within: HashSet<ServiceId> = self
                .deps
                .services
                .find_within_radius(user, radius)
                .await?
                .into_iter()
                .map(|(id, _)| id)
                .collect();
            candidates.retain(|service| within.contains(&service.id));
        }

        let ctx = RankContext {
            query,
            config: &self.config,
            now: Utc::now(),
        };
        score_and_order(strategy, candidates, &ctx)
    }

    /// Drop the materialized view; the next search rebuilds it.
    pub async fn invalidate(&self) {
        *self.snapshot.write().await = None;
        debug!("Search snapshot invalidated");
    }

    async fn visible_candidates(&self) -> EngineResult<Vec<Service>> {
        if let Some(snapshot) = self.snapshot.read().await.as_ref() {
            return Ok(snapshot.as_ref().clone());
        }

        let fresh = Arc::new(self.deps.services.list_visible().await?);
        *self.snapshot.write().await = Some(fresh.clone());
        Ok(fresh.as_ref().clone())
    }
}
