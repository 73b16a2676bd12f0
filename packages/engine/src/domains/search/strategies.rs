//! Search strategies: a table of pure scoring functions.
//!
//! Each strategy filters and orders an already-visible candidate set. Every
//! ordering ends its tie-break chain with the service id, so identical
//! inputs over unchanged data always produce identical output.

use chrono::{DateTime, Utc};

use crate::common::{EngineError, EngineResult, GeoPoint};
use crate::config::EngineConfig;
use crate::domains::search::query::SearchQuery;
use crate::domains::services::models::{OperatingStatus, Service};

/// Strategy selected by name at call time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    Text,
    Geographic,
    Category,
    Emergency,
    Availability,
    Smart,
}

impl Strategy {
    pub fn names() -> &'static [&'static str] {
        &[
            "text",
            "geographic",
            "category",
            "emergency",
            "availability",
            "smart",
        ]
    }

    /// Resolve a strategy name. Unknown names fail closed - there is no
    /// fallback strategy.
    pub fn parse(name: &str) -> EngineResult<Self> {
        match name {
            "text" => Ok(Strategy::Text),
            "geographic" => Ok(Strategy::Geographic),
            "category" => Ok(Strategy::Category),
            "emergency" => Ok(Strategy::Emergency),
            "availability" => Ok(Strategy::Availability),
            "smart" => Ok(Strategy::Smart),
            _ => Err(EngineError::Configuration(format!(
                "unknown search strategy '{}', available: {}",
                name,
                Strategy::names().join(", ")
            ))),
        }
    }
}

/// Inputs shared by every scoring function.
pub struct RankContext<'a> {
    pub query: &'a SearchQuery,
    pub config: &'a EngineConfig,
    pub now: DateTime<Utc>,
}

/// Run one strategy over the candidate set.
pub fn score_and_order(
    strategy: Strategy,
    candidates: Vec<Service>,
    ctx: &RankContext<'_>,
) -> EngineResult<Vec<Service>> {
    match strategy {
        Strategy::Text => Ok(text(candidates, ctx)),
        Strategy::Geographic => geographic(candidates, ctx),
        Strategy::Category => category(candidates, ctx),
        Strategy::Emergency => emergency(candidates, ctx),
        Strategy::Availability => Ok(availability(candidates, ctx)),
        Strategy::Smart => Ok(smart(candidates, ctx)),
    }
}

// =============================================================================
// Individual strategies
// =============================================================================

/// Case-insensitive substring match over name/description/tags; relevance is
/// the number of matched fields.
fn text(candidates: Vec<Service>, ctx: &RankContext<'_>) -> Vec<Service> {
    let needle = ctx
        .query
        .free_text
        .as_deref()
        .unwrap_or("")
        .trim()
        .to_lowercase();

    if needle.is_empty() {
        let mut all = candidates;
        sort_by_name_then_id(&mut all);
        return all;
    }

    let mut scored: Vec<(usize, Service)> = candidates
        .into_iter()
        .filter_map(|service| {
            let score = text_relevance(&service, &needle);
            (score > 0).then_some((score, service))
        })
        .collect();

    scored.sort_by(|a, b| {
        b.0.cmp(&a.0)
            .then_with(|| name_key(&a.1).cmp(&name_key(&b.1)))
            .then_with(|| a.1.id.cmp(&b.1.id))
    });

    scored.into_iter().map(|(_, service)| service).collect()
}

/// Distance-ordered; out-of-radius candidates are excluded before scoring.
fn geographic(candidates: Vec<Service>, ctx: &RankContext<'_>) -> EngineResult<Vec<Service>> {
    let user = require_location(ctx, "geographic")?;

    let mut hits: Vec<(f64, Service)> = candidates
        .into_iter()
        .filter_map(|service| {
            let distance = user.distance_km(&service.position);
            match ctx.query.max_distance_km {
                Some(radius) if distance > radius => None,
                _ => Some((distance, service)),
            }
        })
        .collect();

    sort_by_distance_then_id(&mut hits);
    Ok(hits.into_iter().map(|(_, service)| service).collect())
}

/// Exact category match, no scoring. Distance order when a location is
/// given, name order otherwise.
fn category(candidates: Vec<Service>, ctx: &RankContext<'_>) -> EngineResult<Vec<Service>> {
    let wanted = ctx.query.category.ok_or_else(|| {
        EngineError::Validation("category strategy requires a category".into())
    })?;

    let mut matches: Vec<Service> = candidates
        .into_iter()
        .filter(|service| service.category == wanted)
        .collect();

    match ctx.query.user_location {
        Some(user) => {
            let mut hits: Vec<(f64, Service)> = matches
                .into_iter()
                .map(|service| (user.distance_km(&service.position), service))
                .collect();
            sort_by_distance_then_id(&mut hits);
            Ok(hits.into_iter().map(|(_, service)| service).collect())
        }
        None => {
            sort_by_name_then_id(&mut matches);
            Ok(matches)
        }
    }
}

/// Emergency-eligible, open now, inside the radius; closest and least-full
/// first.
fn emergency(candidates: Vec<Service>, ctx: &RankContext<'_>) -> EngineResult<Vec<Service>> {
    let user = require_location(ctx, "emergency")?;
    let radius = ctx
        .query
        .max_distance_km
        .unwrap_or(ctx.config.emergency_radius_km);

    let mut hits: Vec<(f64, Service)> = candidates
        .into_iter()
        .filter(|service| service.is_emergency_service && service.is_open_now(ctx.now))
        .filter_map(|service| {
            let distance = user.distance_km(&service.position);
            (distance <= radius).then_some((distance, service))
        })
        .collect();

    hits.sort_by(|a, b| {
        a.0.total_cmp(&b.0)
            .then_with(|| a.1.capacity_ratio().total_cmp(&b.1.capacity_ratio()))
            .then_with(|| a.1.id.cmp(&b.1.id))
    });

    Ok(hits.into_iter().map(|(_, service)| service).collect())
}

/// Least-full first, excluding full services entirely.
fn availability(candidates: Vec<Service>, ctx: &RankContext<'_>) -> Vec<Service> {
    let mut open: Vec<Service> = candidates
        .into_iter()
        .filter(|service| service.operating_status != OperatingStatus::Full)
        .collect();

    let user = ctx.query.user_location;
    open.sort_by(|a, b| {
        a.capacity_ratio()
            .total_cmp(&b.capacity_ratio())
            .then_with(|| match user {
                Some(point) => point
                    .distance_km(&a.position)
                    .total_cmp(&point.distance_km(&b.position)),
                None => name_key(a).cmp(&name_key(b)),
            })
            .then_with(|| a.id.cmp(&b.id))
    });
    open
}

/// Weighted blend of normalized distance, text relevance, and availability.
/// Verified listings win ties.
fn smart(candidates: Vec<Service>, ctx: &RankContext<'_>) -> Vec<Service> {
    let needle = ctx
        .query
        .free_text
        .as_deref()
        .unwrap_or("")
        .trim()
        .to_lowercase();
    let user = ctx.query.user_location;

    // Text and radius act as filters first, like the dedicated strategies.
    let filtered: Vec<(f64, usize, Service)> = candidates
        .into_iter()
        .filter_map(|service| {
            let relevance = if needle.is_empty() {
                0
            } else {
                let r = text_relevance(&service, &needle);
                if r == 0 {
                    return None;
                }
                r
            };
            let distance = user
                .map(|point| point.distance_km(&service.position))
                .unwrap_or(0.0);
            if let (Some(radius), Some(_)) = (ctx.query.max_distance_km, user) {
                if distance > radius {
                    return None;
                }
            }
            Some((distance, relevance, service))
        })
        .collect();

    // Normalize distance against the furthest remaining candidate.
    let distance_norm = ctx.query.max_distance_km.unwrap_or_else(|| {
        filtered
            .iter()
            .map(|(d, _, _)| *d)
            .fold(0.0_f64, f64::max)
    });

    let (w_distance, w_text, w_availability) = ctx.config.smart_weights.normalized();

    let mut scored: Vec<(f64, Service)> = filtered
        .into_iter()
        .map(|(distance, relevance, service)| {
            let distance_score = if user.is_none() {
                0.5
            } else if distance_norm <= 0.0 {
                1.0
            } else {
                (1.0 - distance / distance_norm).clamp(0.0, 1.0)
            };
            let text_score = if needle.is_empty() {
                0.5
            } else {
                relevance as f64 / 3.0
            };
            let availability_score = availability_score(&service);

            let score = w_distance * distance_score
                + w_text * text_score
                + w_availability * availability_score;
            (score, service)
        })
        .collect();

    scored.sort_by(|a, b| {
        b.0.total_cmp(&a.0)
            .then_with(|| b.1.is_verified.cmp(&a.1.is_verified))
            .then_with(|| name_key(&a.1).cmp(&name_key(&b.1)))
            .then_with(|| a.1.id.cmp(&b.1.id))
    });

    scored.into_iter().map(|(_, service)| service).collect()
}

// =============================================================================
// Shared scoring helpers
// =============================================================================

/// Number of fields (name, description, tags) containing the needle.
fn text_relevance(service: &Service, needle: &str) -> usize {
    let mut matched = 0;
    if service.name.to_lowercase().contains(needle) {
        matched += 1;
    }
    if service.description.to_lowercase().contains(needle) {
        matched += 1;
    }
    if service
        .tags
        .iter()
        .any(|tag| tag.to_lowercase().contains(needle))
    {
        matched += 1;
    }
    matched
}

/// Remaining headroom as a 0..=1 score; closures score zero.
fn availability_score(service: &Service) -> f64 {
    match service.operating_status {
        OperatingStatus::Closed | OperatingStatus::TemporarilyClosed => 0.0,
        _ => (1.0 - service.capacity_ratio()).clamp(0.0, 1.0),
    }
}

fn require_location(ctx: &RankContext<'_>, strategy: &str) -> EngineResult<GeoPoint> {
    ctx.query.user_location.ok_or_else(|| {
        EngineError::Validation(format!("{strategy} strategy requires a user location"))
    })
}

fn name_key(service: &Service) -> String {
    service.name.to_lowercase()
}

fn sort_by_name_then_id(services: &mut [Service]) {
    services.sort_by(|a, b| name_key(a).cmp(&name_key(b)).then_with(|| a.id.cmp(&b.id)));
}

fn sort_by_distance_then_id(hits: &mut [(f64, Service)]) {
    hits.sort_by(|a, b| a.0.total_cmp(&b.0).then_with(|| a.1.id.cmp(&b.1.id)));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_known_strategies() {
        for name in Strategy::names() {
            assert!(Strategy::parse(name).is_ok());
        }
    }

    #[test]
    fn test_unknown_strategy_fails_closed() {
        let err = Strategy::parse("nearest").unwrap_err();
        assert!(matches!(err, EngineError::Configuration(_)));
    }
}
