//! SearchEngine behavior: visibility, strategy semantics, determinism.

mod common;

use common::TestHarness;
use engine_core::common::{EngineError, GeoPoint, ServiceId};
use engine_core::domains::search::query::SearchQuery;
use engine_core::domains::services::models::{Service, ServiceCategory};
use engine_core::domains::status::engine::SubmitStatusUpdate;

fn ids(services: &[Service]) -> Vec<ServiceId> {
    services.iter().map(|service| service.id).collect()
}

// ============================================================================
// Strategy resolution and validation
// ============================================================================

#[tokio::test]
async fn unknown_strategy_fails_closed() {
    let harness = TestHarness::new();
    let query = SearchQuery::builder().strategy("nearest").build();
    let err = harness.engine.search(&query).await.unwrap_err();
    assert!(matches!(err, EngineError::Configuration(_)));
}

#[tokio::test]
async fn location_strategies_require_a_location() {
    let harness = TestHarness::new();
    for strategy in ["geographic", "emergency"] {
        let query = SearchQuery::builder().strategy(strategy).build();
        let err = harness.engine.search(&query).await.unwrap_err();
        assert!(matches!(err, EngineError::Validation(_)), "{strategy}");
    }
}

// ============================================================================
// Visibility predicate
// ============================================================================

#[tokio::test]
async fn drafts_and_pending_listings_are_invisible() {
    let harness = TestHarness::new();
    let manager = TestHarness::manager();

    harness
        .seed_draft(
            TestHarness::listing("Draft Pantry", ServiceCategory::Food, 40.0, -74.0, manager),
            manager,
        )
        .await;
    harness
        .seed_public(
            TestHarness::listing("Public Pantry", ServiceCategory::Food, 40.0, -74.0, manager),
            manager,
        )
        .await;

    let query = SearchQuery::builder().strategy("text").build();
    let results = harness.engine.search(&query).await.unwrap();
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].name, "Public Pantry");
}

// ============================================================================
// Text strategy
// ============================================================================

#[tokio::test]
async fn text_relevance_counts_matched_fields() {
    let harness = TestHarness::new();
    let manager = TestHarness::manager();

    // "meals" appears in name, description, and tags
    let mut triple = TestHarness::listing("Meals on Main", ServiceCategory::Food, 40.0, -74.0, manager);
    triple.description = "Free hot meals daily".into();
    triple.tags = vec!["meals".into()];
    harness.seed_public(triple, manager).await;

    // "meals" appears in the description only
    let mut single =
        TestHarness::listing("Community Table", ServiceCategory::Food, 40.0, -74.0, manager);
    single.description = "Warm meals for families".into();
    harness.seed_public(single, manager).await;

    // No match at all
    harness
        .seed_public(
            TestHarness::listing("Legal Desk", ServiceCategory::Legal, 40.0, -74.0, manager),
            manager,
        )
        .await;

    let query = SearchQuery::builder()
        .strategy("text")
        .free_text("MEALS")
        .build();
    let results = harness.engine.search(&query).await.unwrap();

    assert_eq!(results.len(), 2);
    assert_eq!(results[0].name, "Meals on Main");
    assert_eq!(results[1].name, "Community Table");
}

// ============================================================================
// Geographic strategy
// ============================================================================

#[tokio::test]
async fn geographic_orders_by_distance_and_respects_the_radius() {
    let harness = TestHarness::new();
    let manager = TestHarness::manager();

    // ~2 km, ~8 km, and ~30 km north of the user
    let near = harness
        .seed_public(
            TestHarness::listing("Near Shelter", ServiceCategory::Shelter, 40.018, -74.0, manager),
            manager,
        )
        .await;
    let mid = harness
        .seed_public(
            TestHarness::listing("Mid Shelter", ServiceCategory::Shelter, 40.072, -74.0, manager),
            manager,
        )
        .await;
    harness
        .seed_public(
            TestHarness::listing("Far Shelter", ServiceCategory::Shelter, 40.27, -74.0, manager),
            manager,
        )
        .await;

    let user = GeoPoint::new(40.0, -74.0).unwrap();

    let query = SearchQuery::builder()
        .strategy("geographic")
        .user_location(user)
        .max_distance_km(10.0)
        .build();
    let results = harness.engine.search(&query).await.unwrap();

    assert_eq!(ids(&results), vec![near.id, mid.id]);
    for service in &results {
        assert!(user.distance_km(&service.position) <= 10.0);
    }
}

// ============================================================================
// Category strategy
// ============================================================================

#[tokio::test]
async fn category_matches_exactly_and_orders_by_name_without_location() {
    let harness = TestHarness::new();
    let manager = TestHarness::manager();

    harness
        .seed_public(
            TestHarness::listing("Zeta Clinic", ServiceCategory::Healthcare, 40.0, -74.0, manager),
            manager,
        )
        .await;
    harness
        .seed_public(
            TestHarness::listing("Alpha Clinic", ServiceCategory::Healthcare, 41.0, -74.0, manager),
            manager,
        )
        .await;
    harness
        .seed_public(
            TestHarness::listing("Bread Line", ServiceCategory::Food, 40.0, -74.0, manager),
            manager,
        )
        .await;

    let query = SearchQuery::builder()
        .strategy("category")
        .category(ServiceCategory::Healthcare)
        .build();
    let results = harness.engine.search(&query).await.unwrap();

    let names: Vec<&str> = results.iter().map(|s| s.name.as_str()).collect();
    assert_eq!(names, vec!["Alpha Clinic", "Zeta Clinic"]);
}

// ============================================================================
// Emergency strategy
// ============================================================================

#[tokio::test]
async fn emergency_returns_only_open_eligible_services_in_radius() {
    let harness = TestHarness::new();
    let manager = TestHarness::manager();

    // Shelters default to emergency-eligible and 24/7
    let near = harness
        .seed_public(
            TestHarness::listing("Near Refuge", ServiceCategory::Shelter, 40.018, -74.0, manager),
            manager,
        )
        .await;
    harness
        .seed_public(
            TestHarness::listing("Far Refuge", ServiceCategory::Shelter, 40.072, -74.0, manager),
            manager,
        )
        .await;

    // Inside the radius but not emergency-eligible
    let mut pantry =
        TestHarness::listing("Close Pantry", ServiceCategory::Food, 40.01, -74.0, manager);
    pantry.is_emergency_service = Some(false);
    harness.seed_public(pantry, manager).await;

    // Default radius is 5 km: the 8 km shelter is excluded
    let query = SearchQuery::builder()
        .strategy("emergency")
        .user_location(GeoPoint::new(40.0, -74.0).unwrap())
        .build();
    let results = harness.engine.search(&query).await.unwrap();

    assert_eq!(ids(&results), vec![near.id]);
}

#[tokio::test]
async fn emergency_prefers_less_full_services_at_equal_distance() {
    let harness = TestHarness::new();
    let manager = TestHarness::manager();

    let fuller = harness
        .seed_public(
            TestHarness::listing("East Refuge", ServiceCategory::Shelter, 40.018, -74.0, manager),
            manager,
        )
        .await;
    let emptier = harness
        .seed_public(
            TestHarness::listing("West Refuge", ServiceCategory::Shelter, 40.018, -74.0, manager),
            manager,
        )
        .await;

    harness
        .engine
        .submit_status_update(manager, SubmitStatusUpdate::capacity(fuller.id, 8))
        .await
        .unwrap();
    harness
        .engine
        .submit_status_update(manager, SubmitStatusUpdate::capacity(emptier.id, 2))
        .await
        .unwrap();
    harness.engine.settle().await;

    let query = SearchQuery::builder()
        .strategy("emergency")
        .user_location(GeoPoint::new(40.0, -74.0).unwrap())
        .build();
    let results = harness.engine.search(&query).await.unwrap();

    assert_eq!(ids(&results), vec![emptier.id, fuller.id]);
}

// ============================================================================
// Availability strategy
// ============================================================================

#[tokio::test]
async fn availability_excludes_full_and_orders_by_headroom() {
    let harness = TestHarness::new();
    let manager = TestHarness::manager();

    let busy = harness
        .seed_public(
            TestHarness::listing("Busy House", ServiceCategory::Shelter, 40.0, -74.0, manager),
            manager,
        )
        .await;
    let quiet = harness
        .seed_public(
            TestHarness::listing("Quiet House", ServiceCategory::Shelter, 40.0, -74.0, manager),
            manager,
        )
        .await;
    let full = harness
        .seed_public(
            TestHarness::listing("Full House", ServiceCategory::Shelter, 40.0, -74.0, manager),
            manager,
        )
        .await;

    for (service, capacity) in [(&busy, 8), (&quiet, 1), (&full, 10)] {
        harness
            .engine
            .submit_status_update(manager, SubmitStatusUpdate::capacity(service.id, capacity))
            .await
            .unwrap();
    }
    harness.engine.settle().await;

    let query = SearchQuery::builder().strategy("availability").build();
    let results = harness.engine.search(&query).await.unwrap();

    assert_eq!(ids(&results), vec![quiet.id, busy.id]);
}

// ============================================================================
// Smart strategy
// ============================================================================

#[tokio::test]
async fn smart_blends_text_distance_and_availability() {
    let harness = TestHarness::new();
    let manager = TestHarness::manager();

    // Matching, close, and empty: should rank first
    let mut best =
        TestHarness::listing("Meal Hub North", ServiceCategory::Food, 40.01, -74.0, manager);
    best.description = "meals and groceries".into();
    let best = harness.seed_public(best, manager).await;

    // Matching but farther and fuller
    let mut worse =
        TestHarness::listing("Meal Hub South", ServiceCategory::Food, 40.2, -74.0, manager);
    worse.description = "meals".into();
    let worse = harness.seed_public(worse, manager).await;
    harness
        .engine
        .submit_status_update(manager, SubmitStatusUpdate::capacity(worse.id, 9))
        .await
        .unwrap();

    // No text match: filtered out entirely
    harness
        .seed_public(
            TestHarness::listing("Legal Aid Desk", ServiceCategory::Legal, 40.0, -74.0, manager),
            manager,
        )
        .await;
    harness.engine.settle().await;

    let query = SearchQuery::builder()
        .strategy("smart")
        .free_text("meal")
        .user_location(GeoPoint::new(40.0, -74.0).unwrap())
        .build();
    let results = harness.engine.search(&query).await.unwrap();

    assert_eq!(ids(&results), vec![best.id, worse.id]);
}

// ============================================================================
// Determinism
// ============================================================================

#[tokio::test]
async fn identical_queries_return_identical_orderings() {
    let harness = TestHarness::new();
    let manager = TestHarness::manager();

    for (name, lat) in [
        ("Site A", 40.01),
        ("Site B", 40.02),
        ("Site C", 40.03),
        ("Site D", 40.04),
    ] {
        harness
            .seed_public(
                TestHarness::listing(name, ServiceCategory::Social, lat, -74.0, manager),
                manager,
            )
            .await;
    }

    for strategy in ["text", "availability", "smart"] {
        let query = SearchQuery::builder().strategy(strategy).build();
        let first = ids(&harness.engine.search(&query).await.unwrap());
        let second = ids(&harness.engine.search(&query).await.unwrap());
        assert_eq!(first, second, "{strategy} ordering must be stable");
        assert_eq!(first.len(), 4);
    }

    let query = SearchQuery::builder()
        .strategy("geographic")
        .user_location(GeoPoint::new(40.0, -74.0).unwrap())
        .build();
    let first = ids(&harness.engine.search(&query).await.unwrap());
    let second = ids(&harness.engine.search(&query).await.unwrap());
    assert_eq!(first, second);
}

// ============================================================================
// Snapshot invalidation
// ============================================================================

#[tokio::test]
async fn search_sees_capacity_changes_after_events_settle() {
    let harness = TestHarness::new();
    let manager = TestHarness::manager();
    let service = harness
        .seed_public(
            TestHarness::listing("Live Counts", ServiceCategory::Shelter, 40.0, -74.0, manager),
            manager,
        )
        .await;

    let query = SearchQuery::builder().strategy("availability").build();
    assert_eq!(harness.engine.search(&query).await.unwrap().len(), 1);

    harness
        .engine
        .submit_status_update(manager, SubmitStatusUpdate::capacity(service.id, 10))
        .await
        .unwrap();
    harness.engine.settle().await;

    // Now full, so the availability strategy drops it
    assert!(harness.engine.search(&query).await.unwrap().is_empty());
}
