//! StatusEngine behavior: derived-status thresholds, validation,
//! authorization, cadence, conditional writes, and the audit log.

mod common;

use chrono::{Duration, Utc};

use common::TestHarness;
use engine_core::common::EngineError;
use engine_core::config::EngineConfig;
use engine_core::domains::services::factory::build_service;
use engine_core::domains::services::models::{ChangeKind, OperatingStatus, ServiceCategory};
use engine_core::domains::status::engine::SubmitStatusUpdate;
use engine_core::kernel::ServiceStore;

// ============================================================================
// Derived status thresholds
// ============================================================================

#[tokio::test]
async fn capacity_updates_follow_threshold_table() {
    let harness = TestHarness::new();
    let manager = TestHarness::manager();
    let service = harness
        .seed_public(
            TestHarness::listing("Downtown Shelter", ServiceCategory::Shelter, 40.0, -74.0, manager),
            manager,
        )
        .await;
    assert_eq!(service.max_capacity, 10);

    let accepted = harness
        .engine
        .submit_status_update(manager, SubmitStatusUpdate::capacity(service.id, 9))
        .await
        .unwrap();
    assert_eq!(accepted.service.operating_status, OperatingStatus::NearCapacity);

    let accepted = harness
        .engine
        .submit_status_update(manager, SubmitStatusUpdate::capacity(service.id, 10))
        .await
        .unwrap();
    assert_eq!(accepted.service.operating_status, OperatingStatus::Full);

    let accepted = harness
        .engine
        .submit_status_update(manager, SubmitStatusUpdate::capacity(service.id, 5))
        .await
        .unwrap();
    assert_eq!(accepted.service.operating_status, OperatingStatus::Open);
}

#[tokio::test]
async fn over_capacity_is_representable_and_full() {
    let harness = TestHarness::new();
    let manager = TestHarness::manager();
    let service = harness
        .seed_public(
            TestHarness::listing("Food Line", ServiceCategory::Food, 40.0, -74.0, manager),
            manager,
        )
        .await;

    let accepted = harness
        .engine
        .submit_status_update(manager, SubmitStatusUpdate::capacity(service.id, 14))
        .await
        .unwrap();
    assert_eq!(accepted.service.current_capacity, 14);
    assert_eq!(accepted.service.operating_status, OperatingStatus::Full);
}

#[tokio::test]
async fn explicit_status_latches_until_next_capacity_update() {
    let harness = TestHarness::new();
    let manager = TestHarness::manager();
    let service = harness
        .seed_public(
            TestHarness::listing("Legal Clinic", ServiceCategory::Legal, 40.0, -74.0, manager),
            manager,
        )
        .await;

    let accepted = harness
        .engine
        .submit_status_update(
            manager,
            SubmitStatusUpdate::status(service.id, OperatingStatus::TemporarilyClosed),
        )
        .await
        .unwrap();
    assert_eq!(
        accepted.service.operating_status,
        OperatingStatus::TemporarilyClosed
    );
    assert!(accepted.service.status_is_manual);
    assert_eq!(accepted.record.change, ChangeKind::OperatingStatus);

    // The next capacity update reverts to the derived status
    let accepted = harness
        .engine
        .submit_status_update(manager, SubmitStatusUpdate::capacity(service.id, 2))
        .await
        .unwrap();
    assert_eq!(accepted.service.operating_status, OperatingStatus::Open);
    assert!(!accepted.service.status_is_manual);
}

// ============================================================================
// Validation and authorization
// ============================================================================

#[tokio::test]
async fn rejects_empty_and_negative_updates() {
    let harness = TestHarness::new();
    let manager = TestHarness::manager();
    let service = harness
        .seed_public(
            TestHarness::listing("Job Center", ServiceCategory::Employment, 40.0, -74.0, manager),
            manager,
        )
        .await;

    let empty = SubmitStatusUpdate {
        service_id: service.id,
        new_capacity: None,
        new_status: None,
        note: None,
        expected_version: None,
    };
    let err = harness
        .engine
        .submit_status_update(manager, empty)
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::Validation(_)));

    let err = harness
        .engine
        .submit_status_update(manager, SubmitStatusUpdate::capacity(service.id, -1))
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::Validation(_)));
}

#[tokio::test]
async fn only_the_manager_or_admin_may_update() {
    let harness = TestHarness::new();
    let manager = TestHarness::manager();
    let service = harness
        .seed_public(
            TestHarness::listing("Night Shelter", ServiceCategory::Shelter, 40.0, -74.0, manager),
            manager,
        )
        .await;

    let stranger = TestHarness::manager();
    let err = harness
        .engine
        .submit_status_update(stranger, SubmitStatusUpdate::capacity(service.id, 3))
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::Authorization(_)));

    // Admin override is allowed
    harness
        .engine
        .submit_status_update(harness.admin, SubmitStatusUpdate::capacity(service.id, 3))
        .await
        .unwrap();
}

// ============================================================================
// Cadence
// ============================================================================

#[tokio::test]
async fn routine_pings_are_rate_limited_when_a_floor_is_configured() {
    let config = EngineConfig {
        min_update_interval: Some(Duration::minutes(10)),
        ..EngineConfig::default()
    };
    let harness = TestHarness::with_config(config);
    let manager = TestHarness::manager();
    let service = harness
        .seed_public(
            TestHarness::listing("Warm Meals", ServiceCategory::Food, 40.0, -74.0, manager),
            manager,
        )
        .await;

    // Crosses a band: allowed regardless of cadence
    harness
        .engine
        .submit_status_update(manager, SubmitStatusUpdate::capacity(service.id, 9))
        .await
        .unwrap();

    // Same capacity again: nothing observable changes, inside the floor
    let err = harness
        .engine
        .submit_status_update(manager, SubmitStatusUpdate::capacity(service.id, 9))
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::RateLimited(_)));

    // Another band crossing is still allowed
    harness
        .engine
        .submit_status_update(manager, SubmitStatusUpdate::capacity(service.id, 10))
        .await
        .unwrap();
}

#[tokio::test]
async fn no_floor_is_enforced_by_default() {
    let harness = TestHarness::new();
    let manager = TestHarness::manager();
    let service = harness
        .seed_public(
            TestHarness::listing("Drop-in Center", ServiceCategory::Social, 40.0, -74.0, manager),
            manager,
        )
        .await;

    for _ in 0..3 {
        harness
            .engine
            .submit_status_update(manager, SubmitStatusUpdate::capacity(service.id, 4))
            .await
            .unwrap();
    }
}

// ============================================================================
// Conditional writes
// ============================================================================

#[tokio::test]
async fn same_version_writers_conflict_exactly_once() {
    let harness = TestHarness::new();
    let manager = TestHarness::manager();
    let service = harness
        .seed_public(
            TestHarness::listing("Bed Registry", ServiceCategory::Shelter, 40.0, -74.0, manager),
            manager,
        )
        .await;

    let version = service.version;

    let mut first = SubmitStatusUpdate::capacity(service.id, 6);
    first.expected_version = Some(version);
    let mut second = SubmitStatusUpdate::capacity(service.id, 7);
    second.expected_version = Some(version);

    let (a, b) = tokio::join!(
        harness.engine.submit_status_update(manager, first),
        harness.engine.submit_status_update(manager, second),
    );

    let outcomes = [a.is_ok(), b.is_ok()];
    assert_eq!(outcomes.iter().filter(|ok| **ok).count(), 1);

    let loser = if a.is_err() { a.unwrap_err() } else { b.unwrap_err() };
    assert!(matches!(loser, EngineError::ConcurrencyConflict { .. }));
}

#[tokio::test]
async fn writers_without_a_pinned_version_retry_and_serialize() {
    let harness = TestHarness::new();
    let manager = TestHarness::manager();
    let service = harness
        .seed_public(
            TestHarness::listing("Clinic Queue", ServiceCategory::Healthcare, 40.0, -74.0, manager),
            manager,
        )
        .await;

    let (a, b) = tokio::join!(
        harness
            .engine
            .submit_status_update(manager, SubmitStatusUpdate::capacity(service.id, 6)),
        harness
            .engine
            .submit_status_update(manager, SubmitStatusUpdate::capacity(service.id, 7)),
    );
    a.unwrap();
    b.unwrap();

    let history = harness.engine.status_history(service.id).await.unwrap();
    assert_eq!(history.len(), 2);
    assert!(history[0].recorded_at < history[1].recorded_at);
}

// ============================================================================
// Audit log
// ============================================================================

#[tokio::test]
async fn every_accepted_update_appends_one_monotonic_record() {
    let harness = TestHarness::new();
    let manager = TestHarness::manager();
    let service = harness
        .seed_public(
            TestHarness::listing("Transit Aid", ServiceCategory::Transportation, 40.0, -74.0, manager),
            manager,
        )
        .await;

    for capacity in [2, 9, 10, 1] {
        harness
            .engine
            .submit_status_update(
                manager,
                SubmitStatusUpdate::capacity(service.id, capacity),
            )
            .await
            .unwrap();
    }

    let history = harness.engine.status_history(service.id).await.unwrap();
    assert_eq!(history.len(), 4);
    for pair in history.windows(2) {
        assert!(pair[0].recorded_at < pair[1].recorded_at);
    }
    assert_eq!(history[1].old_capacity, 2);
    assert_eq!(history[1].new_capacity, 9);
    assert_eq!(history[1].new_status, OperatingStatus::NearCapacity);
}

// ============================================================================
// Staleness sweep
// ============================================================================

#[tokio::test]
async fn sweep_flags_silent_services_only() {
    let harness = TestHarness::new();
    let manager = TestHarness::manager();

    // Insert listings whose last update is in the past
    let quiet = build_service(
        TestHarness::listing("Quiet Shelter", ServiceCategory::Shelter, 40.0, -74.0, manager),
        5.0,
        Utc::now() - Duration::hours(13),
    )
    .unwrap();
    let recent = build_service(
        TestHarness::listing("Active Shelter", ServiceCategory::Shelter, 41.0, -74.0, manager),
        5.0,
        Utc::now() - Duration::hours(11),
    )
    .unwrap();
    harness.deps.services.insert(quiet.clone()).await.unwrap();
    harness.deps.services.insert(recent.clone()).await.unwrap();

    let flagged = harness.engine.run_stale_sweep().await.unwrap();
    assert_eq!(flagged, 1);

    let quiet = harness.deps.services.get(quiet.id).await.unwrap().unwrap();
    let recent = harness.deps.services.get(recent.id).await.unwrap().unwrap();
    assert!(quiet.stale);
    assert!(!recent.stale);

    // The manager gets a reminder
    harness.engine.settle().await;
    assert!(harness.delivery.was_notified(manager.id));

    // An accepted update clears the flag
    harness
        .engine
        .submit_status_update(manager, SubmitStatusUpdate::capacity(quiet.id, 1))
        .await
        .unwrap();
    let cleared = harness.deps.services.get(quiet.id).await.unwrap().unwrap();
    assert!(!cleared.stale);
}
