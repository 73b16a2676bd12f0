//! Postgres store implementation.
//!
//! Conditional writes use SELECT ... FOR UPDATE plus a version check inside
//! one transaction; the shared `apply_to` helper keeps field semantics
//! identical to the in-memory store. Radius queries prefilter with a lat/lng
//! bounding box and refine with haversine in Rust (no PostGIS).

use anyhow::{anyhow, bail, Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgPool, Postgres, Transaction};
use uuid::Uuid;

use crate::common::{BoundingBox, GeoPoint, ModerationId, ServiceId, SubscriptionId, UserId};
use crate::domains::moderation::models::{Decision, ModerationRecord};
use crate::domains::notifications::models::Subscription;
use crate::domains::services::models::{
    ChangeKind, OperatingHours, OperatingStatus, PublicationState, Service, ServiceCategory,
    ServiceDiff, StatusUpdateRecord,
};
use crate::kernel::store::{
    apply_to, CasResult, ModerationStore, ServiceMutation, ServiceStore, StatusLogStore,
    SubscriptionStore,
};

/// sqlx-backed implementation of all four store traits.
pub struct PgEngineStore {
    pool: PgPool,
}

impl PgEngineStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Run embedded migrations.
    pub async fn migrate(&self) -> Result<()> {
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .context("failed to run migrations")?;
        Ok(())
    }
}

// =============================================================================
// Row types
// =============================================================================

#[derive(sqlx::FromRow)]
struct ServiceRow {
    id: ServiceId,
    name: String,
    slug: String,
    description: String,
    tags: Vec<String>,
    category: String,
    latitude: f64,
    longitude: f64,
    is_emergency_service: bool,
    alert_radius_km: f64,
    hours: serde_json::Value,
    max_capacity: i64,
    current_capacity: i64,
    publication: String,
    is_active: bool,
    is_verified: bool,
    verified_by: Option<UserId>,
    verified_at: Option<DateTime<Utc>>,
    last_significant_edit: Option<DateTime<Utc>>,
    operating_status: String,
    status_is_manual: bool,
    stale: bool,
    last_capacity_update: DateTime<Utc>,
    manager_id: UserId,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    version: i64,
}

impl TryFrom<ServiceRow> for Service {
    type Error = anyhow::Error;

    fn try_from(row: ServiceRow) -> Result<Self> {
        Ok(Service {
            id: row.id,
            name: row.name,
            slug: row.slug,
            description: row.description,
            tags: row.tags,
            category: row.category.parse::<ServiceCategory>()?,
            position: GeoPoint {
                latitude: row.latitude,
                longitude: row.longitude,
            },
            is_emergency_service: row.is_emergency_service,
            alert_radius_km: row.alert_radius_km,
            hours: serde_json::from_value::<OperatingHours>(row.hours)
                .context("invalid hours payload")?,
            max_capacity: u32::try_from(row.max_capacity).context("max_capacity out of range")?,
            current_capacity: u32::try_from(row.current_capacity)
                .context("current_capacity out of range")?,
            publication: row.publication.parse::<PublicationState>()?,
            is_active: row.is_active,
            is_verified: row.is_verified,
            verified_by: row.verified_by,
            verified_at: row.verified_at,
            last_significant_edit: row.last_significant_edit,
            operating_status: row.operating_status.parse::<OperatingStatus>()?,
            status_is_manual: row.status_is_manual,
            stale: row.stale,
            last_capacity_update: row.last_capacity_update,
            manager_id: row.manager_id,
            created_at: row.created_at,
            updated_at: row.updated_at,
            version: row.version,
        })
    }
}

#[derive(sqlx::FromRow)]
struct ModerationRow {
    id: ModerationId,
    service_id: ServiceId,
    submitted_by: UserId,
    submitted_at: DateTime<Utc>,
    diff: serde_json::Value,
    reviewer_id: Option<UserId>,
    decision: Option<String>,
    reason: Option<String>,
    resolved_at: Option<DateTime<Utc>>,
}

impl TryFrom<ModerationRow> for ModerationRecord {
    type Error = anyhow::Error;

    fn try_from(row: ModerationRow) -> Result<Self> {
        Ok(ModerationRecord {
            id: row.id,
            service_id: row.service_id,
            submitted_by: row.submitted_by,
            submitted_at: row.submitted_at,
            diff: serde_json::from_value::<ServiceDiff>(row.diff)
                .context("invalid diff payload")?,
            reviewer_id: row.reviewer_id,
            decision: row
                .decision
                .map(|d| d.parse::<Decision>())
                .transpose()?,
            reason: row.reason,
            resolved_at: row.resolved_at,
        })
    }
}

#[derive(sqlx::FromRow)]
struct SubscriptionRow {
    id: SubscriptionId,
    subscriber_id: UserId,
    service_id: ServiceId,
    emergency_alerts: bool,
    latitude: Option<f64>,
    longitude: Option<f64>,
    created_at: DateTime<Utc>,
}

impl From<SubscriptionRow> for Subscription {
    fn from(row: SubscriptionRow) -> Self {
        let location = match (row.latitude, row.longitude) {
            (Some(latitude), Some(longitude)) => Some(GeoPoint {
                latitude,
                longitude,
            }),
            _ => None,
        };
        Subscription {
            id: row.id,
            subscriber_id: row.subscriber_id,
            service_id: row.service_id,
            emergency_alerts: row.emergency_alerts,
            location,
            created_at: row.created_at,
        }
    }
}

// =============================================================================
// ServiceStore
// =============================================================================

async fn write_service_row(
    tx: &mut Transaction<'_, Postgres>,
    service: &Service,
    insert: bool,
) -> Result<()> {
    let hours = serde_json::to_value(&service.hours)?;

    let sql = if insert {
        r#"
        INSERT INTO services (
            id, name, slug, description, tags, category,
            latitude, longitude, is_emergency_service, alert_radius_km, hours,
            max_capacity, current_capacity, publication, is_active,
            is_verified, verified_by, verified_at, last_significant_edit,
            operating_status, status_is_manual, stale, last_capacity_update,
            manager_id, created_at, updated_at, version
        ) VALUES (
            $1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14,
            $15, $16, $17, $18, $19, $20, $21, $22, $23, $24, $25, $26, $27
        )
        "#
    } else {
        r#"
        UPDATE services SET
            name = $2, slug = $3, description = $4, tags = $5, category = $6,
            latitude = $7, longitude = $8, is_emergency_service = $9,
            alert_radius_km = $10, hours = $11, max_capacity = $12,
            current_capacity = $13, publication = $14, is_active = $15,
            is_verified = $16, verified_by = $17, verified_at = $18,
            last_significant_edit = $19, operating_status = $20,
            status_is_manual = $21, stale = $22, last_capacity_update = $23,
            manager_id = $24, created_at = $25, updated_at = $26, version = $27
        WHERE id = $1
        "#
    };

    sqlx::query(sql)
        .bind(service.id)
        .bind(&service.name)
        .bind(&service.slug)
        .bind(&service.description)
        .bind(&service.tags)
        .bind(service.category.to_string())
        .bind(service.position.latitude)
        .bind(service.position.longitude)
        .bind(service.is_emergency_service)
        .bind(service.alert_radius_km)
        .bind(hours)
        .bind(service.max_capacity as i64)
        .bind(service.current_capacity as i64)
        .bind(service.publication.to_string())
        .bind(service.is_active)
        .bind(service.is_verified)
        .bind(service.verified_by)
        .bind(service.verified_at)
        .bind(service.last_significant_edit)
        .bind(service.operating_status.to_string())
        .bind(service.status_is_manual)
        .bind(service.stale)
        .bind(service.last_capacity_update)
        .bind(service.manager_id)
        .bind(service.created_at)
        .bind(service.updated_at)
        .bind(service.version)
        .execute(&mut **tx)
        .await?;

    Ok(())
}

#[async_trait]
impl ServiceStore for PgEngineStore {
    async fn get(&self, id: ServiceId) -> Result<Option<Service>> {
        let row = sqlx::query_as::<_, ServiceRow>("SELECT * FROM services WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        row.map(Service::try_from).transpose()
    }

    async fn insert(&self, service: Service) -> Result<()> {
        let mut tx = self.pool.begin().await?;
        write_service_row(&mut tx, &service, true).await?;
        tx.commit().await?;
        Ok(())
    }

    async fn apply(
        &self,
        id: ServiceId,
        mutation: ServiceMutation,
        expected_version: i64,
    ) -> Result<CasResult> {
        let mut tx = self.pool.begin().await?;

        let row =
            sqlx::query_as::<_, ServiceRow>("SELECT * FROM services WHERE id = $1 FOR UPDATE")
                .bind(id)
                .fetch_optional(&mut *tx)
                .await?
                .ok_or_else(|| anyhow!("service {} not found", id))?;

        let mut service = Service::try_from(row)?;
        if service.version != expected_version {
            return Ok(CasResult::VersionMismatch {
                current_version: service.version,
            });
        }

        apply_to(&mut service, &mutation, Utc::now());
        write_service_row(&mut tx, &service, false).await?;
        tx.commit().await?;

        Ok(CasResult::Applied(service))
    }

    async fn list_all(&self) -> Result<Vec<Service>> {
        let rows = sqlx::query_as::<_, ServiceRow>("SELECT * FROM services ORDER BY id")
            .fetch_all(&self.pool)
            .await?;
        rows.into_iter().map(Service::try_from).collect()
    }

    async fn list_visible(&self) -> Result<Vec<Service>> {
        let rows = sqlx::query_as::<_, ServiceRow>(
            "SELECT * FROM services
             WHERE publication = 'public' AND is_active
             ORDER BY id",
        )
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(Service::try_from).collect()
    }

    async fn find_within_radius(
        &self,
        center: GeoPoint,
        radius_km: f64,
    ) -> Result<Vec<(ServiceId, f64)>> {
        let bbox = BoundingBox::around(&center, radius_km);

        let rows: Vec<(Uuid, f64, f64)> = sqlx::query_as(
            "SELECT id, latitude, longitude FROM services
             WHERE latitude BETWEEN $1 AND $2
               AND longitude BETWEEN $3 AND $4",
        )
        .bind(bbox.min_lat)
        .bind(bbox.max_lat)
        .bind(bbox.min_lng)
        .bind(bbox.max_lng)
        .fetch_all(&self.pool)
        .await?;

        let mut hits: Vec<(ServiceId, f64)> = rows
            .into_iter()
            .filter_map(|(id, latitude, longitude)| {
                let distance = center.distance_km(&GeoPoint {
                    latitude,
                    longitude,
                });
                (distance <= radius_km).then_some((ServiceId::from_uuid(id), distance))
            })
            .collect();

        hits.sort_by(|a, b| a.1.total_cmp(&b.1).then_with(|| a.0.cmp(&b.0)));
        Ok(hits)
    }
}

// =============================================================================
// StatusLogStore
// =============================================================================

#[async_trait]
impl StatusLogStore for PgEngineStore {
    async fn append(&self, record: StatusUpdateRecord) -> Result<()> {
        let mut tx = self.pool.begin().await?;

        let last: Option<DateTime<Utc>> = sqlx::query_scalar(
            "SELECT MAX(recorded_at) FROM status_updates WHERE service_id = $1",
        )
        .bind(record.service_id)
        .fetch_one(&mut *tx)
        .await?;

        if let Some(last) = last {
            if record.recorded_at <= last {
                bail!(
                    "out-of-order status record for service {}: {} <= {}",
                    record.service_id,
                    record.recorded_at,
                    last
                );
            }
        }

        sqlx::query(
            r#"
            INSERT INTO status_updates (
                id, service_id, change, old_capacity, new_capacity,
                old_status, new_status, actor_id, note, recorded_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            "#,
        )
        .bind(record.id)
        .bind(record.service_id)
        .bind(record.change.to_string())
        .bind(record.old_capacity as i64)
        .bind(record.new_capacity as i64)
        .bind(record.old_status.to_string())
        .bind(record.new_status.to_string())
        .bind(record.actor_id)
        .bind(&record.note)
        .bind(record.recorded_at)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(())
    }

    async fn list_for_service(&self, service_id: ServiceId) -> Result<Vec<StatusUpdateRecord>> {
        #[derive(sqlx::FromRow)]
        struct UpdateRow {
            id: crate::common::UpdateId,
            service_id: ServiceId,
            change: String,
            old_capacity: i64,
            new_capacity: i64,
            old_status: String,
            new_status: String,
            actor_id: UserId,
            note: Option<String>,
            recorded_at: DateTime<Utc>,
        }

        let rows = sqlx::query_as::<_, UpdateRow>(
            "SELECT * FROM status_updates WHERE service_id = $1 ORDER BY recorded_at",
        )
        .bind(service_id)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter()
            .map(|row| {
                Ok(StatusUpdateRecord {
                    id: row.id,
                    service_id: row.service_id,
                    change: row.change.parse::<ChangeKind>()?,
                    old_capacity: u32::try_from(row.old_capacity)?,
                    new_capacity: u32::try_from(row.new_capacity)?,
                    old_status: row.old_status.parse::<OperatingStatus>()?,
                    new_status: row.new_status.parse::<OperatingStatus>()?,
                    actor_id: row.actor_id,
                    note: row.note,
                    recorded_at: row.recorded_at,
                })
            })
            .collect()
    }
}

// =============================================================================
// ModerationStore
// =============================================================================

#[async_trait]
impl ModerationStore for PgEngineStore {
    async fn insert(&self, record: ModerationRecord) -> Result<()> {
        let diff = serde_json::to_value(&record.diff)?;

        // The partial unique index on (service_id) WHERE decision IS NULL
        // turns a double-open into a constraint violation.
        sqlx::query(
            r#"
            INSERT INTO moderation_records (
                id, service_id, submitted_by, submitted_at, diff,
                reviewer_id, decision, reason, resolved_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            "#,
        )
        .bind(record.id)
        .bind(record.service_id)
        .bind(record.submitted_by)
        .bind(record.submitted_at)
        .bind(diff)
        .bind(record.reviewer_id)
        .bind(record.decision.map(|d| d.to_string()))
        .bind(&record.reason)
        .bind(record.resolved_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn get(&self, id: ModerationId) -> Result<Option<ModerationRecord>> {
        let row =
            sqlx::query_as::<_, ModerationRow>("SELECT * FROM moderation_records WHERE id = $1")
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;
        row.map(ModerationRecord::try_from).transpose()
    }

    async fn find_open_for_service(
        &self,
        service_id: ServiceId,
    ) -> Result<Option<ModerationRecord>> {
        let row = sqlx::query_as::<_, ModerationRow>(
            "SELECT * FROM moderation_records
             WHERE service_id = $1 AND decision IS NULL",
        )
        .bind(service_id)
        .fetch_optional(&self.pool)
        .await?;
        row.map(ModerationRecord::try_from).transpose()
    }

    async fn mark_resolved(
        &self,
        id: ModerationId,
        reviewer: UserId,
        decision: Decision,
        reason: Option<String>,
        resolved_at: DateTime<Utc>,
    ) -> Result<ModerationRecord> {
        let row = sqlx::query_as::<_, ModerationRow>(
            r#"
            UPDATE moderation_records
            SET reviewer_id = $2, decision = $3, reason = $4, resolved_at = $5
            WHERE id = $1 AND decision IS NULL
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(reviewer)
        .bind(decision.to_string())
        .bind(&reason)
        .bind(resolved_at)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| anyhow!("moderation record {} not found or already resolved", id))?;

        ModerationRecord::try_from(row)
    }

    async fn list_open(&self) -> Result<Vec<ModerationRecord>> {
        let rows = sqlx::query_as::<_, ModerationRow>(
            "SELECT * FROM moderation_records WHERE decision IS NULL ORDER BY submitted_at",
        )
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(ModerationRecord::try_from).collect()
    }
}

// =============================================================================
// SubscriptionStore
// =============================================================================

#[async_trait]
impl SubscriptionStore for PgEngineStore {
    async fn upsert(&self, subscription: Subscription) -> Result<Subscription> {
        let row = sqlx::query_as::<_, SubscriptionRow>(
            r#"
            INSERT INTO subscriptions (
                id, subscriber_id, service_id, emergency_alerts,
                latitude, longitude, created_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7)
            ON CONFLICT (subscriber_id, service_id) DO UPDATE
                SET emergency_alerts = EXCLUDED.emergency_alerts,
                    latitude = EXCLUDED.latitude,
                    longitude = EXCLUDED.longitude
            RETURNING *
            "#,
        )
        .bind(subscription.id)
        .bind(subscription.subscriber_id)
        .bind(subscription.service_id)
        .bind(subscription.emergency_alerts)
        .bind(subscription.location.map(|p| p.latitude))
        .bind(subscription.location.map(|p| p.longitude))
        .bind(subscription.created_at)
        .fetch_one(&self.pool)
        .await?;

        Ok(row.into())
    }

    async fn remove(&self, subscriber_id: UserId, service_id: ServiceId) -> Result<bool> {
        let result =
            sqlx::query("DELETE FROM subscriptions WHERE subscriber_id = $1 AND service_id = $2")
                .bind(subscriber_id)
                .bind(service_id)
                .execute(&self.pool)
                .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn remove_all_for_subscriber(&self, subscriber_id: UserId) -> Result<u64> {
        let result = sqlx::query("DELETE FROM subscriptions WHERE subscriber_id = $1")
            .bind(subscriber_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }

    async fn find(
        &self,
        subscriber_id: UserId,
        service_id: ServiceId,
    ) -> Result<Option<Subscription>> {
        let row = sqlx::query_as::<_, SubscriptionRow>(
            "SELECT * FROM subscriptions WHERE subscriber_id = $1 AND service_id = $2",
        )
        .bind(subscriber_id)
        .bind(service_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(Into::into))
    }

    async fn list_for_service(&self, service_id: ServiceId) -> Result<Vec<Subscription>> {
        let rows = sqlx::query_as::<_, SubscriptionRow>(
            "SELECT * FROM subscriptions WHERE service_id = $1 ORDER BY id",
        )
        .bind(service_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn list_emergency_opt_ins(&self) -> Result<Vec<Subscription>> {
        let rows = sqlx::query_as::<_, SubscriptionRow>(
            "SELECT * FROM subscriptions WHERE emergency_alerts ORDER BY id",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(Into::into).collect())
    }
}
