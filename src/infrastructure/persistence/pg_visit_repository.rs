//! PostgreSQL implementation of visit repository.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use serde_json::Value;
use sqlx::PgPool;
use sqlx::types::Json;
use std::sync::Arc;

use crate::domain::entities::{
    DeviceInfo, GeoDescriptor, LocationReading, NewVisit, ReferrerInfo, Visit,
};
use crate::domain::repositories::{DailyCount, GroupCount, VisitField, VisitRepository};
use crate::error::AppError;

const VISIT_COLUMNS: &str = "id, link_id, public_ip, internal_ip, session_id, device, referrer, \
     headers, geo, photo_url, has_photo, location, has_location, created_at";

#[derive(sqlx::FromRow)]
struct VisitRow {
    id: i64,
    link_id: i64,
    public_ip: String,
    internal_ip: Option<String>,
    session_id: String,
    device: Json<DeviceInfo>,
    referrer: Json<ReferrerInfo>,
    headers: Value,
    geo: Option<Json<GeoDescriptor>>,
    photo_url: Option<String>,
    has_photo: bool,
    location: Option<Json<LocationReading>>,
    has_location: bool,
    created_at: DateTime<Utc>,
}

impl From<VisitRow> for Visit {
    fn from(row: VisitRow) -> Self {
        Visit {
            id: row.id,
            link_id: row.link_id,
            public_ip: row.public_ip,
            internal_ip: row.internal_ip,
            session_id: row.session_id,
            device: row.device.0,
            referrer: row.referrer.0,
            headers: row.headers,
            geo: row.geo.map(|g| g.0),
            photo_url: row.photo_url,
            has_photo: row.has_photo,
            location: row.location.map(|l| l.0),
            has_location: row.has_location,
            created_at: row.created_at,
        }
    }
}

#[derive(sqlx::FromRow)]
struct GroupRow {
    key: String,
    count: i64,
}

#[derive(sqlx::FromRow)]
struct DailyRow {
    day: NaiveDate,
    count: i64,
}

/// PostgreSQL repository for visit records and their aggregates.
///
/// Device and referrer types are also stored in plain text columns so the
/// breakdown queries can group without unpacking JSONB.
pub struct PgVisitRepository {
    pool: Arc<PgPool>,
}

impl PgVisitRepository {
    /// Creates a new repository with a database connection pool.
    pub fn new(pool: Arc<PgPool>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl VisitRepository for PgVisitRepository {
    async fn create(&self, new_visit: NewVisit) -> Result<Visit, AppError> {
        let persisted_at = Utc::now();
        let location = new_visit.location_at(persisted_at);

        let sql = format!(
            "INSERT INTO visits (
                link_id, public_ip, internal_ip, session_id,
                device, device_type, referrer, referrer_type,
                headers, geo, photo_url, has_photo, location, has_location, created_at
             )
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15)
             RETURNING {VISIT_COLUMNS}"
        );

        let row = sqlx::query_as::<_, VisitRow>(&sql)
            .bind(new_visit.link_id)
            .bind(&new_visit.public_ip)
            .bind(&new_visit.internal_ip)
            .bind(&new_visit.session_id)
            .bind(Json(&new_visit.device))
            .bind(new_visit.device.device_type.as_str())
            .bind(Json(&new_visit.referrer))
            .bind(new_visit.referrer.referrer_type.as_str())
            .bind(&new_visit.headers)
            .bind(new_visit.geo.as_ref().map(Json))
            .bind(&new_visit.photo_url)
            .bind(new_visit.has_photo())
            .bind(location.as_ref().map(Json))
            .bind(location.is_some())
            .bind(persisted_at)
            .fetch_one(self.pool.as_ref())
            .await?;

        Ok(row.into())
    }

    async fn count_by_links(&self, link_ids: &[i64]) -> Result<i64, AppError> {
        if link_ids.is_empty() {
            return Ok(0);
        }

        let count = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM visits WHERE link_id = ANY($1)",
        )
        .bind(link_ids)
        .fetch_one(self.pool.as_ref())
        .await?;

        Ok(count)
    }

    async fn distinct_public_ips_by_links(&self, link_ids: &[i64]) -> Result<i64, AppError> {
        if link_ids.is_empty() {
            return Ok(0);
        }

        let count = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(DISTINCT public_ip) FROM visits
             WHERE link_id = ANY($1) AND public_ip <> ''",
        )
        .bind(link_ids)
        .fetch_one(self.pool.as_ref())
        .await?;

        Ok(count)
    }

    async fn group_count_by(
        &self,
        field: VisitField,
        link_ids: &[i64],
        limit: Option<i64>,
    ) -> Result<Vec<GroupCount>, AppError> {
        if link_ids.is_empty() {
            return Ok(Vec::new());
        }

        // `sql_expr` is a closed set of static column expressions.
        let expr = field.sql_expr();
        let sql = format!(
            "SELECT {expr} AS key, COUNT(*) AS count
             FROM visits
             WHERE link_id = ANY($1) AND {expr} IS NOT NULL AND {expr} <> ''
             GROUP BY 1
             ORDER BY count DESC, key ASC
             LIMIT $2"
        );

        let rows = sqlx::query_as::<_, GroupRow>(&sql)
            .bind(link_ids)
            .bind(limit)
            .fetch_all(self.pool.as_ref())
            .await?;

        Ok(rows
            .into_iter()
            .map(|r| GroupCount {
                key: r.key,
                count: r.count,
            })
            .collect())
    }

    async fn paginate(
        &self,
        link_id: i64,
        offset: i64,
        limit: i64,
    ) -> Result<Vec<Visit>, AppError> {
        let sql = format!(
            "SELECT {VISIT_COLUMNS} FROM visits
             WHERE link_id = $1
             ORDER BY created_at DESC, id DESC
             LIMIT $2 OFFSET $3"
        );

        let rows = sqlx::query_as::<_, VisitRow>(&sql)
            .bind(link_id)
            .bind(limit)
            .bind(offset)
            .fetch_all(self.pool.as_ref())
            .await?;

        Ok(rows.into_iter().map(Visit::from).collect())
    }

    async fn daily_counts(
        &self,
        link_ids: &[i64],
        since: DateTime<Utc>,
    ) -> Result<Vec<DailyCount>, AppError> {
        if link_ids.is_empty() {
            return Ok(Vec::new());
        }

        let rows = sqlx::query_as::<_, DailyRow>(
            "SELECT (created_at AT TIME ZONE 'UTC')::date AS day, COUNT(*) AS count
             FROM visits
             WHERE link_id = ANY($1) AND created_at >= $2
             GROUP BY 1
             ORDER BY 1",
        )
        .bind(link_ids)
        .bind(since)
        .fetch_all(self.pool.as_ref())
        .await?;

        Ok(rows
            .into_iter()
            .map(|r| DailyCount {
                day: r.day,
                count: r.count,
            })
            .collect())
    }
}
