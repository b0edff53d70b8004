//! PostgreSQL implementation of link repository.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::json;
use sqlx::PgPool;
use std::sync::Arc;

use crate::domain::entities::{Link, LinkPatch, NewLink};
use crate::domain::repositories::LinkRepository;
use crate::error::AppError;

const LINK_COLUMNS: &str = "id, code, destination, domain, owner_id, camera_enabled, \
     location_enabled, click_count, is_active, created_at, updated_at";

#[derive(sqlx::FromRow)]
struct LinkRow {
    id: i64,
    code: String,
    destination: String,
    domain: Option<String>,
    owner_id: i64,
    camera_enabled: bool,
    location_enabled: bool,
    click_count: i64,
    is_active: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<LinkRow> for Link {
    fn from(row: LinkRow) -> Self {
        Link {
            id: row.id,
            code: row.code,
            destination: row.destination,
            domain: row.domain,
            owner_id: row.owner_id,
            camera_enabled: row.camera_enabled,
            location_enabled: row.location_enabled,
            click_count: row.click_count,
            is_active: row.is_active,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

/// PostgreSQL repository for link storage and retrieval.
///
/// Short-code uniqueness is enforced by the `links_code_key` constraint, so a
/// duplicate insert surfaces as [`AppError::Conflict`].
pub struct PgLinkRepository {
    pool: Arc<PgPool>,
}

impl PgLinkRepository {
    /// Creates a new repository with a database connection pool.
    pub fn new(pool: Arc<PgPool>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl LinkRepository for PgLinkRepository {
    async fn create(&self, new_link: NewLink) -> Result<Link, AppError> {
        let sql = format!(
            "INSERT INTO links (code, destination, domain, owner_id, camera_enabled, location_enabled)
             VALUES ($1, $2, $3, $4, $5, $6)
             RETURNING {LINK_COLUMNS}"
        );

        let row = sqlx::query_as::<_, LinkRow>(&sql)
            .bind(&new_link.code)
            .bind(&new_link.destination)
            .bind(&new_link.domain)
            .bind(new_link.owner_id)
            .bind(new_link.camera_enabled)
            .bind(new_link.location_enabled)
            .fetch_one(self.pool.as_ref())
            .await?;

        Ok(row.into())
    }

    async fn find_by_code(&self, code: &str) -> Result<Option<Link>, AppError> {
        let sql = format!("SELECT {LINK_COLUMNS} FROM links WHERE code = $1");

        let row = sqlx::query_as::<_, LinkRow>(&sql)
            .bind(code)
            .fetch_optional(self.pool.as_ref())
            .await?;

        Ok(row.map(Link::from))
    }

    async fn find_by_id(&self, id: i64) -> Result<Option<Link>, AppError> {
        let sql = format!("SELECT {LINK_COLUMNS} FROM links WHERE id = $1");

        let row = sqlx::query_as::<_, LinkRow>(&sql)
            .bind(id)
            .fetch_optional(self.pool.as_ref())
            .await?;

        Ok(row.map(Link::from))
    }

    async fn list_by_owner(&self, owner_id: i64) -> Result<Vec<Link>, AppError> {
        let sql = format!(
            "SELECT {LINK_COLUMNS} FROM links WHERE owner_id = $1 ORDER BY created_at DESC, id DESC"
        );

        let rows = sqlx::query_as::<_, LinkRow>(&sql)
            .bind(owner_id)
            .fetch_all(self.pool.as_ref())
            .await?;

        Ok(rows.into_iter().map(Link::from).collect())
    }

    async fn increment_clicks(&self, id: i64) -> Result<(), AppError> {
        // Single statement, so concurrent increments never lose updates.
        let result = sqlx::query(
            "UPDATE links SET click_count = click_count + 1, updated_at = NOW() WHERE id = $1",
        )
        .bind(id)
        .execute(self.pool.as_ref())
        .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::not_found(
                "Link not found",
                json!({ "link_id": id }),
            ));
        }

        Ok(())
    }

    async fn update(&self, id: i64, patch: LinkPatch) -> Result<Link, AppError> {
        let sql = format!(
            "UPDATE links SET
                destination = COALESCE($2, destination),
                camera_enabled = COALESCE($3, camera_enabled),
                location_enabled = COALESCE($4, location_enabled),
                is_active = COALESCE($5, is_active),
                updated_at = NOW()
             WHERE id = $1
             RETURNING {LINK_COLUMNS}"
        );

        let row = sqlx::query_as::<_, LinkRow>(&sql)
            .bind(id)
            .bind(&patch.destination)
            .bind(patch.camera_enabled)
            .bind(patch.location_enabled)
            .bind(patch.is_active)
            .fetch_optional(self.pool.as_ref())
            .await?;

        row.map(Link::from)
            .ok_or_else(|| AppError::not_found("Link not found", json!({ "link_id": id })))
    }

    async fn delete(&self, id: i64) -> Result<bool, AppError> {
        let result = sqlx::query("DELETE FROM links WHERE id = $1")
            .bind(id)
            .execute(self.pool.as_ref())
            .await?;

        Ok(result.rows_affected() > 0)
    }
}
