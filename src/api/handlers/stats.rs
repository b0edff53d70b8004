//! Handlers for owner-scoped visit analytics.

use axum::{
    Extension, Json,
    extract::{Path, Query, State},
};

use crate::api::dto::pagination::PaginationParams;
use crate::api::dto::stats::{RecentVisitsResponse, VisitLogResponse};
use crate::application::services::{Principal, StatsSummary};
use crate::error::AppError;
use crate::state::AppState;

/// Aggregated analytics across every link of the caller.
///
/// # Endpoint
///
/// `GET /api/stats/summary`
///
/// # Response
///
/// Total visits, unique visitors, top 10 countries, per-link visit counts,
/// device and referrer breakdowns, a zero-filled 30-day daily series and the
/// caller's links with their click counters.
pub async fn summary_handler(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
) -> Result<Json<StatsSummary>, AppError> {
    let summary = state.stats_service.summary(principal.owner_id).await?;
    Ok(Json(summary))
}

/// Paginated visit log of one link, newest first.
///
/// # Endpoint
///
/// `GET /api/stats/links/{id}/visits`
///
/// # Query Parameters
///
/// - `page` (optional): Page number (default: 1)
/// - `page_size` (optional): Items per page (default: 50, max: 500)
///
/// # Errors
///
/// Returns 400 Bad Request if pagination parameters are out of range.
/// Returns 404 Not Found if the link does not exist or belongs to someone else.
pub async fn visit_log_handler(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path(link_id): Path<i64>,
    Query(params): Query<PaginationParams>,
) -> Result<Json<VisitLogResponse>, AppError> {
    let (page, page_size) = params.resolve();

    let visits = state
        .stats_service
        .visit_log(principal.owner_id, link_id, page, page_size)
        .await?;

    Ok(Json(VisitLogResponse::new(link_id, visits)))
}

/// The 100 latest visits of one link.
///
/// # Endpoint
///
/// `GET /api/stats/links/{id}/recent`
///
/// # Errors
///
/// Returns 404 Not Found if the link does not exist or belongs to someone else.
pub async fn recent_visits_handler(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path(link_id): Path<i64>,
) -> Result<Json<RecentVisitsResponse>, AppError> {
    let items = state
        .stats_service
        .recent_visits(principal.owner_id, link_id)
        .await?;

    Ok(Json(RecentVisitsResponse { link_id, items }))
}
