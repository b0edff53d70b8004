//! Handler for health check endpoint.

use axum::{Json, extract::State, http::StatusCode};

use crate::api::dto::health::{CheckStatus, HealthChecks, HealthResponse};
use crate::state::AppState;

/// Returns service health status with component checks.
///
/// # Endpoint
///
/// `GET /health`
///
/// # Response Codes
///
/// - **200 OK**: All components healthy
/// - **503 Service Unavailable**: One or more components degraded
///
/// # Components Checked
///
/// 1. **Store**: `SELECT 1` on PostgreSQL; always ok for the in-memory backend
/// 2. **Visit Queue**: Checks if the worker is still receiving and reports free slots
/// 3. **Cache**: Tests Redis PING (always ok when caching is disabled)
///
/// # Response
///
/// ```json
/// {
///   "status": "healthy",
///   "version": "0.1.0",
///   "checks": {
///     "store": { "status": "ok", "message": "PostgreSQL connected" },
///     "visit_queue": { "status": "ok", "message": "Free slots: 10000" },
///     "cache": { "status": "ok", "message": "Cache reachable" }
///   }
/// }
/// ```
pub async fn health_handler(
    State(state): State<AppState>,
) -> Result<Json<HealthResponse>, (StatusCode, Json<HealthResponse>)> {
    let store_check = check_store(&state).await;

    let queue_check = check_visit_queue(&state);

    let cache_check = check_cache(&state).await;

    let all_healthy = store_check.is_ok() && queue_check.is_ok() && cache_check.is_ok();

    let response = HealthResponse {
        status: if all_healthy { "healthy" } else { "degraded" }.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        checks: HealthChecks {
            store: store_check,
            visit_queue: queue_check,
            cache: cache_check,
        },
    };

    if all_healthy {
        Ok(Json(response))
    } else {
        Err((StatusCode::SERVICE_UNAVAILABLE, Json(response)))
    }
}

async fn check_store(state: &AppState) -> CheckStatus {
    let Some(pool) = &state.db else {
        return CheckStatus::ok("In-memory store");
    };

    match sqlx::query("SELECT 1").execute(pool.as_ref()).await {
        Ok(_) => CheckStatus::ok("PostgreSQL connected"),
        Err(e) => CheckStatus::error(format!("Database error: {}", e)),
    }
}

fn check_visit_queue(state: &AppState) -> CheckStatus {
    if state.visit_dispatcher.is_closed() {
        CheckStatus::error("Visit queue is closed")
    } else {
        CheckStatus::ok(format!("Free slots: {}", state.visit_dispatcher.capacity()))
    }
}

async fn check_cache(state: &AppState) -> CheckStatus {
    if state.cache.health_check().await {
        CheckStatus::ok("Cache reachable")
    } else {
        CheckStatus::error("Redis connection failed")
    }
}
