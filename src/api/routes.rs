//! API route configuration.
//!
//! All API endpoints require Bearer token authentication via
//! [`crate::api::middleware::auth`], and every query is scoped to the
//! authenticated owner.

use crate::api::handlers::{
    create_link_handler, delete_link_handler, list_links_handler, recent_visits_handler,
    summary_handler, update_link_handler, visit_log_handler,
};
use crate::state::AppState;
use axum::{
    Router,
    routing::{get, patch},
};

/// All API routes, protected by Bearer token authentication.
///
/// # Endpoints
///
/// - `GET    /stats/summary`           - Aggregated analytics over the caller's links
/// - `GET    /stats/links/{id}/visits` - Paginated visit log of one link
/// - `GET    /stats/links/{id}/recent` - The 100 latest visits of one link
/// - `GET    /links`                   - List the caller's links
/// - `POST   /links`                   - Create a short link
/// - `PATCH  /links/{id}`              - Partially update a link
/// - `DELETE /links/{id}`              - Delete a link and its visits
pub fn protected_routes() -> Router<AppState> {
    Router::new()
        .route("/stats/summary", get(summary_handler))
        .route("/stats/links/{id}/visits", get(visit_log_handler))
        .route("/stats/links/{id}/recent", get(recent_visits_handler))
        .route("/links", get(list_links_handler).post(create_link_handler))
        .route(
            "/links/{id}",
            patch(update_link_handler).delete(delete_link_handler),
        )
}
