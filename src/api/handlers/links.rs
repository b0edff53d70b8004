//! Handlers for link management endpoints (list, create, update, delete).

use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
};
use validator::Validate;

use crate::api::dto::links::{CreateLinkRequest, LinkResponse, UpdateLinkRequest};
use crate::application::services::Principal;
use crate::error::AppError;
use crate::state::AppState;

/// Lists the caller's links, newest first.
///
/// # Endpoint
///
/// `GET /api/links`
pub async fn list_links_handler(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
) -> Result<Json<Vec<LinkResponse>>, AppError> {
    let links = state.link_service.list(principal.owner_id).await?;
    Ok(Json(links.into_iter().map(LinkResponse::from).collect()))
}

/// Creates a short link.
///
/// # Endpoint
///
/// `POST /api/links`
///
/// # Request Body
///
/// ```json
/// {
///   "originalUrl": "example.com",
///   "domain": "x.test",        // optional
///   "shortCode": "abc",        // optional, generated when absent
///   "cameraEnabled": false,    // optional
///   "locationEnabled": false   // optional
/// }
/// ```
///
/// # Errors
///
/// Returns 400 Bad Request if the destination or custom code is invalid.
/// Returns 409 Conflict if the custom code is already taken.
pub async fn create_link_handler(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Json(payload): Json<CreateLinkRequest>,
) -> Result<(StatusCode, Json<LinkResponse>), AppError> {
    payload.validate()?;

    let link = state
        .link_service
        .create(principal.owner_id, payload.into())
        .await?;

    Ok((StatusCode::CREATED, Json(link.into())))
}

/// Partially updates a link.
///
/// # Endpoint
///
/// `PATCH /api/links/{id}`
///
/// # Request Body
///
/// All fields are optional. Only provided fields are changed.
///
/// ```json
/// {
///   "originalUrl": "https://new-destination.com",
///   "cameraEnabled": true,
///   "locationEnabled": false,
///   "isActive": true
/// }
/// ```
///
/// # Cache
///
/// The cache entry for this link is invalidated so the next redirect uses the
/// updated destination.
///
/// # Errors
///
/// Returns 404 Not Found if the link doesn't exist or belongs to someone else.
/// Returns 400 Bad Request if validation fails or the body is empty.
pub async fn update_link_handler(
    Path(id): Path<i64>,
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Json(payload): Json<UpdateLinkRequest>,
) -> Result<Json<LinkResponse>, AppError> {
    payload.validate()?;

    let link = state
        .link_service
        .update(principal.owner_id, id, payload.into())
        .await?;

    Ok(Json(link.into()))
}

/// Deletes a link together with its visits.
///
/// # Endpoint
///
/// `DELETE /api/links/{id}`
///
/// # Errors
///
/// Returns 404 Not Found if the link doesn't exist or belongs to someone else.
pub async fn delete_link_handler(
    Path(id): Path<i64>,
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
) -> Result<StatusCode, AppError> {
    state.link_service.delete(principal.owner_id, id).await?;
    Ok(StatusCode::NO_CONTENT)
}
