//! Handlers for the visitor-facing routes: redirect, tracking-only and
//! destination lookup.

use axum::{
    Json,
    body::to_bytes,
    extract::{ConnectInfo, Path, Request, State},
    http::{HeaderValue, Method, StatusCode, header},
    response::{IntoResponse, Response},
};
use std::net::SocketAddr;
use tracing::warn;

use crate::application::services::{CapturePayload, DestinationInfo, RedirectOutcome, TrackAck};
use crate::domain::tracking_context::TrackingContext;
use crate::error::AppError;
use crate::state::AppState;
use crate::tracking::extract_context;
use crate::web::pages;

/// Largest capture body read from a visitor request (photos arrive base64-encoded).
pub const MAX_CAPTURE_BODY_BYTES: usize = 10 * 1024 * 1024;

/// Splits a visitor request into its tracking context, method and optional
/// capture payload.
///
/// The peer address comes from [`ConnectInfo`] when the server provides it.
/// Oversized or unparsable bodies are treated as "no capture".
async fn read_visit(request: Request) -> (TrackingContext, Method, Option<CapturePayload>) {
    let (parts, body) = request.into_parts();
    let peer = parts
        .extensions
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| *addr);

    let context = extract_context(&parts.headers, peer);

    let capture = match to_bytes(body, MAX_CAPTURE_BODY_BYTES).await {
        Ok(bytes) => CapturePayload::from_body(&bytes),
        Err(e) => {
            warn!(error = %e, "Capture body unreadable, recording without capture");
            None
        }
    };

    (context, parts.method, capture)
}

/// Redirects a short code to its destination.
///
/// # Endpoint
///
/// `GET /{code}` and `POST /{code}` (the POST body may carry a capture payload)
///
/// # Request Flow
///
/// 1. Extract the tracking context (client IPs, device, referrer, headers)
/// 2. Resolve the code (cache first, then storage)
/// 3. Queue the visit for the background worker
/// 4. Respond without waiting for the recording
///
/// # Responses
///
/// - **302 Found** with `Location` for ordinary destinations
/// - **200 OK** bounce page for sensitive destinations (no `Location` header)
/// - **404 Not Found** HTML page for unknown or inactive codes
/// - **500** generic HTML page for storage failures
pub async fn redirect_handler(
    Path(code): Path<String>,
    State(state): State<AppState>,
    request: Request,
) -> Response {
    let (context, method, capture) = read_visit(request).await;

    match state
        .redirect_service
        .redirect(&code, context, method, capture)
        .await
    {
        Ok(RedirectOutcome::Standard { location }) => match HeaderValue::try_from(location.as_str()) {
            Ok(value) => (StatusCode::FOUND, [(header::LOCATION, value)]).into_response(),
            Err(_) => {
                warn!(code, "Destination is not a valid header value, using bounce page");
                pages::bounce(location)
            }
        },
        Ok(RedirectOutcome::ClientSide { destination }) => pages::bounce(destination),
        Err(err) => pages::from_error(err),
    }
}

/// Records a visit synchronously without redirecting.
///
/// # Endpoint
///
/// `POST /track/{code}`
///
/// # Response
///
/// ```json
/// { "success": true, "visit_id": 17, "click_counted": true }
/// ```
///
/// `success` is false when the visit row could not be written; the click may
/// still have been counted.
///
/// # Errors
///
/// Returns 404 Not Found if the code is unknown or inactive.
pub async fn track_handler(
    Path(code): Path<String>,
    State(state): State<AppState>,
    request: Request,
) -> Result<Json<TrackAck>, AppError> {
    let (context, method, capture) = read_visit(request).await;

    let ack = state
        .redirect_service
        .track(&code, context, method, capture)
        .await?;

    Ok(Json(ack))
}

/// Describes where a code leads without recording anything.
///
/// # Endpoint
///
/// `GET /destination/{code}`
///
/// # Response
///
/// ```json
/// {
///   "destination": "https://example.com",
///   "camera_enabled": false,
///   "location_enabled": false,
///   "requires_client_navigation": false
/// }
/// ```
///
/// # Errors
///
/// Returns 404 Not Found if the code is unknown or inactive.
pub async fn destination_handler(
    Path(code): Path<String>,
    State(state): State<AppState>,
) -> Result<Json<DestinationInfo>, AppError> {
    Ok(Json(state.redirect_service.destination(&code).await?))
}
