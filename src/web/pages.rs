//! HTML pages rendered on the redirect path.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use tracing::error;

use crate::error::AppError;

/// Navigates the browser to `destination` without sending a referrer.
///
/// Renders `templates/bounce.html`. Used instead of a `Location` header for
/// destinations that reject or fingerprint server-side redirects.
#[derive(Template, WebTemplate)]
#[template(path = "bounce.html")]
pub struct BounceTemplate {
    pub destination: String,
}

/// Plain page for unknown or inactive codes.
#[derive(Template, WebTemplate)]
#[template(path = "not_found.html")]
pub struct NotFoundTemplate {}

/// Generic failure page.
#[derive(Template, WebTemplate)]
#[template(path = "error.html")]
pub struct ErrorTemplate {}

/// `200 OK` bounce page.
pub fn bounce(destination: String) -> Response {
    BounceTemplate { destination }.into_response()
}

/// `404 Not Found` page.
pub fn not_found() -> Response {
    (StatusCode::NOT_FOUND, NotFoundTemplate {}).into_response()
}

/// Maps a hot-path error to its page: not found stays a 404, everything else
/// becomes a generic 500 with the details only in the log.
pub fn from_error(err: AppError) -> Response {
    if err.is_not_found() {
        return not_found();
    }

    error!(error = %err, details = %err.to_error_info().details, "Redirect failed");
    (StatusCode::INTERNAL_SERVER_ERROR, ErrorTemplate {}).into_response()
}
