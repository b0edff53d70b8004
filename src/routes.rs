//! Top-level router configuration.
//!
//! # Route Structure
//!
//! - `GET|POST /{code}`           - Redirect with background visit tracking (public)
//! - `POST     /track/{code}`     - Synchronous tracking without redirect (public)
//! - `GET      /destination/{code}` - Destination lookup, no side effects (public)
//! - `GET      /health`           - Health check: store, cache, visit queue (public)
//! - `/api/*`                     - REST API (Bearer token required)
//!
//! Fixed routes take precedence over `/{code}`, which is why the first path
//! segments are reserved (see [`crate::utils::code_generator::RESERVED_CODES`]).
//!
//! # Middleware
//!
//! - **Tracing** - Structured request/response logging
//! - **Rate limiting** - Per-IP token bucket (configurable for proxy deployments)
//! - **Authentication** - Bearer token on `/api`
//! - **Path normalization** - Trailing slash handling

use crate::api;
use crate::api::handlers::{
    destination_handler, health_handler, redirect_handler, track_handler,
};
use crate::api::middleware::rate_limit::{self, Limit};
use crate::api::middleware::{auth, tracing};
use crate::state::AppState;
use axum::routing::{get, post};
use axum::{Router, middleware};
use tower::Layer;
use tower_http::normalize_path::{NormalizePath, NormalizePathLayer};

/// Router options taken from configuration.
#[derive(Debug, Clone, Copy, Default)]
pub struct RouterOptions {
    /// When `true`, rate limiting reads client IP from `X-Forwarded-For` /
    /// `X-Real-IP` headers instead of the peer socket address; enable only when
    /// the service runs behind a trusted reverse proxy.
    pub behind_proxy: bool,
    pub rate_limit_enabled: bool,
}

/// Constructs the application router with all routes and middleware.
pub fn app_router(state: AppState, options: RouterOptions) -> NormalizePath<Router> {
    let mut api_router = api::routes::protected_routes()
        .route_layer(middleware::from_fn_with_state(state.clone(), auth::layer));

    let mut visitor_router = Router::new()
        .route("/{code}", get(redirect_handler).post(redirect_handler))
        .route("/track/{code}", post(track_handler))
        .route("/destination/{code}", get(destination_handler));

    if options.rate_limit_enabled {
        api_router = rate_limit::apply(api_router, Limit::Secure, options.behind_proxy);
        visitor_router = rate_limit::apply(visitor_router, Limit::Public, options.behind_proxy);
    }

    let router = Router::new()
        .route("/health", get(health_handler))
        .merge(visitor_router)
        .nest("/api", api_router)
        .with_state(state)
        .layer(tracing::layer());

    NormalizePathLayer::trim_trailing_slash().layer(router)
}
