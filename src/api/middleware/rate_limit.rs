//! Rate limiting middleware using token bucket algorithm.

use axum::Router;
use axum::body::Body;
use governor::clock::QuantaInstant;
use governor::middleware::NoOpMiddleware;
use std::sync::Arc;
use tower_governor::{
    GovernorLayer,
    governor::GovernorConfigBuilder,
    key_extractor::{KeyExtractor, PeerIpKeyExtractor, SmartIpKeyExtractor},
};

use crate::state::AppState;

/// Per-IP quota applied to a group of routes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Limit {
    /// Visitor routes (redirect, track, destination).
    ///
    /// - **Rate**: 20 requests per second
    /// - **Burst**: 100 requests
    Public,

    /// Authenticated `/api` routes.
    ///
    /// - **Rate**: 2 requests per second
    /// - **Burst**: 20 requests
    Secure,
}

impl Limit {
    /// Replenish interval of one request in milliseconds, and the burst size.
    fn quota(self) -> (u64, u32) {
        match self {
            Self::Public => (50, 100),
            Self::Secure => (500, 20),
        }
    }
}

/// Wraps `router` in a rate limiter.
///
/// Requests exceeding the limit receive `429 Too Many Requests`.
///
/// # Key Extraction
///
/// - `behind_proxy = false`: the socket peer address
/// - `behind_proxy = true`: `X-Forwarded-For` / `X-Real-IP` / `Forwarded`, falling
///   back to the peer address; enable only behind a trusted reverse proxy
///
/// # Example
///
/// ```rust,ignore
/// let api = rate_limit::apply(api_routes(), Limit::Secure, config.behind_proxy);
/// ```
pub fn apply(router: Router<AppState>, limit: Limit, behind_proxy: bool) -> Router<AppState> {
    let (interval_ms, burst) = limit.quota();

    if behind_proxy {
        router.layer(governor(SmartIpKeyExtractor, interval_ms, burst))
    } else {
        router.layer(governor(PeerIpKeyExtractor, interval_ms, burst))
    }
}

fn governor<K: KeyExtractor>(
    key_extractor: K,
    interval_ms: u64,
    burst: u32,
) -> GovernorLayer<K, NoOpMiddleware<QuantaInstant>, Body> {
    let governor_conf = Arc::new(
        GovernorConfigBuilder::default()
            .per_millisecond(interval_ms)
            .burst_size(burst)
            .key_extractor(key_extractor)
            .finish()
            .unwrap(),
    );

    GovernorLayer::new(governor_conf)
}
