//! Tracking context extraction.
//!
//! Turns raw request metadata into a typed [`TrackingContext`]:
//!
//! - [`device`] - user-agent classification (device type, OS, browser, model, bot flag)
//! - [`referrer`] - `Referer` classification (direct, organic, social, email, referral, other)
//! - [`client_ip`] - public / internal address resolution
//!
//! Nothing in here returns an error. Malformed input degrades to the documented
//! defaults so that tracking can never stand in the way of a redirect.

pub mod client_ip;
pub mod device;
pub mod referrer;

use axum::http::{HeaderMap, header};
use serde_json::{Map, Value};
use std::net::SocketAddr;
use uuid::Uuid;

use crate::domain::tracking_context::TrackingContext;

pub use client_ip::resolve_client_ips;
pub use device::{classify_device, is_bot_user_agent};
pub use referrer::classify_referrer;

/// Builds the tracking context for one request.
pub fn extract_context(headers: &HeaderMap, peer: Option<SocketAddr>) -> TrackingContext {
    let user_agent = headers
        .get(header::USER_AGENT)
        .and_then(|v| v.to_str().ok());
    let referer = headers.get(header::REFERER).and_then(|v| v.to_str().ok());
    let (public_ip, internal_ip) = resolve_client_ips(headers, peer);

    TrackingContext {
        public_ip,
        internal_ip,
        device: classify_device(user_agent),
        referrer: classify_referrer(referer),
        session_id: Uuid::new_v4().to_string(),
        headers: header_bag(headers),
    }
}

/// Serializes headers into a JSON object. Repeated headers become arrays;
/// values that are not valid UTF-8 are stored lossily.
pub fn header_bag(headers: &HeaderMap) -> Value {
    let mut bag = Map::new();

    for name in headers.keys() {
        let mut values: Vec<Value> = headers
            .get_all(name)
            .iter()
            .map(|v| Value::String(String::from_utf8_lossy(v.as_bytes()).into_owned()))
            .collect();

        let value = if values.len() == 1 {
            values.remove(0)
        } else {
            Value::Array(values)
        };
        bag.insert(name.as_str().to_string(), value);
    }

    Value::Object(bag)
}
