//! Typed bundle of request-derived tracking data.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::domain::entities::{DeviceInfo, ReferrerInfo};

/// Everything the recorder needs to know about the inbound request.
///
/// Built by [`crate::tracking::extract_context`]; every field has a
/// deterministic default, so a context always exists even for malformed input.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackingContext {
    /// Proxy-resolved client address, empty when none could be determined.
    pub public_ip: String,
    /// Direct socket peer address.
    pub internal_ip: Option<String>,
    pub device: DeviceInfo,
    pub referrer: ReferrerInfo,
    /// Fresh per request; not a returning-visitor identifier.
    pub session_id: String,
    /// Header bag retained for forensic replay.
    pub headers: Value,
}

impl Default for TrackingContext {
    fn default() -> Self {
        Self {
            public_ip: String::new(),
            internal_ip: None,
            device: DeviceInfo::default(),
            referrer: ReferrerInfo::default(),
            session_id: uuid::Uuid::new_v4().to_string(),
            headers: Value::Object(Default::default()),
        }
    }
}
