//! Visit recording: captures, visit persistence and click counting.
//!
//! The recorder never fails from the caller's point of view. Capture and
//! persistence problems are logged, counted and folded into the returned
//! [`RecordOutcome`].

use axum::http::Method;
use base64::Engine as _;
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;
use tokio_retry::RetryIf;
use tokio_retry::strategy::{ExponentialBackoff, jitter};
use tracing::{debug, error, warn};

use crate::domain::entities::{GeoDescriptor, Link, LocationReading, NewVisit};
use crate::domain::repositories::{LinkRepository, VisitRepository};
use crate::domain::tracking_context::TrackingContext;
use crate::error::AppError;
use crate::infrastructure::geo::GeoLookup;
use crate::infrastructure::upload::{PhotoUploader, UploadConstraints};

/// Optional data a visitor's browser submits with the request body.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct CapturePayload {
    /// Base64 image, optionally as a `data:image/...;base64,` URL.
    #[serde(default)]
    pub photo: Option<String>,
    #[serde(default)]
    pub location: Option<LocationReading>,
}

impl CapturePayload {
    /// Parses a request body. Empty or malformed bodies mean "no capture".
    pub fn from_body(body: &[u8]) -> Option<Self> {
        if body.iter().all(u8::is_ascii_whitespace) {
            return None;
        }

        match serde_json::from_slice::<Self>(body) {
            Ok(payload) => Some(payload),
            Err(e) => {
                debug!(error = %e, "Ignoring unparsable capture payload");
                None
            }
        }
    }
}

/// One tracked resolution waiting to be recorded.
#[derive(Debug, Clone)]
pub struct VisitJob {
    pub link: Link,
    pub context: TrackingContext,
    pub method: Method,
    pub capture: Option<CapturePayload>,
}

#[derive(Debug, Clone)]
pub struct RecorderConfig {
    pub upload_constraints: UploadConstraints,
    /// Upper bound for the photo upload and the geo lookup.
    pub capture_timeout: Duration,
    /// Total tries for the visit insert, including the first one.
    pub persist_attempts: usize,
}

impl Default for RecorderConfig {
    fn default() -> Self {
        Self {
            upload_constraints: UploadConstraints::default(),
            capture_timeout: Duration::from_secs(5),
            persist_attempts: 3,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RecordOutcome {
    pub visit_id: Option<i64>,
    pub click_counted: bool,
    pub has_photo: bool,
    pub has_location: bool,
}

#[derive(Debug, thiserror::Error)]
pub enum TrackingError {
    #[error("{kind} capture failed: {reason}")]
    CaptureFailure { kind: &'static str, reason: String },

    #[error("{operation} failed: {reason}")]
    PersistenceFailure {
        operation: &'static str,
        reason: String,
    },
}

/// Methods whose requests carry a capture body.
fn submits_data(method: &Method) -> bool {
    *method == Method::POST || *method == Method::PUT || *method == Method::PATCH
}

/// Decodes a base64 photo, accepting the `data:` URL form.
fn decode_photo(raw: &str) -> Result<Vec<u8>, TrackingError> {
    let trimmed = raw.trim();
    let encoded = match trimmed.strip_prefix("data:") {
        Some(rest) => rest
            .split_once(',')
            .map(|(_, data)| data)
            .ok_or_else(|| capture_failure("photo", "data URL without payload"))?,
        None => trimmed,
    };

    let compact: String = encoded.chars().filter(|c| !c.is_whitespace()).collect();
    if compact.is_empty() {
        return Err(capture_failure("photo", "empty payload"));
    }

    base64::engine::general_purpose::STANDARD
        .decode(&compact)
        .or_else(|_| base64::engine::general_purpose::STANDARD_NO_PAD.decode(&compact))
        .map_err(|e| capture_failure("photo", e))
}

fn capture_failure(kind: &'static str, reason: impl ToString) -> TrackingError {
    TrackingError::CaptureFailure {
        kind,
        reason: reason.to_string(),
    }
}

pub struct VisitRecorder {
    links: Arc<dyn LinkRepository>,
    visits: Arc<dyn VisitRepository>,
    uploader: Arc<dyn PhotoUploader>,
    geo: Arc<dyn GeoLookup>,
    config: RecorderConfig,
}

impl VisitRecorder {
    pub fn new(
        links: Arc<dyn LinkRepository>,
        visits: Arc<dyn VisitRepository>,
        uploader: Arc<dyn PhotoUploader>,
        geo: Arc<dyn GeoLookup>,
        config: RecorderConfig,
    ) -> Self {
        Self {
            links,
            visits,
            uploader,
            geo,
            config,
        }
    }

    /// Records one visit and counts one click.
    ///
    /// The visit insert and the click increment run concurrently and
    /// independently: a failed insert still counts the click and vice versa.
    pub async fn record(&self, job: VisitJob) -> RecordOutcome {
        let VisitJob {
            link,
            context,
            method,
            capture,
        } = job;
        let capture = capture.filter(|_| submits_data(&method)).unwrap_or_default();

        let (photo_url, geo) = tokio::join!(
            self.capture_photo(&link, capture.photo.as_deref()),
            self.lookup_geo(&context.public_ip),
        );

        let location = if link.location_enabled {
            capture.location
        } else {
            None
        };

        let new_visit = NewVisit {
            link_id: link.id,
            public_ip: context.public_ip,
            internal_ip: context.internal_ip,
            session_id: context.session_id,
            device: context.device,
            referrer: context.referrer,
            headers: context.headers,
            geo,
            photo_url,
            location,
        };
        let has_photo = new_visit.has_photo();
        let has_location = new_visit.has_location();

        let (visit, counted) = tokio::join!(
            self.persist_visit(new_visit),
            self.count_click(link.id)
        );

        let visit_id = match visit {
            Ok(id) => {
                metrics::counter!("visits_recorded_total").increment(1);
                Some(id)
            }
            Err(e) => {
                metrics::counter!("visits_failed_total").increment(1);
                error!(link_id = link.id, error = %e, "Visit was not recorded");
                None
            }
        };

        let click_counted = match counted {
            Ok(()) => {
                metrics::counter!("clicks_counted_total").increment(1);
                true
            }
            Err(e) => {
                metrics::counter!("clicks_failed_total").increment(1);
                error!(link_id = link.id, error = %e, "Click was not counted");
                false
            }
        };

        RecordOutcome {
            visit_id,
            click_counted,
            has_photo: visit_id.is_some() && has_photo,
            has_location: visit_id.is_some() && has_location,
        }
    }

    async fn capture_photo(&self, link: &Link, photo: Option<&str>) -> Option<String> {
        if !link.camera_enabled {
            return None;
        }
        let photo = photo?;

        match self.upload_photo(photo).await {
            Ok(url) => Some(url),
            Err(e) => {
                metrics::counter!("capture_failures_total", "kind" => "photo").increment(1);
                warn!(link_id = link.id, error = %e, "Photo capture failed");
                None
            }
        }
    }

    async fn upload_photo(&self, photo: &str) -> Result<String, TrackingError> {
        let bytes = decode_photo(photo)?;

        tokio::time::timeout(
            self.config.capture_timeout,
            self.uploader.upload(bytes, &self.config.upload_constraints),
        )
        .await
        .map_err(|_| capture_failure("photo", "upload timed out"))?
        .map_err(|e| capture_failure("photo", e))
    }

    async fn lookup_geo(&self, public_ip: &str) -> Option<GeoDescriptor> {
        if public_ip.is_empty() {
            return None;
        }

        match tokio::time::timeout(self.config.capture_timeout, self.geo.lookup(public_ip)).await
        {
            Ok(geo) => geo,
            Err(_) => {
                metrics::counter!("capture_failures_total", "kind" => "geo").increment(1);
                warn!(ip = public_ip, "Geo lookup timed out");
                None
            }
        }
    }

    /// Inserts the visit, retrying transient store errors with jittered
    /// exponential backoff.
    async fn persist_visit(&self, new_visit: NewVisit) -> Result<i64, TrackingError> {
        let strategy = ExponentialBackoff::from_millis(10)
            .max_delay(Duration::from_secs(1))
            .map(jitter)
            .take(self.config.persist_attempts.saturating_sub(1));

        RetryIf::start(
            strategy,
            || {
                let new_visit = new_visit.clone();
                async move { self.visits.create(new_visit).await }
            },
            |e: &AppError| matches!(e, AppError::Internal { .. }),
        )
        .await
        .map(|visit| visit.id)
        .map_err(|e| TrackingError::PersistenceFailure {
            operation: "visit insert",
            reason: e.to_string(),
        })
    }

    async fn count_click(&self, link_id: i64) -> Result<(), TrackingError> {
        self.links
            .increment_clicks(link_id)
            .await
            .map_err(|e| TrackingError::PersistenceFailure {
                operation: "click increment",
                reason: e.to_string(),
            })
    }
}
