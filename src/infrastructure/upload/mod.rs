//! Photo upload client.
//!
//! The object store is an opaque HTTP service: it receives the raw image
//! bytes plus the processing constraints as query parameters and answers with
//! `{"url": "..."}` pointing at the stored object.

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;
use url::Url;

/// Processing constraints forwarded to the object store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadConstraints {
    /// Longest edge in pixels after resizing.
    pub max_dimension: u32,
    /// Encoder quality, 1-100.
    pub quality: u8,
    pub format: String,
}

impl Default for UploadConstraints {
    fn default() -> Self {
        Self {
            max_dimension: 1280,
            quality: 80,
            format: "jpeg".to_string(),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum UploadError {
    #[error("photo uploads are disabled")]
    Disabled,

    #[error("upload request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("upload rejected with status {0}")]
    Status(u16),

    #[error("invalid upload response: {0}")]
    InvalidResponse(String),
}

/// Stores a captured photo and returns its public URL.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PhotoUploader: Send + Sync {
    async fn upload(
        &self,
        bytes: Vec<u8>,
        constraints: &UploadConstraints,
    ) -> Result<String, UploadError>;
}

#[derive(Deserialize)]
struct UploadResponse {
    url: String,
}

/// Uploads photos to `PHOTO_UPLOAD_URL` with a plain `POST`.
pub struct HttpPhotoUploader {
    endpoint: Url,
    client: Client,
}

impl HttpPhotoUploader {
    pub fn new(endpoint: &str, timeout: Duration) -> anyhow::Result<Self> {
        let endpoint = Url::parse(endpoint)?;
        let client = Client::builder()
            .user_agent(concat!("link-tracker/", env!("CARGO_PKG_VERSION")))
            .timeout(timeout)
            .build()?;

        Ok(Self { endpoint, client })
    }

    fn request_url(&self, constraints: &UploadConstraints) -> Url {
        let mut url = self.endpoint.clone();
        url.query_pairs_mut()
            .append_pair("max_dimension", &constraints.max_dimension.to_string())
            .append_pair("quality", &constraints.quality.to_string())
            .append_pair("format", &constraints.format);
        url
    }
}

#[async_trait]
impl PhotoUploader for HttpPhotoUploader {
    async fn upload(
        &self,
        bytes: Vec<u8>,
        constraints: &UploadConstraints,
    ) -> Result<String, UploadError> {
        let size = bytes.len();
        let response = self
            .client
            .post(self.request_url(constraints))
            .header(reqwest::header::CONTENT_TYPE, "application/octet-stream")
            .body(bytes)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(UploadError::Status(status.as_u16()));
        }

        let body: UploadResponse = response.json().await?;
        if body.url.trim().is_empty() {
            return Err(UploadError::InvalidResponse("empty url".to_string()));
        }

        debug!(size, url = %body.url, "Photo uploaded");
        Ok(body.url)
    }
}

/// Used when no upload endpoint is configured. Every upload fails, so the
/// recorder stores the visit without a photo.
pub struct DisabledPhotoUploader;

#[async_trait]
impl PhotoUploader for DisabledPhotoUploader {
    async fn upload(
        &self,
        _bytes: Vec<u8>,
        _constraints: &UploadConstraints,
    ) -> Result<String, UploadError> {
        Err(UploadError::Disabled)
    }
}
