//! Destination URL normalization and validation.
//!
//! Destinations are stored as submitted and normalized at resolution time.
//! Normalization only guarantees an absolute URL: when the stored value has no
//! `scheme://` prefix, leading slashes are stripped and `https://` is prepended.
//! Nothing else (case, ports, trailing slash) is touched.

use regex::Regex;
use std::sync::LazyLock;
use url::Url;

static SCHEME_PREFIX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-zA-Z][a-zA-Z0-9+.-]*://").expect("valid regex"));

/// Errors returned when a destination cannot be accepted at creation time.
#[derive(Debug, thiserror::Error)]
pub enum UrlNormalizationError {
    #[error("Destination URL must not be empty")]
    Empty,

    #[error("Invalid URL format: {0}")]
    InvalidFormat(String),

    #[error("Only HTTP and HTTPS protocols are allowed")]
    UnsupportedProtocol,

    #[error("Destination URL has no host")]
    MissingHost,

    #[error("Destination URL must not contain control characters")]
    ControlCharacter,
}

/// Returns the absolute form of a stored destination.
///
/// ```ignore
/// assert_eq!(normalize_destination("example.com"), "https://example.com");
/// assert_eq!(normalize_destination("//cdn.example.com/a"), "https://cdn.example.com/a");
/// assert_eq!(normalize_destination("http://example.com"), "http://example.com");
/// ```
pub fn normalize_destination(raw: &str) -> String {
    let trimmed = raw.trim();

    if SCHEME_PREFIX.is_match(trimmed) {
        trimmed.to_string()
    } else {
        format!("https://{}", trimmed.trim_start_matches('/'))
    }
}

/// Normalizes a destination and checks that it is a usable HTTP(S) URL.
///
/// # Errors
///
/// - [`UrlNormalizationError::Empty`] for blank input
/// - [`UrlNormalizationError::InvalidFormat`] if the normalized form does not parse
/// - [`UrlNormalizationError::UnsupportedProtocol`] for non-HTTP(S) schemes such as
///   `javascript:` or `ftp://`
/// - [`UrlNormalizationError::MissingHost`] if the URL has no host
/// - [`UrlNormalizationError::ControlCharacter`] for tabs, newlines and other
///   control characters inside the URL, which the URL parser would silently drop
///   but a `Location` header cannot carry
pub fn validate_destination(raw: &str) -> Result<String, UrlNormalizationError> {
    if raw.trim().trim_start_matches('/').is_empty() {
        return Err(UrlNormalizationError::Empty);
    }

    if raw.trim().chars().any(char::is_control) {
        return Err(UrlNormalizationError::ControlCharacter);
    }

    let normalized = normalize_destination(raw);
    let url =
        Url::parse(&normalized).map_err(|e| UrlNormalizationError::InvalidFormat(e.to_string()))?;

    match url.scheme() {
        "http" | "https" => {}
        _ => return Err(UrlNormalizationError::UnsupportedProtocol),
    }

    if url.host_str().is_none_or(str::is_empty) {
        return Err(UrlNormalizationError::MissingHost);
    }

    Ok(normalized)
}

/// Lowercased host of an absolute URL, if it has one.
pub fn destination_host(absolute_url: &str) -> Option<String> {
    Url::parse(absolute_url)
        .ok()?
        .host_str()
        .map(|h| h.trim_end_matches('.').to_ascii_lowercase())
}
