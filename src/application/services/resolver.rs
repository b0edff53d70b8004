//! Short-code resolution and redirect strategy.

use serde_json::json;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::domain::entities::Link;
use crate::domain::repositories::LinkRepository;
use crate::error::AppError;
use crate::infrastructure::cache::CacheService;
use crate::utils::url_normalizer::{destination_host, normalize_destination};

/// Identity-provider hosts that refuse navigations carrying a foreign referrer.
const SENSITIVE_HOSTS: &[&str] = &[
    "accounts.google.com",
    "login.microsoftonline.com",
    "login.live.com",
    "login.microsoft.com",
    "appleid.apple.com",
    "idmsa.apple.com",
];

/// Hosted identity platforms, matched as a host suffix.
const SENSITIVE_SUFFIXES: &[&str] = &[".okta.com", ".auth0.com", ".onelogin.com"];

/// Generic sign-in markers, matched anywhere in the host.
const SENSITIVE_MARKERS: &[&str] = &["login.", "auth.", "account."];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RedirectStrategy {
    /// Plain `302 Found` with a `Location` header.
    Standard,
    /// `200` bounce page that navigates in the browser with no referrer.
    ClientSide,
}

/// A link that is active and ready to be redirected to.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedLink {
    pub link: Link,
    /// Absolute form of `link.destination`.
    pub destination: String,
    pub strategy: RedirectStrategy,
}

/// Returns true if `host` belongs to a sign-in service.
pub fn is_sensitive_host(host: &str) -> bool {
    let host = host.trim_end_matches('.').to_ascii_lowercase();

    SENSITIVE_HOSTS.contains(&host.as_str())
        || SENSITIVE_SUFFIXES.iter().any(|suffix| host.ends_with(suffix))
        || SENSITIVE_MARKERS.iter().any(|marker| host.contains(marker))
}

/// Picks the redirect strategy for an absolute destination URL.
pub fn redirect_strategy(destination: &str) -> RedirectStrategy {
    match destination_host(destination) {
        Some(host) if is_sensitive_host(&host) => RedirectStrategy::ClientSide,
        _ => RedirectStrategy::Standard,
    }
}

/// Maps short codes to active links, reading through the link cache.
pub struct ShortCodeResolver {
    links: Arc<dyn LinkRepository>,
    cache: Arc<dyn CacheService>,
}

impl ShortCodeResolver {
    pub fn new(links: Arc<dyn LinkRepository>, cache: Arc<dyn CacheService>) -> Self {
        Self { links, cache }
    }

    /// Resolves `code` by exact match.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::NotFound`] for unknown or deactivated codes.
    /// Returns [`AppError::Internal`] if the link store fails.
    pub async fn resolve(&self, code: &str) -> Result<ResolvedLink, AppError> {
        let link = match self.cache.get_link(code).await {
            Ok(Some(link)) => link,
            Ok(None) => self.load(code).await?,
            Err(e) => {
                warn!(code, error = %e, "Cache read failed, falling back to store");
                self.load(code).await?
            }
        };

        if !link.is_active {
            debug!(code, "Link is deactivated");
            return Err(not_found(code));
        }

        let destination = normalize_destination(&link.destination);
        let strategy = redirect_strategy(&destination);

        Ok(ResolvedLink {
            link,
            destination,
            strategy,
        })
    }

    async fn load(&self, code: &str) -> Result<Link, AppError> {
        let link = self
            .links
            .find_by_code(code)
            .await?
            .ok_or_else(|| not_found(code))?;

        if let Err(e) = self.cache.set_link(&link, None).await {
            warn!(code, error = %e, "Failed to cache link");
        }

        Ok(link)
    }
}

fn not_found(code: &str) -> AppError {
    AppError::not_found("Short link not found", json!({ "code": code }))
}
