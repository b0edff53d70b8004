//! Cache service trait and error types.

use async_trait::async_trait;

use crate::domain::entities::Link;

/// Errors that can occur during cache operations.
#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    #[error("Cache connection error: {0}")]
    ConnectionError(String),

    #[error("Cache operation error: {0}")]
    OperationError(String),
}

/// Result type for cache operations.
pub type CacheResult<T> = Result<T, CacheError>;

/// Read-through cache for short-code resolution.
///
/// Entries are whole [`Link`] records keyed by short code, so the resolver
/// gets owner, flags and destination from a single hit. Implementations are
/// fail-open: backend errors are logged and reported as misses.
///
/// # Implementations
///
/// - [`crate::infrastructure::cache::RedisCache`] - Redis-backed cache with TTL support
/// - [`crate::infrastructure::cache::NullCache`] - No-op implementation for disabled caching
#[async_trait]
pub trait CacheService: Send + Sync {
    /// Returns the cached link for `code`, or `None` on miss or error.
    async fn get_link(&self, code: &str) -> CacheResult<Option<Link>>;

    /// Stores a link under its code. `ttl_seconds = None` uses the backend default.
    async fn set_link(&self, link: &Link, ttl_seconds: Option<u64>) -> CacheResult<()>;

    /// Drops the entry for `code`. Called after a link is updated or deleted.
    async fn invalidate(&self, code: &str) -> CacheResult<()>;

    /// Checks if the cache backend is reachable.
    async fn health_check(&self) -> bool;
}
