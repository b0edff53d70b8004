//! Redis-backed cache implementation.

use super::service::{CacheError, CacheResult, CacheService};
use async_trait::async_trait;
use redis::{AsyncCommands, Client, aio::ConnectionManager};
use tracing::{debug, error, info, warn};

use crate::domain::entities::Link;

/// Redis cache for short-code resolution.
///
/// Links are stored as JSON under `link:{code}`. All operations are
/// fail-open: errors are logged and never reach the redirect path.
pub struct RedisCache {
    client: ConnectionManager,
    default_ttl: u64,
    key_prefix: String,
}

impl RedisCache {
    /// Connects to Redis, validates the connection with a PING, and configures the default TTL.
    ///
    /// # Errors
    ///
    /// Returns [`CacheError::ConnectionError`] if the URL is invalid, the connection cannot
    /// be established, or the PING health check fails.
    pub async fn connect(redis_url: &str, default_ttl_seconds: u64) -> CacheResult<Self> {
        info!("Connecting to Redis");

        let client = Client::open(redis_url).map_err(|e| {
            CacheError::ConnectionError(format!("Failed to create Redis client: {}", e))
        })?;

        let manager = ConnectionManager::new(client).await.map_err(|e| {
            CacheError::ConnectionError(format!("Failed to connect to Redis: {}", e))
        })?;

        let mut test_conn = manager.clone();
        test_conn
            .ping::<()>()
            .await
            .map_err(|e| CacheError::ConnectionError(format!("Redis PING failed: {}", e)))?;

        info!("✓ Connected to Redis");

        Ok(Self {
            client: manager,
            default_ttl: default_ttl_seconds,
            key_prefix: "link:".to_string(),
        })
    }

    fn build_key(&self, code: &str) -> String {
        format!("{}{}", self.key_prefix, code)
    }
}

#[async_trait]
impl CacheService for RedisCache {
    async fn get_link(&self, code: &str) -> CacheResult<Option<Link>> {
        let key = self.build_key(code);
        let mut conn = self.client.clone();

        match conn.get::<_, Option<String>>(&key).await {
            Ok(Some(raw)) => match serde_json::from_str::<Link>(&raw) {
                Ok(link) => {
                    debug!(code, "Cache HIT");
                    Ok(Some(link))
                }
                Err(e) => {
                    warn!(code, error = %e, "Discarding undecodable cache entry");
                    Ok(None)
                }
            },
            Ok(None) => {
                debug!(code, "Cache MISS");
                Ok(None)
            }
            Err(e) => {
                error!(code, error = %e, "Redis GET error");
                Ok(None)
            }
        }
    }

    async fn set_link(&self, link: &Link, ttl_seconds: Option<u64>) -> CacheResult<()> {
        let key = self.build_key(&link.code);
        let ttl = ttl_seconds.unwrap_or(self.default_ttl);
        let payload = serde_json::to_string(link)
            .map_err(|e| CacheError::OperationError(e.to_string()))?;
        let mut conn = self.client.clone();

        if let Err(e) = conn.set_ex::<_, _, ()>(&key, payload, ttl).await {
            warn!(code = %link.code, error = %e, "Redis SET error");
        } else {
            debug!(code = %link.code, ttl, "Cache SET");
        }

        Ok(())
    }

    async fn invalidate(&self, code: &str) -> CacheResult<()> {
        let key = self.build_key(code);
        let mut conn = self.client.clone();

        match conn.del::<_, i32>(&key).await {
            Ok(deleted) if deleted > 0 => debug!(code, "Cache INVALIDATE"),
            Ok(_) => {}
            Err(e) => warn!(code, error = %e, "Redis DEL error"),
        }

        Ok(())
    }

    async fn health_check(&self) -> bool {
        let mut conn = self.client.clone();
        conn.ping::<()>().await.is_ok()
    }
}
