//! HTTP server initialization and runtime setup.
//!
//! Handles storage selection, cache setup, capture collaborators, the visit
//! worker, and the Axum server lifecycle.

use crate::application::services::hash_token;
use crate::config::{Config, StorageBackend};
use crate::domain::repositories::TokenRepository;
use crate::domain::visit_worker::run_visit_worker;
use crate::infrastructure::cache::{CacheService, NullCache, RedisCache};
use crate::infrastructure::geo::{ExternalGeoLookup, GeoLookup, NoopGeoLookup};
use crate::infrastructure::memory::{
    MemoryLinkRepository, MemoryStore, MemoryTokenRepository, MemoryVisitRepository,
};
use crate::infrastructure::persistence::{PgLinkRepository, PgTokenRepository, PgVisitRepository};
use crate::infrastructure::upload::{DisabledPhotoUploader, HttpPhotoUploader, PhotoUploader};
use crate::routes::app_router;
use crate::state::{AppState, Collaborators, StateSettings};

use anyhow::{Context, Result};
use axum::ServiceExt;
use axum::extract::Request;
use sqlx::postgres::PgPoolOptions;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::signal;
use tokio::time::timeout;

/// How long the visit worker may keep flushing queued visits after shutdown.
const WORKER_DRAIN_TIMEOUT: Duration = Duration::from_secs(30);

/// Runs the HTTP server with the given configuration.
///
/// Initializes:
/// - Storage backend (PostgreSQL with migrations, or in-memory)
/// - Redis cache (or NullCache fallback)
/// - Photo uploader and geo lookup (disabled when unconfigured)
/// - Background visit worker
/// - Axum HTTP server with graceful shutdown on Ctrl+C
///
/// # Errors
///
/// Returns an error if:
/// - Database connection or migration fails
/// - A capture client cannot be built
/// - Server bind fails
/// - Server runtime error occurs
pub async fn run(config: Config) -> Result<()> {
    let collaborators = match config.storage_backend {
        StorageBackend::Postgres => postgres_backend(&config).await?,
        StorageBackend::Memory => memory_backend(&config).await?,
    };

    let settings = StateSettings {
        recorder: config.recorder_config(),
        token_signing_secret: config.token_signing_secret.clone(),
        visit_queue_capacity: config.visit_queue_capacity,
    };
    let (state, queue) = AppState::new(collaborators, settings);

    let worker = tokio::spawn(run_visit_worker(
        queue.rx,
        queue.recorder,
        config.visit_worker_concurrency,
    ));

    let app = app_router(state, config.router_options());

    let addr: SocketAddr = config.listen_addr.parse()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!("Listening on http://{addr}");

    axum::serve(
        listener,
        ServiceExt::<Request>::into_make_service_with_connect_info::<SocketAddr>(app),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    tracing::info!("Server stopped, draining visit queue");
    match timeout(WORKER_DRAIN_TIMEOUT, worker).await {
        Ok(Ok(())) => tracing::info!("Visit queue drained"),
        Ok(Err(e)) => tracing::error!("Visit worker panicked: {}", e),
        Err(_) => tracing::warn!(
            "Visit queue not drained after {}s, pending visits are lost",
            WORKER_DRAIN_TIMEOUT.as_secs()
        ),
    }

    Ok(())
}

async fn postgres_backend(config: &Config) -> Result<Collaborators> {
    let database_url = config
        .database_url
        .as_deref()
        .context("DATABASE_URL is required for the postgres backend")?;

    let pool = PgPoolOptions::new()
        .max_connections(config.db_max_connections)
        .acquire_timeout(Duration::from_secs(config.db_connect_timeout))
        .idle_timeout(Duration::from_secs(config.db_idle_timeout))
        .max_lifetime(Duration::from_secs(config.db_max_lifetime))
        .connect(database_url)
        .await
        .context("Failed to connect to database")?;
    tracing::info!("Connected to database");

    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .context("Failed to migrate")?;

    let pool = Arc::new(pool);

    Ok(Collaborators {
        links: Arc::new(PgLinkRepository::new(Arc::clone(&pool))),
        visits: Arc::new(PgVisitRepository::new(Arc::clone(&pool))),
        tokens: Arc::new(PgTokenRepository::new(Arc::clone(&pool))),
        cache: connect_cache(config).await,
        uploader: photo_uploader(config)?,
        geo: geo_lookup(config)?,
        db: Some(pool),
    })
}

async fn memory_backend(config: &Config) -> Result<Collaborators> {
    tracing::warn!("Using in-memory storage, data is lost on restart");

    let store = Arc::new(MemoryStore::new());
    let tokens = Arc::new(MemoryTokenRepository::new(Arc::clone(&store)));

    if let Some(token) = &config.bootstrap_token {
        let token_hash = hash_token(&config.token_signing_secret, token);
        tokens
            .create_token("bootstrap", config.bootstrap_owner_id, &token_hash)
            .await
            .context("Failed to register bootstrap token")?;
        tracing::info!(owner_id = config.bootstrap_owner_id, "Bootstrap token registered");
    }

    Ok(Collaborators {
        links: Arc::new(MemoryLinkRepository::new(Arc::clone(&store))),
        visits: Arc::new(MemoryVisitRepository::new(store)),
        tokens,
        cache: Arc::new(NullCache::new()),
        uploader: photo_uploader(config)?,
        geo: geo_lookup(config)?,
        db: None,
    })
}

async fn connect_cache(config: &Config) -> Arc<dyn CacheService> {
    if let Some(redis_url) = &config.redis_url {
        match RedisCache::connect(redis_url, config.cache_ttl_seconds).await {
            Ok(redis) => {
                tracing::info!("Cache enabled (Redis)");
                Arc::new(redis)
            }
            Err(e) => {
                tracing::warn!("Failed to connect to Redis: {}. Using NullCache.", e);
                Arc::new(NullCache::new())
            }
        }
    } else {
        tracing::info!("Cache disabled (NullCache)");
        Arc::new(NullCache::new())
    }
}

fn photo_uploader(config: &Config) -> Result<Arc<dyn PhotoUploader>> {
    Ok(match &config.photo_upload_url {
        Some(endpoint) => {
            tracing::info!("Photo capture enabled");
            Arc::new(
                HttpPhotoUploader::new(endpoint, config.capture_timeout())
                    .context("Failed to build photo upload client")?,
            )
        }
        None => Arc::new(DisabledPhotoUploader),
    })
}

fn geo_lookup(config: &Config) -> Result<Arc<dyn GeoLookup>> {
    Ok(match &config.geoip_api_url {
        Some(template) => {
            tracing::info!("Geo lookup enabled");
            Arc::new(
                ExternalGeoLookup::new(template, config.capture_timeout())
                    .context("Failed to build geo lookup client")?,
            )
        }
        None => Arc::new(NoopGeoLookup),
    })
}

async fn shutdown_signal() {
    match signal::ctrl_c().await {
        Ok(()) => tracing::info!("Shutdown signal received"),
        Err(e) => tracing::warn!(
            "Failed to listen for Ctrl+C: {}. Proceeding with shutdown anyway.",
            e
        ),
    }
}
