//! Shared application state injected into every handler.

use sqlx::PgPool;
use std::sync::Arc;
use tokio::sync::mpsc;

use crate::application::services::{
    AuthService, LinkService, RecorderConfig, RedirectService, ShortCodeResolver, StatsService,
    VisitJob, VisitRecorder,
};
use crate::domain::repositories::{LinkRepository, TokenRepository, VisitRepository};
use crate::domain::visit_worker::VisitDispatcher;
use crate::infrastructure::cache::CacheService;
use crate::infrastructure::geo::GeoLookup;
use crate::infrastructure::upload::PhotoUploader;

#[derive(Clone)]
pub struct AppState {
    pub redirect_service: Arc<RedirectService>,
    pub link_service: Arc<LinkService>,
    pub stats_service: Arc<StatsService>,
    pub auth_service: Arc<AuthService>,
    pub cache: Arc<dyn CacheService>,
    pub visit_dispatcher: VisitDispatcher,
    /// Present with the PostgreSQL backend; used by the health check.
    pub db: Option<Arc<PgPool>>,
}

/// Storage backends and external collaborators the services are built from.
pub struct Collaborators {
    pub links: Arc<dyn LinkRepository>,
    pub visits: Arc<dyn VisitRepository>,
    pub tokens: Arc<dyn TokenRepository>,
    pub cache: Arc<dyn CacheService>,
    pub uploader: Arc<dyn PhotoUploader>,
    pub geo: Arc<dyn GeoLookup>,
    pub db: Option<Arc<PgPool>>,
}

/// Receiving end of the visit queue, to be handed to
/// [`run_visit_worker`](crate::domain::visit_worker::run_visit_worker).
pub struct VisitQueue {
    pub rx: mpsc::Receiver<VisitJob>,
    pub recorder: Arc<VisitRecorder>,
}

/// Settings that shape the services rather than the backends.
#[derive(Debug, Clone)]
pub struct StateSettings {
    pub recorder: RecorderConfig,
    pub token_signing_secret: String,
    pub visit_queue_capacity: usize,
}

impl AppState {
    /// Wires services over `collaborators`.
    ///
    /// The returned [`VisitQueue`] must be drained by a worker, otherwise
    /// visits pile up until the dispatcher falls back to detached tasks.
    pub fn new(collaborators: Collaborators, settings: StateSettings) -> (Self, VisitQueue) {
        let Collaborators {
            links,
            visits,
            tokens,
            cache,
            uploader,
            geo,
            db,
        } = collaborators;

        let recorder = Arc::new(VisitRecorder::new(
            Arc::clone(&links),
            Arc::clone(&visits),
            uploader,
            geo,
            settings.recorder,
        ));

        let (tx, rx) = mpsc::channel(settings.visit_queue_capacity);
        let visit_dispatcher = VisitDispatcher::new(tx, Arc::clone(&recorder));

        let resolver = Arc::new(ShortCodeResolver::new(Arc::clone(&links), Arc::clone(&cache)));
        let redirect_service = Arc::new(RedirectService::new(
            resolver,
            Arc::clone(&recorder),
            visit_dispatcher.clone(),
        ));

        let state = Self {
            redirect_service,
            link_service: Arc::new(LinkService::new(Arc::clone(&links), Arc::clone(&cache))),
            stats_service: Arc::new(StatsService::new(links, visits)),
            auth_service: Arc::new(AuthService::new(tokens, settings.token_signing_secret)),
            cache,
            visit_dispatcher,
            db,
        };

        (state, VisitQueue { rx, recorder })
    }
}
