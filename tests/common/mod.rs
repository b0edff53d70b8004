#![allow(dead_code)]

use axum::Router;
use axum::extract::ConnectInfo;
use axum_test::TestServer;
use serde_json::{Value, json};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tower::Layer;

use link_tracker::application::services::{RecorderConfig, hash_token};
use link_tracker::domain::entities::{
    DeviceInfo, Link, NewLink, NewVisit, ReferrerInfo, Visit,
};
use link_tracker::domain::repositories::{LinkRepository, TokenRepository, VisitRepository};
use link_tracker::domain::visit_worker::run_visit_worker;
use link_tracker::infrastructure::cache::NullCache;
use link_tracker::infrastructure::geo::NoopGeoLookup;
use link_tracker::infrastructure::memory::{
    MemoryLinkRepository, MemoryStore, MemoryTokenRepository, MemoryVisitRepository,
};
use link_tracker::infrastructure::upload::DisabledPhotoUploader;
use link_tracker::routes::{RouterOptions, app_router};
use link_tracker::state::{AppState, Collaborators, StateSettings};

pub const SIGNING_SECRET: &str = "test-signing-secret";
/// Token of owner 1.
pub const OWNER_TOKEN: &str = "owner-one-token";
/// Token of owner 2.
pub const OTHER_TOKEN: &str = "owner-two-token";
pub const PEER: &str = "10.0.0.7:40000";

#[derive(Clone)]
pub struct MockConnectInfoLayer;

impl<S> Layer<S> for MockConnectInfoLayer {
    type Service = MockConnectInfoService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        MockConnectInfoService { inner }
    }
}

#[derive(Clone)]
pub struct MockConnectInfoService<S> {
    inner: S,
}

impl<S, B> tower::Service<axum::http::Request<B>> for MockConnectInfoService<S>
where
    S: tower::Service<axum::http::Request<B>> + Clone + Send + 'static,
    S::Future: Send + 'static,
    B: Send + 'static,
{
    type Response = S::Response;
    type Error = S::Error;
    type Future = S::Future;

    fn poll_ready(
        &mut self,
        cx: &mut std::task::Context<'_>,
    ) -> std::task::Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, mut req: axum::http::Request<B>) -> Self::Future {
        let addr: SocketAddr = PEER.parse().unwrap();
        req.extensions_mut().insert(ConnectInfo(addr));
        self.inner.call(req)
    }
}

/// A full application over the in-memory backend with a running visit worker.
pub struct TestApp {
    pub server: TestServer,
    pub store: Arc<MemoryStore>,
    pub links: Arc<MemoryLinkRepository>,
    pub visits: Arc<MemoryVisitRepository>,
}

pub async fn spawn_app() -> TestApp {
    let store = Arc::new(MemoryStore::new());
    let links = Arc::new(MemoryLinkRepository::new(Arc::clone(&store)));
    let visits = Arc::new(MemoryVisitRepository::new(Arc::clone(&store)));
    let tokens = Arc::new(MemoryTokenRepository::new(Arc::clone(&store)));

    tokens
        .create_token("owner one", 1, &hash_token(SIGNING_SECRET, OWNER_TOKEN))
        .await
        .unwrap();
    tokens
        .create_token("owner two", 2, &hash_token(SIGNING_SECRET, OTHER_TOKEN))
        .await
        .unwrap();

    let collaborators = Collaborators {
        links: links.clone(),
        visits: visits.clone(),
        tokens,
        cache: Arc::new(NullCache::new()),
        uploader: Arc::new(DisabledPhotoUploader),
        geo: Arc::new(NoopGeoLookup),
        db: None,
    };
    let settings = StateSettings {
        recorder: RecorderConfig::default(),
        token_signing_secret: SIGNING_SECRET.to_string(),
        visit_queue_capacity: 1000,
    };

    let (state, queue): (AppState, _) = AppState::new(collaborators, settings);
    tokio::spawn(run_visit_worker(queue.rx, queue.recorder, 4));

    let app = Router::new()
        .fallback_service(app_router(state, RouterOptions::default()))
        .layer(MockConnectInfoLayer);

    TestApp {
        server: TestServer::new(app).unwrap(),
        store,
        links,
        visits,
    }
}

impl TestApp {
    /// Inserts a link directly into storage.
    pub async fn seed_link(&self, code: &str, destination: &str, owner_id: i64) -> Link {
        self.links
            .create(NewLink {
                code: code.to_string(),
                destination: destination.to_string(),
                domain: None,
                owner_id,
                camera_enabled: false,
                location_enabled: false,
            })
            .await
            .unwrap()
    }

    /// Inserts `count` visits for `link_id` directly into storage.
    pub async fn seed_visits(&self, link_id: i64, count: usize) -> Vec<Visit> {
        let mut created = Vec::with_capacity(count);
        for i in 0..count {
            let visit = self
                .visits
                .create(NewVisit {
                    link_id,
                    public_ip: format!("203.0.113.{}", i % 250),
                    internal_ip: None,
                    session_id: format!("session-{i}"),
                    device: DeviceInfo::default(),
                    referrer: ReferrerInfo::default(),
                    headers: json!({}),
                    geo: None,
                    photo_url: None,
                    location: None,
                })
                .await
                .unwrap();
            created.push(visit);
        }
        created
    }

    pub async fn link(&self, id: i64) -> Link {
        self.links.find_by_id(id).await.unwrap().unwrap()
    }

    /// Stored visits of a link, newest first.
    pub async fn visits_of(&self, link_id: i64) -> Vec<Visit> {
        self.visits.paginate(link_id, 0, 500).await.unwrap()
    }

    /// Waits for the background worker to bring the counter of `link_id` to
    /// `expected`, returning the last value seen.
    pub async fn wait_for_clicks(&self, link_id: i64, expected: i64) -> i64 {
        for _ in 0..200 {
            let count = self.link(link_id).await.click_count;
            if count == expected {
                return count;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        self.link(link_id).await.click_count
    }

    /// Creates a link through the API as owner 1 and returns the response body.
    pub async fn create_link(&self, body: Value) -> Value {
        let response = self
            .server
            .post("/api/links")
            .authorization_bearer(OWNER_TOKEN)
            .json(&body)
            .await;
        response.assert_status(axum::http::StatusCode::CREATED);
        response.json::<Value>()
    }
}

/// Polls `condition` until it holds or two seconds pass.
pub async fn eventually<F>(mut condition: F) -> bool
where
    F: FnMut() -> bool,
{
    for _ in 0..200 {
        if condition() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    condition()
}
