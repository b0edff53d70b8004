//! Redirect orchestration for the visitor-facing routes.

use axum::http::Method;
use serde::Serialize;
use std::sync::Arc;
use tracing::debug;

use crate::application::services::recorder::{CapturePayload, VisitJob, VisitRecorder};
use crate::application::services::resolver::{RedirectStrategy, ResolvedLink, ShortCodeResolver};
use crate::domain::tracking_context::TrackingContext;
use crate::domain::visit_worker::VisitDispatcher;
use crate::error::AppError;

/// How the visitor should be sent on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RedirectOutcome {
    /// `302 Found` with `Location: location`.
    Standard { location: String },
    /// Bounce page that navigates to `destination` without a referrer.
    ClientSide { destination: String },
}

/// Response of the tracking-only entry point.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TrackAck {
    pub success: bool,
    pub visit_id: Option<i64>,
    pub click_counted: bool,
}

/// Side-effect-free description of where a code leads.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DestinationInfo {
    pub destination: String,
    pub camera_enabled: bool,
    pub location_enabled: bool,
    pub requires_client_navigation: bool,
}

pub struct RedirectService {
    resolver: Arc<ShortCodeResolver>,
    recorder: Arc<VisitRecorder>,
    dispatcher: VisitDispatcher,
}

impl RedirectService {
    pub fn new(
        resolver: Arc<ShortCodeResolver>,
        recorder: Arc<VisitRecorder>,
        dispatcher: VisitDispatcher,
    ) -> Self {
        Self {
            resolver,
            recorder,
            dispatcher,
        }
    }

    /// Resolves `code`, queues the visit and picks the redirect form.
    ///
    /// Recording happens in the background; the outcome never waits for it.
    ///
    /// # Errors
    ///
    /// [`AppError::NotFound`] for unknown codes (nothing is recorded);
    /// [`AppError::Internal`] if the link store fails.
    pub async fn redirect(
        &self,
        code: &str,
        context: TrackingContext,
        method: Method,
        capture: Option<CapturePayload>,
    ) -> Result<RedirectOutcome, AppError> {
        let resolved = self.resolver.resolve(code).await?;
        let ResolvedLink {
            link,
            destination,
            strategy,
        } = resolved;

        debug!(code, link_id = link.id, ?strategy, "Redirecting");

        self.dispatcher.dispatch(VisitJob {
            link,
            context,
            method,
            capture,
        });

        Ok(match strategy {
            RedirectStrategy::Standard => RedirectOutcome::Standard {
                location: destination,
            },
            RedirectStrategy::ClientSide => RedirectOutcome::ClientSide { destination },
        })
    }

    /// Records a visit synchronously without redirecting.
    ///
    /// `success` is true when the visit row was written.
    pub async fn track(
        &self,
        code: &str,
        context: TrackingContext,
        method: Method,
        capture: Option<CapturePayload>,
    ) -> Result<TrackAck, AppError> {
        let resolved = self.resolver.resolve(code).await?;

        let outcome = self
            .recorder
            .record(VisitJob {
                link: resolved.link,
                context,
                method,
                capture,
            })
            .await;

        Ok(TrackAck {
            success: outcome.visit_id.is_some(),
            visit_id: outcome.visit_id,
            click_counted: outcome.click_counted,
        })
    }

    /// Describes the destination of `code` without recording anything.
    pub async fn destination(&self, code: &str) -> Result<DestinationInfo, AppError> {
        let resolved = self.resolver.resolve(code).await?;

        Ok(DestinationInfo {
            requires_client_navigation: resolved.strategy == RedirectStrategy::ClientSide,
            destination: resolved.destination,
            camera_enabled: resolved.link.camera_enabled,
            location_enabled: resolved.link.location_enabled,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::services::recorder::RecorderConfig;
    use crate::domain::entities::Link;
    use crate::domain::repositories::{MockLinkRepository, MockVisitRepository};
    use crate::infrastructure::cache::NullCache;
    use crate::infrastructure::geo::NoopGeoLookup;
    use crate::infrastructure::upload::DisabledPhotoUploader;
    use chrono::Utc;
    use serde_json::json;
    use tokio::sync::mpsc;

    fn link(code: &str, destination: &str) -> Link {
        let now = Utc::now();
        Link {
            id: 3,
            code: code.to_string(),
            destination: destination.to_string(),
            domain: None,
            owner_id: 1,
            camera_enabled: true,
            location_enabled: false,
            click_count: 0,
            is_active: true,
            created_at: now,
            updated_at: now,
        }
    }

    fn service(
        links: MockLinkRepository,
        visits: MockVisitRepository,
    ) -> (RedirectService, mpsc::Receiver<VisitJob>) {
        let links = Arc::new(links);
        let resolver = Arc::new(ShortCodeResolver::new(links.clone(), Arc::new(NullCache::new())));
        let recorder = Arc::new(VisitRecorder::new(
            links,
            Arc::new(visits),
            Arc::new(DisabledPhotoUploader),
            Arc::new(NoopGeoLookup),
            RecorderConfig::default(),
        ));
        let (tx, rx) = mpsc::channel(8);
        let dispatcher = VisitDispatcher::new(tx, Arc::clone(&recorder));

        (RedirectService::new(resolver, recorder, dispatcher), rx)
    }

    #[tokio::test]
    async fn test_redirect_queues_visit_and_returns_location() {
        let mut links = MockLinkRepository::new();
        links
            .expect_find_by_code()
            .returning(|code| Ok(Some(link(code, "example.com/landing"))));
        links.expect_increment_clicks().times(0);

        let (service, mut rx) = service(links, MockVisitRepository::new());

        let outcome = service
            .redirect("abc", TrackingContext::default(), Method::GET, None)
            .await
            .unwrap();

        assert_eq!(
            outcome,
            RedirectOutcome::Standard {
                location: "https://example.com/landing".to_string()
            }
        );

        let job = rx.try_recv().unwrap();
        assert_eq!(job.link.code, "abc");
        assert_eq!(job.method, Method::GET);
    }

    #[tokio::test]
    async fn test_redirect_sensitive_destination() {
        let mut links = MockLinkRepository::new();
        links
            .expect_find_by_code()
            .returning(|code| Ok(Some(link(code, "https://accounts.google.com/signin"))));

        let (service, mut rx) = service(links, MockVisitRepository::new());

        let outcome = service
            .redirect("sso", TrackingContext::default(), Method::GET, None)
            .await
            .unwrap();

        assert_eq!(
            outcome,
            RedirectOutcome::ClientSide {
                destination: "https://accounts.google.com/signin".to_string()
            }
        );
        assert!(rx.try_recv().is_ok());
    }

    #[tokio::test]
    async fn test_redirect_unknown_code_records_nothing() {
        let mut links = MockLinkRepository::new();
        links.expect_find_by_code().returning(|_| Ok(None));

        let (service, mut rx) = service(links, MockVisitRepository::new());

        let err = service
            .redirect("missing", TrackingContext::default(), Method::GET, None)
            .await
            .unwrap_err();

        assert!(err.is_not_found());
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_track_records_synchronously() {
        let mut links = MockLinkRepository::new();
        links
            .expect_find_by_code()
            .returning(|code| Ok(Some(link(code, "example.com"))));
        links.expect_increment_clicks().times(1).returning(|_| Ok(()));

        let mut visits = MockVisitRepository::new();
        visits
            .expect_create()
            .times(1)
            .returning(|v| Ok(v.into_visit(77, Utc::now())));

        let (service, mut rx) = service(links, visits);

        let ack = service
            .track("abc", TrackingContext::default(), Method::POST, None)
            .await
            .unwrap();

        assert_eq!(
            ack,
            TrackAck {
                success: true,
                visit_id: Some(77),
                click_counted: true,
            }
        );
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_track_reports_failed_visit() {
        let mut links = MockLinkRepository::new();
        links
            .expect_find_by_code()
            .returning(|code| Ok(Some(link(code, "example.com"))));
        links.expect_increment_clicks().returning(|_| Ok(()));

        let mut visits = MockVisitRepository::new();
        visits
            .expect_create()
            .returning(|_| Err(AppError::bad_request("gone", json!({}))));

        let (service, _rx) = service(links, visits);

        let ack = service
            .track("abc", TrackingContext::default(), Method::POST, None)
            .await
            .unwrap();

        assert!(!ack.success);
        assert!(ack.click_counted);
    }

    #[tokio::test]
    async fn test_destination_has_no_side_effects() {
        let mut links = MockLinkRepository::new();
        links
            .expect_find_by_code()
            .times(2)
            .returning(|code| Ok(Some(link(code, "login.example.org/start"))));
        links.expect_increment_clicks().times(0);

        let mut visits = MockVisitRepository::new();
        visits.expect_create().times(0);

        let (service, mut rx) = service(links, visits);

        let first = service.destination("abc").await.unwrap();
        let second = service.destination("abc").await.unwrap();

        assert_eq!(first, second);
        assert_eq!(first.destination, "https://login.example.org/start");
        assert!(first.camera_enabled);
        assert!(!first.location_enabled);
        assert!(first.requires_client_navigation);
        assert!(rx.try_recv().is_err());
    }
}
