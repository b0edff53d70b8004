//! Background recording of visits.
//!
//! Redirect handlers hand a [`VisitJob`] to the [`VisitDispatcher`] and return
//! immediately. [`run_visit_worker`] drains the queue and runs the recorder
//! for each job on its own task, with at most `concurrency` jobs in flight.

use std::sync::Arc;
use tokio::sync::{Semaphore, mpsc, mpsc::error::TrySendError};
use tracing::{info, warn};

use crate::application::services::recorder::{VisitJob, VisitRecorder};

/// Non-blocking handle for queueing visit jobs.
#[derive(Clone)]
pub struct VisitDispatcher {
    tx: mpsc::Sender<VisitJob>,
    recorder: Arc<VisitRecorder>,
}

impl VisitDispatcher {
    pub fn new(tx: mpsc::Sender<VisitJob>, recorder: Arc<VisitRecorder>) -> Self {
        Self { tx, recorder }
    }

    /// Queues `job` without waiting.
    ///
    /// When the queue is full or the worker has stopped, the job runs on a
    /// detached task instead so the click is still counted.
    pub fn dispatch(&self, job: VisitJob) {
        let job = match self.tx.try_send(job) {
            Ok(()) => return,
            Err(TrySendError::Full(job)) => {
                metrics::counter!("visit_queue_overflow_total").increment(1);
                warn!(link_id = job.link.id, "Visit queue full, recording on a detached task");
                job
            }
            Err(TrySendError::Closed(job)) => {
                warn!(link_id = job.link.id, "Visit worker stopped, recording on a detached task");
                job
            }
        };

        let recorder = Arc::clone(&self.recorder);
        tokio::spawn(async move {
            recorder.record(job).await;
        });
    }

    /// True once the worker has dropped its receiver.
    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }

    /// Free slots left in the queue.
    pub fn capacity(&self) -> usize {
        self.tx.capacity()
    }
}

/// Drains `rx` until every sender is dropped, then waits for in-flight jobs.
pub async fn run_visit_worker(
    mut rx: mpsc::Receiver<VisitJob>,
    recorder: Arc<VisitRecorder>,
    concurrency: usize,
) {
    let concurrency = concurrency.max(1);
    let semaphore = Arc::new(Semaphore::new(concurrency));
    info!(concurrency, "Visit worker started");

    while let Some(job) = rx.recv().await {
        let Ok(permit) = Arc::clone(&semaphore).acquire_owned().await else {
            break;
        };
        let recorder = Arc::clone(&recorder);

        tokio::spawn(async move {
            let _permit = permit;
            recorder.record(job).await;
        });
    }

    let _ = semaphore.acquire_many(concurrency as u32).await;
    info!("Visit worker stopped");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::services::recorder::RecorderConfig;
    use crate::domain::entities::NewLink;
    use crate::domain::repositories::LinkRepository;
    use crate::domain::tracking_context::TrackingContext;
    use crate::infrastructure::geo::NoopGeoLookup;
    use crate::infrastructure::memory::{MemoryLinkRepository, MemoryStore, MemoryVisitRepository};
    use crate::infrastructure::upload::DisabledPhotoUploader;
    use axum::http::Method;
    use std::time::Duration;

    async fn setup() -> (Arc<MemoryStore>, Arc<MemoryLinkRepository>, Arc<VisitRecorder>, VisitJob) {
        let store = Arc::new(MemoryStore::new());
        let links = Arc::new(MemoryLinkRepository::new(Arc::clone(&store)));
        let link = links
            .create(NewLink {
                code: "q".into(),
                destination: "example.com".into(),
                domain: None,
                owner_id: 1,
                camera_enabled: false,
                location_enabled: false,
            })
            .await
            .unwrap();

        let recorder = Arc::new(VisitRecorder::new(
            links.clone(),
            Arc::new(MemoryVisitRepository::new(Arc::clone(&store))),
            Arc::new(DisabledPhotoUploader),
            Arc::new(NoopGeoLookup),
            RecorderConfig::default(),
        ));

        let job = VisitJob {
            link,
            context: TrackingContext::default(),
            method: Method::GET,
            capture: None,
        };

        (store, links, recorder, job)
    }

    async fn wait_for_clicks(links: &MemoryLinkRepository, expected: i64) -> i64 {
        for _ in 0..100 {
            let count = links.find_by_code("q").await.unwrap().unwrap().click_count;
            if count == expected {
                return count;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        links.find_by_code("q").await.unwrap().unwrap().click_count
    }

    #[tokio::test]
    async fn test_worker_records_queued_jobs() {
        let (store, links, recorder, job) = setup().await;
        let (tx, rx) = mpsc::channel(16);
        let dispatcher = VisitDispatcher::new(tx, Arc::clone(&recorder));

        let worker = tokio::spawn(run_visit_worker(rx, recorder, 4));
        for _ in 0..10 {
            dispatcher.dispatch(job.clone());
        }
        drop(dispatcher);
        worker.await.unwrap();

        assert_eq!(wait_for_clicks(&links, 10).await, 10);
        assert_eq!(store.visit_count(), 10);
    }

    #[tokio::test]
    async fn test_overflow_is_recorded_on_detached_task() {
        let (store, links, recorder, job) = setup().await;
        let (tx, rx) = mpsc::channel(1);
        let dispatcher = VisitDispatcher::new(tx, Arc::clone(&recorder));

        // No worker yet: one job fits, the other two overflow.
        for _ in 0..3 {
            dispatcher.dispatch(job.clone());
        }
        assert_eq!(wait_for_clicks(&links, 2).await, 2);

        drop(dispatcher);
        run_visit_worker(rx, recorder, 1).await;

        assert_eq!(wait_for_clicks(&links, 3).await, 3);
        assert_eq!(store.visit_count(), 3);
    }

    #[tokio::test]
    async fn test_closed_queue_still_records() {
        let (_store, links, recorder, job) = setup().await;
        let (tx, rx) = mpsc::channel(4);
        drop(rx);

        VisitDispatcher::new(tx, recorder).dispatch(job);
        assert_eq!(wait_for_clicks(&links, 1).await, 1);
    }
}
