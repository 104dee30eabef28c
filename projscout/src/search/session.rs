use serde::Serialize;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicU8, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use tracing::{debug, info, warn};

use super::engine;
use crate::config::ConfigProvider;
use crate::errors::{SearchError, SearchResult};
use crate::metrics::SearchMetrics;
use crate::project::ProjectRegistry;
use crate::publish::ResultPublisher;
use crate::query::SearchQuery;

pub type SessionId = u64;

const WORKER_NAME: &str = "projscout-search";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum SessionState {
    Idle = 0,
    Running = 1,
    Completed = 2,
    Cancelled = 3,
}

impl SessionState {
    fn from_u8(value: u8) -> Self {
        match value {
            1 => SessionState::Running,
            2 => SessionState::Completed,
            3 => SessionState::Cancelled,
            _ => SessionState::Idle,
        }
    }
}

/// How a session ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionOutcome {
    Completed,
    Cancelled,
}

impl From<SessionOutcome> for SessionState {
    fn from(outcome: SessionOutcome) -> Self {
        match outcome {
            SessionOutcome::Completed => SessionState::Completed,
            SessionOutcome::Cancelled => SessionState::Cancelled,
        }
    }
}

/// Runs at most one search at a time on a dedicated worker thread.
///
/// Results reach the front end only through the [`ResultPublisher`] given
/// at construction: `Started`, then one `Batch` per project with hits, then
/// `Finished`.
pub struct SearchSession {
    registry: Arc<dyn ProjectRegistry>,
    config: Arc<dyn ConfigProvider>,
    publisher: ResultPublisher,
    stop: Arc<AtomicBool>,
    state: Arc<AtomicU8>,
    worker: Mutex<Option<JoinHandle<()>>>,
    next_id: AtomicU64,
}

impl SearchSession {
    pub fn new(
        registry: Arc<dyn ProjectRegistry>,
        config: Arc<dyn ConfigProvider>,
        publisher: ResultPublisher,
    ) -> Self {
        Self {
            registry,
            config,
            publisher,
            stop: Arc::new(AtomicBool::new(false)),
            state: Arc::new(AtomicU8::new(SessionState::Idle as u8)),
            worker: Mutex::new(None),
            next_id: AtomicU64::new(1),
        }
    }

    /// Starts a search, or fails with `SessionInProgress` if one is running.
    pub fn start(&self, query: SearchQuery) -> SearchResult<SessionId> {
        let running = SessionState::Running as u8;
        if self
            .state
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |current| {
                (current != running).then_some(running)
            })
            .is_err()
        {
            debug!("Rejecting start: a search is already running");
            return Err(SearchError::SessionInProgress);
        }

        // A finished worker may still be sending its `Finished` event.
        let stale = self.worker.lock().unwrap_or_else(|e| e.into_inner()).take();
        if let Some(stale) = stale {
            if stale.join().is_err() {
                warn!("Previous search worker panicked");
            }
        }

        let session = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.stop.store(false, Ordering::SeqCst);
        self.publisher.started(session);

        let registry = Arc::clone(&self.registry);
        let config = Arc::clone(&self.config);
        let publisher = self.publisher.clone();
        let stop = Arc::clone(&self.stop);
        let state = Arc::clone(&self.state);

        let spawned = thread::Builder::new()
            .name(WORKER_NAME.to_string())
            .spawn(move || {
                let metrics = SearchMetrics::new();
                let result = panic::catch_unwind(AssertUnwindSafe(|| {
                    engine::run(
                        &query,
                        registry.as_ref(),
                        config.as_ref(),
                        &stop,
                        &metrics,
                        |batch| publisher.publish(session, batch),
                    )
                }));
                let outcome = match result {
                    Ok(Ok(())) => SessionOutcome::Completed,
                    Ok(Err(SearchError::Cancelled)) => SessionOutcome::Cancelled,
                    Ok(Err(e)) => {
                        warn!("Search session {} ended early: {}", session, e);
                        SessionOutcome::Completed
                    }
                    Err(_) => {
                        warn!("Search session {} panicked", session);
                        SessionOutcome::Cancelled
                    }
                };

                info!("Search session {} finished: {:?}", session, outcome);
                metrics.log_stats();
                state.store(SessionState::from(outcome) as u8, Ordering::SeqCst);
                publisher.finished(session, outcome, metrics.get_stats());
            });

        match spawned {
            Ok(handle) => {
                *self.worker.lock().unwrap_or_else(|e| e.into_inner()) = Some(handle);
                info!("Search session {} started", session);
                Ok(session)
            }
            Err(e) => {
                self.state
                    .store(SessionState::Idle as u8, Ordering::SeqCst);
                self.publisher.finished(
                    session,
                    SessionOutcome::Cancelled,
                    Default::default(),
                );
                Err(SearchError::IoError(e))
            }
        }
    }

    /// Asks the running search to stop. Batches already published stay valid.
    pub fn stop(&self) {
        if self.is_running() {
            debug!("Stop requested");
            self.stop.store(true, Ordering::SeqCst);
        }
    }

    /// Blocks until the current worker, if any, has exited
    pub fn wait(&self) {
        let handle = self
            .worker
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .take();
        if let Some(handle) = handle {
            if handle.join().is_err() {
                warn!("Search worker panicked");
                self.state
                    .store(SessionState::Idle as u8, Ordering::SeqCst);
            }
        }
    }

    pub fn is_running(&self) -> bool {
        self.state() == SessionState::Running
    }

    pub fn state(&self) -> SessionState {
        SessionState::from_u8(self.state.load(Ordering::SeqCst))
    }
}

impl Drop for SearchSession {
    fn drop(&mut self) {
        self.stop();
    }
}
