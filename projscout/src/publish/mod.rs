//! Hand-off of search events from the worker thread to the presentation thread.
//!
//! The worker owns a [`ResultPublisher`] and the front end owns the matching
//! [`EventReceiver`]. Every event is moved through an `mpsc` channel, so the
//! worker never waits on the front end and never keeps a reference to
//! anything it has published.
pub mod tree;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender, TryRecvError};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, trace, warn};

use crate::metrics::SessionStats;
use crate::results::ProjectBatch;
use crate::search::session::{SessionId, SessionOutcome};

pub use tree::{NavigateTo, NodeId, NodeKind, ResultTree, TreeNode};

/// Messages sent from a running session to the front end, in order
#[derive(Debug, Clone, PartialEq)]
pub enum SearchEvent {
    /// A new session began; the previous results are stale
    Started { session: SessionId },
    /// All hits for one project
    Batch {
        session: SessionId,
        batch: ProjectBatch,
    },
    /// The session ended; no further events carry this id
    Finished {
        session: SessionId,
        outcome: SessionOutcome,
        stats: SessionStats,
    },
}

impl SearchEvent {
    pub fn session(&self) -> SessionId {
        match self {
            SearchEvent::Started { session }
            | SearchEvent::Batch { session, .. }
            | SearchEvent::Finished { session, .. } => *session,
        }
    }
}

/// Creates a connected publisher/receiver pair
pub fn channel() -> (ResultPublisher, EventReceiver) {
    let (tx, rx) = mpsc::channel();
    (
        ResultPublisher {
            tx,
            receiver_gone: Arc::new(AtomicBool::new(false)),
        },
        EventReceiver { rx },
    )
}

/// Sending half, cloned into each worker thread.
#[derive(Debug, Clone)]
pub struct ResultPublisher {
    tx: Sender<SearchEvent>,
    receiver_gone: Arc<AtomicBool>,
}

impl ResultPublisher {
    pub fn started(&self, session: SessionId) {
        self.send(SearchEvent::Started { session });
    }

    pub fn publish(&self, session: SessionId, batch: ProjectBatch) {
        trace!(
            "Publishing batch for {} ({} files)",
            batch.project_id,
            batch.files.len()
        );
        self.send(SearchEvent::Batch { session, batch });
    }

    pub fn finished(&self, session: SessionId, outcome: SessionOutcome, stats: SessionStats) {
        self.send(SearchEvent::Finished {
            session,
            outcome,
            stats,
        });
    }

    fn send(&self, event: SearchEvent) {
        if self.tx.send(event).is_err() && !self.receiver_gone.swap(true, Ordering::Relaxed) {
            warn!("Result receiver dropped; further search events are discarded");
        }
    }
}

/// Receiving half, owned by the presentation thread.
#[derive(Debug)]
pub struct EventReceiver {
    rx: Receiver<SearchEvent>,
}

impl EventReceiver {
    /// Applies every pending event to `tree` without blocking.
    ///
    /// Meant to be called from an event-loop tick. Returns how many events
    /// were applied.
    pub fn drain_into(&self, tree: &mut ResultTree) -> usize {
        let mut applied = 0;
        loop {
            match self.rx.try_recv() {
                Ok(event) => {
                    tree.apply(event);
                    applied += 1;
                }
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => {
                    debug!("All publishers dropped");
                    break;
                }
            }
        }
        applied
    }

    /// Waits up to `timeout` for the next event
    pub fn recv_timeout(&self, timeout: Duration) -> Option<SearchEvent> {
        match self.rx.recv_timeout(timeout) {
            Ok(event) => Some(event),
            Err(RecvTimeoutError::Timeout) | Err(RecvTimeoutError::Disconnected) => None,
        }
    }

    pub fn try_recv(&self) -> Option<SearchEvent> {
        self.rx.try_recv().ok()
    }
}
