//! # Background Task Tracker
//!
//! Fire-and-forget execution with two guarantees: a panicking task is
//! contained and logged rather than crashing the process, and [`drain`]
//! does not return while any scheduled task is still outstanding. Tasks run
//! concurrently with no ordering relative to each other or to the request
//! that scheduled them.
//!
//! [`drain`]: TaskTracker::drain

use std::future::Future;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use tokio::sync::Notify;

/// Counts outstanding background tasks. Cheap to clone; all clones share the
/// same counter.
#[derive(Debug, Clone, Default)]
pub struct TaskTracker {
    inner: Arc<TrackerInner>,
}

#[derive(Debug, Default)]
struct TrackerInner {
    outstanding: AtomicUsize,
    drained: Notify,
}

impl TaskTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Schedule `task` for out-of-band execution and return immediately.
    /// The task counts as outstanding from this call until it completes or
    /// panics.
    pub fn spawn<F>(&self, task: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        self.inner.outstanding.fetch_add(1, Ordering::AcqRel);
        let inner = Arc::clone(&self.inner);
        tokio::spawn(async move {
            // The nested spawn is what contains the panic: the JoinError
            // surfaces here instead of unwinding anything.
            if let Err(err) = tokio::spawn(task).await {
                if err.is_panic() {
                    tracing::error!(error = %err, "background task panicked");
                }
            }
            inner.outstanding.fetch_sub(1, Ordering::AcqRel);
            inner.drained.notify_waiters();
        });
    }

    /// Number of tasks scheduled but not yet finished.
    pub fn in_flight(&self) -> usize {
        self.inner.outstanding.load(Ordering::Acquire)
    }

    /// Wait until every scheduled task has finished, successfully or via a
    /// caught panic. Returns immediately when nothing is outstanding.
    pub async fn drain(&self) {
        loop {
            // Register interest before re-checking the counter so a task
            // finishing in between cannot be missed.
            let notified = self.inner.drained.notified();
            if self.in_flight() == 0 {
                return;
            }
            notified.await;
        }
    }
}
