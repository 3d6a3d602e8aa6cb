//! Strict-priority job selection for a phase's workers.

use std::sync::Arc;

use garage_core::{Phase, Priority};
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;

use crate::channels::PhaseInbox;

/// Picks the next job for a worker from its phase's inbox.
///
/// Workers of the same phase share one dispatcher; only one of them waits on
/// the inbox at a time, the others queue on the inbox lock.
pub struct PhaseDispatcher<T> {
    phase: Phase,
    inbox: Arc<Mutex<PhaseInbox<T>>>,
    stop: CancellationToken,
}

impl<T> Clone for PhaseDispatcher<T> {
    fn clone(&self) -> Self {
        Self {
            phase: self.phase,
            inbox: Arc::clone(&self.inbox),
            stop: self.stop.clone(),
        }
    }
}

impl<T> PhaseDispatcher<T> {
    pub fn new(inbox: PhaseInbox<T>, stop: CancellationToken) -> Self {
        Self {
            phase: inbox.phase(),
            inbox: Arc::new(Mutex::new(inbox)),
            stop,
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Next job for the calling worker, or `None` once stop has been signalled.
    ///
    /// A ready High job is returned before anything else, then a ready Medium
    /// job. Otherwise the caller waits on all three lanes and the stop signal
    /// together; when several of those become ready at once the winner is
    /// arbitrary, so a Low job can beat a High job that arrived in the same
    /// instant. Before giving up on stop, the lanes are swept once more so a
    /// job enqueued ahead of the stop is never dropped.
    pub async fn dispatch(&self) -> Option<T> {
        let mut inbox = self.inbox.lock().await;
        if self.stop.is_cancelled() {
            return inbox.sweep();
        }

        if let Some(item) = inbox.try_take(Priority::High) {
            return Some(item);
        }
        if let Some(item) = inbox.try_take(Priority::Medium) {
            return Some(item);
        }

        let [high, medium, low] = &mut inbox.lanes;
        let fired = tokio::select! {
            Some(item) = high.recv() => Some(item),
            Some(item) = medium.recv() => Some(item),
            Some(item) = low.recv() => Some(item),
            _ = self.stop.cancelled() => None,
        };

        match fired {
            Some(item) => Some(item),
            None => {
                let leftover = inbox.sweep();
                if leftover.is_none() {
                    tracing::trace!(phase = %self.phase, "Dispatcher stopped");
                }
                leftover
            }
        }
    }

    /// Close the underlying inbox. Call once every worker has exited.
    pub async fn close(&self) {
        self.inbox.lock().await.close();
    }

    /// Jobs currently waiting in this phase.
    pub async fn waiting(&self) -> usize {
        self.inbox.lock().await.len()
    }
}
