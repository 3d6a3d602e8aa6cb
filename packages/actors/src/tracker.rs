//! Counted barrier over the jobs in flight.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use garage_core::{Job, JobId, Priority};
use tokio::sync::watch;

/// Tracks admitted jobs until each one leaves the terminal phase.
#[derive(Debug, Clone)]
pub struct CompletionTracker {
    inner: Arc<TrackerInner>,
}

#[derive(Debug)]
struct TrackerInner {
    in_flight: watch::Sender<usize>,
    admitted: AtomicU64,
    abandoned: AtomicU64,
    completed: [AtomicU64; 3],
}

impl TrackerInner {
    fn settle(&self, priority: Priority, finished: bool) {
        if finished {
            self.completed[priority.lane()].fetch_add(1, Ordering::SeqCst);
        } else {
            self.abandoned.fetch_add(1, Ordering::SeqCst);
        }
        self.in_flight.send_modify(|count| {
            debug_assert!(*count > 0, "completion tracker underflow");
            *count = count.saturating_sub(1);
        });
    }
}

/// Proof that a job was counted in. Consumed by [`CompletionTicket::done`].
///
/// A ticket dropped without `done` marks its job abandoned, so the barrier
/// still opens.
#[derive(Debug)]
pub struct CompletionTicket {
    tracker: Arc<TrackerInner>,
    job_id: JobId,
    priority: Priority,
    finished: bool,
}

impl CompletionTicket {
    pub fn job_id(&self) -> JobId {
        self.job_id
    }

    /// Record that the job finished every phase.
    pub fn done(mut self) {
        self.finished = true;
    }
}

impl Drop for CompletionTicket {
    fn drop(&mut self) {
        if !self.finished {
            tracing::warn!(job_id = %self.job_id, "Job abandoned before completion");
        }
        self.tracker.settle(self.priority, self.finished);
    }
}

impl Default for CompletionTracker {
    fn default() -> Self {
        Self::new()
    }
}

impl CompletionTracker {
    pub fn new() -> Self {
        let (in_flight, _) = watch::channel(0);
        Self {
            inner: Arc::new(TrackerInner {
                in_flight,
                admitted: AtomicU64::new(0),
                abandoned: AtomicU64::new(0),
                completed: [AtomicU64::new(0), AtomicU64::new(0), AtomicU64::new(0)],
            }),
        }
    }

    /// Count `job` in.
    pub fn add(&self, job: &Job) -> CompletionTicket {
        self.inner.admitted.fetch_add(1, Ordering::SeqCst);
        self.inner.in_flight.send_modify(|count| *count += 1);
        CompletionTicket {
            tracker: Arc::clone(&self.inner),
            job_id: job.id,
            priority: job.priority,
            finished: false,
        }
    }

    /// Wait until every counted-in job has settled.
    pub async fn wait(&self) {
        let mut rx = self.inner.in_flight.subscribe();
        // The sender lives as long as `self`, so this cannot fail.
        let _ = rx.wait_for(|count| *count == 0).await;
    }

    pub fn in_flight(&self) -> usize {
        *self.inner.in_flight.borrow()
    }

    pub fn admitted(&self) -> u64 {
        self.inner.admitted.load(Ordering::SeqCst)
    }

    pub fn completed(&self) -> u64 {
        Priority::DESCENDING
            .into_iter()
            .map(|p| self.completed_with(p))
            .sum()
    }

    pub fn completed_with(&self, priority: Priority) -> u64 {
        self.inner.completed[priority.lane()].load(Ordering::SeqCst)
    }

    pub fn abandoned(&self) -> u64 {
        self.inner.abandoned.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use garage_core::IssueCategory;
    use std::time::Duration;

    fn job(id: u64, category: IssueCategory) -> Job {
        Job::new(JobId(id), category, Duration::from_millis(1))
    }

    #[tokio::test]
    async fn wait_returns_immediately_when_nothing_is_in_flight() {
        CompletionTracker::new().wait().await;
    }

    #[tokio::test]
    async fn wait_returns_after_every_ticket_is_done() {
        let tracker = CompletionTracker::new();
        let tickets: Vec<_> = (0..3)
            .map(|i| tracker.add(&job(i, IssueCategory::Mechanical)))
            .collect();
        assert_eq!(tracker.in_flight(), 3);

        let waiter = {
            let tracker = tracker.clone();
            tokio::spawn(async move { tracker.wait().await })
        };
        for ticket in tickets {
            tokio::spawn(async move { ticket.done() });
        }
        waiter.await.expect("waiter finished");
        assert_eq!(tracker.completed(), 3);
        assert_eq!(tracker.completed_with(Priority::High), 3);
        assert_eq!(tracker.admitted(), 3);
    }

    #[tokio::test]
    async fn dropped_ticket_counts_as_abandoned() {
        let tracker = CompletionTracker::new();
        let ticket = tracker.add(&job(1, IssueCategory::Bodywork));
        drop(ticket);
        tracker.wait().await;
        assert_eq!(tracker.abandoned(), 1);
        assert_eq!(tracker.completed(), 0);
    }
}
