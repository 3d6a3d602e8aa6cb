//! Per-phase priority hand-off queues.
//!
//! Each phase owns three unbounded lanes, one per priority class. Senders
//! ([`PhaseIntake`]) are cloned freely; the receiving side ([`PhaseInbox`]) is
//! shared by the phase's workers through the dispatcher.

use garage_core::{Job, Phase, Priority};
use tokio::sync::mpsc;

use crate::error::{EngineError, EngineResult};

/// Anything that can be routed to a priority lane.
pub trait Prioritized {
    fn priority(&self) -> Priority;
}

impl Prioritized for Job {
    fn priority(&self) -> Priority {
        self.priority
    }
}

/// Sending half of a phase's priority channel set.
pub struct PhaseIntake<T> {
    phase: Phase,
    lanes: [mpsc::UnboundedSender<T>; 3],
}

impl<T> Clone for PhaseIntake<T> {
    fn clone(&self) -> Self {
        Self {
            phase: self.phase,
            lanes: self.lanes.clone(),
        }
    }
}

impl<T: Prioritized> PhaseIntake<T> {
    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Place `item` on the lane matching its priority. Never blocks.
    pub fn enqueue(&self, item: T) -> EngineResult<()> {
        let lane = item.priority().lane();
        self.lanes[lane]
            .send(item)
            .map_err(|_| EngineError::IntakeClosed { phase: self.phase })
    }
}

/// Receiving half of a phase's priority channel set.
pub struct PhaseInbox<T> {
    phase: Phase,
    pub(crate) lanes: [mpsc::UnboundedReceiver<T>; 3],
}

impl<T> PhaseInbox<T> {
    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Take a ready item from one lane without waiting.
    pub fn try_take(&mut self, priority: Priority) -> Option<T> {
        self.lanes[priority.lane()].try_recv().ok()
    }

    /// Take the most urgent ready item, if any.
    pub fn sweep(&mut self) -> Option<T> {
        Priority::DESCENDING
            .into_iter()
            .find_map(|priority| self.try_take(priority))
    }

    /// Items waiting across all lanes.
    pub fn len(&self) -> usize {
        self.lanes.iter().map(|lane| lane.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Stop accepting new items. Items already queued can still be taken.
    pub fn close(&mut self) {
        for lane in &mut self.lanes {
            lane.close();
        }
    }
}

/// Create the three-lane channel set for `phase`.
pub fn priority_channels<T>(phase: Phase) -> (PhaseIntake<T>, PhaseInbox<T>) {
    let (high_tx, high_rx) = mpsc::unbounded_channel();
    let (medium_tx, medium_rx) = mpsc::unbounded_channel();
    let (low_tx, low_rx) = mpsc::unbounded_channel();
    (
        PhaseIntake {
            phase,
            lanes: [high_tx, medium_tx, low_tx],
        },
        PhaseInbox {
            phase,
            lanes: [high_rx, medium_rx, low_rx],
        },
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use garage_core::{IssueCategory, JobId};
    use std::time::Duration;

    fn job(id: u64, category: IssueCategory) -> Job {
        Job::new(JobId(id), category, Duration::from_secs(1))
    }

    #[test]
    fn jobs_land_on_their_priority_lane() {
        let (intake, mut inbox) = priority_channels(Phase::Repair);
        intake.enqueue(job(1, IssueCategory::Bodywork)).expect("open");
        intake.enqueue(job(2, IssueCategory::Mechanical)).expect("open");

        assert_eq!(inbox.len(), 2);
        assert!(inbox.try_take(Priority::Medium).is_none());
        assert_eq!(inbox.try_take(Priority::Low).map(|j| j.id), Some(JobId(1)));
        assert_eq!(inbox.sweep().map(|j| j.id), Some(JobId(2)));
        assert!(inbox.is_empty());
    }

    #[test]
    fn closed_inbox_rejects_new_jobs_but_keeps_queued_ones() {
        let (intake, mut inbox) = priority_channels(Phase::Cleaning);
        intake.enqueue(job(1, IssueCategory::Electrical)).expect("open");
        inbox.close();

        let err = intake
            .enqueue(job(2, IssueCategory::Electrical))
            .expect_err("closed");
        assert!(matches!(
            err,
            EngineError::IntakeClosed {
                phase: Phase::Cleaning
            }
        ));
        assert_eq!(inbox.sweep().map(|j| j.id), Some(JobId(1)));
    }
}
