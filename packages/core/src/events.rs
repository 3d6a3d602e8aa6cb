//! Lifecycle events emitted by phase workers.

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{IssueCategory, Job, JobId, Phase, Priority};

/// Whether a job is entering or leaving a phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventStatus {
    Entering,
    Leaving,
}

impl EventStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventStatus::Entering => "entering",
            EventStatus::Leaving => "leaving",
        }
    }
}

impl std::fmt::Display for EventStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A job crossing a phase boundary, as seen by the worker that owns it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PhaseEvent {
    /// Time since the job was admitted.
    pub elapsed: Duration,
    pub job_id: JobId,
    pub phase: Phase,
    pub status: EventStatus,
    pub priority: Priority,
    pub category: IssueCategory,
    /// Wall-clock time the event was produced.
    pub timestamp: DateTime<Utc>,
}

impl PhaseEvent {
    /// Build an event for `job` at `phase`, with `elapsed` measured by the caller.
    pub fn new(job: &Job, phase: Phase, status: EventStatus, elapsed: Duration) -> Self {
        Self {
            elapsed,
            job_id: job.id,
            phase,
            status,
            priority: job.priority,
            category: job.category,
            timestamp: Utc::now(),
        }
    }

    /// Get a short description of this event for logging.
    pub fn description(&self) -> String {
        format!(
            "Job {} ({}) {} {} after {:.2}s",
            self.job_id,
            self.priority,
            self.status,
            self.phase,
            self.elapsed.as_secs_f64()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn event_copies_job_identity() {
        let job = Job::new(JobId(3), IssueCategory::Mechanical, Duration::from_secs(5));
        let event = PhaseEvent::new(
            &job,
            Phase::Repair,
            EventStatus::Entering,
            Duration::from_millis(1500),
        );
        assert_eq!(event.job_id, JobId(3));
        assert_eq!(event.priority, Priority::High);
        assert_eq!(event.description(), "Job 3 (high) entering repair after 1.50s");
    }

    #[test]
    fn event_serializes_with_snake_case_tags() {
        let job = Job::new(JobId(9), IssueCategory::Bodywork, Duration::from_secs(1));
        let event = PhaseEvent::new(&job, Phase::Delivery, EventStatus::Leaving, Duration::ZERO);
        let value = serde_json::to_value(&event).expect("serialize");
        assert_eq!(value["status"], "leaving");
        assert_eq!(value["phase"], "delivery");
        assert_eq!(value["category"], "bodywork");
    }
}
