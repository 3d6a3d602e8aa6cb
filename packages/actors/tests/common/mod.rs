#![allow(dead_code)]

use std::time::Duration;

use garage_core::{Backlog, EventStatus, IssueCategory, Job, JobId, Phase, PhaseEvent, WorkshopConfig};

/// Short enough to keep paused-clock runs cheap, long enough to order events.
pub const UNIT: Duration = Duration::from_millis(10);

pub fn config(jobs: usize, slots: usize, mechanics: usize) -> WorkshopConfig {
    WorkshopConfig::new(jobs, slots, mechanics).with_time_unit(UNIT)
}

pub fn job(id: u64, category: IssueCategory) -> Job {
    Job::new(JobId(id), category, category.service_duration(0, UNIT))
}

pub fn backlog(categories: &[IssueCategory]) -> Backlog {
    categories
        .iter()
        .enumerate()
        .map(|(id, category)| job(id as u64, *category))
        .collect()
}

/// Ids of the jobs entering `phase`, in the order the sink saw them.
pub fn entering_order(events: &[PhaseEvent], phase: Phase) -> Vec<JobId> {
    events
        .iter()
        .filter(|e| e.phase == phase && e.status == EventStatus::Entering)
        .map(|e| e.job_id)
        .collect()
}

/// Every event recorded for one job, in sink order.
pub fn events_for(events: &[PhaseEvent], id: JobId) -> Vec<(Phase, EventStatus)> {
    events
        .iter()
        .filter(|e| e.job_id == id)
        .map(|e| (e.phase, e.status))
        .collect()
}

/// The only legal event sequence for a job that went all the way through.
pub fn full_lifecycle() -> Vec<(Phase, EventStatus)> {
    Phase::ALL
        .into_iter()
        .flat_map(|phase| [(phase, EventStatus::Entering), (phase, EventStatus::Leaving)])
        .collect()
}
