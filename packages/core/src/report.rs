//! Summary of a finished workshop run.

use std::collections::BTreeMap;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{Phase, Priority};

/// Statistics collected over one run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunReport {
    /// Jobs let in through the admission gate.
    pub admitted: u64,
    /// Jobs that finished the terminal phase.
    pub completed: u64,
    /// Jobs dropped by a failing worker before completion.
    pub abandoned: u64,
    /// Events delivered to the sink.
    pub events_emitted: u64,
    /// Largest number of jobs seen in service at the same time.
    pub peak_in_service: usize,
    /// Completed jobs per priority class.
    pub completed_by_priority: BTreeMap<Priority, u64>,
    /// Jobs processed by each phase's workers.
    pub jobs_per_phase: BTreeMap<Phase, u64>,
    /// Time from the first admission attempt to the last completion.
    pub elapsed: Duration,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

impl RunReport {
    /// True if every admitted job made it out of the garage.
    pub fn all_completed(&self) -> bool {
        self.abandoned == 0 && self.completed == self.admitted
    }

    /// Completed jobs per minute of run time.
    pub fn throughput_per_min(&self) -> Option<f64> {
        let secs = self.elapsed.as_secs_f64();
        if secs == 0.0 {
            None
        } else {
            Some(self.completed as f64 * 60.0 / secs)
        }
    }
}

impl std::fmt::Display for RunReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} of {} jobs completed in {:.2}s (peak {} in service, {} events",
            self.completed,
            self.admitted,
            self.elapsed.as_secs_f64(),
            self.peak_in_service,
            self.events_emitted
        )?;
        if self.abandoned > 0 {
            write!(f, ", {} abandoned", self.abandoned)?;
        }
        write!(f, ")")
    }
}
