//! Job domain types for cars moving through the workshop.

use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};

/// Unique identifier for a job, assigned by the generator in creation order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobId(pub u64);

impl std::fmt::Display for JobId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for JobId {
    fn from(id: u64) -> Self {
        Self(id)
    }
}

/// Priority class for dispatch order inside a phase.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    #[default]
    Low = 0,
    Medium = 1,
    High = 2,
}

impl Priority {
    /// All classes, most urgent first.
    pub const DESCENDING: [Priority; 3] = [Priority::High, Priority::Medium, Priority::Low];

    /// Position of this class in a most-urgent-first lane array.
    pub fn lane(self) -> usize {
        match self {
            Priority::High => 0,
            Priority::Medium => 1,
            Priority::Low => 2,
        }
    }
}

impl std::fmt::Display for Priority {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Priority::Low => write!(f, "low"),
            Priority::Medium => write!(f, "medium"),
            Priority::High => write!(f, "high"),
        }
    }
}

/// Kind of issue a car is brought in for. Fixes both priority and base service time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IssueCategory {
    Mechanical,
    Electrical,
    Bodywork,
}

impl IssueCategory {
    pub const ALL: [IssueCategory; 3] = [
        IssueCategory::Mechanical,
        IssueCategory::Electrical,
        IssueCategory::Bodywork,
    ];

    pub fn priority(self) -> Priority {
        match self {
            IssueCategory::Mechanical => Priority::High,
            IssueCategory::Electrical => Priority::Medium,
            IssueCategory::Bodywork => Priority::Low,
        }
    }

    /// Base service time in time units, before jitter.
    pub fn base_units(self) -> u32 {
        match self {
            IssueCategory::Mechanical => 5,
            IssueCategory::Electrical => 3,
            IssueCategory::Bodywork => 1,
        }
    }

    /// Service time for this category with `jitter_tenths` tenths of a unit added.
    pub fn service_duration(self, jitter_tenths: u32, time_unit: Duration) -> Duration {
        time_unit * (self.base_units() * 10 + jitter_tenths) / 10
    }
}

impl std::fmt::Display for IssueCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            IssueCategory::Mechanical => write!(f, "mechanical"),
            IssueCategory::Electrical => write!(f, "electrical"),
            IssueCategory::Bodywork => write!(f, "bodywork"),
        }
    }
}

/// Sequential stage of the workshop pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Documentation = 1,
    Repair = 2,
    Cleaning = 3,
    Delivery = 4,
}

impl Phase {
    pub const ALL: [Phase; 4] = [
        Phase::Documentation,
        Phase::Repair,
        Phase::Cleaning,
        Phase::Delivery,
    ];

    pub const FIRST: Phase = Phase::Documentation;

    /// 1-based phase number.
    pub fn number(self) -> u8 {
        self as u8
    }

    pub fn next(self) -> Option<Phase> {
        match self {
            Phase::Documentation => Some(Phase::Repair),
            Phase::Repair => Some(Phase::Cleaning),
            Phase::Cleaning => Some(Phase::Delivery),
            Phase::Delivery => None,
        }
    }

    pub fn is_terminal(self) -> bool {
        self.next().is_none()
    }
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Phase::Documentation => write!(f, "documentation"),
            Phase::Repair => write!(f, "repair"),
            Phase::Cleaning => write!(f, "cleaning"),
            Phase::Delivery => write!(f, "delivery"),
        }
    }
}

/// A car in the workshop.
///
/// Identity, category and service time never change after creation. The
/// scheduling fields are written only by whoever currently owns the job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Job {
    /// Unique identifier for this job.
    pub id: JobId,
    /// Issue the car was brought in for.
    pub category: IssueCategory,
    /// Dispatch priority, derived from the category.
    pub priority: Priority,
    /// Time spent in each phase.
    pub service_duration: Duration,
    /// Phase the job is currently in, `None` until it enters documentation.
    #[serde(default)]
    pub current_phase: Option<Phase>,
    /// When the job was last admitted through the gate.
    #[serde(skip)]
    pub admitted_at: Option<Instant>,
}

impl Job {
    /// Create a new, unadmitted job.
    pub fn new(id: JobId, category: IssueCategory, service_duration: Duration) -> Self {
        Self {
            id,
            category,
            priority: category.priority(),
            service_duration,
            current_phase: None,
            admitted_at: None,
        }
    }

    /// Stamp the admission time and reset the phase.
    pub fn admit(&mut self, at: Instant) {
        self.admitted_at = Some(at);
        self.current_phase = None;
    }

    pub fn enter_phase(&mut self, phase: Phase) {
        self.current_phase = Some(phase);
    }

    /// Phase number with 0 meaning "not started".
    pub fn phase_number(&self) -> u8 {
        self.current_phase.map_or(0, Phase::number)
    }

    /// Time since admission as seen at `now`; zero for unadmitted jobs.
    pub fn elapsed_at(&self, now: Instant) -> Duration {
        self.admitted_at
            .map(|at| now.saturating_duration_since(at))
            .unwrap_or_default()
    }
}
