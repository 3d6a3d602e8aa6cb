//! Job generation and the waiting backlog.

use std::cmp::Ordering;
use std::collections::BinaryHeap;
use std::str::FromStr;
use std::time::Duration;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use crate::{ConfigError, IssueCategory, Job, JobId};

/// Largest jitter added to a base service time, in tenths of a time unit.
pub const MAX_JITTER_TENTHS: u32 = 20;

/// Supplies the jobs that will be pushed through the workshop.
pub trait JobGenerator: Send {
    fn generate(&mut self, id: JobId) -> Job;
}

/// Uniformly random categories with random jitter.
pub struct RandomGenerator {
    rng: StdRng,
    time_unit: Duration,
}

impl RandomGenerator {
    pub fn new(time_unit: Duration) -> Self {
        Self {
            rng: StdRng::from_entropy(),
            time_unit,
        }
    }

    /// Deterministic generator for reproducible runs.
    pub fn seeded(seed: u64, time_unit: Duration) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
            time_unit,
        }
    }
}

impl JobGenerator for RandomGenerator {
    fn generate(&mut self, id: JobId) -> Job {
        let category = IssueCategory::ALL[self.rng.gen_range(0..IssueCategory::ALL.len())];
        let jitter = self.rng.gen_range(0..=MAX_JITTER_TENTHS);
        Job::new(id, category, category.service_duration(jitter, self.time_unit))
    }
}

/// How many jobs of each category a scenario contains.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CategoryMix {
    pub mechanical: usize,
    pub electrical: usize,
    pub bodywork: usize,
}

impl CategoryMix {
    pub fn new(mechanical: usize, electrical: usize, bodywork: usize) -> Self {
        Self {
            mechanical,
            electrical,
            bodywork,
        }
    }

    pub fn total(&self) -> usize {
        self.mechanical + self.electrical + self.bodywork
    }

    /// Category of the `index`-th job: all mechanical first, then electrical,
    /// then bodywork. Wraps past the end.
    fn category_at(&self, index: usize) -> Option<IssueCategory> {
        let total = self.total();
        if total == 0 {
            return None;
        }
        let index = index % total;
        if index < self.mechanical {
            Some(IssueCategory::Mechanical)
        } else if index < self.mechanical + self.electrical {
            Some(IssueCategory::Electrical)
        } else {
            Some(IssueCategory::Bodywork)
        }
    }
}

impl FromStr for CategoryMix {
    type Err = ConfigError;

    /// Parse `"mechanical,electrical,bodywork"` counts, e.g. `"10,10,10"`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let counts = s
            .split(',')
            .map(|part| part.trim().parse::<usize>())
            .collect::<Result<Vec<_>, _>>()
            .map_err(|_| ConfigError::InvalidMix(s.to_string()))?;
        match counts.as_slice() {
            [mechanical, electrical, bodywork] => {
                Ok(Self::new(*mechanical, *electrical, *bodywork))
            }
            _ => Err(ConfigError::InvalidMix(s.to_string())),
        }
    }
}

/// Fixed category mix with random jitter on the service times.
pub struct MixGenerator {
    mix: CategoryMix,
    produced: usize,
    rng: StdRng,
    time_unit: Duration,
}

impl MixGenerator {
    pub fn new(mix: CategoryMix, time_unit: Duration, seed: Option<u64>) -> Self {
        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self {
            mix,
            produced: 0,
            rng,
            time_unit,
        }
    }
}

impl JobGenerator for MixGenerator {
    fn generate(&mut self, id: JobId) -> Job {
        let category = self
            .mix
            .category_at(self.produced)
            .unwrap_or(IssueCategory::Bodywork);
        self.produced += 1;
        let jitter = self.rng.gen_range(0..=MAX_JITTER_TENTHS);
        Job::new(id, category, category.service_duration(jitter, self.time_unit))
    }
}

/// Replays a fixed list of jobs, renumbering them with the requested ids.
pub struct FixedGenerator {
    jobs: std::vec::IntoIter<Job>,
}

impl FixedGenerator {
    pub fn new(jobs: Vec<Job>) -> Self {
        Self {
            jobs: jobs.into_iter(),
        }
    }
}

impl JobGenerator for FixedGenerator {
    fn generate(&mut self, id: JobId) -> Job {
        match self.jobs.next() {
            Some(mut job) => {
                job.id = id;
                job
            }
            None => Job::new(id, IssueCategory::Bodywork, Duration::ZERO),
        }
    }
}

/// Ordering wrapper: higher priority first, lower id first within a class.
#[derive(Debug, Clone)]
struct Waiting {
    job: Job,
}

impl PartialEq for Waiting {
    fn eq(&self, other: &Self) -> bool {
        self.job.id == other.job.id
    }
}

impl Eq for Waiting {}

impl PartialOrd for Waiting {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Waiting {
    fn cmp(&self, other: &Self) -> Ordering {
        match self.job.priority.cmp(&other.job.priority) {
            Ordering::Equal => other.job.id.cmp(&self.job.id),
            other => other,
        }
    }
}

/// Cars waiting outside the garage for a free slot.
#[derive(Debug, Default)]
pub struct Backlog {
    waiting: BinaryHeap<Waiting>,
}

impl Backlog {
    /// Generate `count` jobs with ids `0..count`.
    pub fn generate(generator: &mut dyn JobGenerator, count: usize) -> Self {
        (0..count as u64)
            .map(|id| generator.generate(JobId(id)))
            .collect()
    }

    /// Next car to let in: the most urgent one that has waited longest.
    pub fn pop_next(&mut self) -> Option<Job> {
        self.waiting.pop().map(|w| w.job)
    }

    pub fn len(&self) -> usize {
        self.waiting.len()
    }

    pub fn is_empty(&self) -> bool {
        self.waiting.is_empty()
    }
}

impl FromIterator<Job> for Backlog {
    fn from_iter<I: IntoIterator<Item = Job>>(iter: I) -> Self {
        Self {
            waiting: iter.into_iter().map(|job| Waiting { job }).collect(),
        }
    }
}
