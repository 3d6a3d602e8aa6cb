//! Registry of the cars currently inside the garage.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use garage_core::{Job, JobId, Phase};

/// Lock-guarded map of job id to job record.
///
/// Readers always receive copies; no reference into the map leaves the lock.
#[derive(Debug, Default)]
pub struct GarageRegistry {
    jobs: RwLock<HashMap<JobId, Job>>,
    peak_in_service: AtomicUsize,
}

impl GarageRegistry {
    /// Create a new empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> RwLockReadGuard<'_, HashMap<JobId, Job>> {
        self.jobs.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, HashMap<JobId, Job>> {
        self.jobs.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Register an admitted job.
    pub fn sign_in(&self, job: Job) {
        self.write().insert(job.id, job);
    }

    /// Record that a job entered `phase`. Returns false for unknown ids.
    pub fn update_phase(&self, id: JobId, phase: Phase) -> bool {
        let mut jobs = self.write();
        let Some(job) = jobs.get_mut(&id) else {
            return false;
        };
        job.enter_phase(phase);
        let in_service = jobs.values().filter(|j| j.current_phase.is_some()).count();
        self.peak_in_service.fetch_max(in_service, Ordering::SeqCst);
        true
    }

    /// Deregister a job, returning its last record.
    pub fn remove(&self, id: JobId) -> Option<Job> {
        self.write().remove(&id)
    }

    /// Copy of one job's record.
    pub fn get(&self, id: JobId) -> Option<Job> {
        self.read().get(&id).cloned()
    }

    /// Copy of every registered job, ordered by id.
    pub fn snapshot(&self) -> Vec<Job> {
        let mut jobs: Vec<Job> = self.read().values().cloned().collect();
        jobs.sort_by_key(|j| j.id);
        jobs
    }

    /// Jobs that have entered at least the first phase.
    pub fn in_service(&self) -> usize {
        self.read()
            .values()
            .filter(|j| j.current_phase.is_some())
            .count()
    }

    /// Highest `in_service` count observed on any phase update.
    pub fn peak_in_service(&self) -> usize {
        self.peak_in_service.load(Ordering::SeqCst)
    }

    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }
}
