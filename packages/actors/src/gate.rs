//! Admission control: the garage's bounded slots.

use std::sync::Arc;

use tokio::sync::{OwnedSemaphorePermit, Semaphore};

use crate::error::{EngineError, EngineResult};

/// Counting gate capping the number of jobs in flight.
#[derive(Debug, Clone)]
pub struct AdmissionGate {
    permits: Arc<Semaphore>,
    capacity: usize,
}

/// One occupied slot. Travels with its job and is given back by [`SlotPermit::release`].
#[derive(Debug)]
pub struct SlotPermit {
    _permit: OwnedSemaphorePermit,
}

impl SlotPermit {
    /// Free the slot. Consumes the permit, so a slot can only be freed once.
    pub fn release(self) {}
}

impl AdmissionGate {
    pub fn new(capacity: usize) -> Self {
        Self {
            permits: Arc::new(Semaphore::new(capacity)),
            capacity,
        }
    }

    /// Wait for a free slot.
    pub async fn acquire(&self) -> EngineResult<SlotPermit> {
        let permit = Arc::clone(&self.permits)
            .acquire_owned()
            .await
            .map_err(|_| EngineError::GateClosed)?;
        Ok(SlotPermit { _permit: permit })
    }

    /// Take a free slot if one is available right now.
    pub fn try_acquire(&self) -> Option<SlotPermit> {
        Arc::clone(&self.permits)
            .try_acquire_owned()
            .ok()
            .map(|permit| SlotPermit { _permit: permit })
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn available(&self) -> usize {
        self.permits.available_permits()
    }

    pub fn in_use(&self) -> usize {
        self.capacity - self.available()
    }

    /// Refuse all further admissions. Waiting producers get [`EngineError::GateClosed`].
    pub fn close(&self) {
        self.permits.close();
    }
}
