//! Phase workers and the pools that run them.

use std::sync::Arc;

use garage_core::{EventStatus, Job, Phase, PhaseEvent, Priority};
use tokio::task::JoinHandle;
use tokio::time::Instant;

use crate::channels::{PhaseIntake, Prioritized};
use crate::dispatcher::PhaseDispatcher;
use crate::error::{EngineError, EngineResult};
use crate::gate::SlotPermit;
use crate::registry::GarageRegistry;
use crate::sink::EventSink;
use crate::tracker::CompletionTicket;

/// A job in the pipeline together with the slot and ticket it was admitted with.
///
/// Moving this value is the hand-off: whoever holds it owns the job.
#[derive(Debug)]
pub struct InFlight {
    pub job: Job,
    slot: SlotPermit,
    ticket: CompletionTicket,
}

impl InFlight {
    pub fn new(job: Job, slot: SlotPermit, ticket: CompletionTicket) -> Self {
        Self { job, slot, ticket }
    }
}

impl Prioritized for InFlight {
    fn priority(&self) -> Priority {
        self.job.priority
    }
}

/// Shared collaborators every worker needs.
#[derive(Clone)]
pub struct PhaseContext {
    pub registry: Arc<GarageRegistry>,
    pub sink: EventSink,
    /// Keep the slot for one more service time after delivery.
    pub delivery_handover: bool,
}

/// How much work one worker did before it was stopped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkerSummary {
    pub worker_id: String,
    pub phase: Phase,
    pub processed: u64,
}

/// A single worker looping dispatch, process, forward.
pub struct PhaseWorker {
    worker_id: String,
    phase: Phase,
    dispatcher: PhaseDispatcher<InFlight>,
    next: Option<PhaseIntake<InFlight>>,
    context: PhaseContext,
}

impl PhaseWorker {
    pub fn new(
        index: usize,
        dispatcher: PhaseDispatcher<InFlight>,
        next: Option<PhaseIntake<InFlight>>,
        context: PhaseContext,
    ) -> Self {
        let phase = dispatcher.phase();
        Self {
            worker_id: format!("{}-{}", phase, index),
            phase,
            dispatcher,
            next,
            context,
        }
    }

    /// Run until the dispatcher reports stop.
    pub async fn run(self) -> EngineResult<WorkerSummary> {
        tracing::debug!(worker = %self.worker_id, "Worker started");
        let mut processed = 0;

        while let Some(mut in_flight) = self.dispatcher.dispatch().await {
            self.process(&mut in_flight.job).await;
            processed += 1;
            self.forward(in_flight).await?;
        }

        tracing::debug!(worker = %self.worker_id, processed, "Worker stopped");
        Ok(WorkerSummary {
            worker_id: self.worker_id,
            phase: self.phase,
            processed,
        })
    }

    async fn process(&self, job: &mut Job) {
        job.enter_phase(self.phase);
        self.context.registry.update_phase(job.id, self.phase);

        self.emit(job, EventStatus::Entering);
        tokio::time::sleep(job.service_duration).await;
        self.emit(job, EventStatus::Leaving);
    }

    async fn forward(&self, in_flight: InFlight) -> EngineResult<()> {
        match &self.next {
            Some(next) => {
                tracing::debug!(
                    job_id = %in_flight.job.id,
                    from = %self.phase,
                    to = %next.phase(),
                    "Handing job off"
                );
                next.enqueue(in_flight)
            }
            None => {
                self.finalize(in_flight).await;
                Ok(())
            }
        }
    }

    /// Terminal phase: hand the car over, then free its slot.
    async fn finalize(&self, in_flight: InFlight) {
        let InFlight { job, slot, ticket } = in_flight;
        if self.context.delivery_handover {
            tokio::time::sleep(job.service_duration).await;
        }
        self.context.registry.remove(job.id);
        slot.release();
        ticket.done();
        tracing::debug!(job_id = %job.id, priority = %job.priority, "Job completed");
    }

    fn emit(&self, job: &Job, status: EventStatus) {
        let elapsed = job.elapsed_at(Instant::now().into_std());
        let event = PhaseEvent::new(job, self.phase, status, elapsed);
        tracing::trace!(worker = %self.worker_id, "{}", event.description());
        if let Err(e) = self.context.sink.emit(event) {
            tracing::warn!(worker = %self.worker_id, job_id = %job.id, error = %e, "Event dropped");
        }
    }
}

/// How one phase's pool finished.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PoolSummary {
    pub phase: Phase,
    pub workers: usize,
    pub processed: u64,
}

/// Fixed-size set of workers serving one phase, each with a joinable handle.
pub struct WorkerPool {
    phase: Phase,
    dispatcher: PhaseDispatcher<InFlight>,
    workers: Vec<JoinHandle<EngineResult<WorkerSummary>>>,
}

impl WorkerPool {
    /// Spawn `size` workers on `dispatcher`, forwarding finished jobs to `next`.
    pub fn spawn(
        size: usize,
        dispatcher: PhaseDispatcher<InFlight>,
        next: Option<PhaseIntake<InFlight>>,
        context: PhaseContext,
    ) -> Self {
        let phase = dispatcher.phase();
        let workers = (0..size)
            .map(|index| {
                let worker =
                    PhaseWorker::new(index, dispatcher.clone(), next.clone(), context.clone());
                tokio::spawn(worker.run())
            })
            .collect();
        tracing::info!(phase = %phase, workers = size, "Started worker pool");
        Self {
            phase,
            dispatcher,
            workers,
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn len(&self) -> usize {
        self.workers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.workers.is_empty()
    }

    /// Wait for every worker to exit, then close the phase's inbox.
    ///
    /// Workers only exit once stop has been signalled on their dispatcher.
    pub async fn join(self) -> EngineResult<PoolSummary> {
        let results = futures_util::future::join_all(self.workers).await;
        self.dispatcher.close().await;

        let mut summary = PoolSummary {
            phase: self.phase,
            workers: results.len(),
            processed: 0,
        };
        let mut first_error = None;
        for (worker, result) in results.into_iter().enumerate() {
            let failure = match result {
                Ok(Ok(done)) => {
                    summary.processed += done.processed;
                    continue;
                }
                Ok(Err(e)) => e.to_string(),
                Err(e) => e.to_string(),
            };
            tracing::error!(phase = %self.phase, worker, "Worker failed: {}", failure);
            if first_error.is_none() {
                first_error = Some(EngineError::WorkerFailed {
                    phase: self.phase,
                    worker,
                    reason: failure,
                });
            }
        }

        match first_error {
            Some(e) => Err(e),
            None => {
                tracing::info!(phase = %self.phase, processed = summary.processed, "Worker pool stopped");
                Ok(summary)
            }
        }
    }
}
