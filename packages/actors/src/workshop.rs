//! Orchestrator: admits jobs, runs the phase pools, and shuts everything down.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::Utc;
use garage_core::{Backlog, JobGenerator, Phase, Priority, RunReport, WorkshopConfig};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::channels::{PhaseIntake, priority_channels};
use crate::dispatcher::PhaseDispatcher;
use crate::error::{EngineError, EngineResult};
use crate::format::EventFormatter;
use crate::gate::AdmissionGate;
use crate::registry::GarageRegistry;
use crate::sink::EventSink;
use crate::tracker::CompletionTracker;
use crate::worker::{InFlight, PhaseContext, WorkerPool};

/// One configured workshop, ready to run a batch of jobs.
pub struct Workshop {
    config: WorkshopConfig,
    registry: Arc<GarageRegistry>,
    gate: AdmissionGate,
    tracker: CompletionTracker,
}

impl Workshop {
    /// Validate `config` and set up the shared resources.
    pub fn new(config: WorkshopConfig) -> EngineResult<Self> {
        config.validate()?;
        Ok(Self {
            gate: AdmissionGate::new(config.num_slots),
            registry: Arc::new(GarageRegistry::new()),
            tracker: CompletionTracker::new(),
            config,
        })
    }

    pub fn config(&self) -> &WorkshopConfig {
        &self.config
    }

    /// Registry handle for observing the garage while a run is in progress.
    pub fn registry(&self) -> Arc<GarageRegistry> {
        Arc::clone(&self.registry)
    }

    pub fn gate(&self) -> AdmissionGate {
        self.gate.clone()
    }

    pub fn tracker(&self) -> CompletionTracker {
        self.tracker.clone()
    }

    /// Generate `num_jobs` jobs and push them all through the pipeline.
    pub async fn run(
        self,
        generator: &mut dyn JobGenerator,
        formatter: impl EventFormatter,
    ) -> EngineResult<RunReport> {
        let backlog = Backlog::generate(generator, self.config.num_jobs);
        self.run_backlog(backlog, formatter).await
    }

    /// Push every job of `backlog` through the pipeline, most urgent first.
    pub async fn run_backlog(
        self,
        backlog: Backlog,
        formatter: impl EventFormatter,
    ) -> EngineResult<RunReport> {
        let started_at = Utc::now();
        let start = Instant::now();
        tracing::info!(
            jobs = backlog.len(),
            slots = self.config.num_slots,
            specialized_workers = self.config.num_specialized_workers,
            "Starting workshop run"
        );

        let sink_owner = EventSink::spawn(formatter).await?;
        let context = PhaseContext {
            registry: Arc::clone(&self.registry),
            sink: sink_owner.sink().clone(),
            delivery_handover: self.config.delivery_handover,
        };

        let stop = CancellationToken::new();
        let (intakes, pools) = self.spawn_phases(&stop, &context);
        drop(context);

        let producer = tokio::spawn(produce(
            backlog,
            self.gate.clone(),
            Arc::clone(&self.registry),
            self.tracker.clone(),
            intakes[0].clone(),
        ));
        // Jobs admitted before a producer failure still run to completion.
        let produced = match producer.await {
            Ok(result) => result,
            Err(e) => Err(EngineError::ProducerFailed(e.to_string())),
        };
        match &produced {
            Ok(admitted) => {
                tracing::info!(admitted, "All jobs admitted, waiting for completion")
            }
            Err(e) => tracing::error!("Admission stopped early, draining admitted jobs: {}", e),
        }

        self.tracker.wait().await;
        tracing::info!("All jobs finished, stopping workers");
        stop.cancel();

        let mut jobs_per_phase = BTreeMap::new();
        let mut pool_error = None;
        for pool in pools {
            match pool.join().await {
                Ok(summary) => {
                    jobs_per_phase.insert(summary.phase, summary.processed);
                }
                Err(e) => {
                    pool_error.get_or_insert(e);
                }
            }
        }
        drop(intakes);

        let sink_summary = sink_owner.close().await?;
        produced?;
        if let Some(e) = pool_error {
            return Err(e);
        }

        let report = RunReport {
            admitted: self.tracker.admitted(),
            completed: self.tracker.completed(),
            abandoned: self.tracker.abandoned(),
            events_emitted: sink_summary.delivered,
            peak_in_service: self.registry.peak_in_service(),
            completed_by_priority: Priority::DESCENDING
                .into_iter()
                .map(|p| (p, self.tracker.completed_with(p)))
                .collect(),
            jobs_per_phase,
            elapsed: start.elapsed(),
            started_at,
            finished_at: Utc::now(),
        };
        tracing::info!("Workshop run finished: {}", report);
        Ok(report)
    }

    /// One channel set and worker pool per phase, each pool forwarding to the
    /// next phase's intake. Every dispatcher observes a child of `stop`.
    fn spawn_phases(
        &self,
        stop: &CancellationToken,
        context: &PhaseContext,
    ) -> (Vec<PhaseIntake<InFlight>>, Vec<WorkerPool>) {
        let (intakes, inboxes): (Vec<_>, Vec<_>) = Phase::ALL
            .into_iter()
            .map(priority_channels::<InFlight>)
            .unzip();

        let pools = inboxes
            .into_iter()
            .enumerate()
            .map(|(index, inbox)| {
                let phase = inbox.phase();
                let dispatcher = PhaseDispatcher::new(inbox, stop.child_token());
                let next = intakes.get(index + 1).cloned();
                WorkerPool::spawn(
                    self.config.pool_size(phase),
                    dispatcher,
                    next,
                    context.clone(),
                )
            })
            .collect();

        (intakes, pools)
    }
}

/// Producer loop: wait for a slot, register the job, count it in, send it to phase 1.
async fn produce(
    mut backlog: Backlog,
    gate: AdmissionGate,
    registry: Arc<GarageRegistry>,
    tracker: CompletionTracker,
    intake: PhaseIntake<InFlight>,
) -> EngineResult<u64> {
    let mut admitted = 0;
    while let Some(mut job) = backlog.pop_next() {
        let slot = gate.acquire().await?;
        job.admit(Instant::now().into_std());
        registry.sign_in(job.clone());
        let ticket = tracker.add(&job);
        tracing::debug!(job_id = %job.id, priority = %job.priority, "Admitted job");
        intake.enqueue(InFlight::new(job, slot, ticket))?;
        admitted += 1;
    }
    Ok(admitted)
}
