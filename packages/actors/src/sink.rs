//! Event sink actor: the single writer of observability output.

use garage_core::PhaseEvent;
use ractor::{Actor, ActorProcessingErr, ActorRef};
use tokio::task::JoinHandle;

use crate::error::{EngineError, EngineResult};
use crate::format::EventFormatter;
use crate::messages::{SinkMessage, SinkSummary};

/// State for the event sink actor.
pub struct EventSinkState {
    formatter: Box<dyn EventFormatter>,
    summary: SinkSummary,
}

/// Actor that renders events strictly in mailbox order.
pub struct EventSinkActor;

impl Actor for EventSinkActor {
    type Msg = SinkMessage;
    type State = EventSinkState;
    type Arguments = Box<dyn EventFormatter>;

    async fn pre_start(
        &self,
        _myself: ActorRef<Self::Msg>,
        formatter: Self::Arguments,
    ) -> Result<Self::State, ActorProcessingErr> {
        tracing::info!("Starting event sink");
        Ok(EventSinkState {
            formatter,
            summary: SinkSummary::default(),
        })
    }

    async fn handle(
        &self,
        myself: ActorRef<Self::Msg>,
        message: Self::Msg,
        state: &mut Self::State,
    ) -> Result<(), ActorProcessingErr> {
        match message {
            SinkMessage::Record(event) => {
                state.summary.delivered += 1;
                if let Err(e) = state.formatter.write_event(&event) {
                    state.summary.write_failures += 1;
                    tracing::warn!(job_id = %event.job_id, error = %e, "Failed to write event");
                }
            }

            SinkMessage::GetDelivered { reply } => {
                let _ = reply.send(state.summary.delivered);
            }

            SinkMessage::Close { reply } => {
                if let Err(e) = state.formatter.finish() {
                    tracing::warn!("Failed to flush event output: {}", e);
                }
                tracing::info!(
                    delivered = state.summary.delivered,
                    "Event sink drained, shutting down"
                );
                let _ = reply.send(state.summary);
                myself.stop(None);
            }
        }

        Ok(())
    }
}

/// Cloneable handle producers use to reach the sink.
#[derive(Clone)]
pub struct EventSink {
    actor: ActorRef<SinkMessage>,
}

/// The sink's handle plus the task driving it; only the owner can close it.
pub struct SinkOwner {
    sink: EventSink,
    task: JoinHandle<()>,
}

impl EventSink {
    /// Start the consumer with `formatter` as its only output.
    pub async fn spawn(formatter: impl EventFormatter) -> EngineResult<SinkOwner> {
        let formatter: Box<dyn EventFormatter> = Box::new(formatter);
        let (actor, task) = Actor::spawn(None, EventSinkActor, formatter)
            .await
            .map_err(|e| EngineError::Sink(format!("Failed to spawn event sink: {}", e)))?;
        Ok(SinkOwner {
            sink: EventSink { actor },
            task,
        })
    }

    /// Queue `event` for rendering.
    pub fn emit(&self, event: PhaseEvent) -> EngineResult<()> {
        self.actor
            .send_message(SinkMessage::Record(Box::new(event)))
            .map_err(|e| EngineError::Sink(e.to_string()))
    }

    /// Events rendered so far, counted after everything queued before this call.
    pub async fn delivered(&self) -> EngineResult<u64> {
        let (tx, rx) = ractor::concurrency::oneshot();
        self.actor
            .send_message(SinkMessage::GetDelivered { reply: tx.into() })
            .map_err(|e| EngineError::Sink(e.to_string()))?;
        rx.await
            .map_err(|_| EngineError::Sink("Event sink dropped the reply".into()))
    }
}

impl SinkOwner {
    pub fn sink(&self) -> &EventSink {
        &self.sink
    }

    /// Drain everything already queued, flush, and wait for the actor to exit.
    pub async fn close(self) -> EngineResult<SinkSummary> {
        let (tx, rx) = ractor::concurrency::oneshot();
        self.sink
            .actor
            .send_message(SinkMessage::Close { reply: tx.into() })
            .map_err(|e| EngineError::Sink(e.to_string()))?;
        let summary = rx
            .await
            .map_err(|_| EngineError::Sink("Event sink dropped the reply".into()))?;
        self.task
            .await
            .map_err(|e| EngineError::Sink(format!("Event sink task failed: {}", e)))?;
        Ok(summary)
    }
}
