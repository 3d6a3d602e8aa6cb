//! Engine error types.

use garage_core::{ConfigError, Phase};

/// Result type for engine operations.
pub type EngineResult<T> = Result<T, EngineError>;

/// Error type for engine operations.
///
/// Apart from configuration errors, every variant points at a defect: the
/// pipeline has no transient failures to retry against.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("Invalid configuration: {0}")]
    Config(#[from] ConfigError),

    #[error("Admission gate is closed")]
    GateClosed,

    #[error("Intake for the {phase} phase is closed")]
    IntakeClosed { phase: Phase },

    #[error("Worker {worker} of the {phase} phase failed: {reason}")]
    WorkerFailed {
        phase: Phase,
        worker: usize,
        reason: String,
    },

    #[error("Producer failed: {0}")]
    ProducerFailed(String),

    #[error("Event sink error: {0}")]
    Sink(String),
}

/// Failure writing an event to the output.
#[derive(Debug, thiserror::Error)]
pub enum SinkError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
