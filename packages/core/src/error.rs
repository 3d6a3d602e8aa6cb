//! Configuration errors.

use thiserror::Error;

use crate::Phase;

/// A configuration the workshop refuses to run with.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("at least one job is required")]
    NoJobs,

    #[error("the garage needs at least one slot")]
    NoSlots,

    #[error("the repair phase needs at least one specialized worker")]
    NoSpecializedWorkers,

    #[error("worker pool for the {0} phase is empty")]
    EmptyPool(Phase),

    #[error("invalid category mix '{0}', expected three comma-separated counts")]
    InvalidMix(String),

    #[error("time unit must be positive")]
    ZeroTimeUnit,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
