//! Core domain types for the workshop pipeline.
//!
//! This crate contains shared types used across all packages:
//! - Job, Priority, IssueCategory and Phase for the cars being serviced
//! - PhaseEvent for the lifecycle records workers emit
//! - WorkshopConfig and RunReport for a single run
//! - Generators and the Backlog that feed the pipeline

mod config;
mod error;
mod events;
mod generator;
mod job;
mod report;

pub use config::{PoolOverrides, WorkshopConfig};
pub use error::ConfigError;
pub use events::{EventStatus, PhaseEvent};
pub use generator::{
    Backlog, CategoryMix, FixedGenerator, JobGenerator, MAX_JITTER_TENTHS, MixGenerator,
    RandomGenerator,
};
pub use job::{IssueCategory, Job, JobId, Phase, Priority};
pub use report::RunReport;
