//! Concurrent engine for the workshop pipeline.
//!
//! Jobs are admitted through a bounded [`AdmissionGate`], then handed from
//! phase to phase through per-phase priority channels. Each phase is served
//! by a [`WorkerPool`]; all lifecycle events flow to a single ractor-based
//! [`EventSink`].
//!
//! # Architecture
//!
//! - `Workshop` - Orchestrator: producer, pools, shutdown, report
//! - `PhaseDispatcher` - Strict-priority selection with a stop signal
//! - `CompletionTracker` - Counted barrier over jobs in flight
//! - `GarageRegistry` - Shared map of cars currently in the garage
//! - `EventSinkActor` - Single consumer rendering events in order
//!
//! # Usage
//!
//! ```ignore
//! use garage_actors::{TableFormatter, Workshop};
//! use garage_core::{RandomGenerator, WorkshopConfig};
//!
//! let config = WorkshopConfig::default();
//! let mut generator = RandomGenerator::new(config.time_unit());
//! let report = Workshop::new(config)?
//!     .run(&mut generator, TableFormatter::stdout())
//!     .await?;
//! ```

pub mod channels;
pub mod dispatcher;
mod error;
pub mod format;
pub mod gate;
mod messages;
pub mod registry;
pub mod sink;
pub mod tracker;
pub mod worker;
mod workshop;

pub use channels::{PhaseInbox, PhaseIntake, Prioritized, priority_channels};
pub use dispatcher::PhaseDispatcher;
pub use error::{EngineError, EngineResult, SinkError};
pub use format::{
    CollectingFormatter, EventFormatter, EventLog, JsonLinesFormatter, SilentFormatter,
    TableFormatter,
};
pub use gate::{AdmissionGate, SlotPermit};
pub use messages::{SinkMessage, SinkSummary};
pub use registry::GarageRegistry;
pub use sink::{EventSink, EventSinkActor, SinkOwner};
pub use tracker::{CompletionTicket, CompletionTracker};
pub use worker::{InFlight, PhaseContext, PoolSummary, WorkerPool, WorkerSummary};
pub use workshop::Workshop;
