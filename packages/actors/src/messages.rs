//! Message types for actor communication.

use garage_core::PhaseEvent;
use ractor::RpcReplyPort;

/// Messages for the EventSinkActor.
#[derive(Debug)]
pub enum SinkMessage {
    /// Render one lifecycle event.
    Record(Box<PhaseEvent>),

    /// Report how many events have been rendered so far.
    GetDelivered { reply: RpcReplyPort<u64> },

    /// Flush the output and stop once every earlier message is handled.
    Close { reply: RpcReplyPort<SinkSummary> },
}

/// What the sink did over its lifetime.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SinkSummary {
    /// Events received and handed to the formatter.
    pub delivered: u64,
    /// Events the formatter failed to write.
    pub write_failures: u64,
}
