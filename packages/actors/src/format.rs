//! Renderers for lifecycle events.

use std::io::Write;
use std::sync::{Arc, Mutex, PoisonError};

use garage_core::PhaseEvent;

use crate::error::SinkError;

/// Turns events into output. Only the event sink calls this, one event at a time.
pub trait EventFormatter: Send + 'static {
    fn write_event(&mut self, event: &PhaseEvent) -> Result<(), SinkError>;

    /// Called once after the last event.
    fn finish(&mut self) -> Result<(), SinkError> {
        Ok(())
    }
}

impl EventFormatter for Box<dyn EventFormatter> {
    fn write_event(&mut self, event: &PhaseEvent) -> Result<(), SinkError> {
        (**self).write_event(event)
    }

    fn finish(&mut self) -> Result<(), SinkError> {
        (**self).finish()
    }
}

/// Fixed-width table: seconds since admission, car, issue, phase, status.
pub struct TableFormatter<W> {
    out: W,
    header_written: bool,
}

impl TableFormatter<std::io::Stdout> {
    pub fn stdout() -> Self {
        Self::new(std::io::stdout())
    }
}

impl<W: Write + Send + 'static> TableFormatter<W> {
    pub fn new(out: W) -> Self {
        Self {
            out,
            header_written: false,
        }
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write + Send + 'static> EventFormatter for TableFormatter<W> {
    fn write_event(&mut self, event: &PhaseEvent) -> Result<(), SinkError> {
        if !self.header_written {
            writeln!(
                self.out,
                "{:<9} {:<9} {:<10} {:<6} STATUS",
                "TIME", "CAR", "ISSUE", "PHASE"
            )?;
            self.header_written = true;
        }
        writeln!(
            self.out,
            "{:<9.2} {:<9} {:<10} {:<6} {}",
            event.elapsed.as_secs_f64(),
            event.job_id.0,
            event.category.to_string(),
            event.phase.number(),
            event.status.as_str()
        )?;
        Ok(())
    }

    fn finish(&mut self) -> Result<(), SinkError> {
        self.out.flush()?;
        Ok(())
    }
}

/// One JSON object per line.
pub struct JsonLinesFormatter<W> {
    out: W,
}

impl JsonLinesFormatter<std::io::Stdout> {
    pub fn stdout() -> Self {
        Self::new(std::io::stdout())
    }
}

impl<W: Write + Send + 'static> JsonLinesFormatter<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }
}

impl<W: Write + Send + 'static> EventFormatter for JsonLinesFormatter<W> {
    fn write_event(&mut self, event: &PhaseEvent) -> Result<(), SinkError> {
        serde_json::to_writer(&mut self.out, event)?;
        writeln!(self.out)?;
        Ok(())
    }

    fn finish(&mut self) -> Result<(), SinkError> {
        self.out.flush()?;
        Ok(())
    }
}

/// Discards every event.
#[derive(Debug, Default, Clone, Copy)]
pub struct SilentFormatter;

impl EventFormatter for SilentFormatter {
    fn write_event(&mut self, _event: &PhaseEvent) -> Result<(), SinkError> {
        Ok(())
    }
}

/// Shared, append-only record of events in the order the sink received them.
#[derive(Debug, Default, Clone)]
pub struct EventLog {
    events: Arc<Mutex<Vec<PhaseEvent>>>,
}

impl EventLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Formatter that appends to this log.
    pub fn formatter(&self) -> CollectingFormatter {
        CollectingFormatter { log: self.clone() }
    }

    pub fn events(&self) -> Vec<PhaseEvent> {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn len(&self) -> usize {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn push(&self, event: PhaseEvent) {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(event);
    }
}

/// Collects events into an [`EventLog`].
#[derive(Debug, Clone)]
pub struct CollectingFormatter {
    log: EventLog,
}

impl EventFormatter for CollectingFormatter {
    fn write_event(&mut self, event: &PhaseEvent) -> Result<(), SinkError> {
        self.log.push(event.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use garage_core::{EventStatus, IssueCategory, Job, JobId, Phase};
    use std::time::Duration;

    fn event(id: u64, status: EventStatus) -> PhaseEvent {
        let job = Job::new(JobId(id), IssueCategory::Mechanical, Duration::from_secs(5));
        PhaseEvent::new(&job, Phase::Repair, status, Duration::from_millis(6250))
    }

    #[test]
    fn table_rows_are_aligned_under_a_header() {
        let mut table = TableFormatter::new(Vec::new());
        table
            .write_event(&event(12, EventStatus::Entering))
            .expect("write");
        table.finish().expect("flush");
        let text = String::from_utf8(table.into_inner()).expect("utf8");
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "TIME      CAR       ISSUE      PHASE  STATUS");
        assert_eq!(lines[1], "6.25      12        mechanical 2      entering");
    }

    #[test]
    fn collecting_formatter_keeps_arrival_order() {
        let log = EventLog::new();
        let mut formatter = log.formatter();
        formatter
            .write_event(&event(1, EventStatus::Entering))
            .expect("write");
        formatter
            .write_event(&event(1, EventStatus::Leaving))
            .expect("write");
        let statuses: Vec<EventStatus> = log.events().iter().map(|e| e.status).collect();
        assert_eq!(statuses, vec![EventStatus::Entering, EventStatus::Leaving]);
    }
}
