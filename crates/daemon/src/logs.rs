// SPDX-License-Identifier: MIT

//! Bounded in-memory log ring buffer backing `GET /api/logs` (§3.1). A
//! `tracing_subscriber::Layer` pushes every event here in addition to the
//! rolling file writer; this is ambient observability plumbing, not the
//! browser-side "log ring-buffer UI" the spec places out of scope.

use std::collections::VecDeque;

use dc_core::Clock;
use parking_lot::Mutex;
use serde::Serialize;
use tracing::field::{Field, Visit};
use tracing::{Event, Subscriber};
use tracing_subscriber::layer::Context;
use tracing_subscriber::Layer;

#[derive(Debug, Clone, Serialize)]
pub struct LogEntry {
    pub level: String,
    pub target: String,
    pub message: String,
    pub timestamp_ms: i64,
}

/// Fixed-capacity ring buffer; evicts the oldest entry once full (§3.1).
pub struct LogBuffer {
    entries: Mutex<VecDeque<LogEntry>>,
    capacity: usize,
}

impl LogBuffer {
    pub fn new(capacity: usize) -> Self {
        Self { entries: Mutex::new(VecDeque::with_capacity(capacity)), capacity }
    }

    pub fn push(&self, entry: LogEntry) {
        let mut entries = self.entries.lock();
        if entries.len() >= self.capacity {
            entries.pop_front();
        }
        entries.push_back(entry);
    }

    pub fn snapshot(&self) -> Vec<LogEntry> {
        self.entries.lock().iter().cloned().collect()
    }

    pub fn clear(&self) {
        self.entries.lock().clear();
    }
}

#[derive(Default)]
struct MessageVisitor(String);

impl Visit for MessageVisitor {
    fn record_debug(&mut self, field: &Field, value: &dyn std::fmt::Debug) {
        if field.name() == "message" {
            self.0 = format!("{value:?}");
        }
    }
}

/// A `tracing_subscriber::Layer` that mirrors every event into a
/// [`LogBuffer`], grounded on the teacher's pattern of a small layer next to
/// the `EnvFilter` stack rather than a bespoke logging macro.
pub struct RingBufferLayer {
    buffer: std::sync::Arc<LogBuffer>,
}

impl RingBufferLayer {
    pub fn new(buffer: std::sync::Arc<LogBuffer>) -> Self {
        Self { buffer }
    }
}

impl<S: Subscriber> Layer<S> for RingBufferLayer {
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        let mut visitor = MessageVisitor::default();
        event.record(&mut visitor);
        self.buffer.push(LogEntry {
            level: event.metadata().level().to_string(),
            target: event.metadata().target().to_string(),
            message: visitor.0,
            timestamp_ms: dc_core::SystemClock.now_ms(),
        });
    }
}

#[cfg(test)]
#[path = "logs_tests.rs"]
mod tests;
