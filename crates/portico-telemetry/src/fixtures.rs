//! Test fixtures for asserting on emitted log records.
//!
//! [`MemorySink`] captures every record in memory so tests can check which
//! messages were logged, at what level, and with which tags.
//!
//! # Example
//!
//! ```
//! use portico_telemetry::{Level, Logger, MemorySink};
//!
//! let sink = MemorySink::new();
//! let log = Logger::new(sink.clone());
//! log.debug("Intentionally throwing unavailable");
//!
//! assert!(sink.contains(Level::Debug, "Intentionally throwing unavailable"));
//! assert_eq!(sink.count(Level::Warn), 0);
//! ```

use crate::logger::{Level, LogRecord, LogSink};
use parking_lot::Mutex;
use serde_json::Value;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// In-memory sink. Clones share the same buffer.
#[derive(Debug, Clone, Default)]
pub struct MemorySink {
    records: Arc<Mutex<Vec<LogRecord>>>,
    inits: Arc<AtomicUsize>,
}

impl MemorySink {
    /// Creates an empty sink.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a snapshot of every record, oldest first.
    #[must_use]
    pub fn records(&self) -> Vec<LogRecord> {
        self.records.lock().clone()
    }

    /// Returns the messages logged at `level`.
    #[must_use]
    pub fn messages(&self, level: Level) -> Vec<String> {
        self.records
            .lock()
            .iter()
            .filter(|r| r.level == level)
            .filter_map(|r| r.message.clone())
            .collect()
    }

    /// Returns the payloads logged at `level`.
    #[must_use]
    pub fn vars(&self, level: Level) -> Vec<Value> {
        self.records
            .lock()
            .iter()
            .filter(|r| r.level == level)
            .filter_map(|r| r.payload.clone())
            .collect()
    }

    /// Counts records at `level`.
    #[must_use]
    pub fn count(&self, level: Level) -> usize {
        self.records
            .lock()
            .iter()
            .filter(|r| r.level == level)
            .count()
    }

    /// Whether a message equal to `message` was logged at `level`.
    #[must_use]
    pub fn contains(&self, level: Level, message: &str) -> bool {
        self.records
            .lock()
            .iter()
            .any(|r| r.level == level && r.message.as_deref() == Some(message))
    }

    /// How many times `init` ran.
    #[must_use]
    pub fn init_count(&self) -> usize {
        self.inits.load(Ordering::SeqCst)
    }

    /// Drops every captured record.
    pub fn clear(&self) {
        self.records.lock().clear();
    }
}

impl LogSink for MemorySink {
    fn emit(&self, record: LogRecord) {
        self.records.lock().push(record);
    }

    fn init(&self) {
        self.inits.fetch_add(1, Ordering::SeqCst);
    }
}
