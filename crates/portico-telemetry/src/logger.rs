//! Tagged structured logger.
//!
//! A [`Logger`] is a cheap, clonable handle made of a set of persistent tags
//! and a shared [`LogSink`]. Tags ride along with every record the logger
//! emits. [`Logger::with`] derives a child carrying one more tag without
//! touching the parent, which is how each wrapped handler gets its own
//! `handler` tag.
//!
//! Every level has two forms: a message (`info("...")`) and a structured
//! payload (`info_var(json!({ ... }))`).
//!
//! # Example
//!
//! ```
//! use portico_telemetry::{Level, Logger, MemorySink};
//!
//! let sink = MemorySink::new();
//! let mut log = Logger::new(sink.clone());
//! log.tag_one("project", "geese");
//!
//! let handler_log = log.with("handler", "honk");
//! handler_log.info("Handling");
//!
//! let records = sink.records();
//! assert_eq!(records[0].tags["handler"], "honk");
//! assert_eq!(records[0].tags["project"], "geese");
//! assert!(log.tags().get("handler").is_none());
//! ```

use crate::logging::{init_logging, LogConfig};
use serde::Serialize;
use serde_json::{Map, Value};
use std::fmt;
use std::sync::Arc;

/// Persistent key/value context attached to log records.
pub type Tags = Map<String, Value>;

/// Log severity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Level {
    /// Very fine-grained diagnostics.
    Trace,
    /// Diagnostics useful while debugging.
    Debug,
    /// Normal operational messages.
    Info,
    /// Something unexpected that was handled.
    Warn,
    /// A failure.
    Error,
    /// A failure nobody anticipated.
    Fatal,
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Trace => "trace",
            Self::Debug => "debug",
            Self::Info => "info",
            Self::Warn => "warn",
            Self::Error => "error",
            Self::Fatal => "fatal",
        };
        f.write_str(name)
    }
}

/// A single emitted record.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LogRecord {
    /// Severity.
    pub level: Level,
    /// Message, for message-form calls.
    pub message: Option<String>,
    /// Structured payload, for `*_var` calls.
    pub payload: Option<Value>,
    /// Tags of the emitting logger.
    pub tags: Tags,
}

/// Destination for log records.
pub trait LogSink: Send + Sync + 'static {
    /// Delivers one record.
    fn emit(&self, record: LogRecord);

    /// Performs one-time setup. Called again on later `Logger::init` calls,
    /// so it must tolerate repetition.
    fn init(&self) {}
}

/// Sink that forwards records to `tracing` events.
///
/// `Fatal` has no `tracing` counterpart; it is emitted at ERROR with
/// `fatal = true`. Tags and payload are written as JSON string fields.
#[derive(Debug, Clone, Default)]
pub struct TracingSink {
    config: Option<LogConfig>,
}

impl TracingSink {
    /// Creates a sink that leaves subscriber setup to the host.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a sink whose `init` installs a subscriber from `config`.
    #[must_use]
    pub fn with_config(config: LogConfig) -> Self {
        Self {
            config: Some(config),
        }
    }
}

impl LogSink for TracingSink {
    fn emit(&self, record: LogRecord) {
        let tags = Value::Object(record.tags).to_string();
        let payload = record.payload.map(|p| p.to_string());
        let payload = payload.as_deref();
        let message = record.message.as_deref().unwrap_or_default();

        match record.level {
            Level::Trace => tracing::trace!(tags = %tags, payload, "{message}"),
            Level::Debug => tracing::debug!(tags = %tags, payload, "{message}"),
            Level::Info => tracing::info!(tags = %tags, payload, "{message}"),
            Level::Warn => tracing::warn!(tags = %tags, payload, "{message}"),
            Level::Error => tracing::error!(tags = %tags, payload, "{message}"),
            Level::Fatal => tracing::error!(fatal = true, tags = %tags, payload, "{message}"),
        }
    }

    fn init(&self) {
        if let Some(config) = &self.config {
            // A subscriber installed earlier (by the host or a previous
            // request) takes precedence.
            if let Err(e) = init_logging(config) {
                tracing::trace!(error = %e, "Logging already initialized");
            }
        }
    }
}

/// Tagged structured logger.
#[derive(Clone)]
pub struct Logger {
    tags: Tags,
    sink: Arc<dyn LogSink>,
}

impl Logger {
    /// Creates an untagged logger writing to `sink`.
    #[must_use]
    pub fn new(sink: impl LogSink) -> Self {
        Self {
            tags: Tags::new(),
            sink: Arc::new(sink),
        }
    }

    /// Creates an untagged logger sharing an existing sink.
    #[must_use]
    pub fn from_sink(sink: Arc<dyn LogSink>) -> Self {
        Self {
            tags: Tags::new(),
            sink,
        }
    }

    /// Creates a logger writing to `tracing`.
    #[must_use]
    pub fn tracing() -> Self {
        Self::new(TracingSink::new())
    }

    /// Runs the sink's one-time setup.
    pub fn init(&self) {
        self.sink.init();
    }

    /// Returns the persistent tags.
    #[must_use]
    pub fn tags(&self) -> &Tags {
        &self.tags
    }

    /// Adds or replaces tags.
    pub fn tag(&mut self, tags: Tags) {
        self.tags.extend(tags);
    }

    /// Adds or replaces one tag.
    pub fn tag_one(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.tags.insert(key.into(), value.into());
    }

    /// Removes tags.
    pub fn untag(&mut self, keys: &[&str]) {
        for key in keys {
            self.tags.remove(*key);
        }
    }

    /// Derives a child logger with one more tag. The parent is unchanged.
    #[must_use]
    pub fn with(&self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        let mut child = self.clone();
        child.tag_one(key, value);
        child
    }

    /// Emits a message at `level`.
    pub fn log(&self, level: Level, message: impl Into<String>) {
        self.sink.emit(LogRecord {
            level,
            message: Some(message.into()),
            payload: None,
            tags: self.tags.clone(),
        });
    }

    /// Emits a structured payload at `level`.
    ///
    /// A payload that cannot be serialized is replaced by its error text.
    pub fn var(&self, level: Level, payload: impl Serialize) {
        let payload = serde_json::to_value(payload)
            .unwrap_or_else(|e| Value::String(format!("<unserializable: {e}>")));
        self.sink.emit(LogRecord {
            level,
            message: None,
            payload: Some(payload),
            tags: self.tags.clone(),
        });
    }

    /// Emits a trace message.
    pub fn trace(&self, message: impl Into<String>) {
        self.log(Level::Trace, message);
    }

    /// Emits a debug message.
    pub fn debug(&self, message: impl Into<String>) {
        self.log(Level::Debug, message);
    }

    /// Emits an info message.
    pub fn info(&self, message: impl Into<String>) {
        self.log(Level::Info, message);
    }

    /// Emits a warning.
    pub fn warn(&self, message: impl Into<String>) {
        self.log(Level::Warn, message);
    }

    /// Emits an error message.
    pub fn error(&self, message: impl Into<String>) {
        self.log(Level::Error, message);
    }

    /// Emits a fatal message.
    pub fn fatal(&self, message: impl Into<String>) {
        self.log(Level::Fatal, message);
    }

    /// Emits a trace payload.
    pub fn trace_var(&self, payload: impl Serialize) {
        self.var(Level::Trace, payload);
    }

    /// Emits a debug payload.
    pub fn debug_var(&self, payload: impl Serialize) {
        self.var(Level::Debug, payload);
    }

    /// Emits an info payload.
    pub fn info_var(&self, payload: impl Serialize) {
        self.var(Level::Info, payload);
    }

    /// Emits a warning payload.
    pub fn warn_var(&self, payload: impl Serialize) {
        self.var(Level::Warn, payload);
    }

    /// Emits an error payload.
    pub fn error_var(&self, payload: impl Serialize) {
        self.var(Level::Error, payload);
    }

    /// Emits a fatal payload.
    pub fn fatal_var(&self, payload: impl Serialize) {
        self.var(Level::Fatal, payload);
    }
}

impl Default for Logger {
    fn default() -> Self {
        Self::tracing()
    }
}

impl fmt::Debug for Logger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Logger")
            .field("tags", &self.tags)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::MemorySink;
    use serde_json::json;

    #[test]
    fn test_message_record() {
        let sink = MemorySink::new();
        let log = Logger::new(sink.clone());
        log.warn("careful");

        let records = sink.records();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].level, Level::Warn);
        assert_eq!(records[0].message.as_deref(), Some("careful"));
        assert!(records[0].payload.is_none());
    }

    #[test]
    fn test_var_record() {
        let sink = MemorySink::new();
        let log = Logger::new(sink.clone());
        log.info_var(json!({"req": {"method": "GET"}}));

        let records = sink.records();
        assert_eq!(records[0].payload, Some(json!({"req": {"method": "GET"}})));
        assert!(records[0].message.is_none());
    }

    #[test]
    fn test_with_does_not_mutate_parent() {
        let sink = MemorySink::new();
        let parent = Logger::new(sink.clone());
        let child = parent.with("handler", "one");
        let sibling = parent.with("handler", "two");

        child.info("a");
        sibling.info("b");
        parent.info("c");

        let records = sink.records();
        assert_eq!(records[0].tags["handler"], "one");
        assert_eq!(records[1].tags["handler"], "two");
        assert!(records[2].tags.get("handler").is_none());
    }

    #[test]
    fn test_tag_and_untag() {
        let mut log = Logger::new(MemorySink::new());
        let mut tags = Tags::new();
        tags.insert("commit".to_string(), json!("abc"));
        tags.insert("env".to_string(), json!("test"));
        log.tag(tags);
        assert_eq!(log.tags().len(), 2);

        log.untag(&["commit", "missing"]);
        assert_eq!(log.tags().len(), 1);
        assert_eq!(log.tags()["env"], "test");
    }

    #[test]
    fn test_init_reaches_sink() {
        let sink = MemorySink::new();
        let log = Logger::new(sink.clone());
        log.init();
        log.init();
        assert_eq!(sink.init_count(), 2);
    }

    #[test]
    fn test_level_display() {
        assert_eq!(Level::Fatal.to_string(), "fatal");
        assert!(Level::Trace < Level::Fatal);
    }

    #[test]
    fn test_tracing_sink_does_not_panic_without_subscriber() {
        let log = Logger::tracing().with("handler", "quiet");
        log.fatal_var(json!({"unhandledError": "boom"}));
        log.trace("nothing listening");
    }

    #[test]
    fn test_tracing_sink_init_keeps_first_subscriber() {
        let sink = TracingSink::with_config(LogConfig::production());
        sink.init();
        assert!(tracing::dispatcher::has_been_set());

        // Whoever installed first, a later install attempt is refused and
        // a repeated init is a silent no-op.
        assert!(matches!(
            init_logging(&LogConfig::development()),
            Err(crate::TelemetryError::LoggingInit(_))
        ));
        sink.init();
        Logger::new(sink).with("handler", "twice").info("still logging");
    }

    #[test]
    fn test_tracing_sink_without_config_installs_nothing() {
        let sink = TracingSink::new();
        sink.init();
        sink.init();
    }
}
