//! Tagged, structured logging for Portico.
//!
//! Handlers log through a [`Logger`]: a set of persistent tags plus a
//! [`LogSink`]. The default sink, [`TracingSink`], turns records into
//! `tracing` events; [`MemorySink`] captures them for tests.
//!
//! ```text
//!   Logger ──tags──► LogRecord ──► LogSink
//!                                   ├── TracingSink ──► tracing-subscriber (JSON / pretty)
//!                                   └── MemorySink  ──► Vec<LogRecord>
//! ```
//!
//! # Example
//!
//! ```rust,ignore
//! use portico_telemetry::{LogConfig, Logger, TracingSink};
//!
//! let log = Logger::new(TracingSink::with_config(LogConfig::production()));
//! log.init();
//! log.with("handler", "users").info("ready");
//! ```

#![warn(missing_docs)]
#![forbid(unsafe_code)]

pub mod error;
pub mod fixtures;
pub mod logger;
pub mod logging;

pub use error::TelemetryError;
pub use fixtures::MemorySink;
pub use logger::{Level, LogRecord, LogSink, Logger, Tags, TracingSink};
pub use logging::{init_logging, LogConfig, LogFormat};

/// Result type for telemetry operations.
pub type TelemetryResult<T> = Result<T, TelemetryError>;
