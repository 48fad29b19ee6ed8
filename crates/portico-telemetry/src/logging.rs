//! Subscriber setup for the [`TracingSink`](crate::TracingSink).
//!
//! One process-wide `tracing-subscriber` registry with a single fmt layer,
//! JSON or pretty, filtered by an `EnvFilter` directive string.

use crate::error::TelemetryError;
use crate::TelemetryResult;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter, Layer, Registry};

/// Output format of the installed subscriber.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    /// One JSON object per event.
    #[default]
    Json,
    /// Multi-line human-readable output.
    Pretty,
}

/// Subscriber configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogConfig {
    /// `EnvFilter` directives, e.g. `"trace"` or `"portico=debug,info"`.
    pub filter: String,

    /// Output format.
    pub format: LogFormat,

    /// Whether events carry their source file and line.
    pub source_location: bool,
}

impl Default for LogConfig {
    /// JSON at trace level, so the pipeline's trace records are kept.
    fn default() -> Self {
        Self {
            filter: "trace".to_string(),
            format: LogFormat::Json,
            source_location: false,
        }
    }
}

impl LogConfig {
    /// Pretty output at debug level with source locations.
    #[must_use]
    pub fn development() -> Self {
        Self {
            filter: "debug".to_string(),
            format: LogFormat::Pretty,
            source_location: true,
        }
    }

    /// JSON output at info level.
    #[must_use]
    pub fn production() -> Self {
        Self {
            filter: "info".to_string(),
            format: LogFormat::Json,
            source_location: false,
        }
    }

    /// Replaces the filter directives.
    #[must_use]
    pub fn with_filter(mut self, filter: impl Into<String>) -> Self {
        self.filter = filter.into();
        self
    }
}

/// Installs the process-wide subscriber described by `config`.
///
/// # Errors
///
/// Returns `TelemetryError::InvalidConfig` for bad filter directives and
/// `TelemetryError::LoggingInit` if a subscriber is already installed.
pub fn init_logging(config: &LogConfig) -> TelemetryResult<()> {
    let filter = EnvFilter::try_new(&config.filter)
        .map_err(|e| TelemetryError::InvalidConfig(format!("Invalid log filter: {e}")))?;
    let location = config.source_location;

    let layer: Box<dyn Layer<Registry> + Send + Sync> = match config.format {
        LogFormat::Json => fmt::layer()
            .json()
            .with_file(location)
            .with_line_number(location)
            .with_filter(filter)
            .boxed(),
        LogFormat::Pretty => fmt::layer()
            .pretty()
            .with_file(location)
            .with_line_number(location)
            .with_filter(filter)
            .boxed(),
    };

    tracing_subscriber::registry()
        .with(layer)
        .try_init()
        .map_err(|e| TelemetryError::LoggingInit(e.to_string()))
}
