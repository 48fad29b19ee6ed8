//! Configuration error types.

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while resolving project settings.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Configuration file not found.
    #[error("configuration file not found: {path}")]
    FileNotFound {
        /// Path to the missing file.
        path: PathBuf,
    },

    /// Failed to read a configuration or `.env` file.
    #[error("failed to read configuration file: {path}")]
    ReadError {
        /// Path to the file.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },

    /// TOML parsing error.
    #[error("failed to parse TOML configuration: {0}")]
    TomlError(#[from] toml::de::Error),

    /// JSON parsing error.
    #[error("failed to parse JSON configuration: {0}")]
    JsonError(#[from] serde_json::Error),

    /// `.env` parsing error.
    #[error("failed to parse dotenv file {path}: {reason}")]
    DotenvError {
        /// Path to the file.
        path: PathBuf,
        /// Explanation of the parsing error.
        reason: String,
    },

    /// Unsupported file format.
    #[error("unsupported configuration format: {0}")]
    UnsupportedFormat(String),

    /// Environment variable parsing error.
    #[error("failed to parse environment variable {var}: {reason}")]
    EnvParseError {
        /// The environment variable name.
        var: String,
        /// Explanation of the parsing error.
        reason: String,
    },
}

impl ConfigError {
    /// Create a new file not found error.
    pub fn file_not_found(path: impl Into<PathBuf>) -> Self {
        Self::FileNotFound { path: path.into() }
    }

    /// Create a new read error.
    pub fn read_error(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::ReadError {
            path: path.into(),
            source,
        }
    }

    /// Create a new environment variable parse error.
    pub fn env_parse_error(var: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::EnvParseError {
            var: var.into(),
            reason: reason.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_not_found_error() {
        let err = ConfigError::file_not_found("/path/to/project.toml");
        assert!(err.to_string().contains("/path/to/project.toml"));
    }

    #[test]
    fn test_env_parse_error() {
        let err = ConfigError::env_parse_error("PROJECT_UNAVAILABLE", "expected boolean");
        assert!(err.to_string().contains("PROJECT_UNAVAILABLE"));
        assert!(err.to_string().contains("expected boolean"));
    }

    #[test]
    fn test_unsupported_format() {
        let err = ConfigError::UnsupportedFormat("yaml".to_string());
        assert_eq!(err.to_string(), "unsupported configuration format: yaml");
    }
}
