//! Layered settings loader.

use std::fmt;
use std::fs;
use std::path::Path;

use serde::Deserialize;

use crate::source::{ConfigSource, EnvSource, MapSource};
use crate::{ConfigError, ProjectSettings};

/// Loads [`ProjectSettings`] from layers, later layers overriding earlier ones:
/// 1. Default values
/// 2. Configuration files (TOML or JSON)
/// 3. `.env` files and other key/value sources
/// 4. Environment variables
///
/// File and source layers apply in the order they are added; the process
/// environment is read last when enabled with [`with_env`](Self::with_env).
///
/// # Example
///
/// ```no_run
/// use portico_config::ConfigLoader;
///
/// # fn main() -> Result<(), portico_config::ConfigError> {
/// let settings = ConfigLoader::new()
///     .with_optional_file("project.toml")?
///     .with_optional_dotenv(".env")?
///     .with_env()
///     .load()?;
/// # Ok(())
/// # }
/// ```
pub struct ConfigLoader {
    settings: ProjectSettings,
    sources: Vec<Box<dyn ConfigSource>>,
    env: bool,
}

// File layer: only the fields a file actually names are applied.
#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct FileSettings {
    commit: Option<String>,
    env: Option<String>,
    environment: Option<String>,
    key: Option<String>,
    version: Option<String>,
    unavailable: Option<bool>,
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for ConfigLoader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConfigLoader")
            .field("settings", &self.settings)
            .field("sources", &self.sources.len())
            .field("env", &self.env)
            .finish()
    }
}

impl ConfigLoader {
    /// Create a new loader starting from default settings.
    #[must_use]
    pub fn new() -> Self {
        Self {
            settings: ProjectSettings::default(),
            sources: Vec::new(),
            env: false,
        }
    }

    /// Load settings from a file. The format follows the extension
    /// (`.toml` or `.json`).
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if the file is missing, unreadable, malformed,
    /// or names an unknown field.
    pub fn with_file<P: AsRef<Path>>(self, path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();

        if !path.exists() {
            return Err(ConfigError::file_not_found(path));
        }

        let content = fs::read_to_string(path).map_err(|e| ConfigError::read_error(path, e))?;

        let format = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_lowercase)
            .unwrap_or_default();

        self.with_string(&content, &format)
    }

    /// Load settings from a file if it exists.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if the file exists but cannot be loaded.
    pub fn with_optional_file<P: AsRef<Path>>(self, path: P) -> Result<Self, ConfigError> {
        if path.as_ref().exists() {
            self.with_file(path)
        } else {
            Ok(self)
        }
    }

    /// Load settings from a string in `format` ("toml" or "json").
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if parsing fails or the format is unknown.
    ///
    /// ```
    /// use portico_config::ConfigLoader;
    ///
    /// let settings = ConfigLoader::new()
    ///     .with_string(r#"key = "geese""#, "toml")
    ///     .unwrap()
    ///     .load()
    ///     .unwrap();
    ///
    /// assert_eq!(settings.key.as_deref(), Some("geese"));
    /// ```
    pub fn with_string(mut self, content: &str, format: &str) -> Result<Self, ConfigError> {
        let file: FileSettings = match format.to_lowercase().as_str() {
            "toml" => toml::from_str(content)?,
            "json" => serde_json::from_str(content)?,
            other => return Err(ConfigError::UnsupportedFormat(other.to_string())),
        };

        self.merge_file(file);
        Ok(self)
    }

    /// Read `KEY=value` pairs from a `.env` file. The process environment is
    /// not modified.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if the file is missing or malformed.
    pub fn with_dotenv<P: AsRef<Path>>(self, path: P) -> Result<Self, ConfigError> {
        let source = MapSource::from_dotenv(path)?;
        Ok(self.with_source(source))
    }

    /// Read a `.env` file if it exists.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if the file exists but is malformed.
    pub fn with_optional_dotenv<P: AsRef<Path>>(self, path: P) -> Result<Self, ConfigError> {
        if path.as_ref().exists() {
            self.with_dotenv(path)
        } else {
            Ok(self)
        }
    }

    /// Add an arbitrary key/value source.
    #[must_use]
    pub fn with_source(mut self, source: impl ConfigSource + 'static) -> Self {
        self.sources.push(Box::new(source));
        self
    }

    /// Apply `PROJECT_*` environment variables last.
    #[must_use]
    pub fn with_env(mut self) -> Self {
        self.env = true;
        self
    }

    /// Finalize and return the settings.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::EnvParseError` if a source holds a malformed
    /// boolean.
    pub fn load(mut self) -> Result<ProjectSettings, ConfigError> {
        for source in &self.sources {
            self.settings.apply(source.as_ref())?;
        }
        if self.env {
            self.settings.apply(&EnvSource)?;
        }
        Ok(self.settings)
    }

    fn merge_file(&mut self, file: FileSettings) {
        let target = &mut self.settings;
        if file.commit.is_some() {
            target.commit = file.commit;
        }
        if file.env.is_some() {
            target.env = file.env;
        }
        if file.environment.is_some() {
            target.environment = file.environment;
        }
        if file.key.is_some() {
            target.key = file.key;
        }
        if file.version.is_some() {
            target.version = file.version;
        }
        if let Some(unavailable) = file.unavailable {
            target.unavailable = unavailable;
        }
    }
}
