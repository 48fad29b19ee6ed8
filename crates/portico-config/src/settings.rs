//! Project-wide settings resolved from configuration sources.

use crate::source::{parse_bool, ConfigSource};
use crate::ConfigError;
use serde::{Deserialize, Serialize};

/// Environment keys read into [`ProjectSettings`].
pub mod keys {
    /// Commit id of the deployed build.
    pub const COMMIT: &str = "PROJECT_COMMIT";
    /// Environment id, used as the `env` log tag.
    pub const ENV: &str = "PROJECT_ENV";
    /// Environment name, sent as `x-project-environment`.
    pub const ENVIRONMENT: &str = "PROJECT_ENVIRONMENT";
    /// Project key.
    pub const KEY: &str = "PROJECT_KEY";
    /// Project version.
    pub const VERSION: &str = "PROJECT_VERSION";
    /// Marks every handler unavailable.
    pub const UNAVAILABLE: &str = "PROJECT_UNAVAILABLE";

    /// Every key, in resolution order.
    pub const ALL: [&str; 6] = [COMMIT, ENV, ENVIRONMENT, KEY, VERSION, UNAVAILABLE];
}

/// Settings shared by every wrapped handler of a project.
///
/// In files the fields use their lowercase names:
///
/// ```toml
/// commit = "4f2a9c1"
/// env = "stage"
/// environment = "staging"
/// key = "geese"
/// version = "1.4.0"
/// unavailable = false
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProjectSettings {
    /// Commit id.
    pub commit: Option<String>,
    /// Environment id.
    pub env: Option<String>,
    /// Environment name.
    pub environment: Option<String>,
    /// Project key.
    pub key: Option<String>,
    /// Project version.
    pub version: Option<String>,
    /// Whether handlers should refuse work.
    pub unavailable: bool,
}

impl ProjectSettings {
    /// Resolves settings from a single source, starting from defaults.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::EnvParseError` if `PROJECT_UNAVAILABLE` is not
    /// a recognizable boolean.
    ///
    /// ```
    /// use portico_config::{MapSource, ProjectSettings};
    ///
    /// let source = MapSource::new()
    ///     .with("PROJECT_KEY", "geese")
    ///     .with("PROJECT_UNAVAILABLE", "yes");
    /// let settings = ProjectSettings::from_source(&source).unwrap();
    ///
    /// assert_eq!(settings.key.as_deref(), Some("geese"));
    /// assert!(settings.unavailable);
    /// ```
    pub fn from_source(source: &dyn ConfigSource) -> Result<Self, ConfigError> {
        let mut settings = Self::default();
        settings.apply(source)?;
        Ok(settings)
    }

    /// Reads settings from `source`, keeping the default for a malformed
    /// `PROJECT_UNAVAILABLE` instead of failing.
    ///
    /// Every other field is still read. The rejected flag's error is
    /// returned alongside the settings.
    pub fn from_source_lenient(source: &dyn ConfigSource) -> (Self, Option<ConfigError>) {
        let mut settings = Self::default();
        let error = settings.apply(source).err();
        (settings, error)
    }

    /// Overrides fields with values present in `source`.
    ///
    /// Empty strings count as unset for the string fields. The string
    /// fields are applied before the flag, so they survive a flag error.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::EnvParseError` on a malformed boolean flag.
    pub fn apply(&mut self, source: &dyn ConfigSource) -> Result<(), ConfigError> {
        let text = |key: &str| source.get(key).filter(|v| !v.is_empty());

        if let Some(v) = text(keys::COMMIT) {
            self.commit = Some(v);
        }
        if let Some(v) = text(keys::ENV) {
            self.env = Some(v);
        }
        if let Some(v) = text(keys::ENVIRONMENT) {
            self.environment = Some(v);
        }
        if let Some(v) = text(keys::KEY) {
            self.key = Some(v);
        }
        if let Some(v) = text(keys::VERSION) {
            self.version = Some(v);
        }
        if let Some(v) = source.get(keys::UNAVAILABLE) {
            self.unavailable = parse_bool(&v)
                .ok_or_else(|| ConfigError::env_parse_error(keys::UNAVAILABLE, "expected boolean"))?;
        }

        Ok(())
    }
}
