//! String-keyed configuration sources.

use crate::ConfigError;
use std::collections::HashMap;
use std::path::Path;

/// Capability for looking up raw configuration values by key.
pub trait ConfigSource: Send + Sync {
    /// Returns the value for `key`, if set.
    fn get(&self, key: &str) -> Option<String>;
}

/// Reads the process environment.
#[derive(Debug, Clone, Copy, Default)]
pub struct EnvSource;

impl ConfigSource for EnvSource {
    fn get(&self, key: &str) -> Option<String> {
        std::env::var(key).ok()
    }
}

/// In-memory source, mostly for tests and embedding.
///
/// ```
/// use portico_config::{ConfigSource, MapSource};
///
/// let source = MapSource::new().with("PROJECT_KEY", "geese");
/// assert_eq!(source.get("PROJECT_KEY").as_deref(), Some("geese"));
/// assert!(source.get("PROJECT_COMMIT").is_none());
/// ```
#[derive(Debug, Clone, Default)]
pub struct MapSource {
    values: HashMap<String, String>,
}

impl MapSource {
    /// Creates an empty source.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a value.
    #[must_use]
    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.insert(key, value);
        self
    }

    /// Adds a value in place.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.values.insert(key.into(), value.into());
    }

    /// Reads the key/value pairs of a `.env` file without touching the
    /// process environment.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if the file is missing or malformed.
    pub fn from_dotenv(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(ConfigError::file_not_found(path));
        }

        let iter = dotenvy::from_path_iter(path).map_err(|e| ConfigError::DotenvError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        let mut source = Self::new();
        for item in iter {
            let (key, value) = item.map_err(|e| ConfigError::DotenvError {
                path: path.to_path_buf(),
                reason: e.to_string(),
            })?;
            source.insert(key, value);
        }
        Ok(source)
    }

    /// Number of values held.
    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Whether the source holds no values.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl ConfigSource for MapSource {
    fn get(&self, key: &str) -> Option<String> {
        self.values.get(key).cloned()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for MapSource {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            values: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

/// Parses a boolean flag the way environment flags are usually written.
///
/// Accepts `true/false`, `1/0`, `yes/no` and `on/off`, case-insensitively.
#[must_use]
pub fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_parse_bool() {
        assert_eq!(parse_bool("true"), Some(true));
        assert_eq!(parse_bool("TRUE"), Some(true));
        assert_eq!(parse_bool("1"), Some(true));
        assert_eq!(parse_bool("on"), Some(true));
        assert_eq!(parse_bool("No"), Some(false));
        assert_eq!(parse_bool("0"), Some(false));
        assert_eq!(parse_bool("maybe"), None);
        assert_eq!(parse_bool(""), None);
    }

    #[test]
    fn test_map_source_from_iter() {
        let source: MapSource = [("A", "1"), ("B", "2")].into_iter().collect();
        assert_eq!(source.len(), 2);
        assert_eq!(source.get("B").as_deref(), Some("2"));
    }

    #[test]
    fn test_env_source_missing_key() {
        assert!(EnvSource
            .get("PORTICO_TEST_SURELY_UNSET_VARIABLE_91823")
            .is_none());
    }

    #[test]
    fn test_from_dotenv() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "PROJECT_KEY=geese").unwrap();
        writeln!(file, "# comment").unwrap();
        writeln!(file, "PROJECT_VERSION=\"1.2.3\"").unwrap();

        let source = MapSource::from_dotenv(file.path()).unwrap();
        assert_eq!(source.get("PROJECT_KEY").as_deref(), Some("geese"));
        assert_eq!(source.get("PROJECT_VERSION").as_deref(), Some("1.2.3"));
        assert!(std::env::var("PROJECT_KEY").map_or(true, |v| v != "geese"));
    }

    #[test]
    fn test_from_dotenv_missing_file() {
        let result = MapSource::from_dotenv("/definitely/not/here/.env");
        assert!(matches!(result, Err(ConfigError::FileNotFound { .. })));
    }
}
