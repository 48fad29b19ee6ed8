//! Project settings for Portico.
//!
//! Wrapped handlers read a handful of project-wide facts: the deployed
//! commit, the environment, the project key and version, and whether the
//! project is currently unavailable. They come from a [`ConfigSource`],
//! usually the process environment:
//!
//! | Key | Field | Used for |
//! |-----|-------|----------|
//! | `PROJECT_COMMIT` | `commit` | `commit` log tag |
//! | `PROJECT_ENV` | `env` | `env` log tag |
//! | `PROJECT_ENVIRONMENT` | `environment` | `x-project-environment` header |
//! | `PROJECT_KEY` | `key` | `project` log tag, `x-project-key` header |
//! | `PROJECT_VERSION` | `version` | default handler version |
//! | `PROJECT_UNAVAILABLE` | `unavailable` | default availability gate |
//!
//! [`ConfigLoader`] layers defaults, TOML/JSON files, `.env` files and the
//! environment.
//!
//! # Example
//!
//! ```
//! use portico_config::{ConfigLoader, MapSource};
//!
//! # fn main() -> Result<(), portico_config::ConfigError> {
//! let settings = ConfigLoader::new()
//!     .with_string("key = \"geese\"", "toml")?
//!     .with_source(MapSource::new().with("PROJECT_VERSION", "1.0.0"))
//!     .load()?;
//!
//! assert_eq!(settings.key.as_deref(), Some("geese"));
//! assert_eq!(settings.version.as_deref(), Some("1.0.0"));
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod error;
mod loader;
mod settings;
mod source;

pub use error::ConfigError;
pub use loader::ConfigLoader;
pub use settings::{keys, ProjectSettings};
pub use source::{parse_bool, ConfigSource, EnvSource, MapSource};
