//! Project-wide collaborators shared by every wrapped handler.

use crate::config::HandlerConfig;
use crate::pipeline::WrappedHandler;
use portico_config::{ConfigError, ConfigSource, EnvSource, ProjectSettings};
use portico_core::invocation::{short_id, TaskLocalInvocation};
use portico_core::{BoxFuture, InvocationResolver, Request, Response};
use portico_telemetry::{Logger, Tags};
use serde_json::Value;
use std::fmt;
use std::sync::Arc;

/// Settings, base logger and invocation resolver of a project.
///
/// Built once at startup; handlers wrapped by the same project share it.
///
/// # Example
///
/// ```
/// use portico_config::MapSource;
/// use portico_middleware::Project;
///
/// let source = MapSource::new()
///     .with("PROJECT_KEY", "geese")
///     .with("PROJECT_COMMIT", "4f2a9c1");
/// let project = Project::from_source(&source).unwrap();
///
/// let tags = project.environment_tags();
/// assert_eq!(tags["project"], "geese");
/// assert_eq!(tags["commit"], "4f2a9c1");
/// ```
#[derive(Clone)]
pub struct Project {
    settings: Arc<ProjectSettings>,
    logger: Logger,
    invocation: Arc<dyn InvocationResolver>,
}

impl Project {
    /// Creates a project logging through `tracing` and resolving invocation
    /// ids from the current task.
    #[must_use]
    pub fn new(settings: ProjectSettings) -> Self {
        Self {
            settings: Arc::new(settings),
            logger: Logger::tracing(),
            invocation: Arc::new(TaskLocalInvocation),
        }
    }

    /// Reads settings from the process environment.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` on a malformed `PROJECT_UNAVAILABLE`.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_source(&EnvSource)
    }

    /// Reads settings from `source`.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` on a malformed boolean flag.
    pub fn from_source(source: &dyn ConfigSource) -> Result<Self, ConfigError> {
        ProjectSettings::from_source(source).map(Self::new)
    }

    /// Reads the environment. A malformed `PROJECT_UNAVAILABLE` is treated
    /// as false with a warning; the other settings are kept.
    #[must_use]
    pub fn from_env_or_default() -> Self {
        Self::from_source_or_default(&EnvSource)
    }

    /// Reads `source` like [`Project::from_env_or_default`].
    #[must_use]
    pub fn from_source_or_default(source: &dyn ConfigSource) -> Self {
        let (settings, error) = ProjectSettings::from_source_lenient(source);
        if let Some(e) = error {
            tracing::warn!(error = %e, "Invalid project settings, treating PROJECT_UNAVAILABLE as false");
        }
        Self::new(settings)
    }

    /// Replaces the base logger.
    #[must_use]
    pub fn with_logger(mut self, logger: Logger) -> Self {
        self.logger = logger;
        self
    }

    /// Replaces the invocation resolver.
    #[must_use]
    pub fn with_invocation(mut self, invocation: impl InvocationResolver) -> Self {
        self.invocation = Arc::new(invocation);
        self
    }

    /// The project settings.
    #[must_use]
    pub fn settings(&self) -> &ProjectSettings {
        &self.settings
    }

    /// The untagged base logger.
    #[must_use]
    pub fn logger(&self) -> &Logger {
        &self.logger
    }

    /// The invocation resolver.
    #[must_use]
    pub fn invocation(&self) -> &dyn InvocationResolver {
        self.invocation.as_ref()
    }

    /// Tags describing the deployment and the current invocation, each
    /// present only when its source value is.
    #[must_use]
    pub fn environment_tags(&self) -> Tags {
        let mut tags = Tags::new();
        let settings = &self.settings;

        if let Some(commit) = &settings.commit {
            tags.insert("commit".to_string(), Value::from(commit.as_str()));
        }
        if let Some(env) = &settings.env {
            tags.insert("env".to_string(), Value::from(env.as_str()));
        }
        if let Some(invoke) = self.invocation.current_invocation() {
            tags.insert("shortInvoke".to_string(), Value::from(short_id(&invoke)));
            tags.insert("invoke".to_string(), Value::from(invoke));
        }
        if let Some(key) = &settings.key {
            tags.insert("project".to_string(), Value::from(key.as_str()));
        }
        if let Some(version) = &settings.version {
            tags.insert("version".to_string(), Value::from(version.as_str()));
        }

        tags
    }

    /// The base logger of a new request: environment tags plus the name and
    /// resolved version of the first handler to touch it.
    pub(crate) fn request_logger(&self, handler: Option<&str>, version: Option<&str>) -> Logger {
        let mut logger = self.logger.clone();
        logger.tag(self.environment_tags());
        if let Some(name) = handler {
            logger.tag_one("handler", name);
        }
        if let Some(version) = version {
            logger.tag_one("version", version);
        }
        logger
    }

    /// Wraps `handler` into the request lifecycle described by `config`.
    ///
    /// Defaults resolved here, once: the name falls back to the handler's
    /// own function name (closures have none), `unavailable` to
    /// `PROJECT_UNAVAILABLE`, and the version to `PROJECT_VERSION`.
    pub fn wrap<A, F>(&self, handler: F, config: HandlerConfig) -> WrappedHandler<A>
    where
        A: Send + 'static,
        F: for<'a> Fn(&'a mut Request, &'a mut Response, A) -> BoxFuture<'a, anyhow::Result<()>>
            + Send
            + Sync
            + 'static,
    {
        let name = config
            .name()
            .map(str::to_string)
            .or_else(function_name::<F>);
        let unavailable = config.unavailable().unwrap_or(self.settings.unavailable);
        let version = config
            .version()
            .map(str::to_string)
            .or_else(|| self.settings.version.clone());

        WrappedHandler::new(self.clone(), name, unavailable, version, config, Box::new(handler))
    }
}

impl Default for Project {
    fn default() -> Self {
        Self::new(ProjectSettings::default())
    }
}

impl fmt::Debug for Project {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Project")
            .field("settings", &self.settings)
            .field("logger", &self.logger)
            .finish_non_exhaustive()
    }
}

/// Name of a function item, `None` for closures.
fn function_name<F>() -> Option<String> {
    let full = std::any::type_name::<F>();
    if full.contains("{{closure}}") {
        return None;
    }
    let path = full.split('<').next().unwrap_or(full);
    path.rsplit("::")
        .next()
        .filter(|name| !name.is_empty())
        .map(str::to_string)
}
