//! Declarative configuration of a wrapped handler.

use indexmap::IndexMap;
use portico_core::{BoxFuture, Request, Response};
use serde_json::Value;
use std::fmt;
use std::sync::Arc;

type StepFn =
    dyn for<'a> Fn(&'a mut Request, &'a mut Response) -> BoxFuture<'a, anyhow::Result<()>> + Send + Sync;

type ProducerFn =
    dyn for<'a> Fn(&'a mut Request, &'a mut Response) -> BoxFuture<'a, anyhow::Result<Value>> + Send + Sync;

/// A validate, setup or teardown step.
///
/// # Example
///
/// ```
/// use portico_core::ProjectError;
/// use portico_middleware::Step;
///
/// let require_auth = Step::sync(|req, _res| {
///     if req.header("authorization").is_none() {
///         return Err(ProjectError::unauthorized().into());
///     }
///     Ok(())
/// });
///
/// let warm_cache = Step::new(|_req, _res| Box::pin(async move {
///     Ok(())
/// }));
/// # let _ = (require_auth, warm_cache);
/// ```
#[derive(Clone)]
pub struct Step {
    f: Arc<StepFn>,
}

impl Step {
    /// Creates a step from an async closure.
    pub fn new<F>(f: F) -> Self
    where
        F: for<'a> Fn(&'a mut Request, &'a mut Response) -> BoxFuture<'a, anyhow::Result<()>>
            + Send
            + Sync
            + 'static,
    {
        Self { f: Arc::new(f) }
    }

    /// Creates a step from a synchronous closure.
    pub fn sync<F>(f: F) -> Self
    where
        F: Fn(&mut Request, &mut Response) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        Self::new(move |req, res| {
            let result = f(req, res);
            Box::pin(async move { result })
        })
    }

    /// Runs the step.
    pub async fn run(&self, req: &mut Request, res: &mut Response) -> anyhow::Result<()> {
        (self.f)(req, res).await
    }
}

impl fmt::Debug for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Step")
    }
}

/// A request local: a fixed value, or a producer run per request.
#[derive(Clone)]
pub enum LocalValue {
    /// Stored as is.
    Value(Value),
    /// Awaited per request; its result is stored.
    Producer(Arc<ProducerFn>),
}

impl LocalValue {
    /// Creates a producer from an async closure.
    pub fn producer<F>(f: F) -> Self
    where
        F: for<'a> Fn(&'a mut Request, &'a mut Response) -> BoxFuture<'a, anyhow::Result<Value>>
            + Send
            + Sync
            + 'static,
    {
        Self::Producer(Arc::new(f))
    }

    /// Creates a producer from a synchronous closure.
    pub fn sync_producer<F>(f: F) -> Self
    where
        F: Fn(&mut Request, &mut Response) -> anyhow::Result<Value> + Send + Sync + 'static,
    {
        Self::producer(move |req, res| {
            let result = f(req, res);
            Box::pin(async move { result })
        })
    }

    /// Resolves the value for the current request.
    pub async fn resolve(&self, req: &mut Request, res: &mut Response) -> anyhow::Result<Value> {
        match self {
            Self::Value(value) => Ok(value.clone()),
            Self::Producer(produce) => produce(req, res).await,
        }
    }
}

impl From<Value> for LocalValue {
    fn from(value: Value) -> Self {
        Self::Value(value)
    }
}

impl fmt::Debug for LocalValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Value(value) => f.debug_tuple("Value").field(value).finish(),
            Self::Producer(_) => f.write_str("Producer"),
        }
    }
}

/// Configuration of a wrapped handler. Immutable once built.
///
/// # Example
///
/// ```
/// use portico_middleware::{HandlerConfig, Step};
/// use serde_json::json;
///
/// let config = HandlerConfig::builder()
///     .name("geese")
///     .version("1.2.0")
///     .validate(Step::sync(|_req, _res| Ok(())))
///     .local("flock", json!("canada"))
///     .build();
///
/// assert_eq!(config.name(), Some("geese"));
/// assert_eq!(config.validate_steps().len(), 1);
/// ```
#[derive(Debug, Clone, Default)]
pub struct HandlerConfig {
    name: Option<String>,
    unavailable: Option<bool>,
    version: Option<String>,
    validate: Vec<Step>,
    setup: Vec<Step>,
    teardown: Vec<Step>,
    locals: IndexMap<String, LocalValue>,
}

impl HandlerConfig {
    /// Creates an empty configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts a builder.
    #[must_use]
    pub fn builder() -> HandlerConfigBuilder {
        HandlerConfigBuilder::default()
    }

    /// Configuration with only a name.
    #[must_use]
    pub fn named(name: impl Into<String>) -> Self {
        Self::builder().name(name).build()
    }

    /// Explicit handler name.
    #[must_use]
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// Explicit availability override.
    #[must_use]
    pub fn unavailable(&self) -> Option<bool> {
        self.unavailable
    }

    /// Explicit version override.
    #[must_use]
    pub fn version(&self) -> Option<&str> {
        self.version.as_deref()
    }

    /// Validation steps, in order.
    #[must_use]
    pub fn validate_steps(&self) -> &[Step] {
        &self.validate
    }

    /// Setup steps, in order.
    #[must_use]
    pub fn setup_steps(&self) -> &[Step] {
        &self.setup
    }

    /// Teardown steps, in order.
    #[must_use]
    pub fn teardown_steps(&self) -> &[Step] {
        &self.teardown
    }

    /// Locals, in declaration order.
    #[must_use]
    pub fn locals(&self) -> &IndexMap<String, LocalValue> {
        &self.locals
    }
}

/// Builder for [`HandlerConfig`].
#[derive(Debug, Default)]
pub struct HandlerConfigBuilder {
    config: HandlerConfig,
}

impl HandlerConfigBuilder {
    /// Sets the handler name.
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.config.name = Some(name.into());
        self
    }

    /// Overrides availability.
    pub fn unavailable(mut self, unavailable: bool) -> Self {
        self.config.unavailable = Some(unavailable);
        self
    }

    /// Overrides the version.
    pub fn version(mut self, version: impl Into<String>) -> Self {
        self.config.version = Some(version.into());
        self
    }

    /// Appends a validation step.
    pub fn validate(mut self, step: Step) -> Self {
        self.config.validate.push(step);
        self
    }

    /// Appends a setup step.
    pub fn setup(mut self, step: Step) -> Self {
        self.config.setup.push(step);
        self
    }

    /// Appends a teardown step.
    pub fn teardown(mut self, step: Step) -> Self {
        self.config.teardown.push(step);
        self
    }

    /// Declares a local. Redeclaring a key replaces its value but keeps its
    /// original position.
    pub fn local(mut self, key: impl Into<String>, value: impl Into<LocalValue>) -> Self {
        self.config.locals.insert(key.into(), value.into());
        self
    }

    /// Finishes the configuration.
    pub fn build(self) -> HandlerConfig {
        self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::{Method, Uri};
    use serde_json::json;

    fn pair() -> (Request, Response) {
        (
            Request::new(Method::GET, Uri::from_static("/")),
            Response::new(),
        )
    }

    #[test]
    fn test_sync_step_runs() {
        let step = Step::sync(|_req, res| {
            res.set_header("x-step", "ran")?;
            Ok(())
        });
        let (mut req, mut res) = pair();
        tokio_test::block_on(step.run(&mut req, &mut res)).unwrap();
        assert_eq!(res.header("x-step"), Some("ran"));
    }

    #[test]
    fn test_async_step_error() {
        let step = Step::new(|_req, _res| Box::pin(async move { Err(anyhow::anyhow!("nope")) }));
        let (mut req, mut res) = pair();
        let err = tokio_test::block_on(step.run(&mut req, &mut res)).unwrap_err();
        assert_eq!(err.to_string(), "nope");
    }

    #[test]
    fn test_local_value_resolution() {
        let (mut req, mut res) = pair();
        let fixed = LocalValue::from(json!(3));
        let produced = LocalValue::sync_producer(|req, _res| Ok(json!(req.url())));

        assert_eq!(
            tokio_test::block_on(fixed.resolve(&mut req, &mut res)).unwrap(),
            json!(3)
        );
        assert_eq!(
            tokio_test::block_on(produced.resolve(&mut req, &mut res)).unwrap(),
            json!("/")
        );
    }

    #[test]
    fn test_builder_keeps_order() {
        let config = HandlerConfig::builder()
            .local("b", json!(1))
            .local("a", json!(2))
            .local("b", json!(3))
            .teardown(Step::sync(|_, _| Ok(())))
            .teardown(Step::sync(|_, _| Ok(())))
            .unavailable(false)
            .build();

        let keys: Vec<&str> = config.locals().keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["b", "a"]);
        assert_eq!(config.teardown_steps().len(), 2);
        assert_eq!(config.unavailable(), Some(false));
        assert!(config.name().is_none());
    }

    #[test]
    fn test_named() {
        assert_eq!(HandlerConfig::named("echo").name(), Some("echo"));
    }
}
