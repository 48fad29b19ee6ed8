//! The wrapped-handler lifecycle.
//!
//! ```text
//! INIT → request log → send hook → AVAILABILITY → VALIDATE → SETUP → LOCALS → INVOKE → TEARDOWN → RESPOND
//! ```
//!
//! | Failure in | Skips | Teardown | Answered with |
//! |------------|-------|----------|---------------|
//! | AVAILABILITY | everything | no | 503 |
//! | VALIDATE | remaining validators, SETUP, LOCALS, INVOKE | no | that error |
//! | SETUP / LOCALS | the rest of the stage, INVOKE | yes | that error |
//! | INVOKE / TEARDOWN | nothing | yes | every accumulated error |
//!
//! Nothing escapes [`WrappedHandler::call`]. An error raised after the
//! handler already sent its response is logged, not sent.

use crate::config::{HandlerConfig, LocalValue, Step};
use crate::context::{RequestState, ResponseState};
use crate::decorate::{decorate_response, DecorateContext};
use crate::project::Project;
use crate::respond::{classify, respond_with_error};
use indexmap::IndexMap;
use portico_core::{summarize_request, summarize_response, BoxFuture, ProjectError, Request, Response};
use portico_telemetry::Logger;
use serde_json::{json, Map, Value};
use std::fmt;
use std::sync::Arc;

type HandlerFn<A> = dyn for<'a> Fn(&'a mut Request, &'a mut Response, A) -> BoxFuture<'a, anyhow::Result<()>>
    + Send
    + Sync;

/// A handler wrapped into the request lifecycle.
///
/// Cheap to clone. Safe to chain with other wrapped handlers over the same
/// request/response pair: once-per-request effects happen once.
pub struct WrappedHandler<A> {
    inner: Arc<Inner<A>>,
}

struct Inner<A> {
    project: Project,
    name: Option<String>,
    unavailable: bool,
    version: Option<String>,
    validate: Vec<Step>,
    setup: Vec<Step>,
    teardown: Vec<Step>,
    locals: IndexMap<String, LocalValue>,
    handler: Box<HandlerFn<A>>,
}

impl<A> Clone for WrappedHandler<A> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<A> fmt::Debug for WrappedHandler<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WrappedHandler")
            .field("name", &self.inner.name)
            .field("unavailable", &self.inner.unavailable)
            .field("version", &self.inner.version)
            .finish_non_exhaustive()
    }
}

impl<A: Send + 'static> WrappedHandler<A> {
    pub(crate) fn new(
        project: Project,
        name: Option<String>,
        unavailable: bool,
        version: Option<String>,
        config: HandlerConfig,
        handler: Box<HandlerFn<A>>,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                project,
                name,
                unavailable,
                version,
                validate: config.validate_steps().to_vec(),
                setup: config.setup_steps().to_vec(),
                teardown: config.teardown_steps().to_vec(),
                locals: config.locals().clone(),
                handler,
            }),
        }
    }

    /// Resolved handler name.
    #[must_use]
    pub fn name(&self) -> Option<&str> {
        self.inner.name.as_deref()
    }

    /// Resolved version.
    #[must_use]
    pub fn version(&self) -> Option<&str> {
        self.inner.version.as_deref()
    }

    /// Whether this handler refuses every request.
    #[must_use]
    pub fn is_unavailable(&self) -> bool {
        self.inner.unavailable
    }

    /// Runs the full lifecycle for one request.
    ///
    /// Failures are answered on `res` as JSON:API error documents; this
    /// never returns an error.
    pub async fn call(&self, req: &mut Request, res: &mut Response, args: A) {
        let inner = &*self.inner;
        let log = inner.prepare(req, res);

        if let Err(error) = inner.run(req, res, args, &log).await {
            respond_with_error(res, error, &log);
        }
    }
}

impl<A> Inner<A> {
    /// INIT, request logging and send-hook installation.
    fn prepare(&self, req: &mut Request, res: &mut Response) -> Logger {
        let state = RequestState::attach(req, || {
            self.project
                .request_logger(self.name.as_deref(), self.version.as_deref())
        });

        // Handler and version tags are local to each wrap.
        let mut log = state.logger().clone();
        match &self.name {
            Some(name) => log.tag_one("handler", name.as_str()),
            None => log.untag(&["handler"]),
        }
        match &self.version {
            Some(version) => log.tag_one("version", version.as_str()),
            None => log.untag(&["version"]),
        }

        if state.begin_init_logging() {
            state.logger().init();
            log.trace("Project logging in trace mode");
        }

        if state.begin_request_info() {
            log.info_var(json!({ "req": summarize_request(req) }));
        }

        let response_state = ResponseState::attach(res);
        if !response_state.original_json {
            response_state.original_json = true;
            self.install_hook(res, &log);
            Self::listen_for_finish(res, state, &log);
        }

        log
    }

    fn install_hook(&self, res: &mut Response, log: &Logger) {
        let project = self.project.clone();
        let handler = self.name.clone();
        let version = self.version.clone();
        let log = log.clone();

        res.set_json_hook(Arc::new(move |res: &mut Response, body: Value| {
            let state = ResponseState::attach(res);
            if !state.decorated_response {
                log.trace("Preparing response");
                state.log_response_body_json = Some(body.clone());
                state.decorated_response = true;

                let context = DecorateContext {
                    handler: handler.as_deref(),
                    version: version.as_deref(),
                };
                decorate_response(res, &context, project.settings(), project.invocation(), &log);
            }
            log.trace("Sending response");
            res.send_json(body);
        }));
    }

    fn listen_for_finish(res: &mut Response, state: RequestState, log: &Logger) {
        let log = log.clone();
        res.on_finish(move |res: &Response| {
            if !state.begin_response_info() {
                return;
            }
            log.trace("Response finish event");

            let body = ResponseState::of(res)
                .and_then(|s| s.log_response_body_json.clone())
                .unwrap_or(Value::Null);
            let mut extras = Map::new();
            extras.insert("body".to_string(), body);
            log.info_var(json!({ "res": summarize_response(res, extras) }));
        });
    }

    async fn run(
        &self,
        req: &mut Request,
        res: &mut Response,
        args: A,
        log: &Logger,
    ) -> anyhow::Result<()> {
        if self.unavailable {
            log.warn(
                "Project unavailable: either PROJECT_UNAVAILABLE=true or { unavailable: true } was passed to projectHandler",
            );
            log.debug("Intentionally throwing unavailable");
            return Err(ProjectError::unavailable().into());
        }

        if !self.validate.is_empty() {
            log.trace("Handler validate");
            for step in &self.validate {
                step.run(req, res).await?;
            }
        }

        let prepared = self.setup_and_locals(req, res, log).await;

        let mut errors = Vec::new();
        if prepared.is_ok() {
            let name = self.name.as_deref().unwrap_or_default();
            log.trace(format!("Handler call {{name:{name}}}"));
            match (self.handler)(req, res, args).await {
                Ok(()) => log.trace(format!("Handler exit {{name:{name}}}")),
                Err(error) => {
                    log.debug("Caught runtime error in handler");
                    errors.push(classify(error, log));
                }
            }
        }

        if !self.teardown.is_empty() {
            log.trace("Handler teardown");
            for step in &self.teardown {
                if let Err(error) = step.run(req, res).await {
                    log.debug("Caught runtime error in teardown");
                    errors.push(classify(error, log));
                }
            }
        }

        prepared?;

        match ProjectError::from_accumulated(errors) {
            Some(error) => Err(error.into()),
            None => Ok(()),
        }
    }

    async fn setup_and_locals(
        &self,
        req: &mut Request,
        res: &mut Response,
        log: &Logger,
    ) -> anyhow::Result<()> {
        if !self.setup.is_empty() {
            log.trace("Handler setup");
            for step in &self.setup {
                step.run(req, res).await?;
            }
        }

        if !self.locals.is_empty() {
            log.trace("Handler locals");
            for (key, local) in &self.locals {
                let value = local.resolve(req, res).await?;
                req.locals_mut().insert(key.clone(), value);
            }
        }

        Ok(())
    }
}
