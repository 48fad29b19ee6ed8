//! Ordered composition of wrapped handlers over one request.
//!
//! A [`Chain`] runs its handlers in order. Each one receives a [`Next`] and
//! the chain moves on only when the handler called [`Next::proceed`]. The
//! continuation is applied after the handler's whole pipeline, teardown
//! included, has completed.

use bytes::Bytes;
use http_body_util::Full;
use portico_core::{ProjectError, Request, Response};
use portico_middleware::respond::send_error;
use portico_middleware::WrappedHandler;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Continuation handed to each handler of a [`Chain`].
#[derive(Debug, Clone, Default)]
pub struct Next {
    called: Arc<AtomicBool>,
}

impl Next {
    fn new() -> Self {
        Self::default()
    }

    /// Lets the chain continue with the following handler.
    pub fn proceed(&self) {
        self.called.store(true, Ordering::SeqCst);
    }

    /// Whether [`Next::proceed`] was called.
    pub fn was_called(&self) -> bool {
        self.called.load(Ordering::SeqCst)
    }
}

/// Handlers run in order over the same request/response pair.
///
/// # Example
///
/// ```
/// use portico::{Chain, HandlerConfig, Next, Project, Request, Response};
/// use serde_json::json;
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() {
/// let project = Project::default();
/// let chain = Chain::new()
///     .with(project.wrap(
///         |_req, _res, next: Next| {
///             next.proceed();
///             Box::pin(async { Ok(()) })
///         },
///         HandlerConfig::named("gate"),
///     ))
///     .with(project.wrap(
///         |_req, res, _next: Next| Box::pin(async move {
///             res.json(json!({ "goose": "honk" }));
///             Ok(())
///         }),
///         HandlerConfig::named("honk"),
///     ));
///
/// let mut req = Request::new(http::Method::GET, http::Uri::from_static("/"));
/// let mut res = Response::new();
/// assert_eq!(chain.run(&mut req, &mut res).await, 2);
/// assert_eq!(res.header("x-project-handler"), Some("gate"));
/// # }
/// ```
#[derive(Clone, Default)]
pub struct Chain {
    handlers: Vec<WrappedHandler<Next>>,
}

impl Chain {
    /// Creates an empty chain.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a handler.
    #[must_use]
    pub fn with(mut self, handler: WrappedHandler<Next>) -> Self {
        self.push(handler);
        self
    }

    /// Appends a handler in place.
    pub fn push(&mut self, handler: WrappedHandler<Next>) {
        self.handlers.push(handler);
    }

    /// Number of handlers.
    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    /// Whether the chain has no handlers.
    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }

    /// Runs the chain and returns how many handlers ran.
    pub async fn run(&self, req: &mut Request, res: &mut Response) -> usize {
        let mut ran = 0;
        for handler in &self.handlers {
            let next = Next::new();
            handler.call(req, res, next.clone()).await;
            ran += 1;
            if !next.was_called() {
                break;
            }
        }
        ran
    }

    /// Runs a full cycle for an `http` request: collects the body, runs the
    /// chain and finishes the response.
    ///
    /// A body that cannot be read is answered with 400 without running any
    /// handler.
    pub async fn handle<B>(&self, request: http::Request<B>) -> http::Response<Full<Bytes>>
    where
        B: http_body::Body<Data = Bytes>,
        B::Error: fmt::Display,
    {
        let mut res = Response::new();
        match Request::from_body(request).await {
            Ok(mut req) => {
                self.run(&mut req, &mut res).await;
            }
            Err(error) => {
                tracing::warn!(error = %error, "Failed to read request body");
                send_error(&mut res, &ProjectError::bad_request());
            }
        }
        res.into_http()
    }
}

impl fmt::Debug for Chain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Chain")
            .field("handlers", &self.handlers)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_next_starts_uncalled() {
        let next = Next::new();
        assert!(!next.was_called());
    }

    #[test]
    fn test_next_clones_share_state() {
        let next = Next::new();
        next.clone().proceed();
        assert!(next.was_called());
    }

    #[tokio::test]
    async fn test_empty_chain_runs_nothing() {
        let chain = Chain::new();
        assert!(chain.is_empty());

        let mut req = Request::new(http::Method::GET, http::Uri::from_static("/"));
        let mut res = Response::new();
        let ran = chain.run(&mut req, &mut res).await;
        assert_eq!(ran, 0);
        assert!(!res.is_sent());
    }
}
