//! # Portico Middleware
//!
//! The handler-wrapping pipeline.
//!
//! [`wrap`] (or [`Project::wrap`]) turns a plain async handler into a
//! [`WrappedHandler`] that runs a fixed lifecycle around it:
//!
//! | Stage | Purpose |
//! |-------|---------|
//! | INIT | Attach per-request state, initialize and tag the logger |
//! | Request log | `info {req: ...}` once per request |
//! | Send hook | Decorate the response once, capture its body for the finish log |
//! | AVAILABILITY | Refuse with 503 when the project is unavailable |
//! | VALIDATE | Ordered checks; the first failure answers the request |
//! | SETUP / LOCALS | Ordered preparation and request-scoped values |
//! | INVOKE | The handler itself |
//! | TEARDOWN | Ordered cleanup; every step runs |
//! | RESPOND | Errors become JSON:API documents |
//!
//! ## Example
//!
//! ```
//! use portico_core::{Request, Response};
//! use portico_middleware::{HandlerConfig, Project};
//! use serde_json::json;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let project = Project::default();
//! let honk = project.wrap(
//!     |_req, res, _: ()| Box::pin(async move {
//!         res.json(json!({ "goose": "honk" }));
//!         Ok(())
//!     }),
//!     HandlerConfig::named("honk"),
//! );
//!
//! let mut req = Request::new(http::Method::GET, http::Uri::from_static("/honk"));
//! let mut res = Response::new();
//! honk.call(&mut req, &mut res, ()).await;
//!
//! assert_eq!(res.header("x-project-handler"), Some("honk"));
//! assert_eq!(res.body_json(), Some(json!({ "goose": "honk" })));
//! # }
//! ```

#![doc(html_root_url = "https://docs.rs/portico-middleware/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

pub mod config;
pub mod context;
pub mod decorate;
mod pipeline;
mod project;
pub mod respond;

pub use config::{HandlerConfig, HandlerConfigBuilder, LocalValue, Step};
pub use context::{RequestState, ResponseState};
pub use decorate::{decorate_response, DecorateContext};
pub use pipeline::WrappedHandler;
pub use project::Project;

use portico_core::{BoxFuture, Request, Response};

/// Wraps `handler` using project settings read from the process
/// environment.
///
/// Malformed settings fall back to defaults with a warning. Use
/// [`Project::wrap`] to control settings, logging or invocation lookup.
pub fn wrap<A, F>(handler: F, config: HandlerConfig) -> WrappedHandler<A>
where
    A: Send + 'static,
    F: for<'a> Fn(&'a mut Request, &'a mut Response, A) -> BoxFuture<'a, anyhow::Result<()>>
        + Send
        + Sync
        + 'static,
{
    Project::from_env_or_default().wrap(handler, config)
}
