//! # Portico
//!
//! **A request-handling wrapper for `http` services.**
//!
//! Portico wraps individual request handlers in a fixed lifecycle:
//!
//! - **Structured logging** of every request and response, once per request
//! - **Response decoration** with identity, environment, handler, invocation and version headers
//! - **Validation, setup and teardown** stages around the handler
//! - **Error translation** into JSON:API documents, without leaking unhandled messages
//! - **Availability gating** through `PROJECT_UNAVAILABLE`
//!
//! ## Quick Start
//!
//! ```
//! use portico::prelude::*;
//! use serde_json::json;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let project = Project::default();
//! let get_goose = project.wrap(
//!     |req, res, _: ()| {
//!         let name = req.query().get("name").cloned();
//!         Box::pin(async move {
//!             let name = name.ok_or_else(ProjectError::bad_request)?;
//!             res.json(json!({ "goose": name }));
//!             Ok(())
//!         })
//!     },
//!     HandlerConfig::named("getGoose"),
//! );
//!
//! let mut req = Request::new(http::Method::GET, http::Uri::from_static("/geese"));
//! let mut res = Response::new();
//! get_goose.call(&mut req, &mut res, ()).await;
//! assert_eq!(res.status_code(), http::StatusCode::BAD_REQUEST);
//! # }
//! ```
//!
//! ## Architecture
//!
//! ```text
//! Request → INIT → AVAILABILITY → VALIDATE → SETUP → LOCALS → INVOKE → TEARDOWN → RESPOND
//!                                                                                    ↓
//! Response ← finish log ← decoration (first send) ←──────────────────────────────────┘
//! ```

#![doc(html_root_url = "https://docs.rs/portico/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

pub mod chain;
pub mod routes;

// Re-export core types
pub use portico_core as core;

// Re-export middleware types
pub use portico_middleware as middleware;

// Re-export telemetry types
pub use portico_telemetry as telemetry;

// Re-export configuration types
pub use portico_config as config;

pub use chain::{Chain, Next};
pub use portico_core::{Body, ErrorKind, ProjectError, Request, Response};
pub use portico_middleware::{wrap, HandlerConfig, LocalValue, Project, Step, WrappedHandler};
pub use routes::{echo, error_route, http_route, log_route, unhandled_route, EchoRoutes, LogProbe};

/// Prelude module for convenient imports.
///
/// # Example
///
/// ```
/// use portico::prelude::*;
///
/// let config = HandlerConfig::named("honk");
/// assert_eq!(config.name(), Some("honk"));
/// ```
pub mod prelude {
    pub use crate::chain::{Chain, Next};
    pub use crate::routes::{echo, http_route, EchoRoutes};

    pub use portico_core::{
        invocation, BoxFuture, ErrorKind, InvocationResolver, ProjectError, ProjectResult, Request,
        Response,
    };

    pub use portico_middleware::{wrap, HandlerConfig, LocalValue, Project, Step, WrappedHandler};

    pub use portico_config::{ConfigLoader, ProjectSettings};

    pub use portico_telemetry::{init_logging, Level, LogConfig, Logger};
}
