//! # Portico Core
//!
//! Core types for the Portico handler wrapper.
//!
//! This crate provides the foundational types the pipeline builds on:
//!
//! - [`ProjectError`] - Classified errors with an HTTP status and a JSON:API body
//! - [`Request`] / [`Response`] - The request/response surface handed to handlers
//! - [`summarize_request`] / [`summarize_response`] - Log-friendly projections
//! - [`InvocationResolver`] - Lookup of the current invocation id
//! - [`BoxFuture`] - Boxed future used by handlers and steps

#![doc(html_root_url = "https://docs.rs/portico-core/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod error;
pub mod headers;
pub mod invocation;
mod request;
mod response;
mod summary;

use std::future::Future;
use std::pin::Pin;

pub use error::{ErrorDocument, ErrorKind, ErrorObject, ProjectError, ProjectResult};
pub use invocation::InvocationResolver;
pub use request::{Body, Locals, Request};
pub use response::{FinishListener, HeaderError, JsonHook, Response};
pub use summary::{summarize_request, summarize_response, RequestSummary};

/// A boxed, sendable future.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;
