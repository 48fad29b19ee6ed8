//! Current-invocation lookup.
//!
//! An invocation id names the unit of work a request belongs to. Hosts set it
//! around each request with [`scope`]; the pipeline reads it back through an
//! [`InvocationResolver`] when tagging logs and decorating responses.
//!
//! # Example
//!
//! ```
//! use portico_core::invocation::{self, InvocationResolver, TaskLocalInvocation};
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let id = invocation::scope("1234abcd-5678".to_string(), async {
//!     TaskLocalInvocation.current_invocation()
//! })
//! .await;
//!
//! assert_eq!(id.as_deref(), Some("1234abcd-5678"));
//! assert!(TaskLocalInvocation.current_invocation().is_none());
//! # }
//! ```

use std::future::Future;
use uuid::Uuid;

tokio::task_local! {
    static CURRENT_INVOCATION: String;
}

/// Resolves the id of the current invocation.
pub trait InvocationResolver: Send + Sync + 'static {
    /// Returns the current invocation id, or `None` outside an invocation.
    fn current_invocation(&self) -> Option<String>;
}

/// Reads the id set by [`scope`] on the current task.
#[derive(Debug, Clone, Copy, Default)]
pub struct TaskLocalInvocation;

impl InvocationResolver for TaskLocalInvocation {
    fn current_invocation(&self) -> Option<String> {
        current()
    }
}

/// Always resolves the same id.
#[derive(Debug, Clone)]
pub struct StaticInvocation(pub String);

impl InvocationResolver for StaticInvocation {
    fn current_invocation(&self) -> Option<String> {
        if self.0.is_empty() {
            None
        } else {
            Some(self.0.clone())
        }
    }
}

/// Never resolves an id.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoInvocation;

impl InvocationResolver for NoInvocation {
    fn current_invocation(&self) -> Option<String> {
        None
    }
}

/// Runs `future` with `id` as the current invocation.
pub async fn scope<F>(id: String, future: F) -> F::Output
where
    F: Future,
{
    CURRENT_INVOCATION.scope(id, future).await
}

/// Returns the invocation id of the current task, if any.
#[must_use]
pub fn current() -> Option<String> {
    CURRENT_INVOCATION
        .try_with(Clone::clone)
        .ok()
        .filter(|id| !id.is_empty())
}

/// Generates a fresh time-ordered invocation id (UUID v7).
#[must_use]
pub fn generate() -> String {
    Uuid::now_v7().to_string()
}

/// Returns the first eight characters of an invocation id.
#[must_use]
pub fn short_id(id: &str) -> String {
    id.chars().take(8).collect()
}
