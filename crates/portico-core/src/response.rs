//! Outbound response surface.
//!
//! [`Response`] is the mutable response handed to wrapped handlers. It mirrors
//! the small surface a handler wrapper needs:
//!
//! - `status(code)` and `json(body)` to send a JSON payload
//! - `header` / `set_header` for header access
//! - `on_finish(listener)`, fired once by [`Response::finish`]
//!
//! # Send hook
//!
//! A single [`JsonHook`] may be installed with [`Response::set_json_hook`].
//! While installed, [`Response::json`] routes the payload through the hook,
//! which is expected to eventually call [`Response::send_json`], the
//! unwrapped send.

use crate::headers::{CONTENT_TYPE_JSON, FRAMEWORK_POWERED_BY, POWERED_BY};
use bytes::Bytes;
use http::header::CONTENT_TYPE;
use http::{Extensions, HeaderMap, HeaderName, HeaderValue, StatusCode};
use http_body_util::Full;
use serde_json::Value;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

/// Replacement for the plain JSON send, installed once per response.
pub type JsonHook = Arc<dyn Fn(&mut Response, Value) + Send + Sync>;

/// Listener run when the response finishes.
pub type FinishListener = Box<dyn FnOnce(&Response) + Send + Sync>;

/// Errors raised by header writes.
#[derive(Debug, Error)]
pub enum HeaderError {
    /// The header name is not valid.
    #[error("invalid header name: {0}")]
    InvalidName(String),

    /// The header value is not valid.
    #[error("invalid value for header {name}")]
    InvalidValue {
        /// The header being set.
        name: String,
    },

    /// The response already finished; headers are frozen.
    #[error("cannot set header {name} after the response finished")]
    AlreadyFinished {
        /// The header being set.
        name: String,
    },
}

/// An outbound HTTP response under construction.
///
/// # Example
///
/// ```
/// use portico_core::Response;
/// use http::StatusCode;
///
/// let mut res = Response::new();
/// res.status(StatusCode::CREATED).json(serde_json::json!({ "goose": "honk" }));
///
/// assert!(res.is_sent());
/// assert_eq!(res.status_code(), StatusCode::CREATED);
/// assert_eq!(res.body_json(), Some(serde_json::json!({ "goose": "honk" })));
/// ```
pub struct Response {
    status: StatusCode,
    headers: HeaderMap,
    body: Bytes,
    sent: bool,
    finished: bool,
    json_hook: Option<JsonHook>,
    finish_listeners: Vec<FinishListener>,
    extensions: Extensions,
}

impl Response {
    /// Creates a 200 response carrying the framework's default identity header.
    #[must_use]
    pub fn new() -> Self {
        let mut headers = HeaderMap::new();
        headers.insert(POWERED_BY, HeaderValue::from_static(FRAMEWORK_POWERED_BY));

        Self {
            status: StatusCode::OK,
            headers,
            body: Bytes::new(),
            sent: false,
            finished: false,
            json_hook: None,
            finish_listeners: Vec::new(),
            extensions: Extensions::new(),
        }
    }

    /// Sets the status code.
    pub fn status(&mut self, status: StatusCode) -> &mut Self {
        self.status = status;
        self
    }

    /// Returns the status code.
    #[must_use]
    pub fn status_code(&self) -> StatusCode {
        self.status
    }

    /// Returns the canonical reason phrase for the status.
    #[must_use]
    pub fn status_message(&self) -> Option<&'static str> {
        self.status.canonical_reason()
    }

    /// Sends a JSON payload, through the installed hook if any.
    pub fn json(&mut self, body: Value) {
        match self.json_hook.clone() {
            Some(hook) => hook(self, body),
            None => self.send_json(body),
        }
    }

    /// Sends a JSON payload, bypassing any hook.
    pub fn send_json(&mut self, body: Value) {
        if !self.headers.contains_key(CONTENT_TYPE) {
            self.headers
                .insert(CONTENT_TYPE, HeaderValue::from_static(CONTENT_TYPE_JSON));
        }
        self.send(Bytes::from(body.to_string()));
    }

    /// Sends raw bytes. A later send replaces the body.
    pub fn send(&mut self, body: Bytes) {
        self.body = body;
        self.sent = true;
    }

    /// Installs the send hook, replacing any previous one.
    pub fn set_json_hook(&mut self, hook: JsonHook) {
        self.json_hook = Some(hook);
    }

    /// Returns `true` if a send hook is installed.
    #[must_use]
    pub fn has_json_hook(&self) -> bool {
        self.json_hook.is_some()
    }

    /// Returns a header value as a string, if present and printable.
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    /// Sets a header, replacing existing values.
    pub fn set_header(&mut self, name: &str, value: &str) -> Result<(), HeaderError> {
        if self.finished {
            return Err(HeaderError::AlreadyFinished {
                name: name.to_string(),
            });
        }
        let header_name = HeaderName::from_bytes(name.as_bytes())
            .map_err(|_| HeaderError::InvalidName(name.to_string()))?;
        let header_value = HeaderValue::from_str(value).map_err(|_| HeaderError::InvalidValue {
            name: name.to_string(),
        })?;
        self.headers.insert(header_name, header_value);
        Ok(())
    }

    /// Returns `true` while headers can still be written.
    #[must_use]
    pub fn headers_writable(&self) -> bool {
        !self.finished
    }

    /// Returns the response headers.
    #[must_use]
    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// Returns the body sent so far.
    #[must_use]
    pub fn body(&self) -> &Bytes {
        &self.body
    }

    /// Parses the sent body as JSON.
    #[must_use]
    pub fn body_json(&self) -> Option<Value> {
        serde_json::from_slice(&self.body).ok()
    }

    /// Returns `true` once a body was sent.
    #[must_use]
    pub fn is_sent(&self) -> bool {
        self.sent
    }

    /// Returns `true` once the response finished.
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// Registers a listener for the finish event.
    ///
    /// Listeners registered after the response finished never run.
    pub fn on_finish<F>(&mut self, listener: F)
    where
        F: FnOnce(&Response) + Send + Sync + 'static,
    {
        if !self.finished {
            self.finish_listeners.push(Box::new(listener));
        }
    }

    /// Marks the response finished and runs the finish listeners once.
    pub fn finish(&mut self) {
        if self.finished {
            return;
        }
        self.finished = true;
        let listeners = std::mem::take(&mut self.finish_listeners);
        for listener in listeners {
            listener(self);
        }
    }

    /// Returns the response extensions.
    #[must_use]
    pub fn extensions(&self) -> &Extensions {
        &self.extensions
    }

    /// Returns the response extensions mutably.
    pub fn extensions_mut(&mut self) -> &mut Extensions {
        &mut self.extensions
    }

    /// Finishes the response and converts it for the transport.
    #[must_use]
    pub fn into_http(mut self) -> http::Response<Full<Bytes>> {
        self.finish();
        let mut response = http::Response::new(Full::new(self.body));
        *response.status_mut() = self.status;
        *response.headers_mut() = self.headers;
        response
    }
}

impl Default for Response {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Response {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Response")
            .field("status", &self.status)
            .field("headers", &self.headers)
            .field("body_len", &self.body.len())
            .field("sent", &self.sent)
            .field("finished", &self.finished)
            .field("has_json_hook", &self.json_hook.is_some())
            .field("finish_listeners", &self.finish_listeners.len())
            .finish_non_exhaustive()
    }
}
