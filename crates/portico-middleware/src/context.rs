//! Per-request and per-response pipeline state.
//!
//! Wrapped handlers chained over the same request/response pair share this
//! state through the `http::Extensions` of the request and the response.
//! It is created by the first wrapped handler that touches the pair and is
//! never replaced afterwards, which is what keeps the once-per-request side
//! effects (logger init, request/response logs, decoration) from repeating.

use portico_core::{Request, Response};
use portico_telemetry::Logger;
use serde_json::Value;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// State attached to a request.
///
/// Clones share the same flags, so the finish listener can keep a handle
/// after the wrapped handler returned.
///
/// # Example
///
/// ```
/// use portico_middleware::context::RequestState;
/// use portico_telemetry::{Logger, MemorySink};
///
/// let state = RequestState::new(Logger::new(MemorySink::new()));
/// let shared = state.clone();
///
/// assert!(state.begin_request_info());
/// assert!(!shared.begin_request_info());
/// ```
#[derive(Clone)]
pub struct RequestState {
    inner: Arc<RequestStateInner>,
}

struct RequestStateInner {
    init_logging: AtomicBool,
    logged_request_info: AtomicBool,
    logged_response_info: AtomicBool,
    logger: Logger,
}

impl RequestState {
    /// Creates fresh state around the request's base logger.
    #[must_use]
    pub fn new(logger: Logger) -> Self {
        Self {
            inner: Arc::new(RequestStateInner {
                init_logging: AtomicBool::new(false),
                logged_request_info: AtomicBool::new(false),
                logged_response_info: AtomicBool::new(false),
                logger,
            }),
        }
    }

    /// Returns the state of `req`, attaching new state built by `make_logger`
    /// if there is none yet.
    pub fn attach(req: &mut Request, make_logger: impl FnOnce() -> Logger) -> Self {
        req.extensions_mut()
            .get_or_insert_with(|| Self::new(make_logger()))
            .clone()
    }

    /// Returns the state of `req`, if attached.
    #[must_use]
    pub fn of(req: &Request) -> Option<&Self> {
        req.extensions().get::<Self>()
    }

    /// The base logger shared by every wrapped handler on this request.
    #[must_use]
    pub fn logger(&self) -> &Logger {
        &self.inner.logger
    }

    /// Claims logger initialization. Returns `true` for the first caller only.
    pub fn begin_init_logging(&self) -> bool {
        !self.inner.init_logging.swap(true, Ordering::AcqRel)
    }

    /// Claims the request info log. Returns `true` for the first caller only.
    pub fn begin_request_info(&self) -> bool {
        !self.inner.logged_request_info.swap(true, Ordering::AcqRel)
    }

    /// Claims the response info log. Returns `true` for the first caller only.
    pub fn begin_response_info(&self) -> bool {
        !self.inner.logged_response_info.swap(true, Ordering::AcqRel)
    }

    /// Whether logging was initialized.
    #[must_use]
    pub fn init_logging(&self) -> bool {
        self.inner.init_logging.load(Ordering::Acquire)
    }

    /// Whether the request info log was emitted.
    #[must_use]
    pub fn logged_request_info(&self) -> bool {
        self.inner.logged_request_info.load(Ordering::Acquire)
    }

    /// Whether the response info log was emitted.
    #[must_use]
    pub fn logged_response_info(&self) -> bool {
        self.inner.logged_response_info.load(Ordering::Acquire)
    }
}

impl std::fmt::Debug for RequestState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RequestState")
            .field("init_logging", &self.init_logging())
            .field("logged_request_info", &self.logged_request_info())
            .field("logged_response_info", &self.logged_response_info())
            .finish_non_exhaustive()
    }
}

/// State attached to a response.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResponseState {
    /// The send hook is installed.
    pub original_json: bool,
    /// The decorator already ran.
    pub decorated_response: bool,
    /// Payload of the first send, kept for the finish log.
    pub log_response_body_json: Option<Value>,
}

impl ResponseState {
    /// Returns the state of `res`, attaching default state if there is none.
    pub fn attach(res: &mut Response) -> &mut Self {
        res.extensions_mut().get_or_insert_default::<Self>()
    }

    /// Returns the state of `res`, if attached.
    #[must_use]
    pub fn of(res: &Response) -> Option<&Self> {
        res.extensions().get::<Self>()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::{Method, Uri};
    use portico_telemetry::MemorySink;

    fn request() -> Request {
        Request::new(Method::GET, Uri::from_static("/geese"))
    }

    #[test]
    fn test_flags_flip_once() {
        let state = RequestState::new(Logger::new(MemorySink::new()));
        assert!(state.begin_init_logging());
        assert!(!state.begin_init_logging());
        assert!(state.init_logging());

        assert!(!state.logged_response_info());
        assert!(state.begin_response_info());
        assert!(!state.begin_response_info());
    }

    #[test]
    fn test_attach_never_overwrites() {
        let mut req = request();
        let first = RequestState::attach(&mut req, || Logger::new(MemorySink::new()));
        first.begin_request_info();

        let mut built = false;
        let second = RequestState::attach(&mut req, || {
            built = true;
            Logger::new(MemorySink::new())
        });

        assert!(!built);
        assert!(second.logged_request_info());
        assert!(RequestState::of(&req).is_some());
    }

    #[test]
    fn test_response_state_attach() {
        let mut res = Response::new();
        assert!(ResponseState::of(&res).is_none());

        ResponseState::attach(&mut res).original_json = true;
        let state = ResponseState::attach(&mut res);
        assert!(state.original_json);
        assert!(!state.decorated_response);
    }
}
