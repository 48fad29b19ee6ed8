//! Inbound request surface.
//!
//! [`Request`] is the request object handed to wrapped handlers. It owns the
//! decoded body, the request-scoped `locals` storage, and an
//! [`http::Extensions`] map where the pipeline keeps its per-request state.

use bytes::Bytes;
use http::{Extensions, HeaderMap, HeaderName, HeaderValue, Method, Uri};
use http_body_util::BodyExt;
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// Request-scoped storage populated by configured locals and by handlers.
pub type Locals = Map<String, Value>;

/// A decoded request body.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum Body {
    /// No body was sent.
    #[default]
    Empty,
    /// A UTF-8 text body.
    Text(String),
    /// A body parsed as JSON.
    Json(Value),
    /// Raw bytes that were neither JSON nor declared as text.
    Binary(Bytes),
}

impl Body {
    /// Classifies raw bytes using the request's content type.
    ///
    /// - empty bytes are [`Body::Empty`]
    /// - `application/json` (or `+json`) that parses is [`Body::Json`]
    /// - `text/*` that is valid UTF-8 is [`Body::Text`]
    /// - everything else is [`Body::Binary`]
    #[must_use]
    pub fn classify(content_type: Option<&str>, bytes: Bytes) -> Self {
        if bytes.is_empty() {
            return Self::Empty;
        }

        let essence = content_type
            .and_then(|ct| ct.split(';').next())
            .map(|ct| ct.trim().to_ascii_lowercase());

        match essence.as_deref() {
            Some(ct) if ct == "application/json" || ct.ends_with("+json") => {
                match serde_json::from_slice(&bytes) {
                    Ok(value) => Self::Json(value),
                    Err(_) => Self::Binary(bytes),
                }
            }
            Some(ct) if ct.starts_with("text/") => match String::from_utf8(bytes.to_vec()) {
                Ok(text) => Self::Text(text),
                Err(_) => Self::Binary(bytes),
            },
            _ => Self::Binary(bytes),
        }
    }

    /// Returns a printable projection of the body for logging.
    ///
    /// Binary content is decoded as lossy UTF-8. The body itself is not
    /// modified.
    #[must_use]
    pub fn to_printable(&self) -> Value {
        match self {
            Self::Empty => Value::Null,
            Self::Text(text) => Value::String(text.clone()),
            Self::Json(value) => value.clone(),
            Self::Binary(bytes) => Value::String(String::from_utf8_lossy(bytes).into_owned()),
        }
    }

    /// Returns `true` if no body was sent.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        matches!(self, Self::Empty)
    }
}

/// An inbound HTTP request as seen by wrapped handlers.
///
/// # Example
///
/// ```
/// use portico_core::{Body, Request};
/// use http::Method;
///
/// let req = Request::new(Method::POST, "/geese?name=gerald".parse().unwrap())
///     .with_body(Body::Text("honk".to_string()));
///
/// assert_eq!(req.url(), "/geese?name=gerald");
/// assert_eq!(req.query().get("name").map(String::as_str), Some("gerald"));
/// ```
#[derive(Debug)]
pub struct Request {
    method: Method,
    uri: Uri,
    base_url: String,
    headers: HeaderMap,
    body: Body,
    locals: Locals,
    extensions: Extensions,
}

impl Request {
    /// Creates a request with no headers and no body.
    #[must_use]
    pub fn new(method: Method, uri: Uri) -> Self {
        Self {
            method,
            uri,
            base_url: String::new(),
            headers: HeaderMap::new(),
            body: Body::Empty,
            locals: Locals::new(),
            extensions: Extensions::new(),
        }
    }

    /// Converts an `http::Request` with a collected body.
    ///
    /// The body is classified with [`Body::classify`]; the request's own
    /// extensions carry over.
    #[must_use]
    pub fn from_http(request: http::Request<Bytes>) -> Self {
        let (parts, bytes) = request.into_parts();
        let content_type = parts
            .headers
            .get(http::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok());
        let body = Body::classify(content_type, bytes);

        Self {
            method: parts.method,
            uri: parts.uri,
            base_url: String::new(),
            headers: parts.headers,
            body,
            locals: Locals::new(),
            extensions: parts.extensions,
        }
    }

    /// Collects any `http_body::Body` and converts the request.
    pub async fn from_body<B>(request: http::Request<B>) -> Result<Self, B::Error>
    where
        B: http_body::Body<Data = Bytes>,
    {
        let (parts, body) = request.into_parts();
        let bytes = body.collect().await?.to_bytes();
        Ok(Self::from_http(http::Request::from_parts(parts, bytes)))
    }

    /// Sets the mount path the request was routed under.
    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Adds a header. Invalid names or values are ignored.
    #[must_use]
    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        if let (Ok(name), Ok(value)) = (
            HeaderName::from_bytes(name.as_bytes()),
            HeaderValue::from_str(value),
        ) {
            self.headers.append(name, value);
        }
        self
    }

    /// Sets the body.
    #[must_use]
    pub fn with_body(mut self, body: Body) -> Self {
        self.body = body;
        self
    }

    /// Returns the HTTP method.
    #[must_use]
    pub fn method(&self) -> &Method {
        &self.method
    }

    /// Returns the request URI.
    #[must_use]
    pub fn uri(&self) -> &Uri {
        &self.uri
    }

    /// Returns the mount path, empty when not mounted.
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Returns the path and query of the request.
    #[must_use]
    pub fn url(&self) -> &str {
        self.uri
            .path_and_query()
            .map_or_else(|| self.uri.path(), http::uri::PathAndQuery::as_str)
    }

    /// Returns the decoded query parameters. Later duplicates win.
    #[must_use]
    pub fn query(&self) -> BTreeMap<String, String> {
        self.uri
            .query()
            .map(|q| {
                url::form_urlencoded::parse(q.as_bytes())
                    .into_owned()
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Returns the request headers.
    #[must_use]
    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// Returns a header value as a string, if present and printable.
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    /// Returns the body.
    #[must_use]
    pub fn body(&self) -> &Body {
        &self.body
    }

    /// Returns the request-scoped locals.
    #[must_use]
    pub fn locals(&self) -> &Locals {
        &self.locals
    }

    /// Returns the request-scoped locals mutably.
    pub fn locals_mut(&mut self) -> &mut Locals {
        &mut self.locals
    }

    /// Returns a single local value.
    #[must_use]
    pub fn local(&self, key: &str) -> Option<&Value> {
        self.locals.get(key)
    }

    /// Returns the request extensions.
    #[must_use]
    pub fn extensions(&self) -> &Extensions {
        &self.extensions
    }

    /// Returns the request extensions mutably.
    pub fn extensions_mut(&mut self) -> &mut Extensions {
        &mut self.extensions
    }
}
