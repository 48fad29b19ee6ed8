//! Error taxonomy for Portico.
//!
//! This module provides [`ProjectError`], the classified error type that
//! handlers raise on purpose. A `ProjectError` carries a deliberate HTTP
//! status and a client-safe JSON:API body:
//!
//! ```json
//! {
//!   "errors": [
//!     { "status": 404, "title": "Not Found", "detail": "optional" }
//!   ]
//! }
//! ```
//!
//! Handlers return `anyhow::Result<()>`. A `ProjectError` travels through
//! `anyhow::Error` untouched and is recovered with
//! [`ProjectError::from_anyhow`]; anything else is treated as unhandled.
//!
//! # `ErrorKind` vs `ProjectError`
//!
//! [`ErrorKind`] is the flat classification (status + title). A
//! `ProjectError` is either a single kind with an optional detail, or the
//! aggregate [`ProjectError::Multi`].

use http::StatusCode;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result type alias using [`ProjectError`].
pub type ProjectResult<T> = Result<T, ProjectError>;

/// Classification of a single project error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// 400: the request was malformed.
    BadRequest,
    /// 401: credentials are missing or invalid.
    Unauthorized,
    /// 403: the caller may not perform this action.
    Forbidden,
    /// 404: the resource does not exist.
    NotFound,
    /// 410: the resource existed but is gone.
    Gone,
    /// 418: the server is a teapot.
    Teapot,
    /// 500: a deliberate internal error.
    Internal,
    /// 502: an upstream service answered badly.
    BadGateway,
    /// 503: the service is intentionally unavailable.
    Unavailable,
    /// 504: an upstream service did not answer in time.
    GatewayTimeout,
    /// 500: stand-in for an error that was never classified.
    Unhandled,
}

impl ErrorKind {
    /// Returns the HTTP status code for this kind.
    #[must_use]
    pub const fn status_code(&self) -> StatusCode {
        match self {
            Self::BadRequest => StatusCode::BAD_REQUEST,
            Self::Unauthorized => StatusCode::UNAUTHORIZED,
            Self::Forbidden => StatusCode::FORBIDDEN,
            Self::NotFound => StatusCode::NOT_FOUND,
            Self::Gone => StatusCode::GONE,
            Self::Teapot => StatusCode::IM_A_TEAPOT,
            Self::Internal | Self::Unhandled => StatusCode::INTERNAL_SERVER_ERROR,
            Self::BadGateway => StatusCode::BAD_GATEWAY,
            Self::Unavailable => StatusCode::SERVICE_UNAVAILABLE,
            Self::GatewayTimeout => StatusCode::GATEWAY_TIMEOUT,
        }
    }

    /// Returns the client-facing title for this kind.
    #[must_use]
    pub const fn title(&self) -> &'static str {
        match self {
            Self::BadRequest => "Bad Request",
            Self::Unauthorized => "Service Unauthorized",
            Self::Forbidden => "Forbidden",
            Self::NotFound => "Not Found",
            Self::Gone => "Gone",
            Self::Teapot => "I'm a Teapot",
            Self::Internal => "Internal Error",
            Self::BadGateway => "Bad Gateway",
            Self::Unavailable => "Service Unavailable",
            Self::GatewayTimeout => "Gateway Timeout",
            Self::Unhandled => "Internal Application Error",
        }
    }

    /// Maps an HTTP status back to the kind that produces it.
    ///
    /// 500 maps to [`ErrorKind::Internal`]; statuses outside the taxonomy
    /// return `None`.
    #[must_use]
    pub const fn from_status(status: u16) -> Option<Self> {
        match status {
            400 => Some(Self::BadRequest),
            401 => Some(Self::Unauthorized),
            403 => Some(Self::Forbidden),
            404 => Some(Self::NotFound),
            410 => Some(Self::Gone),
            418 => Some(Self::Teapot),
            500 => Some(Self::Internal),
            502 => Some(Self::BadGateway),
            503 => Some(Self::Unavailable),
            504 => Some(Self::GatewayTimeout),
            _ => None,
        }
    }
}

/// A classified error carrying an HTTP status and a safe JSON body.
///
/// # Example
///
/// ```
/// use portico_core::ProjectError;
///
/// let error = ProjectError::not_found().with_detail("No goose named Gerald");
/// assert_eq!(error.status(), 404);
///
/// let document = error.to_document();
/// assert_eq!(document.errors[0].title, "Not Found");
/// ```
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProjectError {
    /// A single classified error.
    #[error("{}", kind.title())]
    Single {
        /// The classification.
        kind: ErrorKind,
        /// Optional client-facing detail.
        detail: Option<String>,
    },

    /// Several errors caught during one request, in the order they occurred.
    #[error("Multiple errors ({})", .0.len())]
    Multi(Vec<ProjectError>),
}

impl ProjectError {
    /// Creates an error of the given kind without detail.
    #[must_use]
    pub const fn new(kind: ErrorKind) -> Self {
        Self::Single { kind, detail: None }
    }

    /// Creates a 400 Bad Request error.
    #[must_use]
    pub const fn bad_request() -> Self {
        Self::new(ErrorKind::BadRequest)
    }

    /// Creates a 401 Unauthorized error.
    #[must_use]
    pub const fn unauthorized() -> Self {
        Self::new(ErrorKind::Unauthorized)
    }

    /// Creates a 403 Forbidden error.
    #[must_use]
    pub const fn forbidden() -> Self {
        Self::new(ErrorKind::Forbidden)
    }

    /// Creates a 404 Not Found error.
    #[must_use]
    pub const fn not_found() -> Self {
        Self::new(ErrorKind::NotFound)
    }

    /// Creates a 410 Gone error.
    #[must_use]
    pub const fn gone() -> Self {
        Self::new(ErrorKind::Gone)
    }

    /// Creates a 418 Teapot error.
    #[must_use]
    pub const fn teapot() -> Self {
        Self::new(ErrorKind::Teapot)
    }

    /// Creates a deliberate 500 Internal error.
    #[must_use]
    pub const fn internal() -> Self {
        Self::new(ErrorKind::Internal)
    }

    /// Creates a 502 Bad Gateway error.
    #[must_use]
    pub const fn bad_gateway() -> Self {
        Self::new(ErrorKind::BadGateway)
    }

    /// Creates a 503 Unavailable error.
    #[must_use]
    pub const fn unavailable() -> Self {
        Self::new(ErrorKind::Unavailable)
    }

    /// Creates a 504 Gateway Timeout error.
    #[must_use]
    pub const fn gateway_timeout() -> Self {
        Self::new(ErrorKind::GatewayTimeout)
    }

    /// Creates the generic 500 used in place of an unclassified error.
    #[must_use]
    pub const fn unhandled() -> Self {
        Self::new(ErrorKind::Unhandled)
    }

    /// Wraps several errors into one aggregate.
    ///
    /// An empty list is [`ProjectError::unhandled`].
    #[must_use]
    pub fn multi(errors: Vec<ProjectError>) -> Self {
        if errors.is_empty() {
            return Self::unhandled();
        }
        Self::Multi(errors)
    }

    /// Collapses accumulated errors: none is `None`, one is itself,
    /// several become [`ProjectError::Multi`].
    #[must_use]
    pub fn from_accumulated(mut errors: Vec<ProjectError>) -> Option<Self> {
        match errors.len() {
            0 => None,
            1 => errors.pop(),
            _ => Some(Self::Multi(errors)),
        }
    }

    /// Attaches a client-facing detail. No effect on a `Multi`.
    #[must_use]
    pub fn with_detail(self, detail: impl Into<String>) -> Self {
        match self {
            Self::Single { kind, .. } => Self::Single {
                kind,
                detail: Some(detail.into()),
            },
            multi @ Self::Multi(_) => multi,
        }
    }

    /// Recovers a `ProjectError` from an `anyhow::Error`.
    ///
    /// Returns the original error when it is not a project error.
    pub fn from_anyhow(error: anyhow::Error) -> Result<Self, anyhow::Error> {
        error.downcast::<Self>()
    }

    /// Returns the kind of a single error, or `None` for `Multi`.
    #[must_use]
    pub const fn kind(&self) -> Option<ErrorKind> {
        match self {
            Self::Single { kind, .. } => Some(*kind),
            Self::Multi(_) => None,
        }
    }

    /// Returns the numeric HTTP status.
    ///
    /// A `Multi` uses the status of its first error, or 500 when empty.
    #[must_use]
    pub fn status(&self) -> u16 {
        self.status_code().as_u16()
    }

    /// Returns the HTTP status code.
    #[must_use]
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::Single { kind, .. } => kind.status_code(),
            Self::Multi(errors) => errors
                .first()
                .map_or(StatusCode::INTERNAL_SERVER_ERROR, ProjectError::status_code),
        }
    }

    /// Builds the JSON:API error document for this error.
    #[must_use]
    pub fn to_document(&self) -> ErrorDocument {
        let mut errors = Vec::new();
        self.collect_objects(&mut errors);
        if errors.is_empty() {
            Self::unhandled().collect_objects(&mut errors);
        }
        ErrorDocument { errors }
    }

    /// Builds the JSON:API document as a `serde_json::Value`.
    #[must_use]
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self.to_document()).unwrap_or_else(|_| {
            serde_json::json!({
                "errors": [{ "status": 500, "title": ErrorKind::Unhandled.title() }]
            })
        })
    }

    fn collect_objects(&self, out: &mut Vec<ErrorObject>) {
        match self {
            Self::Single { kind, detail } => out.push(ErrorObject {
                status: kind.status_code().as_u16(),
                title: kind.title().to_string(),
                detail: detail.clone(),
            }),
            Self::Multi(errors) => {
                for error in errors {
                    error.collect_objects(out);
                }
            }
        }
    }
}

impl From<ErrorKind> for ProjectError {
    fn from(kind: ErrorKind) -> Self {
        Self::new(kind)
    }
}

/// JSON:API error document sent to clients.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorDocument {
    /// The error objects, in order.
    pub errors: Vec<ErrorObject>,
}

/// A single entry of an [`ErrorDocument`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorObject {
    /// HTTP status code.
    pub status: u16,
    /// Short human-readable summary.
    pub title: String,
    /// Optional explanation.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_status_codes() {
        let cases = [
            (ErrorKind::BadRequest, 400),
            (ErrorKind::Unauthorized, 401),
            (ErrorKind::Forbidden, 403),
            (ErrorKind::NotFound, 404),
            (ErrorKind::Gone, 410),
            (ErrorKind::Teapot, 418),
            (ErrorKind::Internal, 500),
            (ErrorKind::BadGateway, 502),
            (ErrorKind::Unavailable, 503),
            (ErrorKind::GatewayTimeout, 504),
            (ErrorKind::Unhandled, 500),
        ];

        for (kind, status) in cases {
            assert_eq!(kind.status_code().as_u16(), status, "{kind:?}");
        }
    }

    #[test]
    fn test_from_status() {
        assert_eq!(ErrorKind::from_status(404), Some(ErrorKind::NotFound));
        assert_eq!(ErrorKind::from_status(500), Some(ErrorKind::Internal));
        assert_eq!(ErrorKind::from_status(429), None);
    }

    #[test]
    fn test_detail_serialization() {
        let error = ProjectError::bad_request().with_detail("Missing goose");
        let json = serde_json::to_string(&error.to_document()).unwrap();
        assert_eq!(
            json,
            r#"{"errors":[{"status":400,"title":"Bad Request","detail":"Missing goose"}]}"#
        );
    }

    #[test]
    fn test_detail_omitted_when_absent() {
        let json = ProjectError::not_found().to_json();
        assert_eq!(json, serde_json::json!({"errors": [{"status": 404, "title": "Not Found"}]}));
    }

    #[test]
    fn test_multi_uses_first_status() {
        let error = ProjectError::multi(vec![ProjectError::gone(), ProjectError::unhandled()]);
        assert_eq!(error.status(), 410);

        let document = error.to_document();
        assert_eq!(document.errors.len(), 2);
        assert_eq!(document.errors[0].status, 410);
        assert_eq!(document.errors[1].status, 500);
    }

    #[test]
    fn test_empty_multi_is_unhandled() {
        let error = ProjectError::multi(Vec::new());
        assert_eq!(error, ProjectError::unhandled());
        assert_eq!(error.to_document().errors[0].status, 500);
    }

    #[test]
    fn test_empty_multi_variant_still_has_an_error_object() {
        let error = ProjectError::Multi(Vec::new());
        let document = error.to_document();

        assert_eq!(error.status(), 500);
        assert_eq!(document.errors.len(), 1);
        assert_eq!(document.errors[0].status, 500);
        assert_eq!(document.errors[0].title, "Internal Application Error");
    }

    #[test]
    fn test_nested_multi_is_flattened() {
        let inner = ProjectError::multi(vec![ProjectError::forbidden(), ProjectError::teapot()]);
        let outer = ProjectError::multi(vec![inner, ProjectError::bad_gateway()]);

        let statuses: Vec<u16> = outer.to_document().errors.iter().map(|e| e.status).collect();
        assert_eq!(statuses, vec![403, 418, 502]);
        assert_eq!(outer.status(), 403);
    }

    #[test]
    fn test_from_accumulated() {
        assert_eq!(ProjectError::from_accumulated(Vec::new()), None);
        assert_eq!(
            ProjectError::from_accumulated(vec![ProjectError::gone()]),
            Some(ProjectError::gone())
        );
        assert!(matches!(
            ProjectError::from_accumulated(vec![ProjectError::gone(), ProjectError::gone()]),
            Some(ProjectError::Multi(errors)) if errors.len() == 2
        ));
    }

    #[test]
    fn test_downcast_through_anyhow() {
        let error: anyhow::Error = ProjectError::unauthorized().into();
        let recovered = ProjectError::from_anyhow(error).unwrap();
        assert_eq!(recovered.status(), 401);

        let plain = anyhow::anyhow!("boom");
        assert!(ProjectError::from_anyhow(plain).is_err());
    }

    #[test]
    fn test_downcast_survives_context() {
        let error = anyhow::Error::from(ProjectError::gateway_timeout()).context("calling upstream");
        let recovered = ProjectError::from_anyhow(error).unwrap();
        assert_eq!(recovered.status(), 504);
    }

    #[test]
    fn test_display_uses_title() {
        assert_eq!(ProjectError::unhandled().to_string(), "Internal Application Error");
        assert_eq!(
            ProjectError::multi(vec![ProjectError::gone()]).to_string(),
            "Multiple errors (1)"
        );
    }
}
