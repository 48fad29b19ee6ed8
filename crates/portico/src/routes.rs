//! Ready-made wrapped handlers.
//!
//! [`http_route`] answers with a fixed status. [`echo`] reflects the
//! request. The error and log routes exercise the error responder and the
//! logger end to end. [`EchoRoutes`] maps paths onto all of them for demos
//! and smoke tests.

use http::StatusCode;
use portico_core::{summarize_request, ErrorKind, ProjectError, Request};
use portico_middleware::{HandlerConfig, Project, RequestState, WrappedHandler};
use portico_telemetry::Logger;
use serde_json::{json, Map, Value};
use std::fmt;

/// Status codes [`http_route`] knows a message for.
pub const STATUS_MESSAGES: [(u16, &str); 12] = [
    (200, "OK"),
    (204, "No Content"),
    (400, "Bad Request"),
    (401, "Unauthorized"),
    (403, "Forbidden"),
    (404, "Not Found"),
    (410, "Gone"),
    (418, "I'm a teapot"),
    (500, "Internal Error"),
    (502, "Bad Gateway"),
    (503, "Unavailable"),
    (504, "Gateway Timeout"),
];

/// Statuses with a dedicated `/error/<status>` route.
pub const ERROR_ROUTE_STATUSES: [u16; 9] = [400, 401, 403, 404, 418, 500, 502, 503, 504];

/// Message of the plain error raised by [`unhandled_route`].
pub const UNHANDLED_MESSAGE: &str = "Mock Unhandled Exception";

/// Looks up the message [`http_route`] sends for `status`.
pub fn status_message(status: u16) -> Option<&'static str> {
    STATUS_MESSAGES
        .iter()
        .find(|(code, _)| *code == status)
        .map(|(_, message)| *message)
}

fn status_message_map() -> Value {
    let map: Map<String, Value> = STATUS_MESSAGES
        .iter()
        .map(|(code, message)| (code.to_string(), Value::from(*message)))
        .collect();
    Value::Object(map)
}

/// The logger of the request being handled, or `fallback` outside a
/// pipeline.
fn request_logger(req: &Request, fallback: &Logger) -> Logger {
    RequestState::of(req).map_or_else(|| fallback.clone(), |state| state.logger().clone())
}

/// A handler responding `{"res": {"statusCode", "statusMessage"}}` with
/// `status`.
///
/// Statuses missing from [`STATUS_MESSAGES`] log a warning and omit
/// `statusMessage`.
pub fn http_route<A: Send + 'static>(
    project: &Project,
    status: StatusCode,
    config: HandlerConfig,
) -> WrappedHandler<A> {
    let fallback = project.logger().clone();
    project.wrap(
        move |req, res, _args: A| {
            let code = status.as_u16();
            let mut body = Map::new();
            body.insert("statusCode".to_string(), Value::from(code));

            match status_message(code) {
                Some(message) => {
                    body.insert("statusMessage".to_string(), Value::from(message));
                }
                None => {
                    let log = request_logger(req, &fallback);
                    log.warn(format!("Status code {code} not found in statusMessage map"));
                    log.trace_var(status_message_map());
                    log.debug("Continuing...");
                }
            }

            res.status(status).json(json!({ "res": body }));
            Box::pin(async { Ok(()) })
        },
        config,
    )
}

/// A handler responding `{"req": <request summary>}`.
pub fn echo<A: Send + 'static>(project: &Project) -> WrappedHandler<A> {
    project.wrap(
        |req, res, _args: A| {
            res.json(json!({ "req": summarize_request(req) }));
            Box::pin(async { Ok(()) })
        },
        HandlerConfig::named("echo"),
    )
}

/// A handler that always fails with the project error for `status`.
///
/// Statuses outside the error taxonomy fail with Not Found.
pub fn error_route<A: Send + 'static>(project: &Project, status: u16) -> WrappedHandler<A> {
    let kind = ErrorKind::from_status(status).unwrap_or(ErrorKind::NotFound);
    project.wrap(
        move |_req, _res, _args: A| {
            Box::pin(async move { Err(anyhow::Error::new(ProjectError::new(kind))) })
        },
        HandlerConfig::named("error"),
    )
}

/// A handler that always fails with a plain error.
pub fn unhandled_route<A: Send + 'static>(project: &Project) -> WrappedHandler<A> {
    project.wrap(
        |_req, _res, _args: A| Box::pin(async { Err(anyhow::anyhow!(UNHANDLED_MESSAGE)) }),
        HandlerConfig::named("error"),
    )
}

/// What a [`log_route`] writes to the log.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogProbe {
    /// One warning.
    Warn,
    /// One error.
    Error,
    /// One fatal record.
    Fatal,
    /// A warning, then an error.
    Both,
}

impl LogProbe {
    /// Every probe, in route order.
    pub const ALL: [Self; 4] = [Self::Error, Self::Fatal, Self::Warn, Self::Both];

    /// Parses the last segment of a `/log/<probe>` path.
    pub fn from_segment(segment: &str) -> Option<Self> {
        match segment {
            "warn" => Some(Self::Warn),
            "error" => Some(Self::Error),
            "fatal" => Some(Self::Fatal),
            "both" => Some(Self::Both),
            _ => None,
        }
    }

    /// The path segment naming this probe.
    pub const fn segment(self) -> &'static str {
        match self {
            Self::Warn => "warn",
            Self::Error => "error",
            Self::Fatal => "fatal",
            Self::Both => "both",
        }
    }

    fn emit(self, log: &Logger) -> &'static str {
        match self {
            Self::Warn => {
                log.warn("Logging test warn");
                "Logged test warn"
            }
            Self::Error => {
                log.error("Logging test error");
                "Logged test error"
            }
            Self::Fatal => {
                log.fatal("Logging test fatal");
                "Logged test fatal"
            }
            Self::Both => {
                log.warn("Logging test warn");
                log.error("Logging test error");
                "Logged test warn and error"
            }
        }
    }
}

impl fmt::Display for LogProbe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.segment())
    }
}

/// A handler that logs according to `probe` and responds
/// `{"message": "Logged test <level>"}`.
pub fn log_route<A: Send + 'static>(project: &Project, probe: LogProbe) -> WrappedHandler<A> {
    let fallback = project.logger().clone();
    project.wrap(
        move |req, res, _args: A| {
            let log = request_logger(req, &fallback).with("handler", "log");
            let message = probe.emit(&log);
            res.json(json!({ "message": message }));
            Box::pin(async { Ok(()) })
        },
        HandlerConfig::named("log"),
    )
}

/// Path dispatch over the routes of this module.
///
/// | Path | Handler |
/// |------|---------|
/// | `/error/unhandled` | [`unhandled_route`] |
/// | `/error/<status>` for [`ERROR_ROUTE_STATUSES`] | [`error_route`] |
/// | any other `/error/...` | Not Found |
/// | `/log/<probe>` | [`log_route`] |
/// | anything else | [`echo`] |
pub struct EchoRoutes<A> {
    errors: Vec<(u16, WrappedHandler<A>)>,
    error_fallback: WrappedHandler<A>,
    unhandled: WrappedHandler<A>,
    logs: Vec<(LogProbe, WrappedHandler<A>)>,
    echo: WrappedHandler<A>,
}

impl<A: Send + 'static> EchoRoutes<A> {
    /// Wraps every route with `project`.
    pub fn new(project: &Project) -> Self {
        Self {
            errors: ERROR_ROUTE_STATUSES
                .iter()
                .map(|status| (*status, error_route(project, *status)))
                .collect(),
            error_fallback: error_route(project, StatusCode::NOT_FOUND.as_u16()),
            unhandled: unhandled_route(project),
            logs: LogProbe::ALL
                .iter()
                .map(|probe| (*probe, log_route(project, *probe)))
                .collect(),
            echo: echo(project),
        }
    }

    /// Picks the handler for `path`.
    pub fn route(&self, path: &str) -> &WrappedHandler<A> {
        if let Some(rest) = path.strip_prefix("/error/") {
            if rest == "unhandled" {
                return &self.unhandled;
            }
            return rest
                .parse::<u16>()
                .ok()
                .and_then(|status| self.errors.iter().find(|(code, _)| *code == status))
                .map_or(&self.error_fallback, |(_, handler)| handler);
        }

        if let Some(probe) = path.strip_prefix("/log/").and_then(LogProbe::from_segment) {
            if let Some((_, handler)) = self.logs.iter().find(|(p, _)| *p == probe) {
                return handler;
            }
        }

        &self.echo
    }
}

impl<A> fmt::Debug for EchoRoutes<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EchoRoutes")
            .field("errors", &self.errors.len())
            .field("logs", &self.logs.len())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_message_lookup() {
        assert_eq!(status_message(200), Some("OK"));
        assert_eq!(status_message(418), Some("I'm a teapot"));
        assert_eq!(status_message(503), Some("Unavailable"));
        assert_eq!(status_message(299), None);
    }

    #[test]
    fn test_status_message_map_covers_every_entry() {
        let map = status_message_map();
        assert_eq!(map.as_object().unwrap().len(), STATUS_MESSAGES.len());
        assert_eq!(map["204"], "No Content");
    }

    #[test]
    fn test_log_probe_segments() {
        for probe in LogProbe::ALL {
            assert_eq!(LogProbe::from_segment(probe.segment()), Some(probe));
        }
        assert_eq!(LogProbe::from_segment("info"), None);
        assert_eq!(LogProbe::Both.to_string(), "both");
    }

    #[test]
    fn test_route_dispatch() {
        let routes: EchoRoutes<()> = EchoRoutes::new(&Project::default());

        assert_eq!(routes.route("/error/unhandled").name(), Some("error"));
        assert_eq!(routes.route("/error/418").name(), Some("error"));
        assert_eq!(routes.route("/error/nope").name(), Some("error"));
        assert_eq!(routes.route("/log/both").name(), Some("log"));
        assert_eq!(routes.route("/log/info").name(), Some("echo"));
        assert_eq!(routes.route("/geese").name(), Some("echo"));
    }
}
