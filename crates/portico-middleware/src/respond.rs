//! Turning caught errors into responses.
//!
//! Project errors carry their own status and JSON:API body. Anything else
//! is logged at fatal with its full chain and replaced by
//! [`ProjectError::unhandled`], so the original message never reaches the
//! client.

use portico_core::{ProjectError, Response};
use portico_telemetry::Logger;
use serde_json::{json, Value};

/// Classifies an error raised by a handler or teardown step.
///
/// A plain error is logged at fatal and replaced by the generic 500.
pub fn classify(error: anyhow::Error, log: &Logger) -> ProjectError {
    match ProjectError::from_anyhow(error) {
        Ok(project_error) => project_error,
        Err(other) => {
            log.fatal_var(json!({ "unhandledError": describe(&other) }));
            ProjectError::unhandled()
        }
    }
}

/// Sends the error response for an error that reached the end of the
/// pipeline.
///
/// A response the handler already sent is left as it is; the error is only
/// logged.
pub fn respond_with_error(res: &mut Response, error: anyhow::Error, log: &Logger) {
    let error = match ProjectError::from_anyhow(error) {
        Ok(project_error) => {
            log.trace("Caught ProjectError");
            log.trace_var(json!({ "projectError": project_error.to_json() }));
            project_error
        }
        Err(other) => {
            log.debug("Caught unhandled error");
            log.fatal_var(json!({ "unhandledError": describe(&other) }));
            ProjectError::unhandled()
        }
    };
    if res.is_sent() {
        log.debug("Response already sent, not sending error response");
        return;
    }
    send_error(res, &error);
}

/// Writes `error` as the response: its status and its JSON:API document.
pub fn send_error(res: &mut Response, error: &ProjectError) {
    res.status(error.status_code()).json(error.to_json());
}

fn describe(error: &anyhow::Error) -> Value {
    let causes: Vec<String> = error.chain().skip(1).map(ToString::to_string).collect();
    json!({
        "message": error.to_string(),
        "causes": causes,
    })
}
