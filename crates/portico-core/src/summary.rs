//! Log-friendly projections of requests and responses.
//!
//! Both functions are pure: they read the request or response and build a
//! small serializable structure, never touching the original.

use crate::request::Request;
use crate::response::Response;
use http::HeaderMap;
use serde::Serialize;
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// Projection of a request for structured logging.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestSummary {
    /// Mount path.
    pub base_url: String,
    /// Printable body.
    pub body: Value,
    /// Header names to printable values.
    pub headers: BTreeMap<String, String>,
    /// HTTP method.
    pub method: String,
    /// Decoded query parameters.
    pub query: BTreeMap<String, String>,
    /// Path and query.
    pub url: String,
}

/// Projects a request into a [`RequestSummary`].
///
/// A binary body is rendered as lossy UTF-8 text.
pub fn summarize_request(req: &Request) -> RequestSummary {
    RequestSummary {
        base_url: req.base_url().to_string(),
        body: req.body().to_printable(),
        headers: printable_headers(req.headers()),
        method: req.method().to_string(),
        query: req.query(),
        url: req.url().to_string(),
    }
}

/// Projects a response into a JSON object, with `extras` merged on top.
///
/// Base fields are `headers`, `statusCode` and `statusMessage`; an extra
/// with the same key replaces the base field.
pub fn summarize_response(res: &Response, extras: Map<String, Value>) -> Value {
    let mut summary = Map::new();
    summary.insert(
        "headers".to_string(),
        serde_json::to_value(printable_headers(res.headers())).unwrap_or(Value::Null),
    );
    summary.insert(
        "statusCode".to_string(),
        Value::from(res.status_code().as_u16()),
    );
    summary.insert(
        "statusMessage".to_string(),
        res.status_message().map_or(Value::Null, Value::from),
    );
    summary.extend(extras);
    Value::Object(summary)
}

fn printable_headers(headers: &HeaderMap) -> BTreeMap<String, String> {
    let mut out = BTreeMap::new();
    for (name, value) in headers {
        let value = String::from_utf8_lossy(value.as_bytes()).into_owned();
        out.entry(name.as_str().to_string())
            .and_modify(|existing: &mut String| {
                existing.push_str(", ");
                existing.push_str(&value);
            })
            .or_insert(value);
    }
    out
}
