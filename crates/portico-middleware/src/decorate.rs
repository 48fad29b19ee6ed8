//! Response decoration with project headers.

use portico_config::ProjectSettings;
use portico_core::headers::{
    FRAMEWORK_POWERED_BY, PORTICO_POWERED_BY, POWERED_BY, PROJECT_ENVIRONMENT, PROJECT_HANDLER,
    PROJECT_INVOCATION, PROJECT_KEY, PROJECT_VERSION,
};
use portico_core::{HeaderError, InvocationResolver, Response};
use portico_telemetry::Logger;
use serde_json::json;

/// Handler facts written into the response headers.
#[derive(Debug, Clone, Copy, Default)]
pub struct DecorateContext<'a> {
    /// Handler name.
    pub handler: Option<&'a str>,
    /// Handler version.
    pub version: Option<&'a str>,
}

/// Writes the identity and project headers onto `res`.
///
/// Never fails: a response whose headers are frozen is skipped with a
/// warning, and a header that cannot be written is logged and dropped
/// together with the headers after it. The caller decides how often this
/// runs.
///
/// # Example
///
/// ```
/// use portico_config::ProjectSettings;
/// use portico_core::invocation::StaticInvocation;
/// use portico_core::Response;
/// use portico_middleware::decorate::{decorate_response, DecorateContext};
/// use portico_telemetry::{Logger, MemorySink};
///
/// let settings = ProjectSettings {
///     key: Some("geese".to_string()),
///     ..Default::default()
/// };
/// let mut res = Response::new();
/// let context = DecorateContext { handler: Some("honk"), version: Some("1.0.0") };
///
/// decorate_response(
///     &mut res,
///     &context,
///     &settings,
///     &StaticInvocation("abcd1234-0000".to_string()),
///     &Logger::new(MemorySink::new()),
/// );
///
/// assert_eq!(res.header("x-powered-by"), Some("portico"));
/// assert_eq!(res.header("x-project-handler"), Some("honk"));
/// assert_eq!(res.header("x-project-invocation"), Some("abcd1234-0000"));
/// assert_eq!(res.header("x-project-key"), Some("geese"));
/// assert_eq!(res.header("x-project-version"), Some("1.0.0"));
/// ```
pub fn decorate_response(
    res: &mut Response,
    context: &DecorateContext<'_>,
    settings: &ProjectSettings,
    invocation: &dyn InvocationResolver,
    log: &Logger,
) {
    if !res.headers_writable() {
        log.warn("decorate_response called but response headers are no longer writable");
        return;
    }

    log.trace("Decorating response");
    if let Err(e) = write_headers(res, context, settings, invocation) {
        log.warn("decorate_response caught an internal error");
        log.warn_var(json!({ "error": e.to_string() }));
    }
}

fn write_headers(
    res: &mut Response,
    context: &DecorateContext<'_>,
    settings: &ProjectSettings,
    invocation: &dyn InvocationResolver,
) -> Result<(), HeaderError> {
    // Replace the server default, keep anything customized.
    let powered_by = res.header(POWERED_BY);
    if powered_by.map_or(true, |v| v.is_empty() || v == FRAMEWORK_POWERED_BY) {
        res.set_header(POWERED_BY, PORTICO_POWERED_BY)?;
    }

    if let Some(environment) = settings.environment.as_deref() {
        res.set_header(PROJECT_ENVIRONMENT, environment)?;
    }

    if let Some(handler) = context.handler.filter(|h| !h.is_empty()) {
        res.set_header(PROJECT_HANDLER, handler)?;
    }

    if let Some(invoke) = invocation.current_invocation() {
        res.set_header(PROJECT_INVOCATION, &invoke)?;
    }

    if let Some(key) = settings.key.as_deref() {
        res.set_header(PROJECT_KEY, key)?;
    }

    if let Some(version) = context.version.filter(|v| !v.is_empty()) {
        res.set_header(PROJECT_VERSION, version)?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use portico_core::invocation::{NoInvocation, StaticInvocation};
    use portico_telemetry::{Level, MemorySink};

    fn decorate(res: &mut Response, context: DecorateContext<'_>, settings: &ProjectSettings) -> MemorySink {
        let sink = MemorySink::new();
        decorate_response(res, &context, settings, &NoInvocation, &Logger::new(sink.clone()));
        sink
    }

    #[test]
    fn test_overrides_framework_default() {
        let mut res = Response::new();
        decorate(&mut res, DecorateContext::default(), &ProjectSettings::default());
        assert_eq!(res.header(POWERED_BY), Some(PORTICO_POWERED_BY));
    }

    #[test]
    fn test_keeps_custom_powered_by() {
        let mut res = Response::new();
        res.set_header(POWERED_BY, "geese").unwrap();
        decorate(&mut res, DecorateContext::default(), &ProjectSettings::default());
        assert_eq!(res.header(POWERED_BY), Some("geese"));
    }

    #[test]
    fn test_omits_absent_facts() {
        let mut res = Response::new();
        let sink = decorate(
            &mut res,
            DecorateContext {
                handler: Some(""),
                version: None,
            },
            &ProjectSettings::default(),
        );

        for name in [
            PROJECT_ENVIRONMENT,
            PROJECT_HANDLER,
            PROJECT_INVOCATION,
            PROJECT_KEY,
            PROJECT_VERSION,
        ] {
            assert!(res.header(name).is_none(), "{name} should be absent");
        }
        assert!(sink.contains(Level::Trace, "Decorating response"));
    }

    #[test]
    fn test_environment_from_settings() {
        let settings = ProjectSettings {
            environment: Some("staging".to_string()),
            ..Default::default()
        };
        let mut res = Response::new();
        decorate(&mut res, DecorateContext::default(), &settings);
        assert_eq!(res.header(PROJECT_ENVIRONMENT), Some("staging"));
    }

    #[test]
    fn test_invocation_header() {
        let mut res = Response::new();
        decorate_response(
            &mut res,
            &DecorateContext::default(),
            &ProjectSettings::default(),
            &StaticInvocation("0189-invoke".to_string()),
            &Logger::new(MemorySink::new()),
        );
        assert_eq!(res.header(PROJECT_INVOCATION), Some("0189-invoke"));
    }

    #[test]
    fn test_finished_response_is_skipped() {
        let mut res = Response::new();
        res.finish();
        let sink = decorate(
            &mut res,
            DecorateContext {
                handler: Some("late"),
                version: None,
            },
            &ProjectSettings::default(),
        );
        assert!(res.header(PROJECT_HANDLER).is_none());
        assert_eq!(sink.count(Level::Warn), 1);
        assert!(!sink.contains(Level::Trace, "Decorating response"));
    }

    #[test]
    fn test_invalid_value_is_swallowed() {
        let mut res = Response::new();
        let sink = decorate(
            &mut res,
            DecorateContext {
                handler: Some("bad\nname"),
                version: Some("1.0.0"),
            },
            &ProjectSettings::default(),
        );

        assert!(sink.contains(Level::Warn, "decorate_response caught an internal error"));
        assert_eq!(sink.vars(Level::Warn).len(), 1);
        assert_eq!(res.header(POWERED_BY), Some(PORTICO_POWERED_BY));
        assert!(res.header(PROJECT_HANDLER).is_none());
    }
}
