//! Header names and fixed values.

/// Identity header.
pub const POWERED_BY: &str = "x-powered-by";

/// Identity value written by the response decorator.
pub const PORTICO_POWERED_BY: &str = "portico";

/// Identity value the underlying server sets by default.
///
/// The decorator only replaces the identity header when it is absent or
/// still holds this value.
pub const FRAMEWORK_POWERED_BY: &str = "hyper";

/// Deployment environment header.
pub const PROJECT_ENVIRONMENT: &str = "x-project-environment";

/// Handler name header.
pub const PROJECT_HANDLER: &str = "x-project-handler";

/// Invocation id header.
pub const PROJECT_INVOCATION: &str = "x-project-invocation";

/// Project key header.
pub const PROJECT_KEY: &str = "x-project-key";

/// Project version header.
pub const PROJECT_VERSION: &str = "x-project-version";

/// Content type used for JSON bodies.
pub const CONTENT_TYPE_JSON: &str = "application/json; charset=utf-8";
