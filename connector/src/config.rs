//! Protocol constants and process-wide configuration.

use std::sync::LazyLock;

/// Protocol version sent as `apiversion` with every request.
pub const API_VERSION: u32 = 100;

/// Maximum number of `REDIRECT` instructions followed for a single call.
pub const MAX_REDIRECT_COUNT: u32 = 10;

/// Request-id prefix used when the environment does not provide one.
pub const DEFAULT_REQUEST_PREFIX: &str = "SENDSAY_API_CONNECTOR";

/// Environment variable overriding the request-id prefix.
pub const REQUEST_PREFIX_ENV: &str = "SENDSAY_API_CONNECTOR_REQUEST_PREFIX";

static REQUEST_PREFIX: LazyLock<String> =
    LazyLock::new(|| resolve_request_prefix(std::env::var(REQUEST_PREFIX_ENV).ok()));

/// Returns the request-id prefix for this process.
///
/// The environment is read once, on first use.
pub fn request_prefix() -> &'static str {
    REQUEST_PREFIX.as_str()
}

/// Resolves the request-id prefix from an optional configured value.
///
/// Blank values fall back to [`DEFAULT_REQUEST_PREFIX`].
pub fn resolve_request_prefix(configured: Option<String>) -> String {
    configured
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .unwrap_or_else(|| DEFAULT_REQUEST_PREFIX.to_string())
}
