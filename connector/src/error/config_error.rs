use thiserror::Error;

/// Errors raised while building a [`Connector`](crate::Connector).
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The base URL could not be parsed.
    #[error("invalid base URL '{url}': {source}")]
    InvalidBaseUrl {
        /// The rejected URL.
        url: String,
        /// The underlying parse failure.
        #[source]
        source: url::ParseError,
    },
    /// The HTTP client backing the default transport could not be built.
    #[error("failed to build HTTP client: {0}")]
    HttpClient(#[source] reqwest::Error),
}
