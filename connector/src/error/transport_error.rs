use thiserror::Error;

/// A failure reported by the transport layer.
///
/// Transports classify their own failures. [`TransportError::Unreachable`]
/// is normalized into the `fetch:failed` descriptor; anything else is passed
/// through untouched.
#[derive(Debug, Error)]
pub enum TransportError {
    /// The request never produced a response (connection refused, DNS
    /// failure, timeout, dropped connection).
    #[error("failed to fetch: {message}")]
    Unreachable {
        /// Human readable detail from the underlying client.
        message: String,
    },
    /// Any other transport failure.
    #[error("transport failure: {0}")]
    Other(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl TransportError {
    /// Creates an [`TransportError::Unreachable`] error.
    pub fn unreachable(message: impl Into<String>) -> Self {
        Self::Unreachable {
            message: message.into(),
        }
    }

    /// Wraps an arbitrary error as [`TransportError::Other`].
    pub fn other(err: impl Into<Box<dyn std::error::Error + Send + Sync>>) -> Self {
        Self::Other(err.into())
    }

    /// Returns `true` for failures of the "failed to fetch" class.
    pub fn is_unreachable(&self) -> bool {
        matches!(self, Self::Unreachable { .. })
    }
}

impl From<reqwest::Error> for TransportError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_connect() || err.is_timeout() || err.is_request() {
            Self::unreachable(err.to_string())
        } else {
            Self::Other(Box::new(err))
        }
    }
}
