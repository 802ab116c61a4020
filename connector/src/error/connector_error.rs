use thiserror::Error;

use super::{RequestError, TransportError};

/// Top-level error for all connector operations.
///
/// Only [`ConnectorError::Request`] carries a classified descriptor. The
/// `Transport` and `Decode` variants are failures the connector could not
/// classify and passes through as-is.
#[derive(Debug, Error)]
pub enum ConnectorError {
    /// A classified failure: transport, HTTP status, decoding or an error
    /// reported by the remote API.
    #[error(transparent)]
    Request(#[from] RequestError),

    /// An unclassified transport failure.
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// An unclassified response decoding failure.
    #[error("failed to decode response: {0}")]
    Decode(#[source] serde_json::Error),

    /// The request object could not be serialized.
    #[error("failed to encode request: {0}")]
    Encode(#[source] serde_json::Error),
}

impl ConnectorError {
    /// Returns the classified descriptor, if this error carries one.
    pub fn request_error(&self) -> Option<&RequestError> {
        match self {
            Self::Request(err) => Some(err),
            _ => None,
        }
    }

    /// Returns the descriptor classification key, if this error carries one.
    pub fn kind(&self) -> Option<String> {
        self.request_error().map(RequestError::kind)
    }
}
