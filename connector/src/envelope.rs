//! The URL-encoded wire body.

use serde_json::{Map, Value};
use url::form_urlencoded;

use crate::config::API_VERSION;
use crate::error::ConnectorError;

/// A caller's API call: an arbitrary JSON object, usually with an `action`.
pub type RequestObject = Map<String, Value>;

/// The body of one transport attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestEnvelope {
    request_json: String,
    request_id: String,
}

impl RequestEnvelope {
    /// Serializes an (already augmented) request object.
    ///
    /// ## Errors
    ///
    /// Returns [`ConnectorError::Encode`] if the object cannot be serialized.
    pub fn new(request: &RequestObject, request_id: impl Into<String>) -> Result<Self, ConnectorError> {
        let request_json = serde_json::to_string(request).map_err(ConnectorError::Encode)?;

        Ok(Self {
            request_json,
            request_id: request_id.into(),
        })
    }

    /// Encodes the envelope as `application/x-www-form-urlencoded`.
    pub fn encode(&self) -> String {
        form_urlencoded::Serializer::new(String::new())
            .append_pair("apiversion", &API_VERSION.to_string())
            .append_pair("json", "1")
            .append_pair("request", &self.request_json)
            .append_pair("request.id", &self.request_id)
            .finish()
    }
}
