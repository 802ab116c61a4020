//! Decoded response bodies.
//!
//! The API answers every call with a JSON object. Besides the call-specific
//! payload, three fields drive the connector's control flow:
//!
//! - `errors` - the call failed; the first entry describes why
//! - `result` - for batch calls, one sub-result per batched request, each of
//!   which may carry its own `errors`
//! - `REDIRECT` - the call must be re-issued against another path
//!
//! [`ResponseBody`] keeps the decoded value intact and answers presence
//! questions about these fields explicitly.

use serde_json::Value;

use crate::error::{ConnectorError, RequestError};

const ERRORS_FIELD: &str = "errors";
const RESULT_FIELD: &str = "result";
const REDIRECT_FIELD: &str = "REDIRECT";

/// One entry of an `errors` array.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ApiErrorEntry {
    /// Error identifier (`id`), e.g. `error/auth/failed`.
    pub id: Option<String>,
    /// Explanation (`explain`), either text or a structured object.
    pub explain: Option<Value>,
    /// Detailed error string (`error`).
    pub error: Option<String>,
}

impl ApiErrorEntry {
    /// Reads an entry leniently. Missing and falsy fields stay `None` and
    /// other non-string `id`/`error` values are rendered as JSON text.
    pub fn from_value(value: &Value) -> Self {
        Self {
            id: text_field(value, "id"),
            explain: value.get("explain").filter(|v| !is_falsy(v)).cloned(),
            error: text_field(value, "error"),
        }
    }

    /// Reads the first entry of an `errors` field.
    ///
    /// An empty or malformed `errors` field yields an empty entry: the
    /// presence of the field alone marks the call as failed.
    fn first_of(errors: &Value) -> Self {
        errors.get(0).map(Self::from_value).unwrap_or_default()
    }
}

fn text_field(value: &Value, key: &str) -> Option<String> {
    match value.get(key)? {
        v if is_falsy(v) => None,
        Value::String(text) => Some(text.clone()),
        other => Some(other.to_string()),
    }
}

/// `null`, `false`, zero and the empty string carry no information in error
/// entries.
pub(crate) fn is_falsy(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Bool(flag) => !flag,
        Value::Number(number) => number.as_f64() == Some(0.0),
        Value::String(text) => text.is_empty(),
        Value::Array(_) | Value::Object(_) => false,
    }
}

/// A decoded response body.
#[derive(Debug, Clone, PartialEq)]
pub struct ResponseBody {
    value: Value,
}

impl ResponseBody {
    /// Wraps an already decoded value.
    pub fn new(value: Value) -> Self {
        Self { value }
    }

    /// Returns the first top-level error when the body has an `errors` field.
    pub fn top_level_error(&self) -> Option<ApiErrorEntry> {
        self.value.get(ERRORS_FIELD).map(ApiErrorEntry::first_of)
    }

    /// Returns the first error of the first sub-result that has an `errors`
    /// field, when `result` is an array.
    pub fn first_batch_error(&self) -> Option<ApiErrorEntry> {
        self.value
            .get(RESULT_FIELD)?
            .as_array()?
            .iter()
            .find_map(|sub_result| sub_result.get(ERRORS_FIELD))
            .map(ApiErrorEntry::first_of)
    }

    /// Returns the redirect target when the body has a `REDIRECT` field.
    pub fn redirect(&self) -> Option<String> {
        match self.value.get(REDIRECT_FIELD)? {
            Value::String(target) => Some(target.clone()),
            other => Some(other.to_string()),
        }
    }

    /// Borrows the decoded value.
    pub fn as_value(&self) -> &Value {
        &self.value
    }

    /// Returns the decoded value unchanged.
    pub fn into_value(self) -> Value {
        self.value
    }
}

/// Decodes a raw response body.
///
/// ## Errors
///
/// - Malformed or truncated JSON becomes the `fetch:invalid_json` descriptor
/// - Any other decoder failure is passed through as [`ConnectorError::Decode`]
pub fn decode(body: &[u8]) -> Result<ResponseBody, ConnectorError> {
    match serde_json::from_slice::<Value>(body) {
        Ok(value) => Ok(ResponseBody::new(value)),
        Err(err) if err.is_syntax() || err.is_eof() => Err(RequestError::invalid_json().into()),
        Err(err) => Err(ConnectorError::Decode(err)),
    }
}
