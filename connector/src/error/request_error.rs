use std::fmt;

use serde_json::Value;

use crate::response::{is_falsy, ApiErrorEntry};

/// The `reason` part of a [`RequestError`].
///
/// The remote API explains most errors with a plain string, but some carry a
/// structured object. Structured reasons are projected onto their `status`
/// field when building the classification key.
#[derive(Debug, Clone, PartialEq)]
pub enum Reason {
    /// A plain textual reason.
    Text(String),
    /// A structured reason object.
    Structured(Value),
}

impl Reason {
    /// Builds a reason from an arbitrary JSON value.
    ///
    /// Returns `None` for `null`, `false`, zero and empty strings.
    pub fn from_value(value: &Value) -> Option<Self> {
        match value {
            v if is_falsy(v) => None,
            Value::String(text) => Some(Self::Text(text.clone())),
            Value::Object(_) => Some(Self::Structured(value.clone())),
            other => Some(Self::Text(other.to_string())),
        }
    }

    /// Returns the label used inside the classification key.
    pub fn label(&self) -> String {
        match self {
            Self::Text(text) => text.clone(),
            Self::Structured(value) => match value.get("status") {
                Some(Value::String(status)) => status.clone(),
                Some(Value::Null) | None => String::new(),
                Some(other) => other.to_string(),
            },
        }
    }
}

impl From<&str> for Reason {
    fn from(text: &str) -> Self {
        Self::Text(text.to_string())
    }
}

impl From<String> for Reason {
    fn from(text: String) -> Self {
        Self::Text(text)
    }
}

/// A classified request failure.
///
/// Produced by the connector whenever a call fails in a way it understands:
/// the transport could not reach the server, the server answered with a
/// non-2xx status, the body was not JSON, or the API reported an error.
/// The value is immutable once built; [`RequestError::kind`] derives the key
/// used for comparison and logging.
///
/// ## Examples
///
/// ```rust
/// use sendsay_connector::RequestError;
///
/// let err = RequestError::new("error/auth/failed", Some("bad password".into()), None);
/// assert_eq!(err.kind(), "error/auth/failed:bad password");
///
/// let err = RequestError::new("E1", None, Some("x".to_string()));
/// assert_eq!(err.kind(), "E1::x");
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct RequestError {
    code: String,
    reason: Option<Reason>,
    error: Option<String>,
    request: Option<Value>,
}

impl RequestError {
    /// Creates a descriptor. Empty `reason` and `error` strings count as absent.
    pub fn new(code: impl Into<String>, reason: Option<Reason>, error: Option<String>) -> Self {
        Self {
            code: code.into(),
            reason: reason.filter(|r| !matches!(r, Reason::Text(text) if text.is_empty())),
            error: error.filter(|e| !e.is_empty()),
            request: None,
        }
    }

    /// The transport could not reach the server (`fetch:failed`).
    pub fn fetch_failed() -> Self {
        Self::new("fetch", Some("failed".into()), None)
    }

    /// The response body was not valid JSON (`fetch:invalid_json`).
    pub fn invalid_json() -> Self {
        Self::new("fetch", Some("invalid_json".into()), None)
    }

    /// The server answered with a non-2xx status; the status text is the code.
    pub fn from_status(status_text: impl Into<String>) -> Self {
        Self::new(status_text, None, None)
    }

    /// Attaches the request that produced this failure.
    pub fn with_request(mut self, request: Value) -> Self {
        self.request = Some(request);
        self
    }

    /// The error code.
    pub fn code(&self) -> &str {
        &self.code
    }

    /// The reason, if any.
    pub fn reason(&self) -> Option<&Reason> {
        self.reason.as_ref()
    }

    /// The detailed error string, if any.
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// The originating request, attached for errors reported by the API.
    pub fn request(&self) -> Option<&Value> {
        self.request.as_ref()
    }

    /// Returns the classification key.
    ///
    /// One of `code`, `code:reason`, `code::error` or `code:reason:error`
    /// depending on which fields are present.
    pub fn kind(&self) -> String {
        let reason = self.reason.as_ref().map(Reason::label);

        match (reason, self.error.as_deref()) {
            (Some(reason), Some(error)) => format!("{}:{reason}:{error}", self.code),
            (None, Some(error)) => format!("{}::{error}", self.code),
            (Some(reason), None) => format!("{}:{reason}", self.code),
            (None, None) => self.code.clone(),
        }
    }
}

impl From<&ApiErrorEntry> for RequestError {
    fn from(entry: &ApiErrorEntry) -> Self {
        Self::new(
            entry.id.clone().unwrap_or_default(),
            entry.explain.as_ref().and_then(Reason::from_value),
            entry.error.clone(),
        )
    }
}

impl fmt::Display for RequestError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "request failed: {}", self.kind())
    }
}

impl std::error::Error for RequestError {}
