//! The transport boundary.
//!
//! A [`Transport`] performs one POST and reports either the raw response or
//! a typed [`TransportError`]. [`HttpTransport`] is the reqwest-backed
//! default; tests and embedders can supply their own.

mod http;

use std::future::Future;

use bytes::Bytes;

pub use http::{HttpTransport, HttpTransportBuilder};

use crate::error::TransportError;

/// `Accept` header value sent with every request.
pub const ACCEPT: &str = "application/json";

/// `Content-Type` header value sent with every request.
pub const CONTENT_TYPE: &str = "application/x-www-form-urlencoded; charset=utf-8";

/// One outbound POST.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportRequest {
    /// Target URL: the base URL plus any redirect suffix.
    pub url: String,
    /// URL-encoded envelope.
    pub body: String,
    /// Header name/value pairs.
    pub headers: Vec<(&'static str, &'static str)>,
}

impl TransportRequest {
    /// Creates a request carrying the standard `Accept` and `Content-Type` headers.
    pub fn new(url: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            body: body.into(),
            headers: vec![("accept", ACCEPT), ("content-type", CONTENT_TYPE)],
        }
    }
}

/// The raw outcome of a request that reached the server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportResponse {
    /// HTTP status code.
    pub status: u16,
    /// HTTP status text, e.g. `Not Found`.
    pub status_text: String,
    /// Undecoded response body.
    pub body: Bytes,
}

impl TransportResponse {
    /// Returns `true` for statuses in `[200, 300)`.
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Sends requests on behalf of a [`Connector`](crate::Connector).
pub trait Transport: Send + Sync {
    /// Sends one request.
    fn send(
        &self,
        request: TransportRequest,
    ) -> impl Future<Output = Result<TransportResponse, TransportError>> + Send;
}
