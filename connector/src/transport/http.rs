//! reqwest-backed transport.

use std::time::Duration;

use super::{Transport, TransportRequest, TransportResponse};
use crate::error::{ConfigError, TransportError};

/// Builder for configuring an [`HttpTransport`].
#[derive(Debug, Default)]
pub struct HttpTransportBuilder {
    timeout: Option<Duration>,
}

impl HttpTransportBuilder {
    /// Sets a request timeout. Requests never time out by default.
    ///
    /// A request that times out is reported as
    /// [`TransportError::Unreachable`].
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Builds the [`HttpTransport`].
    ///
    /// ## Errors
    ///
    /// Returns an error if the HTTP client cannot be constructed.
    pub fn build(self) -> Result<HttpTransport, ConfigError> {
        let mut builder = reqwest::Client::builder().pool_max_idle_per_host(10);

        if let Some(timeout) = self.timeout {
            builder = builder.timeout(timeout);
        }

        let client = builder.build().map_err(ConfigError::HttpClient)?;

        Ok(HttpTransport { client })
    }
}

/// Default [`Transport`] built on a pooled `reqwest::Client`.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
}

impl HttpTransport {
    /// Creates a new builder.
    pub fn builder() -> HttpTransportBuilder {
        HttpTransportBuilder::default()
    }

    /// Creates a transport with default settings.
    ///
    /// ## Errors
    ///
    /// Returns an error if the HTTP client cannot be constructed.
    pub fn new() -> Result<Self, ConfigError> {
        Self::builder().build()
    }
}

impl Transport for HttpTransport {
    async fn send(&self, request: TransportRequest) -> Result<TransportResponse, TransportError> {
        let mut builder = self.client.post(request.url.as_str()).body(request.body);
        for (name, value) in request.headers {
            builder = builder.header(name, value);
        }

        let response = builder.send().await?;

        let status = response.status();
        let status_text = status
            .canonical_reason()
            .map(str::to_string)
            .unwrap_or_else(|| status.as_str().to_string());

        let body = response.bytes().await?;

        Ok(TransportResponse {
            status: status.as_u16(),
            status_text,
            body,
        })
    }
}
