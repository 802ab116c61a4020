//! Request execution with tracing instrumentation.
//!
//! This module provides the [`Connector`] struct, which builds the wire
//! envelope for a request object, sends it through a [`Transport`],
//! classifies the outcome and follows `REDIRECT` instructions.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;
use tracing::{debug, instrument, warn, Span};
use url::Url;

use crate::config::{self, MAX_REDIRECT_COUNT};
use crate::envelope::{RequestEnvelope, RequestObject};
use crate::error::{ConfigError, ConnectorError, RequestError, TransportError};
use crate::identity::Identity;
use crate::request_id::RequestIdGenerator;
use crate::response::{self, ResponseBody};
use crate::transport::{HttpTransport, Transport, TransportRequest};

/// Observer invoked with every failure produced by [`Connector::execute`].
pub type ErrorHandler = Arc<dyn Fn(&ConnectorError) + Send + Sync>;

const BATCH_ACTION: &str = "batch";

/// Per-call options for [`Connector::execute`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RequestOptions {
    /// Return the body even when it carries a top-level `errors` field.
    ///
    /// Errors inside batch sub-results are still reported.
    pub ignore_errors: bool,
    /// Number of redirects already followed for this call.
    pub redirect_count: u32,
}

impl RequestOptions {
    /// Options that tolerate a top-level `errors` field.
    pub fn ignoring_errors() -> Self {
        Self {
            ignore_errors: true,
            ..Self::default()
        }
    }
}

/// Builder for configuring a [`Connector`].
pub struct ConnectorBuilder {
    base_url: String,
    timeout: Option<Duration>,
    request_prefix: Option<String>,
    max_redirects: u32,
    identity: Identity,
    error_handler: Option<ErrorHandler>,
}

impl ConnectorBuilder {
    fn new(base_url: String) -> Self {
        Self {
            base_url,
            timeout: None,
            request_prefix: None,
            max_redirects: MAX_REDIRECT_COUNT,
            identity: Identity::default(),
            error_handler: None,
        }
    }

    /// Sets a request timeout for the default HTTP transport.
    ///
    /// Ignored by [`build_with_transport`](Self::build_with_transport).
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Overrides the process-wide request-id prefix.
    pub fn request_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.request_prefix = Some(prefix.into());
        self
    }

    /// Overrides the number of `REDIRECT` instructions followed per call.
    pub fn max_redirects(mut self, max_redirects: u32) -> Self {
        self.max_redirects = max_redirects;
        self
    }

    /// Sets the initial session token.
    pub fn session(mut self, session: impl Into<String>) -> Self {
        self.identity.session = Some(session.into());
        self
    }

    /// Sets the initial API key.
    pub fn api_key(mut self, api_key: impl Into<String>) -> Self {
        self.identity.api_key = Some(api_key.into());
        self
    }

    /// Sets the initial access policy tag.
    pub fn policy(mut self, policy: impl Into<String>) -> Self {
        self.identity.policy = Some(policy.into());
        self
    }

    /// Registers the error observer.
    pub fn on_error(mut self, handler: impl Fn(&ConnectorError) + Send + Sync + 'static) -> Self {
        self.error_handler = Some(Arc::new(handler));
        self
    }

    /// Builds a [`Connector`] backed by [`HttpTransport`].
    ///
    /// ## Errors
    ///
    /// Returns an error if the base URL is invalid or the HTTP client cannot
    /// be constructed.
    pub fn build(self) -> Result<Connector<HttpTransport>, ConfigError> {
        let mut transport = HttpTransport::builder();
        if let Some(timeout) = self.timeout {
            transport = transport.timeout(timeout);
        }
        let transport = transport.build()?;

        self.build_with_transport(transport)
    }

    /// Builds a [`Connector`] backed by a custom transport.
    ///
    /// ## Errors
    ///
    /// Returns an error if the base URL is invalid.
    pub fn build_with_transport<T: Transport>(self, transport: T) -> Result<Connector<T>, ConfigError> {
        Url::parse(&self.base_url).map_err(|source| ConfigError::InvalidBaseUrl {
            url: self.base_url.clone(),
            source,
        })?;

        let prefix = self
            .request_prefix
            .map(|p| config::resolve_request_prefix(Some(p)))
            .unwrap_or_else(|| config::request_prefix().to_string());

        Ok(Connector {
            transport,
            base_url: self.base_url,
            identity: self.identity,
            request_ids: RequestIdGenerator::new(prefix),
            max_redirects: self.max_redirects,
            error_handler: self.error_handler,
        })
    }
}

impl fmt::Debug for ConnectorBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectorBuilder")
            .field("base_url", &self.base_url)
            .field("timeout", &self.timeout)
            .field("request_prefix", &self.request_prefix)
            .field("max_redirects", &self.max_redirects)
            .field("has_error_handler", &self.error_handler.is_some())
            .finish_non_exhaustive()
    }
}

/// Async client for the API.
///
/// The connector owns the connection identity, turns request objects into
/// signed envelopes and interprets the responses. Failures are reported to
/// the optional error observer and then returned; `REDIRECT` instructions are
/// followed up to a fixed limit.
///
/// `execute` borrows the connector immutably, so one instance can serve
/// concurrent calls (wrap it in an `Arc`). Each call tracks its own redirect
/// target.
///
/// ## Examples
///
/// ```rust,ignore
/// use sendsay_connector::{Connector, RequestOptions};
/// use serde_json::json;
///
/// let mut connector = Connector::new("https://api.sendsay.ru/general/api/v100/json/account")?;
/// connector.set_session("alice:0123456789abcdef");
///
/// let request = json!({ "action": "pong" }).as_object().cloned().unwrap();
/// let body = connector.execute(&request, RequestOptions::default()).await?;
/// ```
pub struct Connector<T = HttpTransport> {
    transport: T,
    base_url: String,
    identity: Identity,
    request_ids: RequestIdGenerator,
    max_redirects: u32,
    error_handler: Option<ErrorHandler>,
}

impl Connector<HttpTransport> {
    /// Creates a new builder for configuring a connector.
    ///
    /// ## Arguments
    ///
    /// * `base_url` - The URL every request is posted to.
    pub fn builder(base_url: impl Into<String>) -> ConnectorBuilder {
        ConnectorBuilder::new(base_url.into())
    }

    /// Creates a connector with default settings.
    ///
    /// ## Errors
    ///
    /// Returns an error if the base URL is invalid or the HTTP client cannot
    /// be constructed.
    pub fn new(base_url: impl Into<String>) -> Result<Self, ConfigError> {
        Self::builder(base_url).build()
    }
}

impl<T: Transport> Connector<T> {
    /// Creates a connector with default settings and a custom transport.
    ///
    /// ## Errors
    ///
    /// Returns an error if the base URL is invalid.
    pub fn with_transport(base_url: impl Into<String>, transport: T) -> Result<Self, ConfigError> {
        ConnectorBuilder::new(base_url.into()).build_with_transport(transport)
    }

    /// Returns the base URL.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Returns the transport.
    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Returns the current connection identity.
    pub fn identity(&self) -> &Identity {
        &self.identity
    }

    /// Returns the session token, if set.
    pub fn session(&self) -> Option<&str> {
        self.identity.session.as_deref()
    }

    /// Returns the API key, if set.
    pub fn api_key(&self) -> Option<&str> {
        self.identity.api_key.as_deref()
    }

    /// Returns the access policy tag, if set.
    pub fn policy(&self) -> Option<&str> {
        self.identity.policy.as_deref()
    }

    /// Sets the session token. A session takes precedence over an API key.
    pub fn set_session(&mut self, session: impl Into<String>) {
        self.identity.session = Some(session.into());
    }

    /// Forgets the session token.
    pub fn clear_session(&mut self) {
        self.identity.session = None;
    }

    /// Sets the API key, used when no session is set.
    pub fn set_api_key(&mut self, api_key: impl Into<String>) {
        self.identity.api_key = Some(api_key.into());
    }

    /// Forgets the API key.
    pub fn clear_api_key(&mut self) {
        self.identity.api_key = None;
    }

    /// Sets the access policy tag sent as `lbac.policy`.
    pub fn set_policy(&mut self, policy: impl Into<String>) {
        self.identity.policy = Some(policy.into());
    }

    /// Forgets the access policy tag.
    pub fn clear_policy(&mut self) {
        self.identity.policy = None;
    }

    /// Registers the error observer, replacing any previous one.
    ///
    /// The observer is called synchronously, once per failed call, right
    /// before the error is returned. It cannot change the outcome.
    pub fn on_error(&mut self, handler: impl Fn(&ConnectorError) + Send + Sync + 'static) {
        self.error_handler = Some(Arc::new(handler));
    }

    /// Generates the next `request.id` for the current identity.
    pub fn next_request_id(&self) -> String {
        self.request_ids.next(self.identity.username())
    }

    /// Executes an API call and returns the decoded response body.
    ///
    /// The request object is augmented with the connection identity,
    /// wrapped in an envelope and posted to the base URL. A `REDIRECT` in a
    /// successful body re-issues the same envelope against
    /// `base_url + REDIRECT`, at most [`MAX_REDIRECT_COUNT`] times by default;
    /// past that limit the last body is returned as-is.
    ///
    /// ## Errors
    ///
    /// Returns [`ConnectorError::Request`] when:
    /// - The server could not be reached (`fetch:failed`)
    /// - The status is outside `[200, 300)` (the status text is the code)
    /// - The body is not valid JSON (`fetch:invalid_json`)
    /// - The body has an `errors` field and `ignore_errors` is unset
    /// - The request is a batch and a sub-result has an `errors` field
    ///
    /// Transport and decoder failures the connector cannot classify are
    /// returned as [`ConnectorError::Transport`] and
    /// [`ConnectorError::Decode`].
    #[instrument(
        name = "api_request",
        skip(self, request, options),
        fields(
            request.id = tracing::field::Empty,
            http.url = tracing::field::Empty,
            http.status_code = tracing::field::Empty,
            redirect_count = tracing::field::Empty,
            otel.kind = "client",
            otel.status_code = tracing::field::Empty,
        )
    )]
    pub async fn execute(
        &self,
        request: &RequestObject,
        options: RequestOptions,
    ) -> Result<Value, ConnectorError> {
        let request_id = self.next_request_id();
        Span::current().record("request.id", request_id.as_str());

        let envelope = RequestEnvelope::new(&self.identity.apply(request), request_id)?;
        let body = envelope.encode();

        let mut redirect: Option<String> = None;
        let mut redirect_count = options.redirect_count;

        loop {
            let url = match &redirect {
                Some(suffix) => format!("{}{suffix}", self.base_url),
                None => self.base_url.clone(),
            };
            Span::current().record("http.url", url.as_str());
            Span::current().record("redirect_count", redirect_count);

            let decoded = self
                .attempt(request, url, &body, options.ignore_errors)
                .await
                .map_err(|err| self.report(err))?;

            match decoded.redirect() {
                Some(target) if redirect_count < self.max_redirects => {
                    debug!(redirect = %target, redirect_count, "following redirect");
                    redirect = Some(target);
                    redirect_count += 1;
                }
                Some(target) => {
                    warn!(
                        redirect = %target,
                        redirect_count,
                        "redirect limit reached, returning last response"
                    );
                    Span::current().record("otel.status_code", "OK");
                    return Ok(decoded.into_value());
                }
                None => {
                    Span::current().record("otel.status_code", "OK");
                    return Ok(decoded.into_value());
                }
            }
        }
    }

    /// Sends one envelope and classifies the outcome.
    async fn attempt(
        &self,
        request: &RequestObject,
        url: String,
        body: &str,
        ignore_errors: bool,
    ) -> Result<ResponseBody, ConnectorError> {
        debug!(url = %url, "sending request");

        let reply = self
            .transport
            .send(TransportRequest::new(url, body))
            .await
            .map_err(classify_transport_error)?;

        Span::current().record("http.status_code", reply.status);

        if !reply.is_success() {
            return Err(RequestError::from_status(reply.status_text).into());
        }

        let decoded = response::decode(&reply.body)?;

        if !ignore_errors {
            if let Some(entry) = decoded.top_level_error() {
                return Err(application_error(&entry, request));
            }
        }

        if is_batch(request) {
            if let Some(entry) = decoded.first_batch_error() {
                return Err(application_error(&entry, request));
            }
        }

        Ok(decoded)
    }

    /// Hands a failure to the error observer and returns it.
    fn report(&self, err: ConnectorError) -> ConnectorError {
        Span::current().record("otel.status_code", "ERROR");
        debug!(error = %err, "request failed");

        if let Some(handler) = &self.error_handler {
            handler(&err);
        }

        err
    }
}

impl<T: fmt::Debug> fmt::Debug for Connector<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Connector")
            .field("transport", &self.transport)
            .field("base_url", &self.base_url)
            .field("identity", &self.identity)
            .field("request_ids", &self.request_ids)
            .field("max_redirects", &self.max_redirects)
            .field("has_error_handler", &self.error_handler.is_some())
            .finish()
    }
}

fn classify_transport_error(err: TransportError) -> ConnectorError {
    if err.is_unreachable() {
        RequestError::fetch_failed().into()
    } else {
        ConnectorError::Transport(err)
    }
}

fn application_error(entry: &response::ApiErrorEntry, request: &RequestObject) -> ConnectorError {
    RequestError::from(entry)
        .with_request(Value::Object(request.clone()))
        .into()
}

fn is_batch(request: &RequestObject) -> bool {
    request.get("action").and_then(Value::as_str) == Some(BATCH_ACTION)
}
