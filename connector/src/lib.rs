//! Async client for the Sendsay JSON API.
//!
//! Every API call is a single form-encoded POST carrying a JSON request
//! object. The [`Connector`] attaches the connection identity, sends the
//! envelope through a [`Transport`], and turns the outcome into either the
//! decoded body or a [`ConnectorError`]:
//!
//! - transport failures, non-2xx statuses, malformed bodies and errors
//!   reported by the API become a classified [`RequestError`]
//! - `REDIRECT` instructions in a successful body are followed, up to
//!   [`config::MAX_REDIRECT_COUNT`] times per call
//! - failures are also handed to an optional error observer
//!
//! ## Examples
//!
//! ```rust,ignore
//! use sendsay_connector::{Connector, RequestOptions};
//! use serde_json::json;
//!
//! let mut connector = Connector::new("https://api.sendsay.ru/general/api/v100/json/account")?;
//! connector.set_api_key("my-api-key");
//! connector.on_error(|err| tracing::error!(kind = ?err.kind(), "sendsay call failed"));
//!
//! let request = json!({ "action": "sys.settings.get" }).as_object().cloned().unwrap();
//! let settings = connector.execute(&request, RequestOptions::default()).await?;
//! ```

pub mod client;
pub mod config;
pub mod envelope;
pub mod error;
pub mod identity;
pub mod request_id;
pub mod response;
pub mod transport;

pub use client::{Connector, ConnectorBuilder, ErrorHandler, RequestOptions};
pub use envelope::{RequestEnvelope, RequestObject};
pub use error::{ConfigError, ConnectorError, Reason, RequestError, TransportError};
pub use identity::Identity;
pub use request_id::RequestIdGenerator;
pub use response::{ApiErrorEntry, ResponseBody};
pub use transport::{
    HttpTransport, HttpTransportBuilder, Transport, TransportRequest, TransportResponse,
};
