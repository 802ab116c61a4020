//! Layered error types for the connector.
//!
//! The error hierarchy separates classified failures from pass-through ones:
//! - [`ConnectorError`] - Top-level error type returned by every operation
//! - [`RequestError`] - Classified failure descriptor (the value callers match on)
//! - [`TransportError`] - Typed failures reported by a [`Transport`](crate::Transport)
//! - [`ConfigError`] - Connector construction errors

mod config_error;
mod connector_error;
mod request_error;
mod transport_error;

pub use config_error::ConfigError;
pub use connector_error::ConnectorError;
pub use request_error::{Reason, RequestError};
pub use transport_error::TransportError;
