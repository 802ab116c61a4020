//! Request execution.

mod executor;

pub use executor::{Connector, ConnectorBuilder, ErrorHandler, RequestOptions};
