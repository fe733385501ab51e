//! Typed error taxonomy for the client's transport/predictor surface.
//!
//! A client library that other code embeds (rather than a standalone
//! binary) benefits from a closed error enum its callers can match on.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("connect failed: {0}")]
    Connect(String),
    #[error("transport closed")]
    TransportClosed,
    #[error("serialization failure: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("server rejected request: {0}")]
    Rejected(String),
}
