//! Typed error taxonomy for the relay server, covering both the asset-store
//! HTTP surface and the room/transport ack surface.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("invalid name: {0}")]
    InvalidName(String),
    #[error("not found: {0}")]
    NotFound(String),
    #[error("conflict: {0}")]
    Conflict(String),
    #[error("capacity: {0}")]
    Capacity(String),
    #[error("unauthorized: {0}")]
    Unauthorized(String),
    #[error("ready gate: {0}")]
    ReadyGate(String),
    #[error("transport closed")]
    TransportClosed,
    #[error("io failure: {0}")]
    IoFailure(#[from] std::io::Error),
}

impl ServerError {
    /// Message text used in transport acks (`{ok:false, error:...}`).
    pub fn to_ack_error(&self) -> String {
        match self {
            ServerError::InvalidName(_) => "Invalid roomId".to_string(),
            ServerError::NotFound(_) => "Room not found".to_string(),
            ServerError::Conflict(_) => "Room already exists".to_string(),
            ServerError::Capacity(_) => "Room full".to_string(),
            ServerError::ReadyGate(_) => "Not all players are ready".to_string(),
            ServerError::Unauthorized(msg) => msg.clone(),
            ServerError::TransportClosed => "transport closed".to_string(),
            ServerError::IoFailure(_) => "internal error".to_string(),
        }
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let status = match &self {
            ServerError::InvalidName(_) => StatusCode::BAD_REQUEST,
            ServerError::NotFound(_) => StatusCode::NOT_FOUND,
            ServerError::Conflict(_) => StatusCode::CONFLICT,
            ServerError::Capacity(_) => StatusCode::CONFLICT,
            ServerError::Unauthorized(_) => StatusCode::FORBIDDEN,
            ServerError::ReadyGate(_) => StatusCode::BAD_REQUEST,
            ServerError::TransportClosed => StatusCode::GONE,
            ServerError::IoFailure(e) => {
                log::error!("asset store io failure: {}", e);
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };
        let body = if matches!(self, ServerError::IoFailure(_)) {
            "internal error".to_string()
        } else {
            self.to_string()
        };
        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ack_error_text_matches_expected_messages() {
        assert_eq!(ServerError::NotFound("r".into()).to_ack_error(), "Room not found");
        assert_eq!(ServerError::Conflict("r".into()).to_ack_error(), "Room already exists");
        assert_eq!(ServerError::Capacity("r".into()).to_ack_error(), "Room full");
        assert_eq!(ServerError::ReadyGate("r".into()).to_ack_error(), "Not all players are ready");
        assert_eq!(ServerError::InvalidName("r".into()).to_ack_error(), "Invalid roomId");
    }
}
