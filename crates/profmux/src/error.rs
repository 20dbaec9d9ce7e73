use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};

use crate::{
    engine::EngineError,
    session::{BindingKey, SessionId},
};

/// Errors surfaced by the registry and the router.
///
/// Every kind is reported to HTTP clients with the same status code; only the
/// message differs.
#[derive(Debug, thiserror::Error)]
pub enum MuxError {
    #[error("invalid pid {raw}, an integer expected")]
    InvalidIdentifier { raw: String },
    #[error("pid {id} is not running, you should start a new prof instead")]
    NotRunning { id: SessionId },
    #[error("pid {id} is not bound to {binding}")]
    NotBound { id: SessionId, binding: BindingKey },
    #[error(transparent)]
    Engine(#[from] EngineError),
}

impl MuxError {
    pub fn invalid_identifier(raw: impl Into<String>) -> Self {
        MuxError::InvalidIdentifier { raw: raw.into() }
    }
}

impl IntoResponse for MuxError {
    fn into_response(self) -> Response {
        (StatusCode::INTERNAL_SERVER_ERROR, self.to_string()).into_response()
    }
}
