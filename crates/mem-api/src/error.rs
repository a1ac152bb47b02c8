//! Maps backend faults to HTTP responses.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use mem_types::{MemoryError, MessageResponse};

/// Handler-level error. `context` names the failed operation, e.g.
/// "Error adding memory", and prefixes the message in the body.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("{context}: {source}")]
    Memory {
        context: &'static str,
        source: MemoryError,
    },
    #[error("{0}")]
    BadRequest(String),
}

impl ApiError {
    pub fn memory(context: &'static str) -> impl FnOnce(MemoryError) -> ApiError {
        move |source| ApiError::Memory { context, source }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Memory { source, .. } => match source {
                MemoryError::NotFound(_) => StatusCode::NOT_FOUND,
                MemoryError::InvalidInput(_) => StatusCode::BAD_REQUEST,
                MemoryError::BackendUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
                MemoryError::Config(_) | MemoryError::Other(_) => {
                    StatusCode::INTERNAL_SERVER_ERROR
                }
            },
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = self.to_string();
        if status.is_server_error() {
            tracing::error!(status = status.as_u16(), error = %message, "request failed");
        } else {
            tracing::warn!(status = status.as_u16(), error = %message, "request rejected");
        }
        (status, Json(MessageResponse::error(message))).into_response()
    }
}
