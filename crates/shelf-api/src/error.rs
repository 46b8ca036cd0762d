use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;
use tracing::error;

use shelf_core::CoreError;
use shelf_types::api::MessageResponse;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Core(#[from] CoreError),

    #[error("{0}")]
    Unauthorized(&'static str),

    /// The book catalog failed. The message is safe to show; the cause has
    /// already been logged.
    #[error("{0}")]
    Upstream(&'static str),
}

impl From<anyhow::Error> for ApiError {
    fn from(err: anyhow::Error) -> Self {
        Self::Core(CoreError::Internal(err))
    }
}

// Every failure becomes `{ "message": ... }` with a status the client can
// tell apart. Internal details are logged, never returned.
impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            Self::Core(CoreError::InvalidArgument(msg)) => (StatusCode::BAD_REQUEST, msg),
            Self::Core(CoreError::NotFound(msg)) => (StatusCode::NOT_FOUND, msg),
            Self::Core(CoreError::Forbidden(msg)) => (StatusCode::FORBIDDEN, msg),
            Self::Core(CoreError::Conflict(msg)) => (StatusCode::CONFLICT, msg),
            Self::Core(CoreError::Internal(err)) => {
                error!("Internal error: {:#}", err);
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error".to_string())
            }
            Self::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, msg.to_string()),
            Self::Upstream(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg.to_string()),
        };

        (status, Json(MessageResponse::new(message))).into_response()
    }
}
