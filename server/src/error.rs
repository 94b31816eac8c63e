//! Translation of service errors into HTTP responses.
//!
//! Input mistakes map to 4xx with the service's message. Storage and
//! runtime failures map to 500 with a generic message; the details go to
//! the log only.

use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use todo_core::{ErrorKind, TodoError, ValidationError};

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error(transparent)]
    Todo(#[from] TodoError),

    #[error(transparent)]
    Json(#[from] JsonRejection),

    #[error("blocking task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

impl From<ValidationError> for ApiError {
    fn from(err: ValidationError) -> Self {
        ApiError::Todo(err.into())
    }
}

/// Body of every error response.
#[derive(Debug, Serialize)]
struct ErrorBody {
    error: &'static str,
    message: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error, message) = match &self {
            ApiError::Todo(err) => match err.kind() {
                ErrorKind::Validation | ErrorKind::InvalidArgument => {
                    (StatusCode::BAD_REQUEST, err.kind().as_str(), err.to_string())
                }
                ErrorKind::NotFound => {
                    (StatusCode::NOT_FOUND, err.kind().as_str(), err.to_string())
                }
                ErrorKind::Storage => {
                    tracing::error!(error = ?err, "storage failure");
                    (
                        StatusCode::INTERNAL_SERVER_ERROR,
                        err.kind().as_str(),
                        "storage is unavailable, try again later".to_string(),
                    )
                }
            },
            ApiError::Json(rejection) => {
                (StatusCode::BAD_REQUEST, "invalid_json", rejection.body_text())
            }
            ApiError::Join(err) => {
                tracing::error!(error = %err, "request task failed");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal_error",
                    "internal server error".to_string(),
                )
            }
        };
        (status, Json(ErrorBody { error, message })).into_response()
    }
}
