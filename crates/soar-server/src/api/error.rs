//! Mapping of engine errors onto HTTP responses.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use soar_core::TaskError;
use thiserror::Error;

use crate::state::QueueError;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Task(#[from] TaskError),

    #[error("{0}")]
    BadRequest(String),

    #[error("fix queue is full")]
    QueueFull,

    #[error("calculation loop is not running")]
    Unavailable,
}

impl From<QueueError> for ApiError {
    fn from(err: QueueError) -> Self {
        match err {
            QueueError::Full => ApiError::QueueFull,
            QueueError::Closed => ApiError::Unavailable,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let message = self.to_string();
        match self {
            ApiError::Task(TaskError::Invalid(errors)) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                Json(json!({ "error": "task failed validation", "errors": errors })),
            )
                .into_response(),
            ApiError::Task(_) | ApiError::BadRequest(_) => {
                (StatusCode::BAD_REQUEST, Json(json!({ "error": message }))).into_response()
            }
            ApiError::QueueFull => (
                StatusCode::TOO_MANY_REQUESTS,
                Json(json!({ "error": message })),
            )
                .into_response(),
            ApiError::Unavailable => (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({ "error": message })),
            )
                .into_response(),
        }
    }
}
