//! API error handling: the error taxonomy of spec.md §7 mapped onto the
//! error envelope of §6.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use nanopore_workflow_engine::OrchestrationError;
use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("validation error: {0}")]
    Validation(Vec<String>),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("backend unavailable: {0}")]
    TransientBackend(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl From<OrchestrationError> for ApiError {
    fn from(err: OrchestrationError) -> Self {
        match err {
            OrchestrationError::ValidationError(msg) => ApiError::Validation(vec![msg]),
            OrchestrationError::NotFound(msg) => ApiError::NotFound(msg),
            OrchestrationError::Conflict(msg) => ApiError::Conflict(msg),
            OrchestrationError::TransientBackend(msg) => ApiError::TransientBackend(msg),
            // WorkerError and InvariantViolation never cross the HTTP boundary
            // (spec.md §7); reaching here means a handler misused them.
            OrchestrationError::WorkerError(msg) | OrchestrationError::InvariantViolation(msg) => {
                ApiError::Internal(msg)
            }
        }
    }
}

/// Error envelope, spec.md §6: `{success: false, message, errors?}`.
#[derive(Serialize)]
struct ErrorEnvelope {
    success: bool,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    errors: Option<Vec<String>>,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message, errors) = match self {
            ApiError::Validation(errors) => {
                (StatusCode::BAD_REQUEST, "validation failed".to_string(), Some(errors))
            }
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg, None),
            ApiError::Conflict(msg) => (StatusCode::CONFLICT, msg, None),
            ApiError::TransientBackend(msg) => (StatusCode::SERVICE_UNAVAILABLE, msg, None),
            ApiError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg, None),
        };

        let body = Json(ErrorEnvelope { success: false, message, errors });
        (status, body).into_response()
    }
}

/// Success envelope, spec.md §6: `{success: true, data, message?}`.
#[derive(Serialize)]
pub struct SuccessEnvelope<T: Serialize> {
    success: bool,
    data: T,
    #[serde(skip_serializing_if = "Option::is_none")]
    message: Option<String>,
}

impl<T: Serialize> SuccessEnvelope<T> {
    pub fn new(data: T) -> Self {
        Self { success: true, data, message: None }
    }

    #[must_use]
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }
}

impl<T: Serialize> IntoResponse for SuccessEnvelope<T> {
    fn into_response(self) -> Response {
        Json(self).into_response()
    }
}
