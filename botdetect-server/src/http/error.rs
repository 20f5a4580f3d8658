//! API error types with IntoResponse
//!
//! Errors are converted to JSON responses with appropriate status codes.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use botdetect_core::{BatchRejection, ValidationError};
use serde_json::json;

use crate::db::DbError;
use crate::model::ModelError;
use crate::queue::QueueError;

/// API error type with automatic HTTP status mapping
#[derive(Debug)]
pub enum ApiError {
    /// Malformed or out-of-range input (422)
    Validation(ValidationError),

    /// Detection batch refused as a whole (400, `{"NOK":"NOK"}`)
    Rejected(BatchRejection),

    /// Request understood but not acceptable (400)
    BadRequest { message: String },

    /// Token missing, unknown or lacking the permission (401)
    Unauthorized,

    /// Resource not found (404)
    NotFound { resource: &'static str, id: String },

    /// Detection queue cannot take more work (503)
    Unavailable { message: String },

    /// Database error (500, logged)
    Database(DbError),

    /// Prediction backend failed (502, logged)
    Upstream { message: String },
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, body) = match &self {
            Self::Validation(e) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                json!({
                    "error": "validation_error",
                    "message": e.to_string()
                }),
            ),
            Self::Rejected(reason) => {
                tracing::warn!("Detection batch rejected: {}", reason);
                (StatusCode::BAD_REQUEST, json!({ "NOK": "NOK" }))
            }
            Self::BadRequest { message } => (
                StatusCode::BAD_REQUEST,
                json!({
                    "error": "bad_request",
                    "message": message
                }),
            ),
            Self::Unauthorized => (
                StatusCode::UNAUTHORIZED,
                json!({
                    "error": "unauthorized",
                    "message": "insufficient permissions"
                }),
            ),
            Self::NotFound { resource, id } => (
                StatusCode::NOT_FOUND,
                json!({
                    "error": "not_found",
                    "message": format!("{} '{}' not found", resource, id)
                }),
            ),
            Self::Unavailable { message } => (
                StatusCode::SERVICE_UNAVAILABLE,
                json!({
                    "error": "unavailable",
                    "message": message
                }),
            ),
            Self::Database(e) => {
                // Log the actual error, return generic message
                tracing::error!("Database error: {}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    json!({
                        "error": "internal_error",
                        "message": "an internal error occurred"
                    }),
                )
            }
            Self::Upstream { message } => {
                tracing::error!("Model error: {}", message);
                (
                    StatusCode::BAD_GATEWAY,
                    json!({
                        "error": "upstream_error",
                        "message": "prediction backend unavailable"
                    }),
                )
            }
        };

        (status, Json(body)).into_response()
    }
}

impl From<ValidationError> for ApiError {
    fn from(e: ValidationError) -> Self {
        Self::Validation(e)
    }
}

impl From<BatchRejection> for ApiError {
    fn from(e: BatchRejection) -> Self {
        Self::Rejected(e)
    }
}

impl From<DbError> for ApiError {
    fn from(e: DbError) -> Self {
        match e {
            DbError::NotFound { resource, id } => Self::NotFound { resource, id },
            _ => Self::Database(e),
        }
    }
}

impl From<QueueError> for ApiError {
    fn from(e: QueueError) -> Self {
        Self::Unavailable {
            message: e.to_string(),
        }
    }
}

impl From<ModelError> for ApiError {
    fn from(e: ModelError) -> Self {
        match e {
            ModelError::UnknownPlayer(name) => Self::NotFound {
                resource: "prediction",
                id: name,
            },
            ModelError::Database(e) => e.into(),
            other => Self::Upstream {
                message: other.to_string(),
            },
        }
    }
}
