// src/error.rs

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use std::fmt;
use thiserror::Error;

/// Errors produced by the comment core (service and store).
#[derive(Debug, Error)]
pub enum CommentError {
    /// Content failed the non-empty check.
    #[error("comment content cannot be empty")]
    EmptyContent,

    /// The referenced parent does not exist.
    #[error("invalid parent comment: {0}")]
    InvalidParent(i64),

    #[error("comment not found: {0}")]
    NotFound(i64),

    /// Any other storage failure, wrapped with the operation that hit it.
    #[error("failed to {context}: {source}")]
    Store {
        context: &'static str,
        #[source]
        source: sqlx::Error,
    },
}

impl CommentError {
    pub fn store(context: &'static str) -> impl FnOnce(sqlx::Error) -> Self {
        move |source| CommentError::Store { context, source }
    }
}

pub type CommentResult<T> = Result<T, CommentError>;

/// Global Application Error Enum.
/// Centralizes error handling and mapping to HTTP responses.
#[derive(Debug)]
pub enum AppError {
    // 500 Internal Server Error
    InternalServerError(String),

    // 400 Bad Request
    BadRequest(String),

    // 404 Not Found
    NotFound(String),
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

impl std::error::Error for AppError {}

/// Implements `IntoResponse` for `AppError`.
/// Converts the error into a JSON response with appropriate HTTP status code.
impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_message) = match self {
            AppError::InternalServerError(msg) => {
                tracing::error!("Internal Server Error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal Server Error".to_string(),
                )
            }
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
        };
        let body = Json(json!({
            "error": error_message,
        }));

        (status, body).into_response()
    }
}

/// Maps the core taxonomy onto HTTP statuses.
impl From<CommentError> for AppError {
    fn from(err: CommentError) -> Self {
        match err {
            CommentError::EmptyContent | CommentError::InvalidParent(_) => {
                AppError::BadRequest(err.to_string())
            }
            CommentError::NotFound(_) => AppError::NotFound(err.to_string()),
            CommentError::Store { .. } => AppError::InternalServerError(err.to_string()),
        }
    }
}

impl From<validator::ValidationErrors> for AppError {
    fn from(err: validator::ValidationErrors) -> Self {
        AppError::BadRequest(err.to_string())
    }
}
