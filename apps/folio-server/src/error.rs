//! Error types for the Folio HTTP surface

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

use crate::session::{PageIdParseError, SessionError};

/// Application-wide result type
pub type Result<T> = std::result::Result<T, AppError>;

/// Application error type
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Internal error: {0}")]
    Internal(String),

    #[error(transparent)]
    PageId(#[from] PageIdParseError),

    #[error(transparent)]
    Session(#[from] SessionError),
}

impl AppError {
    pub fn document_not_found(id: u32) -> Self {
        AppError::NotFound(format!("Document {} is not open", id))
    }

    pub fn page_not_found(id: impl std::fmt::Display) -> Self {
        AppError::NotFound(format!("Page {} not found", id))
    }
}

/// Error response body
#[derive(Serialize)]
struct ErrorResponse {
    error: String,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<String>,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_type, message) = match &self {
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, "not_found", msg.clone()),
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "bad_request", msg.clone()),
            AppError::Internal(msg) => {
                tracing::error!("Internal error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal_error",
                    "An internal error occurred".to_string(),
                )
            }
            AppError::PageId(e) => (StatusCode::BAD_REQUEST, "invalid_page_id", e.to_string()),
            AppError::Session(e) => match e {
                SessionError::OpenFailed { .. } => (
                    StatusCode::UNPROCESSABLE_ENTITY,
                    "open_failed",
                    e.to_string(),
                ),
                SessionError::InvalidDpi(_) => {
                    (StatusCode::BAD_REQUEST, "bad_request", e.to_string())
                }
                SessionError::ReadFailed { .. } | SessionError::IdsExhausted => {
                    tracing::error!("Session error: {}", e);
                    (
                        StatusCode::INTERNAL_SERVER_ERROR,
                        "session_error",
                        "Failed to register document".to_string(),
                    )
                }
            },
        };

        let body = Json(ErrorResponse {
            error: error_type.to_string(),
            message,
            details: if cfg!(debug_assertions) {
                Some(self.to_string())
            } else {
                None
            },
        });

        (status, body).into_response()
    }
}
