//! Application error types and handling

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

/// Application error types
#[derive(Debug, Error)]
pub enum AppError {
    /// Invalid or contradictory user input (flags, timestamps, environment)
    #[error("Configuration error: {0}")]
    Config(String),

    /// The repository root could not be determined
    #[error("Cannot resolve repository root: {0}")]
    Resolution(String),

    /// The repository root is missing, not a directory or unreadable
    #[error("Invalid repository root: {0}")]
    InvalidRoot(String),

    /// A required external command is not installed
    #[error("Missing dependency: {0}")]
    DependencyMissing(String),

    /// The metadata source failed or produced unusable output
    #[error("Metadata error: {0}")]
    Metadata(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Method not allowed")]
    MethodNotAllowed,

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result type alias using AppError
pub type Result<T> = std::result::Result<T, AppError>;

impl AppError {
    /// True for errors caused by how the tool was invoked rather than by the
    /// environment it runs in.
    pub fn is_misconfiguration(&self) -> bool {
        matches!(self, AppError::Config(_))
    }

    /// Process exit code for a fatal error.
    pub fn exit_code(&self) -> u8 {
        if self.is_misconfiguration() {
            2
        } else {
            1
        }
    }

    fn status_code(&self) -> StatusCode {
        match self {
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::MethodNotAllowed => StatusCode::METHOD_NOT_ALLOWED,
            AppError::Config(_) => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let message = match &self {
            AppError::NotFound(msg) => msg.clone(),
            AppError::Internal(msg) => msg.clone(),
            other => other.to_string(),
        };

        let body = Json(json!({
            "error": {
                "code": status.as_u16(),
                "message": message,
            }
        }));

        (status, body).into_response()
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::Internal(err.to_string())
    }
}
