//! Status document endpoint and error fallbacks

use axum::{
    extract::State,
    http::{header, Uri},
    response::{IntoResponse, Response},
};

use crate::error::{AppError, Result};
use crate::state::AppState;

/// GET /status
///
/// Returns the last-known status document, keyed by sensor id.
pub async fn get_status(State(state): State<AppState>) -> Result<Response> {
    let document = state
        .document()
        .ok_or_else(|| AppError::Internal("status document is not available".into()))?;

    Ok((
        [(header::CONTENT_TYPE, "application/json")],
        document.body.to_string(),
    )
        .into_response())
}

/// Fallback for unknown paths
pub async fn not_found(uri: Uri) -> AppError {
    AppError::NotFound(format!("no resource at {}", uri.path()))
}

/// Fallback for known paths hit with an unsupported method
pub async fn method_not_allowed() -> AppError {
    AppError::MethodNotAllowed
}
