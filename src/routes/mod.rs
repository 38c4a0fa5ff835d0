//! HTTP routes of the status service

pub mod health;
pub mod status;

use axum::{routing::get, Router};
use tower_http::trace::TraceLayer;

use crate::state::AppState;

/// Build the read-only status router.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route(
            "/status",
            get(status::get_status).fallback(status::method_not_allowed),
        )
        .route(
            "/health",
            get(health::health).fallback(status::method_not_allowed),
        )
        .route(
            "/ready",
            get(health::ready).fallback(status::method_not_allowed),
        )
        .fallback(status::not_found)
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}
