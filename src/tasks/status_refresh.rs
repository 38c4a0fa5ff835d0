//! Status refresh task - reloads the published status document from disk

use crate::error::{AppError, Result};
use crate::models::StatusDocument;
use crate::state::AppState;
use chrono::Utc;
use std::path::Path;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Read and validate a status document. It must be a JSON object keyed by
/// sensor id.
pub async fn load_document(path: &Path) -> Result<StatusDocument> {
    let body = tokio::fs::read_to_string(path)
        .await
        .map_err(|e| AppError::Internal(format!("cannot read {}: {}", path.display(), e)))?;

    let parsed: serde_json::Value = serde_json::from_str(&body)?;
    if !parsed.is_object() {
        return Err(AppError::Internal(format!(
            "{} is not a JSON object",
            path.display()
        )));
    }

    Ok(StatusDocument {
        body: body.into(),
        loaded_at: Utc::now(),
    })
}

/// Reload once; on failure the previously loaded document stays in place.
pub async fn refresh(state: &AppState) -> bool {
    match load_document(state.document_path()).await {
        Ok(document) => {
            let changed = state
                .document()
                .map_or(true, |current| current.body != document.body);
            if changed {
                info!(path = %state.document_path().display(), "Loaded status document");
            }
            state.set_document(document);
            true
        }
        Err(e) => {
            warn!(error = %e, "Failed to reload status document");
            false
        }
    }
}

/// Background task that periodically reloads the status document.
pub async fn status_refresh_task(state: AppState, every: Duration) {
    let mut interval = tokio::time::interval(every);

    info!(interval_secs = every.as_secs(), "Status refresh task started");

    loop {
        interval.tick().await;
        debug!("Refreshing status document");
        refresh(&state).await;
    }
}
