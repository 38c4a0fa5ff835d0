//! Application state shared across handlers

use crate::models::StatusDocument;
use parking_lot::RwLock;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    /// Last successfully loaded status document
    document: Arc<RwLock<Option<StatusDocument>>>,
    /// Where the status document is reloaded from
    document_path: Arc<PathBuf>,
}

impl AppState {
    pub fn new(document_path: impl Into<PathBuf>) -> Self {
        Self {
            document: Arc::new(RwLock::new(None)),
            document_path: Arc::new(document_path.into()),
        }
    }

    pub fn document_path(&self) -> &Path {
        &self.document_path
    }

    pub fn document(&self) -> Option<StatusDocument> {
        self.document.read().clone()
    }

    pub fn set_document(&self, document: StatusDocument) {
        *self.document.write() = Some(document);
    }
}
