//! Service configuration read from the environment

use crate::error::{AppError, Result};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

const DEFAULT_LISTEN_ADDR: &str = "0.0.0.0:8080";
const DEFAULT_STATUS_DOCUMENT: &str = "/var/lib/flowkeeper/status.json";
const DEFAULT_REFRESH_SECS: u64 = 60;

/// Settings of the status HTTP service
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServeConfig {
    pub listen_addr: SocketAddr,
    /// JSON document written by `flowkeeper check --output`
    pub status_document: PathBuf,
    pub refresh_interval: Duration,
}

impl ServeConfig {
    /// Read `LISTEN_ADDR`, `STATUS_DOCUMENT` and `STATUS_REFRESH_SECS`.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let listen_addr = lookup("LISTEN_ADDR")
            .unwrap_or_else(|| DEFAULT_LISTEN_ADDR.to_string())
            .parse::<SocketAddr>()
            .map_err(|e| AppError::Config(format!("invalid LISTEN_ADDR: {}", e)))?;

        let status_document = lookup("STATUS_DOCUMENT")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_STATUS_DOCUMENT));

        let refresh_secs = match lookup("STATUS_REFRESH_SECS") {
            Some(value) => value
                .parse::<u64>()
                .map_err(|e| AppError::Config(format!("invalid STATUS_REFRESH_SECS: {}", e)))?,
            None => DEFAULT_REFRESH_SECS,
        };
        if refresh_secs == 0 {
            return Err(AppError::Config(
                "STATUS_REFRESH_SECS must be at least 1".to_string(),
            ));
        }

        Ok(Self {
            listen_addr,
            status_document,
            refresh_interval: Duration::from_secs(refresh_secs),
        })
    }
}
