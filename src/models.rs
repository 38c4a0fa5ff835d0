//! Core domain models for flowkeeper

use chrono::{DateTime, Utc};
use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};
use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Timestamp layout used in reports and on the console.
pub const REPORT_TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// A single purge invocation: where to look, what is too old, and whether to
/// touch the filesystem at all.
#[derive(Debug, Clone)]
pub struct RetentionJob {
    root_directory: PathBuf,
    cutoff: DateTime<Utc>,
    dry_run: bool,
}

impl RetentionJob {
    pub fn new(root_directory: impl Into<PathBuf>, cutoff: DateTime<Utc>, dry_run: bool) -> Self {
        Self {
            root_directory: root_directory.into(),
            cutoff,
            dry_run,
        }
    }

    pub fn root_directory(&self) -> &Path {
        &self.root_directory
    }

    /// Files modified strictly before this instant are eligible for deletion.
    pub fn cutoff(&self) -> DateTime<Utc> {
        self.cutoff
    }

    pub fn dry_run(&self) -> bool {
        self.dry_run
    }
}

/// Counters accumulated during one walk of the repository.
///
/// Under dry-run, `deleted` and `dirs_removed` count what a real run would
/// have removed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ScanSummary {
    /// Data files seen
    pub scanned: u64,
    /// Data files removed (or that would be removed)
    pub deleted: u64,
    /// Data files kept because they are not older than the cutoff
    pub retained: u64,
    /// Data files whose removal failed
    pub failed: u64,
    /// Empty directories removed (or that would be removed)
    pub dirs_removed: u64,
    /// Empty directories whose removal failed
    pub dirs_failed: u64,
    pub dry_run: bool,
}

impl ScanSummary {
    /// One-line human readable summary.
    pub fn summary(&self) -> String {
        if self.dry_run {
            format!(
                "[dry-run] scanned {} files: would delete {}, would retain {}; would remove {} empty directories",
                self.scanned, self.deleted, self.retained, self.dirs_removed
            )
        } else {
            format!(
                "scanned {} files: deleted {}, retained {}, failed {}; removed {} empty directories ({} failed)",
                self.scanned,
                self.deleted,
                self.retained,
                self.failed,
                self.dirs_removed,
                self.dirs_failed
            )
        }
    }
}

/// One sensor as reported by the repository metadata source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SensorRecord {
    pub organization: String,
    pub sensor_id: String,
    pub repo_start: Option<DateTime<Utc>>,
    pub repo_end: Option<DateTime<Utc>>,
}

/// Freshness class of a sensor repository
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Status {
    /// Latest data is within an hour of now
    Current,
    /// Latest data lags by more than an hour
    Warning,
    /// Repository has no data yet
    Empty,
}

impl Status {
    pub fn as_str(&self) -> &'static str {
        match self {
            Status::Current => "current",
            Status::Warning => "warning",
            Status::Empty => "empty",
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SensorStatus {
    pub status: Status,
    pub note: String,
}

/// A row of the status report, serialized with the document's key names.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatusEntry {
    pub org: String,
    #[serde(rename = "repo-start")]
    pub repo_start: String,
    #[serde(rename = "repo-end")]
    pub repo_end: String,
    pub status: Status,
    pub note: String,
}

impl StatusEntry {
    pub fn new(record: &SensorRecord, status: SensorStatus) -> Self {
        Self {
            org: record.organization.clone(),
            repo_start: format_report_time(record.repo_start),
            repo_end: format_report_time(record.repo_end),
            status: status.status,
            note: status.note,
        }
    }
}

/// Render an optional timestamp for the report; absent values become "".
pub fn format_report_time(ts: Option<DateTime<Utc>>) -> String {
    ts.map(|t| t.format(REPORT_TIME_FORMAT).to_string())
        .unwrap_or_default()
}

/// Status entries keyed by sensor id, in the order sensors were read.
///
/// Inserting an id that is already present replaces its entry in place.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StatusReport {
    entries: Vec<(String, StatusEntry)>,
    index: HashMap<String, usize>,
}

impl StatusReport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert an entry, returning the previous one if the sensor id repeats.
    pub fn insert(&mut self, sensor_id: String, entry: StatusEntry) -> Option<StatusEntry> {
        match self.index.get(&sensor_id) {
            Some(&pos) => Some(std::mem::replace(&mut self.entries[pos].1, entry)),
            None => {
                self.index.insert(sensor_id.clone(), self.entries.len());
                self.entries.push((sensor_id, entry));
                None
            }
        }
    }

    pub fn get(&self, sensor_id: &str) -> Option<&StatusEntry> {
        self.index.get(sensor_id).map(|&pos| &self.entries[pos].1)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &StatusEntry)> {
        self.entries.iter().map(|(id, entry)| (id.as_str(), entry))
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Serialize for StatusReport {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (sensor_id, entry) in &self.entries {
            map.serialize_entry(sensor_id, entry)?;
        }
        map.end()
    }
}

/// The last status report published for the HTTP service, kept verbatim so
/// sensor order is preserved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusDocument {
    pub body: Arc<str>,
    pub loaded_at: DateTime<Utc>,
}
