//! Sensor metadata sources

use crate::error::{AppError, Result};
use crate::models::SensorRecord;
use chrono::{DateTime, NaiveDateTime, Utc};
use std::fs;
use std::io;
use std::path::PathBuf;
use std::process::Command;
use tracing::debug;

/// Program queried for repository metadata when none is configured.
pub const DEFAULT_SITEINFO: &str = "rwsiteinfo";

const SITEINFO_ARGS: &[&str] = &[
    "--fields=class,sensor,repo-start-date,repo-end-date",
    "--no-titles",
    "--delimited=,",
    "--timestamp-format=iso",
];

const NAIVE_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y/%m/%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
];

/// Anything that can list the sensors of a repository.
pub trait SensorSource {
    fn fetch_sensors(&self) -> Result<Vec<SensorRecord>>;
}

/// Queries the SiLK site configuration through `rwsiteinfo`.
#[derive(Debug, Clone)]
pub struct SiteInfoCommand {
    program: String,
}

impl SiteInfoCommand {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }
}

impl Default for SiteInfoCommand {
    fn default() -> Self {
        Self::new(DEFAULT_SITEINFO)
    }
}

impl SensorSource for SiteInfoCommand {
    fn fetch_sensors(&self) -> Result<Vec<SensorRecord>> {
        debug!(program = %self.program, "Querying repository metadata");

        let output = Command::new(&self.program)
            .args(SITEINFO_ARGS)
            .output()
            .map_err(|e| match e.kind() {
                io::ErrorKind::NotFound => AppError::DependencyMissing(format!(
                    "{} not found in PATH; is SiLK installed?",
                    self.program
                )),
                _ => AppError::Metadata(format!("failed to run {}: {}", self.program, e)),
            })?;

        if !output.status.success() {
            return Err(AppError::Metadata(format!(
                "{} exited with {}: {}",
                self.program,
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }

        let stdout = String::from_utf8(output.stdout).map_err(|e| {
            AppError::Metadata(format!("{} produced non UTF-8 output: {}", self.program, e))
        })?;
        parse_sensor_listing(&stdout)
    }
}

/// Reads previously exported metadata records from a file.
#[derive(Debug, Clone)]
pub struct CsvFileSource {
    path: PathBuf,
}

impl CsvFileSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl SensorSource for CsvFileSource {
    fn fetch_sensors(&self) -> Result<Vec<SensorRecord>> {
        let contents = fs::read_to_string(&self.path).map_err(|e| {
            AppError::Metadata(format!("cannot read {}: {}", self.path.display(), e))
        })?;
        parse_sensor_listing(&contents)
    }
}

/// Parse every record of a listing; any malformed line fails the whole listing.
pub fn parse_sensor_listing(listing: &str) -> Result<Vec<SensorRecord>> {
    let mut records = Vec::new();
    for (number, line) in listing.lines().enumerate() {
        match parse_sensor_line(line) {
            Ok(Some(record)) => records.push(record),
            Ok(None) => {}
            Err(e) => {
                return Err(AppError::Metadata(format!("line {}: {}", number + 1, e)));
            }
        }
    }
    Ok(records)
}

/// Parse `org,sensor,repo-start,repo-end` (comma or pipe delimited).
///
/// Blank lines and `#` comments yield `None`.
pub fn parse_sensor_line(line: &str) -> std::result::Result<Option<SensorRecord>, String> {
    let trimmed = line.trim();
    if trimmed.is_empty() || trimmed.starts_with('#') {
        return Ok(None);
    }

    let delimiter = if trimmed.contains(',') { ',' } else { '|' };
    let mut fields: Vec<&str> = trimmed.split(delimiter).map(str::trim).collect();
    // rwsiteinfo terminates delimited rows with the delimiter
    if fields.len() == 5 && fields[4].is_empty() {
        fields.pop();
    }
    if fields.len() != 4 {
        return Err(format!("expected 4 fields, found {}", fields.len()));
    }
    if fields[1].is_empty() {
        return Err("missing sensor id".to_string());
    }

    Ok(Some(SensorRecord {
        organization: fields[0].to_string(),
        sensor_id: fields[1].to_string(),
        repo_start: parse_repo_timestamp(fields[2])?,
        repo_end: parse_repo_timestamp(fields[3])?,
    }))
}

/// Parse a repository timestamp; an empty field means "no data".
///
/// Timestamps without an offset are UTC.
pub fn parse_repo_timestamp(value: &str) -> std::result::Result<Option<DateTime<Utc>>, String> {
    let value = value.trim();
    if value.is_empty() {
        return Ok(None);
    }
    if let Ok(ts) = DateTime::parse_from_rfc3339(value) {
        return Ok(Some(ts.with_timezone(&Utc)));
    }
    NAIVE_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(value, format).ok())
        .map(|naive| Some(naive.and_utc()))
        .ok_or_else(|| format!("unrecognized timestamp {:?}", value))
}
