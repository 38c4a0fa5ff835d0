//! Retention engine - deletes aged flow files and prunes emptied directories

use crate::error::{AppError, Result};
use crate::models::{RetentionJob, ScanSummary};
use chrono::{DateTime, Duration, Local, LocalResult, NaiveDate, NaiveDateTime, NaiveTime, TimeZone, Utc};
use regex::Regex;
use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;
use tracing::{debug, info, warn};
use walkdir::{DirEntry, WalkDir};

/// Hourly flow files end in an 8-digit date and a 2-digit hour,
/// e.g. `in-S0_20230101.00`.
static DATA_FILE_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"_\d{8}\.?\d{2}$").unwrap());

/// How the retention cutoff is chosen.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetentionCriterion {
    /// Keep this many days of data, counted back from now
    Days(u32),
    /// Delete everything modified before this instant
    Before(DateTime<Utc>),
}

impl RetentionCriterion {
    /// Build the criterion from the two mutually exclusive CLI options.
    pub fn from_options(days: Option<u32>, before: Option<&str>) -> Result<Self> {
        match (days, before) {
            (Some(_), Some(_)) => Err(AppError::Config(
                "--days and --before are mutually exclusive".to_string(),
            )),
            (Some(days), None) => Ok(RetentionCriterion::Days(days)),
            (None, Some(ts)) => parse_cutoff(ts).map(RetentionCriterion::Before),
            (None, None) => Err(AppError::Config(
                "no retention criterion given; pass --days N or --before TIMESTAMP".to_string(),
            )),
        }
    }

    /// Resolve the cutoff instant relative to `now`.
    pub fn cutoff(&self, now: DateTime<Utc>) -> Result<DateTime<Utc>> {
        match self {
            RetentionCriterion::Days(days) => now
                .checked_sub_signed(Duration::days(i64::from(*days)))
                .ok_or_else(|| {
                    AppError::Config(format!("retention of {} days is out of range", days))
                }),
            RetentionCriterion::Before(ts) => Ok(*ts),
        }
    }
}

/// Parse `YYYY-MM-DD` or `YYYY-MM-DD HH:MM:SS` in the local time zone.
pub fn parse_cutoff(input: &str) -> Result<DateTime<Utc>> {
    let trimmed = input.trim();
    let naive = NaiveDateTime::parse_from_str(trimmed, "%Y-%m-%d %H:%M:%S")
        .or_else(|_| {
            NaiveDate::parse_from_str(trimmed, "%Y-%m-%d").map(|d| d.and_time(NaiveTime::MIN))
        })
        .map_err(|_| {
            AppError::Config(format!(
                "malformed timestamp {:?}; expected YYYY-MM-DD or YYYY-MM-DD HH:MM:SS",
                input
            ))
        })?;

    match Local.from_local_datetime(&naive) {
        LocalResult::Single(local) => Ok(local.with_timezone(&Utc)),
        _ => Err(AppError::Config(format!(
            "timestamp {:?} is ambiguous or does not exist in the local time zone",
            input
        ))),
    }
}

/// True when `name` follows the hourly flow file naming convention.
pub fn is_data_file(name: &str) -> bool {
    DATA_FILE_REGEX.is_match(name)
}

/// Check the repository root before anything is touched.
pub fn validate_root(root: &Path) -> Result<()> {
    let metadata = fs::metadata(root)
        .map_err(|e| AppError::InvalidRoot(format!("{}: {}", root.display(), e)))?;
    if !metadata.is_dir() {
        return Err(AppError::InvalidRoot(format!(
            "{} is not a directory",
            root.display()
        )));
    }
    fs::read_dir(root)
        .map_err(|e| AppError::InvalidRoot(format!("{}: {}", root.display(), e)))?;
    Ok(())
}

/// Run one retention sweep over the job's root directory.
///
/// The tree is listed depth-first, post-order, before anything is removed, so
/// each directory is examined only after all of its children were processed.
/// A directory goes away when none of its entries survived the sweep; the root
/// itself is never removed. Per-entry failures are logged and counted and never
/// abort the sweep.
pub fn purge(job: &RetentionJob) -> Result<ScanSummary> {
    let root = job.root_directory();
    validate_root(root)?;

    let cutoff = job.cutoff();
    let dry_run = job.dry_run();
    let mut summary = ScanSummary {
        dry_run,
        ..ScanSummary::default()
    };

    info!(
        root = %root.display(),
        cutoff = %cutoff,
        dry_run = dry_run,
        "Starting retention sweep"
    );

    let listing: Vec<walkdir::Result<DirEntry>> = WalkDir::new(root)
        .min_depth(1)
        .follow_links(false)
        .contents_first(true)
        .into_iter()
        .collect();

    let mut survivors = Survivors::default();

    for item in listing {
        let entry = match item {
            Ok(entry) => entry,
            Err(e) => {
                warn!(error = %e, "Skipping unreadable entry");
                match e.path() {
                    Some(path) => {
                        survivors.keep_within(path);
                        survivors.keep(path);
                    }
                    None => survivors.unreadable(e.depth()),
                }
                continue;
            }
        };

        let path = entry.path();
        let file_type = entry.file_type();

        let removed = if file_type.is_dir() {
            survivors.remaining(path, entry.depth()) == 0
                && remove_empty_dir(path, dry_run, &mut summary)
        } else if file_type.is_file() && entry.file_name().to_str().is_some_and(is_data_file) {
            sweep_file(&entry, cutoff, dry_run, &mut summary)
        } else {
            false
        };

        if !removed {
            survivors.keep(path);
        }
    }

    info!(
        scanned = summary.scanned,
        deleted = summary.deleted,
        retained = summary.retained,
        failed = summary.failed,
        dirs_removed = summary.dirs_removed,
        dirs_failed = summary.dirs_failed,
        dry_run = dry_run,
        "Retention sweep finished"
    );

    Ok(summary)
}

/// Number of entries that will still exist under each directory.
#[derive(Debug, Default)]
struct Survivors {
    counts: HashMap<PathBuf, u64>,
    /// Depths of read errors that carried no path. Such an error belongs to
    /// the directory being listed, which is the next shallower entry yielded.
    unattributed: Vec<usize>,
}

impl Survivors {
    /// `path` stays, so its parent stays too.
    fn keep(&mut self, path: &Path) {
        if let Some(parent) = path.parent() {
            self.keep_within(parent);
        }
    }

    fn keep_within(&mut self, dir: &Path) {
        *self.counts.entry(dir.to_path_buf()).or_default() += 1;
    }

    fn unreadable(&mut self, depth: usize) {
        self.unattributed.push(depth);
    }

    /// Surviving entries under `dir`, which the walk yields at `depth`.
    fn remaining(&mut self, dir: &Path, depth: usize) -> u64 {
        let pending = self.unattributed.len();
        self.unattributed.retain(|&d| d <= depth);
        if self.unattributed.len() < pending {
            self.keep_within(dir);
        }
        self.counts.get(dir).copied().unwrap_or(0)
    }
}

/// Returns true when the file is gone (or would be, under dry-run).
fn sweep_file(
    entry: &DirEntry,
    cutoff: DateTime<Utc>,
    dry_run: bool,
    summary: &mut ScanSummary,
) -> bool {
    summary.scanned += 1;
    let path = entry.path();

    let modified: DateTime<Utc> = match entry
        .metadata()
        .map_err(io::Error::from)
        .and_then(|m| m.modified())
    {
        Ok(time) => time.into(),
        Err(e) => {
            warn!(path = %path.display(), error = %e, "Cannot read modification time, keeping file");
            summary.retained += 1;
            return false;
        }
    };

    if modified >= cutoff {
        summary.retained += 1;
        debug!(path = %path.display(), modified = %modified, "Keeping file newer than cutoff");
        return false;
    }

    if dry_run {
        summary.deleted += 1;
        debug!(path = %path.display(), modified = %modified, "Would delete expired file");
        return true;
    }

    match fs::remove_file(path) {
        Ok(()) => {
            summary.deleted += 1;
            debug!(path = %path.display(), modified = %modified, "Deleted expired file");
            true
        }
        Err(e) => {
            summary.failed += 1;
            warn!(path = %path.display(), error = %e, "Failed to delete expired file");
            false
        }
    }
}

fn remove_empty_dir(path: &Path, dry_run: bool, summary: &mut ScanSummary) -> bool {
    if dry_run {
        summary.dirs_removed += 1;
        debug!(path = %path.display(), "Would remove empty directory");
        return true;
    }

    match fs::remove_dir(path) {
        Ok(()) => {
            summary.dirs_removed += 1;
            debug!(path = %path.display(), "Removed empty directory");
            true
        }
        Err(e) => {
            summary.dirs_failed += 1;
            warn!(path = %path.display(), error = %e, "Failed to remove empty directory");
            false
        }
    }
}
