//! Subcommand drivers: wire resolvers and sources into the core and print results

use crate::cli::{CheckArgs, PurgeArgs};
use crate::error::Result;
use crate::models::{RetentionJob, ScanSummary, StatusReport};
use crate::output::Console;
use crate::services::freshness::check_freshness;
use crate::services::metadata::{CsvFileSource, SensorSource, SiteInfoCommand};
use crate::services::resolver::RootResolver;
use crate::services::retention::{self, RetentionCriterion};
use chrono::Utc;
use std::fs;
use std::path::Path;
use tracing::info;

/// Run a retention sweep. Misconfiguration is reported before the root is
/// resolved or anything is touched.
pub fn run_purge(args: &PurgeArgs, console: &Console) -> Result<ScanSummary> {
    let criterion = RetentionCriterion::from_options(args.days, args.before.as_deref())?;

    let root = match &args.root_dir {
        Some(root) => root.clone(),
        None => RootResolver::default().resolve()?,
    };

    let job = RetentionJob::new(root, criterion.cutoff(Utc::now())?, args.dry_run);
    console.detail(&format!(
        "Sweeping {} for files older than {}",
        job.root_directory().display(),
        job.cutoff().with_timezone(&chrono::Local).format("%Y-%m-%d %H:%M:%S")
    ));

    let summary = retention::purge(&job)?;

    console.say(&summary.summary());
    if summary.failed > 0 || summary.dirs_failed > 0 {
        console.warn(&format!(
            "{} files and {} directories could not be removed; see the log for details",
            summary.failed, summary.dirs_failed
        ));
    }
    Ok(summary)
}

/// Query sensor metadata, classify it and print the report.
pub fn run_check(args: &CheckArgs, console: &Console) -> Result<StatusReport> {
    let source: Box<dyn SensorSource> = match &args.from_file {
        Some(path) => Box::new(CsvFileSource::new(path)),
        None => Box::new(SiteInfoCommand::new(&args.siteinfo)),
    };

    let records = source.fetch_sensors()?;
    let report = check_freshness(&records, Utc::now());
    info!(sensors = report.len(), "Freshness check complete");

    if let Some(path) = &args.output {
        publish_document(path, &console.render_json(&report)?)?;
    }
    console.print_report(&report, args.json)?;
    Ok(report)
}

/// Replace the published status document atomically.
pub fn publish_document(path: &Path, json: &str) -> Result<()> {
    let staging = path.with_extension("json.tmp");
    fs::write(&staging, json)?;
    fs::rename(&staging, path)?;
    info!(path = %path.display(), "Published status document");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AppError;
    use crate::models::Status;
    use crate::output::OutputConfig;
    use std::fs::File;
    use std::time::{Duration, SystemTime};
    use tempfile::TempDir;

    fn quiet() -> Console {
        Console::new(OutputConfig {
            silent: true,
            color: false,
            ..OutputConfig::default()
        })
    }

    fn check_args(from_file: &Path, output: Option<&Path>) -> CheckArgs {
        CheckArgs {
            json: true,
            no_header: false,
            monochrome: true,
            siteinfo: "rwsiteinfo".to_string(),
            from_file: Some(from_file.to_path_buf()),
            output: output.map(Path::to_path_buf),
        }
    }

    #[test]
    fn test_purge_without_criterion_fails_before_resolution() {
        let err = run_purge(&PurgeArgs::default(), &quiet()).unwrap_err();
        assert!(matches!(err, AppError::Config(_)));
    }

    #[test]
    fn test_purge_with_both_criteria_is_rejected() {
        let args = PurgeArgs {
            days: Some(30),
            before: Some("2023-01-01".to_string()),
            ..PurgeArgs::default()
        };
        assert!(matches!(
            run_purge(&args, &quiet()),
            Err(AppError::Config(_))
        ));
    }

    #[test]
    fn test_purge_with_explicit_root() {
        let tmp = TempDir::new().unwrap();
        let sensor = tmp.path().join("sensorB");
        std::fs::create_dir(&sensor).unwrap();
        let file = File::create(sensor.join("flow_20230101.00")).unwrap();
        file.set_modified(SystemTime::now() - Duration::from_secs(40 * 86_400))
            .unwrap();

        let args = PurgeArgs {
            root_dir: Some(tmp.path().to_path_buf()),
            days: Some(30),
            ..PurgeArgs::default()
        };
        let summary = run_purge(&args, &quiet()).unwrap();

        assert_eq!(summary.deleted, 1);
        assert_eq!(summary.dirs_removed, 1);
        assert!(!sensor.exists());
        assert!(tmp.path().exists());
    }

    #[test]
    fn test_check_from_file_publishes_document() {
        let tmp = TempDir::new().unwrap();
        let listing = tmp.path().join("sensors.csv");
        let published = tmp.path().join("status.json");
        std::fs::write(&listing, "all,S1,,\nall,S0,2023-01-01 00:00:00,2023-01-02 00:00:00\n")
            .unwrap();

        let report = run_check(&check_args(&listing, Some(published.as_path())), &quiet()).unwrap();

        assert_eq!(report.get("S1").unwrap().status, Status::Empty);
        assert_eq!(report.get("S0").unwrap().status, Status::Warning);

        let document = std::fs::read_to_string(&published).unwrap();
        assert!(document.find("\"S1\"").unwrap() < document.find("\"S0\"").unwrap());
        assert!(document.contains("uninitialized repo"));
        assert!(!tmp.path().join("status.json.tmp").exists());
    }

    #[test]
    fn test_check_missing_listing_is_metadata_error() {
        let tmp = TempDir::new().unwrap();
        let args = check_args(&tmp.path().join("absent.csv"), None);
        assert!(matches!(
            run_check(&args, &quiet()),
            Err(AppError::Metadata(_))
        ));
    }
}
