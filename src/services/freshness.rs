//! Repository freshness checker

use crate::models::{SensorRecord, SensorStatus, Status, StatusEntry, StatusReport};
use chrono::{DateTime, TimeDelta, Utc};
use tracing::warn;

/// Maximum lag, in seconds, before a repository is reported as behind.
pub const MAX_LAG_SECS: i64 = 60 * 60;

/// Classify one sensor against `now`.
pub fn classify(record: &SensorRecord, now: DateTime<Utc>) -> SensorStatus {
    let Some(repo_end) = record.repo_end else {
        return SensorStatus {
            status: Status::Empty,
            note: "uninitialized repo".to_string(),
        };
    };

    let lag = (now - repo_end).abs();
    if lag > TimeDelta::seconds(MAX_LAG_SECS) {
        SensorStatus {
            status: Status::Warning,
            note: format!("repo {:.1} h behind", lag.num_milliseconds() as f64 / 3_600_000.0),
        }
    } else {
        SensorStatus {
            status: Status::Current,
            note: "repo is up to date".to_string(),
        }
    }
}

/// Build the status report for `records`, preserving their order.
///
/// A sensor id that appears more than once keeps its first position and its
/// last record.
pub fn check_freshness(records: &[SensorRecord], now: DateTime<Utc>) -> StatusReport {
    let mut report = StatusReport::new();
    for record in records {
        let entry = StatusEntry::new(record, classify(record, now));
        if report.insert(record.sensor_id.clone(), entry).is_some() {
            warn!(sensor = %record.sensor_id, "Duplicate sensor id, keeping the last record");
        }
    }
    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 10, 12, 0, 0).unwrap()
    }

    fn record(sensor_id: &str, repo_end: Option<DateTime<Utc>>) -> SensorRecord {
        SensorRecord {
            organization: "acme".to_string(),
            sensor_id: sensor_id.to_string(),
            repo_start: Some(Utc.with_ymd_and_hms(2020, 1, 1, 0, 0, 0).unwrap()),
            repo_end,
        }
    }

    #[test]
    fn test_up_to_date_repo_is_current() {
        let status = classify(&record("S0", Some(now())), now());
        assert_eq!(status.status, Status::Current);
        assert_eq!(status.note, "repo is up to date");
    }

    #[test]
    fn test_exactly_one_hour_is_still_current() {
        let status = classify(&record("S0", Some(now() - Duration::hours(1))), now());
        assert_eq!(status.status, Status::Current);
    }

    #[test]
    fn test_just_over_one_hour_is_warning() {
        let lag = Duration::hours(1) + Duration::milliseconds(700);
        let status = classify(&record("S0", Some(now() - lag)), now());
        assert_eq!(status.status, Status::Warning);
        assert_eq!(status.note, "repo 1.0 h behind");
    }

    #[test]
    fn test_two_hours_behind_is_warning() {
        let status = classify(&record("S0", Some(now() - Duration::hours(2))), now());
        assert_eq!(status.status, Status::Warning);
        assert!(status.note.contains("2.0 h behind"));
    }

    #[test]
    fn test_lag_is_rounded_to_one_decimal() {
        let lag = Duration::minutes(90) + Duration::seconds(10);
        let status = classify(&record("S0", Some(now() - lag)), now());
        assert_eq!(status.note, "repo 1.5 h behind");
    }

    #[test]
    fn test_repo_end_in_future_counts_as_drift() {
        let status = classify(&record("S0", Some(now() + Duration::hours(3))), now());
        assert_eq!(status.status, Status::Warning);
        assert_eq!(status.note, "repo 3.0 h behind");
    }

    #[test]
    fn test_missing_repo_end_is_empty() {
        let status = classify(&record("S0", None), now());
        assert_eq!(status.status, Status::Empty);
        assert_eq!(status.note, "uninitialized repo");
    }

    #[test]
    fn test_report_preserves_input_order() {
        let records = vec![
            record("S9", Some(now())),
            record("S1", None),
            record("S5", Some(now() - Duration::hours(5))),
        ];
        let report = check_freshness(&records, now());

        let ids: Vec<&str> = report.iter().map(|(id, _)| id).collect();
        assert_eq!(ids, vec!["S9", "S1", "S5"]);
        assert_eq!(report.get("S5").unwrap().status, Status::Warning);
        assert_eq!(report.get("S1").unwrap().repo_end, "");
        assert_eq!(report.get("S9").unwrap().repo_start, "2020-01-01 00:00:00");
    }

    #[test]
    fn test_duplicate_sensor_keeps_last_record() {
        let records = vec![
            record("S0", None),
            record("S1", Some(now())),
            record("S0", Some(now())),
        ];
        let report = check_freshness(&records, now());

        assert_eq!(report.len(), 2);
        assert_eq!(report.iter().next().unwrap().0, "S0");
        assert_eq!(report.get("S0").unwrap().status, Status::Current);
    }
}
