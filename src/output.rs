//! Console presentation of purge summaries and status reports

use crate::error::Result;
use crate::models::{Status, StatusReport};
use console::Style;

/// Presentation settings, fixed for the lifetime of a [`Console`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OutputConfig {
    /// Print per-item details
    pub verbose: bool,
    /// Suppress the human stream entirely
    pub silent: bool,
    /// Colorize status rows with ANSI escapes
    pub color: bool,
    /// Print the table header row
    pub headers: bool,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            verbose: false,
            silent: false,
            color: true,
            headers: true,
        }
    }
}

/// Human-facing output stream.
#[derive(Debug, Clone)]
pub struct Console {
    config: OutputConfig,
}

impl Console {
    pub fn new(config: OutputConfig) -> Self {
        Self { config }
    }

    pub fn say(&self, message: &str) {
        if !self.config.silent {
            println!("{}", message);
        }
    }

    pub fn detail(&self, message: &str) {
        if self.config.verbose && !self.config.silent {
            println!("{}", message);
        }
    }

    pub fn warn(&self, message: &str) {
        if !self.config.silent {
            eprintln!("{}", self.style(Status::Warning).apply_to(message));
        }
    }

    /// Fixed-width table, one row per sensor in report order.
    pub fn render_table(&self, report: &StatusReport) -> String {
        let mut out = String::new();
        if self.config.headers {
            out.push_str(&table_row(
                "org",
                "sensor",
                "repo-start",
                "repo-end",
                "status",
                "note",
            ));
            out.push('\n');
        }
        for (sensor_id, entry) in report.iter() {
            let row = table_row(
                &entry.org,
                sensor_id,
                &entry.repo_start,
                &entry.repo_end,
                entry.status.as_str(),
                &entry.note,
            );
            out.push_str(&self.style(entry.status).apply_to(row).to_string());
            out.push('\n');
        }
        out
    }

    /// JSON document keyed by sensor id.
    pub fn render_json(&self, report: &StatusReport) -> Result<String> {
        Ok(serde_json::to_string_pretty(report)?)
    }

    pub fn print_report(&self, report: &StatusReport, json: bool) -> Result<()> {
        if json {
            println!("{}", self.render_json(report)?);
        } else {
            print!("{}", self.render_table(report));
        }
        Ok(())
    }

    fn style(&self, status: Status) -> Style {
        let style = match status {
            Status::Current => Style::new().green(),
            Status::Warning => Style::new().yellow(),
            Status::Empty => Style::new(),
        };
        style.force_styling(self.config.color)
    }
}

fn table_row(org: &str, sensor: &str, start: &str, end: &str, status: &str, note: &str) -> String {
    format!(
        "{:<12} {:<12} {:<20} {:<20} {:<8} {}",
        org, sensor, start, end, status, note
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::SensorRecord;
    use crate::services::freshness::check_freshness;
    use chrono::{Duration, TimeZone, Utc};

    fn report() -> StatusReport {
        let now = Utc.with_ymd_and_hms(2024, 3, 10, 12, 0, 0).unwrap();
        let records = vec![
            SensorRecord {
                organization: "all".into(),
                sensor_id: "S0".into(),
                repo_start: Some(now - Duration::days(100)),
                repo_end: Some(now),
            },
            SensorRecord {
                organization: "all".into(),
                sensor_id: "S1".into(),
                repo_start: Some(now - Duration::days(100)),
                repo_end: Some(now - Duration::hours(2)),
            },
            SensorRecord {
                organization: "edge".into(),
                sensor_id: "S2".into(),
                repo_start: None,
                repo_end: None,
            },
        ];
        check_freshness(&records, now)
    }

    fn plain(headers: bool) -> Console {
        Console::new(OutputConfig {
            color: false,
            headers,
            ..OutputConfig::default()
        })
    }

    #[test]
    fn test_table_has_header_and_rows_in_order() {
        let table = plain(true).render_table(&report());
        let lines: Vec<&str> = table.lines().collect();
        assert_eq!(lines.len(), 4);
        assert!(lines[0].starts_with("org"));
        assert!(lines[1].contains("S0"));
        assert!(lines[2].contains("S1"));
        assert!(lines[3].contains("S2"));
        assert!(!table.contains('\u{1b}'));
    }

    #[test]
    fn test_table_without_header() {
        let table = plain(false).render_table(&report());
        assert_eq!(table.lines().count(), 3);
        assert!(table.starts_with("all"));
    }

    #[test]
    fn test_color_applies_only_when_enabled() {
        let colored = Console::new(OutputConfig::default()).render_table(&report());
        let lines: Vec<&str> = colored.lines().collect();
        assert!(lines[1].contains('\u{1b}'));
        assert!(lines[2].contains('\u{1b}'));
        assert!(!lines[3].contains('\u{1b}'));
    }

    #[test]
    fn test_json_and_table_agree() {
        let report = report();
        let console = plain(true);
        let table = console.render_table(&report);
        let json: serde_json::Value =
            serde_json::from_str(&console.render_json(&report).unwrap()).unwrap();

        for (sensor_id, entry) in report.iter() {
            let row = table
                .lines()
                .find(|line| line.split_whitespace().nth(1) == Some(sensor_id))
                .unwrap();
            assert!(row.contains(entry.status.as_str()));
            assert!(row.ends_with(&entry.note));
            assert_eq!(json[sensor_id]["status"], entry.status.as_str());
            assert_eq!(json[sensor_id]["note"], entry.note.as_str());
            assert_eq!(json[sensor_id]["org"], entry.org.as_str());
        }
        assert_eq!(json["S1"]["note"], "repo 2.0 h behind");
        assert_eq!(json["S2"]["repo-end"], "");
    }
}
