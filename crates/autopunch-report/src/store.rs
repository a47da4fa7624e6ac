use crate::{Error, Result};
use autopunch_core::{ActionOutcome, Reporter};
use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

/// Timestamps are stored already rendered in the configured timezone.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// One line in the daily report.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PunchRecord {
    /// "punch-in" or "punch-out".
    pub action: String,
    pub succeeded: bool,
    /// Local time, [`TIMESTAMP_FORMAT`].
    pub timestamp: String,
    pub employee: String,
    /// The locator that won the fallback chain.
    pub locator: Option<String>,
    pub failure_reason: Option<String>,
}

impl PunchRecord {
    pub fn from_outcome(outcome: &ActionOutcome, employee: &str) -> Self {
        Self {
            action: outcome.action.slug().to_string(),
            succeeded: outcome.succeeded,
            timestamp: outcome.timestamp.format(TIMESTAMP_FORMAT).to_string(),
            employee: employee.to_string(),
            locator: outcome.locator_used.as_ref().map(|l| l.to_string()),
            failure_reason: outcome.failure_reason.as_ref().map(|r| r.to_string()),
        }
    }

    fn parsed_at(&self) -> Result<NaiveDateTime> {
        Ok(NaiveDateTime::parse_from_str(
            &self.timestamp,
            TIMESTAMP_FORMAT,
        )?)
    }

    /// Rendering used in the plain-text punch log and in report mail.
    pub fn log_line(&self) -> String {
        let status = if self.succeeded { "OK" } else { "FAILED" };
        match self.failure_reason {
            Some(ref reason) => {
                format!(
                    "[{}] {} {} ({}): {}",
                    self.timestamp, self.action, status, self.employee, reason
                )
            }
            None => format!(
                "[{}] {} {} ({})",
                self.timestamp, self.action, status, self.employee
            ),
        }
    }
}

/// Daily files under one directory: `autopunch-report-{date}.json` holding
/// the day's records as a JSON array, and `punch_log_{date}.txt` as an
/// append-only text log.
#[derive(Debug, Clone)]
pub struct ReportStore {
    dir: PathBuf,
}

impl ReportStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn report_path(&self, date: NaiveDate) -> PathBuf {
        self.dir.join(format!("autopunch-report-{date}.json"))
    }

    fn log_path(&self, date: NaiveDate) -> PathBuf {
        self.dir.join(format!("punch_log_{date}.txt"))
    }

    /// Append one record to the day's report and punch log.
    pub fn append(&self, record: &PunchRecord) -> Result<()> {
        let date = record.parsed_at()?.date();
        fs::create_dir_all(&self.dir)?;

        let mut records = self.day(date)?;
        records.push(record.clone());
        let path = self.report_path(date);
        fs::write(&path, serde_json::to_string_pretty(&records)?)?;

        append_line(&self.log_path(date), &record.log_line())?;
        info!("recorded {} in {}", record.action, path.display());
        Ok(())
    }

    /// All records for one day, oldest first. A missing file is an empty day.
    pub fn day(&self, date: NaiveDate) -> Result<Vec<PunchRecord>> {
        let path = self.report_path(date);
        if !path.exists() {
            return Ok(Vec::new());
        }
        let content = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }

    /// The last `limit` lines of the day's punch log.
    pub fn log_lines(&self, date: NaiveDate, limit: usize) -> Result<Vec<String>> {
        let path = self.log_path(date);
        if !path.exists() {
            return Ok(Vec::new());
        }
        let content = fs::read_to_string(path)?;
        let lines: Vec<String> = content.lines().map(String::from).collect();
        let skip = lines.len().saturating_sub(limit);
        Ok(lines[skip..].to_vec())
    }

    /// First successful record for an action, in stored order.
    pub fn first_success<'a>(records: &'a [PunchRecord], action: &str) -> Option<&'a PunchRecord> {
        records.iter().find(|r| r.succeeded && r.action == action)
    }

    /// Hours and minutes between the first successful punch-in and the first
    /// successful punch-out of the day.
    pub fn worked_time(records: &[PunchRecord]) -> Option<(i64, i64)> {
        let first = |action: &str| Self::first_success(records, action)?.parsed_at().ok();
        let punch_in = first("punch-in")?;
        let punch_out = first("punch-out")?;
        let minutes = (punch_out - punch_in).num_minutes();
        if minutes < 0 {
            return None;
        }
        Some((minutes / 60, minutes % 60))
    }
}

fn append_line(path: &Path, line: &str) -> Result<()> {
    use std::io::Write;
    let mut file = fs::OpenOptions::new().create(true).append(true).open(path)?;
    writeln!(file, "{line}")?;
    Ok(())
}

/// [`Reporter`] writing into a [`ReportStore`].
pub struct FileReporter {
    store: ReportStore,
    employee: String,
}

impl FileReporter {
    pub fn new(store: ReportStore, employee: impl Into<String>) -> Self {
        Self {
            store,
            employee: employee.into(),
        }
    }
}

impl Reporter for FileReporter {
    fn record(&self, outcome: &ActionOutcome) -> autopunch_core::Result<()> {
        let record = PunchRecord::from_outcome(outcome, &self.employee);
        self.store
            .append(&record)
            .map_err(|e| autopunch_core::Error::Report(e.to_string()))
    }
}
