// CSV export of the full entry collection, and the reader for files it produced.
//
// Every cell is quoted (empty values become ""), embedded quotes are doubled.
// Timestamps are written as RFC 3339 UTC with millisecond precision.

use crate::modules::work_logs::core::entry::{EntryDraft, LogEntry};
use chrono::{DateTime, NaiveDate, SecondsFormat, Utc};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use thiserror::Error;

pub const CSV_HEADER: [&str; 5] = [
    "personName",
    "jobName",
    "description",
    "timestamp",
    "durationHours",
];

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("csv error: {0}")]
    Csv(#[from] ::csv::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("export is not valid UTF-8: {0}")]
    Encoding(#[from] std::string::FromUtf8Error),
}

/// One row of an export, as read back.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CsvRecord {
    pub person_name: Option<String>,
    pub job_name: String,
    pub description: Option<String>,
    pub timestamp: DateTime<Utc>,
    pub duration_hours: f64,
}

impl CsvRecord {
    pub fn into_draft(self) -> EntryDraft {
        EntryDraft {
            person_name: self.person_name,
            job_name: self.job_name,
            description: self.description,
            timestamp: self.timestamp,
            duration_hours: self.duration_hours,
        }
    }
}

pub fn export_csv(entries: &[LogEntry]) -> Result<String, ExportError> {
    let mut writer = ::csv::WriterBuilder::new()
        .quote_style(::csv::QuoteStyle::Always)
        .from_writer(Vec::new());

    writer.write_record(CSV_HEADER)?;
    for entry in entries {
        let timestamp = entry.timestamp.to_rfc3339_opts(SecondsFormat::Millis, true);
        let duration = entry.duration_hours.to_string();
        writer.write_record([
            entry.person_name.as_deref().unwrap_or_default(),
            entry.job_name.as_str(),
            entry.description.as_deref().unwrap_or_default(),
            timestamp.as_str(),
            duration.as_str(),
        ])?;
    }

    let bytes = writer.into_inner().map_err(|e| e.into_error())?;
    Ok(String::from_utf8(bytes)?)
}

pub fn parse_csv(input: &str) -> Result<Vec<CsvRecord>, ExportError> {
    let mut reader = ::csv::ReaderBuilder::new()
        .has_headers(true)
        .from_reader(input.as_bytes());
    let records = reader
        .deserialize::<CsvRecord>()
        .collect::<Result<Vec<_>, _>>()?;
    Ok(records)
}

pub fn export_file_name(date: NaiveDate) -> String {
    format!("work-logs-{}.csv", date.format("%Y-%m-%d"))
}

/// Writes `work-logs-<today>.csv` into `dir` and returns its path.
pub fn write_export(
    dir: &Path,
    entries: &[LogEntry],
    today: NaiveDate,
) -> Result<PathBuf, ExportError> {
    let content = export_csv(entries)?;
    std::fs::create_dir_all(dir)?;
    let path = dir.join(export_file_name(today));
    std::fs::write(&path, content)?;
    tracing::info!(path = %path.display(), rows = entries.len(), "csv export written");
    Ok(path)
}
