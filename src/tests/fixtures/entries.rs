// Builders and doubles for work log entries.

use crate::modules::work_logs::core::entry::{EntryDraft, EntryId, LogEntry};
use crate::modules::work_logs::core::errors::PersistenceError;
use crate::modules::work_logs::core::store::{StoreChange, StoreObserver};
use chrono::{DateTime, TimeZone, Utc};
use std::sync::Mutex;

pub fn fixed_timestamp() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 5, 14, 8, 0, 0).unwrap()
}

pub struct EntryDraftBuilder {
    inner: EntryDraft,
}

impl Default for EntryDraftBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[allow(dead_code)]
impl EntryDraftBuilder {
    pub fn new() -> Self {
        Self {
            inner: EntryDraft {
                person_name: Some("Ana".to_string()),
                job_name: "Roofing".to_string(),
                description: Some("Replaced flashing".to_string()),
                timestamp: fixed_timestamp(),
                duration_hours: 1.0,
            },
        }
    }

    pub fn person_name(mut self, v: Option<&str>) -> Self {
        self.inner.person_name = v.map(Into::into);
        self
    }

    pub fn job_name(mut self, v: impl Into<String>) -> Self {
        self.inner.job_name = v.into();
        self
    }

    pub fn description(mut self, v: Option<&str>) -> Self {
        self.inner.description = v.map(Into::into);
        self
    }

    pub fn timestamp(mut self, v: DateTime<Utc>) -> Self {
        self.inner.timestamp = v;
        self
    }

    pub fn duration_hours(mut self, v: f64) -> Self {
        self.inner.duration_hours = v;
        self
    }

    pub fn build(self) -> EntryDraft {
        self.inner
    }
}

pub fn make_log_entry(id: &str, job_name: &str) -> LogEntry {
    LogEntry {
        id: EntryId::from(id),
        person_name: None,
        job_name: job_name.to_string(),
        description: None,
        timestamp: fixed_timestamp(),
        duration_hours: 1.0,
    }
}

pub fn make_log_entry_at(id: &str, timestamp: DateTime<Utc>, duration_hours: f64) -> LogEntry {
    LogEntry {
        timestamp,
        duration_hours,
        ..make_log_entry(id, "Roofing")
    }
}

/// Store observer that records every change and can be told to fail.
#[derive(Default)]
pub struct RecordingObserver {
    changes: Mutex<Vec<StoreChange>>,
    failure: Mutex<Option<PersistenceError>>,
}

impl RecordingObserver {
    pub fn changes(&self) -> Vec<StoreChange> {
        self.changes.lock().unwrap().clone()
    }

    pub fn fail_with(&self, error: PersistenceError) {
        *self.failure.lock().unwrap() = Some(error);
    }
}

impl StoreObserver for RecordingObserver {
    fn on_change(
        &self,
        change: &StoreChange,
        _entries: &[LogEntry],
    ) -> Result<(), PersistenceError> {
        self.changes.lock().unwrap().push(change.clone());
        match self.failure.lock().unwrap().clone() {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod entry_fixture_tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    fn default_builder_produces_a_valid_entry() {
        let entry = EntryDraftBuilder::default()
            .build()
            .into_entry(EntryId::from("local-1"))
            .unwrap();
        assert_eq!(entry.job_name, "Roofing");
        assert_eq!(entry.timestamp, fixed_timestamp());
    }

    #[rstest]
    fn setters_override_the_defaults() {
        let draft = EntryDraftBuilder::new()
            .person_name(None)
            .job_name("Gutters")
            .description(Some("east side"))
            .duration_hours(0.5)
            .build();
        assert_eq!(draft.person_name, None);
        assert_eq!(draft.job_name, "Gutters");
        assert_eq!(draft.description.as_deref(), Some("east side"));
        assert_eq!(draft.duration_hours, 0.5);
    }
}
