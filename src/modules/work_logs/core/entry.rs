// One work log record plus the inputs that create and change it.
//
// Responsibilities
// - Hold the canonical record shape (absolute timestamp, hours as quarter steps).
// - Validate drafts and patched records before they reach the store.

use crate::modules::work_logs::core::errors::ValidationError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use uuid::Uuid;

pub const MIN_DURATION_HOURS: f64 = 0.25;
pub const DURATION_STEP_HOURS: f64 = 0.25;

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntryId(String);

impl EntryId {
    /// Client-side id used until a remote store confirms the write.
    pub fn tentative() -> Self {
        Self(format!("local-{}", Uuid::now_v7()))
    }

    pub fn is_tentative(&self) -> bool {
        self.0.starts_with("local-")
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for EntryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for EntryId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for EntryId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogEntry {
    pub id: EntryId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub person_name: Option<String>,
    pub job_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub timestamp: DateTime<Utc>,
    pub duration_hours: f64,
}

impl LogEntry {
    pub fn validate(&self) -> Result<(), ValidationError> {
        validate_job_name(&self.job_name)?;
        validate_duration(self.duration_hours)
    }

    /// The same record under another id.
    pub fn with_id(mut self, id: EntryId) -> Self {
        self.id = id;
        self
    }
}

/// A form submission; becomes a `LogEntry` once the store assigns an id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EntryDraft {
    #[serde(default)]
    pub person_name: Option<String>,
    pub job_name: String,
    #[serde(default)]
    pub description: Option<String>,
    pub timestamp: DateTime<Utc>,
    pub duration_hours: f64,
}

impl EntryDraft {
    pub fn into_entry(self, id: EntryId) -> Result<LogEntry, ValidationError> {
        let entry = LogEntry {
            id,
            person_name: normalize_optional(self.person_name),
            job_name: self.job_name.trim().to_string(),
            description: normalize_optional(self.description),
            timestamp: self.timestamp,
            duration_hours: self.duration_hours,
        };
        entry.validate()?;
        Ok(entry)
    }
}

/// Field-wise replacement. `Some(None)` clears an optional field.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EntryPatch {
    #[serde(
        default,
        deserialize_with = "explicit_null",
        skip_serializing_if = "Option::is_none"
    )]
    pub person_name: Option<Option<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub job_name: Option<String>,
    #[serde(
        default,
        deserialize_with = "explicit_null",
        skip_serializing_if = "Option::is_none"
    )]
    pub description: Option<Option<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_hours: Option<f64>,
}

impl EntryPatch {
    pub fn is_empty(&self) -> bool {
        *self == EntryPatch::default()
    }

    /// Builds the replacement record; the original is left untouched.
    pub fn apply(&self, entry: &LogEntry) -> Result<LogEntry, ValidationError> {
        let mut next = entry.clone();
        if let Some(person_name) = &self.person_name {
            next.person_name = normalize_optional(person_name.clone());
        }
        if let Some(job_name) = &self.job_name {
            next.job_name = job_name.trim().to_string();
        }
        if let Some(description) = &self.description {
            next.description = normalize_optional(description.clone());
        }
        if let Some(timestamp) = self.timestamp {
            next.timestamp = timestamp;
        }
        if let Some(duration_hours) = self.duration_hours {
            next.duration_hours = duration_hours;
        }
        next.validate()?;
        Ok(next)
    }
}

// A present `null` means "clear the field"; an absent key leaves it alone.
fn explicit_null<'de, D>(deserializer: D) -> Result<Option<Option<String>>, D::Error>
where
    D: Deserializer<'de>,
{
    Option::<String>::deserialize(deserializer).map(Some)
}

fn validate_job_name(job_name: &str) -> Result<(), ValidationError> {
    if job_name.trim().is_empty() {
        return Err(ValidationError::EmptyJobName);
    }
    Ok(())
}

fn validate_duration(hours: f64) -> Result<(), ValidationError> {
    if !hours.is_finite() || hours <= 0.0 {
        return Err(ValidationError::NonPositiveDuration(hours));
    }
    if hours < MIN_DURATION_HOURS {
        return Err(ValidationError::DurationBelowMinimum(hours));
    }
    if (hours / DURATION_STEP_HOURS).fract() != 0.0 {
        return Err(ValidationError::DurationOffStep(hours));
    }
    Ok(())
}

fn normalize_optional(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}
