// Error taxonomy of the work log context.
//
// - ValidationError and StoreError are returned synchronously by the entry store.
// - PersistenceError travels through adapters and the sync coordinator and ends up on the status banner.

use crate::modules::work_logs::core::entry::EntryId;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    #[error("job name is required")]
    EmptyJobName,

    #[error("duration must be positive, got {0}")]
    NonPositiveDuration(f64),

    #[error("duration must be at least 0.25 hours, got {0}")]
    DurationBelowMinimum(f64),

    #[error("duration must be a multiple of 0.25 hours, got {0}")]
    DurationOffStep(f64),

    #[error("duplicate log entry id {0}")]
    DuplicateId(EntryId),
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum StoreError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("log entry {0} not found")]
    NotFound(EntryId),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PersistenceError {
    #[error("serialization failed: {0}")]
    Serialization(String),

    #[error("storage full: {needed} bytes needed, {available} available")]
    StorageFull { needed: usize, available: usize },

    #[error("network error: {0}")]
    Network(String),

    #[error("permission denied: {0}")]
    Permission(String),

    #[error("document {0} not found")]
    NotFound(EntryId),

    #[error("storage i/o failed: {0}")]
    Io(String),
}

impl PersistenceError {
    pub fn is_retryable(&self) -> bool {
        matches!(self, PersistenceError::Network(_))
    }
}

impl From<serde_json::Error> for PersistenceError {
    fn from(e: serde_json::Error) -> Self {
        PersistenceError::Serialization(e.to_string())
    }
}

#[cfg(test)]
mod work_log_errors_tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(PersistenceError::Network("timeout".into()), true)]
    #[case(PersistenceError::Permission("denied".into()), false)]
    #[case(PersistenceError::Serialization("bad".into()), false)]
    #[case(PersistenceError::StorageFull { needed: 10, available: 1 }, false)]
    #[case(PersistenceError::NotFound(EntryId::from("doc-1")), false)]
    fn only_network_errors_are_retryable(#[case] error: PersistenceError, #[case] expected: bool) {
        assert_eq!(error.is_retryable(), expected);
    }

    #[rstest]
    fn it_should_render_store_errors() {
        let not_found = StoreError::NotFound(EntryId::from("local-1"));
        assert_eq!(not_found.to_string(), "log entry local-1 not found");
        let validation: StoreError = ValidationError::EmptyJobName.into();
        assert_eq!(validation.to_string(), "job name is required");
    }
}
