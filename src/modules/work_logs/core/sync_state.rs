use crate::modules::work_logs::core::errors::PersistenceError;
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum SyncState {
    #[default]
    Offline,
    Connecting,
    Synced,
    Error {
        error: PersistenceError,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncStateKind {
    Offline,
    Connecting,
    Synced,
    Error,
}

impl SyncState {
    pub fn kind(&self) -> SyncStateKind {
        match self {
            SyncState::Offline => SyncStateKind::Offline,
            SyncState::Connecting => SyncStateKind::Connecting,
            SyncState::Synced => SyncStateKind::Synced,
            SyncState::Error { .. } => SyncStateKind::Error,
        }
    }

    pub fn last_error(&self) -> Option<&PersistenceError> {
        match self {
            SyncState::Error { error } => Some(error),
            _ => None,
        }
    }

    /// Whether the remote adapter may be used at all.
    pub fn allows_network(&self) -> bool {
        matches!(self, SyncState::Connecting | SyncState::Synced)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncEvent {
    ConnectivityRestored,
    ConnectivityLost,
    SnapshotDelivered,
    FeedFailed(PersistenceError),
    WriteFailed(PersistenceError),
    RetryRequested,
}

/// Next state for `event`, or `None` when the event does not move the machine.
pub fn transition(state: &SyncState, event: &SyncEvent) -> Option<SyncState> {
    match (state, event) {
        (SyncState::Offline, SyncEvent::ConnectivityRestored) => Some(SyncState::Connecting),
        (SyncState::Error { .. }, SyncEvent::ConnectivityRestored | SyncEvent::RetryRequested) => {
            Some(SyncState::Connecting)
        }
        (SyncState::Connecting, SyncEvent::SnapshotDelivered) => Some(SyncState::Synced),
        (
            SyncState::Connecting | SyncState::Synced | SyncState::Error { .. },
            SyncEvent::ConnectivityLost,
        ) => Some(SyncState::Offline),
        (_, SyncEvent::FeedFailed(error) | SyncEvent::WriteFailed(error)) => {
            Some(SyncState::Error {
                error: error.clone(),
            })
        }
        _ => None,
    }
}
