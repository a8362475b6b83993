// Cloneable front door to a running sync coordinator.
//
// Inbound adapters hold a WorkLogHandle; every call becomes a SyncCommand processed
// one at a time by the coordinator loop, so mutations never interleave.

use crate::modules::work_logs::core::entry::{EntryDraft, EntryId, EntryPatch, LogEntry};
use crate::modules::work_logs::core::errors::StoreError;
use crate::modules::work_logs::use_cases::sync::coordinator::SyncStatus;
use thiserror::Error;
use tokio::sync::{mpsc, oneshot};

#[derive(Debug, Error, PartialEq)]
pub enum WorkLogError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("work log is not running")]
    Stopped,
}

pub enum SyncCommand {
    Add {
        draft: EntryDraft,
        reply: oneshot::Sender<Result<EntryId, StoreError>>,
    },
    Update {
        id: EntryId,
        patch: EntryPatch,
        reply: oneshot::Sender<Result<(), StoreError>>,
    },
    Remove {
        id: EntryId,
        reply: oneshot::Sender<Result<(), StoreError>>,
    },
    Get {
        id: EntryId,
        reply: oneshot::Sender<Result<LogEntry, StoreError>>,
    },
    Entries {
        reply: oneshot::Sender<Vec<LogEntry>>,
    },
    Status {
        reply: oneshot::Sender<SyncStatus>,
    },
    Retry {
        reply: oneshot::Sender<SyncStatus>,
    },
}

#[derive(Clone)]
pub struct WorkLogHandle {
    commands: mpsc::Sender<SyncCommand>,
}

impl WorkLogHandle {
    pub fn channel(buffer: usize) -> (Self, mpsc::Receiver<SyncCommand>) {
        let (commands, receiver) = mpsc::channel(buffer);
        (Self { commands }, receiver)
    }

    pub async fn add(&self, draft: EntryDraft) -> Result<EntryId, WorkLogError> {
        let result = self.request(|reply| SyncCommand::Add { draft, reply }).await?;
        Ok(result?)
    }

    pub async fn update(&self, id: EntryId, patch: EntryPatch) -> Result<(), WorkLogError> {
        let result = self
            .request(|reply| SyncCommand::Update { id, patch, reply })
            .await?;
        Ok(result?)
    }

    pub async fn remove(&self, id: EntryId) -> Result<(), WorkLogError> {
        let result = self.request(|reply| SyncCommand::Remove { id, reply }).await?;
        Ok(result?)
    }

    pub async fn get(&self, id: EntryId) -> Result<LogEntry, WorkLogError> {
        let result = self.request(|reply| SyncCommand::Get { id, reply }).await?;
        Ok(result?)
    }

    pub async fn entries(&self) -> Result<Vec<LogEntry>, WorkLogError> {
        self.request(|reply| SyncCommand::Entries { reply }).await
    }

    pub async fn status(&self) -> Result<SyncStatus, WorkLogError> {
        self.request(|reply| SyncCommand::Status { reply }).await
    }

    pub async fn retry(&self) -> Result<SyncStatus, WorkLogError> {
        self.request(|reply| SyncCommand::Retry { reply }).await
    }

    async fn request<T>(
        &self,
        command: impl FnOnce(oneshot::Sender<T>) -> SyncCommand,
    ) -> Result<T, WorkLogError> {
        let (reply, response) = oneshot::channel();
        self.commands
            .send(command(reply))
            .await
            .map_err(|_| WorkLogError::Stopped)?;
        response.await.map_err(|_| WorkLogError::Stopped)
    }
}
