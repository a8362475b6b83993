// Outbox of optimistic local mutations waiting to reach the remote store.
//
// Responsibilities
// - Keep intents in the order they were applied locally.
// - Fold changes to entries the remote has never seen into their pending write, so a
//   record created and deleted while offline costs no request at all.
// - Follow id reassignment once the remote confirms a write.

use crate::modules::work_logs::core::entry::{EntryId, EntryPatch, LogEntry};
use std::collections::VecDeque;
use std::time::Duration;

#[derive(Debug, Clone, PartialEq)]
pub enum RemoteIntent {
    Write(LogEntry),
    Update { id: EntryId, patch: EntryPatch },
    Delete(EntryId),
}

impl RemoteIntent {
    pub fn entry_id(&self) -> &EntryId {
        match self {
            RemoteIntent::Write(entry) => &entry.id,
            RemoteIntent::Update { id, .. } | RemoteIntent::Delete(id) => id,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            RemoteIntent::Write(_) => "write",
            RemoteIntent::Update { .. } => "update",
            RemoteIntent::Delete(_) => "delete",
        }
    }
}

#[derive(Debug, Default)]
pub struct Outbox {
    queue: VecDeque<RemoteIntent>,
}

impl Outbox {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    pub fn front(&self) -> Option<&RemoteIntent> {
        self.queue.front()
    }

    pub fn pop_front(&mut self) -> Option<RemoteIntent> {
        self.queue.pop_front()
    }

    pub fn iter(&self) -> impl Iterator<Item = &RemoteIntent> {
        self.queue.iter()
    }

    pub fn enqueue(&mut self, intent: RemoteIntent) {
        match intent {
            RemoteIntent::Write(entry) => self.queue.push_back(RemoteIntent::Write(entry)),
            RemoteIntent::Update { id, patch } => {
                if let Some(entry) = self.pending_write_mut(&id) {
                    if let Ok(next) = patch.apply(entry) {
                        *entry = next;
                        return;
                    }
                }
                self.queue.push_back(RemoteIntent::Update { id, patch });
            }
            RemoteIntent::Delete(id) => {
                let had_pending_write = self.pending_write_mut(&id).is_some();
                self.queue.retain(|i| i.entry_id() != &id);
                if !had_pending_write {
                    self.queue.push_back(RemoteIntent::Delete(id));
                }
            }
        }
    }

    /// Lays the queued intents over a remote snapshot, so changes the remote has not
    /// confirmed yet survive snapshot replacement.
    pub fn overlay(&self, entries: &mut Vec<LogEntry>) {
        for intent in self.iter() {
            match intent {
                RemoteIntent::Write(entry) => match entries.iter_mut().find(|e| e.id == entry.id) {
                    Some(existing) => *existing = entry.clone(),
                    None => entries.push(entry.clone()),
                },
                RemoteIntent::Update { id, patch } => {
                    if let Some(existing) = entries.iter_mut().find(|e| &e.id == id) {
                        if let Ok(next) = patch.apply(existing) {
                            *existing = next;
                        }
                    }
                }
                RemoteIntent::Delete(id) => entries.retain(|e| &e.id != id),
            }
        }
    }

    /// Points queued intents for `from` at `to`.
    pub fn rekey(&mut self, from: &EntryId, to: &EntryId) {
        for intent in self.queue.iter_mut() {
            match intent {
                RemoteIntent::Write(entry) if entry.id == *from => entry.id = to.clone(),
                RemoteIntent::Update { id, .. } | RemoteIntent::Delete(id) if *id == *from => {
                    *id = to.clone()
                }
                _ => {}
            }
        }
    }

    fn pending_write_mut(&mut self, id: &EntryId) -> Option<&mut LogEntry> {
        self.queue.iter_mut().find_map(|intent| match intent {
            RemoteIntent::Write(entry) if &entry.id == id => Some(entry),
            _ => None,
        })
    }
}

/// Bounded exponential backoff for retryable remote failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_backoff: Duration,
    pub max_backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_backoff: Duration::from_millis(200),
            max_backoff: Duration::from_secs(5),
        }
    }
}

impl RetryPolicy {
    pub fn no_retry() -> Self {
        Self {
            max_attempts: 1,
            base_backoff: Duration::ZERO,
            max_backoff: Duration::ZERO,
        }
    }

    /// Delay before attempt `attempt + 1`, given `attempt` attempts already failed.
    pub fn backoff(&self, attempt: u32) -> Duration {
        let factor = 2u32.saturating_pow(attempt.saturating_sub(1));
        self.base_backoff
            .saturating_mul(factor)
            .min(self.max_backoff)
    }
}
