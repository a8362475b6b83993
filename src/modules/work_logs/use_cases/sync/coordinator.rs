// Sync coordinator: reconciles the local entry store with a remote document store.
//
// Responsibilities
// - Apply user mutations to the entry store immediately (optimistic write) and queue them
//   for the remote in the outbox.
// - Drive the Offline / Connecting / Synced / Error machine from connectivity signals,
//   change-feed callbacks, write failures and retry requests.
// - Replace the entry store with every delivered snapshot (snapshot replacement, last
//   writer wins). Intents still in the outbox are laid over the snapshot and entries
//   outside the subscribed range are kept, so unconfirmed or unqueried work is never lost.
//   A failed remote write is surfaced, never rolled back locally.
// - Keep the remote adapter's network disabled while offline.
//
// Concurrency
// - The coordinator is owned by one task (`run`). Commands, connectivity edges and feed
//   events are handled one at a time; remote calls are the only suspension points.

use crate::modules::work_logs::adapters::outbound::persistence::{
    FeedEvent, FeedQuery, FeedScope, PersistenceAdapter, Subscription,
};
use crate::modules::work_logs::core::entry::{EntryDraft, EntryId, EntryPatch, LogEntry};
use crate::modules::work_logs::core::errors::{PersistenceError, StoreError};
use crate::modules::work_logs::core::store::EntryStore;
use crate::modules::work_logs::core::sync_state::{SyncEvent, SyncState, SyncStateKind, transition};
use crate::modules::work_logs::use_cases::sync::handle::SyncCommand;
use crate::modules::work_logs::use_cases::sync::outbox::{Outbox, RemoteIntent, RetryPolicy};
use crate::shared::core::primitives::Clock;
use crate::shared::infrastructure::connectivity::{ConnectivityEvents, ConnectivitySignal};
use chrono::TimeZone;
use serde::Serialize;
use std::future::pending;
use std::sync::Arc;
use tokio::sync::mpsc;

#[derive(Debug, Clone, Copy, Default)]
pub struct SyncOptions {
    pub scope: FeedScope,
    pub retry: RetryPolicy,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncStatus {
    pub state: SyncStateKind,
    pub last_error: Option<String>,
    pub local_error: Option<String>,
    pub pending_writes: usize,
}

impl SyncStatus {
    /// Text for the user-visible banner, if anything needs attention.
    pub fn banner(&self) -> Option<String> {
        match (&self.last_error, &self.local_error) {
            (Some(remote), _) => Some(format!("Sync failed: {remote}")),
            (None, Some(local)) => Some(format!("Could not save locally: {local}")),
            (None, None) if self.state == SyncStateKind::Offline && self.pending_writes > 0 => {
                Some(format!("Offline: {} change(s) waiting to sync", self.pending_writes))
            }
            _ => None,
        }
    }
}

type FeedQueryFn = Box<dyn Fn() -> FeedQuery + Send + Sync>;

pub struct SyncCoordinator<TRemote>
where
    TRemote: PersistenceAdapter + 'static,
{
    store: EntryStore,
    remote: Arc<TRemote>,
    state: SyncState,
    outbox: Outbox,
    feed: Option<Subscription>,
    feed_query: FeedQueryFn,
    // Query of the open subscription; snapshots only speak for entries it matches.
    subscribed: FeedQuery,
    retry: RetryPolicy,
    local_error: Option<PersistenceError>,
}

impl<TRemote> SyncCoordinator<TRemote>
where
    TRemote: PersistenceAdapter + 'static,
{
    pub fn new<Tz>(
        store: EntryStore,
        remote: Arc<TRemote>,
        clock: Arc<dyn Clock>,
        tz: Tz,
        options: SyncOptions,
    ) -> Self
    where
        Tz: TimeZone + Send + Sync + 'static,
    {
        let scope = options.scope;
        Self {
            store,
            remote,
            state: SyncState::Offline,
            outbox: Outbox::new(),
            feed: None,
            subscribed: FeedQuery::all(),
            feed_query: Box::new(move || scope.query(clock.now(), &tz)),
            retry: options.retry,
            local_error: None,
        }
    }

    pub fn state(&self) -> &SyncState {
        &self.state
    }

    pub fn store(&self) -> &EntryStore {
        &self.store
    }

    pub fn status(&self) -> SyncStatus {
        SyncStatus {
            state: self.state.kind(),
            last_error: self.state.last_error().map(ToString::to_string),
            local_error: self.local_error.as_ref().map(ToString::to_string),
            pending_writes: self.outbox.len(),
        }
    }

    pub fn pending_writes(&self) -> usize {
        self.outbox.len()
    }

    /// Brings the machine in line with the connectivity level seen at startup.
    pub async fn start(&mut self, online: bool) {
        if online {
            self.apply(SyncEvent::ConnectivityRestored).await;
        } else {
            self.remote.set_network_enabled(false).await;
        }
    }

    pub fn add(&mut self, draft: EntryDraft) -> Result<EntryId, StoreError> {
        let id = self.store.add(draft)?;
        self.note_local_faults();
        let entry = self.store.get(&id)?.clone();
        self.outbox.enqueue(RemoteIntent::Write(entry));
        Ok(id)
    }

    pub fn update(&mut self, id: &EntryId, patch: EntryPatch) -> Result<(), StoreError> {
        self.store.update(id, &patch)?;
        self.note_local_faults();
        self.outbox.enqueue(RemoteIntent::Update {
            id: id.clone(),
            patch,
        });
        Ok(())
    }

    pub fn remove(&mut self, id: &EntryId) -> Result<(), StoreError> {
        self.store.remove(id)?;
        self.note_local_faults();
        self.outbox.enqueue(RemoteIntent::Delete(id.clone()));
        Ok(())
    }

    pub async fn handle_connectivity(&mut self, signal: ConnectivitySignal) {
        let event = match signal {
            ConnectivitySignal::Online => SyncEvent::ConnectivityRestored,
            ConnectivitySignal::Offline => SyncEvent::ConnectivityLost,
        };
        self.apply(event).await;
    }

    pub async fn retry(&mut self) {
        self.apply(SyncEvent::RetryRequested).await;
    }

    pub async fn handle_feed_event(&mut self, event: FeedEvent) {
        match event {
            FeedEvent::Snapshot(entries) => {
                if self.state == SyncState::Offline {
                    tracing::debug!("ignoring snapshot delivered while offline");
                    return;
                }
                let merged = self.merge_snapshot(entries);
                let count = self.store.replace_all(merged);
                self.note_local_faults();
                tracing::debug!(count, pending = self.outbox.len(), "snapshot replaced local entries");
                self.apply(SyncEvent::SnapshotDelivered).await;
            }
            FeedEvent::Failed(error) => {
                self.close_feed();
                self.apply(SyncEvent::FeedFailed(error)).await;
            }
        }
    }

    /// Handles every feed event already delivered, without waiting for more.
    pub async fn poll_feed(&mut self) -> usize {
        let mut handled = 0;
        while let Some(event) = self.feed.as_mut().and_then(|f| f.events.try_recv().ok()) {
            self.handle_feed_event(event).await;
            handled += 1;
        }
        handled
    }

    /// Sends queued intents to the remote store while the network may be used.
    pub async fn flush_outbox(&mut self) {
        if let Some(event) = self.drain_outbox().await {
            self.apply(event).await;
        }
    }

    pub async fn run(
        mut self,
        mut commands: mpsc::Receiver<SyncCommand>,
        connectivity: ConnectivityEvents,
    ) {
        let online = connectivity.current() == ConnectivitySignal::Online;
        let mut connectivity = Some(connectivity);
        self.start(online).await;

        loop {
            let event = tokio::select! {
                biased;
                signal = next_signal(&mut connectivity) => LoopEvent::Connectivity(signal),
                event = next_feed_event(&mut self.feed) => LoopEvent::Feed(event),
                command = commands.recv() => match command {
                    Some(command) => LoopEvent::Command(command),
                    None => break,
                },
            };
            match event {
                LoopEvent::Connectivity(Some(signal)) => self.handle_connectivity(signal).await,
                LoopEvent::Connectivity(None) => {
                    tracing::warn!("connectivity notifier closed; keeping last known state");
                    connectivity = None;
                }
                LoopEvent::Feed(event) => self.handle_feed_event(event).await,
                LoopEvent::Command(command) => self.handle_command(command).await,
            }
        }

        self.close_feed();
        tracing::info!("sync coordinator stopped");
    }

    async fn handle_command(&mut self, command: SyncCommand) {
        match command {
            SyncCommand::Add { draft, reply } => {
                let _ = reply.send(self.add(draft));
                self.flush_outbox().await;
            }
            SyncCommand::Update { id, patch, reply } => {
                let _ = reply.send(self.update(&id, patch));
                self.flush_outbox().await;
            }
            SyncCommand::Remove { id, reply } => {
                let _ = reply.send(self.remove(&id));
                self.flush_outbox().await;
            }
            SyncCommand::Get { id, reply } => {
                let _ = reply.send(self.store.get(&id).cloned());
            }
            SyncCommand::Entries { reply } => {
                let _ = reply.send(self.store.all().to_vec());
            }
            SyncCommand::Status { reply } => {
                let _ = reply.send(self.status());
            }
            SyncCommand::Retry { reply } => {
                self.retry().await;
                let _ = reply.send(self.status());
            }
        }
    }

    async fn apply(&mut self, event: SyncEvent) {
        let mut next_event = Some(event);
        while let Some(event) = next_event.take() {
            let Some(next) = transition(&self.state, &event) else {
                continue;
            };
            tracing::info!(from = ?self.state.kind(), to = ?next.kind(), ?event, "sync state changed");
            self.state = next;
            next_event = self.enter_state().await;
        }
    }

    // Side effects of entering the current state; may yield a follow-up event.
    async fn enter_state(&mut self) -> Option<SyncEvent> {
        match &self.state {
            SyncState::Connecting => {
                self.remote.set_network_enabled(true).await;
                self.close_feed();
                let query = (self.feed_query)();
                match self.remote.subscribe(query.clone()).await {
                    Ok(subscription) => {
                        self.feed = Some(subscription);
                        self.subscribed = query;
                    }
                    Err(error) => return Some(SyncEvent::FeedFailed(error)),
                }
                self.drain_outbox().await
            }
            SyncState::Offline => {
                self.close_feed();
                self.remote.set_network_enabled(false).await;
                None
            }
            SyncState::Synced => self.drain_outbox().await,
            SyncState::Error { error } => {
                tracing::error!(%error, pending = self.outbox.len(), "sync error");
                None
            }
        }
    }

    async fn drain_outbox(&mut self) -> Option<SyncEvent> {
        while self.state.allows_network() {
            let intent = self.outbox.front()?.clone();
            match self.send_with_retry(&intent).await {
                Ok(confirmed) => {
                    self.outbox.pop_front();
                    if let Some(confirmed) = confirmed {
                        self.confirm_write(intent.entry_id(), confirmed);
                    }
                }
                Err(error) if error.is_retryable() => {
                    tracing::warn!(%error, kind = intent.kind(), id = %intent.entry_id(), "remote write kept for retry");
                    return Some(SyncEvent::WriteFailed(error));
                }
                Err(error) => {
                    tracing::error!(%error, kind = intent.kind(), id = %intent.entry_id(), "remote write rejected; dropping it");
                    self.outbox.pop_front();
                    return Some(SyncEvent::WriteFailed(error));
                }
            }
        }
        None
    }

    async fn send_with_retry(
        &self,
        intent: &RemoteIntent,
    ) -> Result<Option<EntryId>, PersistenceError> {
        let mut attempt = 1;
        loop {
            match self.send(intent).await {
                Ok(confirmed) => return Ok(confirmed),
                Err(error) if error.is_retryable() && attempt < self.retry.max_attempts => {
                    let delay = self.retry.backoff(attempt);
                    tracing::warn!(%error, attempt, ?delay, "remote write failed; retrying");
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(error) => return Err(error),
            }
        }
    }

    async fn send(&self, intent: &RemoteIntent) -> Result<Option<EntryId>, PersistenceError> {
        match intent {
            RemoteIntent::Write(entry) => self.remote.write(entry).await.map(Some),
            RemoteIntent::Update { id, patch } => self.remote.update(id, patch).await.map(|_| None),
            RemoteIntent::Delete(id) => self.remote.delete(id).await.map(|_| None),
        }
    }

    fn confirm_write(&mut self, tentative: &EntryId, confirmed: EntryId) {
        if tentative == &confirmed {
            return;
        }
        self.outbox.rekey(tentative, &confirmed);
        match self.store.rekey(tentative, confirmed.clone()) {
            Ok(()) => self.note_local_faults(),
            // A snapshot may already have replaced the tentative record.
            Err(error) => tracing::debug!(%error, %tentative, %confirmed, "rekey skipped"),
        }
    }

    fn merge_snapshot(&self, mut entries: Vec<LogEntry>) -> Vec<LogEntry> {
        entries.extend(
            self.store
                .all()
                .iter()
                .filter(|e| !self.subscribed.matches(e))
                .cloned(),
        );
        if !self.outbox.is_empty() {
            self.outbox.overlay(&mut entries);
        }
        entries
    }

    fn close_feed(&mut self) {
        if let Some(subscription) = self.feed.take() {
            subscription.unsubscribe();
        }
    }

    fn note_local_faults(&mut self) {
        self.local_error = self.store.take_faults().pop();
    }
}

enum LoopEvent {
    Connectivity(Option<ConnectivitySignal>),
    Feed(FeedEvent),
    Command(SyncCommand),
}

async fn next_signal(events: &mut Option<ConnectivityEvents>) -> Option<ConnectivitySignal> {
    match events {
        Some(events) => events.next().await,
        None => pending().await,
    }
}

async fn next_feed_event(feed: &mut Option<Subscription>) -> FeedEvent {
    let Some(subscription) = feed.as_mut() else {
        return pending().await;
    };
    match subscription.events.recv().await {
        Some(event) => event,
        None => {
            *feed = None;
            FeedEvent::Failed(PersistenceError::Network("change feed closed".into()))
        }
    }
}
