// In memory implementation of a hosted document collection.
//
// Purpose
// - Stand in for a remote document database in tests and local development.
//
// Responsibilities
// - Assign server ids on first write and keep one document per entry.
// - Push full query snapshots to subscribers after every change.
// - Honour network suspension: no request succeeds and no snapshot is pushed while disabled.
// - Offer fault switches (offline, failing writes, permission denial, feed errors) and
//   count requests.

use crate::modules::work_logs::adapters::outbound::feed_hub::FeedHub;
use crate::modules::work_logs::adapters::outbound::persistence::{
    FeedQuery, PersistenceAdapter, Subscription,
};
use crate::modules::work_logs::core::entry::{EntryId, EntryPatch, LogEntry};
use crate::modules::work_logs::core::errors::PersistenceError;
use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use tokio::sync::RwLock;
use uuid::Uuid;

pub struct InMemoryDocumentStore {
    documents: RwLock<Vec<LogEntry>>,
    feed: FeedHub,
    network_enabled: AtomicBool,
    is_offline: AtomicBool,
    fail_writes: AtomicBool,
    deny_access: AtomicBool,
    requests: AtomicUsize,
}

impl Default for InMemoryDocumentStore {
    fn default() -> Self {
        Self {
            documents: RwLock::default(),
            feed: FeedHub::new(),
            network_enabled: AtomicBool::new(true),
            is_offline: AtomicBool::new(false),
            fail_writes: AtomicBool::new(false),
            deny_access: AtomicBool::new(false),
            requests: AtomicUsize::new(0),
        }
    }
}

impl InMemoryDocumentStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_documents(documents: Vec<LogEntry>) -> Self {
        Self {
            documents: RwLock::new(documents),
            ..Self::default()
        }
    }

    /// Simulates the backend becoming unreachable (or reachable again).
    pub fn toggle_offline(&self) {
        self.is_offline.fetch_xor(true, Ordering::SeqCst);
    }

    /// Makes writes time out while subscriptions keep working (or stop doing so).
    pub fn toggle_write_failures(&self) {
        self.fail_writes.fetch_xor(true, Ordering::SeqCst);
    }

    /// Makes every request fail with a permission error (or stop doing so).
    pub fn toggle_deny_access(&self) {
        self.deny_access.fetch_xor(true, Ordering::SeqCst);
    }

    pub fn push_feed_error(&self, error: PersistenceError) {
        self.feed.fail(error);
    }

    pub fn request_count(&self) -> usize {
        self.requests.load(Ordering::SeqCst)
    }

    pub fn is_network_enabled(&self) -> bool {
        self.network_enabled.load(Ordering::SeqCst)
    }

    pub fn subscriber_count(&self) -> usize {
        self.feed.active_count()
    }

    pub async fn documents(&self) -> Vec<LogEntry> {
        self.documents.read().await.clone()
    }

    fn begin_request(&self) -> Result<(), PersistenceError> {
        if !self.is_network_enabled() {
            return Err(PersistenceError::Network("network disabled".into()));
        }
        self.requests.fetch_add(1, Ordering::SeqCst);
        if self.is_offline.load(Ordering::SeqCst) {
            return Err(PersistenceError::Network("Document store offline".into()));
        }
        if self.deny_access.load(Ordering::SeqCst) {
            return Err(PersistenceError::Permission(
                "Missing or insufficient permissions".into(),
            ));
        }
        Ok(())
    }

    fn begin_write(&self) -> Result<(), PersistenceError> {
        self.begin_request()?;
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(PersistenceError::Network("write timed out".into()));
        }
        Ok(())
    }

    fn publish(&self, documents: &[LogEntry]) {
        if self.is_network_enabled() {
            self.feed.publish(documents);
        }
    }
}

#[async_trait]
impl PersistenceAdapter for InMemoryDocumentStore {
    async fn write(&self, entry: &LogEntry) -> Result<EntryId, PersistenceError> {
        self.begin_write()?;
        let id = EntryId::from(format!("doc-{}", Uuid::now_v7()));
        let mut guard = self.documents.write().await;
        guard.push(entry.clone().with_id(id.clone()));
        self.publish(&guard);
        Ok(id)
    }

    async fn update(&self, id: &EntryId, patch: &EntryPatch) -> Result<(), PersistenceError> {
        self.begin_write()?;
        let mut guard = self.documents.write().await;
        let document = guard
            .iter_mut()
            .find(|d| &d.id == id)
            .ok_or_else(|| PersistenceError::NotFound(id.clone()))?;
        *document = patch
            .apply(document)
            .map_err(|e| PersistenceError::Serialization(e.to_string()))?;
        self.publish(&guard);
        Ok(())
    }

    async fn delete(&self, id: &EntryId) -> Result<(), PersistenceError> {
        self.begin_write()?;
        let mut guard = self.documents.write().await;
        let position = guard
            .iter()
            .position(|d| &d.id == id)
            .ok_or_else(|| PersistenceError::NotFound(id.clone()))?;
        guard.remove(position);
        self.publish(&guard);
        Ok(())
    }

    async fn subscribe(&self, query: FeedQuery) -> Result<Subscription, PersistenceError> {
        self.begin_request()?;
        let guard = self.documents.read().await;
        Ok(self.feed.subscribe(query, &guard))
    }

    async fn set_network_enabled(&self, enabled: bool) {
        let was = self.network_enabled.swap(enabled, Ordering::SeqCst);
        if enabled && !was {
            let guard = self.documents.read().await;
            self.feed.publish(&guard);
        }
    }
}
