// Persistence port shared by local device storage and remote document stores.
//
// Purpose
// - Describe durable writes and change feeds without tying the core to a backend.
//
// Responsibilities
// - A change feed re-delivers the full current result set on every change (snapshot
//   replacement), ordered by timestamp descending, never a diff.
// - Unsubscribing is idempotent and is the only cancellation primitive.

use crate::modules::work_logs::core::entry::{EntryId, EntryPatch, LogEntry};
use crate::modules::work_logs::core::errors::PersistenceError;
use crate::modules::work_logs::core::projections::sort_newest_first;
use crate::shared::core::primitives::{local_date, local_day_bounds};
use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::mpsc;

#[async_trait]
pub trait PersistenceAdapter: Send + Sync {
    /// Stores a new entry and returns the id the store keeps it under.
    async fn write(&self, entry: &LogEntry) -> Result<EntryId, PersistenceError>;
    async fn update(&self, id: &EntryId, patch: &EntryPatch) -> Result<(), PersistenceError>;
    async fn delete(&self, id: &EntryId) -> Result<(), PersistenceError>;
    async fn subscribe(&self, query: FeedQuery) -> Result<Subscription, PersistenceError>;

    /// Suspends or resumes all network usage. Stores without a network ignore it.
    async fn set_network_enabled(&self, _enabled: bool) {}
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FeedQuery {
    /// Half-open `[from, to)` filter on `timestamp`.
    pub range: Option<(DateTime<Utc>, DateTime<Utc>)>,
}

impl FeedQuery {
    pub fn all() -> Self {
        Self::default()
    }

    pub fn between(from: DateTime<Utc>, to: DateTime<Utc>) -> Self {
        Self {
            range: Some((from, to)),
        }
    }

    pub fn matches(&self, entry: &LogEntry) -> bool {
        match self.range {
            Some((from, to)) => entry.timestamp >= from && entry.timestamp < to,
            None => true,
        }
    }

    /// The query's result set over `entries`, newest first.
    pub fn select(&self, entries: &[LogEntry]) -> Vec<LogEntry> {
        let mut selected: Vec<LogEntry> =
            entries.iter().filter(|e| self.matches(e)).cloned().collect();
        sort_newest_first(&mut selected);
        selected
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum FeedScope {
    #[default]
    All,
    Today,
}

impl FeedScope {
    pub fn query<Tz: TimeZone>(&self, now: DateTime<Utc>, tz: &Tz) -> FeedQuery {
        match self {
            FeedScope::All => FeedQuery::all(),
            FeedScope::Today => {
                let (from, to) = local_day_bounds(local_date(now, tz), tz);
                FeedQuery::between(from, to)
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum FeedEvent {
    Snapshot(Vec<LogEntry>),
    Failed(PersistenceError),
}

pub struct Subscription {
    pub events: mpsc::UnboundedReceiver<FeedEvent>,
    pub handle: SubscriptionHandle,
}

impl Subscription {
    pub fn new(events: mpsc::UnboundedReceiver<FeedEvent>, active: Arc<AtomicBool>) -> Self {
        Self {
            events,
            handle: SubscriptionHandle { active },
        }
    }

    pub fn unsubscribe(&self) {
        self.handle.unsubscribe();
    }
}

#[derive(Debug, Clone)]
pub struct SubscriptionHandle {
    active: Arc<AtomicBool>,
}

impl SubscriptionHandle {
    pub fn unsubscribe(&self) {
        self.active.store(false, Ordering::SeqCst);
    }

    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::SeqCst)
    }
}
