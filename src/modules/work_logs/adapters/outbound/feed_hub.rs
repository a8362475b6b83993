// Fan-out of full result-set snapshots to change-feed subscribers.
//
// Responsibilities
// - Deliver an initial snapshot on subscribe and a fresh one on every publish.
// - Drop subscribers that unsubscribed or whose receiver is gone.

use crate::modules::work_logs::adapters::outbound::persistence::{
    FeedEvent, FeedQuery, Subscription,
};
use crate::modules::work_logs::core::entry::LogEntry;
use crate::modules::work_logs::core::errors::PersistenceError;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;

struct Subscriber {
    query: FeedQuery,
    sender: mpsc::UnboundedSender<FeedEvent>,
    active: Arc<AtomicBool>,
}

impl Subscriber {
    fn is_live(&self) -> bool {
        self.active.load(Ordering::SeqCst) && !self.sender.is_closed()
    }
}

#[derive(Default)]
pub struct FeedHub {
    subscribers: Mutex<Vec<Subscriber>>,
}

impl FeedHub {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&self, query: FeedQuery, current: &[LogEntry]) -> Subscription {
        let (sender, receiver) = mpsc::unbounded_channel();
        let active = Arc::new(AtomicBool::new(true));
        let _ = sender.send(FeedEvent::Snapshot(query.select(current)));
        let mut guard = self.subscribers.lock().unwrap_or_else(|e| e.into_inner());
        guard.push(Subscriber {
            query,
            sender,
            active: active.clone(),
        });
        Subscription::new(receiver, active)
    }

    pub fn publish(&self, entries: &[LogEntry]) {
        let mut guard = self.subscribers.lock().unwrap_or_else(|e| e.into_inner());
        guard.retain(|s| s.is_live());
        for subscriber in guard.iter() {
            let _ = subscriber
                .sender
                .send(FeedEvent::Snapshot(subscriber.query.select(entries)));
        }
    }

    pub fn fail(&self, error: PersistenceError) {
        let mut guard = self.subscribers.lock().unwrap_or_else(|e| e.into_inner());
        guard.retain(|s| s.is_live());
        for subscriber in guard.iter() {
            let _ = subscriber.sender.send(FeedEvent::Failed(error.clone()));
        }
    }

    pub fn active_count(&self) -> usize {
        let guard = self.subscribers.lock().unwrap_or_else(|e| e.into_inner());
        guard.iter().filter(|s| s.is_live()).count()
    }
}
