// Local persistence: the whole entry collection as one JSON array under a single key.
//
// Responsibilities
// - Load the collection at startup and rewrite it wholesale on every store change.
// - Act as a persistence adapter too, so it can stand in for a remote collection
//   (for example a directory shared between devices).

use crate::modules::work_logs::adapters::outbound::feed_hub::FeedHub;
use crate::modules::work_logs::adapters::outbound::persistence::{
    FeedQuery, PersistenceAdapter, Subscription,
};
use crate::modules::work_logs::core::entry::{EntryId, EntryPatch, LogEntry};
use crate::modules::work_logs::core::errors::PersistenceError;
use crate::modules::work_logs::core::store::{StoreChange, StoreObserver};
use crate::shared::infrastructure::key_value::KeyValueStorage;
use async_trait::async_trait;
use std::sync::{Mutex, MutexGuard};

pub const STORAGE_KEY: &str = "workLogs";

pub struct LocalLogStorage<S: KeyValueStorage> {
    storage: S,
    feed: FeedHub,
    // Serializes read-modify-write cycles, saves and subscriptions, so a subscriber's
    // initial snapshot is never older than the last publish it missed.
    write_lock: Mutex<()>,
}

impl<S: KeyValueStorage> LocalLogStorage<S> {
    pub fn new(storage: S) -> Self {
        Self {
            storage,
            feed: FeedHub::new(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn load(&self) -> Result<Vec<LogEntry>, PersistenceError> {
        match self.storage.get(STORAGE_KEY)? {
            Some(raw) => Ok(serde_json::from_str(&raw)?),
            None => Ok(Vec::new()),
        }
    }

    pub fn save(&self, entries: &[LogEntry]) -> Result<(), PersistenceError> {
        let _guard = self.lock_writes();
        self.persist(entries)
    }

    fn persist(&self, entries: &[LogEntry]) -> Result<(), PersistenceError> {
        let raw = serde_json::to_string(entries)?;
        self.storage.set(STORAGE_KEY, raw)?;
        self.feed.publish(entries);
        Ok(())
    }

    fn modify<T>(
        &self,
        change: impl FnOnce(&mut Vec<LogEntry>) -> Result<T, PersistenceError>,
    ) -> Result<T, PersistenceError> {
        let _guard = self.lock_writes();
        let mut entries = self.load()?;
        let out = change(&mut entries)?;
        self.persist(&entries)?;
        Ok(out)
    }

    fn lock_writes(&self) -> MutexGuard<'_, ()> {
        self.write_lock.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[async_trait]
impl<S: KeyValueStorage> PersistenceAdapter for LocalLogStorage<S> {
    async fn write(&self, entry: &LogEntry) -> Result<EntryId, PersistenceError> {
        self.modify(|entries| {
            match entries.iter_mut().find(|e| e.id == entry.id) {
                Some(existing) => *existing = entry.clone(),
                None => entries.push(entry.clone()),
            }
            Ok(entry.id.clone())
        })
    }

    async fn update(&self, id: &EntryId, patch: &EntryPatch) -> Result<(), PersistenceError> {
        self.modify(|entries| {
            let existing = entries
                .iter_mut()
                .find(|e| &e.id == id)
                .ok_or_else(|| PersistenceError::NotFound(id.clone()))?;
            *existing = patch
                .apply(existing)
                .map_err(|e| PersistenceError::Serialization(e.to_string()))?;
            Ok(())
        })
    }

    async fn delete(&self, id: &EntryId) -> Result<(), PersistenceError> {
        self.modify(|entries| {
            let position = entries
                .iter()
                .position(|e| &e.id == id)
                .ok_or_else(|| PersistenceError::NotFound(id.clone()))?;
            entries.remove(position);
            Ok(())
        })
    }

    async fn subscribe(&self, query: FeedQuery) -> Result<Subscription, PersistenceError> {
        let _guard = self.lock_writes();
        let current = self.load()?;
        Ok(self.feed.subscribe(query, &current))
    }
}

impl<S: KeyValueStorage> StoreObserver for LocalLogStorage<S> {
    fn on_change(
        &self,
        _change: &StoreChange,
        entries: &[LogEntry],
    ) -> Result<(), PersistenceError> {
        self.save(entries)
    }
}

#[cfg(test)]
mod local_log_storage_tests {
    use super::*;
    use crate::modules::work_logs::adapters::outbound::persistence::FeedEvent;
    use crate::shared::infrastructure::key_value::in_memory::InMemoryKeyValueStorage;
    use crate::tests::fixtures::entries::make_log_entry;
    use rstest::{fixture, rstest};
    use std::sync::Arc;

    #[fixture]
    fn storage() -> LocalLogStorage<InMemoryKeyValueStorage> {
        LocalLogStorage::new(InMemoryKeyValueStorage::new())
    }

    #[rstest]
    fn it_should_load_an_empty_collection_when_nothing_is_stored(
        storage: LocalLogStorage<InMemoryKeyValueStorage>,
    ) {
        assert!(storage.load().unwrap().is_empty());
    }

    #[rstest]
    fn it_should_save_and_load_the_whole_collection(
        storage: LocalLogStorage<InMemoryKeyValueStorage>,
    ) {
        let entries = vec![
            make_log_entry("doc-1", "Roofing"),
            make_log_entry("doc-2", "Plumbing"),
        ];
        storage.save(&entries).unwrap();
        assert_eq!(storage.load().unwrap(), entries);
    }

    #[rstest]
    fn it_should_report_corrupt_storage_as_a_serialization_error() {
        let kv = InMemoryKeyValueStorage::new();
        kv.set(STORAGE_KEY, "{not json".into()).unwrap();
        let storage = LocalLogStorage::new(kv);
        assert!(matches!(
            storage.load(),
            Err(PersistenceError::Serialization(_))
        ));
    }

    #[rstest]
    fn it_should_report_a_full_storage_from_the_observer() {
        let storage = LocalLogStorage::new(InMemoryKeyValueStorage::with_quota(16));
        let result = storage.on_change(
            &StoreChange::Added(EntryId::from("doc-1")),
            &[make_log_entry("doc-1", "Roofing")],
        );
        assert!(matches!(result, Err(PersistenceError::StorageFull { .. })));
    }

    #[rstest]
    #[tokio::test]
    async fn it_should_write_update_and_delete_documents(
        storage: LocalLogStorage<InMemoryKeyValueStorage>,
    ) {
        let entry = make_log_entry("doc-1", "Roofing");
        let id = storage.write(&entry).await.unwrap();
        assert_eq!(id, entry.id);

        let patch = EntryPatch {
            job_name: Some("Gutters".into()),
            ..EntryPatch::default()
        };
        storage.update(&id, &patch).await.unwrap();
        assert_eq!(storage.load().unwrap()[0].job_name, "Gutters");

        storage.delete(&id).await.unwrap();
        assert!(storage.load().unwrap().is_empty());
        assert_eq!(
            storage.delete(&id).await.unwrap_err(),
            PersistenceError::NotFound(id)
        );
    }

    #[rstest]
    #[tokio::test]
    async fn it_should_feed_snapshots_to_subscribers(
        storage: LocalLogStorage<InMemoryKeyValueStorage>,
    ) {
        let mut subscription = storage.subscribe(FeedQuery::all()).await.unwrap();
        assert_eq!(
            subscription.events.recv().await,
            Some(FeedEvent::Snapshot(vec![]))
        );
        storage.write(&make_log_entry("doc-1", "Roofing")).await.unwrap();
        assert!(matches!(
            subscription.events.recv().await,
            Some(FeedEvent::Snapshot(entries)) if entries.len() == 1
        ));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn it_should_end_every_subscription_on_the_latest_collection_under_concurrent_writes() {
        const WRITES: usize = 50;
        let storage = Arc::new(LocalLogStorage::new(InMemoryKeyValueStorage::new()));

        let writer = {
            let storage = storage.clone();
            tokio::spawn(async move {
                for n in 0..WRITES {
                    let entry = make_log_entry(&format!("doc-{n}"), "Roofing");
                    storage.write(&entry).await.unwrap();
                    tokio::task::yield_now().await;
                }
            })
        };
        let mut subscriptions = Vec::new();
        for _ in 0..WRITES {
            subscriptions.push(storage.subscribe(FeedQuery::all()).await.unwrap());
            tokio::task::yield_now().await;
        }
        writer.await.unwrap();

        for mut subscription in subscriptions {
            let mut last = None;
            while let Ok(FeedEvent::Snapshot(entries)) = subscription.events.try_recv() {
                last = Some(entries.len());
            }
            assert_eq!(last, Some(WRITES));
        }
    }
}
