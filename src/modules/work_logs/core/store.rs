// Authoritative in-memory collection of log entries.
//
// Responsibilities
// - Enforce entry invariants (unique ids, validated records) on every mutation.
// - Notify registered observers synchronously, in the order mutations are applied.
//
// Boundaries
// - No I/O here. Observers (local persistence, view projection) do their own work and
//   report failures back as faults; a failing observer never undoes a mutation.

use crate::modules::work_logs::core::entry::{EntryDraft, EntryId, EntryPatch, LogEntry};
use crate::modules::work_logs::core::errors::{PersistenceError, StoreError, ValidationError};
use std::collections::HashSet;
use std::sync::Arc;

#[derive(Debug, Clone, PartialEq)]
pub enum StoreChange {
    Added(EntryId),
    Updated(EntryId),
    Removed(EntryId),
    Rekeyed { from: EntryId, to: EntryId },
    /// The whole collection was swapped for a remote snapshot.
    SnapshotReplaced { count: usize },
}

pub trait StoreObserver: Send + Sync {
    fn on_change(&self, change: &StoreChange, entries: &[LogEntry])
    -> Result<(), PersistenceError>;
}

#[derive(Default)]
pub struct EntryStore {
    entries: Vec<LogEntry>,
    observers: Vec<Arc<dyn StoreObserver>>,
    faults: Vec<PersistenceError>,
}

impl EntryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuilds a store from persisted entries.
    pub fn from_entries(entries: Vec<LogEntry>) -> Result<Self, StoreError> {
        ensure_unique(&entries)?;
        for entry in &entries {
            entry.validate()?;
        }
        Ok(Self {
            entries,
            ..Self::default()
        })
    }

    pub fn register(&mut self, observer: Arc<dyn StoreObserver>) {
        self.observers.push(observer);
    }

    pub fn add(&mut self, draft: EntryDraft) -> Result<EntryId, StoreError> {
        let entry = draft.into_entry(EntryId::tentative())?;
        let id = entry.id.clone();
        self.entries.push(entry);
        self.notify(StoreChange::Added(id.clone()));
        Ok(id)
    }

    pub fn update(&mut self, id: &EntryId, patch: &EntryPatch) -> Result<(), StoreError> {
        let position = self.position(id)?;
        let next = patch.apply(&self.entries[position])?;
        self.entries[position] = next;
        self.notify(StoreChange::Updated(id.clone()));
        Ok(())
    }

    pub fn remove(&mut self, id: &EntryId) -> Result<LogEntry, StoreError> {
        let position = self.position(id)?;
        let removed = self.entries.remove(position);
        self.notify(StoreChange::Removed(id.clone()));
        Ok(removed)
    }

    pub fn get(&self, id: &EntryId) -> Result<&LogEntry, StoreError> {
        self.entries
            .iter()
            .find(|e| &e.id == id)
            .ok_or_else(|| StoreError::NotFound(id.clone()))
    }

    pub fn all(&self) -> &[LogEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Snapshot replacement: the delivered set becomes the whole store, last writer wins.
    /// Entries that fail validation or repeat an id are skipped.
    pub fn replace_all(&mut self, snapshot: Vec<LogEntry>) -> usize {
        let mut seen = HashSet::new();
        let mut accepted = Vec::with_capacity(snapshot.len());
        for entry in snapshot {
            if let Err(e) = entry.validate() {
                tracing::warn!(id = %entry.id, error = %e, "skipping invalid entry in snapshot");
                continue;
            }
            if !seen.insert(entry.id.clone()) {
                tracing::warn!(id = %entry.id, "skipping duplicate entry in snapshot");
                continue;
            }
            accepted.push(entry);
        }
        let count = accepted.len();
        self.entries = accepted;
        self.notify(StoreChange::SnapshotReplaced { count });
        count
    }

    /// Swaps a tentative id for the one a remote store assigned.
    pub fn rekey(&mut self, from: &EntryId, to: EntryId) -> Result<(), StoreError> {
        if from == &to {
            return Ok(());
        }
        if self.entries.iter().any(|e| e.id == to) {
            return Err(ValidationError::DuplicateId(to).into());
        }
        let position = self.position(from)?;
        self.entries[position].id = to.clone();
        self.notify(StoreChange::Rekeyed {
            from: from.clone(),
            to,
        });
        Ok(())
    }

    /// Observer failures collected since the last call.
    pub fn take_faults(&mut self) -> Vec<PersistenceError> {
        std::mem::take(&mut self.faults)
    }

    fn position(&self, id: &EntryId) -> Result<usize, StoreError> {
        self.entries
            .iter()
            .position(|e| &e.id == id)
            .ok_or_else(|| StoreError::NotFound(id.clone()))
    }

    fn notify(&mut self, change: StoreChange) {
        for observer in &self.observers {
            if let Err(e) = observer.on_change(&change, &self.entries) {
                tracing::error!(error = %e, ?change, "store observer failed");
                self.faults.push(e);
            }
        }
    }
}

fn ensure_unique(entries: &[LogEntry]) -> Result<(), ValidationError> {
    let mut seen = HashSet::new();
    for entry in entries {
        if !seen.insert(&entry.id) {
            return Err(ValidationError::DuplicateId(entry.id.clone()));
        }
    }
    Ok(())
}

#[cfg(test)]
mod work_log_entry_store_tests {
    use super::*;
    use crate::tests::fixtures::entries::{EntryDraftBuilder, RecordingObserver, make_log_entry};
    use rstest::{fixture, rstest};

    #[fixture]
    fn before_each() -> (EntryStore, Arc<RecordingObserver>) {
        let mut store = EntryStore::new();
        let observer = Arc::new(RecordingObserver::default());
        store.register(observer.clone());
        (store, observer)
    }

    #[rstest]
    fn it_should_add_and_get_the_entry(before_each: (EntryStore, Arc<RecordingObserver>)) {
        let (mut store, _) = before_each;
        let draft = EntryDraftBuilder::new().build();
        let id = store.add(draft.clone()).unwrap();
        let entry = store.get(&id).unwrap();
        assert_eq!(entry.job_name, draft.job_name);
        assert_eq!(entry.description, draft.description);
        assert_eq!(entry.person_name, draft.person_name);
        assert_eq!(entry.timestamp, draft.timestamp);
        assert_eq!(entry.duration_hours, draft.duration_hours);
        assert!(id.is_tentative());
    }

    #[rstest]
    fn it_should_reject_an_invalid_draft_without_notifying(
        before_each: (EntryStore, Arc<RecordingObserver>),
    ) {
        let (mut store, observer) = before_each;
        let result = store.add(EntryDraftBuilder::new().job_name("").build());
        assert_eq!(
            result.unwrap_err(),
            StoreError::Validation(ValidationError::EmptyJobName)
        );
        assert!(store.is_empty());
        assert!(observer.changes().is_empty());
    }

    #[rstest]
    fn it_should_update_only_the_patched_fields(before_each: (EntryStore, Arc<RecordingObserver>)) {
        let (mut store, _) = before_each;
        let id = store.add(EntryDraftBuilder::new().build()).unwrap();
        let before = store.get(&id).unwrap().clone();
        let patch = EntryPatch {
            job_name: Some("Fence repair".into()),
            ..EntryPatch::default()
        };
        store.update(&id, &patch).unwrap();
        let after = store.get(&id).unwrap();
        assert_eq!(after.job_name, "Fence repair");
        assert_eq!(after.description, before.description);
        assert_eq!(after.duration_hours, before.duration_hours);
        assert_eq!(after.timestamp, before.timestamp);
    }

    #[rstest]
    fn it_should_fail_to_update_or_remove_an_unknown_id(
        before_each: (EntryStore, Arc<RecordingObserver>),
    ) {
        let (mut store, _) = before_each;
        let id = EntryId::from("missing");
        assert_eq!(
            store.update(&id, &EntryPatch::default()).unwrap_err(),
            StoreError::NotFound(id.clone())
        );
        assert_eq!(store.remove(&id).unwrap_err(), StoreError::NotFound(id));
    }

    #[rstest]
    fn it_should_remove_the_entry(before_each: (EntryStore, Arc<RecordingObserver>)) {
        let (mut store, _) = before_each;
        let id = store.add(EntryDraftBuilder::new().build()).unwrap();
        store.remove(&id).unwrap();
        assert_eq!(store.get(&id).unwrap_err(), StoreError::NotFound(id));
    }

    #[rstest]
    fn it_should_notify_observers_in_the_order_applied(
        before_each: (EntryStore, Arc<RecordingObserver>),
    ) {
        let (mut store, observer) = before_each;
        let id = store.add(EntryDraftBuilder::new().build()).unwrap();
        store
            .update(
                &id,
                &EntryPatch {
                    duration_hours: Some(3.0),
                    ..EntryPatch::default()
                },
            )
            .unwrap();
        store.remove(&id).unwrap();
        assert_eq!(
            observer.changes(),
            vec![
                StoreChange::Added(id.clone()),
                StoreChange::Updated(id.clone()),
                StoreChange::Removed(id),
            ]
        );
    }

    #[rstest]
    fn it_should_replace_the_whole_collection_with_a_snapshot(
        before_each: (EntryStore, Arc<RecordingObserver>),
    ) {
        let (mut store, observer) = before_each;
        store.add(EntryDraftBuilder::new().build()).unwrap();
        let snapshot = vec![
            make_log_entry("doc-1", "Roofing"),
            make_log_entry("doc-2", "Plumbing"),
            make_log_entry("doc-2", "Plumbing again"),
        ];
        assert_eq!(store.replace_all(snapshot), 2);
        let ids: Vec<_> = store.all().iter().map(|e| e.id.as_str().to_string()).collect();
        assert_eq!(ids, vec!["doc-1", "doc-2"]);
        assert_eq!(
            observer.changes().last(),
            Some(&StoreChange::SnapshotReplaced { count: 2 })
        );
    }

    #[rstest]
    fn it_should_rekey_a_tentative_entry(before_each: (EntryStore, Arc<RecordingObserver>)) {
        let (mut store, _) = before_each;
        let id = store.add(EntryDraftBuilder::new().build()).unwrap();
        store.rekey(&id, EntryId::from("doc-9")).unwrap();
        assert!(store.get(&id).is_err());
        assert!(store.get(&EntryId::from("doc-9")).is_ok());
    }

    #[rstest]
    fn it_should_refuse_to_rekey_onto_an_existing_id() {
        let mut store = EntryStore::from_entries(vec![
            make_log_entry("doc-1", "Roofing"),
            make_log_entry("doc-2", "Plumbing"),
        ])
        .unwrap();
        let result = store.rekey(&EntryId::from("doc-1"), EntryId::from("doc-2"));
        assert_eq!(
            result.unwrap_err(),
            StoreError::Validation(ValidationError::DuplicateId(EntryId::from("doc-2")))
        );
    }

    #[rstest]
    fn it_should_refuse_duplicate_ids_when_rebuilding() {
        let result = EntryStore::from_entries(vec![
            make_log_entry("doc-1", "Roofing"),
            make_log_entry("doc-1", "Roofing"),
        ]);
        assert!(matches!(
            result,
            Err(StoreError::Validation(ValidationError::DuplicateId(_)))
        ));
    }

    #[rstest]
    fn it_should_keep_the_mutation_and_collect_observer_faults(
        before_each: (EntryStore, Arc<RecordingObserver>),
    ) {
        let (mut store, observer) = before_each;
        observer.fail_with(PersistenceError::StorageFull {
            needed: 10,
            available: 0,
        });
        let id = store.add(EntryDraftBuilder::new().build()).unwrap();
        assert!(store.get(&id).is_ok());
        let faults = store.take_faults();
        assert_eq!(faults.len(), 1);
        assert!(store.take_faults().is_empty());
    }
}
