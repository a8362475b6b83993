use crate::modules::work_logs::adapters::outbound::document_store_in_memory::InMemoryDocumentStore;
use crate::modules::work_logs::adapters::outbound::local_storage::LocalLogStorage;
use crate::modules::work_logs::core::entry::{EntryPatch, LogEntry};
use crate::modules::work_logs::core::store::EntryStore;
use crate::modules::work_logs::core::sync_state::SyncStateKind;
use crate::modules::work_logs::use_cases::sync::coordinator::{SyncOptions, SyncStatus};
use crate::modules::work_logs::use_cases::sync::outbox::RetryPolicy;
use crate::shared::core::primitives::FixedClock;
use crate::shared::infrastructure::connectivity::ConnectivityMonitor;
use crate::shared::infrastructure::key_value::in_memory::InMemoryKeyValueStorage;
use crate::shell::state::AppState;
use crate::tests::fixtures::entries::{EntryDraftBuilder, fixed_timestamp};
use std::sync::Arc;
use std::time::Duration;

struct Device {
    app: AppState,
    local: Arc<LocalLogStorage<InMemoryKeyValueStorage>>,
    remote: Arc<InMemoryDocumentStore>,
}

fn start_device(online: bool) -> Device {
    let local = Arc::new(LocalLogStorage::new(InMemoryKeyValueStorage::new()));
    let remote = Arc::new(InMemoryDocumentStore::new());
    let mut store = EntryStore::new();
    store.register(local.clone());
    let app = AppState::spawn(
        store,
        remote.clone(),
        Arc::new(FixedClock::new(fixed_timestamp())),
        ConnectivityMonitor::new(online),
        SyncOptions {
            retry: RetryPolicy::no_retry(),
            ..SyncOptions::default()
        },
    );
    Device { app, local, remote }
}

async fn wait_until(device: &Device, done: impl Fn(&SyncStatus, &[LogEntry]) -> bool) -> SyncStatus {
    for _ in 0..200 {
        let status = device.app.work_log.status().await.unwrap();
        let entries = device.app.work_log.entries().await.unwrap();
        if done(&status, &entries) {
            return status;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    panic!("condition not reached");
}

fn sorted_ids(entries: &[LogEntry]) -> Vec<String> {
    let mut ids: Vec<_> = entries.iter().map(|e| e.id.as_str().to_string()).collect();
    ids.sort();
    ids
}

#[tokio::test]
async fn offline_edits_reach_the_remote_once_connectivity_returns() {
    let device = start_device(false);
    let work_log = &device.app.work_log;

    let first = work_log.add(EntryDraftBuilder::new().build()).await.unwrap();
    let second = work_log
        .add(EntryDraftBuilder::new().job_name("Plumbing").build())
        .await
        .unwrap();
    work_log
        .update(
            first.clone(),
            EntryPatch {
                duration_hours: Some(2.5),
                ..EntryPatch::default()
            },
        )
        .await
        .unwrap();
    work_log.remove(second).await.unwrap();

    assert_eq!(device.remote.request_count(), 0);
    assert_eq!(device.local.load().unwrap().len(), 1);
    assert_eq!(device.app.view.today().total_hours, 2.5);

    device.app.connectivity.set_online();
    let remote = device.remote.clone();
    wait_until(&device, |status, entries| {
        status.state == SyncStateKind::Synced
            && status.pending_writes == 0
            && entries.len() == 1
            && !entries[0].id.is_tentative()
    })
    .await;

    let documents = remote.documents().await;
    assert_eq!(documents.len(), 1);
    assert_eq!(documents[0].duration_hours, 2.5);
    assert_eq!(
        sorted_ids(&device.local.load().unwrap()),
        sorted_ids(&documents)
    );
}

#[tokio::test]
async fn a_failed_remote_write_keeps_the_entry_and_recovers_on_retry() {
    let device = start_device(true);
    wait_until(&device, |status, _| status.state == SyncStateKind::Synced).await;

    device.remote.toggle_offline();
    let id = device
        .app
        .work_log
        .add(EntryDraftBuilder::new().build())
        .await
        .unwrap();
    let status = wait_until(&device, |status, _| status.state == SyncStateKind::Error).await;
    assert_eq!(status.pending_writes, 1);
    assert!(status.banner().unwrap().contains("Document store offline"));
    assert!(device.app.work_log.get(id).await.is_ok());

    device.remote.toggle_offline();
    device.app.work_log.retry().await.unwrap();
    wait_until(&device, |status, entries| {
        status.state == SyncStateKind::Synced && status.pending_writes == 0 && entries.len() == 1
    })
    .await;
    assert_eq!(device.remote.documents().await.len(), 1);
}

#[tokio::test]
async fn going_offline_suspends_the_remote_until_connectivity_returns() {
    let device = start_device(true);
    wait_until(&device, |status, _| status.state == SyncStateKind::Synced).await;

    device.app.connectivity.set_offline();
    wait_until(&device, |status, _| status.state == SyncStateKind::Offline).await;
    assert!(!device.remote.is_network_enabled());
    assert_eq!(device.remote.subscriber_count(), 0);

    let requests = device.remote.request_count();
    device
        .app
        .work_log
        .add(EntryDraftBuilder::new().build())
        .await
        .unwrap();
    let status = device.app.work_log.status().await.unwrap();
    assert_eq!(status.pending_writes, 1);
    assert_eq!(device.remote.request_count(), requests);
}
