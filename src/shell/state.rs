use crate::modules::work_logs::adapters::outbound::persistence::PersistenceAdapter;
use crate::modules::work_logs::core::store::EntryStore;
use crate::modules::work_logs::use_cases::sync::coordinator::{SyncCoordinator, SyncOptions};
use crate::modules::work_logs::use_cases::sync::handle::WorkLogHandle;
use crate::modules::work_logs::use_cases::view_today::projection::ViewProjection;
use crate::shared::core::primitives::Clock;
use crate::shared::infrastructure::connectivity::ConnectivityMonitor;
use chrono::Local;
use std::path::PathBuf;
use std::sync::Arc;

const COMMAND_BUFFER: usize = 64;

#[derive(Clone)]
pub struct AppState {
    pub work_log: WorkLogHandle,
    pub view: Arc<ViewProjection<Local>>,
    pub connectivity: ConnectivityMonitor,
    pub clock: Arc<dyn Clock>,
    pub export_dir: PathBuf,
}

impl AppState {
    /// Wires the view projection into `store` and spawns the sync coordinator loop.
    /// Must be called from within a tokio runtime.
    pub fn spawn<TRemote>(
        mut store: EntryStore,
        remote: Arc<TRemote>,
        clock: Arc<dyn Clock>,
        connectivity: ConnectivityMonitor,
        options: SyncOptions,
    ) -> Self
    where
        TRemote: PersistenceAdapter + 'static,
    {
        let view = Arc::new(ViewProjection::new(clock.clone(), Local).with_entries(store.all()));
        store.register(view.clone());

        let coordinator = SyncCoordinator::new(store, remote, clock.clone(), Local, options);
        let (work_log, commands) = WorkLogHandle::channel(COMMAND_BUFFER);
        tokio::spawn(coordinator.run(commands, connectivity.events()));

        Self {
            work_log,
            view,
            connectivity,
            clock,
            export_dir: PathBuf::from("exports"),
        }
    }

    pub fn with_export_dir(mut self, dir: PathBuf) -> Self {
        self.export_dir = dir;
        self
    }
}
