// Connectivity notifier.
//
// Purpose
// - Turn "is the network reachable" into edge-triggered Online / Offline signals.
//
// Responsibilities
// - Hold the current level in a watch channel; hand out event streams that only fire on edges.
// - Serve as the test double as well: tests flip the level by hand.

pub mod probe;

use serde::Serialize;
use std::sync::Arc;
use tokio::sync::watch;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectivitySignal {
    Online,
    Offline,
}

#[derive(Debug, Clone)]
pub struct ConnectivityMonitor {
    online: Arc<watch::Sender<bool>>,
}

impl ConnectivityMonitor {
    pub fn new(initially_online: bool) -> Self {
        let (online, _) = watch::channel(initially_online);
        Self {
            online: Arc::new(online),
        }
    }

    pub fn is_online(&self) -> bool {
        *self.online.borrow()
    }

    pub fn set_online(&self) {
        self.set(true);
    }

    pub fn set_offline(&self) {
        self.set(false);
    }

    pub fn set(&self, online: bool) {
        let changed = self.online.send_if_modified(|current| {
            if *current == online {
                return false;
            }
            *current = online;
            true
        });
        if changed {
            tracing::info!(online, "connectivity changed");
        }
    }

    pub fn events(&self) -> ConnectivityEvents {
        let mut receiver = self.online.subscribe();
        let last = *receiver.borrow_and_update();
        ConnectivityEvents { receiver, last }
    }
}

pub struct ConnectivityEvents {
    receiver: watch::Receiver<bool>,
    last: bool,
}

impl ConnectivityEvents {
    /// The level observed when this stream was created or last yielded.
    pub fn current(&self) -> ConnectivitySignal {
        signal_for(self.last)
    }

    /// Waits for the next edge. `None` once the monitor is gone.
    pub async fn next(&mut self) -> Option<ConnectivitySignal> {
        loop {
            self.receiver.changed().await.ok()?;
            let online = *self.receiver.borrow_and_update();
            if online != self.last {
                self.last = online;
                return Some(signal_for(online));
            }
        }
    }
}

fn signal_for(online: bool) -> ConnectivitySignal {
    if online {
        ConnectivitySignal::Online
    } else {
        ConnectivitySignal::Offline
    }
}

#[cfg(test)]
mod connectivity_monitor_tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[tokio::test]
    async fn it_should_emit_edges_only() {
        let monitor = ConnectivityMonitor::new(false);
        let mut events = monitor.events();
        assert_eq!(events.current(), ConnectivitySignal::Offline);

        monitor.set_offline();
        monitor.set_online();
        assert_eq!(events.next().await, Some(ConnectivitySignal::Online));

        monitor.set_online();
        monitor.set_offline();
        assert_eq!(events.next().await, Some(ConnectivitySignal::Offline));
        assert!(!monitor.is_online());
    }

    #[rstest]
    #[tokio::test]
    async fn it_should_end_the_stream_when_the_monitor_is_dropped() {
        let monitor = ConnectivityMonitor::new(true);
        let mut events = monitor.events();
        drop(monitor);
        assert_eq!(events.next().await, None);
    }
}
