use crate::shared::infrastructure::connectivity::ConnectivityMonitor;
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::time::{MissedTickBehavior, interval, timeout};

/// Periodically checks that a TCP endpoint is reachable and feeds the result to a monitor.
pub struct ConnectivityProbe {
    target: String,
    every: Duration,
    connect_timeout: Duration,
}

impl ConnectivityProbe {
    pub fn new(target: impl Into<String>, every: Duration) -> Self {
        Self {
            target: target.into(),
            every,
            connect_timeout: Duration::from_secs(3),
        }
    }

    pub async fn check(&self) -> bool {
        matches!(
            timeout(self.connect_timeout, TcpStream::connect(self.target.as_str())).await,
            Ok(Ok(_))
        )
    }

    pub async fn run(self, monitor: ConnectivityMonitor) {
        let mut ticker = interval(self.every);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            let reachable = self.check().await;
            tracing::debug!(addr = %self.target, reachable, "connectivity probe");
            monitor.set(reachable);
        }
    }
}

#[cfg(test)]
mod connectivity_probe_tests {
    use super::*;
    use rstest::rstest;
    use tokio::net::TcpListener;

    #[rstest]
    #[tokio::test]
    async fn it_should_report_a_listening_endpoint_as_reachable() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let probe = ConnectivityProbe::new(addr.to_string(), Duration::from_secs(1));
        assert!(probe.check().await);
    }

    #[rstest]
    #[tokio::test]
    async fn it_should_report_a_closed_endpoint_as_unreachable() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);
        let probe = ConnectivityProbe::new(addr.to_string(), Duration::from_secs(1));
        assert!(!probe.check().await);
    }
}
