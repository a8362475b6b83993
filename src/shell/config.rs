// Runtime configuration, read from the environment (and a `.env` file when present).
//
// Variables:
// - WORK_LOGS_ADDR                  listen address (default 127.0.0.1:8080)
// - WORK_LOGS_DATA_DIR              device-local storage (default ./data)
// - WORK_LOGS_SHARED_DIR            file-backed remote collection (default ./data/shared)
// - WORK_LOGS_FEED_SCOPE            all | today (default all)
// - WORK_LOGS_RETRY_ATTEMPTS        attempts per remote write (default 3)
// - WORK_LOGS_RETRY_BACKOFF_MS      first retry delay (default 200)
// - WORK_LOGS_PROBE_ADDR            host:port whose reachability drives connectivity (optional)
// - WORK_LOGS_PROBE_INTERVAL_SECS   probe period (default 10)
// - WORK_LOGS_START_ONLINE          initial connectivity level (default true)
// - WORK_LOGS_EXPORT_DIR            where POST /exports writes files (default <data dir>/exports)

use crate::modules::work_logs::adapters::outbound::persistence::FeedScope;
use crate::modules::work_logs::use_cases::sync::coordinator::SyncOptions;
use crate::modules::work_logs::use_cases::sync::outbox::RetryPolicy;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("invalid value {value:?} for {key}: {reason}")]
    Invalid {
        key: &'static str,
        value: String,
        reason: String,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct AppConfig {
    pub addr: SocketAddr,
    pub data_dir: PathBuf,
    pub shared_dir: PathBuf,
    pub export_dir: PathBuf,
    pub feed_scope: FeedScope,
    pub retry: RetryPolicy,
    pub probe_addr: Option<String>,
    pub probe_interval: Duration,
    pub start_online: bool,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        if let Err(e) = dotenvy::dotenv() {
            if !e.not_found() {
                tracing::warn!(error = %e, "ignoring unreadable .env file");
            }
        }
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let data_dir: PathBuf = lookup("WORK_LOGS_DATA_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("./data"));
        let shared_dir = lookup("WORK_LOGS_SHARED_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|| data_dir.join("shared"));
        let export_dir = lookup("WORK_LOGS_EXPORT_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|| data_dir.join("exports"));

        let feed_scope = match lookup("WORK_LOGS_FEED_SCOPE").as_deref() {
            None | Some("all") => FeedScope::All,
            Some("today") => FeedScope::Today,
            Some(other) => {
                return Err(ConfigError::Invalid {
                    key: "WORK_LOGS_FEED_SCOPE",
                    value: other.to_string(),
                    reason: "expected all or today".into(),
                });
            }
        };

        let max_attempts: u32 = parse(&lookup, "WORK_LOGS_RETRY_ATTEMPTS", 3)?;
        if max_attempts == 0 {
            return Err(ConfigError::Invalid {
                key: "WORK_LOGS_RETRY_ATTEMPTS",
                value: "0".into(),
                reason: "at least one attempt is required".into(),
            });
        }
        let backoff_ms: u64 = parse(&lookup, "WORK_LOGS_RETRY_BACKOFF_MS", 200)?;

        Ok(Self {
            addr: parse(&lookup, "WORK_LOGS_ADDR", SocketAddr::from(([127, 0, 0, 1], 8080)))?,
            data_dir,
            shared_dir,
            export_dir,
            feed_scope,
            retry: RetryPolicy {
                max_attempts,
                base_backoff: Duration::from_millis(backoff_ms),
                ..RetryPolicy::default()
            },
            probe_addr: lookup("WORK_LOGS_PROBE_ADDR").filter(|v| !v.trim().is_empty()),
            probe_interval: Duration::from_secs(parse(
                &lookup,
                "WORK_LOGS_PROBE_INTERVAL_SECS",
                10,
            )?),
            start_online: parse(&lookup, "WORK_LOGS_START_ONLINE", true)?,
        })
    }

    pub fn sync_options(&self) -> SyncOptions {
        SyncOptions {
            scope: self.feed_scope,
            retry: self.retry,
        }
    }
}

fn parse<T>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &'static str,
    default: T,
) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(key) {
        None => Ok(default),
        Some(raw) => raw.trim().parse().map_err(|e: T::Err| ConfigError::Invalid {
            key,
            value: raw.clone(),
            reason: e.to_string(),
        }),
    }
}
