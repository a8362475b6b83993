use async_graphql::{Context, ID, InputObject, MaybeUndefined, Object, Result as GqlResult};
use chrono::{DateTime, NaiveDate, Utc};

use crate::modules::work_logs::core::entry::{EntryDraft, EntryId, EntryPatch, LogEntry};
use crate::modules::work_logs::core::sync_state::SyncStateKind;
use crate::modules::work_logs::use_cases::sync::coordinator::SyncStatus;
use crate::shell::state::AppState;

#[derive(async_graphql::SimpleObject, Clone)]
pub struct GqlLogEntry {
    pub id: ID,
    pub person_name: Option<String>,
    pub job_name: String,
    pub description: Option<String>,
    pub timestamp: DateTime<Utc>,
    pub duration_hours: f64,
}

impl From<LogEntry> for GqlLogEntry {
    fn from(v: LogEntry) -> Self {
        Self {
            id: ID(v.id.as_str().to_string()),
            person_name: v.person_name,
            job_name: v.job_name,
            description: v.description,
            timestamp: v.timestamp,
            duration_hours: v.duration_hours,
        }
    }
}

#[derive(async_graphql::SimpleObject, Clone)]
pub struct GqlDailyTotal {
    pub date: NaiveDate,
    pub hours: f64,
}

#[derive(async_graphql::Enum, Clone, Copy, PartialEq, Eq)]
pub enum GqlSyncState {
    Offline,
    Connecting,
    Synced,
    Error,
}

impl From<SyncStateKind> for GqlSyncState {
    fn from(v: SyncStateKind) -> Self {
        match v {
            SyncStateKind::Offline => GqlSyncState::Offline,
            SyncStateKind::Connecting => GqlSyncState::Connecting,
            SyncStateKind::Synced => GqlSyncState::Synced,
            SyncStateKind::Error => GqlSyncState::Error,
        }
    }
}

#[derive(async_graphql::SimpleObject, Clone)]
pub struct GqlSyncStatus {
    pub state: GqlSyncState,
    pub last_error: Option<String>,
    pub local_error: Option<String>,
    pub pending_writes: u64,
    pub banner: Option<String>,
}

impl From<SyncStatus> for GqlSyncStatus {
    fn from(v: SyncStatus) -> Self {
        Self {
            banner: v.banner(),
            state: v.state.into(),
            last_error: v.last_error,
            local_error: v.local_error,
            pending_writes: v.pending_writes as u64,
        }
    }
}

/// Fields left out are kept; an explicit `null` clears an optional field.
#[derive(InputObject)]
pub struct UpdateEntryInput {
    pub person_name: MaybeUndefined<String>,
    pub job_name: Option<String>,
    pub description: MaybeUndefined<String>,
    pub timestamp: Option<DateTime<Utc>>,
    pub duration_hours: Option<f64>,
}

impl From<UpdateEntryInput> for EntryPatch {
    fn from(v: UpdateEntryInput) -> Self {
        EntryPatch {
            person_name: clearable(v.person_name),
            job_name: v.job_name,
            description: clearable(v.description),
            timestamp: v.timestamp,
            duration_hours: v.duration_hours,
        }
    }
}

fn clearable(value: MaybeUndefined<String>) -> Option<Option<String>> {
    match value {
        MaybeUndefined::Undefined => None,
        MaybeUndefined::Null => Some(None),
        MaybeUndefined::Value(v) => Some(Some(v)),
    }
}

fn gql_error(e: impl std::fmt::Display) -> async_graphql::Error {
    async_graphql::Error::new(e.to_string())
}

pub struct QueryRoot;

#[Object]
impl QueryRoot {
    async fn today_entries(&self, context: &Context<'_>) -> Vec<GqlLogEntry> {
        let state = context.data_unchecked::<AppState>();
        state.view.today().entries.into_iter().map(Into::into).collect()
    }

    async fn entries(&self, context: &Context<'_>) -> GqlResult<Vec<GqlLogEntry>> {
        let state = context.data_unchecked::<AppState>();
        let entries = state.work_log.entries().await.map_err(gql_error)?;
        Ok(entries.into_iter().map(Into::into).collect())
    }

    async fn daily_totals(&self, context: &Context<'_>) -> Vec<GqlDailyTotal> {
        let state = context.data_unchecked::<AppState>();
        state
            .view
            .daily_totals()
            .into_iter()
            .map(|(date, hours)| GqlDailyTotal { date, hours })
            .collect()
    }

    async fn sync_status(&self, context: &Context<'_>) -> GqlResult<GqlSyncStatus> {
        let state = context.data_unchecked::<AppState>();
        let status = state.work_log.status().await.map_err(gql_error)?;
        Ok(status.into())
    }
}

pub struct MutationRoot;

#[Object]
impl MutationRoot {
    async fn add_entry(
        &self,
        context: &Context<'_>,
        person_name: Option<String>,
        job_name: String,
        description: Option<String>,
        timestamp: Option<DateTime<Utc>>,
        duration_hours: f64,
    ) -> GqlResult<ID> {
        let state = context.data_unchecked::<AppState>();
        let draft = EntryDraft {
            person_name,
            job_name,
            description,
            timestamp: timestamp.unwrap_or_else(|| state.clock.now()),
            duration_hours,
        };
        let id = state.work_log.add(draft).await.map_err(gql_error)?;
        Ok(ID(id.as_str().to_string()))
    }

    async fn update_entry(
        &self,
        context: &Context<'_>,
        id: ID,
        input: UpdateEntryInput,
    ) -> GqlResult<bool> {
        let state = context.data_unchecked::<AppState>();
        state
            .work_log
            .update(EntryId::from(id.0), input.into())
            .await
            .map_err(gql_error)?;
        Ok(true)
    }

    async fn remove_entry(&self, context: &Context<'_>, id: ID) -> GqlResult<bool> {
        let state = context.data_unchecked::<AppState>();
        state
            .work_log
            .remove(EntryId::from(id.0))
            .await
            .map_err(gql_error)?;
        Ok(true)
    }

    async fn retry_sync(&self, context: &Context<'_>) -> GqlResult<GqlSyncStatus> {
        let state = context.data_unchecked::<AppState>();
        let status = state.work_log.retry().await.map_err(gql_error)?;
        Ok(status.into())
    }
}
