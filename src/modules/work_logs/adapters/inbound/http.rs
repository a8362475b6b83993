use axum::{
    Json,
    extract::{Path, State, rejection::JsonRejection},
    http::{StatusCode, header},
    response::{IntoResponse, Response},
};
use serde::Serialize;

use crate::modules::work_logs::core::entry::{EntryDraft, EntryId, EntryPatch};
use crate::modules::work_logs::core::errors::StoreError;
use crate::modules::work_logs::use_cases::export_csv::csv::{
    export_csv, export_file_name, parse_csv, write_export,
};
use crate::modules::work_logs::use_cases::sync::coordinator::SyncStatus;
use crate::modules::work_logs::use_cases::sync::handle::WorkLogError;
use crate::shared::core::primitives::local_date;
use crate::shell::state::AppState;

#[derive(Serialize)]
pub struct CreatedEntryResponse {
    pub id: EntryId,
}

#[derive(Serialize)]
pub struct SavedExportResponse {
    pub path: String,
}

#[derive(Serialize)]
pub struct ImportResponse {
    pub ids: Vec<EntryId>,
}

#[derive(Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

#[derive(Serialize)]
pub struct SyncStatusResponse {
    #[serde(flatten)]
    pub status: SyncStatus,
    pub banner: Option<String>,
}

impl From<SyncStatus> for SyncStatusResponse {
    fn from(status: SyncStatus) -> Self {
        let banner = status.banner();
        Self { status, banner }
    }
}

fn error_response(error: WorkLogError) -> Response {
    let status = match &error {
        WorkLogError::Store(StoreError::Validation(_)) => StatusCode::UNPROCESSABLE_ENTITY,
        WorkLogError::Store(StoreError::NotFound(_)) => StatusCode::NOT_FOUND,
        WorkLogError::Stopped => StatusCode::SERVICE_UNAVAILABLE,
    };
    (
        status,
        Json(ErrorResponse {
            error: error.to_string(),
        }),
    )
        .into_response()
}

pub async fn create_entry(
    State(state): State<AppState>,
    body: Result<Json<EntryDraft>, JsonRejection>,
) -> Response {
    let Json(draft) = match body {
        Ok(b) => b,
        Err(_) => return StatusCode::UNPROCESSABLE_ENTITY.into_response(),
    };
    match state.work_log.add(draft).await {
        Ok(id) => (StatusCode::CREATED, Json(CreatedEntryResponse { id })).into_response(),
        Err(e) => error_response(e),
    }
}

pub async fn list_entries(State(state): State<AppState>) -> Response {
    match state.work_log.entries().await {
        Ok(entries) => Json(entries).into_response(),
        Err(e) => error_response(e),
    }
}

pub async fn today(State(state): State<AppState>) -> Response {
    Json(state.view.today()).into_response()
}

pub async fn update_entry(
    State(state): State<AppState>,
    Path(id): Path<String>,
    body: Result<Json<EntryPatch>, JsonRejection>,
) -> Response {
    let Json(patch) = match body {
        Ok(b) => b,
        Err(_) => return StatusCode::UNPROCESSABLE_ENTITY.into_response(),
    };
    match state.work_log.update(EntryId::from(id), patch).await {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(e) => error_response(e),
    }
}

pub async fn delete_entry(State(state): State<AppState>, Path(id): Path<String>) -> Response {
    match state.work_log.remove(EntryId::from(id)).await {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(e) => error_response(e),
    }
}

pub async fn daily_totals(State(state): State<AppState>) -> Response {
    Json(state.view.daily_totals()).into_response()
}

pub async fn export(State(state): State<AppState>) -> Response {
    let entries = match state.work_log.entries().await {
        Ok(entries) => entries,
        Err(e) => return error_response(e),
    };
    let body = match export_csv(&entries) {
        Ok(body) => body,
        Err(e) => {
            tracing::error!(error = %e, "csv export failed");
            return StatusCode::INTERNAL_SERVER_ERROR.into_response();
        }
    };
    let file_name = export_file_name(local_date(state.clock.now(), &chrono::Local));
    (
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{file_name}\""),
            ),
        ],
        body,
    )
        .into_response()
}

/// Writes today's export file into the configured export directory.
pub async fn save_export(State(state): State<AppState>) -> Response {
    let entries = match state.work_log.entries().await {
        Ok(entries) => entries,
        Err(e) => return error_response(e),
    };
    let today = local_date(state.clock.now(), &chrono::Local);
    match write_export(&state.export_dir, &entries, today) {
        Ok(path) => (
            StatusCode::CREATED,
            Json(SavedExportResponse {
                path: path.display().to_string(),
            }),
        )
            .into_response(),
        Err(e) => {
            tracing::error!(error = %e, dir = %state.export_dir.display(), "writing csv export failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse {
                    error: e.to_string(),
                }),
            )
                .into_response()
        }
    }
}

/// Re-imports a previous export. Every row is validated before any is added.
pub async fn import(State(state): State<AppState>, body: String) -> Response {
    let records = match parse_csv(&body) {
        Ok(records) => records,
        Err(e) => {
            return (
                StatusCode::UNPROCESSABLE_ENTITY,
                Json(ErrorResponse {
                    error: e.to_string(),
                }),
            )
                .into_response();
        }
    };
    let drafts: Vec<EntryDraft> = records.into_iter().map(|r| r.into_draft()).collect();
    for (row, draft) in drafts.iter().enumerate() {
        if let Err(e) = draft.clone().into_entry(EntryId::tentative()) {
            return (
                StatusCode::UNPROCESSABLE_ENTITY,
                Json(ErrorResponse {
                    error: format!("row {}: {e}", row + 1),
                }),
            )
                .into_response();
        }
    }

    let mut ids = Vec::with_capacity(drafts.len());
    for draft in drafts {
        match state.work_log.add(draft).await {
            Ok(id) => ids.push(id),
            Err(e) => return error_response(e),
        }
    }
    tracing::info!(count = ids.len(), "csv import applied");
    (StatusCode::CREATED, Json(ImportResponse { ids })).into_response()
}

pub async fn sync_status(State(state): State<AppState>) -> Response {
    match state.work_log.status().await {
        Ok(status) => Json(SyncStatusResponse::from(status)).into_response(),
        Err(e) => error_response(e),
    }
}

pub async fn retry_sync(State(state): State<AppState>) -> Response {
    match state.work_log.retry().await {
        Ok(status) => Json(SyncStatusResponse::from(status)).into_response(),
        Err(e) => error_response(e),
    }
}

pub async fn set_connectivity(State(state): State<AppState>, Path(level): Path<String>) -> Response {
    match level.as_str() {
        "online" => state.connectivity.set_online(),
        "offline" => state.connectivity.set_offline(),
        _ => return StatusCode::NOT_FOUND.into_response(),
    }
    StatusCode::NO_CONTENT.into_response()
}
