use axum::{
    Router,
    routing::{get, patch, post},
};

use crate::modules::work_logs::adapters::inbound::http as work_logs_http;
use crate::shell::state::AppState;

pub fn router(state: AppState) -> Router {
    Router::new()
        .route(
            "/entries",
            post(work_logs_http::create_entry).get(work_logs_http::list_entries),
        )
        .route("/entries/today", get(work_logs_http::today))
        .route(
            "/entries/{id}",
            patch(work_logs_http::update_entry).delete(work_logs_http::delete_entry),
        )
        .route("/totals", get(work_logs_http::daily_totals))
        .route("/export.csv", get(work_logs_http::export))
        .route("/exports", post(work_logs_http::save_export))
        .route("/import.csv", post(work_logs_http::import))
        .route("/sync/status", get(work_logs_http::sync_status))
        .route("/sync/retry", post(work_logs_http::retry_sync))
        .route("/connectivity/{level}", post(work_logs_http::set_connectivity))
        .with_state(state)
}
