use crate::state::AppState;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};
use certwatch_common::types::StatsSummary;
use chrono::Utc;

use super::error_response;

// GET /api/v1/stats
async fn get_stats(State(state): State<AppState>) -> impl IntoResponse {
    let store = &state.host_store;
    let summary = (|| -> anyhow::Result<StatsSummary> {
        let last_scan_at = store.latest_retrieved_at()?;
        let days_since_last_scan =
            last_scan_at.map(|ts| (Utc::now() - ts).num_days().max(0));
        Ok(StatsSummary {
            hosts_monitored: store.count_hosts()?,
            certificates_with_data: store.count_certificates()?,
            expiring_within_30_days: store.count_expiring_within(30)?,
            expiring_within_60_days: store.count_expiring_within(60)?,
            unreachable_hosts: store.count_unreachable_hosts()?,
            last_scan_at,
            days_since_last_scan,
        })
    })();

    match summary {
        Ok(summary) => Json(summary).into_response(),
        Err(e) => error_response(
            StatusCode::INTERNAL_SERVER_ERROR,
            "storage_error",
            &format!("Query failed: {e}"),
        ),
    }
}

pub fn stats_routes() -> Router<AppState> {
    Router::new().route("/api/v1/stats", get(get_stats))
}
