pub mod certificates;
pub mod hosts;
pub mod schedule;
pub mod stats;

use crate::state::AppState;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use chrono::Utc;
use serde::Serialize;
use serde_json::json;

#[derive(Serialize)]
pub struct ApiError {
    pub error: String,
    pub code: String,
}

pub fn error_response(status: StatusCode, code: &str, msg: &str) -> Response {
    (
        status,
        Json(ApiError {
            error: msg.to_string(),
            code: code.to_string(),
        }),
    )
        .into_response()
}

// GET /api/v1/health
async fn health(State(state): State<AppState>) -> impl IntoResponse {
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
        "uptime_secs": (Utc::now() - state.start_time).num_seconds(),
    }))
}

pub fn health_routes() -> Router<AppState> {
    Router::new().route("/api/v1/health", get(health))
}
