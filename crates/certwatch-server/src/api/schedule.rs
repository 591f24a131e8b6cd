use crate::state::AppState;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};
use certwatch_common::types::UpdateScheduleRequest;

use super::error_response;

// GET /api/v1/schedule
async fn get_schedule(State(state): State<AppState>) -> impl IntoResponse {
    Json(state.schedule.snapshot())
}

// PUT /api/v1/schedule
//
// Changes the interval for subsequent runs; an already-computed next-run
// is not retroactively recomputed.
async fn update_schedule(
    State(state): State<AppState>,
    Json(req): Json<UpdateScheduleRequest>,
) -> impl IntoResponse {
    if req.interval_hours == 0 {
        return error_response(
            StatusCode::BAD_REQUEST,
            "invalid_interval",
            "Interval must be at least one hour",
        );
    }
    state.schedule.set_interval_hours(req.interval_hours);
    Json(state.schedule.snapshot()).into_response()
}

pub fn schedule_routes() -> Router<AppState> {
    Router::new().route("/api/v1/schedule", get(get_schedule).put(update_schedule))
}
