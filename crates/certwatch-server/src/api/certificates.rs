use crate::scan::reconciler::reconcile_hosts;
use crate::state::AppState;
use axum::extract::State;
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use std::fmt::Write;

use super::error_response;

// GET /api/v1/certificates
async fn list_certificates(State(state): State<AppState>) -> impl IntoResponse {
    match state.host_store.list_certificates() {
        Ok(certs) => Json(certs).into_response(),
        Err(e) => error_response(
            StatusCode::INTERNAL_SERVER_ERROR,
            "storage_error",
            &format!("Query failed: {e}"),
        ),
    }
}

// GET /api/v1/certificates/export
async fn export_certificates_csv(State(state): State<AppState>) -> impl IntoResponse {
    let certs = match state.host_store.list_certificates() {
        Ok(certs) => certs,
        Err(e) => {
            return error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                "storage_error",
                &format!("Query failed: {e}"),
            );
        }
    };

    let mut body =
        String::from("hostname,serial_number,expires_at,days_until_expiry,retrieved_at\n");
    for c in &certs {
        let _ = writeln!(
            body,
            "{},{},{},{},{}",
            c.hostname,
            c.serial_number,
            c.expires_at.to_rfc3339(),
            c.days_until_expiry,
            c.retrieved_at.to_rfc3339(),
        );
    }

    (
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8"),
            (
                header::CONTENT_DISPOSITION,
                "attachment; filename=\"certificates.csv\"",
            ),
        ],
        body,
    )
        .into_response()
}

// POST /api/v1/certificates/refresh
//
// Walks the full current host set synchronously and returns per-host
// outcomes once persistence is done. Deliberately leaves Schedule State
// alone: an operator-triggered pass is not part of the periodic cadence
// and must not shift the displayed next-run estimate.
async fn refresh_certificates(State(state): State<AppState>) -> impl IntoResponse {
    let hosts = match state.host_store.list_hosts() {
        Ok(hosts) => hosts,
        Err(e) => {
            return error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                "storage_error",
                &format!("Query failed: {e}"),
            );
        }
    };

    match reconcile_hosts(
        &state.host_store,
        &hosts,
        state.probe_port,
        state.connect_timeout_secs,
    )
    .await
    {
        Ok(outcomes) => Json(outcomes).into_response(),
        Err(e) => error_response(
            StatusCode::INTERNAL_SERVER_ERROR,
            "storage_error",
            &format!("Refresh failed: {e}"),
        ),
    }
}

pub fn certificate_routes() -> Router<AppState> {
    Router::new()
        .route("/api/v1/certificates", get(list_certificates))
        .route("/api/v1/certificates/export", get(export_certificates_csv))
        .route("/api/v1/certificates/refresh", post(refresh_certificates))
}
