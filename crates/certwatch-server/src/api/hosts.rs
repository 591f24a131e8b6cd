use crate::scan::reconciler::reconcile_hosts;
use crate::state::AppState;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use certwatch_common::types::{
    CreateHostRequest, ImportHostsRequest, ImportHostsResponse, MonitoredHost,
};

use super::error_response;

/// Accepts a bare DNS name as typed by an operator. Stored case-sensitive;
/// only surrounding whitespace is normalized away.
fn validate_hostname(raw: &str) -> Result<String, &'static str> {
    let hostname = raw.trim();
    if hostname.is_empty() {
        return Err("hostname cannot be empty");
    }
    if hostname.len() > 255 {
        return Err("hostname must be at most 255 characters");
    }
    if hostname.chars().any(char::is_whitespace) || hostname.contains("://") {
        return Err("hostname must be a bare DNS name");
    }
    Ok(hostname.to_string())
}

// GET /api/v1/hosts
async fn list_hosts(State(state): State<AppState>) -> impl IntoResponse {
    match state.host_store.list_hosts() {
        Ok(hosts) => Json(hosts).into_response(),
        Err(e) => error_response(
            StatusCode::INTERNAL_SERVER_ERROR,
            "storage_error",
            &format!("Query failed: {e}"),
        ),
    }
}

// POST /api/v1/hosts
async fn create_host(
    State(state): State<AppState>,
    Json(req): Json<CreateHostRequest>,
) -> impl IntoResponse {
    let hostname = match validate_hostname(&req.hostname) {
        Ok(h) => h,
        Err(msg) => return error_response(StatusCode::BAD_REQUEST, "invalid_hostname", msg),
    };

    match state.host_store.get_host_by_hostname(&hostname) {
        Ok(Some(_)) => {
            return error_response(
                StatusCode::CONFLICT,
                "duplicate_host",
                &format!("Host '{hostname}' already exists"),
            );
        }
        Err(e) => {
            return error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                "storage_error",
                &format!("Storage error: {e}"),
            );
        }
        _ => {}
    }

    let host = match state.host_store.insert_host(&hostname) {
        Ok(host) => host,
        Err(e) => {
            return error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                "storage_error",
                &format!("Failed to create host: {e}"),
            );
        }
    };

    // Best-effort initial scan: the host stays created even if this fails.
    scan_new_hosts(&state, std::slice::from_ref(&host)).await;

    match state.host_store.get_host_by_id(&host.id) {
        Ok(Some(host)) => (StatusCode::CREATED, Json(host)).into_response(),
        _ => (StatusCode::CREATED, Json(host)).into_response(),
    }
}

// POST /api/v1/hosts/import
async fn import_hosts(
    State(state): State<AppState>,
    Json(req): Json<ImportHostsRequest>,
) -> impl IntoResponse {
    if req.hostnames.is_empty() {
        return error_response(
            StatusCode::BAD_REQUEST,
            "empty_import",
            "Hostname list cannot be empty",
        );
    }

    let mut hostnames = Vec::with_capacity(req.hostnames.len());
    for raw in &req.hostnames {
        match validate_hostname(raw) {
            Ok(h) => hostnames.push(h),
            Err(msg) => {
                return error_response(
                    StatusCode::BAD_REQUEST,
                    "invalid_hostname",
                    &format!("'{raw}': {msg}"),
                );
            }
        }
    }

    let hosts = match state.host_store.insert_hosts_batch(&hostnames) {
        Ok(hosts) => hosts,
        Err(e) => {
            let msg = e.to_string();
            return if msg.contains("UNIQUE constraint") {
                error_response(StatusCode::CONFLICT, "duplicate_host", &msg)
            } else {
                error_response(
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "storage_error",
                    &format!("Failed to import hosts: {e}"),
                )
            };
        }
    };

    // Scan only the newly created subset. The import already committed;
    // a failing scan leaves the hosts unreachable with no record, which is
    // a valid steady state.
    let outcomes = scan_new_hosts(&state, &hosts).await;

    let mut refreshed = Vec::with_capacity(hosts.len());
    for host in hosts {
        match state.host_store.get_host_by_id(&host.id) {
            Ok(Some(h)) => refreshed.push(h),
            _ => refreshed.push(host),
        }
    }

    (
        StatusCode::CREATED,
        Json(ImportHostsResponse {
            hosts: refreshed,
            outcomes,
        }),
    )
        .into_response()
}

async fn scan_new_hosts(
    state: &AppState,
    hosts: &[MonitoredHost],
) -> Vec<certwatch_common::types::HostScanOutcome> {
    match reconcile_hosts(
        &state.host_store,
        hosts,
        state.probe_port,
        state.connect_timeout_secs,
    )
    .await
    {
        Ok(outcomes) => outcomes,
        Err(e) => {
            tracing::error!(error = %e, "Initial scan after host creation failed");
            Vec::new()
        }
    }
}

// DELETE /api/v1/hosts/:id
async fn delete_host(State(state): State<AppState>, Path(id): Path<String>) -> impl IntoResponse {
    match state.host_store.delete_host(&id) {
        Ok(true) => StatusCode::NO_CONTENT.into_response(),
        Ok(false) => error_response(StatusCode::NOT_FOUND, "not_found", "Host not found"),
        Err(e) => error_response(
            StatusCode::INTERNAL_SERVER_ERROR,
            "storage_error",
            &format!("Delete failed: {e}"),
        ),
    }
}

pub fn host_routes() -> Router<AppState> {
    Router::new()
        .route("/api/v1/hosts", get(list_hosts).post(create_host))
        .route("/api/v1/hosts/import", post(import_hosts))
        .route("/api/v1/hosts/:id", axum::routing::delete(delete_host))
}
