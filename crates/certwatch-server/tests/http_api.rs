mod common;

use axum::http::StatusCode;
use chrono::{DateTime, Duration, Utc};
use common::{
    build_test_context, build_test_context_with_probe_port, request_json, request_raw,
    TlsTestServer,
};
use serde_json::json;

#[tokio::test]
async fn health_returns_ok() {
    let ctx = build_test_context().expect("test context should build");
    let (status, body) = request_json(&ctx.app, "GET", "/api/v1/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert!(body["version"].is_string());
}

#[tokio::test]
async fn create_host_rejects_invalid_hostnames() {
    let ctx = build_test_context().expect("test context should build");

    let (status, body) =
        request_json(&ctx.app, "POST", "/api/v1/hosts", Some(json!({"hostname": ""}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "invalid_hostname");

    let (status, _) = request_json(
        &ctx.app,
        "POST",
        "/api/v1/hosts",
        Some(json!({"hostname": "https://example.com"})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = request_json(
        &ctx.app,
        "POST",
        "/api/v1/hosts",
        Some(json!({"hostname": "two words"})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn create_host_survives_failed_initial_probe() {
    let ctx = build_test_context().expect("test context should build");

    // .invalid never resolves, so the post-creation probe fails; the host
    // must be created regardless.
    let (status, body) = request_json(
        &ctx.app,
        "POST",
        "/api/v1/hosts",
        Some(json!({"hostname": "alpha.invalid"})),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["hostname"], "alpha.invalid");
    assert_eq!(body["reachable"], false);
    assert!(body["last_checked_at"].is_string());
    assert!(body["last_reachable_at"].is_null());

    let (status, body) = request_json(&ctx.app, "GET", "/api/v1/hosts", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.as_array().unwrap().len(), 1);

    let (status, body) = request_json(&ctx.app, "GET", "/api/v1/certificates", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.as_array().unwrap().len(), 0);
}

#[tokio::test]
async fn duplicate_host_is_a_conflict() {
    let ctx = build_test_context().expect("test context should build");
    let (status, _) = request_json(
        &ctx.app,
        "POST",
        "/api/v1/hosts",
        Some(json!({"hostname": "dup.invalid"})),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, body) = request_json(
        &ctx.app,
        "POST",
        "/api/v1/hosts",
        Some(json!({"hostname": "dup.invalid"})),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["code"], "duplicate_host");
}

#[tokio::test]
async fn import_reports_every_host_with_its_probe_outcome() {
    let server = TlsTestServer::spawn(&[0x55], (2025, 1, 1), (2027, 1, 1))
        .await
        .expect("TLS server should start");
    let ctx =
        build_test_context_with_probe_port(server.port()).expect("test context should build");

    let (status, body) = request_json(
        &ctx.app,
        "POST",
        "/api/v1/hosts/import",
        Some(json!({"hostnames": ["localhost", "missing.invalid"]})),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    // both hosts were added even though one probe failed
    let hosts = body["hosts"].as_array().unwrap();
    assert_eq!(hosts.len(), 2);

    let outcomes = body["outcomes"].as_array().unwrap();
    assert_eq!(outcomes.len(), 2);
    let ok = outcomes
        .iter()
        .find(|o| o["hostname"] == "localhost")
        .unwrap();
    assert_eq!(ok["reachable"], true);
    assert_eq!(ok["serial_number"], "55");
    let failed = outcomes
        .iter()
        .find(|o| o["hostname"] == "missing.invalid")
        .unwrap();
    assert_eq!(failed["reachable"], false);
    assert!(failed["serial_number"].is_null());

    let (_, certs) = request_json(&ctx.app, "GET", "/api/v1/certificates", None).await;
    let certs = certs.as_array().unwrap();
    assert_eq!(certs.len(), 1);
    assert_eq!(certs[0]["hostname"], "localhost");
}

#[tokio::test]
async fn import_rolls_back_on_duplicate() {
    let ctx = build_test_context().expect("test context should build");
    request_json(
        &ctx.app,
        "POST",
        "/api/v1/hosts",
        Some(json!({"hostname": "taken.invalid"})),
    )
    .await;

    let (status, body) = request_json(
        &ctx.app,
        "POST",
        "/api/v1/hosts/import",
        Some(json!({"hostnames": ["fresh.invalid", "taken.invalid"]})),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["code"], "duplicate_host");

    let (_, hosts) = request_json(&ctx.app, "GET", "/api/v1/hosts", None).await;
    assert_eq!(hosts.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn import_rejects_empty_list() {
    let ctx = build_test_context().expect("test context should build");
    let (status, body) = request_json(
        &ctx.app,
        "POST",
        "/api/v1/hosts/import",
        Some(json!({"hostnames": []})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "empty_import");
}

#[tokio::test]
async fn delete_host_removes_its_certificate() {
    let ctx = build_test_context().expect("test context should build");
    let host = ctx.state.host_store.insert_host("doomed.invalid").unwrap();
    ctx.state
        .host_store
        .mark_probe_success(&host.id, "D1", Utc::now() + Duration::days(10), Utc::now())
        .unwrap();

    let (status, _) = request_json(
        &ctx.app,
        "DELETE",
        &format!("/api/v1/hosts/{}", host.id),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (_, certs) = request_json(&ctx.app, "GET", "/api/v1/certificates", None).await;
    assert_eq!(certs.as_array().unwrap().len(), 0);

    let (status, _) = request_json(
        &ctx.app,
        "DELETE",
        &format!("/api/v1/hosts/{}", host.id),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn certificate_listing_counts_down_to_expiry() {
    let ctx = build_test_context().expect("test context should build");
    let host = ctx.state.host_store.insert_host("count.invalid").unwrap();
    ctx.state
        .host_store
        .mark_probe_success(&host.id, "C1", Utc::now() + Duration::days(40), Utc::now())
        .unwrap();

    let (status, body) = request_json(&ctx.app, "GET", "/api/v1/certificates", None).await;
    assert_eq!(status, StatusCode::OK);
    let certs = body.as_array().unwrap();
    assert_eq!(certs.len(), 1);
    assert_eq!(certs[0]["serial_number"], "C1");
    let days = certs[0]["days_until_expiry"].as_i64().unwrap();
    assert!((39..=40).contains(&days));
}

#[tokio::test]
async fn csv_export_lists_current_records() {
    let ctx = build_test_context().expect("test context should build");
    let host = ctx.state.host_store.insert_host("csv.invalid").unwrap();
    ctx.state
        .host_store
        .mark_probe_success(&host.id, "AB:CD", Utc::now() + Duration::days(7), Utc::now())
        .unwrap();

    let (status, body) = request_raw(&ctx.app, "GET", "/api/v1/certificates/export").await;
    assert_eq!(status, StatusCode::OK);
    let mut lines = body.lines();
    assert_eq!(
        lines.next(),
        Some("hostname,serial_number,expires_at,days_until_expiry,retrieved_at")
    );
    let row = lines.next().unwrap();
    assert!(row.starts_with("csv.invalid,AB:CD,"));
    assert!(lines.next().is_none());
}

#[tokio::test]
async fn manual_refresh_updates_state_but_not_schedule() {
    let server = TlsTestServer::spawn(&[0x66], (2025, 1, 1), (2027, 1, 1))
        .await
        .expect("TLS server should start");
    let ctx =
        build_test_context_with_probe_port(server.port()).expect("test context should build");

    request_json(
        &ctx.app,
        "POST",
        "/api/v1/hosts",
        Some(json!({"hostname": "localhost"})),
    )
    .await;

    let (status, outcomes) =
        request_json(&ctx.app, "POST", "/api/v1/certificates/refresh", None).await;
    assert_eq!(status, StatusCode::OK);
    let outcomes = outcomes.as_array().unwrap();
    assert_eq!(outcomes.len(), 1);
    assert_eq!(outcomes[0]["reachable"], true);

    // the refresh changed host/certificate data but the periodic cadence
    // display must be untouched
    let (status, schedule) = request_json(&ctx.app, "GET", "/api/v1/schedule", None).await;
    assert_eq!(status, StatusCode::OK);
    assert!(schedule["last_run_at"].is_null());
    assert!(schedule["next_run_at"].is_null());
    assert_eq!(schedule["interval_hours"], 24);
}

#[tokio::test]
async fn schedule_snapshot_is_internally_consistent() {
    let ctx = build_test_context().expect("test context should build");

    let (_, snap) = request_json(&ctx.app, "GET", "/api/v1/schedule", None).await;
    assert!(snap["last_run_at"].is_null());
    assert!(snap["next_run_at"].is_null());

    let started = Utc::now();
    ctx.state.schedule.update_on_run(started);

    let (_, snap) = request_json(&ctx.app, "GET", "/api/v1/schedule", None).await;
    let last = DateTime::parse_from_rfc3339(snap["last_run_at"].as_str().unwrap()).unwrap();
    let next = DateTime::parse_from_rfc3339(snap["next_run_at"].as_str().unwrap()).unwrap();
    assert_eq!(next - last, Duration::hours(24));
}

#[tokio::test]
async fn schedule_interval_can_be_updated() {
    let ctx = build_test_context().expect("test context should build");

    let (status, snap) = request_json(
        &ctx.app,
        "PUT",
        "/api/v1/schedule",
        Some(json!({"interval_hours": 6})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(snap["interval_hours"], 6);

    let (status, body) = request_json(
        &ctx.app,
        "PUT",
        "/api/v1/schedule",
        Some(json!({"interval_hours": 0})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "invalid_interval");
}

#[tokio::test]
async fn stats_reflect_inventory_state() {
    let ctx = build_test_context().expect("test context should build");
    let now = Utc::now();
    let a = ctx.state.host_store.insert_host("a.invalid").unwrap();
    ctx.state.host_store.insert_host("b.invalid").unwrap();
    ctx.state
        .host_store
        .mark_probe_success(&a.id, "A1", now + Duration::days(20), now)
        .unwrap();

    let (status, stats) = request_json(&ctx.app, "GET", "/api/v1/stats", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(stats["hosts_monitored"], 2);
    assert_eq!(stats["certificates_with_data"], 1);
    assert_eq!(stats["expiring_within_30_days"], 1);
    assert_eq!(stats["expiring_within_60_days"], 1);
    assert_eq!(stats["unreachable_hosts"], 1);
    assert!(stats["last_scan_at"].is_string());
    assert_eq!(stats["days_since_last_scan"], 0);
}
