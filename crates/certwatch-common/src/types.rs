use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A host whose TLS certificate is being tracked.
///
/// Reachability fields are mutated only by the scan reconciler; the
/// `last_checked_at` / `last_reachable_at` pair stays `None` until the
/// first probe runs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonitoredHost {
    pub id: String,
    pub hostname: String,
    pub reachable: bool,
    pub last_checked_at: Option<DateTime<Utc>>,
    pub last_reachable_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// The single certificate record retained per host: the result of the most
/// recent successful probe. A failed probe never touches it, so it doubles
/// as the last-known value for hosts that have since gone unreachable.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CertificateRecord {
    pub id: String,
    pub host_id: String,
    pub serial_number: String,
    pub expires_at: DateTime<Utc>,
    pub retrieved_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Certificate record joined with its owning host, as returned by list
/// queries and the CSV export.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CertificateView {
    pub id: String,
    pub host_id: String,
    pub hostname: String,
    pub serial_number: String,
    pub expires_at: DateTime<Utc>,
    pub days_until_expiry: i64,
    pub retrieved_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateHostRequest {
    pub hostname: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImportHostsRequest {
    pub hostnames: Vec<String>,
}

/// Per-host result of one reconciliation pass, reported by the manual
/// refresh and import endpoints.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HostScanOutcome {
    pub host_id: String,
    pub hostname: String,
    pub reachable: bool,
    pub serial_number: Option<String>,
    pub expires_at: Option<DateTime<Utc>>,
}

/// Response of the bulk import endpoint. The hosts are created even when
/// their initial probe fails; `outcomes` reports how each probe went.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImportHostsResponse {
    pub hosts: Vec<MonitoredHost>,
    pub outcomes: Vec<HostScanOutcome>,
}

/// Atomic view of the periodic scan cadence. `last_run_at` and
/// `next_run_at` are both `None` until the first periodic run completes.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ScheduleSnapshot {
    pub last_run_at: Option<DateTime<Utc>>,
    pub next_run_at: Option<DateTime<Utc>>,
    pub interval_hours: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateScheduleRequest {
    pub interval_hours: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatsSummary {
    pub hosts_monitored: u64,
    pub certificates_with_data: u64,
    pub expiring_within_30_days: u64,
    pub expiring_within_60_days: u64,
    pub unreachable_hosts: u64,
    pub last_scan_at: Option<DateTime<Utc>>,
    pub days_since_last_scan: Option<i64>,
}
