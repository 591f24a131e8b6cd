use anyhow::Result;
use certwatch_common::types::{HostScanOutcome, MonitoredHost};
use certwatch_storage::host_store::HostStore;
use chrono::Utc;

use super::probe::probe;

/// Probe every host in `hosts` (in the order given) and fold the outcomes
/// into persistent state.
///
/// Probe failures are data, not errors: the host is marked unreachable, its
/// existing certificate record (if any) stays as the last-known value, and
/// the pass moves on to the next host. Only storage errors abort the pass;
/// hosts already processed stay committed.
pub async fn reconcile_hosts(
    store: &HostStore,
    hosts: &[MonitoredHost],
    port: u16,
    timeout_secs: u64,
) -> Result<Vec<HostScanOutcome>> {
    let mut outcomes = Vec::with_capacity(hosts.len());
    for host in hosts {
        let outcome = match probe(&host.hostname, port, timeout_secs).await {
            Ok(cert) => {
                let now = Utc::now();
                store.mark_probe_success(&host.id, &cert.serial_number, cert.expires_at, now)?;
                tracing::info!(
                    host = %host.hostname,
                    serial = %cert.serial_number,
                    expires_at = %cert.expires_at,
                    "Certificate retrieved"
                );
                HostScanOutcome {
                    host_id: host.id.clone(),
                    hostname: host.hostname.clone(),
                    reachable: true,
                    serial_number: Some(cert.serial_number),
                    expires_at: Some(cert.expires_at),
                }
            }
            Err(e) => {
                store.mark_probe_failure(&host.id, Utc::now())?;
                tracing::warn!(host = %host.hostname, error = %e, "Probe failed");
                HostScanOutcome {
                    host_id: host.id.clone(),
                    hostname: host.hostname.clone(),
                    reachable: false,
                    serial_number: None,
                    expires_at: None,
                }
            }
        };
        outcomes.push(outcome);
    }
    Ok(outcomes)
}
