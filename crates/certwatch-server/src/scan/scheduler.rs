use certwatch_storage::host_store::HostStore;
use chrono::Utc;
use std::sync::Arc;
use tokio::sync::watch;
use tokio::time::Duration;

use super::reconciler::reconcile_hosts;
use super::schedule::ScheduleState;

/// Drives the unattended periodic scan loop.
///
/// Scans once immediately on startup, then sleeps for the configured
/// interval between passes. The shutdown signal races against the sleep via
/// `select!`, so stopping never waits out the remainder of the interval; a
/// pass that is already probing runs to completion (per-probe timeouts
/// bound how long that takes).
pub struct ScanScheduler {
    store: Arc<HostStore>,
    schedule: Arc<ScheduleState>,
    interval_hours: u32,
    probe_port: u16,
    connect_timeout_secs: u64,
    shutdown: watch::Receiver<bool>,
}

impl ScanScheduler {
    pub fn new(
        store: Arc<HostStore>,
        schedule: Arc<ScheduleState>,
        interval_hours: u32,
        probe_port: u16,
        connect_timeout_secs: u64,
        shutdown: watch::Receiver<bool>,
    ) -> Self {
        Self {
            store,
            schedule,
            interval_hours,
            probe_port,
            connect_timeout_secs,
            shutdown,
        }
    }

    pub async fn run(mut self) {
        tracing::info!(
            interval_hours = self.interval_hours,
            port = self.probe_port,
            "Certificate scan scheduler started"
        );

        loop {
            self.scan_once().await;

            let sleep = Duration::from_secs(u64::from(self.interval_hours) * 3600);
            tokio::select! {
                _ = tokio::time::sleep(sleep) => {}
                _ = self.shutdown.changed() => {
                    tracing::info!("Certificate scan scheduler stopping");
                    break;
                }
            }
        }
    }

    async fn scan_once(&self) {
        let started_at = Utc::now();
        let hosts = match self.store.list_hosts() {
            Ok(hosts) => hosts,
            Err(e) => {
                tracing::error!(error = %e, "Failed to load hosts for scan");
                return;
            }
        };

        tracing::info!(count = hosts.len(), "Scanning hosts for certificates");

        match reconcile_hosts(
            &self.store,
            &hosts,
            self.probe_port,
            self.connect_timeout_secs,
        )
        .await
        {
            Ok(outcomes) => {
                let reachable = outcomes.iter().filter(|o| o.reachable).count();
                // Manual refreshes bypass this on purpose; only the
                // periodic cadence feeds the next-run estimate.
                self.schedule.update_on_run(started_at);
                tracing::info!(total = outcomes.len(), reachable, "Scan pass finished");
            }
            Err(e) => {
                tracing::error!(error = %e, "Scan pass aborted");
            }
        }
    }
}
