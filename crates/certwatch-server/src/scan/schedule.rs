use certwatch_common::types::ScheduleSnapshot;
use chrono::{DateTime, Duration, Utc};
use std::sync::Mutex;

/// Process-wide record of the periodic scan cadence.
///
/// Written only by the scan loop when a periodic run completes; read
/// concurrently by API callers. Manual refreshes and import scans never
/// touch it, so the displayed next-run estimate stays honest. The mutex
/// makes the three fields move together: a snapshot can never mix pre- and
/// post-update values.
pub struct ScheduleState {
    inner: Mutex<Inner>,
}

struct Inner {
    last_run_at: Option<DateTime<Utc>>,
    next_run_at: Option<DateTime<Utc>>,
    interval_hours: u32,
}

impl ScheduleState {
    pub fn new(interval_hours: u32) -> Self {
        Self {
            inner: Mutex::new(Inner {
                last_run_at: None,
                next_run_at: None,
                interval_hours,
            }),
        }
    }

    /// Record a completed periodic run: last-run becomes the run's start
    /// time, next-run is recomputed from it with the current interval.
    pub fn update_on_run(&self, run_started_at: DateTime<Utc>) {
        let mut inner = self.lock();
        inner.last_run_at = Some(run_started_at);
        inner.next_run_at = Some(run_started_at + Duration::hours(i64::from(inner.interval_hours)));
    }

    /// Change the interval for subsequent runs. A pending next-run keeps
    /// the interval it was computed with.
    pub fn set_interval_hours(&self, hours: u32) {
        self.lock().interval_hours = hours;
    }

    pub fn snapshot(&self) -> ScheduleSnapshot {
        let inner = self.lock();
        ScheduleSnapshot {
            last_run_at: inner.last_run_at,
            next_run_at: inner.next_run_at,
            interval_hours: inner.interval_hours,
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
