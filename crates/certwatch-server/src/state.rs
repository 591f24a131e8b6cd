use crate::config::ServerConfig;
use crate::scan::schedule::ScheduleState;
use certwatch_storage::host_store::HostStore;
use chrono::{DateTime, Utc};
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub host_store: Arc<HostStore>,
    pub schedule: Arc<ScheduleState>,
    pub probe_port: u16,
    pub connect_timeout_secs: u64,
    pub start_time: DateTime<Utc>,
    pub config: Arc<ServerConfig>,
}
