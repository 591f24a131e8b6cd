use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_http_port")]
    pub http_port: u16,
    #[serde(default = "default_data_dir")]
    pub data_dir: String,

    #[serde(default)]
    pub scan: ScanConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            http_port: default_http_port(),
            data_dir: default_data_dir(),
            scan: ScanConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanConfig {
    #[serde(default = "default_scan_enabled")]
    pub enabled: bool,
    /// Hours between periodic scan passes.
    #[serde(default = "default_scan_interval_hours")]
    pub interval_hours: u32,
    /// Port probed on every host.
    #[serde(default = "default_probe_port")]
    pub probe_port: u16,
    /// Applied separately to the TCP connect and the TLS handshake.
    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            enabled: default_scan_enabled(),
            interval_hours: default_scan_interval_hours(),
            probe_port: default_probe_port(),
            connect_timeout_secs: default_connect_timeout_secs(),
        }
    }
}

fn default_http_port() -> u16 {
    8080
}

fn default_data_dir() -> String {
    "data".to_string()
}

fn default_scan_enabled() -> bool {
    true
}

fn default_scan_interval_hours() -> u32 {
    24
}

fn default_probe_port() -> u16 {
    443
}

fn default_connect_timeout_secs() -> u64 {
    10
}

impl ServerConfig {
    pub fn load(path: &str) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&content)?;
        Ok(config)
    }
}
