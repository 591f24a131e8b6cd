use anyhow::Result;
use chrono::Utc;
use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;
use tokio::signal;
use tokio::sync::watch;
use tracing_subscriber::EnvFilter;

use certwatch_server::app;
use certwatch_server::config::ServerConfig;
use certwatch_server::scan::schedule::ScheduleState;
use certwatch_server::scan::scheduler::ScanScheduler;
use certwatch_server::state::AppState;
use certwatch_storage::host_store::HostStore;

#[tokio::main]
async fn main() -> Result<()> {
    rustls::crypto::ring::default_provider()
        .install_default()
        .map_err(|e| anyhow::anyhow!("Failed to install default CryptoProvider: {e:?}"))?;

    certwatch_common::id::init(1, 1);

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env()
                .add_directive("certwatch_server=info".parse()?)
                .add_directive("certwatch_storage=info".parse()?),
        )
        .init();

    let config_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "config/server.toml".to_string());
    let config = ServerConfig::load(&config_path)?;

    tracing::info!(
        http_port = config.http_port,
        data_dir = %config.data_dir,
        interval_hours = config.scan.interval_hours,
        "certwatch-server starting"
    );

    let host_store = Arc::new(HostStore::new(Path::new(&config.data_dir))?);
    let schedule = Arc::new(ScheduleState::new(config.scan.interval_hours));

    let state = AppState {
        host_store: host_store.clone(),
        schedule: schedule.clone(),
        probe_port: config.scan.probe_port,
        connect_timeout_secs: config.scan.connect_timeout_secs,
        start_time: Utc::now(),
        config: Arc::new(config.clone()),
    };

    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let scan_handle = if config.scan.enabled {
        let scheduler = ScanScheduler::new(
            host_store.clone(),
            schedule.clone(),
            config.scan.interval_hours,
            config.scan.probe_port,
            config.scan.connect_timeout_secs,
            shutdown_rx,
        );
        Some(tokio::spawn(scheduler.run()))
    } else {
        tracing::info!("Certificate scan scheduler disabled");
        None
    };

    let http_addr: SocketAddr = format!("0.0.0.0:{}", config.http_port).parse()?;
    let app = app::build_http_app(state);
    let listener = tokio::net::TcpListener::bind(http_addr).await?;
    tracing::info!(http = %http_addr, "Server started");

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            signal::ctrl_c().await.ok();
        })
        .await?;

    tracing::info!("Shutting down gracefully");
    let _ = shutdown_tx.send(true);
    if let Some(handle) = scan_handle {
        let _ = handle.await;
    }
    tracing::info!("Server stopped");

    Ok(())
}
