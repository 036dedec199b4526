use anyhow::Result;
use clap::Parser;
use std::sync::Arc;
use tracing::{info, warn};

mod config;
mod dashboard;
mod fetcher;
mod scheduler;
mod stats;

use config::Config;
use dashboard::AppState;
use fetcher::{CsStatsFetcher, StatsFetcher};
use scheduler::RefreshScheduler;
use stats::SnapshotStore;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialise tracing / logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let config = Config::parse();
    config.validate()?;

    let fetcher: Arc<dyn StatsFetcher> = Arc::new(CsStatsFetcher::new(&config.stats_base_url)?);
    info!(
        "Tracking player {} via {} ({})",
        config.target_id,
        fetcher.name(),
        config.stats_base_url
    );

    // Shared between the refresh loop (writer) and the HTTP handlers (readers)
    let store = SnapshotStore::new();

    let app = dashboard::router(AppState {
        store: store.clone(),
        overlay_poll_secs: config.overlay_poll_secs,
    });
    let addr = config.listen_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("Listening on http://{}", addr);

    let scheduler = RefreshScheduler::new(fetcher, store, config.scheduler_config()).start();

    // Run HTTP server until ctrl-c
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    scheduler.stop().await;
    info!("Shut down cleanly");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for ctrl-c: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown requested");
}
