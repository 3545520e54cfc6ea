//! ERP Dashboard HTTP Server Binary
//!
//! Loads the configuration, runs an initial refresh, starts the refresh
//! scheduler and serves the JSON API until Ctrl-C.
//!
//! # Usage
//!
//! ```bash
//! # Demo data (default)
//! cargo run --bin erp-server
//!
//! # Live SQL Server extraction
//! SOURCE_TYPE=sqlserver DB_SERVER=erp-db DB_DATABASE=erp DB_USERNAME=... DB_PASSWORD=... \
//!   cargo run --bin erp-server --features sqlserver-source
//! ```
//!
//! # Environment Variables
//!
//! - `ERP_CONFIG`: path of the configuration file (default: `erp.toml`)
//! - `HOST`, `PORT`: listener address (default: 0.0.0.0:5000)
//! - `RUST_LOG`: log filter (default: info)
//!
//! See [`erp_dashboard::config::AppConfig::apply_env_overrides`] for the rest.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use erp_dashboard::config::AppConfig;
use erp_dashboard::db::SourceFactory;
use erp_dashboard::http::{create_router, AppState};
use erp_dashboard::reports::{ReportWriter, RetentionPolicy};
use erp_dashboard::scheduler::{Scheduler, SchedulerConfig};
use erp_dashboard::services::{RefreshOrchestrator, RefreshTrigger, SnapshotStore};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(true)
        .with_thread_ids(true)
        .init();

    info!("Starting ERP dashboard server");

    let config = AppConfig::load().context("Failed to load configuration")?;

    let source = SourceFactory::create(&config.source).context("Failed to create data source")?;
    info!(source = source.name(), "Data source initialized");
    match source.health_check().await {
        Ok(true) => {}
        Ok(false) => warn!("Data source health check reported unavailable"),
        Err(e) => warn!(error = %e, "Data source health check failed"),
    }

    let writer = Arc::new(ReportWriter::new(&config.reports.dir, &config.reports.csv_subdir));
    writer.ensure_dirs().context("Failed to create report directories")?;

    let store = Arc::new(SnapshotStore::new());
    let orchestrator = Arc::new(
        RefreshOrchestrator::new(source.clone(), Arc::clone(&store), Arc::clone(&writer))
            .with_fetch_timeout(SourceFactory::fetch_timeout(&config.source))
            .with_retention(RetentionPolicy::new(config.reports.keep_days)),
    );

    if config.schedule.refresh_on_startup {
        match orchestrator.refresh_now(RefreshTrigger::Startup).await {
            Ok(outcome) => info!(
                generation = outcome.generation,
                records = outcome.records,
                "Initial data loaded"
            ),
            Err(e) => error!(error = %e, "Initial refresh failed"),
        }
    }
    if !store.read().is_populated() {
        warn!("No data loaded yet, serving empty snapshot until the first refresh succeeds");
    }

    let scheduler = Scheduler::new(
        Arc::clone(&orchestrator),
        SchedulerConfig::from_settings(&config.schedule)?,
    );
    if config.schedule.enabled {
        scheduler.start();
    }

    let state = AppState::new(Arc::clone(&orchestrator), writer, scheduler.running_flag());
    let app = create_router(state);

    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port)
        .parse()
        .context("Invalid listen address")?;
    info!("Server listening on http://{}", addr);
    info!("Health check: http://{}/health", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Shutting down");
    scheduler.stop().await;
    orchestrator.wait_idle().await;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
}
