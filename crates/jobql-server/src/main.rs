//! JobQL server
//!
//! Accepts boolean job-search trees over HTTP, compiles them to SQL and
//! runs them against the job postings database.

use std::sync::Arc;

use anyhow::Context;
use jobql_duck::DuckPool;
use jobql_server::{config::Config, logging, metrics::Metrics, AppState};
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    let config_path = std::env::var("JOBQL_CONFIG").unwrap_or_else(|_| "config.yaml".to_string());
    let config = Config::load_or_default(&config_path)
        .with_context(|| format!("loading configuration from {}", config_path))?;

    logging::init(&config.logging)?;

    let pool = DuckPool::open(&config.database.pool_config()).context("opening database")?;
    let metrics = Metrics::new().context("registering metrics")?;

    let state = AppState::new(Arc::new(pool.clone()), config.search.clone(), Arc::new(metrics));

    info!(
        addr = %config.server.addr(),
        max_limit = config.search.max_limit,
        "Starting JobQL server"
    );
    jobql_server::serve(&config.server, state, shutdown_signal()).await?;

    pool.close();
    info!("Server stopped");

    Ok(())
}

async fn shutdown_signal() {
    if tokio::signal::ctrl_c().await.is_err() {
        // no signal handler; run until killed
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
