//! JobQL HTTP server
//!
//! Provides REST API endpoints for:
//! - Boolean job search (`POST /jobs/search`)
//! - Health checks (`GET /health`)
//! - Prometheus metrics (`GET /metrics`)

use std::future::Future;
use std::sync::Arc;

use axum::{
    extract::State,
    http::header,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde_json::{json, Value};
use tokio::net::TcpListener;
use tracing::{error, info};

pub mod config;
pub mod error;
pub mod logging;
pub mod metrics;
pub mod search;

use config::{SearchConfig, ServerConfig};
use error::ApiError;
use metrics::Metrics;
use search::JobStore;

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn JobStore>,
    pub search: SearchConfig,
    pub metrics: Arc<Metrics>,
}

impl AppState {
    pub fn new(store: Arc<dyn JobStore>, search: SearchConfig, metrics: Arc<Metrics>) -> Self {
        Self {
            store,
            search,
            metrics,
        }
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/jobs/search", post(search::search_jobs))
        .route("/health", get(health_check))
        .route("/metrics", get(metrics_handler))
        .with_state(state)
}

/// Bind `config.addr()` and serve until `shutdown` resolves.
pub async fn serve<F>(config: &ServerConfig, state: AppState, shutdown: F) -> std::io::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let listener = TcpListener::bind(config.addr()).await?;
    serve_on(listener, state, shutdown).await
}

pub async fn serve_on<F>(listener: TcpListener, state: AppState, shutdown: F) -> std::io::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    info!("JobQL server listening on {}", listener.local_addr()?);

    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown)
        .await
}

async fn health_check() -> Json<Value> {
    Json(json!({"status": "healthy"}))
}

async fn metrics_handler(State(state): State<AppState>) -> Result<Response, ApiError> {
    let body = state.metrics.render().map_err(|e| {
        error!(error = %e, "Failed to render metrics");
        ApiError::Internal
    })?;

    Ok(([(header::CONTENT_TYPE, "text/plain; version=0.0.4")], body).into_response())
}
