//! `POST /jobs/search`

use std::time::Instant;

use async_trait::async_trait;
use axum::{
    body::Bytes,
    extract::{rejection::QueryRejection, Query, State},
    Json,
};
use jobql_duck::{DuckPool, ExecutionError, QueryResult};
use jobql_ir::QueryNode;
use jobql_sql::{compile, CompiledStatement};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::{debug, error, field, info, info_span, warn, Instrument, Span};
use uuid::Uuid;

use crate::config::SearchConfig;
use crate::error::ApiError;
use crate::metrics::Outcome;
use crate::AppState;

/// Runs compiled statements for the search handler
#[async_trait]
pub trait JobStore: Send + Sync {
    async fn fetch(&self, statement: &CompiledStatement) -> Result<QueryResult, ExecutionError>;
}

#[async_trait]
impl JobStore for DuckPool {
    async fn fetch(&self, statement: &CompiledStatement) -> Result<QueryResult, ExecutionError> {
        self.execute(statement).await
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct SearchParams {
    pub limit: Option<i64>,
}

#[derive(Debug, Serialize)]
pub struct SearchResponse {
    pub status: &'static str,
    pub count: usize,
    pub jobs: Vec<Map<String, Value>>,
}

/// Search postings with a boolean query tree.
///
/// ```json
/// {
///     "type": "operator",
///     "operator": "AND",
///     "children": [
///         {"type": "condition", "condition": {"field": "organization", "value": "apple"}},
///         {"type": "condition", "condition": {"field": "technology", "value": ".net"}}
///     ]
/// }
/// ```
pub async fn search_jobs(
    State(state): State<AppState>,
    params: Result<Query<SearchParams>, QueryRejection>,
    body: Bytes,
) -> Result<Json<SearchResponse>, ApiError> {
    let span = info_span!(
        "search",
        request_id = %Uuid::new_v4(),
        fingerprint = field::Empty
    );
    let started = Instant::now();

    let result = run_search(&state, params, &body).instrument(span).await;

    let outcome = match &result {
        Ok(_) => Outcome::Success,
        Err(ApiError::BadRequest(_)) => Outcome::Invalid,
        Err(ApiError::Internal) => Outcome::Error,
    };
    state.metrics.observe(outcome, started.elapsed().as_secs_f64());

    result.map(Json)
}

async fn run_search(
    state: &AppState,
    params: Result<Query<SearchParams>, QueryRejection>,
    body: &[u8],
) -> Result<SearchResponse, ApiError> {
    let Query(params) = params.map_err(|e| ApiError::BadRequest(e.body_text()))?;
    let limit = resolve_limit(params.limit, &state.search)?;

    let tree: QueryNode = serde_json::from_slice(body).map_err(|e| {
        warn!(error = %e, "Rejected query tree");
        ApiError::BadRequest(format!("Invalid query: {}", e))
    })?;
    Span::current().record("fingerprint", &tree.fingerprint()[..16]);

    let statement = compile(&tree, limit)?;
    debug!(sql = %statement.sql, params = statement.params.len(), "Compiled search");

    let result = state.store.fetch(&statement).await.map_err(|e| {
        error!(error = %e, sql = %statement.sql, "Search execution failed");
        ApiError::Internal
    })?;

    info!(count = result.row_count, limit, "Search completed");

    Ok(SearchResponse {
        status: "success",
        count: result.row_count,
        jobs: result.rows,
    })
}

/// Row cap from the query string, bounded by configuration
pub fn resolve_limit(requested: Option<i64>, config: &SearchConfig) -> Result<u32, ApiError> {
    let limit = requested.unwrap_or(i64::from(config.default_limit));

    if limit < 1 || limit > i64::from(config.max_limit) {
        return Err(ApiError::BadRequest(format!(
            "limit must be between 1 and {}",
            config.max_limit
        )));
    }

    u32::try_from(limit).map_err(|_| ApiError::BadRequest(format!("limit out of range: {}", limit)))
}
