//! HTTP request handlers.

use std::sync::Arc;
use std::time::Instant;

use axum::extract::{Query as QueryParams, State};
use axum::response::Html;
use axum::Json;
use chrono::{DateTime, Utc};
use peek_model::{FieldInfo, Record, TimeRange};
use peek_query::Query;
use peek_store::Stats;
use serde::{Deserialize, Serialize};

use crate::error::{ServerError, ServerResult};
use crate::state::AppState;

/// Static landing page served at `/`.
const INDEX_HTML: &str = include_str!("index.html");

/// Response for `GET /health`.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// Always `"ok"` when the process answers.
    pub status: String,
    /// Number of stored records.
    pub logs_stored: u64,
    /// On-disk database size in bytes.
    pub db_size_bytes: u64,
}

/// Query parameters for `GET /fields`.
#[derive(Debug, Deserialize)]
pub struct FieldsParams {
    /// Optional RFC3339 window start.
    pub start: Option<String>,
    /// Optional RFC3339 window end.
    pub end: Option<String>,
}

/// Response for `GET /fields`.
#[derive(Debug, Serialize)]
pub struct FieldsResponse {
    /// Discovered fields, name-ordered.
    pub fields: Vec<FieldInfo>,
}

/// Request body for `POST /query`.
#[derive(Debug, Deserialize)]
pub struct QueryRequest {
    /// Query string; empty means match everything.
    #[serde(default)]
    pub query: String,
    /// Page size.
    #[serde(default = "default_limit")]
    pub limit: usize,
    /// Records to skip.
    #[serde(default)]
    pub offset: usize,
    /// Optional RFC3339 window start.
    pub start: Option<String>,
    /// Optional RFC3339 window end.
    pub end: Option<String>,
}

const fn default_limit() -> usize {
    100
}

/// Response for `POST /query`.
#[derive(Debug, Serialize)]
pub struct QueryResponse {
    /// The requested page, oldest first.
    pub logs: Vec<Record>,
    /// Matches ignoring pagination.
    pub total: usize,
    /// Wall time spent executing.
    pub took_ms: u64,
}

/// `GET /` — the static landing page.
pub async fn index() -> Html<&'static str> {
    Html(INDEX_HTML)
}

/// `GET /health`.
pub async fn health(State(state): State<Arc<AppState>>) -> ServerResult<Json<HealthResponse>> {
    let stats = state.store().get_stats()?;
    Ok(Json(HealthResponse {
        status: "ok".to_string(),
        logs_stored: stats.total_logs,
        db_size_bytes: (stats.db_size_mb * 1024.0 * 1024.0) as u64,
    }))
}

/// `GET /stats`.
pub async fn get_stats(State(state): State<Arc<AppState>>) -> ServerResult<Json<Stats>> {
    Ok(Json(state.store().get_stats()?))
}

/// `GET /fields`.
pub async fn get_fields(
    State(state): State<Arc<AppState>>,
    QueryParams(params): QueryParams<FieldsParams>,
) -> ServerResult<Json<FieldsResponse>> {
    let range = TimeRange::new(
        parse_bound(params.start.as_deref(), "start")?,
        parse_bound(params.end.as_deref(), "end")?,
    );
    let fields = state.store().get_fields(range)?;
    Ok(Json(FieldsResponse { fields }))
}

/// `POST /query`.
pub async fn post_query(
    State(state): State<Arc<AppState>>,
    Json(request): Json<QueryRequest>,
) -> ServerResult<Json<QueryResponse>> {
    let parsed = Query::parse(&request.query)?;
    let filter = state.effective_filter(parsed.into_filter());

    let start = parse_bound(request.start.as_deref(), "start")?;
    let end = parse_bound(request.end.as_deref(), "end")?;
    let time_range = if start.is_none() && end.is_none() {
        None
    } else {
        Some(TimeRange::new(start, end))
    };

    let began = Instant::now();
    let (logs, total) = state
        .store()
        .query(&filter, time_range, request.limit, request.offset)?;

    Ok(Json(QueryResponse {
        logs,
        total,
        took_ms: began.elapsed().as_millis() as u64,
    }))
}

/// Parses an optional RFC3339 parameter, rejecting malformed input.
fn parse_bound(value: Option<&str>, name: &str) -> ServerResult<Option<DateTime<Utc>>> {
    match value {
        None => Ok(None),
        Some(text) => DateTime::parse_from_rfc3339(text)
            .map(|dt| Some(dt.with_timezone(&Utc)))
            .map_err(|e| ServerError::InvalidRequest(format!("invalid {name}: {e}"))),
    }
}
