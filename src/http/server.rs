//! HTTP API Server for twingraph
//!
//! Serves the latest and point-in-time graphs. Reconstruction is synchronous,
//! so every request runs it on tokio's blocking pool.

use std::future::Future;
use std::sync::Arc;

use axum::{
    extract::{Query, State},
    http::{header, HeaderMap, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{error, info};

use crate::core::{Cutoff, Timestamp};
use crate::error::TwinError;
use crate::execution::{SerializedGraph, TripleStoreReader};
use crate::graph::GraphFormat;

/// Error message for `/pit` without a timestamp.
pub const MISSING_TIMESTAMP: &str = "Missing required 'timestamp' query parameter";

/// Query string of `/latest` and `/pit`.
#[derive(Debug, Default, Deserialize)]
pub struct GraphQuery {
    /// Cutoff, required by `/pit`
    pub timestamp: Option<String>,
    /// Overrides the `Accept` header
    pub format: Option<String>,
}

/// Error response
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Human-readable message
    pub error: String,
}

/// Body of `GET /health`.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// Always `healthy` while the process serves
    pub status: &'static str,
    /// Crate name
    pub service: &'static str,
    /// Crate version
    pub version: &'static str,
    /// Description of the configured triple source
    pub source: String,
    /// Routes, for humans
    pub endpoints: Vec<&'static str>,
}

/// Shared application state
pub struct AppState {
    /// Reader shared by all handlers
    pub reader: TripleStoreReader,
}

/// Custom error type for API errors
#[derive(Debug)]
pub enum ApiError {
    /// 400
    BadRequest(String),
    /// 503
    Unavailable(String),
    /// 500
    InternalError(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::Unavailable(msg) => (StatusCode::SERVICE_UNAVAILABLE, msg),
            ApiError::InternalError(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg),
        };

        let body = Json(ErrorResponse { error: message });
        (status, body).into_response()
    }
}

impl From<TwinError> for ApiError {
    fn from(err: TwinError) -> Self {
        match err {
            err if err.is_client_error() => ApiError::BadRequest(err.to_string()),
            TwinError::DataSourceUnavailable(_) => ApiError::Unavailable(err.to_string()),
            other => {
                error!(error = %other, "graph reconstruction failed");
                ApiError::InternalError(other.to_string())
            }
        }
    }
}

/// Create the HTTP server with all routes
pub fn create_server(reader: TripleStoreReader) -> Router {
    let state = Arc::new(AppState { reader });

    let cors = CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any);

    Router::new()
        .route("/", get(health_check))
        .route("/health", get(health_check))
        .route("/latest", get(latest_graph))
        .route("/pit", get(point_in_time_graph))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

async fn health_check(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(HealthResponse {
        status: "healthy",
        service: env!("CARGO_PKG_NAME"),
        version: env!("CARGO_PKG_VERSION"),
        source: state.reader.source().describe(),
        endpoints: vec!["GET /latest", "GET /pit?timestamp=<ts>", "GET /health"],
    })
}

/// `format` parameter first, then the `Accept` header, then Turtle.
fn negotiate(query: &GraphQuery, headers: &HeaderMap) -> Result<GraphFormat, ApiError> {
    if let Some(name) = query.format.as_deref().filter(|f| !f.trim().is_empty()) {
        return GraphFormat::from_string(name)
            .ok_or_else(|| ApiError::BadRequest(format!("Unsupported format '{}'", name)));
    }

    Ok(headers
        .get(header::ACCEPT)
        .and_then(|v| v.to_str().ok())
        .and_then(GraphFormat::from_accept)
        .unwrap_or_default())
}

/// GET /latest
async fn latest_graph(
    State(state): State<Arc<AppState>>,
    Query(query): Query<GraphQuery>,
    headers: HeaderMap,
) -> Result<Response, ApiError> {
    let format = negotiate(&query, &headers)?;
    render(state, Cutoff::Latest, format).await
}

/// GET /pit?timestamp=...
async fn point_in_time_graph(
    State(state): State<Arc<AppState>>,
    Query(query): Query<GraphQuery>,
    headers: HeaderMap,
) -> Result<Response, ApiError> {
    let raw = query
        .timestamp
        .as_deref()
        .filter(|t| !t.trim().is_empty())
        .ok_or_else(|| ApiError::BadRequest(MISSING_TIMESTAMP.to_string()))?;
    let cutoff = Timestamp::parse(raw)?;
    let format = negotiate(&query, &headers)?;
    render(state, Cutoff::Before(cutoff), format).await
}

async fn render(state: Arc<AppState>, cutoff: Cutoff, format: GraphFormat) -> Result<Response, ApiError> {
    let reader = state.reader.clone();
    let graph = tokio::task::spawn_blocking(move || reader.render(cutoff, format))
        .await
        .map_err(|e| ApiError::InternalError(format!("reconstruction task failed: {}", e)))??;

    graph_response(graph)
}

fn graph_response(graph: SerializedGraph) -> Result<Response, ApiError> {
    let content_type = HeaderValue::from_str(&graph.content_type)
        .map_err(|e| ApiError::InternalError(e.to_string()))?;

    let mut response = (StatusCode::OK, graph.body).into_response();
    let headers = response.headers_mut();
    headers.insert(header::CONTENT_TYPE, content_type);
    headers.insert("x-triple-count", HeaderValue::from(graph.triple_count));
    if graph.skipped_rows > 0 {
        headers.insert("x-skipped-rows", HeaderValue::from(graph.skipped_rows));
    }
    Ok(response)
}

/// Bind `addr` and serve until `shutdown` resolves.
pub async fn start_server(
    addr: &str,
    reader: TripleStoreReader,
    shutdown: impl Future<Output = ()> + Send + 'static,
) -> crate::error::Result<()> {
    let source = reader.source().describe();
    let app = create_server(reader);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(addr = %addr, source = %source, "twingraph HTTP API listening");
    info!("  GET /latest[?format=turtle|ntriples|rdfxml]  - latest graph");
    info!("  GET /pit?timestamp=<ts>[&format=...]         - graph as of <ts>");
    info!("  GET /health                                  - health check");

    axum::serve(listener, app).with_graceful_shutdown(shutdown).await?;

    info!("twingraph HTTP API stopped");
    Ok(())
}
