//! HTTP API Integration Tests
//!
//! Drives the axum router in-process with `tower::ServiceExt::oneshot`.

use std::sync::Arc;

use axum::body::{to_bytes, Body};
use axum::http::{header, Request, StatusCode};
use axum::response::Response;
use tower::ServiceExt;
use twingraph::core::{Cutoff, LogEntry, Pass};
use twingraph::http::{create_server, ErrorResponse};
use twingraph::{MemoryTripleLog, Namespaces, TripleSource, TripleStoreReader, TwinError};

struct Offline;

impl TripleSource for Offline {
    fn describe(&self) -> String {
        "offline warehouse".to_string()
    }

    fn fetch_latest(&self, _pass: Pass, _cutoff: Cutoff) -> twingraph::Result<Vec<LogEntry>> {
        Err(TwinError::DataSourceUnavailable("warehouse returned 503".to_string()))
    }
}

fn scenario_reader() -> TripleStoreReader {
    let log = MemoryTripleLog::from_rows([
        ("ex:c1", "rdf:type", "ex:Component", 10),
        ("ex:c1", "ex:temp", "72.5", 10),
        ("ex:c1", "ex:temp", "75.0", 20),
    ]);
    let namespaces = Namespaces::default().with_prefix("ex", "http://example.com/").unwrap();
    TripleStoreReader::new(Arc::new(log)).with_namespaces(namespaces)
}

async fn get(reader: TripleStoreReader, uri: &str, accept: Option<&str>) -> Response {
    let mut request = Request::builder().uri(uri);
    if let Some(accept) = accept {
        request = request.header(header::ACCEPT, accept);
    }
    create_server(reader).oneshot(request.body(Body::empty()).unwrap()).await.unwrap()
}

async fn body_text(response: Response) -> String {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}

fn content_type(response: &Response) -> String {
    response.headers()[header::CONTENT_TYPE].to_str().unwrap().to_string()
}

#[tokio::test]
async fn test_latest_returns_turtle_by_default() {
    let response = get(scenario_reader(), "/latest", None).await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(content_type(&response), "text/turtle; charset=utf-8");
    assert_eq!(response.headers()["x-triple-count"], "2");

    let body = body_text(response).await;
    assert!(body.contains("75.0"));
    assert!(!body.contains("72.5"));
}

#[tokio::test]
async fn test_pit_applies_strict_cutoff() {
    let response = get(scenario_reader(), "/pit?timestamp=15&format=nt", None).await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(content_type(&response), "application/n-triples; charset=utf-8");
    let body = body_text(response).await;
    assert!(body.contains(r#"<http://example.com/c1> <http://example.com/temp> "72.5" ."#));
    assert!(!body.contains("75.0"));
}

#[tokio::test]
async fn test_pit_without_timestamp_is_bad_request() {
    let response = get(scenario_reader(), "/pit", None).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let error: ErrorResponse = serde_json::from_str(&body_text(response).await).unwrap();
    assert_eq!(error.error, "Missing required 'timestamp' query parameter");
}

#[tokio::test]
async fn test_pit_with_garbage_timestamp_is_bad_request() {
    let response = get(scenario_reader(), "/pit?timestamp=soon", None).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let error: ErrorResponse = serde_json::from_str(&body_text(response).await).unwrap();
    assert!(error.error.starts_with("Invalid argument"));
    assert!(error.error.contains("soon"));
}

#[tokio::test]
async fn test_accept_header_selects_format() {
    let response = get(scenario_reader(), "/latest", Some("application/n-triples")).await;
    assert_eq!(content_type(&response), "application/n-triples; charset=utf-8");

    let response = get(scenario_reader(), "/latest?format=jsonld", None).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_unavailable_source_maps_to_503() {
    let reader = TripleStoreReader::new(Arc::new(Offline));
    let response = get(reader, "/latest", None).await;
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
}

#[tokio::test]
async fn test_health_reports_source() {
    let response = get(scenario_reader(), "/health", None).await;
    assert_eq!(response.status(), StatusCode::OK);

    let health: serde_json::Value = serde_json::from_str(&body_text(response).await).unwrap();
    assert_eq!(health["status"], "healthy");
    assert!(health["source"].as_str().unwrap().contains("in-memory"));

    let root = get(scenario_reader(), "/", None).await;
    assert_eq!(root.status(), StatusCode::OK);
}
