// tests/api_http.rs
//
// HTTP-level tests for the dashboard Router without opening sockets.
// We exercise the router directly via tower::ServiceExt::oneshot.
//
// Covered:
// - GET /health
// - GET /api/dashboard, /api/sources (JSON contract)
// - GET /            (HTML page, empty states, bad input)
// - GET /charts/*.png
// - store failures -> 500

use std::sync::Arc;

use anyhow::anyhow;
use axum::{
    body::{self, Body},
    http::{header, Request, StatusCode},
    Router,
};
use chrono::{Duration, Utc};
use serde_json::Value as Json;
use tower::ServiceExt as _; // for `oneshot`

use trend_dashboard::model::Item;
use trend_dashboard::query::{BoundQuery, QueryOutput};
use trend_dashboard::store::{ItemStore, MemoryStore};
use trend_dashboard::{router, AppState};

const BODY_LIMIT: usize = 4 * 1024 * 1024;

fn item(source: &str, hours_ago: i64, title: &str, score: f64) -> Item {
    Item {
        ts: Utc::now() - Duration::hours(hours_ago),
        source: source.into(),
        title: title.into(),
        body: None,
        url: "https://example.com/post".into(),
        trend_score: score,
    }
}

fn test_router() -> Router {
    let store = MemoryStore::new(vec![
        item("hn", 2, "Rust 2.0 released", 0.8),
        item("hn", 30, "Zig ships async", 0.4),
        item("reddit", 50, "Postgres 18 tips", 0.6),
        item("github", 24 * 10, "Ten day old repo", 0.9),
    ]);
    router(AppState::new(Arc::new(store)).with_caption("Using host: db.local:6543"))
}

async fn get(app: Router, uri: &str) -> (StatusCode, Option<String>, Vec<u8>) {
    let req = Request::builder()
        .method("GET")
        .uri(uri)
        .body(Body::empty())
        .expect("build request");
    let resp = app.oneshot(req).await.expect("oneshot");
    let status = resp.status();
    let ctype = resp
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);
    let bytes = body::to_bytes(resp.into_body(), BODY_LIMIT)
        .await
        .expect("read body")
        .to_vec();
    (status, ctype, bytes)
}

async fn get_json(uri: &str) -> Json {
    let (status, _, bytes) = get(test_router(), uri).await;
    assert_eq!(status, StatusCode::OK, "GET {uri}");
    serde_json::from_slice(&bytes).expect("parse json")
}

#[tokio::test]
async fn health_returns_ok() {
    let (status, _, bytes) = get(test_router(), "/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(String::from_utf8(bytes).unwrap().trim(), "OK");
}

#[tokio::test]
async fn dashboard_json_defaults_to_seven_days() {
    let v = get_json("/api/dashboard").await;
    assert_eq!(v["filter"]["days"], 7);
    assert_eq!(v["kpi"]["n_items"], 3);
    assert_eq!(v["top_items"].as_array().unwrap().len(), 3);
    assert_eq!(v["top_items"][0]["title"], "Rust 2.0 released");
    assert!(v.get("refreshed_at").is_some(), "missing 'refreshed_at'");
}

#[tokio::test]
async fn dashboard_json_applies_sources_and_text() {
    let v = get_json("/api/dashboard?days=30&source=hn&q=ZIG").await;
    assert_eq!(v["filter"]["sources"], serde_json::json!(["hn"]));
    assert_eq!(v["filter"]["query_text"], "ZIG");
    assert_eq!(v["kpi"]["n_items"], 1);
    assert_eq!(v["by_source"][0]["source"], "hn");
}

#[tokio::test]
async fn sources_endpoint_lists_distinct_sorted() {
    let v = get_json("/api/sources").await;
    assert_eq!(v, serde_json::json!(["github", "hn", "reddit"]));
}

#[tokio::test]
async fn page_renders_kpis_and_caption() {
    let (status, ctype, bytes) = get(test_router(), "/?days=14").await;
    assert_eq!(status, StatusCode::OK);
    assert!(ctype.unwrap_or_default().starts_with("text/html"));
    let html = String::from_utf8(bytes).unwrap();
    assert!(html.contains("Using host: db.local:6543"));
    assert!(html.contains("Avg trend score"));
    assert!(html.contains("Daily volume (last 14d)"));
    assert!(html.contains("Ten day old repo"));
    assert!(html.contains("/charts/sources.png?days=14"));
}

#[tokio::test]
async fn page_echoes_search_text_as_typed() {
    let (status, _, bytes) = get(test_router(), "/?days=30&q=Rust%20").await;
    assert_eq!(status, StatusCode::OK);
    let html = String::from_utf8(bytes).unwrap();
    assert!(html.contains("value=\"Rust \""), "search box lost the typed text");
    assert!(html.contains("Rust 2.0 released"));
}

#[tokio::test]
async fn page_shows_empty_states() {
    let (status, _, bytes) = get(test_router(), "/?days=1&q=nothing%20like%20this").await;
    assert_eq!(status, StatusCode::OK);
    let html = String::from_utf8(bytes).unwrap();
    assert!(html.contains("No items match your filters."));
    assert!(html.contains("No data for selected window/sources."));
    assert!(html.contains("No daily data."));
}

#[tokio::test]
async fn unsupported_window_is_bad_request() {
    for uri in ["/?days=5", "/api/dashboard?days=abc", "/charts/daily.png?days=0"] {
        let (status, _, _) = get(test_router(), uri).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "GET {uri}");
    }
}

#[tokio::test]
async fn charts_are_png() {
    for uri in ["/charts/daily.png?days=30", "/charts/sources.png?source=hn"] {
        let (status, ctype, bytes) = get(test_router(), uri).await;
        assert_eq!(status, StatusCode::OK, "GET {uri}");
        assert_eq!(ctype.as_deref(), Some("image/png"));
        assert_eq!(&bytes[..4], &[0x89, b'P', b'N', b'G']);
    }
}

struct BrokenStore;

#[async_trait::async_trait]
impl ItemStore for BrokenStore {
    async fn run(&self, _query: &BoundQuery) -> anyhow::Result<QueryOutput> {
        Err(anyhow!("connection refused"))
    }

    fn name(&self) -> &'static str {
        "broken"
    }
}

#[tokio::test]
async fn store_errors_become_500_without_details() {
    let app = router(AppState::new(Arc::new(BrokenStore)));
    let (status, _, bytes) = get(app, "/api/dashboard").await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(!String::from_utf8(bytes).unwrap().contains("connection refused"));
}
