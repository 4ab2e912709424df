use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tower::ServiceExt;

use pgbrowse::db::{mock, postgres};
use pgbrowse::error::{Error, Result};
use pgbrowse::handlers::router;
use pgbrowse::invoker::{InProcessInvoker, ProcessInvoker, QueryInvoker};
use pgbrowse::models::{ColumnInfo, ConnectionConfig, Row, TableInfo};
use pgbrowse::source::{LiveSource, TableSource};
use pgbrowse::state::AppState;

fn unreachable() -> ConnectionConfig {
    ConnectionConfig {
        host: "127.0.0.1".to_string(),
        port: 1,
        connect_timeout: Duration::from_secs(2),
        ..ConnectionConfig::default()
    }
}

fn app(invoker: Arc<dyn QueryInvoker>) -> Router {
    let state = AppState::new(invoker, Arc::new(LiveSource::new(unreachable())));
    router(Arc::new(state))
}

/// Replies with a fixed outcome and counts invocations.
struct Canned {
    calls: AtomicUsize,
    reply: fn() -> Result<String>,
}

impl Canned {
    fn new(reply: fn() -> Result<String>) -> Arc<Self> {
        Arc::new(Canned {
            calls: AtomicUsize::new(0),
            reply,
        })
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl QueryInvoker for Canned {
    async fn invoke(&self, _sql: &str) -> Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        (self.reply)()
    }
}

async fn post_query(app: Router, body: &str) -> (StatusCode, String) {
    let request = Request::builder()
        .method("POST")
        .uri("/api/query")
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap();
    send(app, request).await
}

async fn get(app: Router, uri: &str) -> (StatusCode, String) {
    let request = Request::builder().uri(uri).body(Body::empty()).unwrap();
    send(app, request).await
}

async fn send(app: Router, request: Request<Body>) -> (StatusCode, String) {
    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    (status, String::from_utf8(bytes.to_vec()).unwrap())
}

#[tokio::test]
async fn missing_sql_is_rejected_without_invoking_runner() {
    let invoker = Canned::new(|| Ok(r#"{"rows":[]}"#.to_string()));

    let (status, body) = post_query(app(invoker.clone()), "{}").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body, r#"{"error":"SQL query is required"}"#);

    let (status, _) = post_query(app(invoker.clone()), r#"{"sql":""}"#).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    assert_eq!(invoker.calls(), 0);
}

#[tokio::test]
async fn runner_output_is_relayed_verbatim() {
    let invoker = Canned::new(|| Ok(r#"{"rows":[{"b":2,"a":1}],"rowCount":1,"command":"SELECT"}"#.to_string()));

    let (status, body) = post_query(app(invoker.clone()), r#"{"sql":"SELECT 2 AS b, 1 AS a"}"#).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, r#"{"rows":[{"b":2,"a":1}],"rowCount":1,"command":"SELECT"}"#);
    assert_eq!(invoker.calls(), 1);
}

#[tokio::test]
async fn runner_failure_is_a_server_error() {
    let invoker = Canned::new(|| Err(Error::InvalidOutput("expected value at line 1 column 1".to_string())));

    let (status, body) = post_query(app(invoker), r#"{"sql":"SELECT 1"}"#).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    let payload: serde_json::Value = serde_json::from_str(&body).unwrap();
    assert_eq!(payload["error"], "Database query failed");
    assert!(payload["details"].as_str().unwrap().contains("expected value"));
}

#[tokio::test]
async fn runner_timeout_is_a_server_error() {
    let invoker = Canned::new(|| Err(Error::RunnerTimeout(30)));
    let (status, _) = post_query(app(invoker), r#"{"sql":"SELECT pg_sleep(600)"}"#).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
}

#[tokio::test]
async fn bodyless_post_reads_as_missing_sql() {
    let invoker = Canned::new(|| Ok("{}".to_string()));
    let request = Request::builder()
        .method("POST")
        .uri("/api/query")
        .body(Body::empty())
        .unwrap();

    let (status, body) = send(app(invoker.clone()), request).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body, r#"{"error":"SQL query is required"}"#);

    let (status, body) = post_query(app(invoker.clone()), "").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body, r#"{"error":"SQL query is required"}"#);

    assert_eq!(invoker.calls(), 0);
}

#[tokio::test]
async fn malformed_body_is_a_json_client_error() {
    let invoker = Canned::new(|| Ok("{}".to_string()));

    for body in ["not json", r#"{"sql":5}"#] {
        let (status, response) = post_query(app(invoker.clone()), body).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        let payload: serde_json::Value = serde_json::from_str(&response).unwrap();
        assert_eq!(payload["error"], "Invalid request body");
        assert!(payload["details"].is_string());
    }

    assert_eq!(invoker.calls(), 0);
}

#[tokio::test]
async fn in_process_fallback_matches_direct_mock() {
    let invoker = Arc::new(InProcessInvoker::new(unreachable()));
    let body = serde_json::json!({ "sql": postgres::TABLES_QUERY }).to_string();

    let (status, response) = post_query(app(invoker), &body).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(response, mock::resolve(postgres::TABLES_QUERY).to_json().unwrap());
}

#[tokio::test]
async fn spawned_runner_fallback_matches_direct_mock() {
    let invoker = ProcessInvoker::new(env!("CARGO_BIN_EXE_pgbrowse-query"), Duration::from_secs(30))
        .env("PGBROWSE_DB_HOST", "127.0.0.1")
        .env("PGBROWSE_DB_PORT", "1");
    let body = serde_json::json!({ "sql": postgres::TABLES_QUERY }).to_string();

    let (status, response) = post_query(app(Arc::new(invoker)), &body).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(response, mock::resolve(postgres::TABLES_QUERY).to_json().unwrap());
}

#[tokio::test]
async fn typed_routes_report_mock_source() {
    let invoker = Canned::new(|| Ok("{}".to_string()));

    let (status, body) = get(app(invoker.clone()), "/api/tables").await;
    assert_eq!(status, StatusCode::OK);
    let payload: serde_json::Value = serde_json::from_str(&body).unwrap();
    assert_eq!(payload["source"], "mock");
    assert_eq!(payload["rows"].as_array().unwrap().len(), 5);

    let (status, body) = get(app(invoker.clone()), "/api/tables/users/columns").await;
    assert_eq!(status, StatusCode::OK);
    let payload: serde_json::Value = serde_json::from_str(&body).unwrap();
    assert_eq!(payload["rows"][3]["column_name"], "full_name");
    assert_eq!(payload["rows"][3]["is_nullable"], "YES");

    assert_eq!(invoker.calls(), 0);
}

/// A reachable database with no tables at all.
struct EmptyCatalog;

#[async_trait]
impl TableSource for EmptyCatalog {
    async fn list_tables(&self) -> Result<Vec<TableInfo>> {
        Ok(Vec::new())
    }

    async fn describe_table(&self, table_name: &str) -> Result<Vec<ColumnInfo>> {
        Err(Error::TableNotFound(table_name.to_string()))
    }

    async fn fetch_rows(&self, table_name: &str, _limit: u32) -> Result<Vec<Row>> {
        Err(Error::TableNotFound(table_name.to_string()))
    }
}

#[tokio::test]
async fn unknown_table_is_not_found() {
    let invoker = Canned::new(|| Ok("{}".to_string()));
    let state = AppState::new(invoker, Arc::new(EmptyCatalog));
    let app = router(Arc::new(state));

    let (status, body) = get(app.clone(), "/api/tables/payroll/columns").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let payload: serde_json::Value = serde_json::from_str(&body).unwrap();
    assert_eq!(payload["error"], "Table not found");

    let (status, _) = get(app, "/api/tables/payroll/rows").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn typed_row_limit_is_clamped() {
    let invoker = Canned::new(|| Ok("{}".to_string()));

    let (_, body) = get(app(invoker.clone()), "/api/tables/users/rows?limit=2").await;
    let payload: serde_json::Value = serde_json::from_str(&body).unwrap();
    assert_eq!(payload["rows"].as_array().unwrap().len(), 2);

    let (_, body) = get(app(invoker), "/api/tables/users/rows?limit=0").await;
    let payload: serde_json::Value = serde_json::from_str(&body).unwrap();
    assert_eq!(payload["rows"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn typed_routes_reject_unsafe_table_names() {
    let invoker = Canned::new(|| Ok("{}".to_string()));
    let (status, body) = get(app(invoker), "/api/tables/users%3BDROP/rows").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body.contains("Invalid table name"));
}

#[tokio::test]
async fn health_reports_version() {
    let invoker = Canned::new(|| Ok("{}".to_string()));
    let (status, body) = get(app(invoker), "/api/health").await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.contains(env!("CARGO_PKG_VERSION")));
}
