//! Table browser client for the gateway.
//!
//! Every read degrades to local mock data instead of failing, and loading a
//! table is all-or-nothing: both live requests must succeed or neither
//! result is used.

use async_trait::async_trait;
use std::fmt::Write as _;

use crate::db::{mock, postgres};
use crate::error::{Error, Result};
use crate::models::schema::decode_rows;
use crate::models::{ColumnInfo, DataSource, ErrorPayload, QueryRequest, QueryResult, Row, TableInfo};

pub const ROW_LIMIT: u32 = 100;

/// Sends one SQL string to the gateway.
#[async_trait]
pub trait QueryTransport: Send + Sync {
    async fn query(&self, sql: &str) -> Result<QueryResult>;
}

/// `POST {base_url}/api/query` over HTTP.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
    endpoint: String,
}

impl HttpTransport {
    pub fn new(base_url: &str) -> Self {
        HttpTransport {
            client: reqwest::Client::new(),
            endpoint: format!("{}/api/query", base_url.trim_end_matches('/')),
        }
    }
}

#[async_trait]
impl QueryTransport for HttpTransport {
    async fn query(&self, sql: &str) -> Result<QueryResult> {
        let response = self
            .client
            .post(&self.endpoint)
            .json(&QueryRequest::new(sql))
            .send()
            .await?;

        let status = response.status();
        let body: serde_json::Value = response.json().await?;
        parse_response(status.as_u16(), body)
    }
}

/// Turn a gateway response into a result, treating error payloads and
/// bodies without `rows` as failures.
pub fn parse_response(status: u16, body: serde_json::Value) -> Result<QueryResult> {
    if !(200..300).contains(&status) {
        let message = serde_json::from_value::<ErrorPayload>(body)
            .map(|p| match p.details {
                Some(details) => format!("{}: {}", p.error, details),
                None => p.error,
            })
            .unwrap_or_else(|_| format!("HTTP error! status: {}", status));
        return Err(Error::Gateway { status, message });
    }

    if let Some(error) = body.get("error").and_then(|e| e.as_str()) {
        return Err(Error::Gateway {
            status,
            message: error.to_string(),
        });
    }

    if !body.get("rows").map(|r| r.is_array()).unwrap_or(false) {
        return Err(Error::InvalidOutput("response has no rows".to_string()));
    }

    Ok(serde_json::from_value(body)?)
}

#[derive(Debug, Clone, PartialEq)]
pub struct TableList {
    pub tables: Vec<TableInfo>,
    pub source: DataSource,
    pub warning: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TableView {
    pub table_name: String,
    pub columns: Vec<ColumnInfo>,
    pub rows: Vec<Row>,
    pub source: DataSource,
    pub warning: Option<String>,
}

/// List tables, or the local five-table list with a warning.
pub async fn list_tables<T: QueryTransport + ?Sized>(transport: &T) -> TableList {
    match transport.query(postgres::TABLES_QUERY).await {
        Ok(result) => TableList {
            tables: decode_rows(result.rows),
            source: DataSource::Live,
            warning: None,
        },
        Err(e) => {
            log::warn!("Error fetching tables from backend: {}", e);
            TableList {
                tables: mock::tables(),
                source: DataSource::Mock,
                warning: Some(format!("Backend connection failed, using mock data: {}", e)),
            }
        }
    }
}

/// Fetch columns and rows together; any failure swaps in local mocks.
pub async fn load_table<T: QueryTransport + ?Sized>(transport: &T, table_name: &str) -> TableView {
    let columns_sql = postgres::columns_query(table_name);
    let rows_sql = postgres::rows_query(table_name, ROW_LIMIT);

    let (columns, rows) = futures::join!(transport.query(&columns_sql), transport.query(&rows_sql));

    match (columns, rows) {
        (Ok(columns), Ok(rows)) => {
            log::info!("Real data loaded for table: {}", table_name);
            TableView {
                table_name: table_name.to_string(),
                columns: decode_rows(columns.rows),
                rows: rows.rows,
                source: DataSource::Live,
                warning: None,
            }
        }
        (columns, rows) => {
            let reason = columns.err().or(rows.err()).map(|e| e.to_string()).unwrap_or_default();
            log::warn!("Using mock data for table {}: {}", table_name, reason);
            TableView {
                table_name: table_name.to_string(),
                columns: mock::columns_for(table_name),
                rows: mock::rows_for(table_name),
                source: DataSource::Mock,
                warning: Some(format!("API call failed, using mock data: {}", reason)),
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum LoadState {
    Idle,
    Loading,
    Loaded(DataSource),
}

/// Issued by [`TableBrowser::begin_load`]; only the newest ticket applies.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoadTicket(u64);

/// Browser state: table list, current selection, and what is on screen.
pub struct TableBrowser<T> {
    transport: T,
    tables: Vec<TableInfo>,
    selected: Option<String>,
    view: Option<TableView>,
    state: LoadState,
    warning: Option<String>,
    generation: u64,
}

impl<T: QueryTransport> TableBrowser<T> {
    pub fn new(transport: T) -> Self {
        TableBrowser {
            transport,
            tables: Vec::new(),
            selected: None,
            view: None,
            state: LoadState::Idle,
            warning: None,
            generation: 0,
        }
    }

    pub fn tables(&self) -> &[TableInfo] {
        &self.tables
    }

    pub fn selected(&self) -> Option<&str> {
        self.selected.as_deref()
    }

    pub fn view(&self) -> Option<&TableView> {
        self.view.as_ref()
    }

    pub fn state(&self) -> &LoadState {
        &self.state
    }

    pub fn warning(&self) -> Option<&str> {
        self.warning.as_deref()
    }

    pub async fn refresh_tables(&mut self) {
        self.state = LoadState::Loading;
        self.warning = None;
        let list = list_tables(&self.transport).await;
        self.tables = list.tables;
        self.warning = list.warning;
        self.state = LoadState::Loaded(list.source);
    }

    /// Record a new selection and clear whatever the previous one showed.
    pub fn begin_load(&mut self, table_name: &str) -> LoadTicket {
        self.generation += 1;
        self.selected = Some(table_name.to_string());
        self.view = None;
        self.warning = None;
        self.state = LoadState::Loading;
        LoadTicket(self.generation)
    }

    /// Apply a finished load; returns false if a newer selection superseded it.
    pub fn finish_load(&mut self, ticket: LoadTicket, view: TableView) -> bool {
        if ticket.0 != self.generation {
            log::debug!("Discarding stale load for {}", view.table_name);
            return false;
        }
        self.state = LoadState::Loaded(view.source);
        self.warning = view.warning.clone();
        self.view = Some(view);
        true
    }

    pub async fn select(&mut self, table_name: &str) {
        let ticket = self.begin_load(table_name);
        let view = load_table(&self.transport, table_name).await;
        self.finish_load(ticket, view);
    }
}

fn cell_text(value: Option<&serde_json::Value>) -> String {
    match value {
        None | Some(serde_json::Value::Null) => "NULL".to_string(),
        Some(serde_json::Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
    }
}

/// Plain-text grid: header from the column list, one line per row.
pub fn render_table(view: &TableView) -> String {
    let headers: Vec<&str> = view.columns.iter().map(|c| c.column_name.as_str()).collect();
    let cells: Vec<Vec<String>> = view
        .rows
        .iter()
        .map(|row| headers.iter().map(|h| cell_text(row.get(*h))).collect())
        .collect();

    let widths: Vec<usize> = headers
        .iter()
        .enumerate()
        .map(|(i, h)| {
            cells
                .iter()
                .map(|r| r[i].chars().count())
                .chain(std::iter::once(h.chars().count()))
                .max()
                .unwrap_or(0)
        })
        .collect();

    let mut out = String::new();
    let _ = writeln!(
        out,
        "{} ({} rows, {})",
        view.table_name,
        view.rows.len(),
        match view.source {
            DataSource::Live => "live",
            DataSource::Mock => "mock",
        }
    );
    let line = |values: Vec<String>| -> String {
        values
            .iter()
            .zip(&widths)
            .map(|(v, w)| format!("{:<width$}", v, width = *w))
            .collect::<Vec<_>>()
            .join(" | ")
    };
    let _ = writeln!(out, "{}", line(headers.iter().map(|h| h.to_string()).collect()));
    let _ = writeln!(
        out,
        "{}",
        widths.iter().map(|w| "-".repeat(*w)).collect::<Vec<_>>().join("-+-")
    );
    for row in cells {
        let _ = writeln!(out, "{}", line(row));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    /// Answers from the mock resolver as if the database were live.
    struct Echo;

    #[async_trait]
    impl QueryTransport for Echo {
        async fn query(&self, sql: &str) -> Result<QueryResult> {
            Ok(mock::resolve(sql))
        }
    }

    /// Fails every query.
    #[derive(Clone, Default)]
    struct Offline {
        calls: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl QueryTransport for Offline {
        async fn query(&self, _sql: &str) -> Result<QueryResult> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Err(Error::Gateway {
                status: 500,
                message: "Database query failed".to_string(),
            })
        }
    }

    /// Columns succeed, rows fail.
    struct HalfUp;

    #[async_trait]
    impl QueryTransport for HalfUp {
        async fn query(&self, sql: &str) -> Result<QueryResult> {
            if sql.contains("information_schema.columns") {
                Ok(QueryResult::rows_only(vec![]))
            } else {
                Err(Error::InvalidOutput("response has no rows".to_string()))
            }
        }
    }

    #[tokio::test]
    async fn offline_table_list_falls_back_with_warning() {
        let list = list_tables(&Offline::default()).await;
        assert_eq!(list.source, DataSource::Mock);
        assert_eq!(list.tables.len(), 5);
        assert!(list.warning.unwrap().starts_with("Backend connection failed"));
    }

    #[tokio::test]
    async fn live_table_list_has_no_warning() {
        let list = list_tables(&Echo).await;
        assert_eq!(list.source, DataSource::Live);
        assert_eq!(list.warning, None);
        assert_eq!(list.tables[4].table_name, "order_items");
    }

    #[tokio::test]
    async fn load_table_issues_both_queries() {
        let offline = Offline::default();
        load_table(&offline, "users").await;
        assert_eq!(offline.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn unknown_table_falls_back_to_generic_shape() {
        let view = load_table(&Offline::default(), "invoices").await;
        assert_eq!(view.source, DataSource::Mock);
        let names: Vec<&str> = view.columns.iter().map(|c| c.column_name.as_str()).collect();
        assert_eq!(names, ["id", "name", "created_at"]);
        assert_eq!(view.rows.len(), 2);
    }

    #[tokio::test]
    async fn partial_success_is_discarded() {
        let view = load_table(&HalfUp, "products").await;
        assert_eq!(view.source, DataSource::Mock);
        assert_eq!(view.columns.len(), 6);
        assert_eq!(view.rows.len(), 3);
    }

    #[tokio::test]
    async fn live_load_uses_gateway_rows() {
        let view = load_table(&Echo, "users").await;
        assert_eq!(view.source, DataSource::Live);
        assert_eq!(view.columns.len(), 6);
        assert_eq!(view.rows.len(), 4);
    }

    #[tokio::test]
    async fn stale_loads_are_discarded() {
        let mut browser = TableBrowser::new(Offline::default());
        let first = browser.begin_load("users");
        let first_view = load_table(&Offline::default(), "users").await;
        let second = browser.begin_load("products");
        assert!(browser.view().is_none());
        assert_eq!(browser.state(), &LoadState::Loading);

        assert!(!browser.finish_load(first, first_view));
        assert!(browser.view().is_none());

        let second_view = load_table(&Offline::default(), "products").await;
        assert!(browser.finish_load(second, second_view));
        assert_eq!(browser.view().unwrap().table_name, "products");
        assert_eq!(browser.selected(), Some("products"));
    }

    #[tokio::test]
    async fn select_replaces_previous_table() {
        let mut browser = TableBrowser::new(Echo);
        browser.refresh_tables().await;
        assert_eq!(browser.tables().len(), 5);

        browser.select("users").await;
        assert_eq!(browser.view().unwrap().rows.len(), 4);
        browser.select("products").await;
        let view = browser.view().unwrap();
        assert_eq!(view.table_name, "products");
        assert_eq!(view.rows.len(), 3);
        assert_eq!(browser.state(), &LoadState::Loaded(DataSource::Live));
    }

    #[test]
    fn error_payloads_are_failures() {
        let err = parse_response(200, json!({"error": "SQL query is required"})).unwrap_err();
        assert!(matches!(err, Error::Gateway { status: 200, .. }));

        let err = parse_response(
            500,
            json!({"error": "Database query failed", "details": "timed out"}),
        )
        .unwrap_err();
        assert_eq!(
            err.to_string(),
            "Gateway returned 500: Database query failed: timed out"
        );

        assert!(parse_response(200, json!({"message": "ok"})).is_err());
        assert_eq!(parse_response(200, json!({"rows": []})).unwrap().rows.len(), 0);
    }

    #[test]
    fn renders_a_grid() {
        let view = TableView {
            table_name: "products".to_string(),
            columns: mock::products_columns(),
            rows: mock::products_rows(),
            source: DataSource::Mock,
            warning: None,
        };
        let text = render_table(&view);
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "products (3 rows, mock)");
        assert!(lines[1].starts_with("id | name"));
        assert!(lines[3].contains("Laptop Pro"));
        assert_eq!(lines.len(), 6);
    }
}
