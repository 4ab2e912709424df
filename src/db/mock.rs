//! Canned results used whenever the live database path fails.
//!
//! Resolution walks an ordered rule table; the first matching rule wins and
//! the final catch-all guarantees every query text resolves to something.

use serde_json::{json, Value};

use crate::models::{ColumnInfo, QueryResult, Row, Sourced, TableInfo};
use crate::models::schema::to_row;

/// Length of the SQL echo in the catch-all row
pub const ECHO_CHARS: usize = 50;

pub const MOCK_TABLES: [&str; 5] = ["users", "products", "orders", "categories", "order_items"];

struct Rule {
    name: &'static str,
    matches: fn(&str) -> bool,
    result: fn() -> QueryResult,
}

const RULES: &[Rule] = &[
    Rule {
        name: "table listing",
        matches: is_table_listing,
        result: table_listing,
    },
    Rule {
        name: "users columns",
        matches: is_users_columns,
        result: users_columns_result,
    },
    Rule {
        name: "products columns",
        matches: is_products_columns,
        result: products_columns_result,
    },
    Rule {
        name: "users scan",
        matches: is_users_scan,
        result: users_scan,
    },
    Rule {
        name: "products scan",
        matches: is_products_scan,
        result: products_scan,
    },
];

fn is_table_listing(q: &str) -> bool {
    q.contains("information_schema.tables")
}

fn is_columns_lookup(q: &str, table: &str) -> bool {
    q.contains("information_schema.columns") && q.contains(&format!("table_name = '{}'", table))
}

fn is_users_columns(q: &str) -> bool {
    is_columns_lookup(q, "users")
}

fn is_products_columns(q: &str) -> bool {
    is_columns_lookup(q, "products")
}

fn is_users_scan(q: &str) -> bool {
    q.contains("select * from users")
}

fn is_products_scan(q: &str) -> bool {
    q.contains("select * from products")
}

/// Resolve a query to its canned result. Never fails.
pub fn resolve(sql: &str) -> QueryResult {
    let query = sql.trim().to_lowercase();

    for rule in RULES {
        if (rule.matches)(&query) {
            log::debug!("Mock rule matched: {}", rule.name);
            return (rule.result)();
        }
    }

    QueryResult::rows_only(vec![row(json!({
        "message": "Query executed successfully (mock)",
        "query": format!("{}...", truncate_chars(sql, ECHO_CHARS)),
    }))])
}

/// [`resolve`] tagged as mock data
pub fn resolve_sourced(sql: &str) -> Sourced<QueryResult> {
    Sourced::Mock(resolve(sql))
}

fn truncate_chars(s: &str, max: usize) -> &str {
    match s.char_indices().nth(max) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}

fn row(value: Value) -> Row {
    match value {
        Value::Object(map) => map,
        _ => Row::new(),
    }
}

pub fn tables() -> Vec<TableInfo> {
    MOCK_TABLES
        .iter()
        .map(|name| TableInfo {
            table_name: name.to_string(),
        })
        .collect()
}

fn table_listing() -> QueryResult {
    QueryResult::rows_only(tables().iter().map(to_row).collect())
}

fn users_columns_result() -> QueryResult {
    QueryResult::rows_only(users_columns().iter().map(to_row).collect())
}

fn products_columns_result() -> QueryResult {
    QueryResult::rows_only(products_columns().iter().map(to_row).collect())
}

fn users_scan() -> QueryResult {
    QueryResult::rows_only(users_rows())
}

fn products_scan() -> QueryResult {
    QueryResult::rows_only(products_rows())
}

pub fn users_columns() -> Vec<ColumnInfo> {
    vec![
        ColumnInfo::new("id", "integer", false),
        ColumnInfo::new("username", "character varying", false),
        ColumnInfo::new("email", "character varying", false),
        ColumnInfo::new("full_name", "character varying", true),
        ColumnInfo::new("created_at", "timestamp with time zone", false),
        ColumnInfo::new("is_active", "boolean", false),
    ]
}

pub fn products_columns() -> Vec<ColumnInfo> {
    vec![
        ColumnInfo::new("id", "integer", false),
        ColumnInfo::new("name", "character varying", false),
        ColumnInfo::new("description", "text", true),
        ColumnInfo::new("price", "numeric", false),
        ColumnInfo::new("category_id", "integer", true),
        ColumnInfo::new("stock_quantity", "integer", false),
    ]
}

/// Shape used for any table without dedicated fixtures
pub fn generic_columns() -> Vec<ColumnInfo> {
    vec![
        ColumnInfo::new("id", "integer", false),
        ColumnInfo::new("name", "character varying", false),
        ColumnInfo::new("created_at", "timestamp with time zone", false),
    ]
}

pub fn users_rows() -> Vec<Row> {
    vec![
        row(json!({"id": 1, "username": "john_doe", "email": "john@example.com", "full_name": "John Doe", "created_at": "2024-01-15T10:30:00Z", "is_active": true})),
        row(json!({"id": 2, "username": "jane_smith", "email": "jane@example.com", "full_name": "Jane Smith", "created_at": "2024-01-16T14:22:00Z", "is_active": true})),
        row(json!({"id": 3, "username": "bob_wilson", "email": "bob@example.com", "full_name": "Bob Wilson", "created_at": "2024-01-17T09:15:00Z", "is_active": false})),
        row(json!({"id": 4, "username": "alice_brown", "email": "alice@example.com", "full_name": "Alice Brown", "created_at": "2024-01-18T16:45:00Z", "is_active": true})),
    ]
}

pub fn products_rows() -> Vec<Row> {
    vec![
        row(json!({"id": 1, "name": "Laptop Pro", "description": "High-performance laptop", "price": "1299.99", "category_id": 1, "stock_quantity": 25})),
        row(json!({"id": 2, "name": "Wireless Mouse", "description": "Ergonomic wireless mouse", "price": "29.99", "category_id": 2, "stock_quantity": 150})),
        row(json!({"id": 3, "name": "Mechanical Keyboard", "description": "RGB backlit keyboard", "price": "89.99", "category_id": 2, "stock_quantity": 75})),
    ]
}

pub fn generic_rows() -> Vec<Row> {
    vec![
        row(json!({"id": 1, "name": "Sample Item 1", "created_at": "2024-01-15T10:30:00Z"})),
        row(json!({"id": 2, "name": "Sample Item 2", "created_at": "2024-01-16T14:22:00Z"})),
    ]
}

/// Columns for a table by name, generic shape for unknown tables
pub fn columns_for(table_name: &str) -> Vec<ColumnInfo> {
    match table_name {
        "users" => users_columns(),
        "products" => products_columns(),
        _ => generic_columns(),
    }
}

/// Rows for a table by name, generic rows for unknown tables
pub fn rows_for(table_name: &str) -> Vec<Row> {
    match table_name {
        "users" => users_rows(),
        "products" => products_rows(),
        _ => generic_rows(),
    }
}
