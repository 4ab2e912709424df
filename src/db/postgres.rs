use sqlx::postgres::{PgConnectOptions, PgConnection, PgRow};
use sqlx::{Column, ConnectOptions, Connection, Row, TypeInfo, ValueRef};
use std::str::FromStr;

use crate::error::{sanitize_error, Error, Result};
use crate::models::{ColumnInfo, ConnectionConfig, QueryResult, Row as ResultRow, TableInfo};

pub const TABLES_QUERY: &str =
    "SELECT table_name FROM information_schema.tables WHERE table_schema = 'public';";

/// Column metadata lookup with the table name inlined, as the browser sends it.
pub fn columns_query(table_name: &str) -> String {
    format!(
        "SELECT column_name, data_type, is_nullable\n\
         FROM information_schema.columns\n\
         WHERE table_name = '{}'\n\
         AND table_schema = 'public'\n\
         ORDER BY ordinal_position;",
        table_name
    )
}

/// Row fetch with the table name inlined, as the browser sends it.
pub fn rows_query(table_name: &str, limit: u32) -> String {
    format!("SELECT * FROM {} LIMIT {};", table_name, limit)
}

/// Quote an identifier for interpolation (escape any " as "")
pub fn quote_identifier(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

/// Open a single connection, bounded by the configured connect timeout.
pub async fn connect(config: &ConnectionConfig) -> Result<PgConnection> {
    let idle_ms = config.idle_timeout.as_millis().to_string();
    let options = PgConnectOptions::from_str(&config.connection_string())?
        .options([("idle_in_transaction_session_timeout", idle_ms.as_str())])
        .application_name("pgbrowse");

    log::info!(
        "Connecting to PostgreSQL at {}:{}/{}",
        config.host,
        config.port,
        config.database
    );

    match tokio::time::timeout(config.connect_timeout, options.connect()).await {
        Ok(conn) => Ok(conn?),
        Err(_) => Err(Error::ConnectTimeout(config.connect_timeout.as_secs())),
    }
}

/// Close a connection; failures are logged and otherwise ignored.
pub async fn close(conn: PgConnection) {
    match conn.close().await {
        Ok(()) => log::info!("Database connection closed"),
        Err(e) => log::warn!("Error closing connection: {}", sanitize_error(&e.to_string())),
    }
}

/// Execute one statement verbatim and collect every row it returns.
pub async fn execute(conn: &mut PgConnection, sql: &str) -> Result<QueryResult> {
    log::info!("Executing query: {}", preview(sql, 100));

    let rows = sqlx::query(sql).fetch_all(&mut *conn).await?;
    log::info!("Query returned {} rows", rows.len());

    let json_rows = rows.iter().map(row_to_json).collect();
    Ok(QueryResult::live(json_rows, command_tag(sql)))
}

/// Connect, execute, and close, keeping the connection only for this call.
pub async fn run(config: &ConnectionConfig, sql: &str) -> Result<QueryResult> {
    let mut conn = connect(config).await?;
    log::info!("Connected to database successfully");
    let result = execute(&mut conn, sql).await;
    close(conn).await;
    result
}

/// Base tables and views in the public schema
pub async fn list_tables(conn: &mut PgConnection) -> Result<Vec<TableInfo>> {
    let rows = sqlx::query(
        r#"
        SELECT table_name::text AS table_name
        FROM information_schema.tables
        WHERE table_schema = 'public'
        ORDER BY table_name
        "#,
    )
    .fetch_all(&mut *conn)
    .await?;

    let tables = rows
        .into_iter()
        .map(|row| TableInfo {
            table_name: row.get("table_name"),
        })
        .collect();

    Ok(tables)
}

/// All columns for a public table, in ordinal order
pub async fn describe_table(conn: &mut PgConnection, table_name: &str) -> Result<Vec<ColumnInfo>> {
    let rows = sqlx::query(
        r#"
        SELECT
            column_name::text AS column_name,
            data_type::text AS data_type,
            is_nullable::text AS is_nullable
        FROM information_schema.columns
        WHERE table_schema = 'public'
          AND table_name = $1
        ORDER BY ordinal_position
        "#,
    )
    .bind(table_name)
    .fetch_all(&mut *conn)
    .await?;

    let columns = rows
        .into_iter()
        .map(|row| ColumnInfo {
            column_name: row.get("column_name"),
            data_type: row.get("data_type"),
            is_nullable: row.get("is_nullable"),
        })
        .collect();

    Ok(columns)
}

/// Up to `limit` rows of a public table. The name must already be validated.
pub async fn fetch_rows(
    conn: &mut PgConnection,
    table_name: &str,
    limit: u32,
) -> Result<Vec<ResultRow>> {
    let sql = format!(
        "SELECT * FROM public.{} LIMIT {}",
        quote_identifier(table_name),
        limit
    );
    let rows = sqlx::query(&sql).fetch_all(&mut *conn).await?;
    Ok(rows.iter().map(row_to_json).collect())
}

/// Upper-cased leading verb of a statement, resolving `WITH` to the verb of
/// the statement the CTEs feed into.
///
/// Parenthesised queries, `VALUES` and `TABLE` report `SELECT`, as the
/// server's own command tag does. sqlx does not surface that tag.
pub fn command_tag(sql: &str) -> String {
    let mut body = strip_leading_comments(sql);
    while let Some(inner) = body.strip_prefix('(') {
        body = strip_leading_comments(inner);
    }
    let verb = first_word(body).to_ascii_uppercase();

    if verb == "WITH" {
        if let Some(main) = main_verb_after_ctes(body) {
            return main;
        }
    }
    if verb == "VALUES" || verb == "TABLE" {
        return "SELECT".to_string();
    }
    verb
}

fn strip_leading_comments(sql: &str) -> &str {
    let mut rest = sql.trim_start();
    loop {
        if let Some(line) = rest.strip_prefix("--") {
            rest = line.find('\n').map(|i| &line[i + 1..]).unwrap_or("").trim_start();
        } else if let Some(block) = rest.strip_prefix("/*") {
            rest = block.find("*/").map(|i| &block[i + 2..]).unwrap_or("").trim_start();
        } else {
            return rest;
        }
    }
}

fn first_word(s: &str) -> &str {
    let end = s
        .find(|c: char| !c.is_ascii_alphabetic())
        .unwrap_or(s.len());
    &s[..end]
}

fn main_verb_after_ctes(sql: &str) -> Option<String> {
    const VERBS: [&str; 5] = ["SELECT", "INSERT", "UPDATE", "DELETE", "MERGE"];

    let mut depth = 0i32;
    let mut in_quote = false;
    let mut prev_is_word = false;

    for (i, c) in sql.char_indices() {
        if in_quote {
            if c == '\'' {
                in_quote = false;
            }
            continue;
        }
        match c {
            '\'' => in_quote = true,
            '(' => depth += 1,
            ')' => depth -= 1,
            _ if depth == 0 && !prev_is_word && c.is_ascii_alphabetic() => {
                let word = first_word(&sql[i..]).to_ascii_uppercase();
                if VERBS.contains(&word.as_str()) {
                    return Some(word);
                }
            }
            _ => {}
        }
        prev_is_word = c.is_ascii_alphanumeric() || c == '_';
    }
    None
}

/// First `max` characters of a statement, for log lines
pub fn preview(sql: &str, max: usize) -> String {
    match sql.char_indices().nth(max) {
        Some((idx, _)) => format!("{}...", &sql[..idx]),
        None => sql.to_string(),
    }
}

/// Convert a row into a column-ordered JSON object
pub fn row_to_json(row: &PgRow) -> ResultRow {
    let mut map = ResultRow::new();
    for (i, col) in row.columns().iter().enumerate() {
        let value = extract_value(row, i, col.type_info().name());
        map.insert(col.name().to_string(), value);
    }
    map
}

macro_rules! try_extract {
    ($row:expr, $index:expr, $ty:ty, $convert:expr) => {
        if let Ok(v) = $row.try_get::<Option<$ty>, _>($index) {
            return match v {
                Some(v) => $convert(v),
                None => serde_json::Value::Null,
            };
        }
    };
}

/// Extract a value from a row at the given index
fn extract_value(row: &PgRow, index: usize, type_name: &str) -> serde_json::Value {
    use serde_json::Value;

    let upper_type = type_name.to_uppercase();

    match upper_type.as_str() {
        "INT2" | "SMALLINT" => try_extract!(row, index, i16, |n: i16| Value::Number(n.into())),
        "INT4" | "INTEGER" | "SERIAL" | "OID" => {
            try_extract!(row, index, i32, |n: i32| Value::Number(n.into()))
        }
        "INT8" | "BIGINT" | "BIGSERIAL" => {
            try_extract!(row, index, i64, |n: i64| Value::Number(n.into()))
        }
        "FLOAT4" | "REAL" => try_extract!(row, index, f32, |n: f32| float_to_json(n as f64)),
        "FLOAT8" | "DOUBLE PRECISION" => try_extract!(row, index, f64, float_to_json),
        // Numerics keep full precision as decimal strings
        "NUMERIC" | "DECIMAL" => try_extract!(row, index, rust_decimal::Decimal, |d: rust_decimal::Decimal| {
            Value::String(d.to_string())
        }),
        "BOOL" | "BOOLEAN" => try_extract!(row, index, bool, Value::Bool),
        "JSON" | "JSONB" => try_extract!(row, index, Value, |v| v),
        "UUID" => try_extract!(row, index, uuid::Uuid, |u: uuid::Uuid| Value::String(u.to_string())),
        "TIMESTAMP" => try_extract!(row, index, chrono::NaiveDateTime, |dt: chrono::NaiveDateTime| {
            Value::String(dt.format("%Y-%m-%dT%H:%M:%S%.f").to_string())
        }),
        "TIMESTAMPTZ" => try_extract!(row, index, chrono::DateTime<chrono::Utc>, |dt: chrono::DateTime<chrono::Utc>| {
            Value::String(dt.to_rfc3339_opts(chrono::SecondsFormat::AutoSi, true))
        }),
        "DATE" => try_extract!(row, index, chrono::NaiveDate, |d: chrono::NaiveDate| {
            Value::String(d.to_string())
        }),
        "TIME" => try_extract!(row, index, chrono::NaiveTime, |t: chrono::NaiveTime| {
            Value::String(t.format("%H:%M:%S%.f").to_string())
        }),
        "INET" | "CIDR" => try_extract!(row, index, ipnetwork::IpNetwork, |ip: ipnetwork::IpNetwork| {
            // Single hosts print without a prefix
            let single_host = match ip {
                ipnetwork::IpNetwork::V4(net) => net.prefix() == 32,
                ipnetwork::IpNetwork::V6(net) => net.prefix() == 128,
            };
            if single_host && upper_type == "INET" {
                Value::String(ip.ip().to_string())
            } else {
                Value::String(ip.to_string())
            }
        }),
        "MACADDR" => try_extract!(row, index, mac_address::MacAddress, |mac: mac_address::MacAddress| {
            Value::String(mac.to_string())
        }),
        "BYTEA" => try_extract!(row, index, Vec<u8>, |bytes: Vec<u8>| {
            Value::String(format!("\\x{}", hex::encode(bytes)))
        }),
        _ => {}
    }

    // Fallback: anything with a text form
    try_extract!(row, index, String, Value::String);

    if let Ok(value_ref) = row.try_get_raw(index) {
        if value_ref.is_null() {
            return Value::Null;
        }
        if let Ok(s) = value_ref.as_str() {
            return Value::String(s.to_string());
        }
    }

    Value::Null
}

fn float_to_json(n: f64) -> serde_json::Value {
    serde_json::Number::from_f64(n)
        .map(serde_json::Value::Number)
        .unwrap_or_else(|| serde_json::Value::String(n.to_string()))
}
