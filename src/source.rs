//! Typed access to tables, with a live and a canned implementation.

use async_trait::async_trait;

use crate::db::{mock, postgres};
use crate::error::{sanitize_error, Error, Result};
use crate::models::{ColumnInfo, ConnectionConfig, Row, Sourced, TableInfo};

const MAX_IDENTIFIER_LEN: usize = 63;

#[async_trait]
pub trait TableSource: Send + Sync {
    async fn list_tables(&self) -> Result<Vec<TableInfo>>;

    async fn describe_table(&self, table_name: &str) -> Result<Vec<ColumnInfo>>;

    async fn fetch_rows(&self, table_name: &str, limit: u32) -> Result<Vec<Row>>;
}

#[async_trait]
impl<T: TableSource + ?Sized> TableSource for std::sync::Arc<T> {
    async fn list_tables(&self) -> Result<Vec<TableInfo>> {
        (**self).list_tables().await
    }

    async fn describe_table(&self, table_name: &str) -> Result<Vec<ColumnInfo>> {
        (**self).describe_table(table_name).await
    }

    async fn fetch_rows(&self, table_name: &str, limit: u32) -> Result<Vec<Row>> {
        (**self).fetch_rows(table_name, limit).await
    }
}

/// Strict validation: letters, digits and underscores, 1-63 characters.
pub fn validate_table_name(name: &str) -> Result<()> {
    if name.is_empty() || name.len() > MAX_IDENTIFIER_LEN {
        return Err(Error::InvalidTable(format!(
            "{}: must be 1-{} characters",
            name, MAX_IDENTIFIER_LEN
        )));
    }
    if !name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
        return Err(Error::InvalidTable(format!(
            "{}: only letters, numbers, and underscores allowed",
            name
        )));
    }
    Ok(())
}

/// Reads from PostgreSQL, opening a fresh connection for every call.
#[derive(Debug, Clone)]
pub struct LiveSource {
    config: ConnectionConfig,
}

impl LiveSource {
    pub fn new(config: ConnectionConfig) -> Self {
        LiveSource { config }
    }

    /// Fails with `TableNotFound` unless `table_name` is a listed table.
    async fn ensure_listed(
        conn: &mut sqlx::PgConnection,
        table_name: &str,
    ) -> Result<()> {
        let tables = postgres::list_tables(conn).await?;
        if tables.iter().any(|t| t.table_name == table_name) {
            Ok(())
        } else {
            Err(Error::TableNotFound(table_name.to_string()))
        }
    }
}

#[async_trait]
impl TableSource for LiveSource {
    async fn list_tables(&self) -> Result<Vec<TableInfo>> {
        let mut conn = postgres::connect(&self.config).await?;
        let tables = postgres::list_tables(&mut conn).await;
        postgres::close(conn).await;
        tables
    }

    async fn describe_table(&self, table_name: &str) -> Result<Vec<ColumnInfo>> {
        validate_table_name(table_name)?;
        let mut conn = postgres::connect(&self.config).await?;
        let columns = match Self::ensure_listed(&mut conn, table_name).await {
            Ok(()) => postgres::describe_table(&mut conn, table_name).await,
            Err(e) => Err(e),
        };
        postgres::close(conn).await;
        columns
    }

    async fn fetch_rows(&self, table_name: &str, limit: u32) -> Result<Vec<Row>> {
        validate_table_name(table_name)?;
        let mut conn = postgres::connect(&self.config).await?;
        let rows = match Self::ensure_listed(&mut conn, table_name).await {
            Ok(()) => postgres::fetch_rows(&mut conn, table_name, limit).await,
            Err(e) => Err(e),
        };
        postgres::close(conn).await;
        rows
    }
}

/// Canned tables and rows; never fails for a valid name.
#[derive(Debug, Clone, Copy, Default)]
pub struct MockSource;

#[async_trait]
impl TableSource for MockSource {
    async fn list_tables(&self) -> Result<Vec<TableInfo>> {
        Ok(mock::tables())
    }

    async fn describe_table(&self, table_name: &str) -> Result<Vec<ColumnInfo>> {
        validate_table_name(table_name)?;
        Ok(mock::columns_for(table_name))
    }

    async fn fetch_rows(&self, table_name: &str, limit: u32) -> Result<Vec<Row>> {
        validate_table_name(table_name)?;
        let mut rows = mock::rows_for(table_name);
        rows.truncate(limit as usize);
        Ok(rows)
    }
}

/// Tries the primary source and answers from the fallback when it fails.
///
/// Invalid table names are rejected up front, and a table the primary
/// reports as missing stays missing; neither is masked.
pub struct FallbackSource<P, F = MockSource> {
    primary: P,
    fallback: F,
}

impl<P: TableSource> FallbackSource<P, MockSource> {
    pub fn with_mock(primary: P) -> Self {
        FallbackSource {
            primary,
            fallback: MockSource,
        }
    }
}

impl<P: TableSource, F: TableSource> FallbackSource<P, F> {
    pub async fn list_tables(&self) -> Result<Sourced<Vec<TableInfo>>> {
        match self.primary.list_tables().await {
            Ok(tables) => Ok(Sourced::Live(tables)),
            Err(e) => {
                log::warn!("Listing tables failed, using mock data: {}", describe(&e));
                self.fallback.list_tables().await.map(Sourced::Mock)
            }
        }
    }

    pub async fn describe_table(&self, table_name: &str) -> Result<Sourced<Vec<ColumnInfo>>> {
        validate_table_name(table_name)?;
        match self.primary.describe_table(table_name).await {
            Ok(columns) => Ok(Sourced::Live(columns)),
            Err(Error::TableNotFound(name)) => Err(Error::TableNotFound(name)),
            Err(e) => {
                log::warn!("Describing {} failed, using mock data: {}", table_name, describe(&e));
                self.fallback.describe_table(table_name).await.map(Sourced::Mock)
            }
        }
    }

    pub async fn fetch_rows(&self, table_name: &str, limit: u32) -> Result<Sourced<Vec<Row>>> {
        validate_table_name(table_name)?;
        match self.primary.fetch_rows(table_name, limit).await {
            Ok(rows) => Ok(Sourced::Live(rows)),
            Err(Error::TableNotFound(name)) => Err(Error::TableNotFound(name)),
            Err(e) => {
                log::warn!("Fetching {} failed, using mock data: {}", table_name, describe(&e));
                self.fallback.fetch_rows(table_name, limit).await.map(Sourced::Mock)
            }
        }
    }
}

fn describe(error: &Error) -> String {
    sanitize_error(&error.to_string())
}
