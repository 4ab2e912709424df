use axum::extract::{Path, Query, State};
use axum::Json;
use serde::Deserialize;
use std::sync::Arc;

use crate::error::Error;
use crate::models::{clamp_row_limit, ColumnInfo, Row, SourcedRows, TableInfo};
use crate::state::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct RowsParams {
    pub limit: Option<u32>,
}

/// Tables in the public schema
pub async fn get_tables(
    State(state): State<Arc<AppState>>,
) -> Result<Json<SourcedRows<TableInfo>>, Error> {
    let tables = state.tables.list_tables().await?;
    Ok(Json(tables.into()))
}

/// Column metadata for one table
pub async fn get_columns(
    Path(table_name): Path<String>,
    State(state): State<Arc<AppState>>,
) -> Result<Json<SourcedRows<ColumnInfo>>, Error> {
    let columns = state.tables.describe_table(&table_name).await?;
    Ok(Json(columns.into()))
}

/// First rows of one table, at most 100
pub async fn get_rows(
    Path(table_name): Path<String>,
    Query(params): Query<RowsParams>,
    State(state): State<Arc<AppState>>,
) -> Result<Json<SourcedRows<Row>>, Error> {
    let limit = clamp_row_limit(params.limit);
    let rows = state.tables.fetch_rows(&table_name, limit).await?;
    Ok(Json(rows.into()))
}
