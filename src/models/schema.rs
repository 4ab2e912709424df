use serde::{Deserialize, Serialize};

use super::Row;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableInfo {
    pub table_name: String,
}

/// Column metadata as reported by `information_schema.columns`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnInfo {
    pub column_name: String,
    pub data_type: String,
    /// `"YES"` or `"NO"`, exactly as information_schema spells it
    pub is_nullable: String,
}

impl ColumnInfo {
    pub fn new(column_name: &str, data_type: &str, nullable: bool) -> Self {
        ColumnInfo {
            column_name: column_name.to_string(),
            data_type: data_type.to_string(),
            is_nullable: if nullable { "YES" } else { "NO" }.to_string(),
        }
    }
}

/// Decode result rows into a typed shape, skipping rows that don't fit.
pub fn decode_rows<T: serde::de::DeserializeOwned>(rows: Vec<Row>) -> Vec<T> {
    rows.into_iter()
        .filter_map(|row| serde_json::from_value(serde_json::Value::Object(row)).ok())
        .collect()
}

/// Convert a typed value into a result row.
pub fn to_row<T: Serialize>(value: &T) -> Row {
    match serde_json::to_value(value) {
        Ok(serde_json::Value::Object(map)) => map,
        _ => Row::new(),
    }
}
