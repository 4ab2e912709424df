use serde::{Deserialize, Serialize};

/// A single result row: column name to JSON scalar, in column order.
pub type Row = serde_json::Map<String, serde_json::Value>;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct QueryRequest {
    #[serde(default)]
    pub sql: Option<String>,
}

impl QueryRequest {
    pub fn new(sql: impl Into<String>) -> Self {
        QueryRequest { sql: Some(sql.into()) }
    }

    /// Decode a request body. An empty body reads as `{}`, whatever the
    /// content type.
    pub fn from_body(body: &[u8]) -> crate::Result<Self> {
        if body.iter().all(u8::is_ascii_whitespace) {
            return Ok(QueryRequest::default());
        }
        serde_json::from_slice(body).map_err(|e| crate::Error::InvalidRequest(e.to_string()))
    }

    /// The SQL text, if present and non-empty
    pub fn sql(&self) -> Option<&str> {
        self.sql.as_deref().filter(|s| !s.is_empty())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryResult {
    pub rows: Vec<Row>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub row_count: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub command: Option<String>,
}

impl QueryResult {
    /// Result from a live statement; `rowCount` always matches `rows`.
    pub fn live(rows: Vec<Row>, command: impl Into<String>) -> Self {
        QueryResult {
            row_count: Some(rows.len() as u64),
            rows,
            command: Some(command.into()),
        }
    }

    /// Canned result; mock output carries rows only.
    pub fn rows_only(rows: Vec<Row>) -> Self {
        QueryResult {
            rows,
            row_count: None,
            command: None,
        }
    }

    pub fn to_json(&self) -> crate::Result<String> {
        Ok(serde_json::to_string(self)?)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorPayload {
    pub error: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl ErrorPayload {
    pub fn new(error: impl Into<String>) -> Self {
        ErrorPayload {
            error: error.into(),
            details: None,
        }
    }

    pub fn with_details(error: impl Into<String>, details: impl Into<String>) -> Self {
        ErrorPayload {
            error: error.into(),
            details: Some(details.into()),
        }
    }
}

/// Whether data came from the database or from canned fallback rows.
#[derive(Debug, Clone, PartialEq)]
pub enum Sourced<T> {
    Live(T),
    Mock(T),
}

impl<T> Sourced<T> {
    pub fn is_live(&self) -> bool {
        matches!(self, Sourced::Live(_))
    }

    pub fn is_mock(&self) -> bool {
        matches!(self, Sourced::Mock(_))
    }

    pub fn source(&self) -> DataSource {
        match self {
            Sourced::Live(_) => DataSource::Live,
            Sourced::Mock(_) => DataSource::Mock,
        }
    }

    pub fn into_inner(self) -> T {
        match self {
            Sourced::Live(value) | Sourced::Mock(value) => value,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DataSource {
    Live,
    Mock,
}

/// Response body of the typed table routes
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourcedRows<T> {
    pub source: DataSource,
    pub rows: Vec<T>,
}

impl<T> From<Sourced<Vec<T>>> for SourcedRows<T> {
    fn from(sourced: Sourced<Vec<T>>) -> Self {
        SourcedRows {
            source: sourced.source(),
            rows: sourced.into_inner(),
        }
    }
}
