use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use std::sync::Arc;

use crate::error::{sanitize_error, Error};
use crate::models::ErrorPayload;
use crate::state::AppState;

pub mod health;
pub mod metadata;
pub mod query;

pub use health::*;
pub use metadata::*;
pub use query::*;

/// All gateway routes
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/api/health", get(health::health))
        .route("/api/query", post(query::execute_query))
        .route("/api/tables", get(metadata::get_tables))
        .route("/api/tables/:table_name/columns", get(metadata::get_columns))
        .route("/api/tables/:table_name/rows", get(metadata::get_rows))
        .with_state(state)
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let (status, payload) = match &self {
            Error::MissingQuery => (StatusCode::BAD_REQUEST, ErrorPayload::new(self.to_string())),
            Error::InvalidRequest(details) => (
                StatusCode::BAD_REQUEST,
                ErrorPayload::with_details("Invalid request body", details.clone()),
            ),
            Error::InvalidTable(_) => (
                StatusCode::BAD_REQUEST,
                ErrorPayload::with_details("Invalid table name", self.to_string()),
            ),
            Error::TableNotFound(_) => (
                StatusCode::NOT_FOUND,
                ErrorPayload::with_details("Table not found", self.to_string()),
            ),
            _ => (
                StatusCode::INTERNAL_SERVER_ERROR,
                ErrorPayload::with_details(
                    "Database query failed",
                    sanitize_error(&self.to_string()),
                ),
            ),
        };

        (status, Json(payload)).into_response()
    }
}
