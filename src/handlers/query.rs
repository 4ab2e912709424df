use axum::body::Bytes;
use axum::extract::State;
use axum::http::header;
use axum::response::IntoResponse;
use std::sync::Arc;
use std::time::Instant;

use crate::db::postgres;
use crate::error::{sanitize_error, Error};
use crate::models::QueryRequest;
use crate::state::AppState;

/// Run one SQL string through the query runner and relay its JSON unchanged.
///
/// Live and mock results look the same to the caller; only spawn, timeout
/// and output failures surface as errors.
pub async fn execute_query(
    State(state): State<Arc<AppState>>,
    body: Bytes,
) -> Result<impl IntoResponse, Error> {
    let request = QueryRequest::from_body(&body)?;
    let Some(sql) = request.sql() else {
        log::warn!("Rejected query request without SQL");
        return Err(Error::MissingQuery);
    };

    let request_id = uuid::Uuid::new_v4();
    let start = Instant::now();
    log::info!("[{}] Executing SQL: {}", request_id, postgres::preview(sql, 100));

    match state.invoker.invoke(sql).await {
        Ok(body) => {
            log::info!(
                "[{}] Query finished in {}ms",
                request_id,
                start.elapsed().as_millis()
            );
            Ok(([(header::CONTENT_TYPE, "application/json")], body))
        }
        Err(e) => {
            log::error!(
                "[{}] Query runner error: {}",
                request_id,
                sanitize_error(&e.to_string())
            );
            Err(e)
        }
    }
}
