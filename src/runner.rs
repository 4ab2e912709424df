//! One-shot query execution with mock fallback.
//!
//! A runner invocation owns a single connection for its whole lifetime and
//! always produces exactly one JSON document for its caller.

use crate::db::{mock, postgres};
use crate::error::{sanitize_error, Error, Result};
use crate::models::{ConnectionConfig, ErrorPayload, QueryResult, Sourced};

pub const EXIT_SUCCESS: i32 = 0;
pub const EXIT_FAILURE: i32 = 1;

/// What a runner invocation prints on stdout, and its exit status.
#[derive(Debug, Clone, PartialEq)]
pub struct Invocation {
    pub exit_code: i32,
    pub stdout: String,
}

impl Invocation {
    fn success(stdout: String) -> Self {
        Invocation {
            exit_code: EXIT_SUCCESS,
            stdout,
        }
    }

    fn failure(payload: &ErrorPayload) -> Self {
        Invocation {
            exit_code: EXIT_FAILURE,
            stdout: error_json(payload),
        }
    }

    pub fn is_success(&self) -> bool {
        self.exit_code == EXIT_SUCCESS
    }
}

/// Run a statement against the live database, substituting canned rows on
/// any connection or query failure.
pub async fn run_query(config: &ConnectionConfig, sql: &str) -> Sourced<QueryResult> {
    match postgres::run(config, sql).await {
        Ok(result) => Sourced::Live(result),
        Err(e) => {
            log::error!("Database error: {}", sanitize_error(&e.to_string()));
            log::warn!("Falling back to mock data");
            mock::resolve_sourced(sql)
        }
    }
}

/// Full runner contract: validate input, run, serialize.
pub async fn invoke(config: &ConnectionConfig, sql: Option<&str>) -> Invocation {
    let Some(sql) = sql.filter(|s| !s.is_empty()) else {
        return Invocation::failure(&ErrorPayload::new(Error::MissingQuery.to_string()));
    };

    let result = run_query(config, sql).await;
    match serialize(result) {
        Ok(stdout) => Invocation::success(stdout),
        Err(e) => unexpected(&e.to_string()),
    }
}

fn serialize(result: Sourced<QueryResult>) -> Result<String> {
    result.into_inner().to_json()
}

/// Output for anything that escaped the normal path
pub fn unexpected(details: &str) -> Invocation {
    Invocation::failure(&ErrorPayload::with_details("Unexpected error", details))
}

fn error_json(payload: &ErrorPayload) -> String {
    serde_json::to_string(payload).unwrap_or_else(|_| format!("{{\"error\":{:?}}}", payload.error))
}
