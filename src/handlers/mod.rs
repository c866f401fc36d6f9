//! Request handlers for the HTTP API.
//!
//! Handlers stay thin: decode params, run the core operation on the
//! blocking pool, map the outcome onto a status code and JSON body.
//! Scoped-visibility misses come back as 404 with the same body a truly
//! missing row would produce.

pub mod projects;
pub mod similar;
pub mod tasks;

use std::sync::Arc;

use axum::http::StatusCode;
use axum::Json;

use crate::server::{error_response, AppState};

/// Run a closure against the shared connection on the blocking pool.
///
/// Any failure is logged and collapsed into a generic 500 — core errors
/// never leak internals through the API.
pub(crate) async fn with_db<T, F>(
    state: &AppState,
    f: F,
) -> Result<T, (StatusCode, Json<serde_json::Value>)>
where
    F: FnOnce(&mut rusqlite::Connection) -> anyhow::Result<T> + Send + 'static,
    T: Send + 'static,
{
    let db = Arc::clone(&state.db);
    let outcome = tokio::task::spawn_blocking(move || {
        let mut conn = db
            .lock()
            .map_err(|e| anyhow::anyhow!("db lock poisoned: {e}"))?;
        f(&mut conn)
    })
    .await;

    match outcome {
        Ok(Ok(value)) => Ok(value),
        Ok(Err(e)) => {
            tracing::error!(error = %e, "request failed");
            Err(error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                "internal error",
            ))
        }
        Err(e) => {
            tracing::error!(error = %e, "db task panicked");
            Err(error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                "internal error",
            ))
        }
    }
}

/// The 404 used for both missing and invisible resources.
pub(crate) fn not_found() -> (StatusCode, Json<serde_json::Value>) {
    error_response(StatusCode::NOT_FOUND, "not found")
}
