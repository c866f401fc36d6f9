//! HTTP API server.
//!
//! Wires the database handle, embedding provider, and config into an axum
//! router. Every route except `/health` passes through the bearer-token
//! middleware: the presented secret resolves to an identity or the request
//! dies with an opaque 401. Handlers live in [`crate::handlers`].

use std::sync::{Arc, Mutex};

use anyhow::Result;
use axum::extract::{Request, State};
use axum::http::{header, StatusCode};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};

use crate::auth::keys::verify_key;
use crate::auth::AuthError;
use crate::config::PrecedentConfig;
use crate::db;
use crate::embedding::{self, EmbeddingProvider};
use crate::handlers;

/// Shared state handed to every handler. The connection is one explicitly
/// constructed handle whose lifecycle is owned here, not ambient state.
#[derive(Clone)]
pub struct AppState {
    pub db: Arc<Mutex<rusqlite::Connection>>,
    pub embedding: Arc<dyn EmbeddingProvider>,
    pub config: Arc<PrecedentConfig>,
}

/// A uniform JSON error body. Never carries hashes, secrets, or row ids.
pub fn error_response(status: StatusCode, message: &str) -> (StatusCode, Json<serde_json::Value>) {
    (status, Json(serde_json::json!({ "error": message })))
}

/// Open DB, create embedding provider, check vector-space consistency.
pub fn setup_state(config: PrecedentConfig) -> Result<AppState> {
    let db_path = config.resolved_db_path();
    let conn = db::open_database(&db_path)?;
    tracing::info!(db = %db_path.display(), "database ready");

    if let Ok(Some(stored_model)) = db::migrations::get_embedding_model(&conn) {
        if stored_model != config.embedding.model {
            tracing::warn!(
                stored = %stored_model,
                configured = %config.embedding.model,
                "embedding model changed — stored vectors are in a different space"
            );
        }
    }

    let provider = embedding::create_provider(&config.embedding)?;

    Ok(AppState {
        db: Arc::new(Mutex::new(conn)),
        embedding: Arc::from(provider),
        config: Arc::new(config),
    })
}

/// Build the full router over the given state.
pub fn router(state: AppState) -> Router {
    let authed = Router::new()
        .route("/me", get(handlers::projects::me))
        .route(
            "/projects",
            get(handlers::projects::list).post(handlers::projects::create),
        )
        .route(
            "/projects/{id}",
            get(handlers::projects::show)
                .patch(handlers::projects::update)
                .delete(handlers::projects::remove),
        )
        .route(
            "/tasks",
            get(handlers::tasks::list).post(handlers::tasks::create),
        )
        .route("/tasks/similar", post(handlers::similar::find))
        .route(
            "/tasks/{id}",
            get(handlers::tasks::show)
                .patch(handlers::tasks::update)
                .delete(handlers::tasks::remove),
        )
        .route(
            "/tasks/{id}/events",
            get(handlers::tasks::list_events).post(handlers::tasks::record_event),
        )
        .route(
            "/tasks/{id}/embeddings",
            get(handlers::tasks::list_embeddings),
        )
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            auth_middleware,
        ));

    Router::new()
        .route("/health", get(health))
        .merge(authed)
        .with_state(state)
}

async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "ok" }))
}

/// Resolve the bearer token to an identity, or reject with an opaque 401.
///
/// The hash scan is CPU-heavy, so verification runs on the blocking pool.
async fn auth_middleware(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Response {
    let token = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(|v| v.trim().to_string());

    let Some(token) = token else {
        return error_response(StatusCode::UNAUTHORIZED, "invalid API key").into_response();
    };

    let db = Arc::clone(&state.db);
    let outcome = tokio::task::spawn_blocking(move || {
        let conn = db
            .lock()
            .map_err(|e| anyhow::anyhow!("db lock poisoned: {e}"))?;
        anyhow::Ok(verify_key(&conn, &token))
    })
    .await;

    let verify_result = match outcome {
        Ok(Ok(result)) => result,
        Ok(Err(e)) => {
            tracing::error!(error = %e, "auth task failed");
            return error_response(StatusCode::INTERNAL_SERVER_ERROR, "internal error")
                .into_response();
        }
        Err(e) => {
            tracing::error!(error = %e, "auth task panicked");
            return error_response(StatusCode::INTERNAL_SERVER_ERROR, "internal error")
                .into_response();
        }
    };

    match verify_result {
        Ok(identity) => {
            request.extensions_mut().insert(identity);
            next.run(request).await
        }
        Err(AuthError::InvalidCredential) => {
            error_response(StatusCode::UNAUTHORIZED, "invalid API key").into_response()
        }
        Err(AuthError::Store(e)) => {
            tracing::error!(error = %e, "credential store failure during auth");
            error_response(StatusCode::INTERNAL_SERVER_ERROR, "internal error").into_response()
        }
    }
}

/// Start the HTTP server with graceful shutdown on ctrl-c.
pub async fn serve(config: PrecedentConfig) -> Result<()> {
    let bind_addr = format!("{}:{}", config.server.host, config.server.port);
    tracing::info!(addr = %bind_addr, "starting precedent API server");

    let state = setup_state(config)?;
    let app = router(state);

    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    tracing::info!(addr = %bind_addr, "listening at http://{bind_addr}");

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            tokio::signal::ctrl_c()
                .await
                .expect("failed to listen for ctrl-c");
            tracing::info!("shutting down");
        })
        .await?;

    Ok(())
}
