//! Similarity lookup endpoint.
//!
//! Accepts either raw text (embedded on the fly) or a precomputed query
//! vector, and recalls concluded tasks from the caller's project.

use std::sync::Arc;

use axum::extract::{Extension, State};
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;

use super::with_db;
use crate::auth::Identity;
use crate::embedding::{EmbeddingError, EMBEDDING_DIM};
use crate::server::{error_response, AppState};
use crate::tasks::similar::{find_similar, SimilarTask};

type ApiError = (StatusCode, Json<serde_json::Value>);

#[derive(Debug, Deserialize)]
pub struct FindSimilarParams {
    /// Text to embed as the query. Ignored when `embedding` is present.
    pub input: Option<String>,
    /// Precomputed query vector.
    pub embedding: Option<Vec<f32>>,
}

/// POST /tasks/similar
pub async fn find(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    Json(params): Json<FindSimilarParams>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let query = match (params.embedding, params.input) {
        (Some(vector), _) => {
            if vector.len() != EMBEDDING_DIM {
                return Err(error_response(
                    StatusCode::BAD_REQUEST,
                    &format!("embedding must have {EMBEDDING_DIM} dimensions"),
                ));
            }
            vector
        }
        (None, Some(input)) => embed_query(&state, input).await?,
        (None, None) => {
            return Err(error_response(
                StatusCode::BAD_REQUEST,
                "input or embedding required",
            ));
        }
    };

    let retrieval = state.config.retrieval.clone();
    let results: Vec<SimilarTask> = with_db(&state, move |conn| {
        find_similar(conn, &query, Some(&identity.project_id), &retrieval)
    })
    .await?;

    Ok(Json(serde_json::json!({ "results": results })))
}

/// Embed query text on the blocking pool, mapping generator failures onto
/// the API error envelope.
async fn embed_query(state: &AppState, input: String) -> Result<Vec<f32>, ApiError> {
    let provider = Arc::clone(&state.embedding);
    let outcome = tokio::task::spawn_blocking(move || provider.embed(&input)).await;

    match outcome {
        Ok(Ok(vector)) => Ok(vector),
        Ok(Err(EmbeddingError::MalformedInput)) => Err(error_response(
            StatusCode::BAD_REQUEST,
            "input must be non-empty",
        )),
        Ok(Err(EmbeddingError::Unavailable(e))) => {
            tracing::warn!(error = %e, "query embedding failed");
            Err(error_response(
                StatusCode::BAD_GATEWAY,
                "embedding unavailable",
            ))
        }
        Err(e) => {
            tracing::error!(error = %e, "embedding task panicked");
            Err(error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                "internal error",
            ))
        }
    }
}
