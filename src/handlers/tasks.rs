//! Task ledger endpoints.

use std::sync::Arc;

use axum::extract::{Extension, Path, State};
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;

use super::{not_found, with_db};
use crate::auth::Identity;
use crate::server::{error_response, AppState};
use crate::tasks::types::{Task, TaskEvent, TaskState};
use crate::tasks::{events, ingest, store};

type ApiError = (StatusCode, Json<serde_json::Value>);

#[derive(Debug, Deserialize)]
pub struct CreateTaskParams {
    pub name: String,
    pub input: String,
    /// Defaults to the project the API key is bound to.
    pub project_id: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateTaskParams {
    pub name: Option<String>,
    pub input: Option<String>,
    pub state: Option<String>,
    pub result: Option<String>,
    pub success: Option<bool>,
}

#[derive(Debug, Deserialize)]
pub struct RecordEventParams {
    pub event_type: String,
    #[serde(default)]
    pub event_data: serde_json::Value,
}

/// POST /tasks — create a task and ingest its embedding.
///
/// The task commits in one lock window, the generator runs with no lock
/// held, and the embedding (or the failure event) lands in a second
/// window.
pub async fn create(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    Json(params): Json<CreateTaskParams>,
) -> Result<(StatusCode, Json<ingest::IngestedTask>), ApiError> {
    if params.input.trim().is_empty() {
        return Err(error_response(
            StatusCode::BAD_REQUEST,
            "input must be non-empty",
        ));
    }

    let project_id = params.project_id.unwrap_or(identity.project_id);
    let user_id = identity.user_id;
    let input = params.input.clone();

    let task = with_db(&state, move |conn| {
        ingest::create_pending_task(conn, &project_id, &user_id, &params.name, &params.input)
    })
    .await?
    .ok_or_else(not_found)?;

    let provider = Arc::clone(&state.embedding);
    let generated = tokio::task::spawn_blocking(move || provider.embed(&input))
        .await
        .map_err(|e| {
            tracing::error!(error = %e, "embedding task panicked");
            error_response(StatusCode::INTERNAL_SERVER_ERROR, "internal error")
        })?;

    let task_id = task.id.clone();
    let embedding_id = with_db(&state, move |conn| {
        ingest::attach_generated_embedding(conn, &task_id, generated)
    })
    .await?;

    Ok((
        StatusCode::CREATED,
        Json(ingest::IngestedTask { task, embedding_id }),
    ))
}

/// GET /tasks — list the tasks of the key's project.
pub async fn list(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
) -> Result<Json<Vec<Task>>, ApiError> {
    let tasks = with_db(&state, move |conn| {
        store::list_tasks(conn, &identity.project_id, &identity.user_id)
    })
    .await?;
    Ok(Json(tasks))
}

/// GET /tasks/{id}
pub async fn show(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    Path(id): Path<String>,
) -> Result<Json<Task>, ApiError> {
    let task = with_db(&state, move |conn| {
        store::get_task(conn, &id, &identity.user_id)
    })
    .await?
    .ok_or_else(not_found)?;
    Ok(Json(task))
}

/// PATCH /tasks/{id}
pub async fn update(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    Path(id): Path<String>,
    Json(params): Json<UpdateTaskParams>,
) -> Result<Json<Task>, ApiError> {
    let state_patch = match params.state.as_deref() {
        Some(raw) => Some(raw.parse::<TaskState>().map_err(|e| {
            error_response(StatusCode::BAD_REQUEST, &e)
        })?),
        None => None,
    };

    let patch = store::TaskPatch {
        name: params.name,
        input: params.input,
        state: state_patch,
        result: params.result,
        success: params.success,
    };

    let task = with_db(&state, move |conn| {
        store::update_task(conn, &id, &identity.user_id, &patch)
    })
    .await?
    .ok_or_else(not_found)?;
    Ok(Json(task))
}

/// DELETE /tasks/{id}
pub async fn remove(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    Path(id): Path<String>,
) -> Result<Json<Task>, ApiError> {
    let task = with_db(&state, move |conn| {
        store::delete_task(conn, &id, &identity.user_id)
    })
    .await?
    .ok_or_else(not_found)?;
    Ok(Json(task))
}

/// GET /tasks/{id}/events
pub async fn list_events(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    Path(id): Path<String>,
) -> Result<Json<Vec<TaskEvent>>, ApiError> {
    let rows = with_db(&state, move |conn| {
        events::events_for_task(conn, &id, &identity.user_id)
    })
    .await?;
    Ok(Json(rows))
}

/// POST /tasks/{id}/events
pub async fn record_event(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    Path(id): Path<String>,
    Json(params): Json<RecordEventParams>,
) -> Result<(StatusCode, Json<TaskEvent>), ApiError> {
    let event = with_db(&state, move |conn| {
        events::record_event(
            conn,
            &id,
            &identity.user_id,
            &params.event_type,
            &params.event_data,
        )
    })
    .await?
    .ok_or_else(not_found)?;
    Ok((StatusCode::CREATED, Json(event)))
}

/// GET /tasks/{id}/embeddings — embedding metadata, not the raw vectors.
pub async fn list_embeddings(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    Path(id): Path<String>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let rows = with_db(&state, move |conn| {
        if store::get_task(conn, &id, &identity.user_id)?.is_none() {
            return Ok(None);
        }
        Ok(Some(store::embeddings_for_task(conn, &id)?))
    })
    .await?
    .ok_or_else(not_found)?;

    let summaries: Vec<serde_json::Value> = rows
        .iter()
        .map(|e| {
            serde_json::json!({
                "id": e.id,
                "task_id": e.task_id,
                "dimensions": e.embedding.len(),
            })
        })
        .collect();
    Ok(Json(serde_json::json!({ "embeddings": summaries })))
}
