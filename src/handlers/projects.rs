//! Project and identity endpoints.

use axum::extract::{Extension, Path, State};
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;

use super::{not_found, with_db};
use crate::auth::Identity;
use crate::projects;
use crate::server::AppState;

type ApiError = (StatusCode, Json<serde_json::Value>);

#[derive(Debug, Deserialize)]
pub struct CreateProjectParams {
    pub name: String,
    pub description: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateProjectParams {
    pub name: Option<String>,
    pub description: Option<String>,
}

/// GET /me — echo the authenticated identity.
pub async fn me(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let user_id = identity.user_id.clone();
    let user = with_db(&state, move |conn| projects::get_user(conn, &user_id))
        .await?
        .ok_or_else(not_found)?;

    Ok(Json(serde_json::json!({
        "user": user,
        "project_id": identity.project_id,
    })))
}

/// GET /projects
pub async fn list(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
) -> Result<Json<Vec<projects::Project>>, ApiError> {
    let user_id = identity.user_id;
    let rows = with_db(&state, move |conn| projects::list_projects(conn, &user_id)).await?;
    Ok(Json(rows))
}

/// POST /projects
pub async fn create(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    Json(params): Json<CreateProjectParams>,
) -> Result<(StatusCode, Json<projects::Project>), ApiError> {
    let user_id = identity.user_id;
    let project = with_db(&state, move |conn| {
        projects::create_project(conn, &user_id, &params.name, params.description.as_deref())
    })
    .await?;
    Ok((StatusCode::CREATED, Json(project)))
}

/// GET /projects/{id}
pub async fn show(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    Path(id): Path<String>,
) -> Result<Json<projects::Project>, ApiError> {
    let user_id = identity.user_id;
    let project = with_db(&state, move |conn| {
        projects::get_project(conn, &id, &user_id)
    })
    .await?
    .ok_or_else(not_found)?;
    Ok(Json(project))
}

/// PATCH /projects/{id}
pub async fn update(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    Path(id): Path<String>,
    Json(params): Json<UpdateProjectParams>,
) -> Result<Json<projects::Project>, ApiError> {
    let user_id = identity.user_id;
    let project = with_db(&state, move |conn| {
        projects::update_project(
            conn,
            &id,
            &user_id,
            params.name.as_deref(),
            params.description.as_deref(),
        )
    })
    .await?
    .ok_or_else(not_found)?;
    Ok(Json(project))
}

/// DELETE /projects/{id}
pub async fn remove(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    Path(id): Path<String>,
) -> Result<Json<projects::Project>, ApiError> {
    let user_id = identity.user_id;
    let project = with_db(&state, move |conn| {
        projects::delete_project(conn, &id, &user_id)
    })
    .await?
    .ok_or_else(not_found)?;
    Ok(Json(project))
}
