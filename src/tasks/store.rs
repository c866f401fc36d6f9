//! Task ledger reads and writes, all scoped by project membership.
//!
//! Every accessor takes the calling user's id and folds a membership check
//! into the query: a task in a project the caller cannot see behaves
//! exactly like a task that does not exist (`None` / empty, never an
//! error).

use anyhow::{bail, Result};
use rusqlite::{params, Connection, Row};

use super::types::{Task, TaskState};
use crate::embedding::EMBEDDING_DIM;

/// A stored embedding row for a task.
#[derive(Debug, Clone)]
pub struct StoredEmbedding {
    pub id: String,
    pub task_id: String,
    pub embedding: Vec<f32>,
}

/// Fields of [`update_task`]; `None` leaves the column unchanged.
#[derive(Debug, Default)]
pub struct TaskPatch {
    pub name: Option<String>,
    pub input: Option<String>,
    pub state: Option<TaskState>,
    pub result: Option<String>,
    pub success: Option<bool>,
}

pub(crate) fn task_from_row(row: &Row<'_>) -> rusqlite::Result<Task> {
    let state: String = row.get(6)?;
    let state = state.parse::<TaskState>().map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(
            6,
            rusqlite::types::Type::Text,
            Box::<dyn std::error::Error + Send + Sync>::from(e),
        )
    })?;
    Ok(Task {
        id: row.get(0)?,
        project_id: row.get(1)?,
        name: row.get(2)?,
        input: row.get(3)?,
        result: row.get(4)?,
        success: row.get(5)?,
        state,
        created_at: row.get(7)?,
    })
}

const TASK_COLUMNS: &str = "id, project_id, name, input, result, success, state, created_at";

/// Whether the user is a member of the project.
pub(crate) fn project_visible(conn: &Connection, project_id: &str, user_id: &str) -> Result<bool> {
    let visible: bool = conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM project_members WHERE user_id = ?1 AND project_id = ?2)",
        params![user_id, project_id],
        |row| row.get(0),
    )?;
    Ok(visible)
}

/// Create a task in the given project. Returns `None` when the project does
/// not exist or is not visible to the user.
pub fn create_task(
    conn: &Connection,
    project_id: &str,
    user_id: &str,
    name: &str,
    input: &str,
) -> Result<Option<Task>> {
    if !project_visible(conn, project_id, user_id)? {
        return Ok(None);
    }

    let id = uuid::Uuid::now_v7().to_string();
    let now = chrono::Utc::now().to_rfc3339();
    conn.execute(
        "INSERT INTO tasks (id, project_id, name, input, state, created_at) \
         VALUES (?1, ?2, ?3, ?4, 'PENDING', ?5)",
        params![id, project_id, name, input, now],
    )?;

    get_task(conn, &id, user_id)
}

/// Fetch a task by id, scoped to the caller's projects.
pub fn get_task(conn: &Connection, task_id: &str, user_id: &str) -> Result<Option<Task>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {TASK_COLUMNS} FROM tasks \
         WHERE id = ?1 AND EXISTS(\
             SELECT 1 FROM project_members \
             WHERE user_id = ?2 AND project_id = tasks.project_id)"
    ))?;
    let mut rows = stmt.query_map(params![task_id, user_id], task_from_row)?;
    match rows.next() {
        Some(task) => Ok(Some(task?)),
        None => Ok(None),
    }
}

/// List all tasks in a project. Empty when the project is not visible.
pub fn list_tasks(conn: &Connection, project_id: &str, user_id: &str) -> Result<Vec<Task>> {
    if !project_visible(conn, project_id, user_id)? {
        return Ok(Vec::new());
    }

    let mut stmt = conn.prepare(&format!(
        "SELECT {TASK_COLUMNS} FROM tasks WHERE project_id = ?1 ORDER BY created_at, id"
    ))?;
    let tasks = stmt
        .query_map(params![project_id], task_from_row)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(tasks)
}

/// Apply a partial update to a task. Returns the updated row, or `None`
/// when the task is not visible to the caller.
pub fn update_task(
    conn: &Connection,
    task_id: &str,
    user_id: &str,
    patch: &TaskPatch,
) -> Result<Option<Task>> {
    if get_task(conn, task_id, user_id)?.is_none() {
        return Ok(None);
    }

    conn.execute(
        "UPDATE tasks SET \
             name = COALESCE(?1, name), \
             input = COALESCE(?2, input), \
             state = COALESCE(?3, state), \
             result = COALESCE(?4, result), \
             success = COALESCE(?5, success) \
         WHERE id = ?6",
        params![
            patch.name,
            patch.input,
            patch.state.map(|s| s.as_str()),
            patch.result,
            patch.success,
            task_id,
        ],
    )?;

    get_task(conn, task_id, user_id)
}

/// Delete a task (embeddings and events cascade). Returns the deleted row,
/// or `None` when it was not visible.
pub fn delete_task(conn: &Connection, task_id: &str, user_id: &str) -> Result<Option<Task>> {
    let Some(task) = get_task(conn, task_id, user_id)? else {
        return Ok(None);
    };

    conn.execute("DELETE FROM tasks WHERE id = ?1", params![task_id])?;
    // vec0 tables have no FK support; remove index rows by hand
    conn.execute(
        "DELETE FROM task_vec WHERE id IN (SELECT id FROM task_embeddings WHERE task_id = ?1)",
        params![task_id],
    )?;
    Ok(Some(task))
}

/// Persist an embedding for a task, in both the owning table and the vec0
/// index, atomically. Returns the embedding id.
pub fn attach_embedding(
    conn: &mut Connection,
    task_id: &str,
    embedding: &[f32],
) -> Result<String> {
    if embedding.len() != EMBEDDING_DIM {
        bail!(
            "embedding has {} dimensions, expected {EMBEDDING_DIM}",
            embedding.len()
        );
    }

    let id = uuid::Uuid::now_v7().to_string();
    let bytes = super::embedding_to_bytes(embedding);

    let tx = conn.transaction()?;
    tx.execute(
        "INSERT INTO task_embeddings (id, task_id, embedding) VALUES (?1, ?2, ?3)",
        params![id, task_id, bytes],
    )?;
    tx.execute(
        "INSERT INTO task_vec (id, embedding) VALUES (?1, ?2)",
        params![id, bytes],
    )?;
    tx.commit()?;

    Ok(id)
}

/// All embeddings stored for a task. An empty list means the task is not
/// yet retrievable by similarity.
pub fn embeddings_for_task(conn: &Connection, task_id: &str) -> Result<Vec<StoredEmbedding>> {
    let mut stmt =
        conn.prepare("SELECT id, task_id, embedding FROM task_embeddings WHERE task_id = ?1")?;
    let rows = stmt
        .query_map(params![task_id], |row| {
            let bytes: Vec<u8> = row.get(2)?;
            Ok(StoredEmbedding {
                id: row.get(0)?,
                task_id: row.get(1)?,
                embedding: super::bytes_to_embedding(&bytes),
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}
