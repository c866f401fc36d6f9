//! Projects, users, and membership.
//!
//! Projects are the visibility boundary for everything else: tasks,
//! events, embeddings, and API keys all hang off a project, and a user
//! sees only projects they are a member of.

use anyhow::Result;
use rusqlite::{params, Connection, OptionalExtension, Row};
use serde::Serialize;

#[derive(Debug, Clone, Serialize)]
pub struct Project {
    pub id: String,
    pub name: String,
    pub description: Option<String>,
    pub created_at: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct User {
    pub id: String,
    pub username: String,
    pub email: Option<String>,
    pub created_at: String,
}

fn project_from_row(row: &Row<'_>) -> rusqlite::Result<Project> {
    Ok(Project {
        id: row.get(0)?,
        name: row.get(1)?,
        description: row.get(2)?,
        created_at: row.get(3)?,
    })
}

/// Create a user account.
pub fn create_user(conn: &Connection, username: &str, email: Option<&str>) -> Result<User> {
    let id = uuid::Uuid::now_v7().to_string();
    let now = chrono::Utc::now().to_rfc3339();
    conn.execute(
        "INSERT INTO users (id, username, email, created_at) VALUES (?1, ?2, ?3, ?4)",
        params![id, username, email, now],
    )?;
    Ok(User {
        id,
        username: username.to_string(),
        email: email.map(str::to_string),
        created_at: now,
    })
}

/// Fetch a user by id.
pub fn get_user(conn: &Connection, user_id: &str) -> Result<Option<User>> {
    let user = conn
        .query_row(
            "SELECT id, username, email, created_at FROM users WHERE id = ?1",
            params![user_id],
            |row| {
                Ok(User {
                    id: row.get(0)?,
                    username: row.get(1)?,
                    email: row.get(2)?,
                    created_at: row.get(3)?,
                })
            },
        )
        .optional()?;
    Ok(user)
}

/// Create a project and enroll the creator as its first member.
pub fn create_project(
    conn: &mut Connection,
    user_id: &str,
    name: &str,
    description: Option<&str>,
) -> Result<Project> {
    let id = uuid::Uuid::now_v7().to_string();
    let now = chrono::Utc::now().to_rfc3339();

    let tx = conn.transaction()?;
    tx.execute(
        "INSERT INTO projects (id, name, description, created_at) VALUES (?1, ?2, ?3, ?4)",
        params![id, name, description, now],
    )?;
    tx.execute(
        "INSERT INTO project_members (user_id, project_id) VALUES (?1, ?2)",
        params![user_id, id],
    )?;
    tx.commit()?;

    Ok(Project {
        id,
        name: name.to_string(),
        description: description.map(str::to_string),
        created_at: now,
    })
}

/// Fetch a project by id, scoped to the caller's memberships.
pub fn get_project(conn: &Connection, project_id: &str, user_id: &str) -> Result<Option<Project>> {
    let project = conn
        .query_row(
            "SELECT id, name, description, created_at FROM projects \
             WHERE id = ?1 AND EXISTS(\
                 SELECT 1 FROM project_members \
                 WHERE user_id = ?2 AND project_id = projects.id)",
            params![project_id, user_id],
            project_from_row,
        )
        .optional()?;
    Ok(project)
}

/// All projects the user is a member of.
pub fn list_projects(conn: &Connection, user_id: &str) -> Result<Vec<Project>> {
    let mut stmt = conn.prepare(
        "SELECT id, name, description, created_at FROM projects \
         WHERE EXISTS(\
             SELECT 1 FROM project_members \
             WHERE user_id = ?1 AND project_id = projects.id) \
         ORDER BY created_at, id",
    )?;
    let projects = stmt
        .query_map(params![user_id], project_from_row)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(projects)
}

/// Apply a partial update. Returns the updated row, or `None` when the
/// project is not visible to the caller.
pub fn update_project(
    conn: &Connection,
    project_id: &str,
    user_id: &str,
    name: Option<&str>,
    description: Option<&str>,
) -> Result<Option<Project>> {
    if get_project(conn, project_id, user_id)?.is_none() {
        return Ok(None);
    }
    conn.execute(
        "UPDATE projects SET \
             name = COALESCE(?1, name), \
             description = COALESCE(?2, description) \
         WHERE id = ?3",
        params![name, description, project_id],
    )?;
    get_project(conn, project_id, user_id)
}

/// Delete a project and everything under it. Returns the deleted row, or
/// `None` when it was not visible.
pub fn delete_project(
    conn: &Connection,
    project_id: &str,
    user_id: &str,
) -> Result<Option<Project>> {
    let Some(project) = get_project(conn, project_id, user_id)? else {
        return Ok(None);
    };

    // vec0 rows have no FK; clear them before the cascade removes the
    // owning embedding rows
    conn.execute(
        "DELETE FROM task_vec WHERE id IN (\
             SELECT e.id FROM task_embeddings e \
             INNER JOIN tasks t ON t.id = e.task_id \
             WHERE t.project_id = ?1)",
        params![project_id],
    )?;
    conn.execute("DELETE FROM projects WHERE id = ?1", params![project_id])?;
    Ok(Some(project))
}

/// Add a user to a project. Idempotent.
pub fn add_member(conn: &Connection, user_id: &str, project_id: &str) -> Result<()> {
    conn.execute(
        "INSERT OR IGNORE INTO project_members (user_id, project_id) VALUES (?1, ?2)",
        params![user_id, project_id],
    )?;
    Ok(())
}
