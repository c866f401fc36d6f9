//! `precedent db` subcommands: init, reset, stats, dev seeding.

use anyhow::{Context, Result};
use rusqlite::Connection;

use crate::auth::keys::import_key;
use crate::config::PrecedentConfig;
use crate::db;
use crate::projects::{create_project, create_user};
use crate::tasks::store::create_task;

/// Create the database (schema + migrations), optionally with dev seed data.
pub fn init(config: &PrecedentConfig, seed: bool) -> Result<()> {
    let path = config.resolved_db_path();
    let mut conn = db::open_database(&path)?;
    println!("Database ready at {}", path.display());

    if seed {
        seed_dev_data(&mut conn)?;
    }
    Ok(())
}

/// Drop everything and recreate from scratch.
pub fn reset(config: &PrecedentConfig, seed: bool) -> Result<()> {
    let path = config.resolved_db_path();
    let mut conn = db::open_database(&path)?;

    conn.execute_batch(
        "DROP TABLE IF EXISTS task_vec;
         DROP TABLE IF EXISTS task_embeddings;
         DROP TABLE IF EXISTS events;
         DROP TABLE IF EXISTS tasks;
         DROP TABLE IF EXISTS api_keys;
         DROP TABLE IF EXISTS project_members;
         DROP TABLE IF EXISTS projects;
         DROP TABLE IF EXISTS users;
         DROP TABLE IF EXISTS schema_meta;",
    )
    .context("failed to drop tables")?;

    db::schema::init_schema(&conn)?;
    db::migrations::run_migrations(&conn)?;
    println!("Database reset at {}", path.display());

    if seed {
        seed_dev_data(&mut conn)?;
    }
    Ok(())
}

/// Insert a dev user, project, task, and API key.
///
/// The key secret comes from PRECEDENT_TEST_API_KEY (default "TEST") so
/// local clients can authenticate without the issuance flow.
fn seed_dev_data(conn: &mut Connection) -> Result<()> {
    let user = create_user(conn, "dev", Some("dev@example.com"))?;
    let project = create_project(
        conn,
        &user.id,
        "Test Project",
        Some("A project for local development"),
    )?;

    create_task(conn, &project.id, &user.id, "Test Task", "Test Input")?;

    let secret = std::env::var("PRECEDENT_TEST_API_KEY").unwrap_or_else(|_| "TEST".into());
    import_key(conn, &user.id, &project.id, &secret)?;

    println!("Seeded dev data: user 'dev', project {}", project.id);
    println!("Dev API key secret: {secret}");
    Ok(())
}

/// Print row counts and task-state breakdown.
pub fn stats(config: &PrecedentConfig) -> Result<()> {
    let path = config.resolved_db_path();
    let conn = db::open_database(&path)?;

    println!("Database: {}", path.display());
    if let Ok(meta) = std::fs::metadata(&path) {
        println!("Size: {} bytes", meta.len());
    }

    for table in [
        "users",
        "projects",
        "project_members",
        "api_keys",
        "tasks",
        "events",
        "task_embeddings",
    ] {
        let count: i64 =
            conn.query_row(&format!("SELECT COUNT(*) FROM {table}"), [], |r| r.get(0))?;
        println!("{table}: {count}");
    }

    let mut stmt =
        conn.prepare("SELECT state, COUNT(*) FROM tasks GROUP BY state ORDER BY state")?;
    let rows = stmt
        .query_map([], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?))
        })?
        .collect::<Result<Vec<_>, _>>()?;
    for (state, count) in rows {
        println!("  tasks {state}: {count}");
    }

    Ok(())
}
