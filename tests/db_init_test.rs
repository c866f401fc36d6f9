use precedent::db::{self, migrations};
use tempfile::tempdir;

#[test]
fn open_database_creates_file_and_schema() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("nested").join("precedent.db");

    let conn = db::open_database(&path).unwrap();
    assert!(path.exists());

    // Schema is queryable
    let count: i64 = conn
        .query_row("SELECT COUNT(*) FROM tasks", [], |r| r.get(0))
        .unwrap();
    assert_eq!(count, 0);

    // Migrations ran
    assert_eq!(
        migrations::get_schema_version(&conn).unwrap(),
        migrations::CURRENT_SCHEMA_VERSION
    );
}

#[test]
fn reopening_an_existing_database_is_idempotent() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("precedent.db");

    {
        let conn = db::open_database(&path).unwrap();
        conn.execute(
            "INSERT INTO users (id, username, created_at) VALUES ('u1', 'alice', '2026-01-01T00:00:00Z')",
            [],
        )
        .unwrap();
    }

    let conn = db::open_database(&path).unwrap();
    let count: i64 = conn
        .query_row("SELECT COUNT(*) FROM users", [], |r| r.get(0))
        .unwrap();
    assert_eq!(count, 1);
}

#[test]
fn wal_mode_is_enabled_on_file_databases() {
    let dir = tempdir().unwrap();
    let conn = db::open_database(dir.path().join("precedent.db")).unwrap();

    let mode: String = conn
        .query_row("PRAGMA journal_mode", [], |r| r.get(0))
        .unwrap();
    assert_eq!(mode.to_lowercase(), "wal");
}

#[test]
fn foreign_keys_cascade_from_tasks() {
    let conn = db::open_memory_database().unwrap();
    conn.execute_batch(
        "INSERT INTO projects (id, name, created_at) VALUES ('p1', 'P', '2026-01-01T00:00:00Z');
         INSERT INTO tasks (id, project_id, name, input, created_at) VALUES ('t1', 'p1', 'T', 'in', '2026-01-01T00:00:00Z');
         INSERT INTO events (id, task_id, event_type, event_data, created_at) VALUES ('e1', 't1', 'TICK', '{}', '2026-01-01T00:00:00Z');",
    )
    .unwrap();

    conn.execute("DELETE FROM tasks WHERE id = 't1'", []).unwrap();

    let events: i64 = conn
        .query_row("SELECT COUNT(*) FROM events", [], |r| r.get(0))
        .unwrap();
    assert_eq!(events, 0);
}
