//! Append-only event ledger per task.
//!
//! Events are never updated or deleted individually; they disappear only
//! when their task cascades away.

use anyhow::Result;
use rusqlite::{params, Connection};

use super::store::get_task;
use super::types::TaskEvent;

/// Append an event to a task's ledger. Returns `None` when the task is not
/// visible to the caller.
pub fn record_event(
    conn: &Connection,
    task_id: &str,
    user_id: &str,
    event_type: &str,
    event_data: &serde_json::Value,
) -> Result<Option<TaskEvent>> {
    if get_task(conn, task_id, user_id)?.is_none() {
        return Ok(None);
    }
    Ok(Some(append_event(conn, task_id, event_type, event_data)?))
}

/// Unscoped append, for internal pipelines that already hold a visible task.
pub(crate) fn append_event(
    conn: &Connection,
    task_id: &str,
    event_type: &str,
    event_data: &serde_json::Value,
) -> Result<TaskEvent> {
    let id = uuid::Uuid::now_v7().to_string();
    let now = chrono::Utc::now().to_rfc3339();
    conn.execute(
        "INSERT INTO events (id, task_id, event_type, event_data, created_at) \
         VALUES (?1, ?2, ?3, ?4, ?5)",
        params![id, task_id, event_type, event_data.to_string(), now],
    )?;

    Ok(TaskEvent {
        id,
        task_id: task_id.to_string(),
        event_type: event_type.to_string(),
        event_data: event_data.clone(),
        created_at: now,
    })
}

/// All events for a task in append order. Empty when the task is not
/// visible (or has none).
pub fn events_for_task(
    conn: &Connection,
    task_id: &str,
    user_id: &str,
) -> Result<Vec<TaskEvent>> {
    if get_task(conn, task_id, user_id)?.is_none() {
        return Ok(Vec::new());
    }

    let mut stmt = conn.prepare(
        "SELECT id, task_id, event_type, event_data, created_at \
         FROM events WHERE task_id = ?1 ORDER BY created_at, id",
    )?;
    let events = stmt
        .query_map(params![task_id], |row| {
            let data: String = row.get(3)?;
            Ok(TaskEvent {
                id: row.get(0)?,
                task_id: row.get(1)?,
                event_type: row.get(2)?,
                event_data: serde_json::from_str(&data).unwrap_or(serde_json::Value::Null),
                created_at: row.get(4)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(events)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tasks::store::create_task;

    fn test_db() -> Connection {
        let conn = crate::db::open_memory_database().unwrap();
        let now = chrono::Utc::now().to_rfc3339();
        conn.execute_batch(&format!(
            "INSERT INTO users (id, username, created_at) VALUES ('u1', 'alice', '{now}');
             INSERT INTO users (id, username, created_at) VALUES ('u2', 'mallory', '{now}');
             INSERT INTO projects (id, name, created_at) VALUES ('p1', 'P', '{now}');
             INSERT INTO project_members (user_id, project_id) VALUES ('u1', 'p1');"
        ))
        .unwrap();
        conn
    }

    #[test]
    fn record_and_list_events() {
        let conn = test_db();
        let task = create_task(&conn, "p1", "u1", "T", "in").unwrap().unwrap();

        let data = serde_json::json!({"step": 1});
        let event = record_event(&conn, &task.id, "u1", "STEP_COMPLETED", &data)
            .unwrap()
            .unwrap();
        assert_eq!(event.event_type, "STEP_COMPLETED");

        let events = events_for_task(&conn, &task.id, "u1").unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].event_data, data);
    }

    #[test]
    fn events_preserve_append_order() {
        let conn = test_db();
        let task = create_task(&conn, "p1", "u1", "T", "in").unwrap().unwrap();

        for i in 0..3 {
            record_event(
                &conn,
                &task.id,
                "u1",
                "TICK",
                &serde_json::json!({ "n": i }),
            )
            .unwrap();
        }

        let events = events_for_task(&conn, &task.id, "u1").unwrap();
        let ns: Vec<i64> = events
            .iter()
            .map(|e| e.event_data["n"].as_i64().unwrap())
            .collect();
        assert_eq!(ns, vec![0, 1, 2]);
    }

    #[test]
    fn non_member_cannot_record_or_read() {
        let conn = test_db();
        let task = create_task(&conn, "p1", "u1", "T", "in").unwrap().unwrap();

        let result = record_event(
            &conn,
            &task.id,
            "u2",
            "TICK",
            &serde_json::json!({}),
        )
        .unwrap();
        assert!(result.is_none());
        assert!(events_for_task(&conn, &task.id, "u2").unwrap().is_empty());
    }
}
