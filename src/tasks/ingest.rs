//! Task creation with embedding ingestion.
//!
//! The task row commits first; the embedding is generated and attached in a
//! second step. A generator failure therefore leaves a committed task with
//! no embedding — such a task simply isn't retrievable by similarity until
//! an embedding lands. Each step is recorded in the task's event ledger.
//!
//! The two halves are exposed separately ([`create_pending_task`],
//! [`attach_generated_embedding`]) so async callers can run the external
//! generator without holding the database handle; [`create_task_with_embedding`]
//! composes them for synchronous callers.

use anyhow::Result;
use rusqlite::Connection;
use serde::Serialize;

use super::events::append_event;
use super::store::{attach_embedding, create_task};
use super::types::Task;
use crate::embedding::{EmbeddingError, EmbeddingProvider};

/// Outcome of a full ingestion.
#[derive(Debug, Serialize)]
pub struct IngestedTask {
    pub task: Task,
    /// Id of the attached embedding, or `None` when generation failed.
    pub embedding_id: Option<String>,
}

/// Create the task row and its `TASK_CREATED` ledger event. Returns `None`
/// when the project is not visible to the user.
pub fn create_pending_task(
    conn: &Connection,
    project_id: &str,
    user_id: &str,
    name: &str,
    input: &str,
) -> Result<Option<Task>> {
    let Some(task) = create_task(conn, project_id, user_id, name, input)? else {
        return Ok(None);
    };
    append_event(conn, &task.id, "TASK_CREATED", &serde_json::json!({"name": name}))?;
    Ok(Some(task))
}

/// Apply the result of embedding generation to an already-committed task.
///
/// On success the vector lands in the store with an `EMBEDDING_GENERATED`
/// event; on failure the gap is logged and recorded as `EMBEDDING_FAILED`,
/// never surfaced to the caller. Returns the embedding id, if any.
pub fn attach_generated_embedding(
    conn: &mut Connection,
    task_id: &str,
    generated: Result<Vec<f32>, EmbeddingError>,
) -> Result<Option<String>> {
    match generated {
        Ok(vector) => {
            let id = attach_embedding(conn, task_id, &vector)?;
            append_event(
                conn,
                task_id,
                "EMBEDDING_GENERATED",
                &serde_json::json!({"embedding_id": id}),
            )?;
            Ok(Some(id))
        }
        Err(e) => {
            tracing::warn!(task_id = %task_id, error = %e, "embedding ingestion failed");
            append_event(
                conn,
                task_id,
                "EMBEDDING_FAILED",
                &serde_json::json!({"error": e.to_string()}),
            )?;
            Ok(None)
        }
    }
}

/// Create a task and synchronously ingest its input embedding.
///
/// Returns `None` when the project is not visible to the user. Embedding
/// failures are absorbed — the caller gets the committed task either way
/// and may retry only the embedding step later.
pub fn create_task_with_embedding(
    conn: &mut Connection,
    provider: &dyn EmbeddingProvider,
    project_id: &str,
    user_id: &str,
    name: &str,
    input: &str,
) -> Result<Option<IngestedTask>> {
    let Some(task) = create_pending_task(conn, project_id, user_id, name, input)? else {
        return Ok(None);
    };

    let embedding_id = attach_generated_embedding(conn, &task.id, provider.embed(input))?;

    Ok(Some(IngestedTask { task, embedding_id }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embedding::EMBEDDING_DIM;
    use crate::tasks::events::events_for_task;
    use crate::tasks::store::{embeddings_for_task, get_task};

    struct FixedProvider(Vec<f32>);

    impl EmbeddingProvider for FixedProvider {
        fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
            if text.trim().is_empty() {
                return Err(EmbeddingError::MalformedInput);
            }
            Ok(self.0.clone())
        }
    }

    struct DownProvider;

    impl EmbeddingProvider for DownProvider {
        fn embed(&self, _text: &str) -> Result<Vec<f32>, EmbeddingError> {
            Err(EmbeddingError::Unavailable("connection refused".into()))
        }
    }

    fn test_db() -> Connection {
        let conn = crate::db::open_memory_database().unwrap();
        let now = chrono::Utc::now().to_rfc3339();
        conn.execute_batch(&format!(
            "INSERT INTO users (id, username, created_at) VALUES ('u1', 'alice', '{now}');
             INSERT INTO projects (id, name, created_at) VALUES ('p1', 'P', '{now}');
             INSERT INTO project_members (user_id, project_id) VALUES ('u1', 'p1');"
        ))
        .unwrap();
        conn
    }

    fn spike() -> Vec<f32> {
        let mut v = vec![0.0f32; EMBEDDING_DIM];
        v[0] = 1.0;
        v
    }

    #[test]
    fn successful_ingestion_attaches_embedding_and_events() {
        let mut conn = test_db();
        let provider = FixedProvider(spike());

        let ingested = create_task_with_embedding(&mut conn, &provider, "p1", "u1", "T", "input")
            .unwrap()
            .unwrap();

        assert!(ingested.embedding_id.is_some());
        assert_eq!(
            embeddings_for_task(&conn, &ingested.task.id).unwrap().len(),
            1
        );

        let types: Vec<String> = events_for_task(&conn, &ingested.task.id, "u1")
            .unwrap()
            .into_iter()
            .map(|e| e.event_type)
            .collect();
        assert_eq!(types, vec!["TASK_CREATED", "EMBEDDING_GENERATED"]);
    }

    #[test]
    fn generator_failure_still_commits_the_task() {
        let mut conn = test_db();

        let ingested =
            create_task_with_embedding(&mut conn, &DownProvider, "p1", "u1", "T", "input")
                .unwrap()
                .unwrap();

        assert!(ingested.embedding_id.is_none());
        // the task exists and is queryable
        assert!(get_task(&conn, &ingested.task.id, "u1").unwrap().is_some());
        // the embeddings list is empty
        assert!(embeddings_for_task(&conn, &ingested.task.id)
            .unwrap()
            .is_empty());

        let types: Vec<String> = events_for_task(&conn, &ingested.task.id, "u1")
            .unwrap()
            .into_iter()
            .map(|e| e.event_type)
            .collect();
        assert_eq!(types, vec!["TASK_CREATED", "EMBEDDING_FAILED"]);
    }

    #[test]
    fn invisible_project_yields_none_without_calling_the_generator() {
        let mut conn = test_db();
        let provider = FixedProvider(spike());

        let result =
            create_task_with_embedding(&mut conn, &provider, "p1", "stranger", "T", "input")
                .unwrap();
        assert!(result.is_none());
    }

    #[test]
    fn split_pipeline_matches_the_composed_one() {
        let mut conn = test_db();

        let task = create_pending_task(&conn, "p1", "u1", "T", "input")
            .unwrap()
            .unwrap();
        let embedding_id =
            attach_generated_embedding(&mut conn, &task.id, Ok(spike())).unwrap();
        assert!(embedding_id.is_some());

        let types: Vec<String> = events_for_task(&conn, &task.id, "u1")
            .unwrap()
            .into_iter()
            .map(|e| e.event_type)
            .collect();
        assert_eq!(types, vec!["TASK_CREATED", "EMBEDDING_GENERATED"]);
    }
}
