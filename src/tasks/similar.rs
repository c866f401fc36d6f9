//! Semantic recall of concluded tasks.
//!
//! [`find_similar`] ranks stored task embeddings by L2 distance to a query
//! vector and returns the closest concluded tasks. The walk is bounded:
//! KNN candidates arrive in ascending distance order, so the scan stops at
//! the first candidate past the threshold.
//!
//! Rules, in order: strict `distance < threshold` (an exact-match distance
//! of 0 qualifies), task state must be terminal, one result per distinct
//! embedding vector (the closest wins; ties fall back to KNN return
//! order), ascending distance, capped at `max_results`.

use std::collections::HashSet;

use anyhow::{bail, Result};
use rusqlite::{params, Connection};
use serde::Serialize;

use super::types::{Task, TaskState};
use crate::config::RetrievalConfig;
use crate::embedding::EMBEDDING_DIM;

/// A concluded task together with its distance to the query vector.
/// Lower distance means more similar.
#[derive(Debug, Clone, Serialize)]
pub struct SimilarTask {
    #[serde(flatten)]
    pub task: Task,
    pub distance: f64,
}

/// One hydrated KNN candidate.
struct Candidate {
    task: Task,
    vector_bytes: Vec<u8>,
}

/// Find concluded tasks whose embeddings are close to the query vector.
///
/// When `project_id` is given, results are limited to that project. Returns
/// an empty vector, never an error, when nothing qualifies.
pub fn find_similar(
    conn: &Connection,
    query: &[f32],
    project_id: Option<&str>,
    retrieval: &RetrievalConfig,
) -> Result<Vec<SimilarTask>> {
    if query.len() != EMBEDDING_DIM {
        bail!(
            "query vector has {} dimensions, expected {EMBEDDING_DIM}",
            query.len()
        );
    }

    let candidates = knn_candidates(conn, query, retrieval.candidate_limit)?;

    let mut seen_vectors: HashSet<Vec<u8>> = HashSet::new();
    let mut results: Vec<SimilarTask> = Vec::new();

    for (embedding_id, distance) in candidates {
        // Candidates are ordered by distance; nothing past the threshold
        // can qualify.
        if distance >= retrieval.distance_threshold {
            break;
        }
        if results.len() >= retrieval.max_results {
            break;
        }

        let Some(candidate) = hydrate_candidate(conn, &embedding_id)? else {
            // vec row without an owning embedding row; index drift, skip
            continue;
        };

        if !candidate.task.state.is_terminal() {
            continue;
        }
        if let Some(project) = project_id {
            if candidate.task.project_id != project {
                continue;
            }
        }
        // First (closest) row per distinct vector wins
        if !seen_vectors.insert(candidate.vector_bytes) {
            continue;
        }

        results.push(SimilarTask {
            task: candidate.task,
            distance,
        });
    }

    Ok(results)
}

/// Vector KNN search via sqlite-vec, ascending by L2 distance.
fn knn_candidates(
    conn: &Connection,
    query: &[f32],
    limit: usize,
) -> Result<Vec<(String, f64)>> {
    let query_bytes = super::embedding_to_bytes(query);
    let mut stmt = conn.prepare(
        "SELECT id, distance FROM task_vec \
         WHERE embedding MATCH ?1 ORDER BY distance LIMIT ?2",
    )?;
    let results = stmt
        .query_map(params![query_bytes, limit as i64], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, f64>(1)?))
        })?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(results)
}

/// Join a KNN hit back to its owning embedding row and task.
fn hydrate_candidate(conn: &Connection, embedding_id: &str) -> Result<Option<Candidate>> {
    let mut stmt = conn.prepare(
        "SELECT e.embedding, t.id, t.project_id, t.name, t.input, t.result, t.success, t.state, t.created_at \
         FROM task_embeddings e \
         INNER JOIN tasks t ON t.id = e.task_id \
         WHERE e.id = ?1",
    )?;
    let mut rows = stmt.query_map(params![embedding_id], |row| {
        let state: String = row.get(7)?;
        let state = state.parse::<TaskState>().map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(
                7,
                rusqlite::types::Type::Text,
                Box::<dyn std::error::Error + Send + Sync>::from(e),
            )
        })?;
        Ok(Candidate {
            vector_bytes: row.get(0)?,
            task: Task {
                id: row.get(1)?,
                project_id: row.get(2)?,
                name: row.get(3)?,
                input: row.get(4)?,
                result: row.get(5)?,
                success: row.get(6)?,
                state,
                created_at: row.get(8)?,
            },
        })
    })?;
    match rows.next() {
        Some(candidate) => Ok(Some(candidate?)),
        None => Ok(None),
    }
}
