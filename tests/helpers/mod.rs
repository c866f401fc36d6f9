#![allow(dead_code)]

use precedent::db;
use precedent::projects::{add_member, create_project, create_user};
use precedent::embedding::EMBEDDING_DIM;
use rusqlite::Connection;

/// Open a fresh in-memory database with schema and migrations applied.
pub fn test_db() -> Connection {
    db::open_memory_database().unwrap()
}

/// Create a user plus a project they belong to. Returns (user_id, project_id).
pub fn seed_account(conn: &mut Connection, username: &str, project_name: &str) -> (String, String) {
    let user = create_user(conn, username, None).unwrap();
    let project = create_project(conn, &user.id, project_name, None).unwrap();
    (user.id, project.id)
}

/// Enroll an existing user into an existing project.
pub fn enroll(conn: &Connection, user_id: &str, project_id: &str) {
    add_member(conn, user_id, project_id).unwrap();
}

/// Deterministic 1536-dim embedding with a unit spike at position `seed`.
/// Distinct seeds produce orthogonal vectors (L2 distance sqrt(2)).
pub fn test_embedding(seed: usize) -> Vec<f32> {
    let mut v = vec![0.0f32; EMBEDDING_DIM];
    v[seed % EMBEDDING_DIM] = 1.0;
    v
}

/// A vector at exactly `offset` L2 distance from `test_embedding(0)`.
pub fn offset_embedding(offset: f32) -> Vec<f32> {
    let mut v = test_embedding(0);
    v[1] = offset;
    v
}
