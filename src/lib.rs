//! Task-tracking backend for AI agents.
//!
//! Precedent stores projects, tasks, and task events behind a single HTTP
//! API gated by per-project API keys, and recalls concluded tasks whose
//! input embeddings are close to a query vector — the "what did we do last
//! time this came up" primitive an agent planner leans on.
//!
//! # Architecture
//!
//! - **Storage**: SQLite with [sqlite-vec](https://github.com/asg017/sqlite-vec)
//!   for vector KNN over task embeddings (1536 dimensions)
//! - **Authentication**: bearer API keys, stored only as salted argon2id
//!   hashes and verified by a bounded scan over currently-valid credentials
//! - **Embeddings**: an external OpenAI-compatible generator; a generator
//!   outage degrades recall, never task creation
//! - **Transport**: JSON over HTTP (axum)
//!
//! # Modules
//!
//! - [`config`] — Configuration loading from TOML files and environment variables
//! - [`db`] — SQLite initialization, schema, and migrations
//! - [`auth`] — API-key issuance, verification, and revocation
//! - [`embedding`] — Text-to-vector pipeline behind a provider trait
//! - [`tasks`] — Task ledger, event log, ingestion, and similarity recall
//! - [`projects`] — Projects, users, and membership scoping
//! - [`server`] / [`handlers`] — HTTP surface
//! - [`cli`] — Operator commands (db bootstrap, key management)

pub mod auth;
pub mod cli;
pub mod config;
pub mod db;
pub mod embedding;
pub mod handlers;
pub mod projects;
pub mod server;
pub mod tasks;
