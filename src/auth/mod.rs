//! API-key authentication.
//!
//! Credentials are salted one-way hashes (argon2id PHC strings) scoped to a
//! user and a project. Because every hash embeds its own salt, the store
//! cannot be indexed by the raw secret — verification is a bounded scan over
//! currently-valid rows with a constant-time comparison per candidate.
//!
//! [`keys::issue_key`] creates a credential and returns the raw secret
//! exactly once; [`keys::verify_key`] resolves a presented secret to an
//! [`Identity`]; [`keys::revoke_key`] deactivates a credential in place.

pub mod keys;

use serde::Serialize;
use thiserror::Error;

/// The identity a verified credential resolves to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Identity {
    pub user_id: String,
    pub project_id: String,
}

/// Authentication failures.
///
/// `InvalidCredential` is deliberately opaque: a wrong, expired, and revoked
/// key all fail identically so the caller learns nothing about key state.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("invalid API key")]
    InvalidCredential,
    /// Datastore failure unrelated to the presented secret.
    #[error("credential store error: {0}")]
    Store(#[from] rusqlite::Error),
}
