//! Credential issuance, verification, and revocation.
//!
//! Raw secrets carry 256 bits of OS randomness, URL-safe encoded with a
//! `pk_` prefix. Only the argon2id hash is ever persisted; verification
//! walks the active, unexpired rows and stops on the first constant-time
//! match.

use anyhow::Result;
use argon2::password_hash::{rand_core::OsRng as SaltRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use chrono::{DateTime, Utc};
use rand::RngCore;
use rusqlite::{params, Connection};

use super::{AuthError, Identity};

/// A freshly issued credential. `secret` is shown to the caller once and is
/// not recoverable afterwards.
#[derive(Debug)]
pub struct IssuedKey {
    pub id: String,
    pub secret: String,
}

/// Generate a raw API secret: 32 bytes from the OS RNG, URL-safe base64.
fn generate_secret() -> String {
    let mut bytes = [0u8; 32];
    rand::rngs::OsRng.fill_bytes(&mut bytes);
    format!("pk_{}", URL_SAFE_NO_PAD.encode(bytes))
}

/// Hash a raw secret into an argon2id PHC string with a fresh salt.
fn hash_secret(secret: &str) -> Result<String> {
    let salt = SaltString::generate(&mut SaltRng);
    let hash = Argon2::default()
        .hash_password(secret.as_bytes(), &salt)
        .map_err(|e| anyhow::anyhow!("hashing failed: {e}"))?;
    Ok(hash.to_string())
}

/// Issue a new API key for a user/project pair.
///
/// Persists only the hash; the returned raw secret is the one and only copy.
/// `expires_at = None` means the key never expires.
pub fn issue_key(
    conn: &Connection,
    user_id: &str,
    project_id: &str,
    expires_at: Option<DateTime<Utc>>,
) -> Result<IssuedKey> {
    let secret = generate_secret();
    let secret_hash = hash_secret(&secret)?;

    let id = uuid::Uuid::now_v7().to_string();
    let now = Utc::now().to_rfc3339();
    conn.execute(
        "INSERT INTO api_keys (id, user_id, project_id, secret_hash, created_at, expires_at, active) \
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, 1)",
        params![id, user_id, project_id, secret_hash, now, expires_at.map(|t| t.to_rfc3339())],
    )?;

    tracing::info!(key_id = %id, user_id = %user_id, project_id = %project_id, "API key issued");

    Ok(IssuedKey { id, secret })
}

/// Persist a caller-supplied secret as a credential (dev seeding, imports).
///
/// Same storage path as [`issue_key`], but the secret comes from outside
/// instead of the OS RNG. Returns the key id.
pub fn import_key(
    conn: &Connection,
    user_id: &str,
    project_id: &str,
    raw_secret: &str,
) -> Result<String> {
    let secret_hash = hash_secret(raw_secret)?;
    let id = uuid::Uuid::now_v7().to_string();
    let now = Utc::now().to_rfc3339();
    conn.execute(
        "INSERT INTO api_keys (id, user_id, project_id, secret_hash, created_at, expires_at, active) \
         VALUES (?1, ?2, ?3, ?4, ?5, NULL, 1)",
        params![id, user_id, project_id, secret_hash, now],
    )?;
    Ok(id)
}

/// Resolve a presented secret to its identity.
///
/// Fetches only rows that are active and not yet expired, then compares the
/// secret against each candidate hash in store order, returning on the first
/// match. The scan is O(number of currently-valid keys) and each comparison
/// is deliberately expensive; keeping the candidate set small is the
/// operational lever here. A row whose hash fails to parse is skipped, never
/// fatal.
pub fn verify_key(conn: &Connection, raw_secret: &str) -> Result<Identity, AuthError> {
    let now = Utc::now();

    let mut stmt = conn.prepare(
        "SELECT user_id, project_id, secret_hash, expires_at FROM api_keys \
         WHERE active = 1 AND (expires_at IS NULL OR expires_at > ?1)",
    )?;

    let candidates = stmt
        .query_map(params![now.to_rfc3339()], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, Option<String>>(3)?,
            ))
        })?
        .collect::<Result<Vec<_>, _>>()?;

    let verifier = Argon2::default();
    for (user_id, project_id, secret_hash, expires_at) in candidates {
        let parsed = match PasswordHash::new(&secret_hash) {
            Ok(parsed) => parsed,
            Err(e) => {
                tracing::debug!(error = %e, "skipping credential with unparseable hash");
                continue;
            }
        };

        if verifier
            .verify_password(raw_secret.as_bytes(), &parsed)
            .is_err()
        {
            continue;
        }

        // Re-check expiry at match time, in case the key expired between the
        // row fetch and the hash comparison.
        if let Some(raw) = expires_at {
            match DateTime::parse_from_rfc3339(&raw) {
                Ok(at) if at <= now => return Err(AuthError::InvalidCredential),
                Ok(_) => {}
                Err(e) => {
                    tracing::debug!(error = %e, "skipping credential with unparseable expiry");
                    continue;
                }
            }
        }

        return Ok(Identity {
            user_id,
            project_id,
        });
    }

    Err(AuthError::InvalidCredential)
}

/// Deactivate a key. Returns `false` if the id does not exist.
///
/// Revocation is a single-row flip; the hash stays in place so an audit can
/// still see the credential existed.
pub fn revoke_key(conn: &Connection, key_id: &str) -> Result<bool> {
    let rows = conn.execute(
        "UPDATE api_keys SET active = 0 WHERE id = ?1",
        params![key_id],
    )?;
    if rows > 0 {
        tracing::info!(key_id = %key_id, "API key revoked");
    }
    Ok(rows > 0)
}
