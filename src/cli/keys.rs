//! `precedent key` subcommands.

use anyhow::Result;
use chrono::{Duration, Utc};

use crate::auth::keys::{issue_key, revoke_key};
use crate::config::PrecedentConfig;
use crate::db;

/// Issue a new API key and print the raw secret — the only time it is ever
/// visible.
pub fn issue(
    config: &PrecedentConfig,
    user_id: &str,
    project_id: &str,
    expires_days: Option<i64>,
) -> Result<()> {
    let conn = db::open_database(config.resolved_db_path())?;
    let expires_at = expires_days.map(|days| Utc::now() + Duration::days(days));

    let issued = issue_key(&conn, user_id, project_id, expires_at)?;

    println!("API key issued (id {})", issued.id);
    println!();
    println!("  {}", issued.secret);
    println!();
    println!("Store this secret now — it cannot be recovered.");
    if let Some(at) = expires_at {
        println!("Expires: {}", at.to_rfc3339());
    }
    Ok(())
}

/// Deactivate a key by id.
pub fn revoke(config: &PrecedentConfig, key_id: &str) -> Result<()> {
    let conn = db::open_database(config.resolved_db_path())?;
    if revoke_key(&conn, key_id)? {
        println!("Key {key_id} revoked.");
    } else {
        println!("No key with id {key_id}.");
    }
    Ok(())
}
