//! Webservice token repository.

use rusqlite::{params, OptionalExtension};

use super::{Database, DatabaseError};
use crate::task::WebserviceToken;

/// Number of random bytes in a token (hex-encoded to twice as many chars).
const TOKEN_BYTES: usize = 32;

/// Generates a fresh random token.
pub fn generate_token() -> Result<String, DatabaseError> {
    let mut bytes = [0u8; TOKEN_BYTES];
    getrandom::fill(&mut bytes).map_err(|e| DatabaseError::Random(e.to_string()))?;
    Ok(hex::encode(bytes))
}

/// Mints and stores a new token for `task_id`.
pub fn create(
    db: &Database,
    task_id: i64,
    expires_at: i64,
    now: i64,
) -> Result<WebserviceToken, DatabaseError> {
    let token = generate_token()?;
    db.with_conn(|conn| {
        conn.execute(
            "INSERT INTO webservice_tokens (task_id, token, expires_at, time_created)
             VALUES (?1, ?2, ?3, ?4)",
            params![task_id, token, expires_at, now],
        )?;
        Ok(())
    })?;

    Ok(WebserviceToken {
        token,
        task_id,
        expires_at,
    })
}

/// Latest token issued for `task_id`.
pub fn find_latest(db: &Database, task_id: i64) -> Result<Option<WebserviceToken>, DatabaseError> {
    db.with_conn(|conn| {
        conn.query_row(
            "SELECT token, task_id, expires_at FROM webservice_tokens
             WHERE task_id = ?1 ORDER BY id DESC LIMIT 1",
            params![task_id],
            |row| {
                Ok(WebserviceToken {
                    token: row.get(0)?,
                    task_id: row.get(1)?,
                    expires_at: row.get(2)?,
                })
            },
        )
        .optional()
        .map_err(DatabaseError::from)
    })
}
