//! Job repository: archive jobs and their settings.

use std::collections::BTreeMap;

use rusqlite::{params, OptionalExtension, Row};
use serde_json::Value;

use super::{Database, DatabaseError};

/// A raw job row from the database.
#[derive(Debug, Clone)]
pub struct JobRow {
    pub id: i64,
    pub context_id: i64,
    pub user_id: i64,
    pub settings: BTreeMap<String, Value>,
    pub time_created: i64,
}

impl JobRow {
    fn from_row(row: &Row<'_>) -> Result<Self, rusqlite::Error> {
        let settings: String = row.get("settings")?;
        let settings = serde_json::from_str(&settings).map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(0, rusqlite::types::Type::Text, Box::new(e))
        })?;
        Ok(Self {
            id: row.get("id")?,
            context_id: row.get("context_id")?,
            user_id: row.get("user_id")?,
            settings,
            time_created: row.get("time_created")?,
        })
    }
}

/// Inserts a new job and returns its id.
pub fn insert(
    db: &Database,
    context_id: i64,
    user_id: i64,
    settings: &BTreeMap<String, Value>,
    time_created: i64,
) -> Result<i64, DatabaseError> {
    let settings = serde_json::to_string(settings).map_err(|e| DatabaseError::Json {
        column: "settings",
        source: e,
    })?;
    db.with_conn(|conn| {
        conn.execute(
            "INSERT INTO archive_jobs (context_id, user_id, settings, time_created)
             VALUES (?1, ?2, ?3, ?4)",
            params![context_id, user_id, settings, time_created],
        )?;
        Ok(conn.last_insert_rowid())
    })
}

/// Finds a job by its ID.
pub fn find_by_id(db: &Database, id: i64) -> Result<Option<JobRow>, DatabaseError> {
    db.with_conn(|conn| {
        conn.query_row(
            "SELECT * FROM archive_jobs WHERE id = ?1",
            params![id],
            JobRow::from_row,
        )
        .optional()
        .map_err(DatabaseError::from)
    })
}

/// Deletes a job. Its tasks and tokens go with it.
pub fn delete(db: &Database, id: i64) -> Result<bool, DatabaseError> {
    db.with_conn(|conn| {
        let affected = conn.execute("DELETE FROM archive_jobs WHERE id = ?1", params![id])?;
        Ok(affected > 0)
    })
}
