//! Task repository: CRUD operations for the `archive_tasks` table.

use std::collections::BTreeMap;

use rusqlite::types::Type;
use rusqlite::{params, Connection, OptionalExtension, Row};
use serde_json::Value;

use super::{Database, DatabaseError};
use crate::task::{Task, TaskArtifact, TaskStatus, TaskUpdate};

/// Values needed to create a task.
#[derive(Debug, Clone)]
pub struct NewTask {
    pub job_id: i64,
    pub context_id: i64,
    pub cm_id: i64,
    pub user_id: i64,
}

fn conversion_error<E>(column: usize, ty: Type, e: E) -> rusqlite::Error
where
    E: std::error::Error + Send + Sync + 'static,
{
    rusqlite::Error::FromSqlConversionFailure(column, ty, Box::new(e))
}

fn task_from_row(row: &Row<'_>) -> Result<Task, rusqlite::Error> {
    let status_code: i64 = row.get("status")?;
    let status = TaskStatus::from_code(status_code).ok_or_else(|| {
        rusqlite::Error::IntegralValueOutOfRange(0, status_code)
    })?;

    let progress: Option<i64> = row.get("progress")?;
    let progress = progress
        .map(|p| u8::try_from(p).map_err(|e| conversion_error(0, Type::Integer, e)))
        .transpose()?;

    let metadata: String = row.get("metadata")?;
    let metadata: BTreeMap<String, Value> =
        serde_json::from_str(&metadata).map_err(|e| conversion_error(0, Type::Text, e))?;

    let artifact: Option<String> = row.get("artifact")?;
    let artifact: Option<TaskArtifact> = artifact
        .map(|a| serde_json::from_str(&a).map_err(|e| conversion_error(0, Type::Text, e)))
        .transpose()?;

    Ok(Task {
        id: row.get("id")?,
        job_id: row.get("job_id")?,
        context_id: row.get("context_id")?,
        cm_id: row.get("cm_id")?,
        user_id: row.get("user_id")?,
        status,
        progress,
        metadata,
        artifact,
        time_created: row.get("time_created")?,
        time_modified: row.get("time_modified")?,
    })
}

/// Inserts a new task in `UNINITIALIZED` and returns its id.
pub fn insert(db: &Database, task: &NewTask, now: i64) -> Result<i64, DatabaseError> {
    db.with_conn(|conn| {
        conn.execute(
            "INSERT INTO archive_tasks (job_id, context_id, cm_id, user_id, status, metadata,
             time_created, time_modified)
             VALUES (?1, ?2, ?3, ?4, ?5, '{}', ?6, ?6)",
            params![
                task.job_id,
                task.context_id,
                task.cm_id,
                task.user_id,
                TaskStatus::Uninitialized.code(),
                now,
            ],
        )?;
        Ok(conn.last_insert_rowid())
    })
}

fn find_with(conn: &Connection, id: i64) -> Result<Option<Task>, DatabaseError> {
    conn.query_row(
        "SELECT * FROM archive_tasks WHERE id = ?1",
        params![id],
        task_from_row,
    )
    .optional()
    .map_err(DatabaseError::from)
}

/// Finds a task by its ID.
pub fn find_by_id(db: &Database, id: i64) -> Result<Option<Task>, DatabaseError> {
    db.with_conn(|conn| find_with(conn, id))
}

/// Applies status, progress, metadata and artifact changes in one
/// transaction. Metadata entries are merged into the existing map. Returns
/// `false` if the task does not exist.
pub fn apply_update(
    db: &Database,
    id: i64,
    update: &TaskUpdate,
    now: i64,
) -> Result<bool, DatabaseError> {
    db.with_transaction(|tx| {
        let Some(current) = find_with(tx, id)? else {
            return Ok(false);
        };

        let mut metadata = current.metadata;
        metadata.extend(update.metadata.clone());
        let metadata = serde_json::to_string(&metadata).map_err(|e| DatabaseError::Json {
            column: "metadata",
            source: e,
        })?;

        let artifact = update
            .artifact
            .as_ref()
            .or(current.artifact.as_ref())
            .map(serde_json::to_string)
            .transpose()
            .map_err(|e| DatabaseError::Json {
                column: "artifact",
                source: e,
            })?;

        let status = update.status.unwrap_or(current.status);
        let progress = update.progress.or(current.progress);

        tx.execute(
            "UPDATE archive_tasks SET status = ?2, progress = ?3, metadata = ?4, artifact = ?5,
             time_modified = ?6 WHERE id = ?1",
            params![id, status.code(), progress.map(i64::from), metadata, artifact, now],
        )?;
        Ok(true)
    })
}
