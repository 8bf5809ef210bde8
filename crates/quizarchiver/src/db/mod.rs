//! Database module for persistent task state.
//!
//! Uses rusqlite (SQLite) with a thread-safe `Database` handle.
//! All access is serialized through a `Mutex<Connection>`.

use std::path::Path;
use std::sync::{Arc, Mutex};

use rusqlite::Connection;

pub mod error;
pub mod job_repo;
pub mod migrations;
pub mod task_repo;
pub mod task_store;
pub mod token_repo;

pub use error::DatabaseError;

/// Thread-safe database handle wrapping a single rusqlite connection.
///
/// Cloning is cheap (inner `Arc`). All access is serialized through
/// a `Mutex`, which is fine for SQLite (which serializes writes anyway).
#[derive(Clone)]
pub struct Database {
    conn: Arc<Mutex<Connection>>,
}

impl Database {
    /// Opens (or creates) the database at the given path and runs all
    /// pending migrations.
    pub fn open(path: &Path) -> Result<Self, DatabaseError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| DatabaseError::Io {
                path: parent.to_path_buf(),
                source: e,
            })?;
        }

        let conn = Connection::open(path)?;
        conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA foreign_keys=ON;")?;

        migrations::run_all(&conn)?;

        log::info!("Database opened at {}", path.display());

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Opens an in-memory database for testing. Runs all migrations.
    pub fn open_in_memory() -> Result<Self, DatabaseError> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch("PRAGMA foreign_keys=ON;")?;

        migrations::run_all(&conn)?;

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Provides locked access to the underlying connection.
    pub fn with_conn<F, T>(&self, f: F) -> Result<T, DatabaseError>
    where
        F: FnOnce(&Connection) -> Result<T, DatabaseError>,
    {
        let conn = self.conn.lock().map_err(|_| DatabaseError::LockPoisoned)?;
        f(&conn)
    }

    /// Runs `f` inside a transaction; commits on `Ok`, rolls back on `Err`.
    pub fn with_transaction<F, T>(&self, f: F) -> Result<T, DatabaseError>
    where
        F: FnOnce(&rusqlite::Transaction<'_>) -> Result<T, DatabaseError>,
    {
        let mut conn = self.conn.lock().map_err(|_| DatabaseError::LockPoisoned)?;
        let tx = conn.transaction()?;
        let value = f(&tx)?;
        tx.commit()?;
        Ok(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_open_in_memory() {
        let db = Database::open_in_memory().unwrap();
        db.with_conn(|conn| {
            let count: u32 =
                conn.query_row("SELECT COUNT(*) FROM _migrations", [], |r| r.get(0))?;
            assert!(count > 0);
            Ok(())
        })
        .unwrap();
    }

    #[test]
    fn test_open_file_db() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("archiver.db");
        let db = Database::open(&path).unwrap();
        db.with_conn(|conn| {
            let count: u32 =
                conn.query_row("SELECT COUNT(*) FROM _migrations", [], |r| r.get(0))?;
            assert!(count > 0);
            Ok(())
        })
        .unwrap();
        assert!(path.exists());
    }

    #[test]
    fn test_transaction_rolls_back_on_error() {
        let db = Database::open_in_memory().unwrap();
        let result: Result<(), DatabaseError> = db.with_transaction(|tx| {
            tx.execute(
                "INSERT INTO archive_jobs (context_id, user_id, time_created) VALUES (1, 2, 3)",
                [],
            )?;
            Err(DatabaseError::LockPoisoned)
        });
        assert!(result.is_err());

        db.with_conn(|conn| {
            let count: u32 =
                conn.query_row("SELECT COUNT(*) FROM archive_jobs", [], |r| r.get(0))?;
            assert_eq!(count, 0);
            Ok(())
        })
        .unwrap();
    }

    #[test]
    fn test_database_is_clone() {
        let db = Database::open_in_memory().unwrap();
        let db2 = db.clone();
        db.with_conn(|conn| {
            conn.execute(
                "INSERT INTO archive_jobs (context_id, user_id, time_created) VALUES (1, 2, 3)",
                [],
            )?;
            Ok(())
        })
        .unwrap();
        db2.with_conn(|conn| {
            let count: u32 =
                conn.query_row("SELECT COUNT(*) FROM archive_jobs", [], |r| r.get(0))?;
            assert_eq!(count, 1);
            Ok(())
        })
        .unwrap();
    }
}
