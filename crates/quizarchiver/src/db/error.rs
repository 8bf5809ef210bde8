//! Database error types.

use std::path::PathBuf;
use thiserror::Error;

/// Errors from database operations.
#[derive(Error, Debug)]
pub enum DatabaseError {
    /// SQLite error from rusqlite.
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// IO error when creating directories or files.
    #[error("IO error for path '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A JSON column could not be encoded or decoded.
    #[error("Invalid JSON in column '{column}': {source}")]
    Json {
        column: &'static str,
        #[source]
        source: serde_json::Error,
    },

    /// A migration failed to apply.
    #[error("Migration failed at version {version}: {reason}")]
    Migration { version: u32, reason: String },

    /// The system random source failed while minting a token.
    #[error("Random source failure: {0}")]
    Random(String),

    /// The database lock was poisoned.
    #[error("Database lock poisoned")]
    LockPoisoned,
}
