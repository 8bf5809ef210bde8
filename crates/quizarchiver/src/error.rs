use std::path::PathBuf;
use thiserror::Error;

use crate::task::TaskStatus;

#[derive(Error, Debug)]
pub enum ArchiverError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Repository error: {0}")]
    Repository(#[from] RepositoryError),

    #[error("Report error: {0}")]
    Report(#[from] ReportError),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Worker error: {0}")]
    Worker(#[from] WorkerError),

    #[error("Task error: {0}")]
    Task(#[from] TaskError),

    #[error("Database error: {0}")]
    Database(#[from] crate::db::DatabaseError),

    #[error("Webservice error: {0}")]
    Webservice(#[from] WebserviceError),
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file '{path}': {source}")]
    ReadFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config JSON: {0}")]
    ParseJson(#[from] serde_json::Error),

    #[error("Config validation failed: {message}")]
    Validation { message: String },

    #[error("Invalid pattern '{pattern}': {reason}")]
    InvalidPattern { pattern: String, reason: String },
}

/// Failures of the host data store (courses, quizzes, attempts, users).
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RepositoryError {
    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: i64 },

    #[error("Repository backend failure: {0}")]
    Backend(String),
}

impl RepositoryError {
    pub fn not_found(entity: &'static str, id: i64) -> Self {
        Self::NotFound { entity, id }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

#[derive(Error, Debug)]
pub enum ReportError {
    #[error(transparent)]
    Repository(#[from] RepositoryError),

    #[error("Failed to serialize report document: {0}")]
    Serialize(#[source] std::io::Error),

    #[error("Report document has no <head> element")]
    MissingHead,

    #[error("Failed to build HTTP client: {0}")]
    HttpClient(String),
}

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("Failed to create directory '{path}': {source}")]
    CreateDirectory {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to read file '{path}': {source}")]
    ReadFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to write file '{path}': {source}")]
    WriteFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to delete file '{path}': {source}")]
    DeleteFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to move file from '{from}' to '{to}': {source}")]
    MoveFile {
        from: PathBuf,
        to: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("File already exists: {0}")]
    FileExists(PathBuf),

    #[error("Invalid file reference: {0}")]
    InvalidReference(String),
}

#[derive(Error, Debug)]
pub enum WorkerError {
    /// Caller-side contract violation detected before any network I/O.
    #[error("Precondition failed: {0}")]
    Precondition(String),

    /// The worker answered with a malformed or incomplete body.
    #[error("Worker protocol error: {0}")]
    Protocol(String),

    /// Connection could not be established or the request timed out.
    #[error("Worker unreachable: {0}")]
    Unreachable(String),

    #[error("Worker request failed: {0}")]
    Request(String),

    #[error("Worker returned HTTP {status}: {message}")]
    Http { status: u16, message: String },

    #[error("Failed to build HTTP client: {0}")]
    ClientBuild(String),
}

impl WorkerError {
    /// Transient errors leave the task untouched so the next poll can retry.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Unreachable(_))
    }
}

#[derive(Error, Debug)]
pub enum TaskError {
    #[error("Task {0} not found")]
    NotFound(i64),

    #[error("Job {0} not found")]
    JobNotFound(i64),

    #[error("Task {task_id} is already completed ({status})")]
    AlreadyCompleted { task_id: i64, status: TaskStatus },

    #[error("Transition from {from} via {event} is not allowed")]
    InvalidTransition { from: TaskStatus, event: String },

    #[error("Invalid task data: {0}")]
    InvalidData(String),

    #[error("Database error: {0}")]
    Database(#[from] crate::db::DatabaseError),
}

/// Hard failures of an inbound webservice call. Business outcomes are
/// reported as [`crate::webservice::WebserviceStatus`] instead.
#[derive(Error, Debug)]
pub enum WebserviceError {
    #[error("Invalid parameter '{name}': {reason}")]
    InvalidParameter { name: String, reason: String },

    #[error("Unknown webservice function '{0}'")]
    UnknownFunction(String),

    #[error(transparent)]
    Repository(#[from] RepositoryError),

    #[error(transparent)]
    Report(#[from] ReportError),

    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error(transparent)]
    Task(#[from] TaskError),

    #[error("Failed to encode response: {0}")]
    Encode(#[from] serde_json::Error),
}

impl WebserviceError {
    pub fn invalid(name: &str, reason: impl Into<String>) -> Self {
        Self::InvalidParameter {
            name: name.to_string(),
            reason: reason.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, ArchiverError>;
