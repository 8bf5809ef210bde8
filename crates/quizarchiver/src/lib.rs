pub mod attempts;
pub mod config;
pub mod db;
pub mod driver;
pub mod error;
pub mod fingerprint;
pub mod host;
pub mod model;
pub mod report;
pub mod sanitize;
pub mod storage;
pub mod task;
pub mod telemetry;
pub mod webservice;
pub mod worker;

pub use attempts::{AttemptEnumerator, AttemptMetadata, AttemptRef};
pub use config::{load_config, ArchiverConfig, LoggingConfig};
pub use db::{Database, DatabaseError};
pub use driver::{QuizArchivingDriver, StepOutcome};
pub use error::{
    ArchiverError, ConfigError, ReportError, RepositoryError, Result, StorageError, TaskError,
    WebserviceError, WorkerError,
};
pub use host::{FileStore, PageRenderer, QuizRepository};
pub use report::{AttemptReport, ImageInliner, ReportSection, SectionSet};
pub use storage::FileSystemStore;
pub use task::{JobSettings, Task, TaskStatus, TaskStore};
pub use telemetry::init_logging;
pub use webservice::{ArchiverWebservice, WebserviceStatus};
pub use worker::{RemoteArchiveWorker, WorkerStatus};
