//! Remote archive worker: job payloads, status and the HTTP client.

pub mod client;
pub mod payload;
pub mod status;

pub use client::{RemoteArchiveWorker, DRIVER_NAME};
pub use payload::{JobPayload, API_VERSION};
pub use status::{EnqueuedJob, WorkerStatus, WorkerStatusReport};
