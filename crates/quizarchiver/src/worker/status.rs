use std::fmt;

use serde::{Deserialize, Serialize};

use crate::task::TaskStatus;

/// Load state the worker reports on `/status`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum WorkerStatus {
    Idle,
    Active,
    Busy,
    #[serde(other)]
    Unknown,
}

impl WorkerStatus {
    /// Unrecognized values map to [`WorkerStatus::Unknown`].
    pub fn parse(value: &str) -> Self {
        match value {
            "IDLE" => WorkerStatus::Idle,
            "ACTIVE" => WorkerStatus::Active,
            "BUSY" => WorkerStatus::Busy,
            _ => WorkerStatus::Unknown,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            WorkerStatus::Idle => "IDLE",
            WorkerStatus::Active => "ACTIVE",
            WorkerStatus::Busy => "BUSY",
            WorkerStatus::Unknown => "UNKNOWN",
        }
    }
}

impl fmt::Display for WorkerStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WorkerStatusReport {
    pub status: WorkerStatus,
    pub queue_len: u64,
}

/// Job handle returned by a successful enqueue request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnqueuedJob {
    /// Opaque job identifier chosen by the worker.
    pub job_id: String,
    pub status: TaskStatus,
}
