use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::model::FileRef;
use crate::task::TaskStatus;

/// Metadata key: number of attempts handed to the worker.
pub const META_NUM_ATTEMPTS: &str = "num_attempts";
/// Metadata key: number of attachments across all attempts.
pub const META_NUM_ATTACHMENTS: &str = "num_attachments";
/// Metadata key: job identifier returned by the worker.
pub const META_WORKER_JOB_ID: &str = "worker_job_id";
/// Metadata key: status code the worker answered the enqueue request with.
pub const META_WORKER_STATUS: &str = "worker_status";
/// Metadata key: reason the last enqueue attempt failed.
pub const META_ENQUEUE_ERROR: &str = "enqueue_error";

/// One archival run for one quiz.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    pub id: i64,
    pub job_id: i64,
    pub context_id: i64,
    pub cm_id: i64,
    pub user_id: i64,
    pub status: TaskStatus,
    pub progress: Option<u8>,
    pub metadata: BTreeMap<String, Value>,
    pub artifact: Option<TaskArtifact>,
    pub time_created: i64,
    pub time_modified: i64,
}

impl Task {
    pub fn is_completed(&self) -> bool {
        self.status.is_completed()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskArtifact {
    pub file: FileRef,
    pub sha256: String,
}

/// Time-limited credential the worker presents when calling back.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WebserviceToken {
    pub token: String,
    pub task_id: i64,
    pub expires_at: i64,
}

impl WebserviceToken {
    pub fn is_valid_at(&self, now: i64) -> bool {
        now < self.expires_at
    }

    /// Compares `presented` with this token in time independent of where
    /// the first differing byte is.
    pub fn matches(&self, presented: &str) -> bool {
        let (a, b) = (self.token.as_bytes(), presented.as_bytes());
        if a.len() != b.len() {
            return false;
        }
        a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
    }
}

/// Changes applied to a task in one write.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TaskUpdate {
    pub status: Option<TaskStatus>,
    pub progress: Option<u8>,
    pub metadata: BTreeMap<String, Value>,
    pub artifact: Option<TaskArtifact>,
}

impl TaskUpdate {
    pub fn status(status: TaskStatus) -> Self {
        Self {
            status: Some(status),
            ..Self::default()
        }
    }

    pub fn with_progress(mut self, progress: u8) -> Self {
        self.progress = Some(progress);
        self
    }

    pub fn with_metadata(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.metadata.insert(key.to_string(), value.into());
        self
    }

    pub fn with_artifact(mut self, artifact: TaskArtifact) -> Self {
        self.artifact = Some(artifact);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.status.is_none()
            && self.progress.is_none()
            && self.metadata.is_empty()
            && self.artifact.is_none()
    }
}
