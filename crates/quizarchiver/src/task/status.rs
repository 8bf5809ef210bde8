//! Task lifecycle states and the transition function.
//!
//! The happy path is strictly linear:
//! `UNINITIALIZED → CREATED → AWAITING_PROCESSING → RUNNING → FINALIZING → FINISHED`.
//! `FAILED`, `CANCELED`, `TIMEOUT` and `UNKNOWN` can be entered from any
//! state that is not yet completed.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::TaskError;

/// Status of an archiving task. The numeric codes are part of the worker
/// protocol and of the persisted task record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "i64")]
pub enum TaskStatus {
    Uninitialized,
    Created,
    AwaitingProcessing,
    Running,
    Finalizing,
    Finished,
    Canceled,
    Failed,
    Timeout,
    Unknown,
}

impl TaskStatus {
    pub const ALL: [TaskStatus; 10] = [
        TaskStatus::Uninitialized,
        TaskStatus::Created,
        TaskStatus::AwaitingProcessing,
        TaskStatus::Running,
        TaskStatus::Finalizing,
        TaskStatus::Finished,
        TaskStatus::Canceled,
        TaskStatus::Failed,
        TaskStatus::Timeout,
        TaskStatus::Unknown,
    ];

    pub fn code(self) -> i64 {
        match self {
            TaskStatus::Uninitialized => 0,
            TaskStatus::Created => 10,
            TaskStatus::AwaitingProcessing => 20,
            TaskStatus::Running => 30,
            TaskStatus::Finalizing => 40,
            TaskStatus::Finished => 100,
            TaskStatus::Canceled => 200,
            TaskStatus::Failed => 210,
            TaskStatus::Timeout => 220,
            TaskStatus::Unknown => 255,
        }
    }

    pub fn from_code(code: i64) -> Option<Self> {
        Self::ALL.into_iter().find(|s| s.code() == code)
    }

    pub fn name(self) -> &'static str {
        match self {
            TaskStatus::Uninitialized => "UNINITIALIZED",
            TaskStatus::Created => "CREATED",
            TaskStatus::AwaitingProcessing => "AWAITING_PROCESSING",
            TaskStatus::Running => "RUNNING",
            TaskStatus::Finalizing => "FINALIZING",
            TaskStatus::Finished => "FINISHED",
            TaskStatus::Canceled => "CANCELED",
            TaskStatus::Failed => "FAILED",
            TaskStatus::Timeout => "TIMEOUT",
            TaskStatus::Unknown => "UNKNOWN",
        }
    }

    /// The next state on the linear happy path, if any.
    pub fn next(self) -> Option<Self> {
        match self {
            TaskStatus::Uninitialized => Some(TaskStatus::Created),
            TaskStatus::Created => Some(TaskStatus::AwaitingProcessing),
            TaskStatus::AwaitingProcessing => Some(TaskStatus::Running),
            TaskStatus::Running => Some(TaskStatus::Finalizing),
            TaskStatus::Finalizing => Some(TaskStatus::Finished),
            _ => None,
        }
    }

    /// Completed tasks accept no further status updates or uploads.
    pub fn is_completed(self) -> bool {
        matches!(
            self,
            TaskStatus::Finished | TaskStatus::Canceled | TaskStatus::Failed | TaskStatus::Timeout
        )
    }

    /// States in which the driver has nothing left to do.
    pub fn is_terminal(self) -> bool {
        self.is_completed() || self == TaskStatus::Unknown
    }

    /// Off-path states reachable from any state that is not completed.
    pub fn is_failure_exit(self) -> bool {
        matches!(
            self,
            TaskStatus::Failed | TaskStatus::Canceled | TaskStatus::Timeout | TaskStatus::Unknown
        )
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl From<TaskStatus> for i64 {
    fn from(status: TaskStatus) -> Self {
        status.code()
    }
}

impl TryFrom<i64> for TaskStatus {
    type Error = String;

    fn try_from(code: i64) -> Result<Self, Self::Error> {
        TaskStatus::from_code(code).ok_or_else(|| format!("unknown task status code {}", code))
    }
}

/// Something that happened to a task.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskEvent {
    /// The driver picked up a fresh task.
    Initialized,
    /// The worker accepted the archive job.
    JobEnqueued,
    /// The worker rejected the archive job definitively.
    EnqueueFailed,
    /// The worker reported a new status through the webservice.
    StatusReported(TaskStatus),
    /// The uploaded artifact was verified and stored.
    ArtifactStored,
    /// The uploaded artifact was missing, corrupt or could not be stored.
    ArtifactRejected,
    /// The surrounding system decided the task ran past its deadline.
    DeadlineExceeded,
}

impl fmt::Display for TaskEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TaskEvent::Initialized => f.write_str("initialized"),
            TaskEvent::JobEnqueued => f.write_str("job-enqueued"),
            TaskEvent::EnqueueFailed => f.write_str("enqueue-failed"),
            TaskEvent::StatusReported(s) => write!(f, "status-reported({})", s),
            TaskEvent::ArtifactStored => f.write_str("artifact-stored"),
            TaskEvent::ArtifactRejected => f.write_str("artifact-rejected"),
            TaskEvent::DeadlineExceeded => f.write_str("deadline-exceeded"),
        }
    }
}

/// Pure transition function. Returns the state a task in `from` moves to on `event`.
pub fn transition(task_id: i64, from: TaskStatus, event: TaskEvent) -> Result<TaskStatus, TaskError> {
    if from.is_completed() {
        return Err(TaskError::AlreadyCompleted {
            task_id,
            status: from,
        });
    }

    let invalid = || TaskError::InvalidTransition {
        from,
        event: event.to_string(),
    };

    match event {
        TaskEvent::Initialized => match from {
            TaskStatus::Uninitialized => Ok(TaskStatus::Created),
            _ => Err(invalid()),
        },
        TaskEvent::JobEnqueued => match from {
            TaskStatus::Created => Ok(TaskStatus::AwaitingProcessing),
            _ => Err(invalid()),
        },
        TaskEvent::EnqueueFailed | TaskEvent::ArtifactRejected => Ok(TaskStatus::Failed),
        TaskEvent::DeadlineExceeded => Ok(TaskStatus::Timeout),
        TaskEvent::ArtifactStored => Ok(TaskStatus::Finished),
        TaskEvent::StatusReported(to) => {
            if to == from || to.is_failure_exit() {
                Ok(to)
            } else if from.next() == Some(to) {
                Ok(to)
            } else {
                Err(invalid())
            }
        }
    }
}
