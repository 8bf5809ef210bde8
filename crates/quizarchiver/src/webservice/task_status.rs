//! `update_task_status`: the worker reports progress and state changes.

use log::{error, info, warn};
use serde::{Deserialize, Serialize};

use crate::error::WebserviceError;
use crate::task::{transition, TaskEvent, TaskStatus, TaskUpdate};
use crate::webservice::{require_positive, require_uuid, Access, ArchiverWebservice, WebserviceStatus};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateTaskStatusParams {
    pub uuid: String,
    pub taskid: i64,
    /// Numeric task status code.
    pub status: i64,
    #[serde(default)]
    pub progress: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateTaskStatusResponse {
    pub status: WebserviceStatus,
}

impl From<WebserviceStatus> for UpdateTaskStatusResponse {
    fn from(status: WebserviceStatus) -> Self {
        Self { status }
    }
}

impl ArchiverWebservice {
    pub fn update_task_status(
        &self,
        wstoken: &str,
        params: UpdateTaskStatusParams,
    ) -> Result<UpdateTaskStatusResponse, WebserviceError> {
        let _span = tracing::info_span!("update_task_status", task_id = params.taskid).entered();
        require_uuid(&params.uuid)?;
        require_positive("taskid", params.taskid)?;

        let task = match self.authorize(params.taskid, wstoken)? {
            Access::Granted(task) => task,
            Access::Denied(status) => return Ok(status.into()),
        };

        if task.is_completed() {
            warn!("Task {} is already {}, ignoring status update", task.id, task.status);
            return Ok(WebserviceStatus::E_ALREADY_COMPLETED.into());
        }

        let Some(requested) = TaskStatus::from_code(params.status) else {
            warn!("Task {}: unknown status code {}", task.id, params.status);
            return Ok(WebserviceStatus::E_INVALID_STATUS.into());
        };

        let progress = match params.progress {
            None => None,
            Some(p @ 0..=100) => Some(p as u8),
            Some(p) => {
                warn!("Task {}: progress {} out of range", task.id, p);
                return Ok(WebserviceStatus::E_INVALID_PROGRESS.into());
            }
        };

        let to = match transition(task.id, task.status, TaskEvent::StatusReported(requested)) {
            Ok(to) => to,
            Err(e) => {
                warn!("Task {}: {}", task.id, e);
                return Ok(WebserviceStatus::E_INVALID_STATUS.into());
            }
        };

        let mut update = TaskUpdate::status(to);
        if let Some(progress) = progress {
            update = update.with_progress(progress);
        }
        if let Err(e) = self.store.update_task(task.id, &update) {
            error!("Failed to update task {}: {}", task.id, e);
            return Ok(WebserviceStatus::E_UPDATE_FAILED.into());
        }

        info!(
            "Task {} is now {} ({}%)",
            task.id,
            to,
            progress.map_or_else(|| "-".to_string(), |p| p.to_string())
        );
        Ok(WebserviceStatus::OK.into())
    }
}
