//! `process_uploaded_artifact`: verifies the uploaded archive and takes it over.

use log::{error, info, warn};
use serde::{Deserialize, Serialize};

use crate::error::WebserviceError;
use crate::model::{FileRef, StoredFile};
use crate::storage::hash_file;
use crate::task::{transition, Task, TaskArtifact, TaskEvent, TaskUpdate};
use crate::webservice::{require_positive, require_uuid, Access, ArchiverWebservice, WebserviceStatus};

/// Uploads always land in the uploading user's draft area.
const DRAFT_COMPONENT: &str = "user";
const DRAFT_FILEAREA: &str = "draft";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessUploadedArtifactParams {
    pub uuid: String,
    pub taskid: i64,
    pub artifact_component: String,
    pub artifact_contextid: i64,
    pub artifact_userid: i64,
    pub artifact_filearea: String,
    pub artifact_filename: String,
    pub artifact_filepath: String,
    pub artifact_itemid: i64,
    pub artifact_sha256sum: String,
}

impl ProcessUploadedArtifactParams {
    fn draft_reference(&self) -> FileRef {
        FileRef::new(
            self.artifact_contextid,
            DRAFT_COMPONENT,
            DRAFT_FILEAREA,
            self.artifact_itemid,
            self.artifact_filepath.clone(),
            self.artifact_filename.clone(),
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessUploadedArtifactResponse {
    pub status: WebserviceStatus,
}

impl From<WebserviceStatus> for ProcessUploadedArtifactResponse {
    fn from(status: WebserviceStatus) -> Self {
        Self { status }
    }
}

impl ArchiverWebservice {
    pub fn process_uploaded_artifact(
        &self,
        wstoken: &str,
        params: ProcessUploadedArtifactParams,
    ) -> Result<ProcessUploadedArtifactResponse, WebserviceError> {
        let _span =
            tracing::info_span!("process_uploaded_artifact", task_id = params.taskid).entered();
        require_uuid(&params.uuid)?;
        require_positive("taskid", params.taskid)?;
        if params.artifact_filename.trim().is_empty() {
            return Err(WebserviceError::invalid("artifact_filename", "must not be empty"));
        }

        let task = match self.authorize(params.taskid, wstoken)? {
            Access::Granted(task) => task,
            Access::Denied(status) => return Ok(status.into()),
        };

        if task.is_completed() {
            warn!("Task {} is already {}, no upload expected", task.id, task.status);
            return Ok(WebserviceStatus::E_NO_UPLOAD_EXPECTED.into());
        }

        if params.artifact_component != DRAFT_COMPONENT || params.artifact_filearea != DRAFT_FILEAREA
        {
            warn!(
                "Task {}: artifact declared in {}/{}, looking in the draft area",
                task.id, params.artifact_component, params.artifact_filearea
            );
        }

        let draft = match self.files.get_file(&params.draft_reference()) {
            Ok(Some(draft)) => draft,
            Ok(None) => {
                warn!("Task {}: uploaded artifact {} not found", task.id, params.artifact_filename);
                self.reject(&task)?;
                return Ok(WebserviceStatus::E_FILE_NOT_FOUND.into());
            }
            Err(e) => {
                warn!("Task {}: cannot locate uploaded artifact: {}", task.id, e);
                self.reject(&task)?;
                return Ok(WebserviceStatus::E_FILE_NOT_FOUND.into());
            }
        };

        let actual = match hash_file(self.files.as_ref(), &draft) {
            Ok(actual) => actual,
            Err(e) => {
                error!("Task {}: reading uploaded artifact failed: {}", task.id, e);
                self.discard(&draft);
                self.reject(&task)?;
                return Ok(WebserviceStatus::E_FILE_NOT_FOUND.into());
            }
        };
        if !actual.eq_ignore_ascii_case(params.artifact_sha256sum.trim()) {
            warn!(
                "Task {}: checksum mismatch, expected {} but got {}",
                task.id, params.artifact_sha256sum, actual
            );
            self.discard(&draft);
            self.reject(&task)?;
            return Ok(WebserviceStatus::E_CHECKSUM_MISMATCH.into());
        }

        let stored = match self.files.store_artifact(&draft, task.id) {
            Ok(stored) => stored,
            Err(e) => {
                error!("Task {}: storing artifact failed: {}", task.id, e);
                self.discard(&draft);
                self.reject(&task)?;
                return Ok(WebserviceStatus::E_STORING_FAILED.into());
            }
        };

        let to = transition(task.id, task.status, TaskEvent::ArtifactStored)?;
        let update = TaskUpdate::status(to).with_artifact(TaskArtifact {
            file: stored.reference.clone(),
            sha256: actual,
        });
        if let Err(e) = self.store.update_task(task.id, &update) {
            error!("Task {}: recording artifact failed: {}", task.id, e);
            self.discard(&stored);
            self.reject(&task)?;
            return Ok(WebserviceStatus::E_STORING_FAILED.into());
        }

        info!(
            "Task {}: stored artifact {} ({} bytes)",
            task.id, stored.reference.filename, stored.filesize
        );
        Ok(WebserviceStatus::OK.into())
    }

    fn reject(&self, task: &Task) -> Result<(), WebserviceError> {
        let to = transition(task.id, task.status, TaskEvent::ArtifactRejected)?;
        self.store.update_task(task.id, &TaskUpdate::status(to))?;
        Ok(())
    }

    fn discard(&self, file: &StoredFile) {
        if let Err(e) = self.files.delete(file) {
            warn!("Failed to delete {}: {}", file.reference.filename, e);
        }
    }
}
