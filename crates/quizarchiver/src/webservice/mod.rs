//! Inbound webservice functions the archive worker calls back into.
//!
//! Every function validates its parameters first (hard
//! [`WebserviceError::InvalidParameter`]), then looks up the task and checks
//! the presented token. Everything past that point is reported as a
//! [`WebserviceStatus`] in the response body.

pub mod artifact;
pub mod metadata;
pub mod report;
pub mod status;
pub mod task_status;

use std::sync::Arc;

use chrono::Utc;
use log::warn;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use uuid::Uuid;

use crate::config::ArchiverConfig;
use crate::error::{RepositoryError, TaskError, WebserviceError};
use crate::host::{FileStore, PageRenderer, QuizRepository};
use crate::sanitize::redact_token;
use crate::task::{Task, TaskStore};

pub use artifact::{ProcessUploadedArtifactParams, ProcessUploadedArtifactResponse};
pub use metadata::{GetAttemptsMetadataParams, GetAttemptsMetadataResponse};
pub use report::{AttachmentInfo, GenerateAttemptReportParams, GenerateAttemptReportResponse};
pub use status::WebserviceStatus;
pub use task_status::{UpdateTaskStatusParams, UpdateTaskStatusResponse};

pub const FN_GENERATE_ATTEMPT_REPORT: &str = "archivingmod_quiz_generate_attempt_report";
pub const FN_GET_ATTEMPTS_METADATA: &str = "archivingmod_quiz_get_attempts_metadata";
pub const FN_UPDATE_TASK_STATUS: &str = "archivingmod_quiz_update_task_status";
pub const FN_PROCESS_UPLOADED_ARTIFACT: &str = "archivingmod_quiz_process_uploaded_artifact";

/// Result of the task and token check shared by all functions.
pub(crate) enum Access {
    Granted(Task),
    Denied(WebserviceStatus),
}

pub struct ArchiverWebservice {
    config: ArchiverConfig,
    repo: Arc<dyn QuizRepository>,
    store: Arc<dyn TaskStore>,
    files: Arc<dyn FileStore>,
    renderer: Arc<dyn PageRenderer>,
}

impl ArchiverWebservice {
    pub fn new(
        config: ArchiverConfig,
        repo: Arc<dyn QuizRepository>,
        store: Arc<dyn TaskStore>,
        files: Arc<dyn FileStore>,
        renderer: Arc<dyn PageRenderer>,
    ) -> Self {
        Self {
            config,
            repo,
            store,
            files,
            renderer,
        }
    }

    pub fn config(&self) -> &ArchiverConfig {
        &self.config
    }

    /// Dispatches a call by its wsfunction name. `params` is the JSON object
    /// of named parameters; the response is the function's JSON result.
    pub async fn call(
        &self,
        function: &str,
        wstoken: &str,
        params: Value,
    ) -> Result<Value, WebserviceError> {
        match function {
            FN_GENERATE_ATTEMPT_REPORT => {
                let params: GenerateAttemptReportParams = decode(params)?;
                encode(self.generate_attempt_report(wstoken, params).await?)
            }
            FN_GET_ATTEMPTS_METADATA => {
                let params: GetAttemptsMetadataParams = decode(params)?;
                encode(self.get_attempts_metadata(wstoken, params)?)
            }
            FN_UPDATE_TASK_STATUS => {
                let params: UpdateTaskStatusParams = decode(params)?;
                encode(self.update_task_status(wstoken, params)?)
            }
            FN_PROCESS_UPLOADED_ARTIFACT => {
                let params: ProcessUploadedArtifactParams = decode(params)?;
                encode(self.process_uploaded_artifact(wstoken, params)?)
            }
            other => Err(WebserviceError::UnknownFunction(other.to_string())),
        }
    }

    /// Finds the task and checks that `wstoken` is its current, unexpired token.
    pub(crate) fn authorize(&self, task_id: i64, wstoken: &str) -> Result<Access, WebserviceError> {
        let task = match self.store.get_task(task_id) {
            Ok(task) => task,
            Err(TaskError::NotFound(_)) => {
                warn!("Webservice call for unknown task {}", task_id);
                return Ok(Access::Denied(WebserviceStatus::E_TASK_NOT_FOUND));
            }
            Err(e) => return Err(e.into()),
        };

        let now = Utc::now().timestamp();
        let granted = self
            .store
            .current_token(task.id)?
            .is_some_and(|token| token.matches(wstoken) && token.is_valid_at(now));
        if !granted {
            warn!(
                "Rejected webservice call for task {} with token {}",
                task.id,
                redact_token(wstoken)
            );
            return Ok(Access::Denied(WebserviceStatus::E_ACCESS_DENIED));
        }

        Ok(Access::Granted(task))
    }
}

fn decode<P: DeserializeOwned>(params: Value) -> Result<P, WebserviceError> {
    serde_json::from_value(params).map_err(|e| WebserviceError::invalid("params", e.to_string()))
}

fn encode<R: Serialize>(response: R) -> Result<Value, WebserviceError> {
    Ok(serde_json::to_value(response)?)
}

/// Turns a not-found lookup into `None` so it can become a soft status.
pub(crate) fn found<T>(result: Result<T, RepositoryError>) -> Result<Option<T>, RepositoryError> {
    match result {
        Ok(value) => Ok(Some(value)),
        Err(e) if e.is_not_found() => {
            warn!("{}", e);
            Ok(None)
        }
        Err(e) => Err(e),
    }
}

pub(crate) fn require_uuid(raw: &str) -> Result<Uuid, WebserviceError> {
    Uuid::parse_str(raw.trim()).map_err(|e| WebserviceError::invalid("uuid", e.to_string()))
}

pub(crate) fn require_positive(name: &str, value: i64) -> Result<i64, WebserviceError> {
    if value > 0 {
        Ok(value)
    } else {
        Err(WebserviceError::invalid(name, format!("must be positive, got {}", value)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_require_uuid() {
        assert!(require_uuid("67e55044-10b1-426f-9247-bb680e5fe0c8").is_ok());
        assert!(matches!(
            require_uuid("not-a-uuid"),
            Err(WebserviceError::InvalidParameter { ref name, .. }) if name == "uuid"
        ));
    }

    #[test]
    fn test_found_only_swallows_not_found() {
        assert_eq!(found(Ok(3)).unwrap(), Some(3));
        assert_eq!(found::<i64>(Err(RepositoryError::not_found("Quiz", 4))).unwrap(), None);
        assert!(found::<i64>(Err(RepositoryError::Backend("down".to_string()))).is_err());
    }

    #[test]
    fn test_require_positive() {
        assert_eq!(require_positive("taskid", 3).unwrap(), 3);
        assert!(require_positive("taskid", 0).is_err());
        assert!(require_positive("taskid", -1).is_err());
    }
}
