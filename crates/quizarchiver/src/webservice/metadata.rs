//! `get_attempts_metadata`: user and timing details of selected attempts.

use log::debug;
use serde::{Deserialize, Serialize};

use crate::attempts::{AttemptEnumerator, AttemptMetadata};
use crate::error::WebserviceError;
use crate::webservice::{
    found, require_positive, require_uuid, Access, ArchiverWebservice, WebserviceStatus,
};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GetAttemptsMetadataParams {
    pub uuid: String,
    pub taskid: i64,
    pub attemptids: Vec<i64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GetAttemptsMetadataResponse {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attempts: Option<Vec<AttemptMetadata>>,
    pub status: WebserviceStatus,
}

impl From<WebserviceStatus> for GetAttemptsMetadataResponse {
    fn from(status: WebserviceStatus) -> Self {
        Self {
            attempts: None,
            status,
        }
    }
}

impl ArchiverWebservice {
    pub fn get_attempts_metadata(
        &self,
        wstoken: &str,
        params: GetAttemptsMetadataParams,
    ) -> Result<GetAttemptsMetadataResponse, WebserviceError> {
        let _span = tracing::info_span!("get_attempts_metadata", task_id = params.taskid).entered();
        require_uuid(&params.uuid)?;
        require_positive("taskid", params.taskid)?;
        if params.attemptids.is_empty() {
            return Err(WebserviceError::invalid("attemptids", "must not be empty"));
        }
        for id in &params.attemptids {
            require_positive("attemptids", *id)?;
        }

        let task = match self.authorize(params.taskid, wstoken)? {
            Access::Granted(task) => task,
            Access::Denied(status) => return Ok(status.into()),
        };

        if found(self.repo.course_module(task.cm_id))?.is_none() {
            return Ok(WebserviceStatus::E_CM_NOT_FOUND.into());
        }

        let attempts = AttemptEnumerator::new(self.repo.as_ref())
            .list_attempts_metadata(task.cm_id, Some(&params.attemptids))?;

        debug!(
            "Task {}: returning metadata of {} of {} requested attempts",
            task.id,
            attempts.len(),
            params.attemptids.len()
        );
        Ok(GetAttemptsMetadataResponse {
            attempts: Some(attempts),
            status: WebserviceStatus::OK,
        })
    }
}
