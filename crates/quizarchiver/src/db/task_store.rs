//! `TaskStore` backed by the SQLite database.

use std::collections::BTreeMap;

use chrono::Utc;
use serde_json::Value;

use super::{job_repo, task_repo, token_repo, Database};
use crate::error::TaskError;
use crate::task::{Task, TaskStore, TaskUpdate, WebserviceToken};

impl TaskStore for Database {
    fn get_task(&self, task_id: i64) -> Result<Task, TaskError> {
        task_repo::find_by_id(self, task_id)?.ok_or(TaskError::NotFound(task_id))
    }

    fn job_settings(&self, job_id: i64) -> Result<BTreeMap<String, Value>, TaskError> {
        job_repo::find_by_id(self, job_id)?
            .map(|job| job.settings)
            .ok_or(TaskError::JobNotFound(job_id))
    }

    fn update_task(&self, task_id: i64, update: &TaskUpdate) -> Result<(), TaskError> {
        if update.is_empty() {
            return Ok(());
        }
        if !task_repo::apply_update(self, task_id, update, Utc::now().timestamp())? {
            return Err(TaskError::NotFound(task_id));
        }
        Ok(())
    }

    fn create_token(&self, task_id: i64, expires_at: i64) -> Result<WebserviceToken, TaskError> {
        Ok(token_repo::create(
            self,
            task_id,
            expires_at,
            Utc::now().timestamp(),
        )?)
    }

    fn current_token(&self, task_id: i64) -> Result<Option<WebserviceToken>, TaskError> {
        Ok(token_repo::find_latest(self, task_id)?)
    }
}
