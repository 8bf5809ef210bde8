use std::collections::BTreeMap;

use serde_json::Value;

use crate::error::TaskError;
use crate::task::{Task, TaskUpdate, WebserviceToken};

/// Persistence of tasks, their job settings and webservice tokens.
///
/// Implementations must apply a [`TaskUpdate`] atomically.
pub trait TaskStore: Send + Sync {
    fn get_task(&self, task_id: i64) -> Result<Task, TaskError>;

    fn job_settings(&self, job_id: i64) -> Result<BTreeMap<String, Value>, TaskError>;

    fn update_task(&self, task_id: i64, update: &TaskUpdate) -> Result<(), TaskError>;

    /// Issues a fresh token for `task_id`, superseding earlier ones.
    fn create_token(&self, task_id: i64, expires_at: i64) -> Result<WebserviceToken, TaskError>;

    /// Most recently issued token of the task, expired or not.
    fn current_token(&self, task_id: i64) -> Result<Option<WebserviceToken>, TaskError>;
}
