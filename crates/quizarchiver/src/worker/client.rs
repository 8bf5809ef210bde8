//! HTTP client for the archive worker service.
//!
//! The worker address comes from the site configuration, so requests go
//! straight to it without any outbound URL filtering.

use std::time::Duration;

use log::{debug, info, warn};
use reqwest::{Client, StatusCode};
use serde_json::Value;

use crate::config::ArchiverConfig;
use crate::error::WorkerError;
use crate::sanitize::redact_token;
use crate::task::{JobSettings, TaskStatus};
use crate::worker::payload::JobPayload;
use crate::worker::status::{EnqueuedJob, WorkerStatus, WorkerStatusReport};

/// Name of this archiving driver in the worker's job routes.
pub const DRIVER_NAME: &str = "archivingmod_quiz";

/// Maximum length of response bodies quoted in errors.
const MAX_ERROR_BODY_LENGTH: usize = 200;

fn truncate_body(body: &str) -> String {
    if body.chars().count() > MAX_ERROR_BODY_LENGTH {
        let head: String = body.chars().take(MAX_ERROR_BODY_LENGTH).collect();
        format!("{}... (truncated)", head)
    } else {
        body.to_string()
    }
}

/// Prefers the `error` field of a JSON error body.
fn error_message(body: &str) -> String {
    serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|v| v.get("error").and_then(Value::as_str).map(str::to_string))
        .unwrap_or_else(|| truncate_body(body))
}

fn map_send_error(e: reqwest::Error) -> WorkerError {
    if e.is_connect() || e.is_timeout() {
        WorkerError::Unreachable(e.to_string())
    } else {
        WorkerError::Request(e.to_string())
    }
}

pub struct RemoteArchiveWorker {
    client: Client,
    server_url: String,
    callback_base: String,
}

impl RemoteArchiveWorker {
    pub fn new(
        server_url: &str,
        callback_base: &str,
        connect_timeout: Duration,
        request_timeout: Duration,
    ) -> Result<Self, WorkerError> {
        let client = Client::builder()
            .connect_timeout(connect_timeout)
            .timeout(request_timeout)
            .build()
            .map_err(|e| WorkerError::ClientBuild(e.to_string()))?;

        Ok(Self {
            client,
            server_url: server_url.trim_end_matches('/').to_string(),
            callback_base: callback_base.trim_end_matches('/').to_string(),
        })
    }

    pub fn from_config(config: &ArchiverConfig) -> Result<Self, WorkerError> {
        let server_url = config
            .worker_url
            .as_deref()
            .filter(|u| !u.trim().is_empty())
            .ok_or_else(|| WorkerError::Precondition("No worker URL configured".to_string()))?;

        Self::new(
            server_url,
            config.worker_callback_base(),
            config.connect_timeout(),
            config.request_timeout(),
        )
    }

    pub fn server_url(&self) -> &str {
        &self.server_url
    }

    pub fn callback_base(&self) -> &str {
        &self.callback_base
    }

    /// Current load and queue length of the worker.
    pub async fn get_status(&self) -> Result<WorkerStatusReport, WorkerError> {
        let url = format!("{}/status", self.server_url);
        debug!("Querying worker status at {}", url);

        let response = self.client.get(&url).send().await.map_err(map_send_error)?;
        let status = response.status();
        let body = response.text().await.map_err(map_send_error)?;

        if status != StatusCode::OK {
            return Err(WorkerError::Http {
                status: status.as_u16(),
                message: error_message(&body),
            });
        }

        let data: Value = serde_json::from_str(&body).map_err(|e| {
            WorkerError::Protocol(format!("Invalid status response: {}", e))
        })?;

        let worker_status = data
            .get("status")
            .and_then(Value::as_str)
            .map(WorkerStatus::parse)
            .ok_or_else(|| missing_field("status"))?;
        let queue_len = data
            .get("queue_len")
            .and_then(Value::as_u64)
            .ok_or_else(|| missing_field("queue_len"))?;

        Ok(WorkerStatusReport {
            status: worker_status,
            queue_len,
        })
    }

    /// Hands a set of attempts to the worker.
    ///
    /// Fails with [`WorkerError::Precondition`] before any request is made
    /// when `attempt_ids` is empty.
    pub async fn enqueue_archive_job(
        &self,
        wstoken: &str,
        task_id: i64,
        settings: &JobSettings,
        attempt_ids: &[i64],
    ) -> Result<EnqueuedJob, WorkerError> {
        let payload = JobPayload::build(wstoken, task_id, &self.callback_base, settings, attempt_ids)?;
        let url = format!("{}/archive/{}", self.server_url, DRIVER_NAME);

        info!(
            "Enqueuing {} attempts of task {} at {} (token {})",
            attempt_ids.len(),
            task_id,
            url,
            redact_token(wstoken)
        );

        let response = self
            .client
            .post(&url)
            .json(&payload)
            .send()
            .await
            .map_err(map_send_error)?;
        let status = response.status();
        let body = response.text().await.map_err(map_send_error)?;

        if status != StatusCode::OK {
            warn!("Worker rejected job of task {} with HTTP {}", task_id, status);
            return Err(WorkerError::Http {
                status: status.as_u16(),
                message: error_message(&body),
            });
        }

        let data: Value = serde_json::from_str(&body)
            .map_err(|e| WorkerError::Protocol(format!("Invalid enqueue response: {}", e)))?;

        let job_id = match data.get("jobid") {
            Some(Value::String(id)) if !id.is_empty() => id.clone(),
            Some(Value::Number(id)) => id.to_string(),
            _ => return Err(missing_field("jobid")),
        };
        let code = data
            .get("status")
            .and_then(|v| match v {
                Value::Number(n) => n.as_i64(),
                Value::String(s) => s.trim().parse::<i64>().ok(),
                _ => None,
            })
            .ok_or_else(|| missing_field("status"))?;
        let job_status = TaskStatus::from_code(code).ok_or_else(|| {
            WorkerError::Protocol(format!("Unknown job status code {}", code))
        })?;

        info!("Worker accepted task {} as job {} ({})", task_id, job_id, job_status);
        Ok(EnqueuedJob {
            job_id,
            status: job_status,
        })
    }
}

fn missing_field(name: &str) -> WorkerError {
    WorkerError::Protocol(format!("Worker response is missing '{}'", name))
}
