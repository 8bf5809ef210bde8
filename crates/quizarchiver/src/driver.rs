//! Drives archiving tasks of quizzes.
//!
//! The surrounding scheduler calls [`QuizArchivingDriver::execute_task`]
//! repeatedly. Every call performs the work of at most one state, persists
//! the result and returns. States the worker advances through the
//! webservice are no-ops here.

use std::sync::Arc;

use chrono::Utc;
use log::{debug, info, warn};
use tracing::Instrument;

use crate::attempts::AttemptEnumerator;
use crate::config::ArchiverConfig;
use crate::error::{ArchiverError, RepositoryError, WorkerError};
use crate::fingerprint;
use crate::host::QuizRepository;
use crate::task::model::{
    META_ENQUEUE_ERROR, META_NUM_ATTACHMENTS, META_NUM_ATTEMPTS, META_WORKER_JOB_ID,
    META_WORKER_STATUS,
};
use crate::task::{transition, JobSettings, Task, TaskEvent, TaskStatus, TaskStore, TaskUpdate};
use crate::worker::RemoteArchiveWorker;

/// Result of one driver invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepOutcome {
    /// The task moved to a new state and yields until the next invocation.
    Advanced { from: TaskStatus, to: TaskStatus },
    /// The work of the current state could not be done now; the status is unchanged.
    Deferred { status: TaskStatus, reason: String },
    /// Nothing to do locally in this state.
    Idle(TaskStatus),
}

pub struct QuizArchivingDriver {
    config: ArchiverConfig,
    repo: Arc<dyn QuizRepository>,
    store: Arc<dyn TaskStore>,
    worker: Option<RemoteArchiveWorker>,
}

impl QuizArchivingDriver {
    /// Builds the worker client from `config` when a worker URL is set.
    pub fn new(
        config: ArchiverConfig,
        repo: Arc<dyn QuizRepository>,
        store: Arc<dyn TaskStore>,
    ) -> Result<Self, ArchiverError> {
        let worker = match config.worker_url.as_deref() {
            Some(url) if !url.trim().is_empty() => Some(RemoteArchiveWorker::from_config(&config)?),
            _ => None,
        };
        Ok(Self {
            config,
            repo,
            store,
            worker,
        })
    }

    pub fn with_worker(
        config: ArchiverConfig,
        repo: Arc<dyn QuizRepository>,
        store: Arc<dyn TaskStore>,
        worker: RemoteArchiveWorker,
    ) -> Self {
        Self {
            config,
            repo,
            store,
            worker: Some(worker),
        }
    }

    pub fn is_ready(&self) -> bool {
        self.config.is_ready()
    }

    /// A quiz can be archived once it has questions and at least one real attempt.
    pub fn can_be_archived(&self, cm_id: i64) -> Result<bool, RepositoryError> {
        let cm = self.repo.course_module(cm_id)?;
        let quiz = self.repo.quiz(cm.quiz_id)?;
        if quiz.slot_count == 0 {
            return Ok(false);
        }
        Ok(!AttemptEnumerator::new(self.repo.as_ref())
            .list_attempts(cm_id)?
            .is_empty())
    }

    pub fn fingerprint(&self, cm_id: i64) -> Result<String, RepositoryError> {
        fingerprint::fingerprint(self.repo.as_ref(), cm_id)
    }

    /// Runs the work of the task's current state.
    pub async fn execute_task(&self, task_id: i64) -> Result<StepOutcome, ArchiverError> {
        let task = self.store.get_task(task_id)?;
        let span = tracing::info_span!("execute_task", task_id, status = %task.status);

        async move {
            match task.status {
                TaskStatus::Uninitialized => {
                    let to = transition(task.id, task.status, TaskEvent::Initialized)?;
                    self.store.update_task(task.id, &TaskUpdate::status(to))?;
                    info!("Task {} initialized", task.id);
                    Ok(StepOutcome::Advanced {
                        from: task.status,
                        to,
                    })
                }
                TaskStatus::Created => self.enqueue(&task).await,
                status => {
                    debug!("Task {} is {}, nothing to do", task.id, status);
                    Ok(StepOutcome::Idle(status))
                }
            }
        }
        .instrument(span)
        .await
    }

    async fn enqueue(&self, task: &Task) -> Result<StepOutcome, ArchiverError> {
        let worker = match &self.worker {
            Some(worker) if self.is_ready() => worker,
            _ => {
                warn!("Archiver is not ready, task {} stays {}", task.id, task.status);
                return Ok(StepOutcome::Deferred {
                    status: task.status,
                    reason: "archiver is not ready".to_string(),
                });
            }
        };

        let enumerator = AttemptEnumerator::new(self.repo.as_ref());
        let attempts = enumerator.list_attempts(task.cm_id)?;
        let mut num_attachments = 0;
        for attempt in &attempts {
            num_attachments += enumerator.list_attachments(attempt.attempt_id)?.len();
        }
        let attempt_ids: Vec<i64> = attempts.iter().map(|a| a.attempt_id).collect();

        let counts = TaskUpdate::default()
            .with_metadata(META_NUM_ATTEMPTS, attempts.len())
            .with_metadata(META_NUM_ATTACHMENTS, num_attachments);

        let settings = match JobSettings::from_map(&self.store.job_settings(task.job_id)?) {
            Ok(settings) => settings,
            Err(e) => return self.fail(task, counts, e),
        };

        let expires_at = Utc::now().timestamp() + self.config.token_lifetime_secs;
        let token = self.store.create_token(task.id, expires_at)?;

        match worker
            .enqueue_archive_job(&token.token, task.id, &settings, &attempt_ids)
            .await
        {
            Ok(job) => {
                let to = transition(task.id, task.status, TaskEvent::JobEnqueued)?;
                let update = TaskUpdate {
                    status: Some(to),
                    ..counts
                }
                .with_metadata(META_WORKER_JOB_ID, job.job_id.clone())
                .with_metadata(META_WORKER_STATUS, job.status.code());
                self.store.update_task(task.id, &update)?;

                info!(
                    "Task {} handed to worker as job {} ({} attempts, {} attachments)",
                    task.id,
                    job.job_id,
                    attempts.len(),
                    num_attachments
                );
                Ok(StepOutcome::Advanced {
                    from: task.status,
                    to,
                })
            }
            Err(e) if e.is_transient() => {
                warn!("Worker unreachable for task {}, will retry: {}", task.id, e);
                Ok(StepOutcome::Deferred {
                    status: task.status,
                    reason: e.to_string(),
                })
            }
            Err(e) => self.fail(task, counts, e),
        }
    }

    fn fail(
        &self,
        task: &Task,
        counts: TaskUpdate,
        error: WorkerError,
    ) -> Result<StepOutcome, ArchiverError> {
        let to = transition(task.id, task.status, TaskEvent::EnqueueFailed)?;
        let update = TaskUpdate {
            status: Some(to),
            ..counts
        }
        .with_metadata(META_ENQUEUE_ERROR, error.to_string());
        self.store.update_task(task.id, &update)?;

        log::error!("Enqueuing task {} failed: {}", task.id, error);
        Ok(StepOutcome::Advanced {
            from: task.status,
            to,
        })
    }

    /// Moves a task that is still in progress to `TIMEOUT`.
    ///
    /// Deadlines are decided by the caller. Returns `false` for tasks that
    /// already reached a terminal state.
    pub fn force_timeout(&self, task_id: i64) -> Result<bool, ArchiverError> {
        let task = self.store.get_task(task_id)?;
        if task.status.is_terminal() {
            debug!("Task {} is already {}, not timing out", task.id, task.status);
            return Ok(false);
        }

        let to = transition(task.id, task.status, TaskEvent::DeadlineExceeded)?;
        self.store.update_task(task.id, &TaskUpdate::status(to))?;
        warn!("Task {} timed out in state {}", task.id, task.status);
        Ok(true)
    }
}
