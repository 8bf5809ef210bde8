//! Test harness for isolated test execution.
//!
//! The `TestHarness` struct provides an isolated environment with:
//! - A temporary directory holding the file store and the data root
//! - An in-memory SQLite database with one job of default settings
//! - Helpers to create tasks, mint tokens and place uploaded drafts

#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::Utc;
use tempfile::TempDir;

use quizarchiver::db::{job_repo, task_repo};
use quizarchiver::model::{FileRef, StoredFile};
use quizarchiver::task::TaskUpdate;
use quizarchiver::{
    ArchiverConfig, ArchiverWebservice, Database, FileSystemStore, JobSettings, PageRenderer,
    QuizRepository, Task, TaskStatus, TaskStore,
};

use super::builders::{CM_ID, CONTEXT_ID};

pub const SITE_URL: &str = "https://moodle.example";
pub const UPLOADER_ID: i64 = 2;

/// Test harness providing isolated execution environment for integration tests.
pub struct TestHarness {
    temp_dir: TempDir,
    /// Root of the file store.
    pub files_dir: PathBuf,
    /// Data root for plot files.
    pub dataroot: PathBuf,
    pub db: Database,
    pub files: Arc<FileSystemStore>,
    pub job_id: i64,
}

impl TestHarness {
    pub fn new() -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let files_dir = temp_dir.path().join("files");
        let dataroot = temp_dir.path().join("moodledata");
        std::fs::create_dir_all(&files_dir).expect("Failed to create files dir");
        std::fs::create_dir_all(&dataroot).expect("Failed to create dataroot");

        let db = Database::open_in_memory().expect("Failed to open database");
        let job_id = job_repo::insert(&db, CONTEXT_ID, UPLOADER_ID, &JobSettings::default_map(), 0)
            .expect("Failed to insert job");

        Self {
            files: Arc::new(FileSystemStore::new(&files_dir)),
            temp_dir,
            files_dir,
            dataroot,
            db,
            job_id,
        }
    }

    pub fn temp_path(&self) -> &Path {
        self.temp_dir.path()
    }

    /// Configuration that is ready once a worker URL is given.
    pub fn config(&self, worker_url: Option<&str>) -> ArchiverConfig {
        let mut config = ArchiverConfig::new(SITE_URL);
        config.worker_url = worker_url.map(str::to_string);
        config.webservices_enabled = true;
        config.webservice_protocols = vec!["rest".to_string()];
        config.dataroot = self.dataroot.clone();
        config
    }

    pub fn store(&self) -> Arc<dyn TaskStore> {
        Arc::new(self.db.clone())
    }

    /// Creates a task of the default job, moved to `status`.
    pub fn create_task(&self, status: TaskStatus) -> i64 {
        let task_id = task_repo::insert(
            &self.db,
            &task_repo::NewTask {
                job_id: self.job_id,
                context_id: CONTEXT_ID,
                cm_id: CM_ID,
                user_id: UPLOADER_ID,
            },
            Utc::now().timestamp(),
        )
        .expect("Failed to insert task");

        if status != TaskStatus::Uninitialized {
            self.db
                .update_task(task_id, &TaskUpdate::status(status))
                .expect("Failed to set task status");
        }
        task_id
    }

    pub fn task(&self, task_id: i64) -> Task {
        self.db.get_task(task_id).expect("Task not found")
    }

    /// Mints a token valid for one hour.
    pub fn issue_token(&self, task_id: i64) -> String {
        self.db
            .create_token(task_id, Utc::now().timestamp() + 3600)
            .expect("Failed to create token")
            .token
    }

    /// Mints a token that expired a minute ago.
    pub fn issue_expired_token(&self, task_id: i64) -> String {
        self.db
            .create_token(task_id, Utc::now().timestamp() - 60)
            .expect("Failed to create token")
            .token
    }

    pub fn draft_ref(item_id: i64, filename: &str) -> FileRef {
        FileRef::new(CONTEXT_ID, "user", "draft", item_id, "/", filename)
    }

    /// Places a file as if the worker had uploaded it.
    pub fn put_draft(&self, item_id: i64, filename: &str, content: &[u8]) -> StoredFile {
        self.files
            .put(&Self::draft_ref(item_id, filename), content)
            .expect("Failed to write draft")
    }

    pub fn put_file(&self, reference: &FileRef, content: &[u8]) -> StoredFile {
        self.files.put(reference, content).expect("Failed to write file")
    }

    pub fn webservice<R, P>(&self, repo: R, renderer: P) -> ArchiverWebservice
    where
        R: QuizRepository + 'static,
        P: PageRenderer + 'static,
    {
        ArchiverWebservice::new(
            self.config(Some("http://worker.invalid")),
            Arc::new(repo),
            self.store(),
            self.files.clone(),
            Arc::new(renderer),
        )
    }
}
