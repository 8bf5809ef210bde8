//! Interfaces to the host platform. The archiver only ever reads quiz data and
//! files through these traits; persistence and rendering of individual
//! questions stay with the host.

use crate::error::{RepositoryError, StorageError};
use crate::model::{
    Attempt, Course, CourseModule, FileRef, Group, QuestionSlot, Quiz, QuizUser, StoredFile,
};
use crate::report::DisplayOptions;

pub trait QuizRepository: Send + Sync {
    fn course(&self, course_id: i64) -> Result<Course, RepositoryError>;

    fn course_module(&self, cm_id: i64) -> Result<CourseModule, RepositoryError>;

    fn quiz(&self, quiz_id: i64) -> Result<Quiz, RepositoryError>;

    /// All attempts of a quiz, including previews.
    fn attempts(&self, quiz_id: i64) -> Result<Vec<Attempt>, RepositoryError>;

    fn attempt(&self, attempt_id: i64) -> Result<Attempt, RepositoryError>;

    fn user(&self, user_id: i64) -> Result<QuizUser, RepositoryError>;

    fn user_groups(&self, course_id: i64, user_id: i64) -> Result<Vec<Group>, RepositoryError>;

    /// Question slots of an attempt in attempt order.
    fn attempt_slots(&self, attempt_id: i64) -> Result<Vec<QuestionSlot>, RepositoryError>;

    /// Files attached to the latest response in a slot, in insertion order.
    fn slot_attachments(&self, attempt_id: i64, slot: u32)
        -> Result<Vec<StoredFile>, RepositoryError>;
}

/// Page boilerplate and per-question HTML produced by the host's theme.
pub trait PageRenderer: Send + Sync {
    fn page_header(&self, body_class: &str) -> String;

    fn page_footer(&self) -> String;

    fn render_question(
        &self,
        attempt: &Attempt,
        slot: &QuestionSlot,
        options: &DisplayOptions,
    ) -> Result<String, RepositoryError>;
}

pub trait FileStore: Send + Sync {
    fn get_file(&self, reference: &FileRef) -> Result<Option<StoredFile>, StorageError>;

    fn read(&self, file: &StoredFile) -> Result<Vec<u8>, StorageError>;

    fn delete(&self, file: &StoredFile) -> Result<(), StorageError>;

    /// Moves `draft` into the permanent artifact area of `task_id`.
    fn store_artifact(&self, draft: &StoredFile, task_id: i64) -> Result<StoredFile, StorageError>;
}
