//! Enumerates the attempts of a quiz and the files attached to them.

use serde::{Deserialize, Serialize};

use crate::error::RepositoryError;
use crate::host::QuizRepository;
use crate::model::{Attempt, StoredFile};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttemptRef {
    pub attempt_id: i64,
    pub user_id: i64,
}

/// Attempt with the identity of its user, as handed to the worker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttemptMetadata {
    pub attemptid: i64,
    pub userid: i64,
    pub attempt: i64,
    pub state: String,
    pub timestart: i64,
    pub timefinish: i64,
    pub username: String,
    pub firstname: String,
    pub lastname: String,
    pub idnumber: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttemptAttachment {
    pub slot: u32,
    pub file: StoredFile,
}

pub struct AttemptEnumerator<'a> {
    repo: &'a dyn QuizRepository,
}

impl<'a> AttemptEnumerator<'a> {
    pub fn new(repo: &'a dyn QuizRepository) -> Self {
        Self { repo }
    }

    /// Non-preview attempts of the quiz behind `cm_id`, sorted by attempt id.
    pub fn attempts(&self, cm_id: i64) -> Result<Vec<Attempt>, RepositoryError> {
        let cm = self.repo.course_module(cm_id)?;
        let mut attempts: Vec<Attempt> = self
            .repo
            .attempts(cm.quiz_id)?
            .into_iter()
            .filter(|a| !a.preview)
            .collect();
        attempts.sort_by_key(|a| a.id);
        Ok(attempts)
    }

    pub fn list_attempts(&self, cm_id: i64) -> Result<Vec<AttemptRef>, RepositoryError> {
        Ok(self
            .attempts(cm_id)?
            .iter()
            .map(|a| AttemptRef {
                attempt_id: a.id,
                user_id: a.user_id,
            })
            .collect())
    }

    /// Like [`Self::list_attempts`] with user details. `filter` only narrows
    /// the result; unknown ids are ignored.
    pub fn list_attempts_metadata(
        &self,
        cm_id: i64,
        filter: Option<&[i64]>,
    ) -> Result<Vec<AttemptMetadata>, RepositoryError> {
        let mut result = Vec::new();
        for attempt in self.attempts(cm_id)? {
            if let Some(ids) = filter {
                if !ids.contains(&attempt.id) {
                    continue;
                }
            }
            let user = self.repo.user(attempt.user_id)?;
            result.push(AttemptMetadata {
                attemptid: attempt.id,
                userid: attempt.user_id,
                attempt: attempt.attempt,
                state: attempt.state.as_str().to_string(),
                timestart: attempt.time_start,
                timefinish: attempt.time_finish,
                username: user.username,
                firstname: user.firstname,
                lastname: user.lastname,
                idnumber: user.idnumber,
            });
        }
        Ok(result)
    }

    pub fn attempt_exists(&self, cm_id: i64, attempt_id: i64) -> Result<bool, RepositoryError> {
        Ok(self.attempts(cm_id)?.iter().any(|a| a.id == attempt_id))
    }

    /// Attachments of every slot, slot ascending, insertion order within a slot.
    pub fn list_attachments(
        &self,
        attempt_id: i64,
    ) -> Result<Vec<AttemptAttachment>, RepositoryError> {
        let attempt = self.repo.attempt(attempt_id)?;
        let mut slots = self.repo.attempt_slots(attempt.id)?;
        slots.sort_by_key(|s| s.slot);

        let mut attachments = Vec::new();
        for slot in slots {
            for file in self.repo.slot_attachments(attempt.id, slot.slot)? {
                attachments.push(AttemptAttachment {
                    slot: slot.slot,
                    file,
                });
            }
        }
        Ok(attachments)
    }
}
