//! Builders for the host-side data the archiver reads.

#![allow(dead_code)]

use std::collections::BTreeMap;

use quizarchiver::model::{
    Attempt, AttemptState, Course, CourseModule, Group, QuestionSlot, Quiz, QuizUser, StoredFile,
};
use quizarchiver::report::DisplayOptions;
use quizarchiver::{PageRenderer, QuizRepository, RepositoryError};

pub const COURSE_ID: i64 = 2;
pub const CM_ID: i64 = 5;
pub const CONTEXT_ID: i64 = 42;
pub const QUIZ_ID: i64 = 7;

/// Quiz data held in memory, implementing `QuizRepository`.
#[derive(Debug, Clone)]
pub struct InMemoryRepository {
    pub course: Course,
    pub cm: CourseModule,
    pub quiz: Quiz,
    pub attempts: Vec<Attempt>,
    pub users: Vec<QuizUser>,
    pub groups: BTreeMap<i64, Vec<Group>>,
    pub slots: BTreeMap<i64, Vec<QuestionSlot>>,
    pub attachments: BTreeMap<(i64, u32), Vec<StoredFile>>,
}

impl QuizRepository for InMemoryRepository {
    fn course(&self, course_id: i64) -> Result<Course, RepositoryError> {
        (self.course.id == course_id)
            .then(|| self.course.clone())
            .ok_or(RepositoryError::not_found("course", course_id))
    }

    fn course_module(&self, cm_id: i64) -> Result<CourseModule, RepositoryError> {
        (self.cm.id == cm_id)
            .then(|| self.cm.clone())
            .ok_or(RepositoryError::not_found("course module", cm_id))
    }

    fn quiz(&self, quiz_id: i64) -> Result<Quiz, RepositoryError> {
        (self.quiz.id == quiz_id)
            .then(|| self.quiz.clone())
            .ok_or(RepositoryError::not_found("quiz", quiz_id))
    }

    fn attempts(&self, quiz_id: i64) -> Result<Vec<Attempt>, RepositoryError> {
        Ok(self
            .attempts
            .iter()
            .filter(|a| a.quiz_id == quiz_id)
            .cloned()
            .collect())
    }

    fn attempt(&self, attempt_id: i64) -> Result<Attempt, RepositoryError> {
        self.attempts
            .iter()
            .find(|a| a.id == attempt_id)
            .cloned()
            .ok_or(RepositoryError::not_found("attempt", attempt_id))
    }

    fn user(&self, user_id: i64) -> Result<QuizUser, RepositoryError> {
        self.users
            .iter()
            .find(|u| u.id == user_id)
            .cloned()
            .ok_or(RepositoryError::not_found("user", user_id))
    }

    fn user_groups(&self, _course_id: i64, user_id: i64) -> Result<Vec<Group>, RepositoryError> {
        Ok(self.groups.get(&user_id).cloned().unwrap_or_default())
    }

    fn attempt_slots(&self, attempt_id: i64) -> Result<Vec<QuestionSlot>, RepositoryError> {
        Ok(self.slots.get(&attempt_id).cloned().unwrap_or_default())
    }

    fn slot_attachments(
        &self,
        attempt_id: i64,
        slot: u32,
    ) -> Result<Vec<StoredFile>, RepositoryError> {
        Ok(self
            .attachments
            .get(&(attempt_id, slot))
            .cloned()
            .unwrap_or_default())
    }
}

/// Builder for an `InMemoryRepository` with one course, course module and quiz.
pub struct RepositoryBuilder {
    repo: InMemoryRepository,
}

impl RepositoryBuilder {
    pub fn new() -> Self {
        Self {
            repo: InMemoryRepository {
                course: Course {
                    id: COURSE_ID,
                    fullname: "Algorithms and Data Structures".to_string(),
                    shortname: "ADS".to_string(),
                },
                cm: CourseModule {
                    id: CM_ID,
                    course_id: COURSE_ID,
                    quiz_id: QUIZ_ID,
                    context_id: CONTEXT_ID,
                },
                quiz: Quiz {
                    id: QUIZ_ID,
                    name: "Final Exam".to_string(),
                    time_limit: 0,
                    grade: 10.0,
                    sum_grades: 20.0,
                    decimal_points: 2,
                    time_modified: 1_700_000_000,
                    slot_count: 2,
                    feedback: Vec::new(),
                },
                attempts: Vec::new(),
                users: Vec::new(),
                groups: BTreeMap::new(),
                slots: BTreeMap::new(),
                attachments: BTreeMap::new(),
            },
        }
    }

    pub fn user(mut self, id: i64, username: &str) -> Self {
        self.repo.users.push(QuizUser {
            id,
            username: username.to_string(),
            firstname: "Ada".to_string(),
            lastname: username.to_string(),
            idnumber: format!("ID-{}", id),
        });
        self
    }

    /// Adds a finished attempt with `slots` question slots.
    pub fn attempt(mut self, attempt: Attempt, slots: u32) -> Self {
        self.repo.slots.insert(
            attempt.id,
            (1..=slots)
                .map(|slot| QuestionSlot {
                    slot,
                    original_slot: slot,
                    number: slot,
                })
                .collect(),
        );
        self.repo.attempts.push(attempt);
        self
    }

    pub fn attachment(mut self, attempt_id: i64, slot: u32, file: StoredFile) -> Self {
        self.repo
            .attachments
            .entry((attempt_id, slot))
            .or_default()
            .push(file);
        self
    }

    pub fn group(mut self, user_id: i64, id: i64, name: &str) -> Self {
        self.repo.groups.entry(user_id).or_default().push(Group {
            id,
            name: name.to_string(),
            idnumber: format!("G{}", id),
        });
        self
    }

    pub fn slot_count(mut self, count: u32) -> Self {
        self.repo.quiz.slot_count = count;
        self
    }

    pub fn build(self) -> InMemoryRepository {
        self.repo
    }
}

/// Builder for `Attempt` values of the default quiz.
pub struct AttemptBuilder {
    attempt: Attempt,
}

impl AttemptBuilder {
    pub fn new(id: i64, user_id: i64) -> Self {
        Self {
            attempt: Attempt {
                id,
                quiz_id: QUIZ_ID,
                user_id,
                attempt: 1,
                state: AttemptState::Finished,
                preview: false,
                time_start: 1_700_000_000,
                time_finish: 1_700_003_723,
                time_modified: 1_700_003_723,
                sum_grades: Some(15.0),
                usage_id: 100 + id,
            },
        }
    }

    pub fn preview(mut self) -> Self {
        self.attempt.preview = true;
        self
    }

    pub fn in_progress(mut self) -> Self {
        self.attempt.state = AttemptState::InProgress;
        self.attempt.time_finish = 0;
        self.attempt.sum_grades = None;
        self
    }

    pub fn modified(mut self, time: i64) -> Self {
        self.attempt.time_modified = time;
        self
    }

    pub fn build(self) -> Attempt {
        self.attempt
    }
}

/// Page renderer producing a small fixed page. Extra HTML can be placed
/// into individual question slots, e.g. images.
#[derive(Debug, Clone, Default)]
pub struct StubRenderer {
    pub question_html: BTreeMap<u32, String>,
}

impl StubRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_question_html(mut self, slot: u32, html: &str) -> Self {
        self.question_html.insert(slot, html.to_string());
        self
    }
}

impl PageRenderer for StubRenderer {
    fn page_header(&self, body_class: &str) -> String {
        format!(
            "<!DOCTYPE html><html><head><title>Report</title></head><body class=\"{}\"><div id=\"page\">",
            body_class
        )
    }

    fn page_footer(&self) -> String {
        "</div><footer>Site footer</footer></body></html>".to_string()
    }

    fn render_question(
        &self,
        attempt: &Attempt,
        slot: &QuestionSlot,
        options: &DisplayOptions,
    ) -> Result<String, RepositoryError> {
        let mut html = format!(
            "<div class=\"que\" id=\"question-{}-{}\"><h3>Question {}</h3>",
            attempt.id, slot.slot, slot.number
        );
        if let Some(extra) = self.question_html.get(&slot.slot) {
            html.push_str(extra);
        }
        if options.generalfeedback {
            html.push_str("<div class=\"generalfeedback\">General feedback</div>");
        }
        if options.rightanswer {
            html.push_str("<div class=\"rightanswer\">Right answer</div>");
        }
        html.push_str("</div>");
        Ok(html)
    }
}
