//! Read-only view of the host platform's course, quiz, user and file records.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Course {
    pub id: i64,
    pub fullname: String,
    pub shortname: String,
}

/// A quiz placed in a course (course module).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CourseModule {
    pub id: i64,
    pub course_id: i64,
    pub quiz_id: i64,
    pub context_id: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeedbackBand {
    /// Inclusive lower bound of the scaled grade.
    pub min_grade: f64,
    /// Exclusive upper bound of the scaled grade.
    pub max_grade: f64,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Quiz {
    pub id: i64,
    pub name: String,
    /// Time limit in seconds, 0 if unlimited.
    pub time_limit: i64,
    /// Maximum scaled grade.
    pub grade: f64,
    /// Sum of the maximum marks of all questions.
    pub sum_grades: f64,
    pub decimal_points: usize,
    pub time_modified: i64,
    pub slot_count: u32,
    #[serde(default)]
    pub feedback: Vec<FeedbackBand>,
}

impl Quiz {
    pub fn has_grades(&self) -> bool {
        self.grade >= 0.000005 && self.sum_grades >= 0.000005
    }

    /// Scales raw marks to the quiz grade.
    pub fn rescale(&self, raw: f64) -> f64 {
        if self.sum_grades.abs() < f64::EPSILON {
            0.0
        } else {
            raw * self.grade / self.sum_grades
        }
    }

    pub fn format_grade(&self, grade: f64) -> String {
        format!("{:.*}", self.decimal_points, grade)
    }

    /// Feedback text of the band containing `grade`.
    pub fn overall_feedback(&self, grade: Option<f64>) -> Option<&str> {
        let grade = grade?;
        self.feedback
            .iter()
            .find(|b| b.min_grade <= grade && grade < b.max_grade)
            .map(|b| b.text.as_str())
            .filter(|t| !t.trim().is_empty())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AttemptState {
    #[serde(rename = "inprogress")]
    InProgress,
    Overdue,
    Finished,
    Abandoned,
}

impl AttemptState {
    pub fn display_name(self) -> &'static str {
        match self {
            AttemptState::InProgress => "In progress",
            AttemptState::Overdue => "Overdue",
            AttemptState::Finished => "Finished",
            AttemptState::Abandoned => "Never submitted",
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            AttemptState::InProgress => "inprogress",
            AttemptState::Overdue => "overdue",
            AttemptState::Finished => "finished",
            AttemptState::Abandoned => "abandoned",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Attempt {
    pub id: i64,
    pub quiz_id: i64,
    pub user_id: i64,
    /// Sequence number of this attempt for the user.
    pub attempt: i64,
    pub state: AttemptState,
    pub preview: bool,
    pub time_start: i64,
    pub time_finish: i64,
    pub time_modified: i64,
    pub sum_grades: Option<f64>,
    /// Question usage the attempt's slots belong to.
    pub usage_id: i64,
}

impl Attempt {
    pub fn is_finished(&self) -> bool {
        self.state == AttemptState::Finished
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuizUser {
    pub id: i64,
    pub username: String,
    pub firstname: String,
    pub lastname: String,
    pub idnumber: String,
}

impl QuizUser {
    pub fn fullname(&self) -> String {
        format!("{} {}", self.firstname, self.lastname).trim().to_string()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Group {
    pub id: i64,
    pub name: String,
    pub idnumber: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuestionSlot {
    pub slot: u32,
    /// Slot the question was originally placed in, differs for redone questions.
    pub original_slot: u32,
    /// Displayed question number.
    pub number: u32,
}

/// Location of a file in the host file store.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FileRef {
    pub context_id: i64,
    pub component: String,
    pub filearea: String,
    pub item_id: i64,
    pub filepath: String,
    pub filename: String,
}

impl FileRef {
    pub fn new(
        context_id: i64,
        component: impl Into<String>,
        filearea: impl Into<String>,
        item_id: i64,
        filepath: impl Into<String>,
        filename: impl Into<String>,
    ) -> Self {
        Self {
            context_id,
            component: component.into(),
            filearea: filearea.into(),
            item_id,
            filepath: filepath.into(),
            filename: filename.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredFile {
    pub reference: FileRef,
    pub filesize: u64,
    pub mimetype: String,
    pub contenthash: String,
}
