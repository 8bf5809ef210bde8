//! `${variable}` patterns for attempt report file and folder names.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::LazyLock;

use chrono::{DateTime, Utc};
use regex::Regex;

use crate::error::ConfigError;
use crate::model::{Attempt, Course, CourseModule, Group, Quiz, QuizUser};

static RE_VARIABLE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\$\{\s*([a-zA-Z0-9_]+)\s*\}").unwrap());

/// Characters that must not appear in a generated file name.
pub const FILENAME_FORBIDDEN_CHARACTERS: &[char] = &[
    '\\', '/', '.', ':', ';', '*', '?', '!', '"', '<', '>', '|', '\0',
];

/// Like [`FILENAME_FORBIDDEN_CHARACTERS`] but `/` nests folders.
pub const FOLDERNAME_FORBIDDEN_CHARACTERS: &[char] = &[
    '\\', '.', ':', ';', '*', '?', '!', '"', '<', '>', '|', '\0',
];

/// Placeholder for group variables of users without any group.
const NO_GROUP: &str = "nogroup";

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum AttemptFilenameVariable {
    CourseId,
    CourseName,
    CourseShortName,
    CmId,
    GroupIds,
    GroupIdNumbers,
    GroupNames,
    QuizId,
    QuizName,
    AttemptId,
    Username,
    FirstName,
    LastName,
    IdNumber,
    TimeStart,
    TimeFinish,
    Date,
    Time,
    Timestamp,
}

impl AttemptFilenameVariable {
    pub const ALL: [AttemptFilenameVariable; 19] = [
        AttemptFilenameVariable::CourseId,
        AttemptFilenameVariable::CourseName,
        AttemptFilenameVariable::CourseShortName,
        AttemptFilenameVariable::CmId,
        AttemptFilenameVariable::GroupIds,
        AttemptFilenameVariable::GroupIdNumbers,
        AttemptFilenameVariable::GroupNames,
        AttemptFilenameVariable::QuizId,
        AttemptFilenameVariable::QuizName,
        AttemptFilenameVariable::AttemptId,
        AttemptFilenameVariable::Username,
        AttemptFilenameVariable::FirstName,
        AttemptFilenameVariable::LastName,
        AttemptFilenameVariable::IdNumber,
        AttemptFilenameVariable::TimeStart,
        AttemptFilenameVariable::TimeFinish,
        AttemptFilenameVariable::Date,
        AttemptFilenameVariable::Time,
        AttemptFilenameVariable::Timestamp,
    ];

    pub fn name(self) -> &'static str {
        match self {
            AttemptFilenameVariable::CourseId => "courseid",
            AttemptFilenameVariable::CourseName => "coursename",
            AttemptFilenameVariable::CourseShortName => "courseshortname",
            AttemptFilenameVariable::CmId => "cmid",
            AttemptFilenameVariable::GroupIds => "groupids",
            AttemptFilenameVariable::GroupIdNumbers => "groupidnumbers",
            AttemptFilenameVariable::GroupNames => "groupnames",
            AttemptFilenameVariable::QuizId => "quizid",
            AttemptFilenameVariable::QuizName => "quizname",
            AttemptFilenameVariable::AttemptId => "attemptid",
            AttemptFilenameVariable::Username => "username",
            AttemptFilenameVariable::FirstName => "firstname",
            AttemptFilenameVariable::LastName => "lastname",
            AttemptFilenameVariable::IdNumber => "idnumber",
            AttemptFilenameVariable::TimeStart => "timestart",
            AttemptFilenameVariable::TimeFinish => "timefinish",
            AttemptFilenameVariable::Date => "date",
            AttemptFilenameVariable::Time => "time",
            AttemptFilenameVariable::Timestamp => "timestamp",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|v| v.name() == name)
    }
}

impl fmt::Display for AttemptFilenameVariable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "${{{}}}", self.name())
    }
}

/// Which kind of name a pattern produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PatternKind {
    File,
    Folder,
}

impl PatternKind {
    pub fn forbidden_characters(self) -> &'static [char] {
        match self {
            PatternKind::File => FILENAME_FORBIDDEN_CHARACTERS,
            PatternKind::Folder => FOLDERNAME_FORBIDDEN_CHARACTERS,
        }
    }
}

/// Checks a pattern: only known variables, no forbidden characters outside
/// of variable references, and for folders no leading or trailing `/`.
pub fn validate_pattern(pattern: &str, kind: PatternKind) -> Result<(), ConfigError> {
    let invalid = |reason: String| ConfigError::InvalidPattern {
        pattern: pattern.to_string(),
        reason,
    };

    if pattern.trim().is_empty() || pattern == "." {
        return Err(invalid("pattern is empty".to_string()));
    }

    for caps in RE_VARIABLE.captures_iter(pattern) {
        let name = &caps[1];
        if AttemptFilenameVariable::from_name(name).is_none() {
            return Err(invalid(format!("unknown variable '{}'", name)));
        }
    }

    let literal = RE_VARIABLE.replace_all(pattern, "");
    if literal.contains("${") {
        return Err(invalid("unterminated variable reference".to_string()));
    }
    if let Some(c) = literal
        .chars()
        .find(|c| kind.forbidden_characters().contains(c))
    {
        return Err(invalid(format!("forbidden character {:?}", c)));
    }

    if kind == PatternKind::Folder {
        if pattern.starts_with('/') || pattern.ends_with('/') {
            return Err(invalid("leading or trailing slash".to_string()));
        }
        if pattern.contains("//") {
            return Err(invalid("empty folder segment".to_string()));
        }
    }

    Ok(())
}

pub fn is_valid_pattern(pattern: &str, kind: PatternKind) -> bool {
    validate_pattern(pattern, kind).is_ok()
}

/// Everything a file or folder name of one attempt can refer to.
pub struct AttemptNameContext<'a> {
    pub course: &'a Course,
    pub cm: &'a CourseModule,
    pub quiz: &'a Quiz,
    pub attempt: &'a Attempt,
    pub user: &'a QuizUser,
    pub groups: &'a [Group],
    pub now: DateTime<Utc>,
}

impl AttemptNameContext<'_> {
    fn values(&self) -> BTreeMap<AttemptFilenameVariable, String> {
        use AttemptFilenameVariable as V;

        let join_groups = |f: &dyn Fn(&Group) -> String| {
            if self.groups.is_empty() {
                NO_GROUP.to_string()
            } else {
                self.groups.iter().map(f).collect::<Vec<_>>().join("-")
            }
        };

        let mut values = BTreeMap::new();
        values.insert(V::CourseId, self.course.id.to_string());
        values.insert(V::CourseName, self.course.fullname.clone());
        values.insert(V::CourseShortName, self.course.shortname.clone());
        values.insert(V::CmId, self.cm.id.to_string());
        values.insert(V::GroupIds, join_groups(&|g| g.id.to_string()));
        values.insert(V::GroupIdNumbers, join_groups(&|g| g.idnumber.clone()));
        values.insert(V::GroupNames, join_groups(&|g| g.name.clone()));
        values.insert(V::QuizId, self.quiz.id.to_string());
        values.insert(V::QuizName, self.quiz.name.clone());
        values.insert(V::AttemptId, self.attempt.id.to_string());
        values.insert(V::Username, self.user.username.clone());
        values.insert(V::FirstName, self.user.firstname.clone());
        values.insert(V::LastName, self.user.lastname.clone());
        values.insert(V::IdNumber, self.user.idnumber.clone());
        values.insert(V::TimeStart, self.attempt.time_start.to_string());
        values.insert(V::TimeFinish, self.attempt.time_finish.to_string());
        values.insert(V::Date, self.now.format("%Y-%m-%d").to_string());
        values.insert(V::Time, self.now.format("%H-%M-%S").to_string());
        values.insert(V::Timestamp, self.now.timestamp().to_string());
        values
    }
}

pub fn generate_attempt_filename(
    pattern: &str,
    ctx: &AttemptNameContext<'_>,
) -> Result<String, ConfigError> {
    generate_name(pattern, PatternKind::File, ctx)
}

pub fn generate_attempt_foldername(
    pattern: &str,
    ctx: &AttemptNameContext<'_>,
) -> Result<String, ConfigError> {
    generate_name(pattern, PatternKind::Folder, ctx)
}

fn generate_name(
    pattern: &str,
    kind: PatternKind,
    ctx: &AttemptNameContext<'_>,
) -> Result<String, ConfigError> {
    validate_pattern(pattern, kind)?;
    let values = ctx.values();

    let result = RE_VARIABLE.replace_all(pattern, |caps: &regex::Captures<'_>| {
        AttemptFilenameVariable::from_name(&caps[1])
            .and_then(|v| values.get(&v))
            .map(|value| sanitize_value(value))
            .unwrap_or_default()
    });

    Ok(result.trim().to_string())
}

/// Substituted values never contribute forbidden characters, not even `/`.
fn sanitize_value(value: &str) -> String {
    value
        .chars()
        .map(|c| {
            if FILENAME_FORBIDDEN_CHARACTERS.contains(&c) || c.is_control() {
                '_'
            } else {
                c
            }
        })
        .collect()
}
