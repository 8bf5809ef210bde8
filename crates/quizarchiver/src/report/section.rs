//! Report sections and their dependency graph.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// One independently toggleable partition of an attempt report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReportSection {
    Header,
    QuizFeedback,
    Question,
    QuestionFeedback,
    GeneralFeedback,
    #[serde(rename = "rightanswer")]
    RightAnswer,
    History,
    Attachments,
}

impl ReportSection {
    pub const ALL: [ReportSection; 8] = [
        ReportSection::Header,
        ReportSection::QuizFeedback,
        ReportSection::Question,
        ReportSection::QuestionFeedback,
        ReportSection::GeneralFeedback,
        ReportSection::RightAnswer,
        ReportSection::History,
        ReportSection::Attachments,
    ];

    /// Key used in settings maps and worker payloads.
    pub fn key(self) -> &'static str {
        match self {
            ReportSection::Header => "header",
            ReportSection::QuizFeedback => "quiz_feedback",
            ReportSection::Question => "question",
            ReportSection::QuestionFeedback => "question_feedback",
            ReportSection::GeneralFeedback => "general_feedback",
            ReportSection::RightAnswer => "rightanswer",
            ReportSection::History => "history",
            ReportSection::Attachments => "attachments",
        }
    }

    pub fn from_key(key: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|s| s.key() == key)
    }

    /// Name of the job setting that toggles this section.
    pub fn setting_key(self) -> String {
        format!("report_section_{}", self.key())
    }

    /// Sections that must be active for this one to be active.
    pub fn dependencies(self) -> &'static [ReportSection] {
        match self {
            ReportSection::Header | ReportSection::Question => &[],
            ReportSection::QuizFeedback => &[ReportSection::Header],
            ReportSection::QuestionFeedback
            | ReportSection::GeneralFeedback
            | ReportSection::RightAnswer
            | ReportSection::History
            | ReportSection::Attachments => &[ReportSection::Question],
        }
    }
}

impl fmt::Display for ReportSection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

/// Explicit on/off state for every report section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SectionSet(BTreeMap<ReportSection, bool>);

impl SectionSet {
    pub fn all() -> Self {
        Self(ReportSection::ALL.into_iter().map(|s| (s, true)).collect())
    }

    pub fn none() -> Self {
        Self(ReportSection::ALL.into_iter().map(|s| (s, false)).collect())
    }

    pub fn from_active<I: IntoIterator<Item = ReportSection>>(active: I) -> Self {
        let mut set = Self::none();
        for section in active {
            set.set(section, true);
        }
        set
    }

    pub fn set(&mut self, section: ReportSection, enabled: bool) {
        self.0.insert(section, enabled);
    }

    pub fn with(mut self, section: ReportSection, enabled: bool) -> Self {
        self.set(section, enabled);
        self
    }

    pub fn is_enabled(&self, section: ReportSection) -> bool {
        self.0.get(&section).copied().unwrap_or(false)
    }

    pub fn iter(&self) -> impl Iterator<Item = (ReportSection, bool)> + '_ {
        self.0.iter().map(|(s, e)| (*s, *e))
    }

    /// First section that is enabled while one of its prerequisites is not.
    pub fn validate(&self) -> Result<(), (ReportSection, ReportSection)> {
        for section in ReportSection::ALL {
            if !self.is_enabled(section) {
                continue;
            }
            if let Some(missing) = section
                .dependencies()
                .iter()
                .find(|dep| !self.is_enabled(**dep))
            {
                return Err((section, *missing));
            }
        }
        Ok(())
    }

    /// Copy with every section whose prerequisites are inactive switched off.
    pub fn effective(&self) -> Self {
        let mut out = self.clone();
        loop {
            let mut changed = false;
            for section in ReportSection::ALL {
                if out.is_enabled(section)
                    && section.dependencies().iter().any(|d| !out.is_enabled(*d))
                {
                    out.set(section, false);
                    changed = true;
                }
            }
            if !changed {
                return out;
            }
        }
    }

    /// Map keyed by section name, as sent to the worker.
    pub fn to_key_map(&self) -> BTreeMap<String, bool> {
        ReportSection::ALL
            .into_iter()
            .map(|s| (s.key().to_string(), self.is_enabled(s)))
            .collect()
    }
}

impl Default for SectionSet {
    fn default() -> Self {
        Self::all()
    }
}
