//! Attempt reports: the HTML fragment for one attempt and the self-contained
//! page the worker prints.

pub mod inline;
pub mod page;
pub mod renderer;
pub mod section;
pub mod url;

use serde::{Deserialize, Serialize};

pub use inline::{ImageInliner, InlineOutcome};
pub use page::{build_full_page, PageOptions, REPORT_BODY_CLASS};
pub use renderer::{format_duration, AttemptReport, HeaderRow};
pub use section::{ReportSection, SectionSet};

/// How marks are shown next to a question.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MarkDisplay {
    Hidden,
    MaxOnly,
    MarkAndMax,
}

/// Flags the host uses when rendering a single question.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DisplayOptions {
    pub readonly: bool,
    pub marks: MarkDisplay,
    pub correctness: bool,
    pub numpartscorrect: bool,
    pub feedback: bool,
    pub generalfeedback: bool,
    pub rightanswer: bool,
    pub history: bool,
    pub manualcomment: bool,
    pub manualcommentlink: bool,
    pub flags: bool,
}

impl DisplayOptions {
    /// Archive display: read-only with marks, correctness and flags always
    /// shown. Feedback, right answer and history follow the sections.
    pub fn for_sections(sections: &SectionSet) -> Self {
        Self {
            readonly: true,
            marks: MarkDisplay::MarkAndMax,
            correctness: true,
            numpartscorrect: true,
            feedback: sections.is_enabled(ReportSection::QuestionFeedback),
            generalfeedback: sections.is_enabled(ReportSection::GeneralFeedback),
            rightanswer: sections.is_enabled(ReportSection::RightAnswer),
            history: sections.is_enabled(ReportSection::History),
            manualcomment: true,
            manualcommentlink: false,
            flags: true,
        }
    }
}
