use chrono::{DateTime, Utc};

use crate::error::{ReportError, RepositoryError};
use crate::host::{PageRenderer, QuizRepository};
use crate::model::{Attempt, Course, CourseModule, Quiz, QuizUser};
use crate::report::{DisplayOptions, ReportSection, SectionSet};

/// Attempts running this much past the time limit are reported as overdue.
const OVERDUE_GRACE_SECS: i64 = 60;

/// One title/content pair of the summary table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeaderRow {
    pub title: String,
    pub content: String,
}

impl HeaderRow {
    fn new(title: &str, content: impl Into<String>) -> Self {
        Self {
            title: title.to_string(),
            content: content.into(),
        }
    }
}

/// Renders attempts of one quiz.
pub struct AttemptReport<'a> {
    repo: &'a dyn QuizRepository,
    host: &'a dyn PageRenderer,
    wwwroot: String,
    course: Course,
    cm: CourseModule,
    quiz: Quiz,
}

impl<'a> AttemptReport<'a> {
    pub fn new(
        repo: &'a dyn QuizRepository,
        host: &'a dyn PageRenderer,
        wwwroot: &str,
        course: Course,
        cm: CourseModule,
        quiz: Quiz,
    ) -> Self {
        Self {
            repo,
            host,
            wwwroot: wwwroot.trim_end_matches('/').to_string(),
            course,
            cm,
            quiz,
        }
    }

    /// Looks up course and quiz of a course module.
    pub fn load(
        repo: &'a dyn QuizRepository,
        host: &'a dyn PageRenderer,
        wwwroot: &str,
        cm_id: i64,
    ) -> Result<Self, ReportError> {
        let cm = repo.course_module(cm_id)?;
        let course = repo.course(cm.course_id)?;
        let quiz = repo.quiz(cm.quiz_id)?;
        Ok(Self::new(repo, host, wwwroot, course, cm, quiz))
    }

    pub fn course(&self) -> &Course {
        &self.course
    }

    pub fn cm(&self) -> &CourseModule {
        &self.cm
    }

    pub fn quiz(&self) -> &Quiz {
        &self.quiz
    }

    pub fn host(&self) -> &'a dyn PageRenderer {
        self.host
    }

    pub fn wwwroot(&self) -> &str {
        &self.wwwroot
    }

    /// HTML fragment of one attempt.
    ///
    /// Sections whose prerequisites are inactive are left out. The output
    /// depends only on stored data and `exported_at`.
    pub fn generate(
        &self,
        attempt_id: i64,
        sections: &SectionSet,
        exported_at: DateTime<Utc>,
    ) -> Result<String, ReportError> {
        let _span = tracing::info_span!("attempt_report", attempt_id, cm_id = self.cm.id).entered();

        let attempt = self.repo.attempt(attempt_id)?;
        if attempt.quiz_id != self.quiz.id {
            return Err(RepositoryError::not_found("attempt", attempt_id).into());
        }

        let sections = sections.effective();
        let mut html = String::new();

        if sections.is_enabled(ReportSection::Header) {
            let user = self.repo.user(attempt.user_id)?;
            let rows = self.header_rows(&attempt, &user, &sections, exported_at);
            html.push_str(&render_summary_table(&rows));
        }

        if sections.is_enabled(ReportSection::Question) {
            let options = DisplayOptions::for_sections(&sections);
            let slots = self.repo.attempt_slots(attempt.id)?;
            log::debug!("Rendering {} question slots of attempt {}", slots.len(), attempt.id);
            for slot in &slots {
                html.push_str(&self.host.render_question(&attempt, slot, &options)?);
            }
        }

        Ok(html)
    }

    /// Rows of the summary table in display order.
    pub fn header_rows(
        &self,
        attempt: &Attempt,
        user: &QuizUser,
        sections: &SectionSet,
        exported_at: DateTime<Utc>,
    ) -> Vec<HeaderRow> {
        let mut rows = Vec::new();

        rows.push(HeaderRow::new(
            "User",
            format!(
                "<a href=\"{}/user/view.php?id={}&amp;course={}\">{}</a>",
                self.wwwroot,
                user.id,
                self.course.id,
                escape_html(&user.fullname())
            ),
        ));
        rows.push(HeaderRow::new(
            "ID number",
            if user.idnumber.is_empty() {
                "<i>None</i>".to_string()
            } else {
                escape_html(&user.idnumber)
            },
        ));
        rows.push(HeaderRow::new(
            "Course",
            format!(
                "{} (Course-ID: {})",
                escape_html(&self.course.fullname),
                self.course.id
            ),
        ));
        rows.push(HeaderRow::new(
            "Quiz",
            format!("{} (Quiz-ID: {})", escape_html(&self.quiz.name), self.quiz.id),
        ));
        rows.push(HeaderRow::new("Started on", userdate(attempt.time_start)));
        rows.push(HeaderRow::new("State", attempt.state.display_name()));

        if attempt.is_finished() {
            rows.push(HeaderRow::new("Completed on", userdate(attempt.time_finish)));
            rows.push(HeaderRow::new("Time taken", time_taken(attempt)));
        }
        if let Some(overtime) = overtime(&self.quiz, attempt) {
            rows.push(HeaderRow::new("Overdue", format_duration(overtime)));
        }

        let grade = attempt.sum_grades.map(|raw| self.quiz.rescale(raw));
        if self.quiz.has_grades() {
            match (attempt.sum_grades, grade) {
                (Some(raw), Some(grade)) if attempt.is_finished() => {
                    if self.quiz.grade != self.quiz.sum_grades {
                        rows.push(HeaderRow::new(
                            "Marks",
                            format!(
                                "{}/{}",
                                self.quiz.format_grade(raw),
                                self.quiz.format_grade(self.quiz.sum_grades)
                            ),
                        ));
                    }
                    rows.push(HeaderRow::new("Grade", self.format_scaled_grade(raw, grade)));
                }
                (None, _) => rows.push(HeaderRow::new("Grade", "Not yet graded")),
                _ => {}
            }
        }

        if sections.is_enabled(ReportSection::QuizFeedback) {
            rows.push(HeaderRow::new(
                "Feedback",
                self.quiz
                    .overall_feedback(grade)
                    .map(str::to_string)
                    .unwrap_or_else(|| "<i>None</i>".to_string()),
            ));
        }

        rows.push(HeaderRow::new("Archived", format_userdate(exported_at)));
        rows
    }

    fn format_scaled_grade(&self, raw: f64, grade: f64) -> String {
        let grade = format!("<b>{}</b>", self.quiz.format_grade(grade));
        let max = self.quiz.format_grade(self.quiz.grade);
        if self.quiz.grade != 100.0 {
            let percent = raw * 100.0 / self.quiz.sum_grades;
            format!("{} out of {} (<b>{:.0}</b>%)", grade, max, percent)
        } else {
            format!("{} out of {}", grade, max)
        }
    }
}

fn render_summary_table(rows: &[HeaderRow]) -> String {
    let mut html =
        String::from("<table class=\"generaltable generalbox quizreviewsummary\"><tbody>");
    for row in rows {
        html.push_str(&format!(
            "<tr><th class=\"cell\" scope=\"row\">{}</th><td class=\"cell\">{}</td></tr>",
            row.title, row.content
        ));
    }
    html.push_str("</tbody></table>");
    html
}

/// Formats seconds as `1 day 2 hours 3 mins 4 secs`, skipping zero parts.
/// Zero renders as `-`.
pub fn format_duration(total_secs: i64) -> String {
    if total_secs <= 0 {
        return "-".to_string();
    }

    let units: [(i64, &str, &str); 4] = [
        (86_400, "day", "days"),
        (3_600, "hour", "hours"),
        (60, "min", "mins"),
        (1, "sec", "secs"),
    ];

    let mut rest = total_secs;
    let mut parts = Vec::new();
    for (size, singular, plural) in units {
        let count = rest / size;
        rest %= size;
        if count > 0 {
            parts.push(format!("{} {}", count, if count == 1 { singular } else { plural }));
        }
    }
    parts.join(" ")
}

/// Duration cell of an attempt; `Unfinished` while it is not finished.
pub fn time_taken(attempt: &Attempt) -> String {
    if attempt.is_finished() {
        format_duration(attempt.time_finish - attempt.time_start)
    } else {
        "Unfinished".to_string()
    }
}

/// Seconds an attempt ran past the time limit, beyond the grace period.
pub fn overtime(quiz: &Quiz, attempt: &Attempt) -> Option<i64> {
    if !attempt.is_finished() || quiz.time_limit <= 0 {
        return None;
    }
    let taken = attempt.time_finish - attempt.time_start;
    if taken > quiz.time_limit + OVERDUE_GRACE_SECS {
        Some(taken - quiz.time_limit)
    } else {
        None
    }
}

fn userdate(timestamp: i64) -> String {
    match DateTime::<Utc>::from_timestamp(timestamp, 0) {
        Some(dt) => format_userdate(dt),
        None => timestamp.to_string(),
    }
}

fn format_userdate(dt: DateTime<Utc>) -> String {
    dt.format("%A, %d %B %Y, %I:%M %p").to_string()
}

pub(crate) fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::AttemptState;

    fn attempt(state: AttemptState, start: i64, finish: i64) -> Attempt {
        Attempt {
            id: 1,
            quiz_id: 1,
            user_id: 1,
            attempt: 1,
            state,
            preview: false,
            time_start: start,
            time_finish: finish,
            time_modified: finish,
            sum_grades: None,
            usage_id: 1,
        }
    }

    fn quiz(time_limit: i64) -> Quiz {
        Quiz {
            id: 1,
            name: "Q".to_string(),
            time_limit,
            grade: 10.0,
            sum_grades: 10.0,
            decimal_points: 2,
            time_modified: 0,
            slot_count: 1,
            feedback: vec![],
        }
    }

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(0), "-");
        assert_eq!(format_duration(1), "1 sec");
        assert_eq!(format_duration(61), "1 min 1 sec");
        assert_eq!(format_duration(3_600), "1 hour");
        assert_eq!(format_duration(2 * 86_400 + 2 * 3_600 + 5), "2 days 2 hours 5 secs");
    }

    #[test]
    fn test_time_taken_unfinished() {
        assert_eq!(time_taken(&attempt(AttemptState::InProgress, 0, 0)), "Unfinished");
        assert_eq!(time_taken(&attempt(AttemptState::Finished, 100, 100)), "-");
        assert_eq!(time_taken(&attempt(AttemptState::Finished, 0, 90)), "1 min 30 secs");
    }

    #[test]
    fn test_overtime_needs_grace_period() {
        let finished = attempt(AttemptState::Finished, 0, 660);
        assert_eq!(overtime(&quiz(600), &finished), None);
        let late = attempt(AttemptState::Finished, 0, 661);
        assert_eq!(overtime(&quiz(600), &late), Some(61));
        assert_eq!(overtime(&quiz(0), &late), None);
    }

    #[test]
    fn test_userdate_format() {
        assert_eq!(userdate(0), "Thursday, 01 January 1970, 12:00 AM");
        assert_eq!(userdate(1_700_000_000), "Tuesday, 14 November 2023, 10:13 PM");
    }

    #[test]
    fn test_escape_html() {
        assert_eq!(escape_html("a<b & \"c\""), "a&lt;b &amp; &quot;c&quot;");
    }

    #[test]
    fn test_summary_table_markup() {
        let html = render_summary_table(&[HeaderRow::new("State", "Finished")]);
        assert_eq!(
            html,
            "<table class=\"generaltable generalbox quizreviewsummary\"><tbody>\
             <tr><th class=\"cell\" scope=\"row\">State</th><td class=\"cell\">Finished</td></tr>\
             </tbody></table>"
        );
    }
}
