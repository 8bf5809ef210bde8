//! `generate_attempt_report`: renders one attempt for the worker.

use std::collections::BTreeMap;

use chrono::Utc;
use log::{info, warn};
use serde::{Deserialize, Serialize};
use tracing::Instrument;

use crate::attempts::{AttemptAttachment, AttemptEnumerator};
use crate::config::variables::{
    generate_attempt_filename, generate_attempt_foldername, is_valid_pattern, AttemptNameContext,
    PatternKind,
};
use crate::error::WebserviceError;
use crate::model::Attempt;
use crate::report::{AttemptReport, ImageInliner, PageOptions, ReportSection, SectionSet};
use crate::webservice::{
    found, require_positive, require_uuid, Access, ArchiverWebservice, WebserviceStatus,
};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerateAttemptReportParams {
    pub uuid: String,
    pub taskid: i64,
    pub attemptid: i64,
    pub foldernamepattern: String,
    pub filenamepattern: String,
    /// One flag per report section, keyed by section name.
    pub sections: BTreeMap<String, bool>,
    pub attachments: bool,
}

impl GenerateAttemptReportParams {
    /// Every section must be given exactly once.
    fn section_set(&self) -> Result<SectionSet, WebserviceError> {
        let mut set = SectionSet::none();
        for (key, enabled) in &self.sections {
            let section = ReportSection::from_key(key).ok_or_else(|| {
                WebserviceError::invalid("sections", format!("unknown section '{}'", key))
            })?;
            set.set(section, *enabled);
        }
        if let Some(missing) = ReportSection::ALL
            .into_iter()
            .find(|s| !self.sections.contains_key(s.key()))
        {
            return Err(WebserviceError::invalid(
                "sections",
                format!("missing section '{}'", missing),
            ));
        }
        Ok(set)
    }
}

/// File attached to a question response, as the worker downloads it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttachmentInfo {
    pub slot: u32,
    pub filename: String,
    pub filesize: u64,
    pub mimetype: String,
    pub contenthash: String,
    pub downloadurl: String,
}

impl AttachmentInfo {
    fn new(wwwroot: &str, attempt: &Attempt, attachment: &AttemptAttachment) -> Self {
        let file = &attachment.file;
        let r = &file.reference;
        let downloadurl = format!(
            "{}/webservice/pluginfile.php/{}/{}/{}/{}/{}/{}{}{}",
            wwwroot.trim_end_matches('/'),
            r.context_id,
            r.component,
            r.filearea,
            attempt.usage_id,
            attachment.slot,
            r.item_id,
            r.filepath,
            r.filename
        );
        Self {
            slot: attachment.slot,
            filename: r.filename.clone(),
            filesize: file.filesize,
            mimetype: file.mimetype.clone(),
            contenthash: file.contenthash.clone(),
            downloadurl,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerateAttemptReportResponse {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attemptid: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub foldername: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filename: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub report: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attachments: Option<Vec<AttachmentInfo>>,
    pub status: WebserviceStatus,
}

impl From<WebserviceStatus> for GenerateAttemptReportResponse {
    fn from(status: WebserviceStatus) -> Self {
        Self {
            attemptid: None,
            foldername: None,
            filename: None,
            report: None,
            attachments: None,
            status,
        }
    }
}

impl ArchiverWebservice {
    pub async fn generate_attempt_report(
        &self,
        wstoken: &str,
        params: GenerateAttemptReportParams,
    ) -> Result<GenerateAttemptReportResponse, WebserviceError> {
        let span = tracing::info_span!(
            "generate_attempt_report",
            task_id = params.taskid,
            attempt_id = params.attemptid
        );
        self.render_attempt(wstoken, params).instrument(span).await
    }

    async fn render_attempt(
        &self,
        wstoken: &str,
        params: GenerateAttemptReportParams,
    ) -> Result<GenerateAttemptReportResponse, WebserviceError> {
        require_uuid(&params.uuid)?;
        require_positive("taskid", params.taskid)?;
        require_positive("attemptid", params.attemptid)?;
        let sections = params.section_set()?;

        let task = match self.authorize(params.taskid, wstoken)? {
            Access::Granted(task) => task,
            Access::Denied(status) => return Ok(status.into()),
        };

        let repo = self.repo.as_ref();
        let Some(cm) = found(repo.course_module(task.cm_id))? else {
            return Ok(WebserviceStatus::E_CM_NOT_FOUND.into());
        };
        let Some(course) = found(repo.course(cm.course_id))? else {
            return Ok(WebserviceStatus::E_COURSE_NOT_FOUND.into());
        };
        let Some(quiz) = found(repo.quiz(cm.quiz_id))? else {
            return Ok(WebserviceStatus::E_QUIZ_NOT_FOUND.into());
        };

        if !is_valid_pattern(&params.foldernamepattern, PatternKind::Folder) {
            warn!("Task {}: invalid folder name pattern", task.id);
            return Ok(WebserviceStatus::E_INVALID_FOLDERNAME_PATTERN.into());
        }
        if !is_valid_pattern(&params.filenamepattern, PatternKind::File) {
            warn!("Task {}: invalid file name pattern", task.id);
            return Ok(WebserviceStatus::E_INVALID_FILENAME_PATTERN.into());
        }

        let enumerator = AttemptEnumerator::new(repo);
        if !enumerator.attempt_exists(cm.id, params.attemptid)? {
            warn!("Task {}: attempt {} not found", task.id, params.attemptid);
            return Ok(WebserviceStatus::E_ATTEMPT_NOT_FOUND.into());
        }

        let attempt = repo.attempt(params.attemptid)?;
        let user = repo.user(attempt.user_id)?;
        let groups = repo.user_groups(course.id, user.id)?;
        let now = Utc::now();

        let names = AttemptNameContext {
            course: &course,
            cm: &cm,
            quiz: &quiz,
            attempt: &attempt,
            user: &user,
            groups: &groups,
            now,
        };
        let Ok(foldername) = generate_attempt_foldername(&params.foldernamepattern, &names) else {
            return Ok(WebserviceStatus::E_INVALID_FOLDERNAME_PATTERN.into());
        };
        let Ok(filename) = generate_attempt_filename(&params.filenamepattern, &names) else {
            return Ok(WebserviceStatus::E_INVALID_FILENAME_PATTERN.into());
        };

        let attachments = if params.attachments {
            enumerator
                .list_attachments(attempt.id)?
                .iter()
                .map(|a| AttachmentInfo::new(self.config.wwwroot(), &attempt, a))
                .collect()
        } else {
            Vec::new()
        };

        let inliner = ImageInliner::new(self.files.as_ref(), &self.config)?;
        let report = AttemptReport::new(
            repo,
            self.renderer.as_ref(),
            self.config.wwwroot(),
            course,
            cm,
            quiz,
        );
        let html = report
            .generate_full_page(attempt.id, &sections, PageOptions::default(), &inliner, now)
            .await?;

        info!(
            "Task {}: rendered attempt {} ({} bytes, {} attachments)",
            task.id,
            attempt.id,
            html.len(),
            attachments.len()
        );
        Ok(GenerateAttemptReportResponse {
            attemptid: Some(attempt.id),
            foldername: Some(foldername),
            filename: Some(filename),
            report: Some(html),
            attachments: Some(attachments),
            status: WebserviceStatus::OK,
        })
    }
}
