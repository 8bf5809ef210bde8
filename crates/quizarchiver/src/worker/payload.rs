//! Body of the job creation request.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::error::WorkerError;
use crate::report::ReportSection;
use crate::task::{ImageOptimize, JobSettings, PaperFormat};

/// Version of the worker API spoken by this client.
pub const API_VERSION: u32 = 1;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct JobPayload {
    pub api_version: u32,
    pub taskid: i64,
    pub moodle_api: CallbackApi,
    pub job: JobBlock,
}

/// Where and how the worker calls back.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CallbackApi {
    pub wstoken: String,
    pub base_url: String,
    pub webservice_url: String,
    pub upload_url: String,
}

impl CallbackApi {
    pub fn new(wstoken: &str, base_url: &str) -> Self {
        let base_url = base_url.trim_end_matches('/');
        Self {
            wstoken: wstoken.to_string(),
            base_url: base_url.to_string(),
            webservice_url: format!("{}/webservice/rest/server.php", base_url),
            upload_url: format!("{}/webservice/upload.php", base_url),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct JobBlock {
    pub attemptids: Vec<i64>,
    pub report_sections: BTreeMap<String, bool>,
    pub paper_format: PaperFormat,
    pub foldername_pattern: String,
    pub filename_pattern: String,
    pub image_optimize: ImageOptimizeSetting,
    pub fetch_metadata: bool,
    pub fetch_attachments: bool,
    pub keep_html_files: bool,
}

/// Serialized as the dimensions object, or `false` when disabled.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ImageOptimizeSetting {
    Enabled(ImageOptimize),
    Disabled(bool),
}

impl From<Option<ImageOptimize>> for ImageOptimizeSetting {
    fn from(value: Option<ImageOptimize>) -> Self {
        match value {
            Some(optimize) => ImageOptimizeSetting::Enabled(optimize),
            None => ImageOptimizeSetting::Disabled(false),
        }
    }
}

impl JobPayload {
    /// Fails without side effects if `attempt_ids` is empty.
    pub fn build(
        wstoken: &str,
        task_id: i64,
        callback_base: &str,
        settings: &JobSettings,
        attempt_ids: &[i64],
    ) -> Result<Self, WorkerError> {
        if attempt_ids.is_empty() {
            return Err(WorkerError::Precondition(
                "No attempt IDs provided for job creation".to_string(),
            ));
        }

        Ok(Self {
            api_version: API_VERSION,
            taskid: task_id,
            moodle_api: CallbackApi::new(wstoken, callback_base),
            job: JobBlock {
                attemptids: attempt_ids.to_vec(),
                report_sections: settings.sections.to_key_map(),
                paper_format: settings.paper_format,
                foldername_pattern: settings.foldername_pattern.clone(),
                filename_pattern: settings.filename_pattern.clone(),
                image_optimize: settings.image_optimize.into(),
                fetch_metadata: true,
                fetch_attachments: settings.sections.is_enabled(ReportSection::Attachments),
                keep_html_files: settings.keep_html_files,
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn settings() -> JobSettings {
        JobSettings::from_map(&JobSettings::default_map()).unwrap()
    }

    #[test]
    fn test_empty_attempts_is_precondition_error() {
        let result = JobPayload::build("tok", 1, "https://moodle.example", &settings(), &[]);
        assert!(matches!(result, Err(WorkerError::Precondition(_))));
    }

    #[test]
    fn test_payload_shape() {
        let payload =
            JobPayload::build("tok", 12, "https://moodle.example/", &settings(), &[3, 5]).unwrap();
        let value = serde_json::to_value(&payload).unwrap();

        assert_eq!(value["api_version"], json!(1));
        assert_eq!(value["taskid"], json!(12));
        assert_eq!(
            value["moodle_api"],
            json!({
                "wstoken": "tok",
                "base_url": "https://moodle.example",
                "webservice_url": "https://moodle.example/webservice/rest/server.php",
                "upload_url": "https://moodle.example/webservice/upload.php",
            })
        );
        assert_eq!(value["job"]["attemptids"], json!([3, 5]));
        assert_eq!(value["job"]["paper_format"], json!("A4"));
        assert_eq!(value["job"]["image_optimize"], json!(false));
        assert_eq!(value["job"]["fetch_metadata"], json!(true));
        assert_eq!(value["job"]["fetch_attachments"], json!(true));
        assert_eq!(value["job"]["keep_html_files"], json!(false));
        assert_eq!(value["job"]["report_sections"]["rightanswer"], json!(true));
        assert_eq!(
            value["job"]["report_sections"].as_object().unwrap().len(),
            ReportSection::ALL.len()
        );
    }

    #[test]
    fn test_image_optimize_block() {
        let mut settings = settings();
        settings.image_optimize = Some(ImageOptimize {
            width: 800,
            height: 600,
            quality: 70,
        });
        settings.sections.set(ReportSection::Attachments, false);
        let payload = JobPayload::build("tok", 1, "https://m.example", &settings, &[1]).unwrap();
        let value = serde_json::to_value(&payload).unwrap();
        assert_eq!(
            value["job"]["image_optimize"],
            json!({"width": 800, "height": 600, "quality": 70})
        );
        assert_eq!(value["job"]["fetch_attachments"], json!(false));
    }
}
