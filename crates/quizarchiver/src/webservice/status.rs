use std::fmt;

use serde::{Deserialize, Serialize};

/// Outcome of a webservice call, sent to the worker by name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[allow(non_camel_case_types)]
pub enum WebserviceStatus {
    OK,
    E_TASK_NOT_FOUND,
    E_ACCESS_DENIED,
    E_INVALID_PARAM,
    E_UPDATE_FAILED,
    E_COURSE_NOT_FOUND,
    E_CM_NOT_FOUND,
    E_QUIZ_NOT_FOUND,
    E_ATTEMPT_NOT_FOUND,
    E_INVALID_FOLDERNAME_PATTERN,
    E_INVALID_FILENAME_PATTERN,
    E_INVALID_STATUS,
    E_INVALID_PROGRESS,
    E_ALREADY_COMPLETED,
    E_NO_UPLOAD_EXPECTED,
    E_FILE_NOT_FOUND,
    E_CHECKSUM_MISMATCH,
    E_STORING_FAILED,
}

impl WebserviceStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            WebserviceStatus::OK => "OK",
            WebserviceStatus::E_TASK_NOT_FOUND => "E_TASK_NOT_FOUND",
            WebserviceStatus::E_ACCESS_DENIED => "E_ACCESS_DENIED",
            WebserviceStatus::E_INVALID_PARAM => "E_INVALID_PARAM",
            WebserviceStatus::E_UPDATE_FAILED => "E_UPDATE_FAILED",
            WebserviceStatus::E_COURSE_NOT_FOUND => "E_COURSE_NOT_FOUND",
            WebserviceStatus::E_CM_NOT_FOUND => "E_CM_NOT_FOUND",
            WebserviceStatus::E_QUIZ_NOT_FOUND => "E_QUIZ_NOT_FOUND",
            WebserviceStatus::E_ATTEMPT_NOT_FOUND => "E_ATTEMPT_NOT_FOUND",
            WebserviceStatus::E_INVALID_FOLDERNAME_PATTERN => "E_INVALID_FOLDERNAME_PATTERN",
            WebserviceStatus::E_INVALID_FILENAME_PATTERN => "E_INVALID_FILENAME_PATTERN",
            WebserviceStatus::E_INVALID_STATUS => "E_INVALID_STATUS",
            WebserviceStatus::E_INVALID_PROGRESS => "E_INVALID_PROGRESS",
            WebserviceStatus::E_ALREADY_COMPLETED => "E_ALREADY_COMPLETED",
            WebserviceStatus::E_NO_UPLOAD_EXPECTED => "E_NO_UPLOAD_EXPECTED",
            WebserviceStatus::E_FILE_NOT_FOUND => "E_FILE_NOT_FOUND",
            WebserviceStatus::E_CHECKSUM_MISMATCH => "E_CHECKSUM_MISMATCH",
            WebserviceStatus::E_STORING_FAILED => "E_STORING_FAILED",
        }
    }

    pub fn is_ok(self) -> bool {
        self == WebserviceStatus::OK
    }
}

impl fmt::Display for WebserviceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_serializes_as_name() {
        assert_eq!(
            serde_json::to_string(&WebserviceStatus::E_CHECKSUM_MISMATCH).unwrap(),
            "\"E_CHECKSUM_MISMATCH\""
        );
        assert_eq!(serde_json::to_string(&WebserviceStatus::OK).unwrap(), "\"OK\"");
    }

    #[test]
    fn test_display_matches_serde() {
        let status: WebserviceStatus = serde_json::from_str("\"E_ACCESS_DENIED\"").unwrap();
        assert_eq!(status.to_string(), "E_ACCESS_DENIED");
        assert!(!status.is_ok());
    }
}
