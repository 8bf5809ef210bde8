use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Name of the webservice protocol the worker talks.
pub const REST_PROTOCOL: &str = "rest";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArchiverConfig {
    /// Public base URL of the site (`wwwroot`).
    pub site_url: String,
    /// Base URL the worker should use instead of `site_url`, e.g. inside a private network.
    #[serde(default)]
    pub internal_wwwroot: Option<String>,
    /// Base URL of the archive worker service.
    #[serde(default)]
    pub worker_url: Option<String>,
    /// Data directory of the host. Plot files are read from `{dataroot}/stack/plots`.
    #[serde(default = "default_dataroot")]
    pub dataroot: PathBuf,
    #[serde(default = "default_connect_timeout")]
    pub worker_connect_timeout_secs: u64,
    #[serde(default = "default_request_timeout")]
    pub worker_request_timeout_secs: u64,
    #[serde(default = "default_token_lifetime")]
    pub token_lifetime_secs: i64,
    #[serde(default)]
    pub webservices_enabled: bool,
    #[serde(default)]
    pub webservice_protocols: Vec<String>,
    #[serde(default)]
    pub logging: LoggingConfig,
}

fn default_dataroot() -> PathBuf {
    PathBuf::from("moodledata")
}

fn default_connect_timeout() -> u64 {
    5
}

fn default_request_timeout() -> u64 {
    20
}

fn default_token_lifetime() -> i64 {
    7 * 24 * 60 * 60
}

impl ArchiverConfig {
    pub fn new(site_url: impl Into<String>) -> Self {
        Self {
            site_url: site_url.into(),
            internal_wwwroot: None,
            worker_url: None,
            dataroot: default_dataroot(),
            worker_connect_timeout_secs: default_connect_timeout(),
            worker_request_timeout_secs: default_request_timeout(),
            token_lifetime_secs: default_token_lifetime(),
            webservices_enabled: false,
            webservice_protocols: Vec::new(),
            logging: LoggingConfig::default(),
        }
    }

    /// True once a worker is configured and the REST webservice is reachable for it.
    pub fn is_ready(&self) -> bool {
        let has_worker = self
            .worker_url
            .as_deref()
            .map(|u| !u.trim().is_empty())
            .unwrap_or(false);

        has_worker
            && self.webservices_enabled
            && self
                .webservice_protocols
                .iter()
                .any(|p| p.eq_ignore_ascii_case(REST_PROTOCOL))
    }

    /// Site URL without trailing slashes.
    pub fn wwwroot(&self) -> &str {
        self.site_url.trim_end_matches('/')
    }

    /// Base URL handed to the worker: the internal override if set, else the site URL.
    pub fn worker_callback_base(&self) -> &str {
        match self.internal_wwwroot.as_deref() {
            Some(internal) if !internal.trim().is_empty() => internal.trim_end_matches('/'),
            _ => self.wwwroot(),
        }
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.worker_connect_timeout_secs)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.worker_request_timeout_secs)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_level")]
    pub level: String,
    #[serde(default)]
    pub json: bool,
}

fn default_level() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_level(),
            json: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ready_config() -> ArchiverConfig {
        let mut config = ArchiverConfig::new("https://moodle.example/");
        config.worker_url = Some("http://worker:8080".to_string());
        config.webservices_enabled = true;
        config.webservice_protocols = vec!["rest".to_string()];
        config
    }

    #[test]
    fn test_is_ready_requires_all_conditions() {
        assert!(ready_config().is_ready());

        let mut c = ready_config();
        c.worker_url = Some("  ".to_string());
        assert!(!c.is_ready());

        let mut c = ready_config();
        c.webservices_enabled = false;
        assert!(!c.is_ready());

        let mut c = ready_config();
        c.webservice_protocols = vec!["soap".to_string()];
        assert!(!c.is_ready());
    }

    #[test]
    fn test_worker_callback_base_prefers_internal_wwwroot() {
        let mut c = ready_config();
        assert_eq!(c.worker_callback_base(), "https://moodle.example");
        c.internal_wwwroot = Some("http://moodle/".to_string());
        assert_eq!(c.worker_callback_base(), "http://moodle");
        c.internal_wwwroot = Some(String::new());
        assert_eq!(c.worker_callback_base(), "https://moodle.example");
    }

    #[test]
    fn test_defaults_from_json() {
        let c: ArchiverConfig =
            serde_json::from_str(r#"{"site_url": "https://moodle.example"}"#).unwrap();
        assert_eq!(c.worker_connect_timeout_secs, 5);
        assert_eq!(c.worker_request_timeout_secs, 20);
        assert_eq!(c.logging.level, "info");
        assert!(!c.is_ready());
    }
}
