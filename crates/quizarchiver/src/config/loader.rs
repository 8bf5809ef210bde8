use std::path::Path;

use url::Url;

use crate::config::schema::ArchiverConfig;
use crate::error::ConfigError;

pub fn load_config<P: AsRef<Path>>(path: P) -> Result<ArchiverConfig, ConfigError> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadFile {
        path: path.to_path_buf(),
        source: e,
    })?;

    load_config_from_str(&content)
}

pub fn load_config_from_str(content: &str) -> Result<ArchiverConfig, ConfigError> {
    let config: ArchiverConfig = serde_json::from_str(content)?;

    validate_config(&config)?;

    Ok(config)
}

fn validate_config(config: &ArchiverConfig) -> Result<(), ConfigError> {
    validate_http_url("site_url", &config.site_url)?;

    if let Some(internal) = config.internal_wwwroot.as_deref() {
        if !internal.trim().is_empty() {
            validate_http_url("internal_wwwroot", internal)?;
        }
    }

    if let Some(worker) = config.worker_url.as_deref() {
        if !worker.trim().is_empty() {
            validate_http_url("worker_url", worker)?;
        }
    }

    if config.worker_connect_timeout_secs == 0 || config.worker_request_timeout_secs == 0 {
        return Err(ConfigError::Validation {
            message: "Worker timeouts must be greater than zero".to_string(),
        });
    }

    if config.token_lifetime_secs <= 0 {
        return Err(ConfigError::Validation {
            message: format!(
                "token_lifetime_secs must be positive, got {}",
                config.token_lifetime_secs
            ),
        });
    }

    Ok(())
}

fn validate_http_url(field: &str, value: &str) -> Result<(), ConfigError> {
    let url = Url::parse(value).map_err(|e| ConfigError::Validation {
        message: format!("{} '{}' is not a valid URL: {}", field, value, e),
    })?;

    match url.scheme() {
        "http" | "https" => Ok(()),
        other => Err(ConfigError::Validation {
            message: format!("{} must use http or https, got '{}'", field, other),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_load_minimal_config() {
        let config = load_config_from_str(r#"{"site_url": "https://moodle.example"}"#).unwrap();
        assert_eq!(config.wwwroot(), "https://moodle.example");
        assert!(config.worker_url.is_none());
    }

    #[test]
    fn test_load_from_file() {
        let mut file = NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{
                "site_url": "https://moodle.example/",
                "worker_url": "http://127.0.0.1:8080",
                "webservices_enabled": true,
                "webservice_protocols": ["rest"],
                "logging": {{"level": "debug", "json": true}}
            }}"#
        )
        .unwrap();

        let config = load_config(file.path()).unwrap();
        assert!(config.is_ready());
        assert_eq!(config.logging.level, "debug");
        assert!(config.logging.json);
    }

    #[test]
    fn test_missing_file() {
        let result = load_config("/nonexistent/quizarchiver.json");
        assert!(matches!(result, Err(ConfigError::ReadFile { .. })));
    }

    #[test]
    fn test_rejects_invalid_site_url() {
        let result = load_config_from_str(r#"{"site_url": "ftp://moodle.example"}"#);
        assert!(matches!(result, Err(ConfigError::Validation { .. })));

        let result = load_config_from_str(r#"{"site_url": "not a url"}"#);
        assert!(matches!(result, Err(ConfigError::Validation { .. })));
    }

    #[test]
    fn test_rejects_zero_timeouts() {
        let result = load_config_from_str(
            r#"{"site_url": "https://moodle.example", "worker_connect_timeout_secs": 0}"#,
        );
        assert!(matches!(result, Err(ConfigError::Validation { .. })));
    }

    #[test]
    fn test_invalid_json() {
        let result = load_config_from_str("{ nope");
        assert!(matches!(result, Err(ConfigError::ParseJson(_))));
    }
}
