//! Replaces image sources with `data:` URIs.
//!
//! Each image is resolved on its own. A failure is recorded on the outcome
//! and never aborts the page.

use std::path::PathBuf;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use reqwest::header::CONTENT_TYPE;
use reqwest::StatusCode;
use url::Url;

use crate::config::ArchiverConfig;
use crate::error::ReportError;
use crate::host::FileStore;
use crate::model::FileRef;
use crate::report::url::{
    clean_filename, ensure_absolute_url, extension, is_allowed_mime, is_theme_image, is_web_url,
    match_pluginfile, match_stackplot, mime_for_extension, strip_query_and_fragment,
    PluginfileMatch, UrlType,
};
use crate::sanitize::redact_url;

pub const ATTR_ORIGINAL_SOURCE: &str = "x-original-source";
pub const ATTR_URL_TYPE: &str = "x-url-type";
pub const ATTR_NOTICE: &str = "x-debug-notice";
pub const ATTR_INLINING_FAILED: &str = "x-debug-inlining-failed";
pub const ATTR_INTERNAL_WITHOUT_HANDLER: &str = "x-debug-internal-url-without-handler";

/// What happened to one `<img>`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InlineOutcome {
    pub original_source: Option<String>,
    pub url_type: Option<UrlType>,
    /// `data:` URI replacing `src`, set on success only.
    pub data_uri: Option<String>,
    pub notice: Option<String>,
    pub internal_without_handler: bool,
}

impl InlineOutcome {
    pub fn is_inlined(&self) -> bool {
        self.data_uri.is_some()
    }

    fn fail(mut self, notice: &str) -> Self {
        self.notice = Some(notice.to_string());
        self.data_uri = None;
        self
    }

    /// Attributes to set on the element, in order. `src` is not included.
    pub fn attributes(&self) -> Vec<(&'static str, String)> {
        let mut attrs = Vec::new();
        if let Some(src) = &self.original_source {
            attrs.push((ATTR_ORIGINAL_SOURCE, src.clone()));
        }
        if let Some(url_type) = self.url_type {
            attrs.push((ATTR_URL_TYPE, url_type.as_str().to_string()));
        }
        if self.internal_without_handler {
            attrs.push((ATTR_INTERNAL_WITHOUT_HANDLER, String::new()));
        }
        if let Some(notice) = &self.notice {
            attrs.push((ATTR_NOTICE, notice.clone()));
        }
        if !self.is_inlined() {
            attrs.push((ATTR_INLINING_FAILED, "true".to_string()));
        }
        attrs
    }
}

pub struct ImageInliner<'a> {
    files: &'a dyn FileStore,
    http: reqwest::Client,
    /// Public site URL without trailing slash.
    wwwroot: String,
    internal_wwwroot: Option<String>,
    /// Effective base ending in `/`. Internal URLs start with it.
    base: String,
    dataroot: PathBuf,
}

impl<'a> ImageInliner<'a> {
    pub fn new(files: &'a dyn FileStore, config: &ArchiverConfig) -> Result<Self, ReportError> {
        let http = reqwest::Client::builder()
            .connect_timeout(config.connect_timeout())
            .timeout(config.request_timeout())
            .build()
            .map_err(|e| ReportError::HttpClient(e.to_string()))?;
        Ok(Self::with_client(files, config, http))
    }

    pub fn with_client(
        files: &'a dyn FileStore,
        config: &ArchiverConfig,
        http: reqwest::Client,
    ) -> Self {
        let wwwroot = config.wwwroot().to_string();
        let internal_wwwroot = config
            .internal_wwwroot
            .as_deref()
            .map(|u| u.trim().trim_end_matches('/').to_string())
            .filter(|u| !u.is_empty());

        let raw_base = format!("{}/", internal_wwwroot.as_deref().unwrap_or(&wwwroot));
        let base = Url::parse(&raw_base)
            .map(|u| u.to_string())
            .unwrap_or(raw_base);

        Self {
            files,
            http,
            wwwroot,
            internal_wwwroot,
            base,
            dataroot: config.dataroot.clone(),
        }
    }

    /// Resolves one image source.
    pub async fn inline(&self, src: Option<&str>) -> InlineOutcome {
        let mut outcome = InlineOutcome::default();

        let Some(src) = src.filter(|s| !s.is_empty()) else {
            return outcome.fail("no source present");
        };
        outcome.original_source = Some(src.to_string());

        let mut img_src = strip_query_and_fragment(src).to_string();
        if let Some(internal) = &self.internal_wwwroot {
            img_src = img_src.replace(&self.wwwroot, internal);
        }

        let url = match ensure_absolute_url(&img_src, &self.base) {
            Some(url) if is_web_url(&url) => url,
            _ => return outcome.fail("not a web URL"),
        };

        let mut mime = extension(&url)
            .as_deref()
            .and_then(mime_for_extension)
            .map(str::to_string);
        if mime.is_none() && !is_theme_image(&url) {
            return outcome.fail("image type not allowed");
        }

        let mut data: Option<Vec<u8>> = None;

        if url.starts_with(&self.base) {
            match match_pluginfile(&url) {
                PluginfileMatch::File(file) => {
                    outcome.url_type = Some(UrlType::Pluginfile);
                    let reference = FileRef::new(
                        file.context_id,
                        file.component,
                        file.filearea,
                        file.item_id,
                        "/",
                        file.filename,
                    );
                    match self.read_stored(&reference) {
                        Some(bytes) => data = Some(bytes),
                        None => return outcome.fail("moodledata file not found"),
                    }
                }
                PluginfileMatch::MalformedQuestionUrl => {
                    outcome.url_type = Some(UrlType::PluginfileQuestionAndQtype);
                    return outcome.fail("question file URL without usage and slot");
                }
                PluginfileMatch::NoMatch => {
                    if let Some(filename) = match_stackplot(&url) {
                        outcome.url_type = Some(UrlType::StackPlot);
                        let path = self
                            .dataroot
                            .join("stack")
                            .join("plots")
                            .join(clean_filename(&filename));
                        match tokio::fs::read(&path).await {
                            Ok(bytes) => data = Some(bytes),
                            Err(e) => {
                                log::debug!("Cannot read plot file {}: {}", path.display(), e);
                                return outcome.fail("stack plot file not readable");
                            }
                        }
                    } else {
                        outcome.internal_without_handler = true;
                    }
                }
            }
        }

        if data.is_none() {
            outcome.url_type = Some(if is_theme_image(&url) {
                UrlType::ThemeImage
            } else {
                UrlType::Generic
            });

            let (bytes, content_type) = match self.fetch(&url).await {
                Some(response) => response,
                None => return outcome.fail("HTTP request failed"),
            };

            if mime.is_none() {
                match content_type.filter(|ct| is_allowed_mime(ct)) {
                    Some(ct) => {
                        mime = Some(ct.split(';').next().unwrap_or_default().trim().to_string())
                    }
                    None => {
                        return outcome.fail("image type from response header is not allowed")
                    }
                }
            }
            data = Some(bytes);
        }

        let (Some(bytes), Some(mime)) = (data.filter(|d| !d.is_empty()), mime) else {
            return outcome.fail("no image data");
        };

        outcome.data_uri = Some(format!("data:{};base64,{}", mime, STANDARD.encode(bytes)));
        log::debug!(
            "Inlined image {} as {}",
            redact_url(src),
            outcome.url_type.map(UrlType::as_str).unwrap_or_default()
        );
        outcome
    }

    fn read_stored(&self, reference: &FileRef) -> Option<Vec<u8>> {
        match self.files.get_file(reference) {
            Ok(Some(file)) => match self.files.read(&file) {
                Ok(bytes) => Some(bytes),
                Err(e) => {
                    log::warn!("Stored file {:?} is not readable: {}", reference, e);
                    None
                }
            },
            Ok(None) => None,
            Err(e) => {
                log::debug!("File lookup failed for {:?}: {}", reference, e);
                None
            }
        }
    }

    /// GET with body and content type on HTTP 200, `None` otherwise.
    async fn fetch(&self, url: &str) -> Option<(Vec<u8>, Option<String>)> {
        let response = match self.http.get(url).send().await {
            Ok(response) => response,
            Err(e) => {
                log::debug!("Image request to {} failed: {}", redact_url(url), e);
                return None;
            }
        };

        if response.status() != StatusCode::OK {
            log::debug!(
                "Image request to {} returned HTTP {}",
                redact_url(url),
                response.status()
            );
            return None;
        }

        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);

        match response.bytes().await {
            Ok(bytes) => Some((bytes.to_vec(), content_type)),
            Err(e) => {
                log::debug!("Reading image body from {} failed: {}", redact_url(url), e);
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::FileSystemStore;
    use tempfile::TempDir;

    fn config(dataroot: &std::path::Path) -> ArchiverConfig {
        let mut config = ArchiverConfig::new("https://moodle.example");
        config.dataroot = dataroot.to_path_buf();
        config
    }

    #[tokio::test]
    async fn test_missing_source() {
        let temp = TempDir::new().unwrap();
        let store = FileSystemStore::new(temp.path());
        let inliner = ImageInliner::new(&store, &config(temp.path())).unwrap();

        let outcome = inliner.inline(None).await;
        assert_eq!(outcome.notice.as_deref(), Some("no source present"));
        assert!(outcome.original_source.is_none());
        assert!(outcome
            .attributes()
            .contains(&(ATTR_INLINING_FAILED, "true".to_string())));
    }

    #[tokio::test]
    async fn test_rejects_non_web_and_disallowed_types() {
        let temp = TempDir::new().unwrap();
        let store = FileSystemStore::new(temp.path());
        let inliner = ImageInliner::new(&store, &config(temp.path())).unwrap();

        let outcome = inliner.inline(Some("file:///etc/hosts.png")).await;
        assert_eq!(outcome.notice.as_deref(), Some("not a web URL"));

        let outcome = inliner.inline(Some("/pluginfile.php/1/mod_quiz/intro/script.js")).await;
        assert_eq!(outcome.notice.as_deref(), Some("image type not allowed"));
        assert_eq!(
            outcome.original_source.as_deref(),
            Some("/pluginfile.php/1/mod_quiz/intro/script.js")
        );
    }

    #[tokio::test]
    async fn test_pluginfile_from_store() {
        let temp = TempDir::new().unwrap();
        let store = FileSystemStore::new(temp.path().join("files"));
        store
            .put(&FileRef::new(42, "mod_quiz", "attachments", 7, "/", "essay.png"), b"PNG")
            .unwrap();
        let inliner = ImageInliner::new(&store, &config(temp.path())).unwrap();

        let outcome = inliner
            .inline(Some("/pluginfile.php/42/mod_quiz/attachments/7/essay.png?forcedownload=1"))
            .await;
        assert_eq!(outcome.url_type, Some(UrlType::Pluginfile));
        assert_eq!(outcome.data_uri.as_deref(), Some("data:image/png;base64,UE5H"));
        assert!(!outcome.attributes().iter().any(|(k, _)| *k == ATTR_INLINING_FAILED));
    }

    #[tokio::test]
    async fn test_pluginfile_missing() {
        let temp = TempDir::new().unwrap();
        let store = FileSystemStore::new(temp.path());
        let inliner = ImageInliner::new(&store, &config(temp.path())).unwrap();

        let outcome = inliner
            .inline(Some("https://moodle.example/pluginfile.php/42/mod_quiz/attachments/7/none.png"))
            .await;
        assert_eq!(outcome.notice.as_deref(), Some("moodledata file not found"));
        assert_eq!(outcome.url_type, Some(UrlType::Pluginfile));
    }

    #[tokio::test]
    async fn test_malformed_question_url() {
        let temp = TempDir::new().unwrap();
        let store = FileSystemStore::new(temp.path());
        let inliner = ImageInliner::new(&store, &config(temp.path())).unwrap();

        let outcome = inliner
            .inline(Some("/pluginfile.php/9/qtype_essay/graderinfo/g.png"))
            .await;
        assert_eq!(outcome.url_type, Some(UrlType::PluginfileQuestionAndQtype));
        assert!(!outcome.is_inlined());
        assert_eq!(
            outcome.notice.as_deref(),
            Some("question file URL without usage and slot")
        );
        let attrs = outcome.attributes();
        assert!(attrs.iter().any(|(k, _)| *k == ATTR_NOTICE));
        assert!(attrs.contains(&(ATTR_INLINING_FAILED, "true".to_string())));
    }

    #[tokio::test]
    async fn test_stack_plot_from_dataroot() {
        let temp = TempDir::new().unwrap();
        let plots = temp.path().join("stack").join("plots");
        std::fs::create_dir_all(&plots).unwrap();
        std::fs::write(plots.join("plot-1.svg"), b"<svg/>").unwrap();
        let store = FileSystemStore::new(temp.path());
        let inliner = ImageInliner::new(&store, &config(temp.path())).unwrap();

        let outcome = inliner
            .inline(Some("/question/type/stack/plot.php/plot-1.svg"))
            .await;
        assert_eq!(outcome.url_type, Some(UrlType::StackPlot));
        assert!(outcome
            .data_uri
            .as_deref()
            .unwrap()
            .starts_with("data:image/svg+xml;base64,"));

        let outcome = inliner
            .inline(Some("/question/type/stack/plot.php/missing.png"))
            .await;
        assert_eq!(outcome.notice.as_deref(), Some("stack plot file not readable"));
    }

    #[tokio::test]
    async fn test_internal_wwwroot_rewrites_public_urls() {
        let temp = TempDir::new().unwrap();
        let store = FileSystemStore::new(temp.path());
        store
            .put(&FileRef::new(3, "mod_page", "content", 0, "/", "a.gif"), b"GIF")
            .unwrap();
        let mut config = config(temp.path());
        config.internal_wwwroot = Some("http://moodle.internal/".to_string());
        let inliner = ImageInliner::new(&store, &config).unwrap();

        let outcome = inliner
            .inline(Some("https://moodle.example/pluginfile.php/3/mod_page/content/a.gif"))
            .await;
        assert_eq!(outcome.data_uri.as_deref(), Some("data:image/gif;base64,R0lG"));
    }
}
