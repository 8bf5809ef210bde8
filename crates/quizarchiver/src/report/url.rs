//! URL dialects found in image sources of rendered attempts.

use std::sync::LazyLock;

use regex::Regex;
use url::Url;

/// Plot images of the STACK question type, stored below the data directory.
pub static RE_STACKPLOT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^(?P<wwwroot>https?://.+)?(/question/type/stack/plot\.php/)(?P<filename>[^/#?&]+\.(png|svg))$",
    )
    .unwrap()
});

/// Files served from the file store.
pub static RE_PLUGINFILE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^(?P<wwwroot>https?://.+)?(/pluginfile\.php)(?P<fullpath>/(?P<contextid>[^/]+)/(?P<component>[^/]+)/(?P<filearea>[^/]+)(/(?P<itemid>\d+))?(/(?P<args>.*))?/(?P<filename>[^/?&#]+))$",
    )
    .unwrap()
});

/// Question and question type files carry the usage and slot before the item id.
pub static RE_PLUGINFILE_QUESTION_AND_QTYPE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^(?P<wwwroot>https?://.+)?(/pluginfile\.php)(?P<fullpath>/(?P<contextid>[^/]+)/(?P<component>[^/]+)/(?P<filearea>[^/]+)/(?P<questionbank_id>[^/]+)/(?P<question_slot>[^/]+)/(?P<itemid>\d+)/(?P<filename>[^/?&#]+))$",
    )
    .unwrap()
});

/// Theme images. These may omit a file extension.
pub static RE_THEME_IMAGE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^(?P<wwwroot>https?://.+)?(/theme/image\.php/)(?P<themename>[^/]+)/(?P<component>[^/]+)/(?P<rev>[^/]+)/(?P<image>.+)$",
    )
    .unwrap()
});

/// Image types that may be inlined, by lowercase file extension.
pub const ALLOWED_IMAGE_TYPES: &[(&str, &str)] = &[
    ("png", "image/png"),
    ("jpg", "image/jpeg"),
    ("jpeg", "image/jpeg"),
    ("svg", "image/svg+xml"),
    ("gif", "image/gif"),
    ("webp", "image/webp"),
    ("bmp", "image/bmp"),
    ("ico", "image/x-icon"),
    ("tiff", "image/tiff"),
];

/// Value of the `x-url-type` attribute set on processed images.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UrlType {
    Pluginfile,
    PluginfileQuestionAndQtype,
    StackPlot,
    ThemeImage,
    Generic,
}

impl UrlType {
    pub fn as_str(self) -> &'static str {
        match self {
            UrlType::Pluginfile => "MOODLE_URL_PLUGINFILE",
            UrlType::PluginfileQuestionAndQtype => "MOODLE_URL_PLUGINFILE_QUESTION_AND_QTYPE",
            UrlType::StackPlot => "MOODLE_URL_STACKPLOT",
            UrlType::ThemeImage => "MOODLE_URL_THEME_IMAGE",
            UrlType::Generic => "GENERIC",
        }
    }
}

/// Fields of a file store URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PluginfileUrl {
    pub context_id: i64,
    pub component: String,
    pub filearea: String,
    pub item_id: i64,
    /// Percent-decoded file name.
    pub filename: String,
}

/// Result of matching an absolute URL against the file store dialects.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PluginfileMatch {
    NoMatch,
    /// Question file URL without usage and slot segments.
    MalformedQuestionUrl,
    File(PluginfileUrl),
}

/// Cuts the URL at the first `?`, `&` or `#`.
pub fn strip_query_and_fragment(src: &str) -> &str {
    src.split(['?', '&', '#']).next().unwrap_or_default()
}

/// Resolves `src` against `base`. Absolute URLs are returned unchanged apart
/// from normalization; dot segments are removed.
pub fn ensure_absolute_url(src: &str, base: &str) -> Option<String> {
    if let Ok(url) = Url::parse(src) {
        return Some(url.to_string());
    }
    let base = Url::parse(base).ok()?;
    base.join(src).ok().map(|u| u.to_string())
}

pub fn is_web_url(url: &str) -> bool {
    Url::parse(url)
        .map(|u| matches!(u.scheme(), "http" | "https"))
        .unwrap_or(false)
}

/// Lowercase extension of the last path segment, if any.
pub fn extension(url: &str) -> Option<String> {
    let path = Url::parse(url)
        .map(|u| u.path().to_string())
        .unwrap_or_else(|_| url.to_string());
    let name = path.rsplit('/').next()?;
    let (_, ext) = name.rsplit_once('.')?;
    if ext.is_empty() {
        None
    } else {
        Some(ext.to_ascii_lowercase())
    }
}

pub fn mime_for_extension(ext: &str) -> Option<&'static str> {
    ALLOWED_IMAGE_TYPES
        .iter()
        .find(|(e, _)| *e == ext)
        .map(|(_, mime)| *mime)
}

pub fn is_allowed_mime(mime: &str) -> bool {
    let essence = mime.split(';').next().unwrap_or_default().trim();
    ALLOWED_IMAGE_TYPES
        .iter()
        .any(|(_, allowed)| allowed.eq_ignore_ascii_case(essence))
}

pub fn is_theme_image(url: &str) -> bool {
    RE_THEME_IMAGE.is_match(url)
}

pub fn match_pluginfile(url: &str) -> PluginfileMatch {
    let Some(caps) = RE_PLUGINFILE.captures(url) else {
        return PluginfileMatch::NoMatch;
    };

    let caps = if &caps["component"] == "question" || caps["component"].starts_with("qtype_") {
        match RE_PLUGINFILE_QUESTION_AND_QTYPE.captures(url) {
            Some(caps) => caps,
            None => return PluginfileMatch::MalformedQuestionUrl,
        }
    } else {
        caps
    };

    let Ok(context_id) = caps["contextid"].parse::<i64>() else {
        return PluginfileMatch::NoMatch;
    };
    let item_id = caps
        .name("itemid")
        .and_then(|m| m.as_str().parse::<i64>().ok())
        .unwrap_or(0);

    PluginfileMatch::File(PluginfileUrl {
        context_id,
        component: caps["component"].to_string(),
        filearea: caps["filearea"].to_string(),
        item_id,
        filename: percent_decode(&caps["filename"]),
    })
}

/// Percent-decoded file name of a plot URL.
pub fn match_stackplot(url: &str) -> Option<String> {
    RE_STACKPLOT
        .captures(url)
        .map(|caps| percent_decode(&caps["filename"]))
}

/// Decodes `%XX` escapes and `+`. Invalid escapes are kept verbatim.
pub fn percent_decode(input: &str) -> String {
    let query = format!("x={}", input.replace('&', "%26"));
    url::form_urlencoded::parse(query.as_bytes())
        .next()
        .map(|(_, v)| v.into_owned())
        .unwrap_or_else(|| input.to_string())
}

/// File name safe for use inside a directory: no separators, no dot segments.
pub fn clean_filename(name: &str) -> String {
    let cleaned: String = name
        .chars()
        .filter(|c| !matches!(c, '/' | '\\' | '\0' | ':' | '*' | '?' | '"' | '<' | '>' | '|'))
        .filter(|c| !c.is_control())
        .collect();
    cleaned.trim_start_matches('.').to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strip_query_and_fragment() {
        assert_eq!(strip_query_and_fragment("/a.png?rev=1#x"), "/a.png");
        assert_eq!(strip_query_and_fragment("/a.png&x"), "/a.png");
        assert_eq!(strip_query_and_fragment("/a.png"), "/a.png");
    }

    #[test]
    fn test_ensure_absolute_url() {
        let base = "https://moodle.example/";
        assert_eq!(
            ensure_absolute_url("/pluginfile.php/1/a.png", base).as_deref(),
            Some("https://moodle.example/pluginfile.php/1/a.png")
        );
        assert_eq!(
            ensure_absolute_url("img/./x/../a.png", "https://moodle.example/mod/quiz/").as_deref(),
            Some("https://moodle.example/mod/quiz/img/a.png")
        );
        assert_eq!(
            ensure_absolute_url("?x=1", base).as_deref(),
            Some("https://moodle.example/?x=1")
        );
        assert_eq!(
            ensure_absolute_url("https://cdn.example/pic.jpg", base).as_deref(),
            Some("https://cdn.example/pic.jpg")
        );
    }

    #[test]
    fn test_is_web_url() {
        assert!(is_web_url("https://a.example/x.png"));
        assert!(!is_web_url("file:///etc/passwd"));
        assert!(!is_web_url("data:image/png;base64,AAAA"));
    }

    #[test]
    fn test_extension_and_mime() {
        assert_eq!(extension("https://a.example/b/C.PNG").as_deref(), Some("png"));
        assert_eq!(extension("https://a.example/b/noext"), None);
        assert_eq!(mime_for_extension("jpg"), Some("image/jpeg"));
        assert_eq!(mime_for_extension("exe"), None);
        assert!(is_allowed_mime("image/png; charset=binary"));
        assert!(!is_allowed_mime("text/html"));
    }

    #[test]
    fn test_match_pluginfile_with_itemid() {
        let m = match_pluginfile("https://moodle.example/pluginfile.php/42/mod_quiz/attachments/7/essay%20one.png");
        assert_eq!(
            m,
            PluginfileMatch::File(PluginfileUrl {
                context_id: 42,
                component: "mod_quiz".to_string(),
                filearea: "attachments".to_string(),
                item_id: 7,
                filename: "essay one.png".to_string(),
            })
        );
    }

    #[test]
    fn test_match_pluginfile_without_itemid() {
        match match_pluginfile("https://moodle.example/pluginfile.php/5/mod_page/content/a.png") {
            PluginfileMatch::File(f) => {
                assert_eq!(f.filearea, "content");
                assert_eq!(f.item_id, 0);
                assert_eq!(f.filename, "a.png");
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_match_pluginfile_question() {
        match match_pluginfile(
            "https://moodle.example/pluginfile.php/9/question/questiontext/31/2/15/graph.png",
        ) {
            PluginfileMatch::File(f) => {
                assert_eq!(f.component, "question");
                assert_eq!(f.filearea, "questiontext");
                assert_eq!(f.item_id, 15);
            }
            other => panic!("unexpected {:?}", other),
        }

        assert_eq!(
            match_pluginfile("https://moodle.example/pluginfile.php/9/qtype_essay/graderinfo/g.png"),
            PluginfileMatch::MalformedQuestionUrl
        );
    }

    #[test]
    fn test_match_stackplot_and_theme() {
        assert_eq!(
            match_stackplot("https://moodle.example/question/type/stack/plot.php/plot-1a2b.svg")
                .as_deref(),
            Some("plot-1a2b.svg")
        );
        assert_eq!(match_stackplot("https://moodle.example/question/type/stack/plot.php/x.gif"), None);
        assert!(is_theme_image("https://moodle.example/theme/image.php/boost/core/1700000000/i/grade_correct"));
        assert!(!is_theme_image("https://moodle.example/pix/a.png"));
    }

    #[test]
    fn test_percent_decode() {
        assert_eq!(percent_decode("a%20b+c.png"), "a b c.png");
        assert_eq!(percent_decode("100%25.png"), "100%.png");
    }

    #[test]
    fn test_clean_filename() {
        assert_eq!(clean_filename("../../etc/passwd"), "etcpasswd");
        assert_eq!(clean_filename("plot-1.png"), "plot-1.png");
    }

    #[test]
    fn test_url_type_names() {
        assert_eq!(UrlType::Pluginfile.as_str(), "MOODLE_URL_PLUGINFILE");
        assert_eq!(UrlType::Generic.as_str(), "GENERIC");
    }
}
