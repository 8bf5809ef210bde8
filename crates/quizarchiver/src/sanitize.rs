//! Helpers for sanitizing data before it enters log lines and span attributes.
//!
//! Webservice tokens authorize writes to a task, so they never appear in
//! logs in full. URLs are logged without query strings or userinfo.

use url::Url;

/// Keeps the first four characters of a token and masks the rest.
///
/// - `3f2a9c...` → `3f2a****`
/// - tokens of four characters or fewer are masked completely
pub fn redact_token(token: &str) -> String {
    let visible: String = token.chars().take(4).collect();
    if token.chars().count() <= 4 {
        "****".to_string()
    } else {
        format!("{}****", visible)
    }
}

/// Strips userinfo, query and fragment from a URL.
///
/// - `https://user:pw@host/a.png?token=x#y` → `https://host/a.png`
/// - data URIs are reduced to their media type
/// - unparsable input is cut at the first `?` or `#`
pub fn redact_url(raw: &str) -> String {
    if let Some(rest) = raw.strip_prefix("data:") {
        let media = rest.split([',', ';']).next().unwrap_or_default();
        return format!("data:{},…", media);
    }

    match Url::parse(raw) {
        Ok(mut url) => {
            // Setting these cannot fail for http(s) URLs; ignore the rest.
            let _ = url.set_username("");
            let _ = url.set_password(None);
            url.set_query(None);
            url.set_fragment(None);
            url.to_string()
        }
        Err(_) => raw
            .split(['?', '#'])
            .next()
            .unwrap_or_default()
            .to_string(),
    }
}
