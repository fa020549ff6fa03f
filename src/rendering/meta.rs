use std::collections::HashMap;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::AppError;

/// Largest HTML body read when extracting metadata.
const MAX_HTML_BYTES: usize = 1024 * 1024;

static TITLE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<title[^>]*>(.*?)</title>").unwrap());
static TAG_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<(link|meta)\b([^>]*)>").unwrap());
static ATTR_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"([a-zA-Z_:-]+)\s*=\s*(?:"([^"]*)"|'([^']*)'|([^\s"'>]+))"#).unwrap()
});

/// Metadata of an external page, used to prefill a submission.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PageMeta {
    pub url: String,
    pub title: String,
    pub description: String,
    /// Absolute URL of the chosen icon.
    pub icon: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
}

/// An icon declared by a `<link rel="...icon...">` tag.
#[derive(Debug, Clone, PartialEq)]
pub struct IconCandidate {
    pub href: String,
    pub rel: String,
    pub mime: Option<String>,
    /// Largest dimension declared in `sizes`, if any.
    pub size: Option<u32>,
}

impl IconCandidate {
    fn is_svg(&self) -> bool {
        self.mime.as_deref() == Some("image/svg+xml")
            || self.href.to_ascii_lowercase().ends_with(".svg")
            || self.size.is_none() && self.rel.contains("mask-icon")
    }

    /// Higher is better: apple-touch-icon, then sized icons, then svg, then anything.
    fn rank(&self) -> (u8, u32) {
        let size = self.size.unwrap_or(0);
        if self.rel.contains("apple-touch-icon") {
            (4, size)
        } else if self.size.is_some() {
            (3, size)
        } else if self.is_svg() {
            (2, 0)
        } else {
            (1, 0)
        }
    }
}

/// Pick the best icon for a page, resolved against `base`.
///
/// Falls back to `og:image`, then to `/favicon.ico` on the page's origin.
pub fn choose_icon(candidates: &[IconCandidate], og_image: Option<&str>, base: &Url) -> String {
    let best = candidates
        .iter()
        .enumerate()
        // Earlier declarations win ties.
        .max_by_key(|(i, c)| (c.rank(), std::cmp::Reverse(*i)))
        .map(|(_, c)| c.href.as_str())
        .or(og_image);

    best.and_then(|href| base.join(href).ok())
        .or_else(|| base.join("/favicon.ico").ok())
        .map(|u| u.to_string())
        .unwrap_or_default()
}

/// Extract title, description and icon from an HTML document.
pub fn extract_meta(html: &str, base: &Url) -> PageMeta {
    let mut metas: HashMap<String, String> = HashMap::new();
    let mut icons = Vec::new();

    for tag in TAG_RE.captures_iter(html) {
        let attrs = parse_attrs(&tag[2]);
        if tag[1].eq_ignore_ascii_case("meta") {
            let key = attrs.get("property").or_else(|| attrs.get("name"));
            if let (Some(key), Some(content)) = (key, attrs.get("content")) {
                metas
                    .entry(key.to_ascii_lowercase())
                    .or_insert_with(|| decode_entities(content));
            }
        } else if let (Some(rel), Some(href)) = (attrs.get("rel"), attrs.get("href")) {
            let rel = rel.to_ascii_lowercase();
            if rel.split_whitespace().any(|r| r.contains("icon")) {
                icons.push(IconCandidate {
                    href: decode_entities(href),
                    rel,
                    mime: attrs.get("type").map(|t| t.to_ascii_lowercase()),
                    size: attrs.get("sizes").and_then(|s| parse_sizes(s)),
                });
            }
        }
    }

    let title = metas
        .get("og:title")
        .cloned()
        .or_else(|| {
            TITLE_RE
                .captures(html)
                .map(|c| decode_entities(c[1].trim()))
        })
        .unwrap_or_default();

    let description = metas
        .get("description")
        .or_else(|| metas.get("og:description"))
        .cloned()
        .unwrap_or_default();

    let image = metas
        .get("og:image")
        .and_then(|img| base.join(img).ok())
        .map(|u| u.to_string());

    PageMeta {
        url: base.to_string(),
        title,
        description,
        icon: choose_icon(&icons, metas.get("og:image").map(String::as_str), base),
        image,
    }
}

/// Fetch `url` and extract its metadata.
pub async fn fetch_meta(http: &reqwest::Client, url: &str) -> Result<PageMeta, AppError> {
    let parsed = parse_http_url(url)?;

    let response = http
        .get(parsed.clone())
        .header(reqwest::header::ACCEPT, "text/html,application/xhtml+xml")
        .send()
        .await
        .map_err(|e| AppError::Upstream(format!("Failed to fetch '{url}': {e}")))?;

    if !response.status().is_success() {
        return Err(AppError::Upstream(format!(
            "Fetching '{url}' returned {}",
            response.status()
        )));
    }

    // Redirects may land elsewhere; relative icon paths resolve against the final URL.
    let final_url = response.url().clone();
    let bytes = read_capped(response, MAX_HTML_BYTES)
        .await
        .map_err(|e| AppError::Upstream(format!("Failed to read '{url}': {e}")))?;
    let html = String::from_utf8_lossy(&bytes);

    Ok(extract_meta(&html, &final_url))
}

/// Read at most `limit` body bytes, dropping the connection once reached.
async fn read_capped(mut response: reqwest::Response, limit: usize) -> reqwest::Result<Vec<u8>> {
    let mut buf = Vec::new();
    while let Some(chunk) = response.chunk().await? {
        let room = limit - buf.len();
        buf.extend_from_slice(&chunk[..chunk.len().min(room)]);
        if buf.len() >= limit {
            break;
        }
    }
    Ok(buf)
}

/// Parse and require an absolute http(s) URL.
pub fn parse_http_url(raw: &str) -> Result<Url, AppError> {
    let parsed = Url::parse(raw.trim())
        .map_err(|e| AppError::BadRequest(format!("Invalid URL '{raw}': {e}")))?;
    match parsed.scheme() {
        "http" | "https" => Ok(parsed),
        other => Err(AppError::BadRequest(format!(
            "Unsupported URL scheme '{other}'"
        ))),
    }
}

fn parse_attrs(raw: &str) -> HashMap<String, String> {
    ATTR_RE
        .captures_iter(raw)
        .map(|c| {
            let value = c
                .get(2)
                .or_else(|| c.get(3))
                .or_else(|| c.get(4))
                .map(|m| m.as_str())
                .unwrap_or("");
            (c[1].to_ascii_lowercase(), value.to_string())
        })
        .collect()
}

/// `"16x16 180x180"` → `Some(180)`; `"any"` → `None`.
fn parse_sizes(raw: &str) -> Option<u32> {
    raw.split_whitespace()
        .filter_map(|size| {
            let (w, h) = size.to_ascii_lowercase().split_once('x').map(|(w, h)| {
                (w.parse::<u32>().ok(), h.parse::<u32>().ok())
            })?;
            Some(w?.max(h?))
        })
        .max()
}

fn decode_entities(raw: &str) -> String {
    raw.replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&#x27;", "'")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&amp;", "&")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base() -> Url {
        Url::parse("https://vitejs.dev/guide/").unwrap()
    }

    fn candidate(href: &str, rel: &str, size: Option<u32>) -> IconCandidate {
        IconCandidate {
            href: href.to_string(),
            rel: rel.to_string(),
            mime: None,
            size,
        }
    }

    #[test]
    fn test_extracts_title_and_description() {
        let html = r#"<html><head>
            <title> Vite &amp; Friends </title>
            <meta name="description" content="Next Generation Frontend Tooling">
            <link rel="icon" href="/logo.svg" type="image/svg+xml">
        </head></html>"#;
        let meta = extract_meta(html, &base());
        assert_eq!(meta.title, "Vite & Friends");
        assert_eq!(meta.description, "Next Generation Frontend Tooling");
        assert_eq!(meta.icon, "https://vitejs.dev/logo.svg");
        assert!(meta.image.is_none());
    }

    #[test]
    fn test_og_tags_used() {
        let html = r#"<meta property="og:title" content="OG Title">
            <meta property='og:description' content='From OG'>
            <meta property="og:image" content="img/card.png">
            <title>Plain</title>"#;
        let meta = extract_meta(html, &base());
        assert_eq!(meta.title, "OG Title");
        assert_eq!(meta.description, "From OG");
        assert_eq!(meta.image.as_deref(), Some("https://vitejs.dev/guide/img/card.png"));
        assert_eq!(meta.icon, "https://vitejs.dev/guide/img/card.png");
    }

    #[test]
    fn test_apple_touch_icon_preferred() {
        let icons = vec![
            candidate("/favicon-32.png", "icon", Some(32)),
            candidate("/logo.svg", "icon", None),
            candidate("/apple.png", "apple-touch-icon", Some(180)),
        ];
        assert_eq!(choose_icon(&icons, None, &base()), "https://vitejs.dev/apple.png");
    }

    #[test]
    fn test_largest_sized_icon_beats_svg() {
        let icons = vec![
            candidate("/logo.svg", "icon", None),
            candidate("/16.png", "icon", Some(16)),
            candidate("/192.png", "icon", Some(192)),
        ];
        assert_eq!(choose_icon(&icons, None, &base()), "https://vitejs.dev/192.png");
    }

    #[test]
    fn test_svg_beats_unsized() {
        let icons = vec![
            candidate("/favicon.png", "shortcut icon", None),
            candidate("/logo.svg", "icon", None),
        ];
        assert_eq!(choose_icon(&icons, None, &base()), "https://vitejs.dev/logo.svg");
    }

    #[test]
    fn test_favicon_fallback() {
        assert_eq!(choose_icon(&[], None, &base()), "https://vitejs.dev/favicon.ico");
    }

    #[test]
    fn test_parse_sizes() {
        assert_eq!(parse_sizes("16x16 32x32"), Some(32));
        assert_eq!(parse_sizes("180X180"), Some(180));
        assert_eq!(parse_sizes("any"), None);
    }

    #[test]
    fn test_parse_http_url() {
        assert!(parse_http_url("https://example.com").is_ok());
        assert!(matches!(
            parse_http_url("ftp://example.com"),
            Err(AppError::BadRequest(_))
        ));
        assert!(matches!(parse_http_url("not a url"), Err(AppError::BadRequest(_))));
    }
}
