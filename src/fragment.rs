//! Page fragments: the pre-rendered markup for one PDF page.
//!
//! Fragments arrive from outside the template core, either from
//! [`crate::pipeline::render`] (one `<img>` per rasterised page) or from a
//! directory of `page-N.html` files written by an external converter. The
//! core does not parse them. The one exception is [`extract_body`], which
//! unwraps full HTML documents so they can be nested in a page box.

use crate::error::DeckError;
use crate::model::Page;
use once_cell::sync::Lazy;
use regex::Regex;
use std::path::Path;
use tracing::{debug, warn};

static RE_BODY: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?is)<body\b[^>]*>(.*)</body\s*>").unwrap());

static RE_HEAD: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?is)<head\b[^>]*>.*?</head\s*>").unwrap());

static RE_HTML_WRAPPER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?is)<!doctype[^>]*>|</?html\b[^>]*>").unwrap());

static RE_PAGE_FILE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^page[-_]?(\d+)\.(html?|png|jpe?g|webp|svg)$").unwrap());

/// Return the inner `<body>` markup of a full HTML document.
///
/// Fragments that are already bare markup are returned unchanged. A document
/// without a `<body>` element has its doctype, `<html>` and `<head>`
/// stripped instead.
pub fn extract_body(html: &str) -> &str {
    if let Some(caps) = RE_BODY.captures(html) {
        if let Some(m) = caps.get(1) {
            return m.as_str().trim();
        }
    }
    html
}

/// Like [`extract_body`], but also handles body-less documents.
pub fn unwrap_document(html: &str) -> String {
    if RE_BODY.is_match(html) {
        return extract_body(html).to_string();
    }
    if !RE_HTML_WRAPPER.is_match(html) {
        return html.to_string();
    }
    let without_head = RE_HEAD.replace_all(html, "");
    RE_HTML_WRAPPER
        .replace_all(&without_head, "")
        .trim()
        .to_string()
}

/// Relative path of the rasterised image for a 1-based page.
pub fn page_image_path(page_num: usize) -> String {
    format!("assets/pages/page-{page_num}.png")
}

/// Fragment markup showing a rasterised page image.
///
/// Built through the document model so the `alt` text is escaped like every
/// other attribute.
pub fn image_fragment(page_num: usize, width: u32, height: u32) -> String {
    crate::dom::Element::new("img")
        .class("page-image")
        .attr("src", page_image_path(page_num))
        .attr("alt", format!("Page {page_num}"))
        .attr("width", width)
        .attr("height", height)
        .attr("loading", if page_num <= 2 { "eager" } else { "lazy" })
        .to_html()
}

/// Page number encoded in a page-asset file name such as `page-3.html` or
/// `page_12.png`.
pub fn page_number_from_file_name(name: &str) -> Option<usize> {
    RE_PAGE_FILE
        .captures(name)
        .and_then(|c| c.get(1))
        .and_then(|m| m.as_str().parse().ok())
        .filter(|&n: &usize| n > 0)
}

/// Count distinct page numbers among the page-asset files in `dir`.
///
/// A missing directory counts as zero pages.
pub async fn count_page_assets(dir: &Path) -> Result<usize, DeckError> {
    let mut seen = std::collections::BTreeSet::new();
    let mut entries = match tokio::fs::read_dir(dir).await {
        Ok(e) => e,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(0),
        Err(e) => {
            return Err(DeckError::Internal(format!(
                "Failed to list '{}': {e}",
                dir.display()
            )))
        }
    };
    while let Some(entry) = entries
        .next_entry()
        .await
        .map_err(|e| DeckError::Internal(format!("Failed to list '{}': {e}", dir.display())))?
    {
        if let Some(n) = entry.file_name().to_str().and_then(page_number_from_file_name) {
            seen.insert(n);
        }
    }
    Ok(seen.len())
}

/// Load `page-N.html` fragments (and optional `page-N.txt` text) from `dir`.
///
/// Pages are returned sorted by page number. Gaps are left for the renderer
/// to fill with placeholders.
pub async fn load_fragments_dir(dir: &Path) -> Result<Vec<Page>, DeckError> {
    let mut entries = tokio::fs::read_dir(dir).await.map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            DeckError::FileNotFound {
                path: dir.to_path_buf(),
            }
        } else {
            DeckError::Internal(format!("Failed to list '{}': {e}", dir.display()))
        }
    })?;

    let mut pages = Vec::new();
    while let Some(entry) = entries
        .next_entry()
        .await
        .map_err(|e| DeckError::Internal(format!("Failed to list '{}': {e}", dir.display())))?
    {
        let name = entry.file_name();
        let Some(name) = name.to_str() else { continue };
        let lower = name.to_ascii_lowercase();
        if !(lower.ends_with(".html") || lower.ends_with(".htm")) {
            continue;
        }
        let Some(page_num) = page_number_from_file_name(name) else {
            debug!("Ignoring non-page file {}", name);
            continue;
        };

        let html = match tokio::fs::read_to_string(entry.path()).await {
            Ok(h) => h,
            Err(e) => {
                warn!("Skipping unreadable fragment {}: {}", name, e);
                continue;
            }
        };
        let text_path = dir.join(format!("page-{page_num}.txt"));
        let text = tokio::fs::read_to_string(&text_path).await.ok();

        pages.push(Page {
            index: page_num,
            fragment_html: html,
            text,
        });
    }

    pages.sort_by_key(|p| p.index);
    debug!("Loaded {} fragments from {}", pages.len(), dir.display());
    Ok(pages)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_body_content() {
        let doc = "<!DOCTYPE html><html><head><title>x</title></head>\n<BODY class=\"p\">\n<p>Hi</p>\n</body></html>";
        assert_eq!(extract_body(doc), "<p>Hi</p>");
    }

    #[test]
    fn bare_fragments_are_untouched() {
        assert_eq!(extract_body("<p>Hi</p>"), "<p>Hi</p>");
        assert_eq!(unwrap_document("<p>Hi</p>"), "<p>Hi</p>");
    }

    #[test]
    fn bodyless_documents_lose_their_wrapper() {
        let doc = "<!doctype html><html><head><style>p{}</style></head><p>x</p></html>";
        assert_eq!(unwrap_document(doc), "<p>x</p>");
    }

    #[test]
    fn image_fragment_points_at_relative_asset() {
        let html = image_fragment(3, 800, 600);
        assert!(html.contains("src=\"assets/pages/page-3.png\""));
        assert!(html.contains("alt=\"Page 3\""));
        assert!(html.contains("loading=\"lazy\""));
        assert!(!html.contains("src=\"/"));
    }

    #[test]
    fn page_file_names() {
        assert_eq!(page_number_from_file_name("page-3.html"), Some(3));
        assert_eq!(page_number_from_file_name("PAGE_12.PNG"), Some(12));
        assert_eq!(page_number_from_file_name("page7.jpeg"), Some(7));
        assert_eq!(page_number_from_file_name("page-0.html"), None);
        assert_eq!(page_number_from_file_name("cover.html"), None);
        assert_eq!(page_number_from_file_name("page-3.txt"), None);
    }

    #[tokio::test]
    async fn loads_fragments_and_counts_assets() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("page-2.html"), "<p>two</p>").unwrap();
        std::fs::write(dir.path().join("page-1.html"), "<p>one</p>").unwrap();
        std::fs::write(dir.path().join("page-1.txt"), "One\nmore").unwrap();
        std::fs::write(dir.path().join("page-3.png"), b"png").unwrap();
        std::fs::write(dir.path().join("notes.md"), "x").unwrap();

        let pages = load_fragments_dir(dir.path()).await.unwrap();
        assert_eq!(pages.len(), 2);
        assert_eq!(pages[0].index, 1);
        assert_eq!(pages[0].text.as_deref(), Some("One\nmore"));
        assert_eq!(pages[1].fragment_html, "<p>two</p>");

        assert_eq!(count_page_assets(dir.path()).await.unwrap(), 3);
        assert_eq!(
            count_page_assets(&dir.path().join("missing")).await.unwrap(),
            0
        );
    }
}
