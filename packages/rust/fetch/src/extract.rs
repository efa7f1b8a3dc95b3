//! HTML-to-text extraction.
//!
//! Picks the main content container, converts it with `htmd`, then strips the
//! Markdown decoration so passages carry plain prose.

use std::sync::LazyLock;

use regex::Regex;
use scraper::{Html, Selector};
use tracing::debug;

use webcontext_shared::{Result, WebContextError};

/// Tags never worth reading.
const SKIP_TAGS: &[&str] = &[
    "script", "style", "nav", "header", "footer", "aside", "iframe", "noscript", "svg", "form",
    "button",
];

/// Convert an HTML document to plain text.
///
/// Fails with [`WebContextError::Extraction`] when the page has no readable
/// text left after cleanup.
pub fn html_to_text(html: &str) -> Result<String> {
    let content_html = extract_content_html(html);

    let converter = htmd::HtmlToMarkdown::builder()
        .skip_tags(SKIP_TAGS.to_vec())
        .build();

    let markdown = converter
        .convert(&content_html)
        .map_err(|e| WebContextError::Extraction(format!("htmd conversion failed: {e}")))?;

    let text = strip_markdown(&markdown);
    debug!(html_len = html.len(), text_len = text.len(), "extracted page text");

    if text.is_empty() {
        return Err(WebContextError::Extraction("page has no readable text".into()));
    }

    Ok(text)
}

/// Extract the main content HTML, falling back to `<body>`.
fn extract_content_html(html: &str) -> String {
    let doc = Html::parse_document(html);

    // Try known content containers in priority order
    let selectors = [
        "article",
        "main",
        "[role=\"main\"]",
        ".content",
        "#content",
        "body",
    ];

    for sel_str in &selectors {
        if let Ok(selector) = Selector::parse(sel_str) {
            if let Some(el) = doc.select(&selector).next() {
                let inner = el.inner_html();
                if !inner.trim().is_empty() {
                    return inner;
                }
            }
        }
    }

    // Last resort
    html.to_string()
}

/// Remove Markdown syntax and normalize whitespace.
fn strip_markdown(md: &str) -> String {
    static IMAGE_RE: LazyLock<Regex> =
        LazyLock::new(|| Regex::new(r"!\[[^\]]*\]\([^)]*\)").expect("valid regex"));
    static LINK_RE: LazyLock<Regex> =
        LazyLock::new(|| Regex::new(r"\[([^\]]*)\]\([^)]*\)").expect("valid regex"));
    static HEADING_RE: LazyLock<Regex> =
        LazyLock::new(|| Regex::new(r"(?m)^[ \t]{0,3}#{1,6}[ \t]+").expect("valid regex"));
    static FENCE_RE: LazyLock<Regex> =
        LazyLock::new(|| Regex::new(r"(?m)^[ \t]*(```|~~~).*$").expect("valid regex"));
    static EMPHASIS_RE: LazyLock<Regex> =
        LazyLock::new(|| Regex::new(r"\*\*|__|`").expect("valid regex"));
    static BLANK_RUN_RE: LazyLock<Regex> =
        LazyLock::new(|| Regex::new(r"\n{3,}").expect("valid regex"));

    let text = IMAGE_RE.replace_all(md, "");
    let text = LINK_RE.replace_all(&text, "$1");
    let text = HEADING_RE.replace_all(&text, "");
    let text = FENCE_RE.replace_all(&text, "");
    let text = EMPHASIS_RE.replace_all(&text, "");

    let trimmed_lines = text
        .lines()
        .map(str::trim_end)
        .collect::<Vec<_>>()
        .join("\n");

    BLANK_RUN_RE
        .replace_all(&trimmed_lines, "\n\n")
        .trim()
        .to_string()
}
