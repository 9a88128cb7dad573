//! Joins section fragments into one document

use regex_lite::Regex;
use std::sync::LazyLock;

use crate::content::count_chars;
use crate::models::{MergedDocument, SectionContent};

static EXCESS_NEWLINES_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\n{3,}").unwrap());

static HEADING_THEN_PARAGRAPH_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"</h([23])>\s*<p>").unwrap());

static HEADING_THEN_HEADING_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"</h([23])>\s*<h([23])>").unwrap());

static EMPTY_PARAGRAPH_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"<p>\s*</p>").unwrap());

/// Concatenate fragments in outline order and normalize the seams
pub fn merge_sections(sections: &[SectionContent]) -> MergedDocument {
    let joined = sections
        .iter()
        .map(|s| s.html.as_str())
        .collect::<Vec<_>>()
        .join("\n\n");

    let html = clean_merged(&joined);
    let char_count = count_chars(&html);
    MergedDocument { html, char_count }
}

/// Newline and heading-boundary cleanup
pub fn clean_merged(html: &str) -> String {
    let html = EXCESS_NEWLINES_RE.replace_all(html, "\n\n");
    let html = HEADING_THEN_PARAGRAPH_RE.replace_all(&html, "</h${1}>\n<p>");
    let html = HEADING_THEN_HEADING_RE.replace_all(&html, "</h${1}>\n<h${2}>");
    let html = EMPTY_PARAGRAPH_RE.replace_all(&html, "");
    html.trim().to_string()
}
