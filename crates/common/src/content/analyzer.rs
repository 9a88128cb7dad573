//! Text extraction and measurement for article HTML
//!
//! Japanese text has no word-delimiting spaces, so length is measured as
//! the number of non-whitespace code points left after removing markup.

use regex_lite::Regex;
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;

use crate::models::LengthVerdict;

static TAG_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"<[^>]*>").unwrap());

static WHITESPACE_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").unwrap());

static HEADING_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<h([23])(?:\s[^>]*)?>(.*?)</h[23]\s*>").unwrap());

static PARAGRAPH_OPEN_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)<p(?:\s[^>]*)?>").unwrap());

static LIST_OPEN_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)<(?:ul|ol)(?:\s[^>]*)?>").unwrap());

/// Heading level kept by the sanitizer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HeadingLevel {
    H2,
    H3,
}

/// One heading in document order
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Heading {
    pub level: HeadingLevel,
    pub text: String,
}

/// Summary of an HTML document's shape
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContentStructure {
    pub char_count: usize,
    /// Whitespace-separated runs; a rough figure for Japanese text
    pub word_count: usize,
    pub paragraph_count: usize,
    pub heading_count: usize,
    pub list_count: usize,
    pub headings: Vec<Heading>,
    pub has_good_structure: bool,
}

/// Remove every `<...>` run. Idempotent.
pub fn strip_tags(html: &str) -> String {
    TAG_RE.replace_all(html, "").into_owned()
}

/// Decode named and numeric character references
pub fn decode_entities(text: &str) -> String {
    html_escape::decode_html_entities(text).into_owned()
}

/// Plain text with markup removed and whitespace collapsed
pub fn extract_text(html: &str) -> String {
    if html.is_empty() {
        return String::new();
    }
    let text = decode_entities(&strip_tags(html));
    WHITESPACE_RE.replace_all(&text, " ").trim().to_string()
}

/// Non-whitespace code points of the extracted text
pub fn count_chars(html: &str) -> usize {
    extract_text(html).chars().filter(|c| !c.is_whitespace()).count()
}

/// Measure `html` against `target ± tolerance`
pub fn validate_length(html: &str, target: usize, tolerance: usize) -> LengthVerdict {
    LengthVerdict::measure(count_chars(html), target, tolerance)
}

/// H2/H3 headings in document order, skipping ones without text
pub fn extract_headings(html: &str) -> Vec<Heading> {
    HEADING_RE
        .captures_iter(html)
        .filter_map(|caps| {
            let level = if &caps[1] == "2" { HeadingLevel::H2 } else { HeadingLevel::H3 };
            let text = extract_text(&caps[2]);
            (!text.is_empty()).then_some(Heading { level, text })
        })
        .collect()
}

/// Excerpt of at most `max_chars` characters.
///
/// Cuts at the last Japanese sentence end (。！？) when it falls in the final
/// 30% of the window, otherwise truncates and appends "...".
pub fn generate_excerpt(html: &str, max_chars: usize) -> String {
    let text = extract_text(html);
    if text.chars().count() <= max_chars {
        return text;
    }

    let window: Vec<char> = text.chars().take(max_chars).collect();
    let last_sentence_end = window
        .iter()
        .rposition(|c| matches!(c, '。' | '！' | '？'));

    match last_sentence_end {
        Some(pos) if pos as f64 > max_chars as f64 * 0.7 => window[..=pos].iter().collect(),
        _ => {
            let cut: String = window.into_iter().collect();
            format!("{}...", cut.trim_end())
        }
    }
}

/// Count paragraphs, headings and lists
pub fn analyze_structure(html: &str) -> ContentStructure {
    let text = extract_text(html);
    let headings = extract_headings(html);
    let paragraph_count = PARAGRAPH_OPEN_RE.find_iter(html).count();

    ContentStructure {
        char_count: count_chars(html),
        word_count: text.split_whitespace().count(),
        paragraph_count,
        heading_count: headings.len(),
        list_count: LIST_OPEN_RE.find_iter(html).count(),
        has_good_structure: headings.len() >= 3 && paragraph_count >= 5,
        headings,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::LengthStatus;

    fn html_with_chars(n: usize) -> String {
        format!("<h2>見出し</h2><p>{}</p>", "あ".repeat(n.saturating_sub(3)))
    }

    #[test]
    fn test_count_ignores_tags_and_whitespace() {
        assert_eq!(count_chars("<p>日本語 の\n文章</p>"), 6);
        assert_eq!(count_chars(""), 0);
        assert_eq!(count_chars("<br/><hr>"), 0);
    }

    #[test]
    fn test_count_decodes_entities() {
        assert_eq!(count_chars("<p>A&amp;B</p>"), 3);
        assert_eq!(count_chars("<p>&#12354;&#x3044;</p>"), 2);
        assert_eq!(count_chars("<p>&unknown;</p>"), 9);
        assert_eq!(count_chars("<p>前&rarr;後&hearts;</p>"), 4);
    }

    #[test]
    fn test_strip_tags_idempotent() {
        let samples = [
            "<p>本文</p>",
            "<<p>>x",
            "a < b > c",
            "<h2 class=\"x\">見出し</h2><ul><li>項目</li></ul>",
            "unterminated <p",
            "<x<y>z>",
        ];
        for sample in samples {
            let once = strip_tags(sample);
            assert_eq!(strip_tags(&once), once);
            assert_eq!(count_chars(&strip_tags(&once)), count_chars(&once));
        }
    }

    #[test]
    fn test_validate_length_band() {
        assert_eq!(validate_length(&html_with_chars(9000), 10_000, 1000).status, LengthStatus::Valid);
        assert_eq!(validate_length(&html_with_chars(11_000), 10_000, 1000).status, LengthStatus::Valid);

        let short = validate_length(&html_with_chars(8999), 10_000, 1000);
        assert_eq!(short.status, LengthStatus::TooShort);
        assert_eq!(short.adjustment_needed, 1);

        let long = validate_length(&html_with_chars(11_001), 10_000, 1000);
        assert_eq!(long.status, LengthStatus::TooLong);
        assert_eq!(long.adjustment_needed, 1);
    }

    #[test]
    fn test_extract_headings_in_order() {
        let html = "<h2>導入</h2><p>x</p><h3>背景</h3><h3> </h3><H2 id=\"a\">まとめ</H2>";
        let headings = extract_headings(html);
        assert_eq!(
            headings,
            vec![
                Heading { level: HeadingLevel::H2, text: "導入".into() },
                Heading { level: HeadingLevel::H3, text: "背景".into() },
                Heading { level: HeadingLevel::H2, text: "まとめ".into() },
            ]
        );
    }

    #[test]
    fn test_excerpt_sentence_boundary() {
        let sentence = "これは説明の文章です。";
        let html = format!("<p>{}</p>", sentence.repeat(10));
        let excerpt = generate_excerpt(&html, 50);
        assert!(excerpt.ends_with('。'));
        assert!(excerpt.chars().count() <= 50);
    }

    #[test]
    fn test_excerpt_without_boundary() {
        let html = format!("<p>{}</p>", "あ".repeat(100));
        let excerpt = generate_excerpt(&html, 50);
        assert!(excerpt.ends_with("..."));
        assert_eq!(excerpt.chars().count(), 53);
    }

    #[test]
    fn test_excerpt_short_text_unchanged() {
        assert_eq!(generate_excerpt("<p>短い文</p>", 300), "短い文");
    }

    #[test]
    fn test_analyze_structure() {
        let html = "<h2>a</h2><p>一</p><p>二</p><h3>b</h3><ul><li>x</li></ul><ol><li>y</li></ol>";
        let structure = analyze_structure(html);
        assert_eq!(structure.heading_count, 2);
        assert_eq!(structure.paragraph_count, 2);
        assert_eq!(structure.list_count, 2);
        assert!(!structure.has_good_structure);
    }
}
