//! Allow-list HTML sanitizer
//!
//! Generated content is untrusted. The sanitizer parses it as an HTML
//! fragment and:
//! - keeps only article markup (headings, paragraphs, lists, quotes, code, emphasis, links)
//! - keeps `href`/`title` on links and `cite` on quotes; absolute URLs need an
//!   allowed scheme after entity decoding, relative URLs pass
//! - drops script/style bodies and comments, strips every other tag, keeping its text
//! - removes empty elements and normalizes whitespace

use ammonia::{Builder, UrlRelative};
use regex_lite::Regex;
use std::borrow::Cow;
use std::collections::{HashMap, HashSet};
use std::sync::LazyLock;

/// Tags kept in sanitized output
pub const ALLOWED_TAGS: &[&str] = &[
    "h2", "h3", "p", "ul", "ol", "li", "blockquote", "code", "pre", "strong", "em", "a",
];

/// URL schemes kept in `href` and `cite`
pub const ALLOWED_PROTOCOLS: &[&str] = &["http", "https", "mailto"];

static CLEANER: LazyLock<Builder<'static>> = LazyLock::new(|| {
    let tag_attributes = HashMap::from([
        ("a", HashSet::from(["href", "title"])),
        ("blockquote", HashSet::from(["cite"])),
    ]);

    let mut builder = Builder::empty();
    builder
        .tags(ALLOWED_TAGS.iter().copied().collect())
        .clean_content_tags(HashSet::from(["script", "style"]))
        .tag_attributes(tag_attributes)
        .generic_attributes(HashSet::new())
        .url_schemes(ALLOWED_PROTOCOLS.iter().copied().collect())
        .url_relative(UrlRelative::PassThrough)
        .attribute_filter(filter_cite)
        .link_rel(None)
        .strip_comments(true);
    builder
});

/// ammonia scheme-checks `href`; `cite` gets the same rule here.
/// Values arrive entity-decoded.
fn filter_cite<'u>(element: &str, attribute: &str, value: &'u str) -> Option<Cow<'u, str>> {
    if element == "blockquote" && attribute == "cite" && !has_allowed_scheme(value) {
        return None;
    }
    Some(Cow::Borrowed(value))
}

fn has_allowed_scheme(url: &str) -> bool {
    let compact: String = url
        .chars()
        .filter(|c| !c.is_whitespace() && !c.is_control())
        .collect::<String>()
        .to_ascii_lowercase();

    match (compact.find(':'), compact.find(['/', '?', '#'])) {
        (Some(colon), Some(path)) if path < colon => true,
        (Some(colon), _) => ALLOWED_PROTOCOLS.contains(&&compact[..colon]),
        (None, _) => true,
    }
}

static EMPTY_ELEMENT_RES: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    ALLOWED_TAGS
        .iter()
        .map(|tag| Regex::new(&format!(r"(?i)<{tag}(?:\s[^>]*)?>\s*</{tag}>")).unwrap())
        .collect()
});

static BETWEEN_TAGS_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r">\s+<").unwrap());

static BLANK_LINES_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\n\s*\n").unwrap());

/// Sanitize untrusted HTML for publication
pub fn sanitize_html(html: &str) -> String {
    if html.trim().is_empty() {
        return String::new();
    }

    let cleaned = CLEANER.clean(html).to_string();
    let cleaned = remove_empty_elements(&cleaned);
    normalize_whitespace(&cleaned)
}

/// Remove allowed elements with no content, repeating until nested empties are gone
fn remove_empty_elements(html: &str) -> String {
    let mut current = html.to_string();
    loop {
        let mut changed = false;
        for re in EMPTY_ELEMENT_RES.iter() {
            if re.is_match(&current) {
                current = re.replace_all(&current, "").into_owned();
                changed = true;
            }
        }
        if !changed {
            return current;
        }
    }
}

fn normalize_whitespace(html: &str) -> String {
    let unified = html.replace("\r\n", "\n").replace('\r', "\n");
    let tight = BETWEEN_TAGS_RE.replace_all(&unified, "><");
    BLANK_LINES_RE.replace_all(&tight, "\n").trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content::count_chars;

    #[test]
    fn test_keeps_allowed_markup() {
        let html = "<h2>見出し</h2><p>本文<strong>強調</strong></p><ul><li>一</li></ul>";
        assert_eq!(sanitize_html(html), html);
    }

    #[test]
    fn test_strips_disallowed_tags_keeps_text() {
        assert_eq!(
            sanitize_html("<div><p>本文<span>内側</span></p></div>"),
            "<p>本文内側</p>"
        );
    }

    #[test]
    fn test_drops_script_and_style() {
        let html = "<p>安全</p><script>alert('x')</script><style>p{}</style>";
        assert_eq!(sanitize_html(html), "<p>安全</p>");
    }

    #[test]
    fn test_filters_attributes() {
        let html = r#"<p class="lead" onclick="x()">a</p><a href="https://example.com" target="_blank" title="t">link</a>"#;
        assert_eq!(
            sanitize_html(html),
            r#"<p>a</p><a href="https://example.com" title="t">link</a>"#
        );
    }

    #[test]
    fn test_rejects_unsafe_protocols() {
        assert_eq!(
            sanitize_html(r#"<a href="javascript:alert(1)">x</a>"#),
            "<a>x</a>"
        );
        assert_eq!(
            sanitize_html(r#"<a href="java&#9;script:alert(1)">x</a>"#),
            "<a>x</a>"
        );
        assert_eq!(
            sanitize_html(r#"<blockquote cite="mailto:a@example.com">q</blockquote>"#),
            r#"<blockquote cite="mailto:a@example.com">q</blockquote>"#
        );
    }

    #[test]
    fn test_rejects_entity_encoded_schemes() {
        for href in [
            "&#106;avascript:alert(1)",
            "&#x6A;avascript:alert(1)",
            "javascript&colon;alert(1)",
            "&#100;ata:text/html,hi",
        ] {
            let html = format!(r#"<a href="{}">x</a>"#, href);
            assert_eq!(sanitize_html(&html), "<a>x</a>", "{}", href);
        }
        assert_eq!(
            sanitize_html(r#"<blockquote cite="&#106;avascript:alert(1)">q</blockquote>"#),
            "<blockquote>q</blockquote>"
        );
    }

    #[test]
    fn test_keeps_relative_urls() {
        for href in ["/guide/setup", "../page?x=a:b", "#faq", "HTTPS://EXAMPLE.COM"] {
            let html = format!(r#"<a href="{}">x</a>"#, href);
            assert_eq!(sanitize_html(&html), html);
        }
        assert_eq!(sanitize_html(r#"<a href="data:text/html,hi">x</a>"#), "<a>x</a>");
        assert!(has_allowed_scheme("/sources/report"));
        assert!(!has_allowed_scheme("java script:alert(1)"));
    }

    #[test]
    fn test_removes_nested_empty_elements() {
        assert_eq!(sanitize_html("<p>本文</p><ul><li> </li></ul><p></p>"), "<p>本文</p>");
    }

    #[test]
    fn test_balances_tags() {
        assert_eq!(sanitize_html("<p>開いたまま<strong>強調"), "<p>開いたまま<strong>強調</strong></p>");
        assert_eq!(sanitize_html("<p>余分</em></p>"), "<p>余分</p>");
    }

    #[test]
    fn test_escapes_stray_brackets() {
        assert_eq!(sanitize_html("<p>1 < 2 > 0</p>"), "<p>1 &lt; 2 &gt; 0</p>");
    }

    #[test]
    fn test_normalizes_whitespace() {
        assert_eq!(
            sanitize_html("\r\n<h2>題</h2>\r\n\r\n<p>文</p>\n\n"),
            "<h2>題</h2><p>文</p>"
        );
    }

    #[test]
    fn test_empty_input() {
        assert_eq!(sanitize_html(""), "");
        assert_eq!(sanitize_html("   "), "");
    }

    #[test]
    fn test_sanitized_count_is_stable() {
        let html = "<div><h2>題</h2><p>日本語の本文です。</p><script>x</script></div>";
        let once = sanitize_html(html);
        assert_eq!(sanitize_html(&once), once);
        assert_eq!(count_chars(&once), 10);
    }
}
