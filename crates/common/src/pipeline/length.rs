//! Character-count control
//!
//! Measures the merged document against `target ± tolerance` and runs one
//! adjustment pass:
//! - too short: ask for extra detail on the first few sections and splice it in
//! - too long: a fixed sequence of local condensation passes, no model calls
//!
//! Neither direction loops; the caller re-measures the result.

use regex_lite::{Captures, Regex};
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;
use tracing::{debug, info, warn};

use super::section::SectionGenerator;
use crate::content::{count_chars, extract_headings, extract_text, validate_length};
use crate::errors::Result;
use crate::models::{GenerationInput, LengthStatus, LengthVerdict, MergedDocument, Outline};

/// Items kept when a long list is shortened
const LIST_KEEP_ITEMS: usize = 5;

/// Lists longer than this are shortened
const LIST_MAX_ITEMS: usize = 7;

/// Paragraphs longer than this many counted characters are truncated in the aggressive pass
const LONG_PARAGRAPH_CHARS: usize = 200;

const TRUNCATED_PARAGRAPH_CHARS: usize = 150;

/// Placeholder item closing a shortened list
const LIST_PLACEHOLDER: &str = "など";

static H2_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<h2(?:\s[^>]*)?>(.*?)</h2\s*>").unwrap());

static EMPTY_PARAGRAPH_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"<p>\s*</p>").unwrap());

static SHORT_PARAGRAPH_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<p>[^<]{1,19}</p>").unwrap());

static UL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)(<ul(?:\s[^>]*)?>)(.*?)</ul>").unwrap());

static OL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)(<ol(?:\s[^>]*)?>)(.*?)</ol>").unwrap());

static LIST_ITEM_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<li(?:\s[^>]*)?>(.*?)</li>").unwrap());

static EXAMPLE_PARAGRAPH_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<p>例えば[^<]+</p>").unwrap());

static PLAIN_PARAGRAPH_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"<p>([^<]+)</p>").unwrap());

/// What the adjustment pass did
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum AdjustmentAction {
    Unchanged,
    Expanded { expanded: usize, skipped: usize },
    Condensed { removed_chars: usize },
}

impl AdjustmentAction {
    pub fn label(&self) -> &'static str {
        match self {
            AdjustmentAction::Unchanged => "unchanged",
            AdjustmentAction::Expanded { .. } => "expand",
            AdjustmentAction::Condensed { .. } => "condense",
        }
    }
}

/// Result of one adjustment pass
#[derive(Debug, Clone, PartialEq)]
pub struct AdjustmentReport {
    pub html: String,
    pub before: LengthVerdict,
    pub after: LengthVerdict,
    pub action: AdjustmentAction,
}

/// Drives expansion or condensation for a merged document
#[derive(Clone)]
pub struct LengthAdjuster {
    sections: SectionGenerator,
    tolerance: usize,
    max_expansion_sections: usize,
}

impl LengthAdjuster {
    pub fn new(sections: SectionGenerator, tolerance: usize, max_expansion_sections: usize) -> Self {
        Self {
            sections,
            tolerance,
            max_expansion_sections: max_expansion_sections.max(1),
        }
    }

    pub fn tolerance(&self) -> usize {
        self.tolerance
    }

    /// Measure and run at most one adjustment pass
    pub async fn adjust(
        &self,
        input: &GenerationInput,
        outline: &Outline,
        document: &MergedDocument,
    ) -> Result<AdjustmentReport> {
        let before = validate_length(&document.html, input.target_chars, self.tolerance);

        let (html, action) = match before.status {
            LengthStatus::Valid => {
                info!(char_count = before.char_count, target = before.target, "Length within band");
                (document.html.clone(), AdjustmentAction::Unchanged)
            }
            LengthStatus::TooShort => {
                info!(
                    char_count = before.char_count,
                    target = before.target,
                    shortfall = before.adjustment_needed,
                    "Content too short, expanding"
                );
                self.expand(input, outline, &document.html, before.adjustment_needed)
                    .await
            }
            LengthStatus::TooLong => {
                info!(
                    char_count = before.char_count,
                    target = before.target,
                    excess = before.adjustment_needed,
                    "Content too long, condensing"
                );
                let condensed = condense(&document.html, before.adjustment_needed);
                let removed_chars = before.char_count.saturating_sub(count_chars(&condensed));
                (condensed, AdjustmentAction::Condensed { removed_chars })
            }
        };

        let after = validate_length(&html, input.target_chars, self.tolerance);
        crate::metrics::record_length_adjustment(action.label());

        Ok(AdjustmentReport { html, before, after, action })
    }

    /// Splice extra detail after the first sections' H2 headings.
    ///
    /// Individual failures are logged and skipped.
    async fn expand(
        &self,
        input: &GenerationInput,
        outline: &Outline,
        html: &str,
        shortfall: usize,
    ) -> (String, AdjustmentAction) {
        if extract_headings(html).is_empty() {
            warn!("No headings to expand, leaving content unchanged");
            return (html.to_string(), AdjustmentAction::Unchanged);
        }

        let count = self.max_expansion_sections.min(outline.sections.len());
        if count == 0 {
            return (html.to_string(), AdjustmentAction::Unchanged);
        }
        let per_section = shortfall.div_ceil(count);

        let mut expanded_html = html.to_string();
        let mut expanded = 0;
        let mut skipped = 0;

        for (index, section) in outline.sections.iter().take(count).enumerate() {
            let addition = match self.sections.expand(input, &section.heading, per_section).await {
                Ok(addition) if !addition.trim().is_empty() => addition,
                Ok(_) => {
                    warn!(index = index, heading = %section.heading, "Expansion returned no content");
                    skipped += 1;
                    continue;
                }
                Err(e) => {
                    warn!(index = index, heading = %section.heading, error = %e, "Failed to expand section");
                    skipped += 1;
                    continue;
                }
            };

            match insert_after_section(&expanded_html, &section.heading, &addition) {
                Some(updated) => {
                    debug!(
                        index = index,
                        heading = %section.heading,
                        added_chars = count_chars(&addition),
                        "Expanded section"
                    );
                    expanded_html = updated;
                    expanded += 1;
                }
                None => {
                    warn!(index = index, heading = %section.heading, "Heading not found in document");
                    skipped += 1;
                }
            }
        }

        (expanded_html, AdjustmentAction::Expanded { expanded, skipped })
    }
}

/// Insert `addition` at the end of the section headed by `heading`.
///
/// The section ends at the next H2 or at the end of the document. Returns
/// `None` when no H2's text matches `heading`.
pub fn insert_after_section(html: &str, heading: &str, addition: &str) -> Option<String> {
    let wanted = heading.trim();
    let mut h2s = H2_RE.captures_iter(html);

    let matched = h2s.find(|caps| extract_text(&caps[1]) == wanted)?;
    let section_start = matched.get(0)?.end();

    let next_h2 = H2_RE.find_at(html, section_start).map(|m| m.start());

    Some(match next_h2 {
        Some(pos) => format!("{}\n\n{}\n\n{}", &html[..pos], addition, &html[pos..]),
        None => format!("{}\n\n{}", html, addition),
    })
}

/// Local condensation; never increases the character count.
///
/// Runs empty/short paragraph removal and list shortening, then the
/// aggressive pass when fewer than `excess` characters were removed.
pub fn condense(html: &str, excess: usize) -> String {
    let original = count_chars(html);

    let condensed = EMPTY_PARAGRAPH_RE.replace_all(html, "");
    let condensed = SHORT_PARAGRAPH_RE.replace_all(&condensed, "");
    let condensed = condense_long_lists(&condensed);

    let removed = original.saturating_sub(count_chars(&condensed));
    if removed >= excess {
        return condensed;
    }
    aggressive_condense(&condensed)
}

/// Shorten `<ul>`/`<ol>` lists of more than seven items to five plus a placeholder
pub fn condense_long_lists(html: &str) -> String {
    let html = UL_RE.replace_all(html, |caps: &Captures<'_>| condense_list(caps, "ul"));
    OL_RE
        .replace_all(&html, |caps: &Captures<'_>| condense_list(caps, "ol"))
        .into_owned()
}

fn condense_list(caps: &Captures<'_>, tag: &str) -> String {
    let whole = &caps[0];
    let items: Vec<&str> = LIST_ITEM_RE
        .captures_iter(&caps[2])
        .filter_map(|item| item.get(1).map(|m| m.as_str()))
        .collect();

    if items.len() <= LIST_MAX_ITEMS {
        return whole.to_string();
    }

    let mut list = String::from(&caps[1]);
    for item in items.iter().take(LIST_KEEP_ITEMS) {
        list.push_str("<li>");
        list.push_str(item);
        list.push_str("</li>");
    }
    list.push_str("<li>");
    list.push_str(LIST_PLACEHOLDER);
    list.push_str("</li></");
    list.push_str(tag);
    list.push('>');

    // Dropped items may be shorter than the placeholder
    if count_chars(&list) <= count_chars(whole) {
        list
    } else {
        whole.to_string()
    }
}

fn aggressive_condense(html: &str) -> String {
    let html = EXAMPLE_PARAGRAPH_RE.replace_all(html, "");
    PLAIN_PARAGRAPH_RE
        .replace_all(&html, |caps: &Captures<'_>| truncate_paragraph(&caps[0]))
        .into_owned()
}

/// First 150 characters plus `。` for paragraphs longer than 200 counted
/// characters; kept as-is unless the rewrite is shorter
fn truncate_paragraph(paragraph: &str) -> String {
    let count = count_chars(paragraph);
    if count <= LONG_PARAGRAPH_CHARS {
        return paragraph.to_string();
    }

    let head: String = extract_text(paragraph)
        .chars()
        .take(TRUNCATED_PARAGRAPH_CHARS)
        .collect();
    let truncated = format!("<p>{}。</p>", html_escape::encode_text(&head));

    if count_chars(&truncated) < count {
        truncated
    } else {
        paragraph.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::ScriptedLanguageModel;
    use crate::models::fixtures::sample_input;
    use crate::errors::AppError;
    use crate::models::OutlineSection;
    use std::sync::Arc;

    fn list(tag: &str, items: usize) -> String {
        let body: String = (0..items).map(|i| format!("<li>項目{}の説明</li>", i)).collect();
        format!("<{tag}>{body}</{tag}>")
    }

    fn paragraph(chars: usize) -> String {
        format!("<p>{}</p>", "文".repeat(chars))
    }

    fn outline(headings: &[&str]) -> Outline {
        Outline {
            title: "記事".into(),
            sections: headings
                .iter()
                .map(|h| OutlineSection { heading: h.to_string(), subheadings: vec![] })
                .collect(),
        }
    }

    fn adjuster(llm: Arc<ScriptedLanguageModel>) -> LengthAdjuster {
        LengthAdjuster::new(SectionGenerator::new(llm, 1500, 3000), 1000, 3)
    }

    #[test]
    fn test_nine_item_list_becomes_six() {
        let condensed = condense_long_lists(&list("ul", 9));
        assert_eq!(LIST_ITEM_RE.find_iter(&condensed).count(), 6);
        assert!(condensed.ends_with("<li>など</li></ul>"));
        assert!(condensed.contains("項目4"));
        assert!(!condensed.contains("項目5"));
    }

    #[test]
    fn test_short_lists_unchanged() {
        let six = list("ol", 6);
        assert_eq!(condense_long_lists(&six), six);
        let seven = list("ul", 7);
        assert_eq!(condense_long_lists(&seven), seven);
    }

    #[test]
    fn test_ordered_list_keeps_tag() {
        let condensed = condense_long_lists(&list("ol", 8));
        assert!(condensed.starts_with("<ol>"));
        assert!(condensed.ends_with("</ol>"));
    }

    #[test]
    fn test_list_placeholder_never_grows_count() {
        let tiny: String = (0..9).map(|_| "<li>a</li>").collect();
        let html = format!("<ul>{}</ul>", tiny);
        // 9 one-char items: dropping four saves 4, placeholder costs 2
        assert!(count_chars(&condense_long_lists(&html)) <= count_chars(&html));

        let empty_tail = format!("<ul>{}{}</ul>", "<li>長い項目です</li>".repeat(5), "<li></li>".repeat(3));
        assert_eq!(condense_long_lists(&empty_tail), empty_tail);
    }

    #[test]
    fn test_condense_removes_filler_paragraphs() {
        let html = format!("<p> </p><p>短い</p>{}", paragraph(50));
        assert_eq!(condense(&html, 1), paragraph(50));
    }

    #[test]
    fn test_aggressive_pass_when_still_long() {
        let html = format!(
            "<h2>見出し</h2><p>例えば{}</p>{}",
            "あ".repeat(30),
            paragraph(300)
        );
        let condensed = condense(&html, 500);
        assert!(!condensed.contains("例えば"));
        assert!(condensed.contains(&format!("<p>{}。</p>", "文".repeat(150))));
    }

    #[test]
    fn test_aggressive_pass_skipped_when_enough_removed() {
        let html = format!("<p>短い</p>{}", paragraph(300));
        assert_eq!(condense(&html, 2), paragraph(300));
    }

    #[test]
    fn test_condense_is_monotonic() {
        let samples = [
            String::new(),
            paragraph(10),
            format!("{}{}", list("ul", 12), paragraph(250)),
            format!("<p>例えば{}</p><p>{}</p>", "い".repeat(5), "う".repeat(201)),
            format!("<ul>{}</ul>", "<li>x</li>".repeat(8)),
            format!("<p>{}{}</p>", "あ".repeat(150), " ".repeat(60)),
            format!("<p>{}</p>", "い う".repeat(70)),
            format!("<p>{}</p>", "&amp;".repeat(210)),
        ];
        for sample in samples {
            for excess in [0, 1, 10_000] {
                assert!(count_chars(&condense(&sample, excess)) <= count_chars(&sample));
            }
        }
    }

    #[test]
    fn test_truncation_counts_without_whitespace() {
        // 150 counted characters padded with spaces is not a long paragraph
        let padded = format!("<p>{}{}</p>", "あ".repeat(150), " ".repeat(60));
        assert_eq!(condense(&padded, 10_000), padded);

        let long = format!("<p>{}</p>", "え".repeat(250));
        let condensed = condense(&long, 10_000);
        assert_eq!(count_chars(&condensed), 151);
        assert!(condensed.ends_with("。</p>"));
    }

    #[test]
    fn test_insert_after_section() {
        let html = "<h2>一</h2><p>甲</p><h2>二</h2><p>乙</p>";
        assert_eq!(
            insert_after_section(html, "一", "<p>追加</p>").unwrap(),
            "<h2>一</h2><p>甲</p>\n\n<p>追加</p>\n\n<h2>二</h2><p>乙</p>"
        );
        assert_eq!(
            insert_after_section(html, " 二 ", "<p>追加</p>").unwrap(),
            "<h2>一</h2><p>甲</p><h2>二</h2><p>乙</p>\n\n<p>追加</p>"
        );
        assert!(insert_after_section(html, "三", "<p>x</p>").is_none());
    }

    #[test]
    fn test_insert_matches_heading_text_not_markup() {
        let html = "<h2><strong>A&amp;B</strong></h2><p>x</p>";
        assert!(insert_after_section(html, "A&B", "<p>y</p>").is_some());
    }

    #[tokio::test]
    async fn test_valid_document_unchanged() {
        let llm = Arc::new(ScriptedLanguageModel::new());
        let html = format!("<h2>一</h2>{}", paragraph(9_999));
        let document = MergedDocument { char_count: count_chars(&html), html: html.clone() };

        let report = adjuster(llm.clone())
            .adjust(&sample_input(), &outline(&["一"]), &document)
            .await
            .unwrap();

        assert_eq!(report.action, AdjustmentAction::Unchanged);
        assert_eq!(report.html, html);
        assert_eq!(llm.call_count(), 0);
    }

    #[tokio::test]
    async fn test_expansion_scenario() {
        // 7 sections of 1200 characters against a 9500 target
        let headings: Vec<String> = (1..=7).map(|i| format!("第{}章", i)).collect();
        let heading_refs: Vec<&str> = headings.iter().map(String::as_str).collect();
        let html: String = headings
            .iter()
            .map(|h| format!("<h2>{}</h2>{}", h, paragraph(1200 - h.chars().count())))
            .collect();
        let document = MergedDocument { char_count: count_chars(&html), html };
        assert_eq!(document.char_count, 8400);

        let llm = Arc::new(ScriptedLanguageModel::new());
        llm.push(paragraph(40))
            .push_error(AppError::upstream("perplexity", 500, "boom".into()))
            .push(paragraph(40));

        let mut input = sample_input();
        input.target_chars = 9500;

        let report = adjuster(llm.clone())
            .adjust(&input, &outline(&heading_refs), &document)
            .await
            .unwrap();

        assert_eq!(report.before.status, LengthStatus::TooShort);
        assert_eq!(report.before.adjustment_needed, 100);
        assert_eq!(report.action, AdjustmentAction::Expanded { expanded: 2, skipped: 1 });
        assert_eq!(report.after.char_count, 8480);
        assert_eq!(llm.call_count(), 3);
        assert!(llm.requests()[0].messages[1].content.contains("およそ34字"));

        // Expansion for 第1章 lands before 第2章
        let first = report.html.find("第2章").unwrap();
        let addition = report.html.find(&paragraph(40)).unwrap();
        assert!(addition < first);
    }

    #[tokio::test]
    async fn test_expansion_without_headings_is_noop() {
        let llm = Arc::new(ScriptedLanguageModel::new());
        let html = paragraph(100);
        let document = MergedDocument { char_count: 100, html: html.clone() };

        let report = adjuster(llm.clone())
            .adjust(&sample_input(), &outline(&["一"]), &document)
            .await
            .unwrap();

        assert_eq!(report.html, html);
        assert_eq!(report.action, AdjustmentAction::Unchanged);
        assert_eq!(llm.call_count(), 0);
    }

    #[tokio::test]
    async fn test_condensation_scenario() {
        // About 12500 characters against a 10000 target
        let mut html = String::from("<h2>本編</h2>");
        for _ in 0..10 {
            html.push_str(&paragraph(250));
        }
        for _ in 0..66 {
            html.push_str(&paragraph(150));
        }
        html.push_str(&list("ul", 10));
        html.push_str("<p>まとめ</p>");
        let document = MergedDocument { char_count: count_chars(&html), html };

        let llm = Arc::new(ScriptedLanguageModel::new());
        let report = adjuster(llm.clone())
            .adjust(&sample_input(), &outline(&["本編"]), &document)
            .await
            .unwrap();

        assert_eq!(report.before.status, LengthStatus::TooLong);
        assert!(report.after.char_count < report.before.char_count);
        assert!(report.after.distance_to_target() < report.before.distance_to_target());
        assert!(matches!(report.action, AdjustmentAction::Condensed { removed_chars } if removed_chars > 0));
        assert_eq!(llm.call_count(), 0);
    }
}
