//! Per-section content generation

use std::sync::Arc;
use tracing::info;

use super::prompts;
use crate::content::{count_chars, sanitize_html};
use crate::errors::Result;
use crate::llm::{CompletionRequest, LanguageModel};
use crate::models::{GenerationInput, OutlineSection, SectionContent};

const SECTION_MAX_TOKENS: u32 = 4000;
const EXPANSION_MAX_TOKENS: u32 = 2000;

/// Generates and sanitizes section HTML
#[derive(Clone)]
pub struct SectionGenerator {
    llm: Arc<dyn LanguageModel>,
    min_section_chars: usize,
    max_section_chars: usize,
}

impl SectionGenerator {
    pub fn new(llm: Arc<dyn LanguageModel>, min_section_chars: usize, max_section_chars: usize) -> Self {
        Self {
            llm,
            min_section_chars,
            max_section_chars: max_section_chars.max(min_section_chars),
        }
    }

    /// Even share of the article target, clamped to the section bounds
    pub fn target_per_section(&self, target_chars: usize, section_count: usize) -> usize {
        let share = target_chars / section_count.max(1);
        share.clamp(self.min_section_chars, self.max_section_chars)
    }

    /// Body for one outline section
    pub async fn generate(
        &self,
        input: &GenerationInput,
        section: &OutlineSection,
        target_chars: usize,
    ) -> Result<SectionContent> {
        let request = CompletionRequest::new(
            prompts::system_prompt(),
            prompts::section_prompt(input, section, target_chars),
            SECTION_MAX_TOKENS,
        )
        .with_domain_filter(input.reference_domains());

        let completion = self.llm.complete(&request).await?;
        let html = sanitize_html(&completion.content);
        let char_count = count_chars(&html);

        info!(
            heading = %section.heading,
            target_chars = target_chars,
            char_count = char_count,
            "Generated section"
        );

        Ok(SectionContent {
            heading: section.heading.clone(),
            html,
            char_count,
        })
    }

    /// Extra detail for an existing section; may be empty
    pub async fn expand(&self, input: &GenerationInput, heading: &str, target_chars: usize) -> Result<String> {
        let request = CompletionRequest::new(
            prompts::system_prompt(),
            prompts::expansion_prompt(input, heading, target_chars),
            EXPANSION_MAX_TOKENS,
        );

        let completion = self.llm.complete(&request).await?;
        Ok(sanitize_html(&completion.content))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::ScriptedLanguageModel;
    use crate::models::fixtures::sample_input;

    fn section() -> OutlineSection {
        OutlineSection {
            heading: "導入の準備".into(),
            subheadings: vec!["体制".into(), "予算".into()],
        }
    }

    #[test]
    fn test_target_per_section_clamped() {
        let generator = SectionGenerator::new(Arc::new(ScriptedLanguageModel::new()), 1500, 3000);
        assert_eq!(generator.target_per_section(10_000, 7), 1500);
        assert_eq!(generator.target_per_section(10_000, 6), 1666);
        assert_eq!(generator.target_per_section(10_000, 2), 3000);
        assert_eq!(generator.target_per_section(10_000, 0), 3000);
    }

    #[tokio::test]
    async fn test_generate_sanitizes_and_counts() {
        let llm = Arc::new(ScriptedLanguageModel::new());
        llm.push("<h2>導入の準備</h2><div onclick=\"x\"><p>体制を整えます。</p></div><script>bad()</script>");
        let generator = SectionGenerator::new(llm.clone(), 1500, 3000);

        let content = generator.generate(&sample_input(), &section(), 1500).await.unwrap();
        assert_eq!(content.html, "<h2>導入の準備</h2><p>体制を整えます。</p>");
        assert_eq!(content.char_count, 13);
        assert_eq!(llm.requests()[0].max_tokens, 4000);
        assert!(!llm.requests()[0].is_json());
    }

    #[tokio::test]
    async fn test_expand_uses_smaller_budget() {
        let llm = Arc::new(ScriptedLanguageModel::new());
        llm.push("<p>追加の解説です。</p>");
        let generator = SectionGenerator::new(llm.clone(), 1500, 3000);

        let html = generator.expand(&sample_input(), "導入の準備", 400).await.unwrap();
        assert_eq!(html, "<p>追加の解説です。</p>");
        assert_eq!(llm.requests()[0].max_tokens, 2000);
    }
}
