//! Outline generation

use std::sync::Arc;
use tracing::{info, warn};

use super::prompts;
use crate::errors::{AppError, Result};
use crate::llm::{CompletionRequest, LanguageModel};
use crate::models::{GenerationInput, Outline};

const OUTLINE_MAX_TOKENS: u32 = 2000;

/// Asks the model for a heading plan
#[derive(Clone)]
pub struct OutlineGenerator {
    llm: Arc<dyn LanguageModel>,
}

impl OutlineGenerator {
    pub fn new(llm: Arc<dyn LanguageModel>) -> Self {
        Self { llm }
    }

    /// One JSON-mode call; fails with `EmptyOutline` when no usable section comes back
    pub async fn generate(&self, input: &GenerationInput) -> Result<Outline> {
        let request = CompletionRequest::new(
            prompts::system_prompt(),
            prompts::outline_prompt(input),
            OUTLINE_MAX_TOKENS,
        )
        .json()
        .with_domain_filter(input.reference_domains());

        let completion = self.llm.complete(&request).await?;
        let outline: Outline = completion.parse_json()?;
        let outline = outline.without_blank_sections();

        if outline.sections.is_empty() {
            warn!("Outline contained no usable sections");
            return Err(AppError::EmptyOutline);
        }

        if !outline.within_policy() {
            warn!(
                sections = outline.sections.len(),
                "Outline shape outside the preferred 6-9 sections with 2-3 sub-headings"
            );
        }

        info!(
            title = %outline.title,
            sections = outline.sections.len(),
            "Generated outline"
        );
        Ok(outline)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::ScriptedLanguageModel;
    use crate::models::fixtures::sample_input;

    fn outline_generator(responses: &[&str]) -> (OutlineGenerator, Arc<ScriptedLanguageModel>) {
        let llm = Arc::new(ScriptedLanguageModel::new());
        for response in responses {
            llm.push(*response);
        }
        (OutlineGenerator::new(llm.clone()), llm)
    }

    #[tokio::test]
    async fn test_generates_outline() {
        let (generator, llm) = outline_generator(&[
            r#"{"title":"生成AI導入ガイド","sections":[{"h2":"はじめに","h3":["背景","目的"]},{"h2":"手順","h3":["準備","実行"]}]}"#,
        ]);

        let outline = generator.generate(&sample_input()).await.unwrap();
        assert_eq!(outline.sections.len(), 2);

        let requests = llm.requests();
        let request = &requests[0];
        assert!(request.is_json());
        assert_eq!(request.max_tokens, 2000);
        assert_eq!(request.domain_filter, Some(vec!["example.com".to_string()]));
    }

    #[tokio::test]
    async fn test_empty_outline_is_fatal() {
        for body in [r#"{"title":"x","sections":[]}"#, r#"{"title":"x"}"#, r#"{"sections":[{"h2":" ","h3":[]}]}"#] {
            let (generator, _) = outline_generator(&[body]);
            let result = generator.generate(&sample_input()).await;
            assert!(matches!(result, Err(AppError::EmptyOutline)), "body: {}", body);
        }
    }

    #[tokio::test]
    async fn test_malformed_outline() {
        let (generator, llm) = outline_generator(&["これはJSONではありません"]);
        let result = generator.generate(&sample_input()).await;
        assert!(matches!(result, Err(AppError::MalformedResponse { .. })));
        assert_eq!(llm.call_count(), 1);
    }
}
