//! Article generation pipeline
//!
//! Stages, each calling the language model through [`LanguageModel`]:
//! - Outline: heading plan in JSON mode
//! - Sections: one sequential call per outline section
//! - Merge: join fragments and normalize boundaries
//! - Length: expand or condense toward `target ± tolerance`
//! - Finalize: metadata, slug and validation

mod finalizer;
mod length;
mod merger;
mod outline;
pub mod prompts;
mod section;

pub use finalizer::Finalizer;
pub use length::{
    condense, condense_long_lists, insert_after_section, AdjustmentAction, AdjustmentReport,
    LengthAdjuster,
};
pub use merger::{clean_merged, merge_sections};
pub use outline::OutlineGenerator;
pub use section::SectionGenerator;

use serde::Serialize;
use std::sync::Arc;
use std::time::Instant;
use tracing::{error, info, warn};

use crate::config::PipelineConfig;
use crate::content::{sanitize_html, validate_length};
use crate::errors::Result;
use crate::llm::LanguageModel;
use crate::models::{FinalArticle, GenerationInput, LengthVerdict, Outline};

/// Output of one successful pipeline run
#[derive(Debug, Clone, Serialize)]
pub struct GeneratedArticle {
    pub article: FinalArticle,
    pub outline: Outline,
    /// Verdict of the accepted body
    pub verdict: LengthVerdict,
    pub adjustment: AdjustmentAction,
}

/// Runs every stage for one input; holds no per-run state
#[derive(Clone)]
pub struct ArticlePipeline {
    outlines: OutlineGenerator,
    sections: SectionGenerator,
    adjuster: LengthAdjuster,
    finalizer: Finalizer,
}

impl ArticlePipeline {
    pub fn new(llm: Arc<dyn LanguageModel>, config: &PipelineConfig) -> Self {
        let sections = SectionGenerator::new(
            llm.clone(),
            config.min_section_chars,
            config.max_section_chars,
        );
        let adjuster = LengthAdjuster::new(
            sections.clone(),
            config.tolerance,
            config.max_expansion_sections,
        );

        Self {
            outlines: OutlineGenerator::new(llm.clone()),
            sections,
            adjuster,
            finalizer: Finalizer::new(llm),
        }
    }

    /// Generate a complete article or fail outright
    pub async fn generate(&self, input: &GenerationInput) -> Result<GeneratedArticle> {
        let start = Instant::now();

        match self.run(input).await {
            Ok(generated) => {
                crate::metrics::record_pipeline(
                    start.elapsed().as_secs_f64(),
                    "success",
                    Some(generated.verdict.char_count),
                );
                Ok(generated)
            }
            Err(e) => {
                error!(error = %e, code = e.code().as_code(), "Article generation failed");
                crate::metrics::record_pipeline(start.elapsed().as_secs_f64(), "error", None);
                Err(e)
            }
        }
    }

    async fn run(&self, input: &GenerationInput) -> Result<GeneratedArticle> {
        input.check()?;
        info!(
            target_chars = input.target_chars,
            tone = %input.tone,
            "Starting article generation"
        );

        let outline = self.outlines.generate(input).await?;

        let per_section = self
            .sections
            .target_per_section(input.target_chars, outline.sections.len());
        let mut fragments = Vec::with_capacity(outline.sections.len());
        for section in &outline.sections {
            fragments.push(self.sections.generate(input, section, per_section).await?);
        }

        let merged = merge_sections(&fragments);
        info!(
            sections = fragments.len(),
            char_count = merged.char_count,
            "Merged sections"
        );

        let report = self.adjuster.adjust(input, &outline, &merged).await?;

        let body_html = sanitize_html(&report.html);
        let verdict = validate_length(&body_html, input.target_chars, self.adjuster.tolerance());
        if verdict.is_valid() {
            info!(
                char_count = verdict.char_count,
                action = report.action.label(),
                "Length accepted"
            );
        } else {
            warn!(
                char_count = verdict.char_count,
                min = verdict.min,
                max = verdict.max,
                status = %verdict.status,
                "Length still outside the band after adjustment"
            );
        }

        let article = self.finalizer.finalize(input, &outline, body_html).await?;

        Ok(GeneratedArticle {
            article,
            outline,
            verdict,
            adjustment: report.action,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::AppError;
    use crate::llm::ScriptedLanguageModel;
    use crate::models::fixtures::{sample_input, sample_metadata};

    const OUTLINE: &str = r#"{"title":"生成AI導入ガイド","sections":[{"h2":"準備","h3":["体制","予算"]},{"h2":"運用","h3":["定着","改善"]}]}"#;

    fn section(heading: &str, chars: usize) -> String {
        format!("<h2>{}</h2><p>{}</p>", heading, "あ".repeat(chars - heading.chars().count()))
    }

    fn pipeline(llm: &Arc<ScriptedLanguageModel>) -> ArticlePipeline {
        ArticlePipeline::new(llm.clone(), &PipelineConfig::default())
    }

    #[tokio::test]
    async fn test_generates_article_within_band() {
        let llm = Arc::new(ScriptedLanguageModel::new());
        llm.push(OUTLINE)
            .push(section("準備", 5000))
            .push(section("運用", 5000))
            .push(serde_json::to_string(&sample_metadata()).unwrap());

        let generated = pipeline(&llm).generate(&sample_input()).await.unwrap();

        assert_eq!(generated.verdict.char_count, 10_000);
        assert!(generated.verdict.is_valid());
        assert_eq!(generated.adjustment, AdjustmentAction::Unchanged);
        assert_eq!(generated.outline.sections.len(), 2);
        assert!(generated.article.body_html.starts_with("<h2>準備</h2>"));
        assert_eq!(llm.call_count(), 4);

        // Both sections get the clamped even share
        let requests = llm.requests();
        assert!(requests[1].messages[1].content.contains("およそ3000字"));
    }

    #[tokio::test]
    async fn test_invalid_input_makes_no_calls() {
        let llm = Arc::new(ScriptedLanguageModel::new());
        let mut input = sample_input();
        input.target_chars = 5000;

        let result = pipeline(&llm).generate(&input).await;
        assert!(matches!(result, Err(AppError::Validation { .. })));
        assert_eq!(llm.call_count(), 0);
    }

    #[tokio::test]
    async fn test_section_failure_is_fatal() {
        let llm = Arc::new(ScriptedLanguageModel::new());
        llm.push(OUTLINE)
            .push(section("準備", 5000))
            .push_error(AppError::upstream("perplexity", 500, "unavailable".into()));

        let result = pipeline(&llm).generate(&sample_input()).await;
        assert!(matches!(result, Err(AppError::Upstream { .. })));
        assert_eq!(llm.call_count(), 3);
    }

    #[tokio::test]
    async fn test_empty_outline_stops_pipeline() {
        let llm = Arc::new(ScriptedLanguageModel::new());
        llm.push(r#"{"title":"x","sections":[]}"#);

        let result = pipeline(&llm).generate(&sample_input()).await;
        assert!(matches!(result, Err(AppError::EmptyOutline)));
        assert_eq!(llm.call_count(), 1);
    }

    #[tokio::test]
    async fn test_long_article_is_condensed_before_finalizing() {
        let llm = Arc::new(ScriptedLanguageModel::new());
        let long_section = |heading: &str| {
            let mut html = format!("<h2>{}</h2>", heading);
            for _ in 0..25 {
                html.push_str(&format!("<p>{}</p>", "い".repeat(260)));
            }
            html
        };
        llm.push(OUTLINE)
            .push(long_section("準備"))
            .push(long_section("運用"))
            .push(serde_json::to_string(&sample_metadata()).unwrap());

        let generated = pipeline(&llm).generate(&sample_input()).await.unwrap();

        assert!(matches!(generated.adjustment, AdjustmentAction::Condensed { .. }));
        assert!(generated.verdict.char_count < 13_000);
        assert_eq!(llm.call_count(), 4);
    }
}
