//! Article metadata and final assembly

use std::sync::Arc;
use tracing::{info, warn};

use super::prompts;
use crate::content::{generate_excerpt, sanitize_html};
use crate::errors::Result;
use crate::llm::{CompletionRequest, LanguageModel};
use crate::models::{ArticleMetadata, FinalArticle, GenerationInput, Outline};
use crate::taxonomy::{short_hash, slugify};

const FINALIZE_MAX_TOKENS: u32 = 2000;

/// Characters of body HTML shown to the model
const PREVIEW_CHARS: usize = 1000;

/// Excerpt windows leave room for the "..." suffix
const EXCERPT_CHARS: usize = 297;
const META_DESCRIPTION_CHARS: usize = 157;

const MIN_SLUG_CHARS: usize = 3;

/// Produces the publish-ready article from the adjusted body
#[derive(Clone)]
pub struct Finalizer {
    llm: Arc<dyn LanguageModel>,
}

impl Finalizer {
    pub fn new(llm: Arc<dyn LanguageModel>) -> Self {
        Self { llm }
    }

    /// One JSON-mode call, then slug normalization, sanitization and validation
    pub async fn finalize(
        &self,
        input: &GenerationInput,
        outline: &Outline,
        body_html: String,
    ) -> Result<FinalArticle> {
        let preview: String = body_html.chars().take(PREVIEW_CHARS).collect();

        let request = CompletionRequest::new(
            prompts::system_prompt(),
            prompts::finalization_prompt(input, &outline.title, &preview),
            FINALIZE_MAX_TOKENS,
        )
        .json();

        let completion = self.llm.complete(&request).await?;
        let metadata: ArticleMetadata = completion.parse_json()?;
        let metadata = complete_metadata(metadata, outline, &body_html);

        let article = FinalArticle::assemble(metadata, body_html, input.internal_links.clone())
            .inspect_err(|e| warn!(error = %e, "Finalized article failed validation"))?;

        info!(
            title = %article.title,
            slug = %article.slug,
            tags = article.tags.len(),
            categories = article.categories.len(),
            faq = article.faq.len(),
            "Finalized article"
        );
        Ok(article)
    }
}

/// Fill gaps from the outline and body, normalize the slug, sanitize HTML fields
fn complete_metadata(mut metadata: ArticleMetadata, outline: &Outline, body_html: &str) -> ArticleMetadata {
    metadata.title = metadata.title.trim().to_string();
    if metadata.title.is_empty() {
        metadata.title = outline.title.trim().to_string();
    }
    if metadata.excerpt.trim().is_empty() {
        metadata.excerpt = generate_excerpt(body_html, EXCERPT_CHARS);
    }
    if metadata.meta_description.trim().is_empty() {
        metadata.meta_description = generate_excerpt(body_html, META_DESCRIPTION_CHARS);
    }

    let slug_source = if metadata.slug.trim().is_empty() {
        metadata.title.as_str()
    } else {
        metadata.slug.as_str()
    };
    let mut slug = slugify(slug_source);
    if slug.len() < MIN_SLUG_CHARS {
        slug = short_hash(slug_source);
    }
    metadata.slug = slug;

    metadata.cta_html = sanitize_html(&metadata.cta_html);
    for faq in &mut metadata.faq {
        faq.answer_html = sanitize_html(&faq.answer_html);
    }
    metadata.tags.retain(|tag| !tag.trim().is_empty());
    metadata.categories.retain(|category| !category.trim().is_empty());

    metadata
}
