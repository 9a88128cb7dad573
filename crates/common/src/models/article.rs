//! Finished article payload

use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationError};

use super::input::InternalLink;
use crate::errors::Result;

/// Question/answer pair
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct Faq {
    #[validate(length(min = 5, max = 200))]
    pub question: String,

    #[validate(length(min = 10))]
    pub answer_html: String,
}

/// Metadata returned by the finalization step.
///
/// Missing fields default to empty so validation, not parsing, reports them.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ArticleMetadata {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub slug: String,
    #[serde(default)]
    pub excerpt: String,
    #[serde(default)]
    pub meta_description: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub categories: Vec<String>,
    #[serde(default)]
    pub hero_image_prompt: Option<String>,
    #[serde(default)]
    pub faq: Vec<Faq>,
    #[serde(default)]
    pub cta_html: String,
    #[serde(default)]
    pub schema_org: serde_json::Map<String, serde_json::Value>,
}

/// Complete, sanitized article ready for publishing.
///
/// Built once per generation attempt and never mutated; a regeneration
/// produces a new value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct FinalArticle {
    #[validate(length(min = 10, max = 100))]
    pub title: String,

    #[validate(length(min = 3, max = 50), custom(function = "validate_slug"))]
    pub slug: String,

    #[validate(length(min = 50, max = 300))]
    pub excerpt: String,

    #[validate(length(min = 50, max = 160))]
    pub meta_description: String,

    #[validate(length(max = 10), custom(function = "validate_tags"))]
    pub tags: Vec<String>,

    #[validate(length(max = 5), custom(function = "validate_categories"))]
    pub categories: Vec<String>,

    #[validate(length(max = 500))]
    pub hero_image_prompt: Option<String>,

    #[validate(length(min = 1000))]
    pub body_html: String,

    #[validate(length(max = 10), nested)]
    pub faq: Vec<Faq>,

    #[validate(length(max = 15), nested)]
    pub internal_links: Vec<InternalLink>,

    pub cta_html: String,

    pub schema_org: serde_json::Map<String, serde_json::Value>,
}

/// `^[a-z0-9-]+$`
pub fn is_valid_slug(slug: &str) -> bool {
    !slug.is_empty()
        && slug
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
}

fn validate_slug(slug: &str) -> std::result::Result<(), ValidationError> {
    if is_valid_slug(slug) {
        Ok(())
    } else {
        Err(ValidationError::new("slug"))
    }
}

fn validate_each_length(
    items: &[String],
    min: usize,
    max: usize,
    code: &'static str,
) -> std::result::Result<(), ValidationError> {
    let ok = items.iter().all(|item| {
        let len = item.chars().count();
        (min..=max).contains(&len)
    });
    if ok {
        Ok(())
    } else {
        Err(ValidationError::new(code))
    }
}

fn validate_tags(tags: &Vec<String>) -> std::result::Result<(), ValidationError> {
    validate_each_length(tags, 2, 30, "tag_length")
}

fn validate_categories(categories: &Vec<String>) -> std::result::Result<(), ValidationError> {
    validate_each_length(categories, 2, 50, "category_length")
}

impl FinalArticle {
    /// Combine finalizer metadata with the adjusted body and validate once
    pub fn assemble(
        metadata: ArticleMetadata,
        body_html: String,
        internal_links: Vec<InternalLink>,
    ) -> Result<Self> {
        let article = Self {
            title: metadata.title,
            slug: metadata.slug,
            excerpt: metadata.excerpt,
            meta_description: metadata.meta_description,
            tags: metadata.tags,
            categories: metadata.categories,
            hero_image_prompt: metadata.hero_image_prompt,
            body_html,
            faq: metadata.faq,
            internal_links,
            cta_html: metadata.cta_html,
            schema_org: metadata.schema_org,
        };

        article.validate()?;
        Ok(article)
    }
}
