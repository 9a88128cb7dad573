//! Article generation request

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;
use validator::{Validate, ValidateUrl, ValidationError};

use crate::errors::Result;

/// Article tone
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Tone {
    #[default]
    Tech,
    Business,
    Casual,
    Formal,
    Academic,
}

impl Tone {
    pub fn as_str(&self) -> &'static str {
        match self {
            Tone::Tech => "tech",
            Tone::Business => "business",
            Tone::Casual => "casual",
            Tone::Formal => "formal",
            Tone::Academic => "academic",
        }
    }
}

impl fmt::Display for Tone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Internal link candidate
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct InternalLink {
    #[validate(length(min = 1, max = 100))]
    pub anchor: String,

    #[validate(url)]
    pub url: String,
}

/// Input for a single article generation run.
///
/// Immutable once submitted; call [`GenerationInput::check`] at the
/// boundary before handing it to the pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct GenerationInput {
    /// Article summary
    #[validate(length(min = 50, max = 1000))]
    pub summary: String,

    /// What the article should achieve
    #[validate(length(min = 20, max = 500))]
    pub goal: String,

    /// Intended readers
    #[validate(length(min = 10, max = 200))]
    pub audience: String,

    /// Topics the article must cover
    #[serde(default)]
    #[validate(length(max = 10))]
    pub must_topics: Vec<String>,

    /// Topics and words the article must avoid
    #[serde(default)]
    #[validate(length(max = 20))]
    pub bans: Vec<String>,

    /// Reference URLs
    #[serde(default)]
    #[validate(length(max = 5), custom(function = "validate_reference_urls"))]
    pub references: Vec<String>,

    #[serde(default)]
    pub tone: Tone,

    /// Target character count (whitespace excluded)
    #[serde(default = "default_target_chars")]
    #[validate(range(min = 9000, max = 11000))]
    pub target_chars: usize,

    #[serde(default)]
    #[validate(length(max = 100))]
    pub author: Option<String>,

    #[serde(default)]
    #[validate(length(max = 10), nested)]
    pub internal_links: Vec<InternalLink>,
}

fn default_target_chars() -> usize {
    10_000
}

fn validate_reference_urls(references: &Vec<String>) -> std::result::Result<(), ValidationError> {
    if references.iter().all(|r| r.validate_url()) {
        Ok(())
    } else {
        Err(ValidationError::new("url"))
    }
}

impl GenerationInput {
    /// Validate at the boundary, mapping failures to `AppError::Validation`
    pub fn check(&self) -> Result<()> {
        self.validate()?;
        Ok(())
    }

    /// Hosts of the reference URLs, used as a search domain filter
    pub fn reference_domains(&self) -> Option<Vec<String>> {
        let domains: Vec<String> = self
            .references
            .iter()
            .filter_map(|r| reqwest::Url::parse(r).ok())
            .filter_map(|u| u.host_str().map(str::to_string))
            .collect();

        if domains.is_empty() {
            None
        } else {
            Some(domains)
        }
    }

    /// Stable key for de-duplicating identical requests.
    ///
    /// The author is excluded so the same brief from two authors collapses.
    pub fn idempotency_key(&self) -> String {
        let mut value = serde_json::to_value(self).unwrap_or_default();
        if let Some(map) = value.as_object_mut() {
            map.remove("author");
        }
        // Field order is fixed by the struct, so the encoding is stable
        let canonical = value.to_string();

        let digest = Sha256::digest(canonical.as_bytes());
        hex::encode(digest)[..32].to_string()
    }
}


#[cfg(test)]
mod tests {
    use super::fixtures::sample_input;
    use super::*;
    use crate::errors::AppError;

    #[test]
    fn test_valid_input() {
        assert!(sample_input().check().is_ok());
    }

    #[test]
    fn test_target_chars_bounds() {
        let mut input = sample_input();
        input.target_chars = 9000;
        assert!(input.check().is_ok());
        input.target_chars = 11000;
        assert!(input.check().is_ok());
        input.target_chars = 8999;
        assert!(matches!(input.check(), Err(AppError::Validation { .. })));
        input.target_chars = 11001;
        assert!(input.check().is_err());
    }

    #[test]
    fn test_summary_length_counts_characters() {
        let mut input = sample_input();
        // 49 multi-byte characters is still too short
        input.summary = "あ".repeat(49);
        assert!(input.check().is_err());
        input.summary = "あ".repeat(50);
        assert!(input.check().is_ok());
    }

    #[test]
    fn test_reference_limits() {
        let mut input = sample_input();
        input.references = vec!["not a url".to_string()];
        assert!(input.check().is_err());

        input.references = (0..6).map(|i| format!("https://example.com/{}", i)).collect();
        assert!(input.check().is_err());
    }

    #[test]
    fn test_nested_internal_link_validation() {
        let mut input = sample_input();
        input.internal_links = vec![InternalLink {
            anchor: String::new(),
            url: "https://example.com/a".to_string(),
        }];
        assert!(input.check().is_err());
    }

    #[test]
    fn test_reference_domains() {
        let mut input = sample_input();
        input.references = vec![
            "https://example.com/guide".to_string(),
            "https://docs.example.org/a?b=c".to_string(),
        ];
        assert_eq!(
            input.reference_domains(),
            Some(vec!["example.com".to_string(), "docs.example.org".to_string()])
        );

        input.references.clear();
        assert_eq!(input.reference_domains(), None);
    }

    #[test]
    fn test_idempotency_key_ignores_author() {
        let a = sample_input();
        let mut b = sample_input();
        b.author = Some("山田".to_string());
        assert_eq!(a.idempotency_key(), b.idempotency_key());
        assert_eq!(a.idempotency_key().len(), 32);

        b.goal.push('!');
        assert_ne!(a.idempotency_key(), b.idempotency_key());
    }

    #[test]
    fn test_defaults_on_deserialize() {
        let json = serde_json::json!({
            "summary": sample_input().summary,
            "goal": sample_input().goal,
            "audience": sample_input().audience,
        });
        let input: GenerationInput = serde_json::from_value(json).unwrap();
        assert_eq!(input.target_chars, 10_000);
        assert_eq!(input.tone, Tone::Tech);
        assert!(input.must_topics.is_empty());
    }
}
