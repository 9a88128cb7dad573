//! Publishing finished articles to the CMS
//!
//! Resolves taxonomies, assembles the post payload and creates the post.
//! Scheduled posts are created with the `future` status and a GMT date.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use tracing::info;

use crate::cms::{ContentManagement, MediaUpload, NewPost, PostStatus, UploadedMedia};
use crate::errors::{AppError, Result};
use crate::models::FinalArticle;
use crate::taxonomy::{ResolvedTaxonomies, TaxonomyResolver};

/// How the post should go live
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PublishMode {
    Draft,
    Publish,
    Schedule,
}

impl PublishMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            PublishMode::Draft => "draft",
            PublishMode::Publish => "publish",
            PublishMode::Schedule => "schedule",
        }
    }

    pub fn post_status(&self) -> PostStatus {
        match self {
            PublishMode::Draft => PostStatus::Draft,
            PublishMode::Publish => PostStatus::Publish,
            PublishMode::Schedule => PostStatus::Future,
        }
    }
}

impl fmt::Display for PublishMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PublishMode {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "draft" => Ok(PublishMode::Draft),
            "publish" => Ok(PublishMode::Publish),
            "schedule" => Ok(PublishMode::Schedule),
            other => Err(AppError::Validation {
                message: format!("Unknown publish mode: {}", other),
                field: Some("mode".to_string()),
            }),
        }
    }
}

/// Publish options
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublishRequest {
    pub mode: PublishMode,
    #[serde(default)]
    pub schedule_at: Option<DateTime<Utc>>,
}

impl PublishRequest {
    pub fn draft() -> Self {
        Self { mode: PublishMode::Draft, schedule_at: None }
    }

    /// `schedule_at` is required for scheduling and, when given, must be after `now`
    pub fn validate_at(&self, now: DateTime<Utc>) -> Result<()> {
        if self.mode == PublishMode::Schedule && self.schedule_at.is_none() {
            return Err(AppError::Validation {
                message: "schedule_at is required for scheduled posts".to_string(),
                field: Some("schedule_at".to_string()),
            });
        }
        if let Some(at) = self.schedule_at {
            if at <= now {
                return Err(AppError::Validation {
                    message: "schedule_at must be in the future".to_string(),
                    field: Some("schedule_at".to_string()),
                });
            }
        }
        Ok(())
    }
}

/// Result of a successful publish
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PublishOutcome {
    pub post_id: u64,
    pub post_url: String,
    pub status: String,
    pub taxonomies: ResolvedTaxonomies,
}

/// Post payload for `article`
pub fn build_post(
    article: &FinalArticle,
    request: &PublishRequest,
    taxonomies: &ResolvedTaxonomies,
    featured_media: Option<u64>,
) -> NewPost {
    let mut meta = serde_json::Map::new();
    meta.insert(
        "description".to_string(),
        serde_json::Value::String(article.meta_description.clone()),
    );

    let date = match request.mode {
        PublishMode::Schedule => request.schedule_at,
        _ => None,
    };

    NewPost {
        title: article.title.clone(),
        content: article.body_html.clone(),
        excerpt: article.excerpt.clone(),
        slug: article.slug.clone(),
        status: request.mode.post_status(),
        categories: taxonomies.categories.clone(),
        tags: taxonomies.tags.clone(),
        meta,
        featured_media,
        date,
    }
}

/// Publishes articles through a CMS
pub struct Publisher {
    cms: Arc<dyn ContentManagement>,
    resolver: Arc<TaxonomyResolver>,
}

impl Publisher {
    pub fn new(cms: Arc<dyn ContentManagement>, resolver: Arc<TaxonomyResolver>) -> Self {
        Self { cms, resolver }
    }

    /// Validate the request, resolve taxonomies and create the post
    pub async fn publish(
        &self,
        article: &FinalArticle,
        request: &PublishRequest,
        featured_media: Option<u64>,
    ) -> Result<PublishOutcome> {
        request.validate_at(Utc::now())?;

        let taxonomies = self
            .resolver
            .resolve_for_article(&article.categories, &article.tags)
            .await;
        info!(
            slug = %article.slug,
            categories = ?taxonomies.categories,
            tags = ?taxonomies.tags,
            "Resolved taxonomies"
        );

        let post = build_post(article, request, &taxonomies, featured_media);
        let created = self.cms.create_post(&post).await?;

        info!(
            post_id = created.id,
            url = %created.link,
            mode = %request.mode,
            "Published article"
        );

        Ok(PublishOutcome {
            post_id: created.id,
            post_url: created.link,
            status: created.status,
            taxonomies,
        })
    }

    /// Upload a file, typically the hero image
    pub async fn upload_media(&self, upload: &MediaUpload) -> Result<UploadedMedia> {
        if upload.data.is_empty() || upload.filename.is_empty() || upload.content_type.is_empty() {
            return Err(AppError::Validation {
                message: "Media upload needs data, filename and content type".to_string(),
                field: Some("media".to_string()),
            });
        }
        self.cms.upload_media(upload).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::MemoryTaxonomyStore;
    use crate::cms::MemoryContentManagement;
    use crate::config::TaxonomyConfig;
    use crate::models::fixtures::sample_metadata;
    use chrono::Duration;

    fn article() -> FinalArticle {
        let body = format!("<h2>はじめに</h2><p>{}</p>", "本文".repeat(600));
        FinalArticle::assemble(sample_metadata(), body, vec![]).unwrap()
    }

    fn publisher() -> (Publisher, Arc<MemoryContentManagement>) {
        let cms = Arc::new(MemoryContentManagement::new());
        let resolver = Arc::new(TaxonomyResolver::new(
            Arc::new(MemoryTaxonomyStore::new()),
            cms.clone(),
            &TaxonomyConfig::default(),
        ));
        (Publisher::new(cms.clone(), resolver), cms)
    }

    #[test]
    fn test_schedule_requires_future_time() {
        let now = Utc::now();
        let missing = PublishRequest { mode: PublishMode::Schedule, schedule_at: None };
        assert!(missing.validate_at(now).is_err());

        let past = PublishRequest {
            mode: PublishMode::Schedule,
            schedule_at: Some(now - Duration::minutes(1)),
        };
        assert!(matches!(past.validate_at(now), Err(AppError::Validation { .. })));

        let future = PublishRequest {
            mode: PublishMode::Schedule,
            schedule_at: Some(now + Duration::hours(1)),
        };
        assert!(future.validate_at(now).is_ok());
        assert!(PublishRequest::draft().validate_at(now).is_ok());
    }

    #[test]
    fn test_mode_parse() {
        assert_eq!("Schedule".parse::<PublishMode>().unwrap(), PublishMode::Schedule);
        assert!("later".parse::<PublishMode>().is_err());
        assert_eq!(PublishMode::Schedule.post_status(), PostStatus::Future);
    }

    #[test]
    fn test_build_post() {
        let at = Utc::now() + Duration::days(1);
        let taxonomies = ResolvedTaxonomies { categories: vec![3], tags: vec![4, 5] };

        let scheduled = PublishRequest { mode: PublishMode::Schedule, schedule_at: Some(at) };
        let post = build_post(&article(), &scheduled, &taxonomies, Some(9));
        assert_eq!(post.status, PostStatus::Future);
        assert_eq!(post.date, Some(at));
        assert_eq!(post.tags, vec![4, 5]);
        assert_eq!(post.featured_media, Some(9));
        assert_eq!(post.meta["description"], article().meta_description.as_str());

        let draft = build_post(&article(), &PublishRequest::draft(), &taxonomies, None);
        assert_eq!(draft.status, PostStatus::Draft);
        assert!(draft.date.is_none());
    }

    #[tokio::test]
    async fn test_publish_draft() {
        let (publisher, cms) = publisher();
        let outcome = publisher
            .publish(&article(), &PublishRequest::draft(), None)
            .await
            .unwrap();

        assert_eq!(outcome.status, "draft");
        assert_eq!(outcome.taxonomies.categories.len(), 1);
        assert_eq!(outcome.taxonomies.tags.len(), 2);
        assert!(outcome.post_url.ends_with("generative-ai-guide"));

        let posts = cms.posts();
        assert_eq!(posts.len(), 1);
        assert_eq!(posts[0].categories, outcome.taxonomies.categories);
    }

    #[tokio::test]
    async fn test_invalid_request_creates_nothing() {
        let (publisher, cms) = publisher();
        let request = PublishRequest { mode: PublishMode::Schedule, schedule_at: None };
        assert!(publisher.publish(&article(), &request, None).await.is_err());
        assert!(cms.posts().is_empty());
        assert_eq!(cms.term_creates(), 0);
    }

    #[tokio::test]
    async fn test_upload_media_validates_input() {
        let (publisher, _) = publisher();
        let empty = MediaUpload {
            filename: "hero.png".into(),
            content_type: "image/png".into(),
            data: vec![],
            title: None,
            alt_text: None,
        };
        tokio_test::assert_err!(publisher.upload_media(&empty).await);

        let upload = MediaUpload { data: vec![1, 2, 3], ..empty };
        let uploaded = tokio_test::assert_ok!(publisher.upload_media(&upload).await);
        assert!(uploaded.source_url.ends_with("hero.png"));
    }
}
