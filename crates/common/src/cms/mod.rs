//! Content management service clients
//!
//! Provides:
//! - `ContentManagement` trait for terms, posts and media
//! - WordPress REST implementation
//! - In-memory implementation for tests and dry runs

mod memory;
mod wordpress;

pub use memory::MemoryContentManagement;
pub use wordpress::WordPressClient;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::errors::Result;
use crate::models::{NewTerm, TaxonomyKind, Term};

/// Post status as understood by the CMS
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PostStatus {
    Draft,
    Publish,
    Future,
}

impl PostStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PostStatus::Draft => "draft",
            PostStatus::Publish => "publish",
            PostStatus::Future => "future",
        }
    }
}

impl fmt::Display for PostStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Post creation payload
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NewPost {
    pub title: String,
    pub content: String,
    pub excerpt: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub slug: String,
    pub status: PostStatus,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub categories: Vec<u64>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<u64>,
    #[serde(skip_serializing_if = "serde_json::Map::is_empty")]
    pub meta: serde_json::Map<String, serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub featured_media: Option<u64>,
    /// Publication time for scheduled posts
    #[serde(rename = "date_gmt", skip_serializing_if = "Option::is_none", with = "wp_date")]
    pub date: Option<DateTime<Utc>>,
}

/// Created post as reported by the CMS
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreatedPost {
    pub id: u64,
    pub link: String,
    pub status: String,
}

/// Raw media file to upload
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaUpload {
    pub filename: String,
    pub content_type: String,
    pub data: Vec<u8>,
    pub title: Option<String>,
    pub alt_text: Option<String>,
}

/// Uploaded media as reported by the CMS
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadedMedia {
    pub id: u64,
    #[serde(default)]
    pub source_url: String,
}

/// Operations the publishing side needs from a CMS
#[async_trait]
pub trait ContentManagement: Send + Sync {
    /// Every term of `kind`
    async fn list_terms(&self, kind: TaxonomyKind) -> Result<Vec<Term>>;

    async fn create_term(&self, kind: TaxonomyKind, term: &NewTerm) -> Result<Term>;

    async fn create_post(&self, post: &NewPost) -> Result<CreatedPost>;

    async fn upload_media(&self, upload: &MediaUpload) -> Result<UploadedMedia>;

    /// Authenticated round trip to the API root
    async fn test_connection(&self) -> Result<()>;

    async fn list_categories(&self) -> Result<Vec<Term>> {
        self.list_terms(TaxonomyKind::Category).await
    }

    async fn list_tags(&self) -> Result<Vec<Term>> {
        self.list_terms(TaxonomyKind::Tag).await
    }

    async fn create_category(&self, term: &NewTerm) -> Result<Term> {
        self.create_term(TaxonomyKind::Category, term).await
    }

    async fn create_tag(&self, term: &NewTerm) -> Result<Term> {
        self.create_term(TaxonomyKind::Tag, term).await
    }
}

/// WordPress expects `YYYY-MM-DDTHH:MM:SS` without an offset for `date_gmt`
mod wp_date {
    use chrono::{DateTime, Utc};
    use serde::Serializer;

    const FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

    pub fn serialize<S: Serializer>(date: &Option<DateTime<Utc>>, serializer: S) -> Result<S::Ok, S::Error> {
        match date {
            Some(date) => serializer.serialize_str(&date.format(FORMAT).to_string()),
            None => serializer.serialize_none(),
        }
    }
}
