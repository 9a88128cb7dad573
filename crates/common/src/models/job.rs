//! Article job tracking

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Article processing status
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArticleStatus {
    Pending,
    Generating,
    Generated,
    Publishing,
    Published,
    Failed,
}

impl From<String> for ArticleStatus {
    fn from(s: String) -> Self {
        match s.as_str() {
            "pending" => ArticleStatus::Pending,
            "generating" => ArticleStatus::Generating,
            "generated" => ArticleStatus::Generated,
            "publishing" => ArticleStatus::Publishing,
            "published" => ArticleStatus::Published,
            "failed" => ArticleStatus::Failed,
            _ => ArticleStatus::Pending,
        }
    }
}

impl From<ArticleStatus> for String {
    fn from(status: ArticleStatus) -> Self {
        match status {
            ArticleStatus::Pending => "pending".to_string(),
            ArticleStatus::Generating => "generating".to_string(),
            ArticleStatus::Generated => "generated".to_string(),
            ArticleStatus::Publishing => "publishing".to_string(),
            ArticleStatus::Published => "published".to_string(),
            ArticleStatus::Failed => "failed".to_string(),
        }
    }
}

/// One article's trip through generation and publishing
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ArticleJob {
    pub id: Uuid,

    pub idempotency_key: String,

    pub status: ArticleStatus,

    pub slug: Option<String>,

    pub char_count: usize,

    pub post_id: Option<u64>,

    pub post_url: Option<String>,

    pub error_message: Option<String>,

    pub created_at: DateTime<Utc>,

    pub updated_at: DateTime<Utc>,
}

impl ArticleJob {
    pub fn new(idempotency_key: String) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            idempotency_key,
            status: ArticleStatus::Pending,
            slug: None,
            char_count: 0,
            post_id: None,
            post_url: None,
            error_message: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn mark_generating(&mut self) {
        self.transition(ArticleStatus::Generating);
    }

    /// Record generation output
    pub fn mark_generated(&mut self, slug: &str, char_count: usize) {
        self.slug = Some(slug.to_string());
        self.char_count = char_count;
        self.transition(ArticleStatus::Generated);
    }

    pub fn mark_publishing(&mut self) {
        self.transition(ArticleStatus::Publishing);
    }

    pub fn mark_published(&mut self, post_id: u64, post_url: &str) {
        self.post_id = Some(post_id);
        self.post_url = Some(post_url.to_string());
        self.transition(ArticleStatus::Published);
    }

    pub fn mark_failed(&mut self, error: &str) {
        self.error_message = Some(error.to_string());
        self.transition(ArticleStatus::Failed);
    }

    /// Check if the job is in a terminal state
    pub fn is_terminal(&self) -> bool {
        matches!(self.status, ArticleStatus::Published | ArticleStatus::Failed)
    }

    fn transition(&mut self, status: ArticleStatus) {
        self.status = status;
        self.updated_at = Utc::now();
    }
}
