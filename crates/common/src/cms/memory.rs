//! In-memory CMS used by tests and dry runs

use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::Mutex;

use super::{ContentManagement, CreatedPost, MediaUpload, NewPost, UploadedMedia};
use crate::errors::{AppError, Result};
use crate::models::{NewTerm, TaxonomyKind, Term};

const SERVICE: &str = "memory-cms";

/// Stores terms and posts in process; ids are sequential from 100
pub struct MemoryContentManagement {
    categories: Mutex<Vec<Term>>,
    tags: Mutex<Vec<Term>>,
    posts: Mutex<Vec<(CreatedPost, NewPost)>>,
    next_id: AtomicU64,
    term_creates: AtomicUsize,
    fail_creates: AtomicBool,
}

impl Default for MemoryContentManagement {
    fn default() -> Self {
        Self {
            categories: Mutex::new(Vec::new()),
            tags: Mutex::new(Vec::new()),
            posts: Mutex::new(Vec::new()),
            next_id: AtomicU64::new(100),
            term_creates: AtomicUsize::new(0),
            fail_creates: AtomicBool::new(false),
        }
    }
}

impl MemoryContentManagement {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a remote term without counting it as a create
    pub fn insert_term(&self, kind: TaxonomyKind, term: Term) {
        lock(self.terms(kind)).push(term);
    }

    /// Make term creation fail with an upstream error
    pub fn set_fail_creates(&self, fail: bool) {
        self.fail_creates.store(fail, Ordering::SeqCst);
    }

    /// Number of successful `create_term` calls
    pub fn term_creates(&self) -> usize {
        self.term_creates.load(Ordering::SeqCst)
    }

    pub fn posts(&self) -> Vec<NewPost> {
        lock(&self.posts).iter().map(|(_, post)| post.clone()).collect()
    }

    fn terms(&self, kind: TaxonomyKind) -> &Mutex<Vec<Term>> {
        match kind {
            TaxonomyKind::Category => &self.categories,
            TaxonomyKind::Tag => &self.tags,
        }
    }

    fn next_id(&self) -> u64 {
        self.next_id.fetch_add(1, Ordering::SeqCst)
    }
}

fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

#[async_trait]
impl ContentManagement for MemoryContentManagement {
    async fn list_terms(&self, kind: TaxonomyKind) -> Result<Vec<Term>> {
        Ok(lock(self.terms(kind)).clone())
    }

    async fn create_term(&self, kind: TaxonomyKind, term: &NewTerm) -> Result<Term> {
        if self.fail_creates.load(Ordering::SeqCst) {
            return Err(AppError::upstream(SERVICE, 500, format!("cannot create {}", kind)));
        }

        let mut terms = lock(self.terms(kind));
        if terms.iter().any(|t| t.slug == term.slug) {
            return Err(AppError::upstream(SERVICE, 400, "term_exists".to_string()));
        }

        let created = Term {
            id: self.next_id(),
            name: term.name.clone(),
            slug: term.slug.clone(),
            description: term.description.clone(),
        };
        terms.push(created.clone());
        self.term_creates.fetch_add(1, Ordering::SeqCst);
        Ok(created)
    }

    async fn create_post(&self, post: &NewPost) -> Result<CreatedPost> {
        let id = self.next_id();
        let slug = if post.slug.is_empty() { id.to_string() } else { post.slug.clone() };
        let created = CreatedPost {
            id,
            link: format!("https://cms.invalid/{}", slug),
            status: post.status.as_str().to_string(),
        };
        lock(&self.posts).push((created.clone(), post.clone()));
        Ok(created)
    }

    async fn upload_media(&self, upload: &MediaUpload) -> Result<UploadedMedia> {
        let id = self.next_id();
        Ok(UploadedMedia {
            id,
            source_url: format!("https://cms.invalid/media/{}", upload.filename),
        })
    }

    async fn test_connection(&self) -> Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_term(name: &str, slug: &str) -> NewTerm {
        NewTerm {
            name: name.into(),
            slug: slug.into(),
            description: String::new(),
        }
    }

    #[tokio::test]
    async fn test_create_and_list() {
        let cms = MemoryContentManagement::new();
        let created = cms.create_tag(&new_term("AI", "ai")).await.unwrap();
        assert_eq!(created.id, 100);
        assert_eq!(cms.list_tags().await.unwrap(), vec![created]);
        assert!(cms.list_categories().await.unwrap().is_empty());
        assert_eq!(cms.term_creates(), 1);
    }

    #[tokio::test]
    async fn test_duplicate_slug_rejected() {
        let cms = MemoryContentManagement::new();
        cms.create_category(&new_term("AI", "ai")).await.unwrap();
        let result = cms.create_category(&new_term("エーアイ", "ai")).await;
        assert!(matches!(result, Err(AppError::Upstream { status: Some(400), .. })));
    }

    #[tokio::test]
    async fn test_failing_creates() {
        let cms = MemoryContentManagement::new();
        cms.set_fail_creates(true);
        assert!(cms.create_tag(&new_term("AI", "ai")).await.is_err());
        assert_eq!(cms.term_creates(), 0);
    }
}
