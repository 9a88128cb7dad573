//! Category and tag resolution
//!
//! Maps names produced by the finalizer to CMS term ids:
//! - Local cache lookup by (kind, name)
//! - Create-on-miss through the CMS when enabled
//! - Categories fall back to a default id, tags are dropped
//! - Bulk sync of remote terms into the cache

mod slug;

pub use slug::{romanize, short_hash, slugify, MAX_SLUG_CHARS};

use serde::Serialize;
use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::cache::TaxonomyStore;
use crate::cms::ContentManagement;
use crate::config::TaxonomyConfig;
use crate::errors::Result;
use crate::models::{NewTerm, TaxonomyEntry, TaxonomyKind, Term};

/// Resolved term ids for one article
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ResolvedTaxonomies {
    pub categories: Vec<u64>,
    pub tags: Vec<u64>,
}

/// Resolves taxonomy names against the cache and the CMS
pub struct TaxonomyResolver {
    store: Arc<dyn TaxonomyStore>,
    cms: Arc<dyn ContentManagement>,
    auto_create_missing: AtomicBool,
    default_category_id: u64,
}

impl TaxonomyResolver {
    pub fn new(store: Arc<dyn TaxonomyStore>, cms: Arc<dyn ContentManagement>, config: &TaxonomyConfig) -> Self {
        Self {
            store,
            cms,
            auto_create_missing: AtomicBool::new(config.auto_create_missing),
            default_category_id: config.default_category_id,
        }
    }

    pub fn auto_create_missing(&self) -> bool {
        self.auto_create_missing.load(Ordering::SeqCst)
    }

    pub fn set_auto_create_missing(&self, enabled: bool) {
        self.auto_create_missing.store(enabled, Ordering::SeqCst);
        info!(enabled = enabled, "Taxonomy auto-create toggled");
    }

    /// Term ids for `names`, deduplicated in order.
    ///
    /// Never fails: a failed cache lookup falls back for the whole list
    /// (categories → default id, tags → none). A failed cache write after a
    /// create keeps the created id.
    pub async fn resolve(&self, names: &[String], kind: TaxonomyKind) -> Vec<u64> {
        if names.is_empty() {
            return Vec::new();
        }

        let ids = match self.resolve_names(names, kind).await {
            Ok(ids) => ids,
            Err(e) => {
                warn!(kind = %kind, error = %e, "Taxonomy resolution failed, using fallback");
                crate::metrics::record_taxonomy(kind.as_str(), "store_error");
                match kind {
                    TaxonomyKind::Category => vec![self.default_category_id],
                    TaxonomyKind::Tag => Vec::new(),
                }
            }
        };

        let mut seen = HashSet::new();
        ids.into_iter().filter(|id| seen.insert(*id)).collect()
    }

    /// Resolve categories and tags concurrently
    pub async fn resolve_for_article(&self, categories: &[String], tags: &[String]) -> ResolvedTaxonomies {
        let (categories, tags) = tokio::join!(
            self.resolve(categories, TaxonomyKind::Category),
            self.resolve(tags, TaxonomyKind::Tag)
        );
        ResolvedTaxonomies { categories, tags }
    }

    async fn resolve_names(&self, names: &[String], kind: TaxonomyKind) -> Result<Vec<u64>> {
        let mut ids = Vec::with_capacity(names.len());

        for name in names {
            let name = name.trim();
            if name.is_empty() {
                continue;
            }

            if let Some(id) = self.store.find_by_name(kind, name).await?.and_then(|e| e.external_id) {
                debug!(kind = %kind, name = %name, id = id, "Found cached term");
                crate::metrics::record_taxonomy(kind.as_str(), "hit");
                ids.push(id);
                continue;
            }

            if !self.auto_create_missing() {
                warn!(kind = %kind, name = %name, "Term not found and auto-create disabled");
                ids.extend(self.fallback(kind));
                continue;
            }

            let new_term = NewTerm {
                name: name.to_string(),
                slug: slugify(name),
                description: format!("Auto-generated {}: {}", kind, name),
            };
            match self.cms.create_term(kind, &new_term).await {
                Ok(term) => {
                    let mut entry = TaxonomyEntry::from_term(kind, &term);
                    // Cached under the requested name so the next lookup hits
                    entry.name = name.to_string();
                    if let Err(e) = self.store.upsert(entry).await {
                        warn!(
                            kind = %kind,
                            name = %name,
                            id = term.id,
                            error = %e,
                            "Failed to cache created term"
                        );
                        crate::metrics::record_taxonomy(kind.as_str(), "cache_write_error");
                    }

                    info!(kind = %kind, name = %name, id = term.id, "Created new term");
                    crate::metrics::record_taxonomy(kind.as_str(), "created");
                    ids.push(term.id);
                }
                Err(e) => {
                    warn!(kind = %kind, name = %name, error = %e, "Failed to create term");
                    ids.extend(self.fallback(kind));
                }
            }
        }

        Ok(ids)
    }

    fn fallback(&self, kind: TaxonomyKind) -> Option<u64> {
        crate::metrics::record_taxonomy(kind.as_str(), "fallback");
        match kind {
            TaxonomyKind::Category => Some(self.default_category_id),
            TaxonomyKind::Tag => None,
        }
    }

    /// Pull every remote category and tag into the cache.
    ///
    /// Returns (categories synced, tags synced); per-term failures are logged
    /// and skipped.
    pub async fn sync_from_cms(&self) -> Result<(usize, usize)> {
        info!("Starting taxonomy sync");

        let (categories, tags) =
            futures::try_join!(self.cms.list_categories(), self.cms.list_tags())?;

        let categories_synced = self.sync_terms(TaxonomyKind::Category, categories).await;
        let tags_synced = self.sync_terms(TaxonomyKind::Tag, tags).await;

        info!(
            categories = categories_synced,
            tags = tags_synced,
            "Taxonomy sync completed"
        );
        Ok((categories_synced, tags_synced))
    }

    async fn sync_terms(&self, kind: TaxonomyKind, terms: Vec<Term>) -> usize {
        let mut synced = 0;
        for term in terms {
            match self.store.upsert(TaxonomyEntry::from_term(kind, &term)).await {
                Ok(outcome) => {
                    debug!(kind = %kind, name = %term.name, outcome = ?outcome, "Synced term");
                    synced += 1;
                }
                Err(e) => warn!(kind = %kind, name = %term.name, error = %e, "Failed to sync term"),
            }
        }
        synced
    }

    /// Cached entries of `kind`, sorted by name
    pub async fn cached(&self, kind: TaxonomyKind) -> Result<Vec<TaxonomyEntry>> {
        self.store.list(kind).await
    }
}
