//! In-memory taxonomy store

use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::RwLock;
use tracing::debug;

use super::{duplicate, TaxonomyStore, UpsertOutcome};
use crate::errors::{AppError, Result};
use crate::models::{TaxonomyEntry, TaxonomyKind};

/// Process-local store; can be switched into a failing state for tests
#[derive(Default)]
pub struct MemoryTaxonomyStore {
    entries: RwLock<Vec<TaxonomyEntry>>,
    unavailable: AtomicBool,
}

impl MemoryTaxonomyStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every operation fail with `CacheError`
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }

    fn check_available(&self) -> Result<()> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(AppError::CacheError {
                message: "Taxonomy store unavailable".to_string(),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl TaxonomyStore for MemoryTaxonomyStore {
    async fn find_by_name(&self, kind: TaxonomyKind, name: &str) -> Result<Option<TaxonomyEntry>> {
        self.check_available()?;
        let entries = self.entries.read().await;
        Ok(entries
            .iter()
            .find(|e| e.kind == kind && e.name == name)
            .cloned())
    }

    async fn find_by_external_id(&self, kind: TaxonomyKind, external_id: u64) -> Result<Option<TaxonomyEntry>> {
        self.check_available()?;
        let entries = self.entries.read().await;
        Ok(entries
            .iter()
            .find(|e| e.kind == kind && e.external_id == Some(external_id))
            .cloned())
    }

    async fn upsert(&self, entry: TaxonomyEntry) -> Result<UpsertOutcome> {
        self.check_available()?;
        let mut entries = self.entries.write().await;
        let kind = entry.kind;

        let by_external_id = entry.external_id.and_then(|id| {
            entries
                .iter()
                .position(|e| e.kind == kind && e.external_id == Some(id))
        });
        let existing = by_external_id.or_else(|| {
            entries.iter().position(|e| {
                e.kind == kind
                    && e.name == entry.name
                    && (e.external_id.is_none() || e.external_id == entry.external_id)
            })
        });

        for (index, other) in entries.iter().enumerate() {
            if Some(index) == existing || other.kind != kind {
                continue;
            }
            if other.name == entry.name {
                return Err(duplicate(kind, "name", &entry.name));
            }
            if other.slug == entry.slug {
                return Err(duplicate(kind, "slug", &entry.slug));
            }
        }

        match existing {
            Some(index) => {
                if !entries[index].differs_from(&entry) {
                    return Ok(UpsertOutcome::Unchanged);
                }
                debug!(kind = %kind, name = %entry.name, "Updating taxonomy entry");
                entries[index] = entry;
                Ok(UpsertOutcome::Updated)
            }
            None => {
                debug!(kind = %kind, name = %entry.name, "Inserting taxonomy entry");
                entries.push(entry);
                Ok(UpsertOutcome::Created)
            }
        }
    }

    async fn list(&self, kind: TaxonomyKind) -> Result<Vec<TaxonomyEntry>> {
        self.check_available()?;
        let mut listed: Vec<TaxonomyEntry> = self
            .entries
            .read()
            .await
            .iter()
            .filter(|e| e.kind == kind)
            .cloned()
            .collect();
        listed.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(listed)
    }
}
