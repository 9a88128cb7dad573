//! Local taxonomy cache
//!
//! Provides:
//! - `TaxonomyStore` trait used by the taxonomy resolver
//! - In-memory store for tests and single-process runs
//! - Redis-backed store shared across workers

mod memory;
mod redis_store;

pub use memory::MemoryTaxonomyStore;
pub use redis_store::{keys, RedisTaxonomyStore};

use async_trait::async_trait;
use std::sync::Arc;

use crate::config::{RedisConfig, TaxonomyConfig};
use crate::errors::{AppError, Result};
use crate::models::{TaxonomyEntry, TaxonomyKind};

/// Result of an idempotent upsert
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpsertOutcome {
    Created,
    Updated,
    Unchanged,
}

/// Persistent store of resolved categories and tags.
///
/// Entries are unique per (kind, name) and (kind, slug); `external_id` is
/// unique per kind when present. Entries are never deleted.
#[async_trait]
pub trait TaxonomyStore: Send + Sync {
    async fn find_by_name(&self, kind: TaxonomyKind, name: &str) -> Result<Option<TaxonomyEntry>>;

    async fn find_by_external_id(&self, kind: TaxonomyKind, external_id: u64) -> Result<Option<TaxonomyEntry>>;

    /// Insert, or update in place the entry with the same external id
    /// (falling back to the same name). Conflicting name or slug → `Duplicate`.
    async fn upsert(&self, entry: TaxonomyEntry) -> Result<UpsertOutcome>;

    /// All entries of `kind`, sorted by name
    async fn list(&self, kind: TaxonomyKind) -> Result<Vec<TaxonomyEntry>>;
}

/// Create a taxonomy store based on configuration
pub async fn create_taxonomy_store(
    taxonomy: &TaxonomyConfig,
    redis: &RedisConfig,
) -> Result<Arc<dyn TaxonomyStore>> {
    match taxonomy.store.as_str() {
        "memory" => Ok(Arc::new(MemoryTaxonomyStore::new())),
        "redis" => Ok(Arc::new(RedisTaxonomyStore::connect(redis).await?)),
        other => Err(AppError::Configuration {
            message: format!("Unknown taxonomy store: {}", other),
        }),
    }
}

fn duplicate(kind: TaxonomyKind, field: &str, value: &str) -> AppError {
    AppError::Duplicate {
        message: format!("{} with {} '{}' already exists", kind, field, value),
    }
}
