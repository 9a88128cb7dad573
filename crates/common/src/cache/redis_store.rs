//! Redis-backed taxonomy store
//!
//! Layout per kind:
//! - `{prefix}:taxonomy:{kind}:name:{name}` → entry JSON
//! - `{prefix}:taxonomy:{kind}:slug:{slug}` → name
//! - `{prefix}:taxonomy:{kind}:ext:{id}` → name
//! - `{prefix}:taxonomy:{kind}:index` → set of names

use async_trait::async_trait;
use redis::{aio::ConnectionManager, AsyncCommands, Client};
use tracing::{debug, info};

use super::{duplicate, TaxonomyStore, UpsertOutcome};
use crate::config::RedisConfig;
use crate::errors::{AppError, Result};
use crate::models::{TaxonomyEntry, TaxonomyKind};

/// Redis taxonomy store client
pub struct RedisTaxonomyStore {
    connection: ConnectionManager,
    key_prefix: String,
}

impl RedisTaxonomyStore {
    /// Connect and verify the server responds
    pub async fn connect(config: &RedisConfig) -> Result<Self> {
        let client = Client::open(config.url.as_str()).map_err(|e| AppError::CacheError {
            message: format!("Failed to create Redis client: {}", e),
        })?;

        let connection = client
            .get_connection_manager()
            .await
            .map_err(|e| AppError::CacheError {
                message: format!("Failed to connect to Redis: {}", e),
            })?;

        let store = Self {
            connection,
            key_prefix: config.key_prefix.clone(),
        };
        store.ping().await?;

        info!(url = %config.url, prefix = %config.key_prefix, "Connected taxonomy store to Redis");
        Ok(store)
    }

    /// Ping Redis to check connectivity
    pub async fn ping(&self) -> Result<()> {
        let mut conn = self.connection.clone();
        redis::cmd("PING")
            .query_async::<String>(&mut conn)
            .await
            .map_err(|e| AppError::CacheError {
                message: format!("Redis ping failed: {}", e),
            })?;
        Ok(())
    }

    async fn load(&self, key: &str) -> Result<Option<TaxonomyEntry>> {
        let mut conn = self.connection.clone();
        let value: Option<String> = conn.get(key).await.map_err(|e| AppError::CacheError {
            message: format!("Failed to get key '{}': {}", key, e),
        })?;

        match value {
            Some(json) => {
                let entry = serde_json::from_str(&json).map_err(|e| AppError::CacheError {
                    message: format!("Failed to parse cached entry '{}': {}", key, e),
                })?;
                debug!(key = %key, "Cache hit");
                crate::metrics::record_cache(true, "taxonomy");
                Ok(Some(entry))
            }
            None => {
                debug!(key = %key, "Cache miss");
                crate::metrics::record_cache(false, "taxonomy");
                Ok(None)
            }
        }
    }

    async fn lookup_name(&self, key: &str) -> Result<Option<String>> {
        let mut conn = self.connection.clone();
        conn.get(key).await.map_err(|e| AppError::CacheError {
            message: format!("Failed to get key '{}': {}", key, e),
        })
    }
}

#[async_trait]
impl TaxonomyStore for RedisTaxonomyStore {
    async fn find_by_name(&self, kind: TaxonomyKind, name: &str) -> Result<Option<TaxonomyEntry>> {
        self.load(&keys::by_name(&self.key_prefix, kind, name)).await
    }

    async fn find_by_external_id(&self, kind: TaxonomyKind, external_id: u64) -> Result<Option<TaxonomyEntry>> {
        let pointer = keys::by_external_id(&self.key_prefix, kind, external_id);
        match self.lookup_name(&pointer).await? {
            Some(name) => self.find_by_name(kind, &name).await,
            None => Ok(None),
        }
    }

    async fn upsert(&self, entry: TaxonomyEntry) -> Result<UpsertOutcome> {
        let kind = entry.kind;
        let prefix = self.key_prefix.as_str();

        let by_external_id = match entry.external_id {
            Some(id) => self.find_by_external_id(kind, id).await?,
            None => None,
        };
        let existing = match by_external_id {
            Some(found) => Some(found),
            None => self
                .find_by_name(kind, &entry.name)
                .await?
                .filter(|e| e.external_id.is_none() || e.external_id == entry.external_id),
        };
        let existing_name = existing.as_ref().map(|e| e.name.as_str());

        if existing_name != Some(entry.name.as_str())
            && self.find_by_name(kind, &entry.name).await?.is_some()
        {
            return Err(duplicate(kind, "name", &entry.name));
        }
        if let Some(owner) = self.lookup_name(&keys::by_slug(prefix, kind, &entry.slug)).await? {
            if Some(owner.as_str()) != existing_name {
                return Err(duplicate(kind, "slug", &entry.slug));
            }
        }

        if let Some(current) = &existing {
            if !current.differs_from(&entry) {
                return Ok(UpsertOutcome::Unchanged);
            }
        }

        let json = serde_json::to_string(&entry).map_err(|e| AppError::CacheError {
            message: format!("Failed to serialize entry: {}", e),
        })?;
        let index = keys::index(prefix, kind);

        let mut pipe = redis::pipe();
        pipe.atomic();
        if let Some(current) = &existing {
            pipe.del(keys::by_name(prefix, kind, &current.name)).ignore();
            pipe.srem(&index, &current.name).ignore();
            pipe.del(keys::by_slug(prefix, kind, &current.slug)).ignore();
            if let Some(id) = current.external_id {
                pipe.del(keys::by_external_id(prefix, kind, id)).ignore();
            }
        }
        pipe.set(keys::by_name(prefix, kind, &entry.name), &json).ignore();
        pipe.set(keys::by_slug(prefix, kind, &entry.slug), &entry.name).ignore();
        if let Some(id) = entry.external_id {
            pipe.set(keys::by_external_id(prefix, kind, id), &entry.name).ignore();
        }
        pipe.sadd(&index, &entry.name).ignore();

        let mut conn = self.connection.clone();
        pipe.query_async::<()>(&mut conn)
            .await
            .map_err(|e| AppError::CacheError {
                message: format!("Failed to store taxonomy entry '{}': {}", entry.name, e),
            })?;

        debug!(kind = %kind, name = %entry.name, "Stored taxonomy entry");
        Ok(if existing.is_some() {
            UpsertOutcome::Updated
        } else {
            UpsertOutcome::Created
        })
    }

    async fn list(&self, kind: TaxonomyKind) -> Result<Vec<TaxonomyEntry>> {
        let mut conn = self.connection.clone();
        let index = keys::index(&self.key_prefix, kind);
        let names: Vec<String> = conn.smembers(&index).await.map_err(|e| AppError::CacheError {
            message: format!("Failed to read index '{}': {}", index, e),
        })?;

        let mut entries = Vec::with_capacity(names.len());
        for name in names {
            if let Some(entry) = self.find_by_name(kind, &name).await? {
                entries.push(entry);
            }
        }
        entries.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(entries)
    }
}

/// Cache key builder helpers
pub mod keys {
    use crate::models::TaxonomyKind;

    /// Build an entry key
    pub fn by_name(prefix: &str, kind: TaxonomyKind, name: &str) -> String {
        format!("{}:taxonomy:{}:name:{}", prefix, kind, name)
    }

    /// Build a slug pointer key
    pub fn by_slug(prefix: &str, kind: TaxonomyKind, slug: &str) -> String {
        format!("{}:taxonomy:{}:slug:{}", prefix, kind, slug)
    }

    /// Build an external id pointer key
    pub fn by_external_id(prefix: &str, kind: TaxonomyKind, id: u64) -> String {
        format!("{}:taxonomy:{}:ext:{}", prefix, kind, id)
    }

    /// Build the per-kind name index key
    pub fn index(prefix: &str, kind: TaxonomyKind) -> String {
        format!("{}:taxonomy:{}:index", prefix, kind)
    }
}
