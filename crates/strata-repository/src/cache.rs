//! Watermark-checked caching decorator
//!
//! [`CachingStorage`] wraps any [`StorageAdapter`] and memoizes record
//! reads. Every cached read first fetches the current last-modified
//! watermark from the wrapped adapter (a cheap indexed lookup) and serves
//! the cached payload only while the entry is TTL-fresh *and* was stored
//! under that exact watermark — so a mutation through any other client
//! invalidates dependent entries without explicit invalidation calls.
//!
//! Content-type definitions have their own TTL-only cache with an
//! independent configuration; it is not kept consistent with record-level
//! caching.
//!
//! Caching is a performance layer, not a correctness dependency: cache
//! bookkeeping never fails an operation, and time-shifted (historical)
//! reads bypass the cache entirely.
//!
//! Cache state machine per entry:
//!
//! ```text
//! Uncached -> Cached(watermark = W) -> Stale (current != W or TTL expired)
//!          -> Cached(watermark = W')
//! ```

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tokio::sync::RwLock;
use tracing::debug;

use strata_core::{ContentTypeDefinition, DataDimensions, Record};

use crate::error::RepositoryResult;
use crate::models::{CacheConfig, CacheStats, CachedDefinition, CachedEntry, RecordQuery};
use crate::traits::StorageAdapter;

/// Caching storage adapter wrapping a concrete backend.
pub struct CachingStorage {
    inner: Arc<dyn StorageAdapter>,
    /// Single-record entries
    record_cache: Arc<RwLock<HashMap<String, CachedEntry<Record>>>>,
    /// Listing entries
    list_cache: Arc<RwLock<HashMap<String, CachedEntry<Vec<Record>>>>>,
    /// Count entries
    count_cache: Arc<RwLock<HashMap<String, CachedEntry<u64>>>>,
    /// TTL-only definition entries
    definition_cache: Arc<RwLock<HashMap<String, CachedDefinition<ContentTypeDefinition>>>>,
    /// Record-cache configuration
    cache_config: Arc<Mutex<CacheConfig>>,
    /// Definition-cache configuration (independent of record caching)
    definition_cache_config: Arc<Mutex<CacheConfig>>,
    /// Cache statistics
    stats: Arc<Mutex<CacheStats>>,
}

impl CachingStorage {
    /// Wrap an adapter with default record and definition cache settings.
    ///
    /// # Example
    /// ```
    /// use std::sync::Arc;
    /// use strata_repository::{CachingStorage, MemoryStorage};
    ///
    /// let storage = CachingStorage::new(Arc::new(MemoryStorage::new("example")));
    /// ```
    pub fn new(inner: Arc<dyn StorageAdapter>) -> Self {
        Self::with_configs(inner, CacheConfig::default(), CacheConfig::default())
    }

    /// Wrap an adapter with explicit record and definition cache settings.
    pub fn with_configs(
        inner: Arc<dyn StorageAdapter>,
        record_config: CacheConfig,
        definition_config: CacheConfig,
    ) -> Self {
        Self {
            inner,
            record_cache: Arc::new(RwLock::new(HashMap::new())),
            list_cache: Arc::new(RwLock::new(HashMap::new())),
            count_cache: Arc::new(RwLock::new(HashMap::new())),
            definition_cache: Arc::new(RwLock::new(HashMap::new())),
            cache_config: Arc::new(Mutex::new(record_config)),
            definition_cache_config: Arc::new(Mutex::new(definition_config)),
            stats: Arc::new(Mutex::new(CacheStats::default())),
        }
    }

    /// The wrapped adapter.
    pub fn inner(&self) -> &Arc<dyn StorageAdapter> {
        &self.inner
    }

    /// Cache statistics so far.
    pub fn cache_stats(&self) -> CacheStats {
        self.stats.lock().unwrap().clone()
    }

    /// Enable or disable the record cache.
    pub fn set_cache_enabled(&self, enabled: bool) {
        self.cache_config.lock().unwrap().enabled = enabled;
    }

    /// Whether the record cache is enabled.
    pub fn is_cache_enabled(&self) -> bool {
        self.cache_config.lock().unwrap().enabled
    }

    /// Drop every cached entry (records, listings, counts, definitions).
    pub async fn clear_cache(&self) {
        self.record_cache.write().await.clear();
        self.list_cache.write().await.clear();
        self.count_cache.write().await.clear();
        self.definition_cache.write().await.clear();
        self.stats.lock().unwrap().size = 0;
    }

    fn dimension_prefix(content_type: &str, dimensions: &DataDimensions) -> String {
        format!(
            "{content_type}:{}:{}",
            dimensions.workspace(),
            dimensions.language()
        )
    }

    /// Look up an entry and validate it against the current watermark.
    async fn check_cache<T: Clone>(
        &self,
        cache: &Arc<RwLock<HashMap<String, CachedEntry<T>>>>,
        key: &str,
        current_watermark: i64,
    ) -> Option<T> {
        let enabled = self.cache_config.lock().unwrap().enabled;
        if !enabled {
            return None;
        }

        let cache_read = cache.read().await;
        if let Some(cached) = cache_read.get(key) {
            if cached.is_fresh(current_watermark) {
                self.stats.lock().unwrap().hits += 1;
                return Some(cached.data.clone());
            }
        }

        self.stats.lock().unwrap().misses += 1;
        None
    }

    /// Store a payload under the watermark it was fetched against.
    async fn store_in_cache<T: Clone>(
        &self,
        cache: &Arc<RwLock<HashMap<String, CachedEntry<T>>>>,
        key: &str,
        data: T,
        watermark: i64,
    ) {
        let (enabled, ttl, max_entries) = {
            let config = self.cache_config.lock().unwrap();
            (config.enabled, config.default_ttl, config.max_entries)
        };

        if !enabled {
            return;
        }

        let mut cache_write = cache.write().await;
        if let Some(max) = max_entries {
            if cache_write.len() >= max && !cache_write.contains_key(key) {
                // Full: make room from entries that can no longer be served.
                cache_write.retain(|_, entry| !entry.is_expired());
                if cache_write.len() >= max {
                    debug!(key, "record cache full, skipping insert");
                    return;
                }
            }
        }
        cache_write.insert(key.to_string(), CachedEntry::new(data, watermark, ttl));
        self.stats.lock().unwrap().size = cache_write.len();
    }

    /// Drop record/list/count entries for one dimension after a write.
    async fn evict_dimension(&self, content_type: &str, dimensions: &DataDimensions) {
        let prefix = Self::dimension_prefix(content_type, dimensions);
        self.record_cache
            .write()
            .await
            .retain(|key, _| !key.starts_with(&prefix));
        self.list_cache
            .write()
            .await
            .retain(|key, _| !key.starts_with(&prefix));
        self.count_cache
            .write()
            .await
            .retain(|key, _| !key.starts_with(&prefix));
    }
}

#[async_trait]
impl StorageAdapter for CachingStorage {
    fn repository(&self) -> &str {
        self.inner.repository()
    }

    async fn register_content_type(
        &self,
        definition: &ContentTypeDefinition,
    ) -> RepositoryResult<()> {
        self.inner.register_content_type(definition).await?;
        self.definition_cache.write().await.remove(definition.name());
        Ok(())
    }

    async fn register_config_type(
        &self,
        definition: &ContentTypeDefinition,
    ) -> RepositoryResult<()> {
        self.inner.register_config_type(definition).await
    }

    async fn content_type_definition(
        &self,
        name: &str,
    ) -> RepositoryResult<ContentTypeDefinition> {
        let (enabled, ttl) = {
            let config = self.definition_cache_config.lock().unwrap();
            (config.enabled, config.default_ttl)
        };

        if enabled {
            let cache_read = self.definition_cache.read().await;
            if let Some(cached) = cache_read.get(name) {
                if !cached.is_expired() {
                    self.stats.lock().unwrap().hits += 1;
                    return Ok(cached.data.clone());
                }
            }
            self.stats.lock().unwrap().misses += 1;
        }

        let definition = self.inner.content_type_definition(name).await?;
        if enabled {
            self.definition_cache
                .write()
                .await
                .insert(name.to_string(), CachedDefinition::new(definition.clone(), ttl));
        }
        Ok(definition)
    }

    async fn config_type_definition(
        &self,
        name: &str,
    ) -> RepositoryResult<ContentTypeDefinition> {
        self.inner.config_type_definition(name).await
    }

    async fn list_content_types(&self) -> RepositoryResult<Vec<String>> {
        self.inner.list_content_types().await
    }

    async fn save_record(&self, content_type: &str, record: &Record) -> RepositoryResult<i64> {
        let id = self.inner.save_record(content_type, record).await?;
        let dimensions = DataDimensions::new()
            .with_workspace(record.workspace())
            .with_language(record.language());
        self.evict_dimension(content_type, &dimensions).await;
        Ok(id)
    }

    async fn save_records(
        &self,
        content_type: &str,
        records: &[Record],
    ) -> RepositoryResult<Vec<i64>> {
        let ids = self.inner.save_records(content_type, records).await?;
        for record in records {
            let dimensions = DataDimensions::new()
                .with_workspace(record.workspace())
                .with_language(record.language());
            self.evict_dimension(content_type, &dimensions).await;
        }
        Ok(ids)
    }

    async fn get_record(
        &self,
        content_type: &str,
        id: i64,
        dimensions: &DataDimensions,
    ) -> RepositoryResult<Record> {
        // Historical reads bypass the cache: their results are addressed by
        // timestamp, not by the live watermark.
        if dimensions.is_time_shifted() {
            return self.inner.get_record(content_type, id, dimensions).await;
        }

        let watermark = self.inner.last_modified(content_type, dimensions).await?;
        let key = format!(
            "{}:record:{id}",
            Self::dimension_prefix(content_type, dimensions)
        );

        if let Some(hit) = self.check_cache(&self.record_cache, &key, watermark).await {
            return Ok(hit);
        }

        let record = self.inner.get_record(content_type, id, dimensions).await?;
        self.store_in_cache(&self.record_cache, &key, record.clone(), watermark)
            .await;
        Ok(record)
    }

    async fn get_records(
        &self,
        content_type: &str,
        dimensions: &DataDimensions,
        query: &RecordQuery,
    ) -> RepositoryResult<Vec<Record>> {
        if dimensions.is_time_shifted() {
            return self.inner.get_records(content_type, dimensions, query).await;
        }

        let watermark = self.inner.last_modified(content_type, dimensions).await?;
        let key = format!(
            "{}:list:{}",
            Self::dimension_prefix(content_type, dimensions),
            query.cache_selector()
        );

        if let Some(hit) = self.check_cache(&self.list_cache, &key, watermark).await {
            return Ok(hit);
        }

        let records = self.inner.get_records(content_type, dimensions, query).await?;
        self.store_in_cache(&self.list_cache, &key, records.clone(), watermark)
            .await;
        Ok(records)
    }

    async fn count_records(
        &self,
        content_type: &str,
        dimensions: &DataDimensions,
    ) -> RepositoryResult<u64> {
        if dimensions.is_time_shifted() {
            return self.inner.count_records(content_type, dimensions).await;
        }

        let watermark = self.inner.last_modified(content_type, dimensions).await?;
        let key = format!("{}:count", Self::dimension_prefix(content_type, dimensions));

        if let Some(hit) = self.check_cache(&self.count_cache, &key, watermark).await {
            return Ok(hit);
        }

        let count = self.inner.count_records(content_type, dimensions).await?;
        self.store_in_cache(&self.count_cache, &key, count, watermark)
            .await;
        Ok(count)
    }

    async fn delete_record(
        &self,
        content_type: &str,
        id: i64,
        dimensions: &DataDimensions,
    ) -> RepositoryResult<Option<i64>> {
        let deleted = self.inner.delete_record(content_type, id, dimensions).await?;
        if deleted.is_some() {
            self.evict_dimension(content_type, dimensions).await;
        }
        Ok(deleted)
    }

    async fn delete_records(
        &self,
        content_type: &str,
        ids: &[i64],
        dimensions: &DataDimensions,
    ) -> RepositoryResult<Vec<i64>> {
        let deleted = self.inner.delete_records(content_type, ids, dimensions).await?;
        if !deleted.is_empty() {
            self.evict_dimension(content_type, dimensions).await;
        }
        Ok(deleted)
    }

    async fn delete_all_records(
        &self,
        content_type: &str,
        dimensions: &DataDimensions,
    ) -> RepositoryResult<Vec<i64>> {
        let deleted = self.inner.delete_all_records(content_type, dimensions).await?;
        self.evict_dimension(content_type, dimensions).await;
        Ok(deleted)
    }

    async fn save_config(&self, config_type: &str, record: &Record) -> RepositoryResult<i64> {
        // Config records are read rarely; they pass through uncached.
        self.inner.save_config(config_type, record).await
    }

    async fn get_config(
        &self,
        config_type: &str,
        dimensions: &DataDimensions,
    ) -> RepositoryResult<Record> {
        self.inner.get_config(config_type, dimensions).await
    }

    async fn last_modified(
        &self,
        content_type: &str,
        dimensions: &DataDimensions,
    ) -> RepositoryResult<i64> {
        self.inner.last_modified(content_type, dimensions).await
    }
}
