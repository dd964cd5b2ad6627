//! Builder pattern for Repository

use std::sync::Arc;

use strata_core::UserInfo;
use strata_repository::{CacheConfig, CachingStorage, StorageAdapter, StorageConfig};

use crate::error::{Result, SdkError};
use crate::repository::Repository;

/// Builder for [`Repository`]
///
/// # Example
///
/// ```rust,ignore
/// use strata_sdk::{RepositoryBuilder, StorageConfig, CacheConfig};
///
/// // From a file system archive, with caching
/// let repository = RepositoryBuilder::new("content")
///     .with_storage(StorageConfig::file_system("content/archive"))
///     .with_cache(CacheConfig::new())
///     .build()
///     .await?;
///
/// // From PostgreSQL
/// let repository = RepositoryBuilder::new("content")
///     .with_storage(StorageConfig::database("postgresql://localhost/strata"))
///     .build()
///     .await?;
///
/// // In-memory (for testing)
/// let repository = RepositoryBuilder::new("content")
///     .with_storage(StorageConfig::memory())
///     .build()
///     .await?;
/// ```
pub struct RepositoryBuilder {
    name: String,
    storage_config: Option<StorageConfig>,
    adapter: Option<Arc<dyn StorageAdapter>>,
    record_cache: Option<CacheConfig>,
    definition_cache: Option<CacheConfig>,
    user_info: Option<UserInfo>,
}

impl RepositoryBuilder {
    /// Create a builder for the named repository.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            storage_config: None,
            adapter: None,
            record_cache: None,
            definition_cache: None,
            user_info: None,
        }
    }

    /// Set the storage configuration to connect with.
    pub fn with_storage(mut self, config: StorageConfig) -> Self {
        self.storage_config = Some(config);
        self
    }

    /// Use an already-connected adapter instead of a configuration.
    pub fn with_adapter(mut self, adapter: Arc<dyn StorageAdapter>) -> Self {
        self.adapter = Some(adapter);
        self
    }

    /// Enable the record cache with the given configuration.
    pub fn with_cache(mut self, config: CacheConfig) -> Self {
        self.record_cache = Some(config);
        self
    }

    /// Enable the content-type definition cache with its own configuration,
    /// independent of record caching.
    pub fn with_definition_cache(mut self, config: CacheConfig) -> Self {
        self.definition_cache = Some(config);
        self
    }

    /// Stamp this actor on saves made through the repository.
    pub fn as_user(mut self, user_info: UserInfo) -> Self {
        self.user_info = Some(user_info);
        self
    }

    /// Connect and build the repository client.
    pub async fn build(self) -> Result<Repository> {
        let adapter: Arc<dyn StorageAdapter> = match (self.adapter, self.storage_config) {
            (Some(adapter), _) => adapter,
            (None, Some(config)) => config.connect(&self.name).await?,
            (None, None) => {
                return Err(SdkError::ConfigError(
                    "no storage configured: call with_storage() or with_adapter()".to_string(),
                ))
            }
        };

        let adapter: Arc<dyn StorageAdapter> =
            if self.record_cache.is_some() || self.definition_cache.is_some() {
                Arc::new(CachingStorage::with_configs(
                    adapter,
                    self.record_cache.unwrap_or_default(),
                    self.definition_cache.unwrap_or_default(),
                ))
            } else {
                adapter
            };

        let mut repository = Repository::new(self.name, adapter);
        repository.set_user_info(self.user_info);
        Ok(repository)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_build_requires_storage() {
        let result = RepositoryBuilder::new("test").build().await;
        assert!(matches!(result, Err(SdkError::ConfigError(_))));
    }

    #[tokio::test]
    async fn test_build_with_memory_storage() {
        let repository = RepositoryBuilder::new("test")
            .with_storage(StorageConfig::memory())
            .build()
            .await
            .unwrap();
        assert_eq!(repository.name(), "test");
        assert_eq!(repository.storage().repository(), "test");
    }

    #[tokio::test]
    async fn test_build_with_cache_wraps_adapter() {
        let repository = RepositoryBuilder::new("test")
            .with_storage(StorageConfig::memory())
            .with_cache(CacheConfig::new())
            .as_user(UserInfo::new("editor"))
            .build()
            .await
            .unwrap();
        assert_eq!(repository.storage().repository(), "test");
    }
}
