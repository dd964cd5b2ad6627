//! Storage configuration types
//!
//! This module provides configuration types for the different storage
//! backends (file system, database, API, memory) and resolves a
//! configuration into a connected adapter.

use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::error::{RepositoryError, RepositoryResult};
use crate::traits::StorageAdapter;

/// Storage source type
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageSource {
    /// Directory-based content archive
    FileSystem,
    /// PostgreSQL database
    Database,
    /// Remote HTTP API
    Api,
    /// In-memory store (for testing or embedding)
    Memory,
}

impl Default for StorageSource {
    fn default() -> Self {
        Self::FileSystem
    }
}

/// Storage configuration
///
/// Specifies where a repository keeps its records, definitions, counters
/// and watermarks.
///
/// # Examples
///
/// ```rust
/// use strata_repository::StorageConfig;
///
/// // File system archive
/// let config = StorageConfig::file_system("content/archive");
///
/// // PostgreSQL
/// let config = StorageConfig::database("postgresql://localhost/strata");
///
/// // Remote API
/// let config = StorageConfig::api("https://content.example.com/repo")
///     .with_api_key("secret-key");
///
/// // In-memory (for testing)
/// let config = StorageConfig::memory();
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Storage source type
    pub source: StorageSource,

    /// Archive base path (required for FileSystem source)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base_path: Option<String>,

    /// Database connection URL (required for Database source)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub database_url: Option<String>,

    /// API base URL (required for Api source)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_url: Option<String>,

    /// API key for authentication (optional for Api source)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
}

impl StorageConfig {
    /// Create a file system storage configuration
    pub fn file_system(path: impl Into<String>) -> Self {
        Self {
            source: StorageSource::FileSystem,
            base_path: Some(path.into()),
            ..Default::default()
        }
    }

    /// Create a database storage configuration
    pub fn database(url: impl Into<String>) -> Self {
        Self {
            source: StorageSource::Database,
            database_url: Some(url.into()),
            base_path: None,
            api_url: None,
            api_key: None,
        }
    }

    /// Create an API storage configuration
    pub fn api(url: impl Into<String>) -> Self {
        Self {
            source: StorageSource::Api,
            api_url: Some(url.into()),
            base_path: None,
            database_url: None,
            api_key: None,
        }
    }

    /// Create an in-memory storage configuration
    pub fn memory() -> Self {
        Self {
            source: StorageSource::Memory,
            base_path: None,
            database_url: None,
            api_url: None,
            api_key: None,
        }
    }

    /// Set an API key for authentication
    pub fn with_api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    /// Validate the configuration
    ///
    /// Returns an error if required fields are missing for the selected
    /// source.
    pub fn validate(&self) -> Result<(), ConfigError> {
        match self.source {
            StorageSource::FileSystem => {
                if self.base_path.is_none() {
                    return Err(ConfigError::MissingField {
                        source: "FileSystem".to_string(),
                        field: "base_path".to_string(),
                    });
                }
            }
            StorageSource::Database => {
                if self.database_url.is_none() {
                    return Err(ConfigError::MissingField {
                        source: "Database".to_string(),
                        field: "database_url".to_string(),
                    });
                }
            }
            StorageSource::Api => {
                if self.api_url.is_none() {
                    return Err(ConfigError::MissingField {
                        source: "Api".to_string(),
                        field: "api_url".to_string(),
                    });
                }
            }
            StorageSource::Memory => {
                // Memory source doesn't require any fields
            }
        }
        Ok(())
    }

    /// Resolve this configuration into a connected storage adapter for the
    /// named repository.
    pub async fn connect(&self, repository: &str) -> RepositoryResult<Arc<dyn StorageAdapter>> {
        self.validate()
            .map_err(|e| RepositoryError::Other(e.to_string()))?;

        match self.source {
            StorageSource::Memory => Ok(Arc::new(crate::MemoryStorage::new(repository))),
            StorageSource::FileSystem => {
                let path = self.base_path.as_deref().unwrap_or_default();
                Ok(Arc::new(
                    crate::FileSystemStorage::new(repository, path).await?,
                ))
            }
            StorageSource::Database => {
                #[cfg(feature = "postgres")]
                {
                    let url = self.database_url.as_deref().unwrap_or_default();
                    Ok(Arc::new(
                        crate::PostgresStorage::connect(repository, url).await?,
                    ))
                }
                #[cfg(not(feature = "postgres"))]
                Err(RepositoryError::Other(
                    "Database storage requires the 'postgres' feature".to_string(),
                ))
            }
            StorageSource::Api => {
                #[cfg(feature = "api")]
                {
                    let url = self.api_url.as_deref().unwrap_or_default();
                    Ok(Arc::new(crate::ApiStorage::new(
                        repository,
                        url,
                        self.api_key.clone(),
                    )?))
                }
                #[cfg(not(feature = "api"))]
                Err(RepositoryError::Other(
                    "API storage requires the 'api' feature".to_string(),
                ))
            }
        }
    }
}

/// Configuration error
#[derive(Debug, Clone)]
pub enum ConfigError {
    /// A required field is missing for the selected source
    MissingField { source: String, field: String },
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::MissingField { source, field } => {
                write!(f, "{} source requires {} to be set", source, field)
            }
        }
    }
}

impl std::error::Error for ConfigError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_system_config() {
        let config = StorageConfig::file_system("archive");

        assert_eq!(config.source, StorageSource::FileSystem);
        assert_eq!(config.base_path, Some("archive".to_string()));
        assert!(config.database_url.is_none());
        assert!(config.api_url.is_none());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_database_config() {
        let config = StorageConfig::database("postgresql://localhost/strata");

        assert_eq!(config.source, StorageSource::Database);
        assert!(config.base_path.is_none());
        assert_eq!(
            config.database_url,
            Some("postgresql://localhost/strata".to_string())
        );
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_api_config() {
        let config = StorageConfig::api("https://content.example.com").with_api_key("secret");

        assert_eq!(config.source, StorageSource::Api);
        assert_eq!(config.api_url, Some("https://content.example.com".to_string()));
        assert_eq!(config.api_key, Some("secret".to_string()));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_memory_config() {
        let config = StorageConfig::memory();

        assert_eq!(config.source, StorageSource::Memory);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validation_missing_fields() {
        let config = StorageConfig {
            source: StorageSource::FileSystem,
            ..Default::default()
        };
        assert!(config.validate().is_err());

        let config = StorageConfig {
            source: StorageSource::Database,
            ..Default::default()
        };
        assert!(config.validate().is_err());

        let config = StorageConfig {
            source: StorageSource::Api,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_default_source() {
        assert_eq!(StorageSource::default(), StorageSource::FileSystem);
    }
}
