//! Storage layer for the Strata content repository
//!
//! This crate provides the revisioned record storage behind a unified
//! adapter interface, with pluggable backends (memory, file system,
//! PostgreSQL, HTTP API) and a watermark-checked caching decorator.
//!
//! # Features
//!
//! - **Memory Storage**: lock-guarded in-process store for tests and embedding
//! - **File System Storage**: directory-based content archive (JSON rows)
//! - **PostgreSQL Storage**: schemaless tables with atomic counters (feature `postgres`)
//! - **API Storage**: remote repository over HTTP (feature `api`)
//! - **Caching**: TTL + last-modified watermark validation, independent
//!   definition cache
//! - **Revision history**: every save and delete appends a revision row;
//!   delete/recreate never resets numbering
//! - **Async API**: non-blocking I/O with Tokio
//!
//! # Quick Start
//!
//! ```no_run
//! use std::sync::Arc;
//! use strata_core::{ContentTypeDefinition, DataDimensions, Record};
//! use strata_repository::{MemoryStorage, StorageAdapter};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let storage = MemoryStorage::new("example");
//!
//!     // Register a schema
//!     let profiles = Arc::new(
//!         ContentTypeDefinition::builder("profiles").property("claim").build(),
//!     );
//!     storage.register_content_type(&profiles).await?;
//!
//!     // Save a record; the counter issues id 1
//!     let mut record = Record::new(profiles, "Agency 1")?;
//!     record.set_property("claim", "We build things")?;
//!     let id = storage.save_record("profiles", &record).await?;
//!
//!     // Read it back
//!     let stored = storage
//!         .get_record("profiles", id, &DataDimensions::new())
//!         .await?;
//!     assert_eq!(stored.property("claim"), Some("We build things"));
//!
//!     Ok(())
//! }
//! ```
//!
//! # Caching
//!
//! ```no_run
//! use std::sync::Arc;
//! use strata_repository::{CachingStorage, MemoryStorage, StorageAdapter};
//!
//! # #[tokio::main]
//! # async fn main() -> anyhow::Result<()> {
//! let backend = Arc::new(MemoryStorage::new("example"));
//! let storage = CachingStorage::new(backend);
//!
//! // Reads check the backend watermark before trusting cached payloads,
//! // so mutations through other clients are observed immediately.
//! let stats = storage.cache_stats();
//! println!("hit rate: {:.2}%", stats.hit_rate() * 100.0);
//! # Ok(())
//! # }
//! ```
//!
//! # Architecture
//!
//! ```text
//! ┌────────────────────────────────────────┐
//! │        Application / SDK Layer         │
//! └──────────────┬─────────────────────────┘
//!                │ StorageAdapter trait
//!                ↓
//! ┌────────────────────────────────────────┐
//! │          CachingStorage                │
//! │  - watermark + TTL validation          │
//! │  - independent definition cache        │
//! └──────────────┬─────────────────────────┘
//!                │
//!     ┌──────────┼──────────────┬─────────────┐
//!     ↓          ↓              ↓             ↓
//! ┌────────┐ ┌──────────┐ ┌───────────┐ ┌─────────┐
//! │ Memory │ │ FileSystem│ │ PostgreSQL│ │   API   │
//! │        │ │  archive  │ │  tables   │ │ client  │
//! └────────┘ └──────────┘ └───────────┘ └─────────┘
//! ```

pub mod cache;
pub mod config;
pub mod error;
pub mod file_system;
pub mod files;
pub mod memory;
pub mod models;
pub mod traits;

mod store;

#[cfg(feature = "postgres")]
pub mod postgres;

#[cfg(feature = "api")]
pub mod api;

// Re-exports - Configuration
pub use config::{ConfigError, StorageConfig, StorageSource};

// Re-exports - Error
pub use error::{RepositoryError, RepositoryResult};

// Re-exports - Adapters
pub use cache::CachingStorage;
pub use file_system::FileSystemStorage;
pub use files::DirectoryFileAccess;
pub use memory::MemoryStorage;
pub use models::{CacheConfig, CacheStats, RecordQuery};
pub use traits::{FileAccess, FileInfo, Folder, StorageAdapter, KIND_CONFIG, KIND_CONTENT};

#[cfg(feature = "postgres")]
pub use postgres::PostgresStorage;

#[cfg(feature = "api")]
pub use api::ApiStorage;
