//! Strata SDK - high-level client API for the Strata content repository
//!
//! The SDK layers a [`Repository`] client over the storage adapters from
//! `strata-repository`: select a content type, pick a workspace and
//! language, and read/write revisioned records without touching the
//! adapter interface directly.
//!
//! # Quick Start
//!
//! ```no_run
//! use strata_repository::StorageConfig;
//! use strata_sdk::RepositoryBuilder;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let mut repository = RepositoryBuilder::new("content")
//!         .with_storage(StorageConfig::file_system("content/archive"))
//!         .build()
//!         .await?;
//!
//!     repository.select_content_type("profiles").await?;
//!
//!     let mut record = repository.new_record("Agency 1")?;
//!     record.set_property("claim", "We build things")?;
//!     let id = repository.save_record(&mut record).await?;
//!
//!     let stored = repository.get_record(id).await?;
//!     println!("{} is at revision {}", stored.name().unwrap_or("?"), stored.revision());
//!
//!     Ok(())
//! }
//! ```

pub mod builder;
pub mod error;
pub mod repository;

// Re-export commonly used types
pub use builder::RepositoryBuilder;
pub use error::{Result, SdkError};
pub use repository::Repository;

// Re-export the layers below for convenience
pub use strata_core::{
    ContentTypeDefinition, DataDimensions, Record, Sequence, UserInfo,
};
pub use strata_repository::{CacheConfig, RecordQuery, StorageConfig};
