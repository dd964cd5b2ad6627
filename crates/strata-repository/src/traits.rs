//! Core trait definitions for the storage layer
//!
//! This module defines two traits:
//!
//! - [`StorageAdapter`]: the schemaless backend interface every storage
//!   implementation (memory, file system, PostgreSQL, HTTP API) provides,
//!   and which the caching decorator wraps
//! - [`FileAccess`]: the narrow file/binary collaborator interface
//!
//! # Examples
//!
//! ## Saving and fetching records
//!
//! ```no_run
//! use std::sync::Arc;
//! use strata_core::{ContentTypeDefinition, DataDimensions, Record};
//! use strata_repository::{MemoryStorage, StorageAdapter};
//!
//! # #[tokio::main]
//! # async fn main() -> anyhow::Result<()> {
//! let storage = MemoryStorage::new("example");
//!
//! let profiles = Arc::new(
//!     ContentTypeDefinition::builder("profiles").property("claim").build(),
//! );
//! storage.register_content_type(&profiles).await?;
//!
//! let mut record = Record::new(profiles, "Agency 1")?;
//! record.set_property("claim", "We build things")?;
//!
//! let id = storage.save_record("profiles", &record).await?;
//! let stored = storage
//!     .get_record("profiles", id, &DataDimensions::new())
//!     .await?;
//! assert_eq!(stored.revision(), 1);
//! # Ok(())
//! # }
//! ```
//!
//! ## Time-travel reads
//!
//! ```no_run
//! # use strata_core::DataDimensions;
//! # use strata_repository::{MemoryStorage, StorageAdapter};
//! # #[tokio::main]
//! # async fn main() -> anyhow::Result<()> {
//! # let storage = MemoryStorage::new("example");
//! // Read the record as it was at a given microsecond timestamp
//! let dimensions = DataDimensions::new().with_timeshift(1_700_000_000_000_000);
//! let historical = storage.get_record("profiles", 1, &dimensions).await?;
//! # Ok(())
//! # }
//! ```

use async_trait::async_trait;
use strata_core::{ContentTypeDefinition, DataDimensions, Record};

use crate::{RecordQuery, RepositoryResult};

/// Registry kind for content types.
pub const KIND_CONTENT: &str = "content";
/// Registry kind for config types.
pub const KIND_CONFIG: &str = "config";

/// Schemaless storage backend for one repository.
///
/// An adapter instance is bound to a single named repository. All reads
/// resolve within a [`DataDimensions`] tuple; all writes advance the
/// per-(content type, workspace, language) last-modified watermark that the
/// caching tier validates against.
///
/// # Revision semantics
///
/// - Saving a record without an id issues the next per-content-type counter
///   value as its id and stores revision 1.
/// - Saving with an id appends a new revision: previous max revision for
///   that (id, workspace, language) plus one, tombstones included. Revision
///   numbers for an id never restart after a delete; only purging the
///   content type (`delete_all_records`) resets its history.
/// - Deleting appends a tombstone revision; the deleted id is never reused.
/// - Properties omitted from a save are merged from the latest live
///   revision. Protected properties are stored as empty strings regardless
///   of the caller's value.
///
/// # Concurrency
///
/// Counter increments and revision issuance execute as one atomic operation
/// at the storage layer (single SQL statement, or under the backend's
/// exclusive write lock). Concurrent updates to the same id follow
/// last-write-wins; no record-level locking is provided.
///
/// # Thread Safety
///
/// All implementations must be `Send + Sync` for use across async tasks.
#[async_trait]
pub trait StorageAdapter: Send + Sync {
    /// Name of the repository this adapter is bound to.
    fn repository(&self) -> &str;

    // ---- schema registry -------------------------------------------------

    /// Register (or replace) a content-type definition.
    async fn register_content_type(
        &self,
        definition: &ContentTypeDefinition,
    ) -> RepositoryResult<()>;

    /// Register (or replace) a config-type definition.
    async fn register_config_type(
        &self,
        definition: &ContentTypeDefinition,
    ) -> RepositoryResult<()>;

    /// Fetch a content-type definition.
    ///
    /// # Errors
    /// `SchemaMissing` when no definition is registered under `name`.
    async fn content_type_definition(
        &self,
        name: &str,
    ) -> RepositoryResult<ContentTypeDefinition>;

    /// Fetch a config-type definition.
    async fn config_type_definition(&self, name: &str)
        -> RepositoryResult<ContentTypeDefinition>;

    /// Names of all registered content types.
    async fn list_content_types(&self) -> RepositoryResult<Vec<String>>;

    // ---- records ---------------------------------------------------------

    /// Save one record, returning its (possibly newly issued) id.
    ///
    /// The record's own workspace and language select the target dimension.
    async fn save_record(&self, content_type: &str, record: &Record) -> RepositoryResult<i64>;

    /// Save several records, returning their ids in input order.
    async fn save_records(
        &self,
        content_type: &str,
        records: &[Record],
    ) -> RepositoryResult<Vec<i64>> {
        let mut ids = Vec::with_capacity(records.len());
        for record in records {
            ids.push(self.save_record(content_type, record).await?);
        }
        Ok(ids)
    }

    /// Fetch the record with the given id within the given dimensions.
    ///
    /// # Errors
    /// `RecordNotFound` when the id has no live revision there (or none at
    /// or before the dimension's timeshift).
    async fn get_record(
        &self,
        content_type: &str,
        id: i64,
        dimensions: &DataDimensions,
    ) -> RepositoryResult<Record>;

    /// Fetch all live records within the given dimensions, filtered, ordered
    /// and paged per `query`.
    async fn get_records(
        &self,
        content_type: &str,
        dimensions: &DataDimensions,
        query: &RecordQuery,
    ) -> RepositoryResult<Vec<Record>>;

    /// Count live records within the given dimensions.
    async fn count_records(
        &self,
        content_type: &str,
        dimensions: &DataDimensions,
    ) -> RepositoryResult<u64>;

    /// Delete a record: appends a tombstone revision.
    ///
    /// Returns the deleted id, or `None` when the id has no live revision —
    /// deleting a missing record is not an error.
    async fn delete_record(
        &self,
        content_type: &str,
        id: i64,
        dimensions: &DataDimensions,
    ) -> RepositoryResult<Option<i64>>;

    /// Delete several records, returning the subset of ids actually deleted.
    async fn delete_records(
        &self,
        content_type: &str,
        ids: &[i64],
        dimensions: &DataDimensions,
    ) -> RepositoryResult<Vec<i64>> {
        let mut deleted = Vec::new();
        for &id in ids {
            if let Some(id) = self.delete_record(content_type, id, dimensions).await? {
                deleted.push(id);
            }
        }
        Ok(deleted)
    }

    /// Purge the content type within the given dimensions: every live id is
    /// returned and all revision rows (tombstones included) are removed, so
    /// revision numbering restarts. The id counter is never reset.
    async fn delete_all_records(
        &self,
        content_type: &str,
        dimensions: &DataDimensions,
    ) -> RepositoryResult<Vec<i64>>;

    // ---- config records --------------------------------------------------

    /// Save the singleton config record for a config type, returning the new
    /// revision number. Shares merge/protection/revision semantics with
    /// record saves.
    async fn save_config(&self, config_type: &str, record: &Record) -> RepositoryResult<i64>;

    /// Fetch the singleton config record for a config type.
    async fn get_config(
        &self,
        config_type: &str,
        dimensions: &DataDimensions,
    ) -> RepositoryResult<Record>;

    // ---- watermarks ------------------------------------------------------

    /// Last-modified watermark (microseconds) for the content type within
    /// the given (workspace, language); 0 when nothing was ever written.
    ///
    /// This is the cheap O(1) lookup the caching tier performs before
    /// trusting any cached payload.
    async fn last_modified(
        &self,
        content_type: &str,
        dimensions: &DataDimensions,
    ) -> RepositoryResult<i64>;
}

/// A folder listing returned by [`FileAccess::folder`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Folder {
    /// Folder path relative to the access root
    pub path: String,
    /// Names of direct subfolders
    pub folders: Vec<String>,
    /// Ids of files directly inside the folder
    pub files: Vec<String>,
}

/// File metadata returned by [`FileAccess::file`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileInfo {
    /// File id: path relative to the access root
    pub id: String,
    /// Base name
    pub name: String,
    /// Size in bytes
    pub size: u64,
    /// Last-modified unix timestamp (seconds)
    pub last_modified: i64,
}

/// Narrow file/binary access collaborator.
///
/// Strata passes bytes through unchanged; format-specific concerns (image
/// metadata and the like) live outside this interface. Lookups return
/// `None` for missing paths rather than failing.
#[async_trait]
pub trait FileAccess: Send + Sync {
    /// List a folder, or `None` when the path does not exist.
    async fn folder(&self, path: &str) -> RepositoryResult<Option<Folder>>;

    /// Metadata for a file, or `None` when it does not exist.
    async fn file(&self, id: &str) -> RepositoryResult<Option<FileInfo>>;

    /// Contents of a file, or `None` when it does not exist.
    async fn binary(&self, file: &FileInfo) -> RepositoryResult<Option<Vec<u8>>>;

    /// Write a file, creating parent folders as needed. Returns `false` when
    /// the id is not writable.
    async fn save_file(&self, id: &str, bytes: &[u8]) -> RepositoryResult<bool>;

    /// Delete a file. Returns `false` when it did not exist.
    async fn delete_file(&self, id: &str) -> RepositoryResult<bool>;
}
