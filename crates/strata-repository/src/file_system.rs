//! File system storage backend
//!
//! A directory-based content archive: definitions, revision rows, counters
//! and the last-change index are JSON documents under the archive root.
//! One exclusive lock serializes writers, which makes counter increments and
//! revision issuance atomic within the process; independent processes should
//! point at separate archives or use the database backend.
//!
//! Layout under the root:
//!
//! ```text
//! definitions/content/<type>.json   content-type definitions
//! definitions/config/<type>.json    config-type definitions
//! records/<type>.json               revision rows (tombstones included)
//! configs/<type>.json               singleton config revision rows
//! counters.json                     per-content-type id counters
//! lastchange.json                   watermark index
//! ```

use async_trait::async_trait;
use path_absolutize::Absolutize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::fs;
use tokio::sync::RwLock;
use tracing::debug;

use strata_core::{ContentTypeDefinition, DataDimensions, Record};

use crate::error::{RepositoryError, RepositoryResult};
use crate::models::RecordQuery;
use crate::store::{
    apply_query, build_revision, build_tombstone, head_of, live_head_of, live_ids, materialize,
    next_watermark, now_micros, revision_ceiling, timestamp_ceiling, watermark_key,
    StoredRevision,
};
use crate::traits::{StorageAdapter, KIND_CONFIG, KIND_CONTENT};

/// File system storage adapter.
pub struct FileSystemStorage {
    repository: String,
    root_path: PathBuf,
    /// Serializes writers; readers share
    lock: Arc<RwLock<()>>,
}

impl FileSystemStorage {
    /// Open (and bootstrap) a content archive at `root_path`.
    ///
    /// The directory must exist; the archive substructure is created on
    /// first use.
    ///
    /// # Example
    /// ```no_run
    /// use strata_repository::FileSystemStorage;
    ///
    /// # #[tokio::main]
    /// # async fn main() -> anyhow::Result<()> {
    /// let storage = FileSystemStorage::new("archive", "content/archive").await?;
    /// # Ok(())
    /// # }
    /// ```
    pub async fn new(
        repository: impl Into<String>,
        root_path: impl AsRef<Path>,
    ) -> RepositoryResult<Self> {
        let path = root_path.as_ref();
        if !path.exists() {
            return Err(RepositoryError::InvalidPath {
                path: path.to_path_buf(),
            });
        }

        let abs_path = path
            .absolutize()
            .map_err(|e| RepositoryError::Other(format!("Failed to absolutize path: {}", e)))?
            .to_path_buf();

        for dir in [
            "definitions/content",
            "definitions/config",
            "records",
            "configs",
        ] {
            fs::create_dir_all(abs_path.join(dir)).await?;
        }

        Ok(Self {
            repository: repository.into(),
            root_path: abs_path,
            lock: Arc::new(RwLock::new(())),
        })
    }

    fn definition_path(&self, kind: &str, name: &str) -> PathBuf {
        self.root_path
            .join("definitions")
            .join(kind)
            .join(format!("{name}.json"))
    }

    fn rows_path(&self, kind: &str, name: &str) -> PathBuf {
        let dir = if kind == KIND_CONFIG { "configs" } else { "records" };
        self.root_path.join(dir).join(format!("{name}.json"))
    }

    async fn read_definition(
        &self,
        kind: &str,
        name: &str,
    ) -> RepositoryResult<Arc<ContentTypeDefinition>> {
        let path = self.definition_path(kind, name);
        let raw = match fs::read_to_string(&path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(RepositoryError::SchemaMissing {
                    kind: kind.to_string(),
                    name: name.to_string(),
                })
            }
            Err(e) => return Err(e.into()),
        };
        Ok(Arc::new(serde_json::from_str(&raw)?))
    }

    async fn write_definition(
        &self,
        kind: &str,
        definition: &ContentTypeDefinition,
    ) -> RepositoryResult<()> {
        let path = self.definition_path(kind, definition.name());
        let raw = serde_json::to_string_pretty(definition)?;
        fs::write(path, raw).await?;
        Ok(())
    }

    async fn read_rows(&self, kind: &str, name: &str) -> RepositoryResult<Vec<StoredRevision>> {
        let path = self.rows_path(kind, name);
        match fs::read_to_string(&path).await {
            Ok(raw) => Ok(serde_json::from_str(&raw)?),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Vec::new()),
            Err(e) => Err(e.into()),
        }
    }

    async fn write_rows(
        &self,
        kind: &str,
        name: &str,
        rows: &[StoredRevision],
    ) -> RepositoryResult<()> {
        let path = self.rows_path(kind, name);
        let raw = serde_json::to_string(rows)?;
        fs::write(path, raw).await?;
        Ok(())
    }

    async fn read_index(&self, file: &str) -> RepositoryResult<HashMap<String, i64>> {
        let path = self.root_path.join(file);
        match fs::read_to_string(&path).await {
            Ok(raw) => Ok(serde_json::from_str(&raw)?),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(HashMap::new()),
            Err(e) => Err(e.into()),
        }
    }

    async fn write_index(&self, file: &str, index: &HashMap<String, i64>) -> RepositoryResult<()> {
        let path = self.root_path.join(file);
        let raw = serde_json::to_string(index)?;
        fs::write(path, raw).await?;
        Ok(())
    }

    /// Advance the watermark for (kind, name, workspace, language). Caller
    /// must hold the write lock.
    async fn bump_watermark(
        &self,
        kind: &str,
        name: &str,
        workspace: &str,
        language: &str,
    ) -> RepositoryResult<()> {
        let mut index = self.read_index("lastchange.json").await?;
        let key = watermark_key(kind, name, workspace, language);
        let previous = index.get(&key).copied().unwrap_or(0);
        index.insert(key, next_watermark(previous, now_micros()));
        self.write_index("lastchange.json", &index).await
    }

    /// Issue the next id for a content type. Caller must hold the write lock.
    async fn next_id(&self, content_type: &str) -> RepositoryResult<i64> {
        let mut counters = self.read_index("counters.json").await?;
        let next = counters.get(content_type).copied().unwrap_or(0) + 1;
        counters.insert(content_type.to_string(), next);
        self.write_index("counters.json", &counters).await?;
        Ok(next)
    }
}

#[async_trait]
impl StorageAdapter for FileSystemStorage {
    fn repository(&self) -> &str {
        &self.repository
    }

    async fn register_content_type(
        &self,
        definition: &ContentTypeDefinition,
    ) -> RepositoryResult<()> {
        let _guard = self.lock.write().await;
        self.write_definition(KIND_CONTENT, definition).await?;
        self.bump_watermark(KIND_CONTENT, definition.name(), "default", "default")
            .await
    }

    async fn register_config_type(
        &self,
        definition: &ContentTypeDefinition,
    ) -> RepositoryResult<()> {
        let _guard = self.lock.write().await;
        self.write_definition(KIND_CONFIG, definition).await?;
        self.bump_watermark(KIND_CONFIG, definition.name(), "default", "default")
            .await
    }

    async fn content_type_definition(
        &self,
        name: &str,
    ) -> RepositoryResult<ContentTypeDefinition> {
        let _guard = self.lock.read().await;
        self.read_definition(KIND_CONTENT, name)
            .await
            .map(|d| (*d).clone())
    }

    async fn config_type_definition(
        &self,
        name: &str,
    ) -> RepositoryResult<ContentTypeDefinition> {
        let _guard = self.lock.read().await;
        self.read_definition(KIND_CONFIG, name)
            .await
            .map(|d| (*d).clone())
    }

    async fn list_content_types(&self) -> RepositoryResult<Vec<String>> {
        let _guard = self.lock.read().await;
        let dir = self.root_path.join("definitions").join(KIND_CONTENT);
        let mut names = Vec::new();
        let mut entries = fs::read_dir(&dir).await?;
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.extension().and_then(|s| s.to_str()) == Some("json") {
                if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                    names.push(stem.to_string());
                }
            }
        }
        names.sort();
        Ok(names)
    }

    async fn save_record(&self, content_type: &str, record: &Record) -> RepositoryResult<i64> {
        let _guard = self.lock.write().await;
        let definition = self.read_definition(KIND_CONTENT, content_type).await?;

        let id = match record.id() {
            Some(id) => id,
            None => self.next_id(content_type).await?,
        };

        let workspace = record.workspace().to_string();
        let language = record.language().to_string();

        let mut rows = self.read_rows(KIND_CONTENT, content_type).await?;
        let dimensions = DataDimensions::new()
            .with_workspace(workspace.clone())
            .with_language(language.clone());
        let next_revision = revision_ceiling(&rows, id, &workspace, &language) + 1;
        let now = now_micros().max(timestamp_ceiling(&rows, id, &workspace, &language) + 1);
        let previous_head = live_head_of(&rows, id, &dimensions).cloned();
        let row = build_revision(
            &definition,
            record,
            id,
            previous_head.as_ref(),
            next_revision,
            now,
        );
        debug!(content_type, id, revision = row.revision, "saving record");
        rows.push(row);
        self.write_rows(KIND_CONTENT, content_type, &rows).await?;

        self.bump_watermark(KIND_CONTENT, content_type, &workspace, &language)
            .await?;
        Ok(id)
    }

    async fn get_record(
        &self,
        content_type: &str,
        id: i64,
        dimensions: &DataDimensions,
    ) -> RepositoryResult<Record> {
        let _guard = self.lock.read().await;
        let definition = self.read_definition(KIND_CONTENT, content_type).await?;
        let rows = self.read_rows(KIND_CONTENT, content_type).await?;

        let head = head_of(&rows, id, dimensions)
            .filter(|row| !row.deleted)
            .ok_or_else(|| RepositoryError::RecordNotFound {
                content_type: content_type.to_string(),
                id,
            })?;

        materialize(&definition, head)
    }

    async fn get_records(
        &self,
        content_type: &str,
        dimensions: &DataDimensions,
        query: &RecordQuery,
    ) -> RepositoryResult<Vec<Record>> {
        let _guard = self.lock.read().await;
        let definition = self.read_definition(KIND_CONTENT, content_type).await?;
        let rows = self.read_rows(KIND_CONTENT, content_type).await?;

        let mut records = Vec::new();
        for id in live_ids(&rows, dimensions) {
            if let Some(head) = live_head_of(&rows, id, dimensions) {
                records.push(materialize(&definition, head)?);
            }
        }
        Ok(apply_query(records, query))
    }

    async fn count_records(
        &self,
        content_type: &str,
        dimensions: &DataDimensions,
    ) -> RepositoryResult<u64> {
        let _guard = self.lock.read().await;
        self.read_definition(KIND_CONTENT, content_type).await?;
        let rows = self.read_rows(KIND_CONTENT, content_type).await?;
        Ok(live_ids(&rows, dimensions).len() as u64)
    }

    async fn delete_record(
        &self,
        content_type: &str,
        id: i64,
        dimensions: &DataDimensions,
    ) -> RepositoryResult<Option<i64>> {
        let _guard = self.lock.write().await;
        self.read_definition(KIND_CONTENT, content_type).await?;

        let workspace = dimensions.workspace().to_string();
        let language = dimensions.language().to_string();

        let mut rows = self.read_rows(KIND_CONTENT, content_type).await?;
        if live_head_of(&rows, id, dimensions).is_none() {
            return Ok(None);
        }

        let next_revision = revision_ceiling(&rows, id, &workspace, &language) + 1;
        let now = now_micros().max(timestamp_ceiling(&rows, id, &workspace, &language) + 1);
        rows.push(build_tombstone(id, &workspace, &language, next_revision, now));
        self.write_rows(KIND_CONTENT, content_type, &rows).await?;
        debug!(content_type, id, revision = next_revision, "deleted record");

        self.bump_watermark(KIND_CONTENT, content_type, &workspace, &language)
            .await?;
        Ok(Some(id))
    }

    async fn delete_all_records(
        &self,
        content_type: &str,
        dimensions: &DataDimensions,
    ) -> RepositoryResult<Vec<i64>> {
        let _guard = self.lock.write().await;
        self.read_definition(KIND_CONTENT, content_type).await?;

        let workspace = dimensions.workspace().to_string();
        let language = dimensions.language().to_string();

        let mut rows = self.read_rows(KIND_CONTENT, content_type).await?;
        let deleted = live_ids(&rows, dimensions);

        // Purge this dimension's history; the id counter stays untouched.
        rows.retain(|row| row.workspace != workspace || row.language != language);
        self.write_rows(KIND_CONTENT, content_type, &rows).await?;

        self.bump_watermark(KIND_CONTENT, content_type, &workspace, &language)
            .await?;
        Ok(deleted)
    }

    async fn save_config(&self, config_type: &str, record: &Record) -> RepositoryResult<i64> {
        let _guard = self.lock.write().await;
        let definition = self.read_definition(KIND_CONFIG, config_type).await?;

        let workspace = record.workspace().to_string();
        let language = record.language().to_string();

        let mut rows = self.read_rows(KIND_CONFIG, config_type).await?;
        let dimensions = DataDimensions::new()
            .with_workspace(workspace.clone())
            .with_language(language.clone());
        let next_revision = revision_ceiling(&rows, 0, &workspace, &language) + 1;
        let now = now_micros().max(timestamp_ceiling(&rows, 0, &workspace, &language) + 1);
        let previous_head = live_head_of(&rows, 0, &dimensions).cloned();
        let row = build_revision(
            &definition,
            record,
            0,
            previous_head.as_ref(),
            next_revision,
            now,
        );
        rows.push(row);
        self.write_rows(KIND_CONFIG, config_type, &rows).await?;

        self.bump_watermark(KIND_CONFIG, config_type, &workspace, &language)
            .await?;
        Ok(next_revision)
    }

    async fn get_config(
        &self,
        config_type: &str,
        dimensions: &DataDimensions,
    ) -> RepositoryResult<Record> {
        let _guard = self.lock.read().await;
        let definition = self.read_definition(KIND_CONFIG, config_type).await?;
        let rows = self.read_rows(KIND_CONFIG, config_type).await?;

        let head = head_of(&rows, 0, dimensions)
            .filter(|row| !row.deleted)
            .ok_or_else(|| RepositoryError::RecordNotFound {
                content_type: config_type.to_string(),
                id: 0,
            })?;

        materialize(&definition, head)
    }

    async fn last_modified(
        &self,
        content_type: &str,
        dimensions: &DataDimensions,
    ) -> RepositoryResult<i64> {
        let _guard = self.lock.read().await;
        let index = self.read_index("lastchange.json").await?;
        let key = watermark_key(
            KIND_CONTENT,
            content_type,
            dimensions.workspace(),
            dimensions.language(),
        );
        Ok(index.get(&key).copied().unwrap_or(0))
    }
}
