//! In-memory storage backend
//!
//! Keeps the schema registry, counters, revision rows and the last-change
//! index in maps behind one `RwLock`. Counter increments and revision
//! issuance happen under the exclusive write lock, so concurrent writers
//! observe the same atomicity the database backend gets from single-statement
//! increments. Useful for tests and for embedding a repository without any
//! external store.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
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

#[derive(Debug, Default)]
struct StoreState {
    content_definitions: HashMap<String, ContentTypeDefinition>,
    config_definitions: HashMap<String, ContentTypeDefinition>,
    /// Per-content-type id counter; never reset, never reused
    counters: HashMap<String, i64>,
    /// Revision rows per content type
    records: HashMap<String, Vec<StoredRevision>>,
    /// Revision rows per config type (singleton id 0)
    configs: HashMap<String, Vec<StoredRevision>>,
    /// Last-change index: (kind, name, workspace, language) -> micros
    watermarks: HashMap<String, i64>,
}

impl StoreState {
    fn bump_watermark(&mut self, kind: &str, name: &str, workspace: &str, language: &str) {
        let key = watermark_key(kind, name, workspace, language);
        let previous = self.watermarks.get(&key).copied().unwrap_or(0);
        self.watermarks.insert(key, next_watermark(previous, now_micros()));
    }
}

/// In-memory storage adapter.
#[derive(Debug, Clone)]
pub struct MemoryStorage {
    repository: String,
    state: Arc<RwLock<StoreState>>,
}

impl MemoryStorage {
    /// Create an empty in-memory repository.
    ///
    /// # Example
    /// ```
    /// use strata_repository::MemoryStorage;
    ///
    /// let storage = MemoryStorage::new("tests");
    /// ```
    pub fn new(repository: impl Into<String>) -> Self {
        Self {
            repository: repository.into(),
            state: Arc::new(RwLock::new(StoreState::default())),
        }
    }

    fn definition_of(
        state: &StoreState,
        content_type: &str,
    ) -> RepositoryResult<Arc<ContentTypeDefinition>> {
        state
            .content_definitions
            .get(content_type)
            .cloned()
            .map(Arc::new)
            .ok_or_else(|| RepositoryError::SchemaMissing {
                kind: KIND_CONTENT.to_string(),
                name: content_type.to_string(),
            })
    }
}

#[async_trait]
impl StorageAdapter for MemoryStorage {
    fn repository(&self) -> &str {
        &self.repository
    }

    async fn register_content_type(
        &self,
        definition: &ContentTypeDefinition,
    ) -> RepositoryResult<()> {
        let mut state = self.state.write().await;
        state
            .content_definitions
            .insert(definition.name().to_string(), definition.clone());
        state.bump_watermark(KIND_CONTENT, definition.name(), "default", "default");
        Ok(())
    }

    async fn register_config_type(
        &self,
        definition: &ContentTypeDefinition,
    ) -> RepositoryResult<()> {
        let mut state = self.state.write().await;
        state
            .config_definitions
            .insert(definition.name().to_string(), definition.clone());
        state.bump_watermark(KIND_CONFIG, definition.name(), "default", "default");
        Ok(())
    }

    async fn content_type_definition(
        &self,
        name: &str,
    ) -> RepositoryResult<ContentTypeDefinition> {
        let state = self.state.read().await;
        state
            .content_definitions
            .get(name)
            .cloned()
            .ok_or_else(|| RepositoryError::SchemaMissing {
                kind: KIND_CONTENT.to_string(),
                name: name.to_string(),
            })
    }

    async fn config_type_definition(
        &self,
        name: &str,
    ) -> RepositoryResult<ContentTypeDefinition> {
        let state = self.state.read().await;
        state
            .config_definitions
            .get(name)
            .cloned()
            .ok_or_else(|| RepositoryError::SchemaMissing {
                kind: KIND_CONFIG.to_string(),
                name: name.to_string(),
            })
    }

    async fn list_content_types(&self) -> RepositoryResult<Vec<String>> {
        let state = self.state.read().await;
        let mut names: Vec<String> = state.content_definitions.keys().cloned().collect();
        names.sort();
        Ok(names)
    }

    async fn save_record(&self, content_type: &str, record: &Record) -> RepositoryResult<i64> {
        let mut state = self.state.write().await;
        let definition = Self::definition_of(&state, content_type)?;

        // Issue an id from the counter when the record was never persisted.
        let id = match record.id() {
            Some(id) => id,
            None => {
                let counter = state.counters.entry(content_type.to_string()).or_insert(0);
                *counter += 1;
                *counter
            }
        };

        let workspace = record.workspace().to_string();
        let language = record.language().to_string();

        let rows = state.records.entry(content_type.to_string()).or_default();
        let dimensions = DataDimensions::new()
            .with_workspace(workspace.clone())
            .with_language(language.clone());
        let next_revision = revision_ceiling(rows, id, &workspace, &language) + 1;
        let now = now_micros().max(timestamp_ceiling(rows, id, &workspace, &language) + 1);
        let previous_head = live_head_of(rows, id, &dimensions).cloned();
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

        state.bump_watermark(KIND_CONTENT, content_type, &workspace, &language);
        Ok(id)
    }

    async fn get_record(
        &self,
        content_type: &str,
        id: i64,
        dimensions: &DataDimensions,
    ) -> RepositoryResult<Record> {
        let state = self.state.read().await;
        let definition = Self::definition_of(&state, content_type)?;
        let rows = state
            .records
            .get(content_type)
            .map(Vec::as_slice)
            .unwrap_or_default();

        let head = head_of(rows, id, dimensions)
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
        let state = self.state.read().await;
        let definition = Self::definition_of(&state, content_type)?;
        let rows = state
            .records
            .get(content_type)
            .map(Vec::as_slice)
            .unwrap_or_default();

        let mut records = Vec::new();
        for id in live_ids(rows, dimensions) {
            if let Some(head) = live_head_of(rows, id, dimensions) {
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
        let state = self.state.read().await;
        // Counting against an unregistered type is a schema error, like reads.
        Self::definition_of(&state, content_type)?;
        let rows = state
            .records
            .get(content_type)
            .map(Vec::as_slice)
            .unwrap_or_default();
        Ok(live_ids(rows, dimensions).len() as u64)
    }

    async fn delete_record(
        &self,
        content_type: &str,
        id: i64,
        dimensions: &DataDimensions,
    ) -> RepositoryResult<Option<i64>> {
        let mut state = self.state.write().await;
        Self::definition_of(&state, content_type)?;

        let workspace = dimensions.workspace().to_string();
        let language = dimensions.language().to_string();

        let rows = state.records.entry(content_type.to_string()).or_default();
        if live_head_of(rows, id, dimensions).is_none() {
            return Ok(None);
        }

        let next_revision = revision_ceiling(rows, id, &workspace, &language) + 1;
        let now = now_micros().max(timestamp_ceiling(rows, id, &workspace, &language) + 1);
        rows.push(build_tombstone(id, &workspace, &language, next_revision, now));
        debug!(content_type, id, revision = next_revision, "deleted record");

        state.bump_watermark(KIND_CONTENT, content_type, &workspace, &language);
        Ok(Some(id))
    }

    async fn delete_all_records(
        &self,
        content_type: &str,
        dimensions: &DataDimensions,
    ) -> RepositoryResult<Vec<i64>> {
        let mut state = self.state.write().await;
        Self::definition_of(&state, content_type)?;

        let workspace = dimensions.workspace().to_string();
        let language = dimensions.language().to_string();

        let rows = state.records.entry(content_type.to_string()).or_default();
        let deleted = live_ids(rows, dimensions);

        // Purge: drop every revision row of this dimension, tombstones
        // included, so revision numbering restarts. The counter stays.
        rows.retain(|row| row.workspace != workspace || row.language != language);

        state.bump_watermark(KIND_CONTENT, content_type, &workspace, &language);
        Ok(deleted)
    }

    async fn save_config(&self, config_type: &str, record: &Record) -> RepositoryResult<i64> {
        let mut state = self.state.write().await;
        let definition = state
            .config_definitions
            .get(config_type)
            .cloned()
            .map(Arc::new)
            .ok_or_else(|| RepositoryError::SchemaMissing {
                kind: KIND_CONFIG.to_string(),
                name: config_type.to_string(),
            })?;

        let workspace = record.workspace().to_string();
        let language = record.language().to_string();

        let rows = state.configs.entry(config_type.to_string()).or_default();
        let dimensions = DataDimensions::new()
            .with_workspace(workspace.clone())
            .with_language(language.clone());
        let next_revision = revision_ceiling(rows, 0, &workspace, &language) + 1;
        let now = now_micros().max(timestamp_ceiling(rows, 0, &workspace, &language) + 1);
        let previous_head = live_head_of(rows, 0, &dimensions).cloned();
        let row = build_revision(
            &definition,
            record,
            0,
            previous_head.as_ref(),
            next_revision,
            now,
        );
        rows.push(row);

        state.bump_watermark(KIND_CONFIG, config_type, &workspace, &language);
        Ok(next_revision)
    }

    async fn get_config(
        &self,
        config_type: &str,
        dimensions: &DataDimensions,
    ) -> RepositoryResult<Record> {
        let state = self.state.read().await;
        let definition = state
            .config_definitions
            .get(config_type)
            .cloned()
            .map(Arc::new)
            .ok_or_else(|| RepositoryError::SchemaMissing {
                kind: KIND_CONFIG.to_string(),
                name: config_type.to_string(),
            })?;

        let rows = state
            .configs
            .get(config_type)
            .map(Vec::as_slice)
            .unwrap_or_default();
        let head = head_of(rows, 0, dimensions)
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
        let state = self.state.read().await;
        let key = watermark_key(
            KIND_CONTENT,
            content_type,
            dimensions.workspace(),
            dimensions.language(),
        );
        Ok(state.watermarks.get(&key).copied().unwrap_or(0))
    }
}
