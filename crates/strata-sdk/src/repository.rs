//! High-level repository client
//!
//! A [`Repository`] binds a storage adapter to a repository name and keeps
//! the client's current context: which content type is selected, which
//! workspace/language dimension is active, and which actor to stamp on
//! saves. It is the surface application code talks to; the adapter
//! underneath can be swapped (memory, file system, PostgreSQL, HTTP API,
//! cached or not) without touching callers.

use std::sync::Arc;
use tracing::debug;

use strata_core::{ContentTypeDefinition, DataDimensions, Record, UserInfo};
use strata_repository::{RecordQuery, StorageAdapter};

use crate::error::{Result, SdkError};

/// Client handle for one named repository.
pub struct Repository {
    name: String,
    storage: Arc<dyn StorageAdapter>,
    dimensions: DataDimensions,
    current: Option<Arc<ContentTypeDefinition>>,
    user_info: Option<UserInfo>,
}

impl Repository {
    /// Bind a storage adapter directly. Most callers go through
    /// [`RepositoryBuilder`](crate::RepositoryBuilder) instead.
    pub fn new(name: impl Into<String>, storage: Arc<dyn StorageAdapter>) -> Self {
        Self {
            name: name.into(),
            storage,
            dimensions: DataDimensions::new(),
            current: None,
            user_info: None,
        }
    }

    /// Repository name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The underlying storage adapter.
    pub fn storage(&self) -> &Arc<dyn StorageAdapter> {
        &self.storage
    }

    /// The active dimensions for reads.
    pub fn dimensions(&self) -> &DataDimensions {
        &self.dimensions
    }

    /// Stamp this actor on subsequent saves.
    pub fn set_user_info(&mut self, user_info: Option<UserInfo>) {
        self.user_info = user_info;
    }

    // ---- context selection -----------------------------------------------

    /// Select the content type subsequent record operations apply to.
    pub async fn select_content_type(&mut self, name: &str) -> Result<()> {
        let definition = self.storage.content_type_definition(name).await?;
        debug!(repository = %self.name, content_type = name, "selected content type");
        self.current = Some(Arc::new(definition));
        Ok(())
    }

    /// The currently selected content-type definition.
    pub fn current_content_type(&self) -> Result<&Arc<ContentTypeDefinition>> {
        self.current.as_ref().ok_or(SdkError::NoContentTypeSelected)
    }

    /// Switch the active workspace.
    pub fn select_workspace(&mut self, workspace: impl Into<String>) {
        self.dimensions = self.dimensions.clone().with_workspace(workspace);
    }

    /// Switch the active language.
    pub fn select_language(&mut self, language: impl Into<String>) {
        self.dimensions = self.dimensions.clone().with_language(language);
    }

    /// Read as of the given timestamp (microseconds) until reset.
    pub fn set_time_shift(&mut self, timestamp: i64) {
        self.dimensions = self.dimensions.clone().with_timeshift(timestamp);
    }

    /// Return to reading the latest revisions.
    pub fn reset_time_shift(&mut self) {
        self.dimensions = self.dimensions.clone().without_timeshift();
    }

    // ---- schema ----------------------------------------------------------

    /// Register a content-type definition with the backing store.
    pub async fn register_content_type(
        &self,
        definition: &ContentTypeDefinition,
    ) -> Result<()> {
        self.storage.register_content_type(definition).await?;
        Ok(())
    }

    /// Register a config-type definition with the backing store.
    pub async fn register_config_type(&self, definition: &ContentTypeDefinition) -> Result<()> {
        self.storage.register_config_type(definition).await?;
        Ok(())
    }

    /// Names of all content types in the repository.
    pub async fn content_types(&self) -> Result<Vec<String>> {
        Ok(self.storage.list_content_types().await?)
    }

    // ---- records ---------------------------------------------------------

    /// Create a record for the selected content type in the active
    /// workspace/language.
    pub fn new_record(&self, name: &str) -> Result<Record> {
        let definition = self.current_content_type()?;
        let record = Record::new(Arc::clone(definition), name)?
            .with_workspace(self.dimensions.workspace())
            .with_language(self.dimensions.language());
        Ok(record)
    }

    /// Save a record; assigns and returns its id. The repository's actor
    /// info is stamped on the record when the caller has not set one.
    pub async fn save_record(&self, record: &mut Record) -> Result<i64> {
        let definition = self.current_content_type()?;
        if record.last_change_user_info().is_none() {
            record.set_last_change_user_info(self.user_info.clone());
        }

        let id = self
            .storage
            .save_record(definition.name(), record)
            .await?;
        record.set_id(id);
        Ok(id)
    }

    /// Save several records, returning their ids in input order.
    pub async fn save_records(&self, records: &mut [Record]) -> Result<Vec<i64>> {
        let mut ids = Vec::with_capacity(records.len());
        for record in records.iter_mut() {
            ids.push(self.save_record(record).await?);
        }
        Ok(ids)
    }

    /// Fetch a record by id within the active dimensions.
    pub async fn get_record(&self, id: i64) -> Result<Record> {
        let definition = self.current_content_type()?;
        Ok(self
            .storage
            .get_record(definition.name(), id, &self.dimensions)
            .await?)
    }

    /// Fetch all records within the active dimensions.
    pub async fn get_records(&self, query: &RecordQuery) -> Result<Vec<Record>> {
        let definition = self.current_content_type()?;
        Ok(self
            .storage
            .get_records(definition.name(), &self.dimensions, query)
            .await?)
    }

    /// Count records within the active dimensions.
    pub async fn count_records(&self) -> Result<u64> {
        let definition = self.current_content_type()?;
        Ok(self
            .storage
            .count_records(definition.name(), &self.dimensions)
            .await?)
    }

    /// Delete a record. Returns the id when something was deleted, `None`
    /// for an unknown id. Mutations always target the latest revisions, so
    /// an active time shift is ignored here.
    pub async fn delete_record(&self, id: i64) -> Result<Option<i64>> {
        let definition = self.current_content_type()?;
        Ok(self
            .storage
            .delete_record(
                definition.name(),
                id,
                &self.dimensions.clone().without_timeshift(),
            )
            .await?)
    }

    /// Delete several records, returning the ids actually deleted.
    pub async fn delete_records(&self, ids: &[i64]) -> Result<Vec<i64>> {
        let definition = self.current_content_type()?;
        Ok(self
            .storage
            .delete_records(
                definition.name(),
                ids,
                &self.dimensions.clone().without_timeshift(),
            )
            .await?)
    }

    /// Purge the selected content type within the active workspace and
    /// language, returning all deleted ids.
    pub async fn delete_all_records(&self) -> Result<Vec<i64>> {
        let definition = self.current_content_type()?;
        Ok(self
            .storage
            .delete_all_records(
                definition.name(),
                &self.dimensions.clone().without_timeshift(),
            )
            .await?)
    }

    // ---- config records --------------------------------------------------

    /// Save the singleton config record for a config type, returning its
    /// new revision.
    pub async fn save_config(&self, config_type: &str, record: &mut Record) -> Result<i64> {
        if record.last_change_user_info().is_none() {
            record.set_last_change_user_info(self.user_info.clone());
        }
        Ok(self.storage.save_config(config_type, record).await?)
    }

    /// Fetch the singleton config record for a config type.
    pub async fn get_config(&self, config_type: &str) -> Result<Record> {
        Ok(self
            .storage
            .get_config(config_type, &self.dimensions)
            .await?)
    }

    /// Build a config record against a registered config-type definition.
    pub async fn new_config(&self, config_type: &str) -> Result<Record> {
        let definition = self.storage.config_type_definition(config_type).await?;
        let record = Record::new(Arc::new(definition), config_type)?
            .with_workspace(self.dimensions.workspace())
            .with_language(self.dimensions.language());
        Ok(record)
    }
}
