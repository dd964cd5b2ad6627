//! PostgreSQL storage backend
//!
//! Stores revision rows in one table per (repository, content type), named
//! `repository$content_type` like the schemaless layout this backend
//! descends from. Three bootstrap tables are created on connect:
//!
//! - `_definition_` — schema registry: (repository, kind, name) -> JSON
//!   definition + lastchange
//! - `_counter_` — per-(repository, content type) id counter
//! - `_lastchange_` — watermark index per (repository, kind, name,
//!   workspace, language)
//!
//! Counter increments run as a single `INSERT ... ON CONFLICT ... DO UPDATE
//! ... RETURNING` statement and revision numbers are issued by a subselect
//! inside the inserting statement itself, so concurrent writers never
//! read-modify-write across two round trips.

use async_trait::async_trait;
use sqlx::postgres::{PgPool, PgRow};
use sqlx::Row;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::debug;

use strata_core::{ContentTypeDefinition, DataDimensions, Record};

use crate::error::{RepositoryError, RepositoryResult};
use crate::models::RecordQuery;
use crate::store::{apply_query, build_revision, materialize, now_micros, StoredRevision};
use crate::traits::{StorageAdapter, KIND_CONFIG, KIND_CONTENT};

/// PostgreSQL storage adapter.
pub struct PostgresStorage {
    repository: String,
    pool: PgPool,
}

impl PostgresStorage {
    /// Connect to PostgreSQL and bootstrap the mandatory tables.
    ///
    /// # Example
    /// ```no_run
    /// use strata_repository::PostgresStorage;
    ///
    /// # #[tokio::main]
    /// # async fn main() -> anyhow::Result<()> {
    /// let storage =
    ///     PostgresStorage::connect("content", "postgresql://localhost/strata").await?;
    /// # Ok(())
    /// # }
    /// ```
    pub async fn connect(
        repository: impl Into<String>,
        database_url: &str,
    ) -> RepositoryResult<Self> {
        let pool = PgPool::connect(database_url)
            .await
            .map_err(|e| RepositoryError::StorageUnavailable(e.to_string()))?;
        Self::with_pool(repository, pool).await
    }

    /// Use an existing pool (dependency injection) and bootstrap the
    /// mandatory tables.
    pub async fn with_pool(repository: impl Into<String>, pool: PgPool) -> RepositoryResult<Self> {
        let storage = Self {
            repository: repository.into(),
            pool,
        };
        storage.bootstrap().await?;
        Ok(storage)
    }

    async fn bootstrap(&self) -> RepositoryResult<()> {
        let statements = [
            r#"
            CREATE TABLE IF NOT EXISTS _definition_ (
                repository TEXT NOT NULL,
                kind TEXT NOT NULL,
                name TEXT NOT NULL,
                definition JSONB NOT NULL,
                lastchange BIGINT NOT NULL DEFAULT 0,
                PRIMARY KEY (repository, kind, name)
            )
            "#,
            r#"
            CREATE TABLE IF NOT EXISTS _counter_ (
                repository TEXT NOT NULL,
                content_type TEXT NOT NULL,
                counter BIGINT NOT NULL DEFAULT 0,
                PRIMARY KEY (repository, content_type)
            )
            "#,
            r#"
            CREATE TABLE IF NOT EXISTS _lastchange_ (
                repository TEXT NOT NULL,
                kind TEXT NOT NULL,
                name TEXT NOT NULL,
                workspace TEXT NOT NULL DEFAULT 'default',
                language TEXT NOT NULL DEFAULT 'default',
                lastchange BIGINT NOT NULL DEFAULT 0,
                PRIMARY KEY (repository, kind, name, workspace, language)
            )
            "#,
            r#"
            CREATE TABLE IF NOT EXISTS _config_ (
                repository TEXT NOT NULL,
                config_type TEXT NOT NULL,
                workspace TEXT NOT NULL,
                language TEXT NOT NULL,
                revision BIGINT NOT NULL,
                revision_timestamp BIGINT NOT NULL,
                deleted BOOLEAN NOT NULL DEFAULT FALSE,
                properties JSONB NOT NULL,
                hash TEXT NOT NULL,
                creation_user_info JSONB,
                lastchange_user_info JSONB,
                PRIMARY KEY (repository, config_type, workspace, language, revision)
            )
            "#,
        ];

        for sql in statements {
            sqlx::query(sql)
                .execute(&self.pool)
                .await
                .map_err(|e| RepositoryError::StorageUnavailable(e.to_string()))?;
        }
        Ok(())
    }

    /// Quoted table identifier for a content type's revision rows.
    ///
    /// Repository and content-type names are restricted to identifier
    /// characters so they can be embedded safely.
    fn record_table(&self, content_type: &str) -> RepositoryResult<String> {
        for part in [self.repository.as_str(), content_type] {
            if part.is_empty()
                || !part
                    .chars()
                    .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
            {
                return Err(RepositoryError::Other(format!(
                    "Invalid repository or content type name: {part}"
                )));
            }
        }
        Ok(format!("\"{}${}\"", self.repository, content_type))
    }

    async fn ensure_record_table(&self, content_type: &str) -> RepositoryResult<()> {
        let table = self.record_table(content_type)?;
        let sql = format!(
            r#"
            CREATE TABLE IF NOT EXISTS {table} (
                id BIGINT NOT NULL,
                workspace TEXT NOT NULL,
                language TEXT NOT NULL,
                revision BIGINT NOT NULL,
                revision_timestamp BIGINT NOT NULL,
                deleted BOOLEAN NOT NULL DEFAULT FALSE,
                properties JSONB NOT NULL,
                hash TEXT NOT NULL,
                "position" BIGINT,
                parent_record_id BIGINT,
                level_within_sorted_tree BIGINT,
                creation_user_info JSONB,
                lastchange_user_info JSONB,
                PRIMARY KEY (id, workspace, language, revision)
            )
            "#
        );
        sqlx::query(&sql)
            .execute(&self.pool)
            .await
            .map_err(|e| RepositoryError::StorageUnavailable(e.to_string()))?;
        Ok(())
    }

    fn decode_row(row: &PgRow) -> RepositoryResult<StoredRevision> {
        let properties: serde_json::Value = row.try_get("properties")?;
        let properties: BTreeMap<String, String> = serde_json::from_value(properties)?;

        let creation_user_info = row
            .try_get::<Option<serde_json::Value>, _>("creation_user_info")?
            .map(serde_json::from_value)
            .transpose()?;
        let last_change_user_info = row
            .try_get::<Option<serde_json::Value>, _>("lastchange_user_info")?
            .map(serde_json::from_value)
            .transpose()?;

        Ok(StoredRevision {
            id: row.try_get::<Option<i64>, _>("id").unwrap_or(Some(0)).unwrap_or(0),
            workspace: row.try_get("workspace")?,
            language: row.try_get("language")?,
            revision: row.try_get("revision")?,
            revision_timestamp: row.try_get("revision_timestamp")?,
            deleted: row.try_get("deleted")?,
            properties,
            hash: row.try_get("hash")?,
            position: row.try_get::<Option<i64>, _>("position").unwrap_or(None),
            parent_record_id: row
                .try_get::<Option<i64>, _>("parent_record_id")
                .unwrap_or(None),
            level_within_sorted_tree: row
                .try_get::<Option<i64>, _>("level_within_sorted_tree")
                .unwrap_or(None),
            creation_user_info,
            last_change_user_info,
        })
    }

    /// Head revision row for (id, workspace, language), timeshift aware,
    /// tombstones included.
    async fn fetch_head(
        &self,
        content_type: &str,
        id: i64,
        dimensions: &DataDimensions,
    ) -> RepositoryResult<Option<StoredRevision>> {
        let table = self.record_table(content_type)?;
        let sql = match dimensions.timeshift() {
            Some(_) => format!(
                "SELECT * FROM {table} WHERE id = $1 AND workspace = $2 AND language = $3 \
                 AND revision_timestamp <= $4 ORDER BY revision DESC LIMIT 1"
            ),
            None => format!(
                "SELECT * FROM {table} WHERE id = $1 AND workspace = $2 AND language = $3 \
                 ORDER BY revision DESC LIMIT 1"
            ),
        };

        let mut query = sqlx::query(&sql)
            .bind(id)
            .bind(dimensions.workspace())
            .bind(dimensions.language());
        if let Some(timeshift) = dimensions.timeshift() {
            query = query.bind(timeshift);
        }

        let row = query.fetch_optional(&self.pool).await?;
        row.as_ref().map(Self::decode_row).transpose()
    }

    /// Head rows of every id in the dimension, timeshift aware.
    async fn fetch_heads(
        &self,
        content_type: &str,
        dimensions: &DataDimensions,
    ) -> RepositoryResult<Vec<StoredRevision>> {
        let table = self.record_table(content_type)?;
        let sql = match dimensions.timeshift() {
            Some(_) => format!(
                "SELECT DISTINCT ON (id) * FROM {table} WHERE workspace = $1 AND language = $2 \
                 AND revision_timestamp <= $3 ORDER BY id, revision DESC"
            ),
            None => format!(
                "SELECT DISTINCT ON (id) * FROM {table} WHERE workspace = $1 AND language = $2 \
                 ORDER BY id, revision DESC"
            ),
        };

        let mut query = sqlx::query(&sql)
            .bind(dimensions.workspace())
            .bind(dimensions.language());
        if let Some(timeshift) = dimensions.timeshift() {
            query = query.bind(timeshift);
        }

        let rows = query.fetch_all(&self.pool).await?;
        rows.iter().map(Self::decode_row).collect()
    }

    /// Insert a revision row, issuing the revision number inside the
    /// statement itself.
    async fn insert_revision(
        &self,
        content_type: &str,
        row: &StoredRevision,
    ) -> RepositoryResult<i64> {
        let table = self.record_table(content_type)?;
        let sql = format!(
            r#"
            INSERT INTO {table}
                (id, workspace, language, revision, revision_timestamp, deleted,
                 properties, hash, "position", parent_record_id,
                 level_within_sorted_tree, creation_user_info, lastchange_user_info)
            SELECT $1, $2, $3, COALESCE(MAX(revision), 0) + 1, $4, $5, $6, $7, $8, $9, $10, $11, $12
            FROM {table} WHERE id = $1 AND workspace = $2 AND language = $3
            RETURNING revision
            "#
        );

        let revision: i64 = sqlx::query(&sql)
            .bind(row.id)
            .bind(&row.workspace)
            .bind(&row.language)
            .bind(row.revision_timestamp)
            .bind(row.deleted)
            .bind(serde_json::to_value(&row.properties)?)
            .bind(&row.hash)
            .bind(row.position)
            .bind(row.parent_record_id)
            .bind(row.level_within_sorted_tree)
            .bind(
                row.creation_user_info
                    .as_ref()
                    .map(serde_json::to_value)
                    .transpose()?,
            )
            .bind(
                row.last_change_user_info
                    .as_ref()
                    .map(serde_json::to_value)
                    .transpose()?,
            )
            .fetch_one(&self.pool)
            .await?
            .try_get("revision")?;

        Ok(revision)
    }

    async fn bump_watermark(
        &self,
        kind: &str,
        name: &str,
        workspace: &str,
        language: &str,
    ) -> RepositoryResult<()> {
        sqlx::query(
            r#"
            INSERT INTO _lastchange_ (repository, kind, name, workspace, language, lastchange)
            VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT (repository, kind, name, workspace, language)
            DO UPDATE SET lastchange =
                GREATEST(EXCLUDED.lastchange, _lastchange_.lastchange + 1)
            "#,
        )
        .bind(&self.repository)
        .bind(kind)
        .bind(name)
        .bind(workspace)
        .bind(language)
        .bind(now_micros())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn fetch_definition(
        &self,
        kind: &str,
        name: &str,
    ) -> RepositoryResult<Arc<ContentTypeDefinition>> {
        let row = sqlx::query(
            "SELECT definition FROM _definition_ WHERE repository = $1 AND kind = $2 AND name = $3",
        )
        .bind(&self.repository)
        .bind(kind)
        .bind(name)
        .fetch_optional(&self.pool)
        .await?;

        let row = row.ok_or_else(|| RepositoryError::SchemaMissing {
            kind: kind.to_string(),
            name: name.to_string(),
        })?;

        let definition: serde_json::Value = row.try_get("definition")?;
        Ok(Arc::new(serde_json::from_value(definition)?))
    }

    async fn store_definition(
        &self,
        kind: &str,
        definition: &ContentTypeDefinition,
    ) -> RepositoryResult<()> {
        sqlx::query(
            r#"
            INSERT INTO _definition_ (repository, kind, name, definition, lastchange)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (repository, kind, name)
            DO UPDATE SET definition = EXCLUDED.definition, lastchange = EXCLUDED.lastchange
            "#,
        )
        .bind(&self.repository)
        .bind(kind)
        .bind(definition.name())
        .bind(serde_json::to_value(definition)?)
        .bind(now_micros())
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}

#[async_trait]
impl StorageAdapter for PostgresStorage {
    fn repository(&self) -> &str {
        &self.repository
    }

    async fn register_content_type(
        &self,
        definition: &ContentTypeDefinition,
    ) -> RepositoryResult<()> {
        self.store_definition(KIND_CONTENT, definition).await?;
        self.ensure_record_table(definition.name()).await?;
        self.bump_watermark(KIND_CONTENT, definition.name(), "default", "default")
            .await
    }

    async fn register_config_type(
        &self,
        definition: &ContentTypeDefinition,
    ) -> RepositoryResult<()> {
        self.store_definition(KIND_CONFIG, definition).await?;
        self.bump_watermark(KIND_CONFIG, definition.name(), "default", "default")
            .await
    }

    async fn content_type_definition(
        &self,
        name: &str,
    ) -> RepositoryResult<ContentTypeDefinition> {
        self.fetch_definition(KIND_CONTENT, name)
            .await
            .map(|d| (*d).clone())
    }

    async fn config_type_definition(
        &self,
        name: &str,
    ) -> RepositoryResult<ContentTypeDefinition> {
        self.fetch_definition(KIND_CONFIG, name)
            .await
            .map(|d| (*d).clone())
    }

    async fn list_content_types(&self) -> RepositoryResult<Vec<String>> {
        let rows = sqlx::query(
            "SELECT name FROM _definition_ WHERE repository = $1 AND kind = $2 ORDER BY name",
        )
        .bind(&self.repository)
        .bind(KIND_CONTENT)
        .fetch_all(&self.pool)
        .await?;

        rows.iter()
            .map(|row| row.try_get::<String, _>("name").map_err(Into::into))
            .collect()
    }

    async fn save_record(&self, content_type: &str, record: &Record) -> RepositoryResult<i64> {
        let definition = self.fetch_definition(KIND_CONTENT, content_type).await?;

        let id = match record.id() {
            Some(id) => id,
            None => {
                // Atomic increment: one statement, no read-then-write race.
                let row = sqlx::query(
                    r#"
                    INSERT INTO _counter_ (repository, content_type, counter)
                    VALUES ($1, $2, 1)
                    ON CONFLICT (repository, content_type)
                    DO UPDATE SET counter = _counter_.counter + 1
                    RETURNING counter
                    "#,
                )
                .bind(&self.repository)
                .bind(content_type)
                .fetch_one(&self.pool)
                .await?;
                row.try_get("counter")?
            }
        };

        let dimensions = DataDimensions::new()
            .with_workspace(record.workspace())
            .with_language(record.language());
        let previous_head = self
            .fetch_head(content_type, id, &dimensions)
            .await?
            .filter(|head| !head.deleted);

        // Revision number is issued by the INSERT statement itself; the one
        // in the built row is a placeholder.
        let row = build_revision(&definition, record, id, previous_head.as_ref(), 0, now_micros());
        let revision = self.insert_revision(content_type, &row).await?;
        debug!(content_type, id, revision, "saved record");

        self.bump_watermark(
            KIND_CONTENT,
            content_type,
            record.workspace(),
            record.language(),
        )
        .await?;
        Ok(id)
    }

    async fn get_record(
        &self,
        content_type: &str,
        id: i64,
        dimensions: &DataDimensions,
    ) -> RepositoryResult<Record> {
        let definition = self.fetch_definition(KIND_CONTENT, content_type).await?;
        let head = self
            .fetch_head(content_type, id, dimensions)
            .await?
            .filter(|head| !head.deleted)
            .ok_or_else(|| RepositoryError::RecordNotFound {
                content_type: content_type.to_string(),
                id,
            })?;

        materialize(&definition, &head)
    }

    async fn get_records(
        &self,
        content_type: &str,
        dimensions: &DataDimensions,
        query: &RecordQuery,
    ) -> RepositoryResult<Vec<Record>> {
        let definition = self.fetch_definition(KIND_CONTENT, content_type).await?;
        let heads = self.fetch_heads(content_type, dimensions).await?;

        let mut records = Vec::new();
        for head in heads.iter().filter(|head| !head.deleted) {
            records.push(materialize(&definition, head)?);
        }
        Ok(apply_query(records, query))
    }

    async fn count_records(
        &self,
        content_type: &str,
        dimensions: &DataDimensions,
    ) -> RepositoryResult<u64> {
        self.fetch_definition(KIND_CONTENT, content_type).await?;
        let heads = self.fetch_heads(content_type, dimensions).await?;
        Ok(heads.iter().filter(|head| !head.deleted).count() as u64)
    }

    async fn delete_record(
        &self,
        content_type: &str,
        id: i64,
        dimensions: &DataDimensions,
    ) -> RepositoryResult<Option<i64>> {
        self.fetch_definition(KIND_CONTENT, content_type).await?;

        let live = self
            .fetch_head(content_type, id, &dimensions.clone().without_timeshift())
            .await?
            .filter(|head| !head.deleted);
        if live.is_none() {
            return Ok(None);
        }

        let tombstone = crate::store::build_tombstone(
            id,
            dimensions.workspace(),
            dimensions.language(),
            0,
            now_micros(),
        );
        let revision = self.insert_revision(content_type, &tombstone).await?;
        debug!(content_type, id, revision, "deleted record");

        self.bump_watermark(
            KIND_CONTENT,
            content_type,
            dimensions.workspace(),
            dimensions.language(),
        )
        .await?;
        Ok(Some(id))
    }

    async fn delete_all_records(
        &self,
        content_type: &str,
        dimensions: &DataDimensions,
    ) -> RepositoryResult<Vec<i64>> {
        self.fetch_definition(KIND_CONTENT, content_type).await?;

        let heads = self.fetch_heads(content_type, dimensions).await?;
        let deleted: Vec<i64> = heads
            .iter()
            .filter(|head| !head.deleted)
            .map(|head| head.id)
            .collect();

        // Purge this dimension's history; counters are never reset.
        let table = self.record_table(content_type)?;
        let sql = format!("DELETE FROM {table} WHERE workspace = $1 AND language = $2");
        sqlx::query(&sql)
            .bind(dimensions.workspace())
            .bind(dimensions.language())
            .execute(&self.pool)
            .await?;

        self.bump_watermark(
            KIND_CONTENT,
            content_type,
            dimensions.workspace(),
            dimensions.language(),
        )
        .await?;
        Ok(deleted)
    }

    async fn save_config(&self, config_type: &str, record: &Record) -> RepositoryResult<i64> {
        let definition = self.fetch_definition(KIND_CONFIG, config_type).await?;

        let row = sqlx::query(
            "SELECT * FROM _config_ WHERE repository = $1 AND config_type = $2 \
             AND workspace = $3 AND language = $4 ORDER BY revision DESC LIMIT 1",
        )
        .bind(&self.repository)
        .bind(config_type)
        .bind(record.workspace())
        .bind(record.language())
        .fetch_optional(&self.pool)
        .await?;
        let previous_head = row
            .as_ref()
            .map(Self::decode_row)
            .transpose()?
            .filter(|head| !head.deleted);

        let built =
            build_revision(&definition, record, 0, previous_head.as_ref(), 0, now_micros());

        let revision: i64 = sqlx::query(
            r#"
            INSERT INTO _config_
                (repository, config_type, workspace, language, revision,
                 revision_timestamp, deleted, properties, hash,
                 creation_user_info, lastchange_user_info)
            SELECT $1, $2, $3, $4, COALESCE(MAX(revision), 0) + 1, $5, FALSE, $6, $7, $8, $9
            FROM _config_ WHERE repository = $1 AND config_type = $2
                AND workspace = $3 AND language = $4
            RETURNING revision
            "#,
        )
        .bind(&self.repository)
        .bind(config_type)
        .bind(&built.workspace)
        .bind(&built.language)
        .bind(built.revision_timestamp)
        .bind(serde_json::to_value(&built.properties)?)
        .bind(&built.hash)
        .bind(
            built
                .creation_user_info
                .as_ref()
                .map(serde_json::to_value)
                .transpose()?,
        )
        .bind(
            built
                .last_change_user_info
                .as_ref()
                .map(serde_json::to_value)
                .transpose()?,
        )
        .fetch_one(&self.pool)
        .await?
        .try_get("revision")?;

        self.bump_watermark(
            KIND_CONFIG,
            config_type,
            record.workspace(),
            record.language(),
        )
        .await?;
        Ok(revision)
    }

    async fn get_config(
        &self,
        config_type: &str,
        dimensions: &DataDimensions,
    ) -> RepositoryResult<Record> {
        let definition = self.fetch_definition(KIND_CONFIG, config_type).await?;

        let sql = match dimensions.timeshift() {
            Some(_) => {
                "SELECT * FROM _config_ WHERE repository = $1 AND config_type = $2 \
                 AND workspace = $3 AND language = $4 AND revision_timestamp <= $5 \
                 ORDER BY revision DESC LIMIT 1"
            }
            None => {
                "SELECT * FROM _config_ WHERE repository = $1 AND config_type = $2 \
                 AND workspace = $3 AND language = $4 ORDER BY revision DESC LIMIT 1"
            }
        };

        let mut query = sqlx::query(sql)
            .bind(&self.repository)
            .bind(config_type)
            .bind(dimensions.workspace())
            .bind(dimensions.language());
        if let Some(timeshift) = dimensions.timeshift() {
            query = query.bind(timeshift);
        }

        let head = query
            .fetch_optional(&self.pool)
            .await?
            .as_ref()
            .map(Self::decode_row)
            .transpose()?
            .filter(|head| !head.deleted)
            .ok_or_else(|| RepositoryError::RecordNotFound {
                content_type: config_type.to_string(),
                id: 0,
            })?;

        materialize(&definition, &head)
    }

    async fn last_modified(
        &self,
        content_type: &str,
        dimensions: &DataDimensions,
    ) -> RepositoryResult<i64> {
        let row = sqlx::query(
            "SELECT lastchange FROM _lastchange_ WHERE repository = $1 AND kind = $2 \
             AND name = $3 AND workspace = $4 AND language = $5",
        )
        .bind(&self.repository)
        .bind(KIND_CONTENT)
        .bind(content_type)
        .bind(dimensions.workspace())
        .bind(dimensions.language())
        .fetch_optional(&self.pool)
        .await?;

        Ok(row
            .map(|row| row.try_get("lastchange"))
            .transpose()?
            .unwrap_or(0))
    }
}
