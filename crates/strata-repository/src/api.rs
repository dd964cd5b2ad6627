//! HTTP API storage backend
//!
//! Talks to a remote Strata repository server over HTTP/HTTPS with optional
//! Bearer token authentication. The remote endpoint owns counters,
//! revisions and watermarks; this adapter is a thin JSON client.
//!
//! # Endpoints
//!
//! The remote server must implement, below a base URL:
//!
//! ```text
//! GET    /{repository}/definition/{kind}/{name}          definition JSON
//! PUT    /{repository}/definition/{kind}/{name}          register definition
//! GET    /{repository}/definition/content                list content types
//! POST   /{repository}/content/{type}/records            save -> {"id": n}
//! GET    /{repository}/content/{type}/records/{id}       record JSON
//! GET    /{repository}/content/{type}/records            record list JSON
//! GET    /{repository}/content/{type}/count              {"count": n}
//! DELETE /{repository}/content/{type}/records/{id}       {"deleted": id|null}
//! DELETE /{repository}/content/{type}/records            {"deleted": [ids]}
//! GET    /{repository}/content/{type}/lastchange         {"lastchange": n}
//! POST   /{repository}/config/{type}                     {"revision": n}
//! GET    /{repository}/config/{type}                     record JSON
//! ```
//!
//! Dimension selection travels as `workspace`, `language` and `timeshift`
//! query parameters; list queries add `filter_property`, `filter_value`,
//! `order_by`, `descending`, `page` and `page_size`.
//!
//! # Authentication
//!
//! When an API key is configured it is sent as a Bearer token:
//!
//! ```text
//! Authorization: Bearer {api_key}
//! ```

use async_trait::async_trait;
use reqwest::{Client, Method, RequestBuilder, StatusCode};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use strata_core::{ContentTypeDefinition, DataDimensions, Record, UserInfo};

use crate::error::{RepositoryError, RepositoryResult};
use crate::models::RecordQuery;
use crate::traits::{StorageAdapter, KIND_CONFIG, KIND_CONTENT};

/// Default request timeout.
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// HTTP API storage adapter.
pub struct ApiStorage {
    repository: String,
    base_url: String,
    api_key: Option<String>,
    client: Client,
}

/// Record representation on the wire.
#[derive(Debug, Serialize, Deserialize)]
struct WireRecord {
    #[serde(skip_serializing_if = "Option::is_none")]
    id: Option<i64>,
    workspace: String,
    language: String,
    #[serde(default)]
    revision: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    revision_timestamp: Option<i64>,
    properties: BTreeMap<String, String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    hash: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    position: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    parent_record_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    level_within_sorted_tree: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    creation_user_info: Option<UserInfo>,
    #[serde(skip_serializing_if = "Option::is_none")]
    last_change_user_info: Option<UserInfo>,
}

impl WireRecord {
    fn from_record(record: &Record) -> Self {
        Self {
            id: record.id(),
            workspace: record.workspace().to_string(),
            language: record.language().to_string(),
            revision: record.revision(),
            revision_timestamp: record.revision_timestamp(),
            properties: record.properties().clone(),
            hash: record.hash().map(str::to_string),
            position: record.position(),
            parent_record_id: record.parent_record_id(),
            level_within_sorted_tree: record.level_within_sorted_tree(),
            creation_user_info: record.creation_user_info().cloned(),
            last_change_user_info: record.last_change_user_info().cloned(),
        }
    }

    fn into_record(self, definition: &Arc<ContentTypeDefinition>) -> RepositoryResult<Record> {
        let mut record = Record::new(Arc::clone(definition), "")?
            .with_workspace(self.workspace)
            .with_language(self.language);
        record.set_properties(self.properties);
        if let Some(id) = self.id {
            record.set_id(id);
        }
        record.set_revision(self.revision);
        record.set_revision_timestamp(self.revision_timestamp);
        record.set_hash(self.hash);
        record.set_position(self.position);
        record.set_parent_record_id(self.parent_record_id);
        record.set_level_within_sorted_tree(self.level_within_sorted_tree);
        record.set_creation_user_info(self.creation_user_info);
        record.set_last_change_user_info(self.last_change_user_info);
        Ok(record)
    }
}

#[derive(Deserialize)]
struct SaveResponse {
    id: i64,
}

#[derive(Deserialize)]
struct RevisionResponse {
    revision: i64,
}

#[derive(Deserialize)]
struct CountResponse {
    count: u64,
}

#[derive(Deserialize)]
struct DeleteResponse {
    deleted: Option<i64>,
}

#[derive(Deserialize)]
struct DeleteManyResponse {
    deleted: Vec<i64>,
}

#[derive(Deserialize)]
struct LastChangeResponse {
    lastchange: i64,
}

impl ApiStorage {
    /// Create an API storage adapter.
    ///
    /// # Example
    /// ```no_run
    /// use strata_repository::ApiStorage;
    ///
    /// let storage = ApiStorage::new(
    ///     "content",
    ///     "https://content.example.com/repo",
    ///     Some("secret-key".to_string()),
    /// ).unwrap();
    /// ```
    pub fn new(
        repository: impl Into<String>,
        base_url: impl Into<String>,
        api_key: Option<String>,
    ) -> RepositoryResult<Self> {
        let client = Client::builder()
            .timeout(DEFAULT_TIMEOUT)
            .build()
            .map_err(|e| RepositoryError::Api(e.to_string()))?;

        Ok(Self {
            repository: repository.into(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key,
            client,
        })
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let url = format!("{}/{}/{}", self.base_url, self.repository, path);
        let mut builder = self.client.request(method, url);
        if let Some(key) = &self.api_key {
            builder = builder.bearer_auth(key);
        }
        builder
    }

    fn dimension_params(dimensions: &DataDimensions) -> Vec<(&'static str, String)> {
        let mut params = vec![
            ("workspace", dimensions.workspace().to_string()),
            ("language", dimensions.language().to_string()),
        ];
        if let Some(timeshift) = dimensions.timeshift() {
            params.push(("timeshift", timeshift.to_string()));
        }
        params
    }

    fn query_params(query: &RecordQuery) -> Vec<(&'static str, String)> {
        let mut params = Vec::new();
        if let Some((property, value)) = &query.filter {
            params.push(("filter_property", property.clone()));
            params.push(("filter_value", value.clone()));
        }
        if let Some(order_by) = &query.order_by {
            params.push(("order_by", order_by.clone()));
        }
        if query.descending {
            params.push(("descending", "true".to_string()));
        }
        if let Some(page) = query.page {
            params.push(("page", page.to_string()));
        }
        if let Some(page_size) = query.page_size {
            params.push(("page_size", page_size.to_string()));
        }
        params
    }

    /// Fail on non-success statuses; 404 becomes the given error.
    async fn expect_success(
        response: reqwest::Response,
        not_found: impl FnOnce() -> RepositoryError,
    ) -> RepositoryResult<reqwest::Response> {
        match response.status() {
            status if status.is_success() => Ok(response),
            StatusCode::NOT_FOUND => Err(not_found()),
            status => {
                let body = response.text().await.unwrap_or_default();
                Err(RepositoryError::Api(format!("{status}: {body}")))
            }
        }
    }
}

#[async_trait]
impl StorageAdapter for ApiStorage {
    fn repository(&self) -> &str {
        &self.repository
    }

    async fn register_content_type(
        &self,
        definition: &ContentTypeDefinition,
    ) -> RepositoryResult<()> {
        let response = self
            .request(
                Method::PUT,
                &format!("definition/{KIND_CONTENT}/{}", definition.name()),
            )
            .json(definition)
            .send()
            .await?;
        Self::expect_success(response, || {
            RepositoryError::ContentTypeNotFound(definition.name().to_string())
        })
        .await?;
        Ok(())
    }

    async fn register_config_type(
        &self,
        definition: &ContentTypeDefinition,
    ) -> RepositoryResult<()> {
        let response = self
            .request(
                Method::PUT,
                &format!("definition/{KIND_CONFIG}/{}", definition.name()),
            )
            .json(definition)
            .send()
            .await?;
        Self::expect_success(response, || {
            RepositoryError::ContentTypeNotFound(definition.name().to_string())
        })
        .await?;
        Ok(())
    }

    async fn content_type_definition(
        &self,
        name: &str,
    ) -> RepositoryResult<ContentTypeDefinition> {
        let response = self
            .request(Method::GET, &format!("definition/{KIND_CONTENT}/{name}"))
            .send()
            .await?;
        let response = Self::expect_success(response, || RepositoryError::SchemaMissing {
            kind: KIND_CONTENT.to_string(),
            name: name.to_string(),
        })
        .await?;
        Ok(response.json().await?)
    }

    async fn config_type_definition(
        &self,
        name: &str,
    ) -> RepositoryResult<ContentTypeDefinition> {
        let response = self
            .request(Method::GET, &format!("definition/{KIND_CONFIG}/{name}"))
            .send()
            .await?;
        let response = Self::expect_success(response, || RepositoryError::SchemaMissing {
            kind: KIND_CONFIG.to_string(),
            name: name.to_string(),
        })
        .await?;
        Ok(response.json().await?)
    }

    async fn list_content_types(&self) -> RepositoryResult<Vec<String>> {
        let response = self
            .request(Method::GET, &format!("definition/{KIND_CONTENT}"))
            .send()
            .await?;
        let response = Self::expect_success(response, || {
            RepositoryError::Other("definition listing unavailable".to_string())
        })
        .await?;
        Ok(response.json().await?)
    }

    async fn save_record(&self, content_type: &str, record: &Record) -> RepositoryResult<i64> {
        let response = self
            .request(Method::POST, &format!("content/{content_type}/records"))
            .json(&WireRecord::from_record(record))
            .send()
            .await?;
        let response = Self::expect_success(response, || RepositoryError::SchemaMissing {
            kind: KIND_CONTENT.to_string(),
            name: content_type.to_string(),
        })
        .await?;
        let saved: SaveResponse = response.json().await?;
        Ok(saved.id)
    }

    async fn get_record(
        &self,
        content_type: &str,
        id: i64,
        dimensions: &DataDimensions,
    ) -> RepositoryResult<Record> {
        let definition = Arc::new(self.content_type_definition(content_type).await?);

        let response = self
            .request(Method::GET, &format!("content/{content_type}/records/{id}"))
            .query(&Self::dimension_params(dimensions))
            .send()
            .await?;
        let response = Self::expect_success(response, || RepositoryError::RecordNotFound {
            content_type: content_type.to_string(),
            id,
        })
        .await?;

        let wire: WireRecord = response.json().await?;
        wire.into_record(&definition)
    }

    async fn get_records(
        &self,
        content_type: &str,
        dimensions: &DataDimensions,
        query: &RecordQuery,
    ) -> RepositoryResult<Vec<Record>> {
        let definition = Arc::new(self.content_type_definition(content_type).await?);

        let mut params = Self::dimension_params(dimensions);
        params.extend(Self::query_params(query));

        let response = self
            .request(Method::GET, &format!("content/{content_type}/records"))
            .query(&params)
            .send()
            .await?;
        let response = Self::expect_success(response, || {
            RepositoryError::ContentTypeNotFound(content_type.to_string())
        })
        .await?;

        let wires: Vec<WireRecord> = response.json().await?;
        wires
            .into_iter()
            .map(|wire| wire.into_record(&definition))
            .collect()
    }

    async fn count_records(
        &self,
        content_type: &str,
        dimensions: &DataDimensions,
    ) -> RepositoryResult<u64> {
        let response = self
            .request(Method::GET, &format!("content/{content_type}/count"))
            .query(&Self::dimension_params(dimensions))
            .send()
            .await?;
        let response = Self::expect_success(response, || {
            RepositoryError::ContentTypeNotFound(content_type.to_string())
        })
        .await?;
        let count: CountResponse = response.json().await?;
        Ok(count.count)
    }

    async fn delete_record(
        &self,
        content_type: &str,
        id: i64,
        dimensions: &DataDimensions,
    ) -> RepositoryResult<Option<i64>> {
        let response = self
            .request(
                Method::DELETE,
                &format!("content/{content_type}/records/{id}"),
            )
            .query(&Self::dimension_params(dimensions))
            .send()
            .await?;
        let response = Self::expect_success(response, || {
            RepositoryError::ContentTypeNotFound(content_type.to_string())
        })
        .await?;
        let deleted: DeleteResponse = response.json().await?;
        Ok(deleted.deleted)
    }

    async fn delete_all_records(
        &self,
        content_type: &str,
        dimensions: &DataDimensions,
    ) -> RepositoryResult<Vec<i64>> {
        let response = self
            .request(Method::DELETE, &format!("content/{content_type}/records"))
            .query(&Self::dimension_params(dimensions))
            .send()
            .await?;
        let response = Self::expect_success(response, || {
            RepositoryError::ContentTypeNotFound(content_type.to_string())
        })
        .await?;
        let deleted: DeleteManyResponse = response.json().await?;
        Ok(deleted.deleted)
    }

    async fn save_config(&self, config_type: &str, record: &Record) -> RepositoryResult<i64> {
        let response = self
            .request(Method::POST, &format!("config/{config_type}"))
            .json(&WireRecord::from_record(record))
            .send()
            .await?;
        let response = Self::expect_success(response, || RepositoryError::SchemaMissing {
            kind: KIND_CONFIG.to_string(),
            name: config_type.to_string(),
        })
        .await?;
        let saved: RevisionResponse = response.json().await?;
        Ok(saved.revision)
    }

    async fn get_config(
        &self,
        config_type: &str,
        dimensions: &DataDimensions,
    ) -> RepositoryResult<Record> {
        let definition = Arc::new(self.config_type_definition(config_type).await?);

        let response = self
            .request(Method::GET, &format!("config/{config_type}"))
            .query(&Self::dimension_params(dimensions))
            .send()
            .await?;
        let response = Self::expect_success(response, || RepositoryError::RecordNotFound {
            content_type: config_type.to_string(),
            id: 0,
        })
        .await?;

        let wire: WireRecord = response.json().await?;
        wire.into_record(&definition)
    }

    async fn last_modified(
        &self,
        content_type: &str,
        dimensions: &DataDimensions,
    ) -> RepositoryResult<i64> {
        let response = self
            .request(Method::GET, &format!("content/{content_type}/lastchange"))
            .query(&Self::dimension_params(dimensions))
            .send()
            .await?;
        let response = Self::expect_success(response, || {
            RepositoryError::ContentTypeNotFound(content_type.to_string())
        })
        .await?;
        let lastchange: LastChangeResponse = response.json().await?;
        Ok(lastchange.lastchange)
    }
}
