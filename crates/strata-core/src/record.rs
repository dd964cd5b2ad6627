//! Records: schema-validated property containers
//!
//! A [`Record`] is the in-memory representation of one versioned content
//! item. It is a single-owner value object: no internal locking, mutated
//! synchronously by its holder. Property writes are validated against the
//! record's content-type definition at assignment time; any successful
//! mutation clears the content hash and revision timestamp so the
//! persistence layer recomputes them on the next save.

use std::collections::BTreeMap;
use std::sync::Arc;

use crate::definition::{ContentTypeDefinition, DEFAULT_CLIPPING};
use crate::dimensions::DEFAULT_DIMENSION;
use crate::error::{CoreError, Result};
use crate::ident::normalize_identifier;
use crate::sequence::Sequence;
use crate::user_info::UserInfo;

/// One versioned content item.
#[derive(Debug, Clone)]
pub struct Record {
    /// `None` until the record has been persisted
    id: Option<i64>,
    definition: Arc<ContentTypeDefinition>,
    clipping: String,
    workspace: String,
    language: String,
    properties: BTreeMap<String, String>,
    revision: i64,
    /// Microseconds since the epoch; cleared on any property mutation
    revision_timestamp: Option<i64>,
    /// Content fingerprint; cleared on any property mutation
    hash: Option<String>,
    position: Option<i64>,
    parent_record_id: Option<i64>,
    level_within_sorted_tree: Option<i64>,
    creation_user_info: Option<UserInfo>,
    last_change_user_info: Option<UserInfo>,
}

impl Record {
    /// Create a record for the given content type, seeding the `name`
    /// property.
    ///
    /// # Example
    /// ```
    /// use std::sync::Arc;
    /// use strata_core::{ContentTypeDefinition, Record};
    ///
    /// let definition = Arc::new(
    ///     ContentTypeDefinition::builder("profiles").property("claim").build(),
    /// );
    /// let mut record = Record::new(definition, "Agency 5").unwrap();
    /// record.set_property("claim", "We build things").unwrap();
    /// assert_eq!(record.name(), Some("Agency 5"));
    /// ```
    pub fn new(definition: Arc<ContentTypeDefinition>, name: &str) -> Result<Self> {
        let mut record = Self {
            id: None,
            definition,
            clipping: DEFAULT_CLIPPING.to_string(),
            workspace: DEFAULT_DIMENSION.to_string(),
            language: DEFAULT_DIMENSION.to_string(),
            properties: BTreeMap::new(),
            revision: 1,
            revision_timestamp: None,
            hash: None,
            position: None,
            parent_record_id: None,
            level_within_sorted_tree: None,
            creation_user_info: None,
            last_change_user_info: None,
        };
        record.set_property("name", name)?;
        Ok(record)
    }

    /// Select the active clipping.
    pub fn with_clipping(mut self, clipping: impl Into<String>) -> Self {
        self.clipping = clipping.into();
        self
    }

    /// Place the record in a workspace.
    pub fn with_workspace(mut self, workspace: impl Into<String>) -> Self {
        self.workspace = workspace.into();
        self
    }

    /// Place the record in a language.
    pub fn with_language(mut self, language: impl Into<String>) -> Self {
        self.language = language.into();
        self
    }

    /// Set a property after normalizing and validating its name against the
    /// content-type definition for the active clipping.
    ///
    /// Fails with [`CoreError::UnknownProperty`] when the normalized name is
    /// not declared; the record is left unchanged in that case. On success
    /// the content hash and revision timestamp are cleared.
    pub fn set_property(&mut self, name: &str, value: impl Into<String>) -> Result<()> {
        let property = normalize_identifier(name);
        if !self.definition.has_property(&property, &self.clipping) {
            return Err(CoreError::UnknownProperty(property));
        }

        self.properties.insert(property, value.into());
        self.hash = None;
        self.revision_timestamp = None;
        Ok(())
    }

    /// Value of a property, when set. Never fails.
    pub fn property(&self, name: &str) -> Option<&str> {
        self.properties.get(name).map(String::as_str)
    }

    /// Value of a property, or `default` when absent.
    pub fn property_or<'a>(&'a self, name: &str, default: &'a str) -> &'a str {
        self.property(name).unwrap_or(default)
    }

    /// Decode a property value as a sequence (JSON array of sub-records).
    /// Empty sequence on decode failure; never fails the caller.
    pub fn sequence(&self, name: &str) -> Sequence {
        Sequence::from_json(self.property(name))
    }

    /// Split a comma-separated property value into its parts. Empty when the
    /// property is absent or empty.
    pub fn array_property(&self, name: &str) -> Vec<String> {
        match self.property(name) {
            Some(value) if !value.is_empty() => {
                value.split(',').map(str::to_string).collect()
            }
            _ => Vec::new(),
        }
    }

    /// The `name` property.
    pub fn name(&self) -> Option<&str> {
        self.property("name")
    }

    /// The `status` property.
    pub fn status(&self) -> Option<&str> {
        self.property("status")
    }

    /// Label for the record's status, when both the property and its map
    /// entry exist.
    pub fn status_label(&self) -> Option<&str> {
        let status = self.status()?;
        self.definition.status_list().get(status).map(String::as_str)
    }

    /// The `subtype` property.
    pub fn subtype(&self) -> Option<&str> {
        self.property("subtype")
    }

    /// Label for the record's subtype, when both the property and its map
    /// entry exist.
    pub fn subtype_label(&self) -> Option<&str> {
        let subtype = self.subtype()?;
        self.definition.subtypes().get(subtype).map(String::as_str)
    }

    pub fn id(&self) -> Option<i64> {
        self.id
    }

    pub fn set_id(&mut self, id: i64) {
        self.id = Some(id);
    }

    pub fn definition(&self) -> &Arc<ContentTypeDefinition> {
        &self.definition
    }

    /// Name of the record's content type.
    pub fn content_type(&self) -> &str {
        self.definition.name()
    }

    pub fn clipping(&self) -> &str {
        &self.clipping
    }

    pub fn workspace(&self) -> &str {
        &self.workspace
    }

    pub fn language(&self) -> &str {
        &self.language
    }

    pub fn revision(&self) -> i64 {
        self.revision
    }

    pub fn revision_timestamp(&self) -> Option<i64> {
        self.revision_timestamp
    }

    pub fn hash(&self) -> Option<&str> {
        self.hash.as_deref()
    }

    pub fn position(&self) -> Option<i64> {
        self.position
    }

    pub fn set_position(&mut self, position: Option<i64>) {
        self.position = position;
    }

    pub fn parent_record_id(&self) -> Option<i64> {
        self.parent_record_id
    }

    pub fn set_parent_record_id(&mut self, parent: Option<i64>) {
        self.parent_record_id = parent;
    }

    pub fn level_within_sorted_tree(&self) -> Option<i64> {
        self.level_within_sorted_tree
    }

    pub fn set_level_within_sorted_tree(&mut self, level: Option<i64>) {
        self.level_within_sorted_tree = level;
    }

    pub fn creation_user_info(&self) -> Option<&UserInfo> {
        self.creation_user_info.as_ref()
    }

    pub fn last_change_user_info(&self) -> Option<&UserInfo> {
        self.last_change_user_info.as_ref()
    }

    /// Stamp the actor for the next save.
    pub fn set_last_change_user_info(&mut self, info: Option<UserInfo>) {
        self.last_change_user_info = info;
    }

    /// All properties of the record.
    pub fn properties(&self) -> &BTreeMap<String, String> {
        &self.properties
    }

    // --- persistence-layer surface ---------------------------------------
    //
    // Storage adapters materialize records from stored rows and stamp the
    // bookkeeping fields the record itself never computes. These setters
    // bypass schema validation and do not clear hash/revision timestamp.

    /// Replace the whole property map. Persistence-layer use.
    pub fn set_properties(&mut self, properties: BTreeMap<String, String>) {
        self.properties = properties;
    }

    /// Persistence-layer use.
    pub fn set_revision(&mut self, revision: i64) {
        self.revision = revision;
    }

    /// Persistence-layer use.
    pub fn set_revision_timestamp(&mut self, timestamp: Option<i64>) {
        self.revision_timestamp = timestamp;
    }

    /// Persistence-layer use.
    pub fn set_hash(&mut self, hash: Option<String>) {
        self.hash = hash;
    }

    /// Persistence-layer use.
    pub fn set_creation_user_info(&mut self, info: Option<UserInfo>) {
        self.creation_user_info = info;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::definition::ContentTypeDefinition;

    fn profiles() -> Arc<ContentTypeDefinition> {
        Arc::new(
            ContentTypeDefinition::builder("profiles")
                .property("claim")
                .property("tags")
                .property("stages")
                .property("status")
                .property("subtype")
                .clipping("teaser", ["name"].map(String::from))
                .status("1", "Draft")
                .subtype("agency", "Agency")
                .build(),
        )
    }

    #[test]
    fn test_set_get_round_trip() {
        let mut record = Record::new(profiles(), "Agency 5").unwrap();
        record.set_property("claim", "We build things").unwrap();
        assert_eq!(record.property("claim"), Some("We build things"));
        assert_eq!(record.property_or("missing", "fallback"), "fallback");
    }

    #[test]
    fn test_unknown_property_is_rejected() {
        let mut record = Record::new(profiles(), "Agency 5").unwrap();
        let err = record.set_property("bogus", "value").unwrap_err();
        assert!(matches!(err, CoreError::UnknownProperty(name) if name == "bogus"));
        // prior properties unchanged
        assert_eq!(record.name(), Some("Agency 5"));
        assert_eq!(record.properties().len(), 1);
    }

    #[test]
    fn test_property_names_are_normalized() {
        let mut record = Record::new(profiles(), "Agency 5").unwrap();
        record.set_property("Claim", "x").unwrap();
        assert_eq!(record.property("claim"), Some("x"));
    }

    #[test]
    fn test_clipping_restricts_properties() {
        let mut record = Record::new(profiles(), "Teaser").unwrap().with_clipping("teaser");
        assert!(record.set_property("claim", "x").is_err());
        assert!(record.set_property("name", "Renamed").is_ok());
    }

    #[test]
    fn test_mutation_clears_hash_and_revision_timestamp() {
        let mut record = Record::new(profiles(), "Agency 5").unwrap();
        record.set_hash(Some("abc".to_string()));
        record.set_revision_timestamp(Some(1_700_000_000_000_000));

        record.set_property("claim", "changed").unwrap();

        assert!(record.hash().is_none());
        assert!(record.revision_timestamp().is_none());
    }

    #[test]
    fn test_failed_mutation_keeps_hash() {
        let mut record = Record::new(profiles(), "Agency 5").unwrap();
        record.set_hash(Some("abc".to_string()));

        assert!(record.set_property("bogus", "x").is_err());
        assert_eq!(record.hash(), Some("abc"));
    }

    #[test]
    fn test_array_property() {
        let mut record = Record::new(profiles(), "Agency 5").unwrap();
        record.set_property("tags", "a,b,c").unwrap();
        assert_eq!(record.array_property("tags"), vec!["a", "b", "c"]);

        record.set_property("tags", "").unwrap();
        assert!(record.array_property("tags").is_empty());
        assert!(record.array_property("missing").is_empty());
    }

    #[test]
    fn test_sequence_property() {
        let mut record = Record::new(profiles(), "Agency 5").unwrap();
        record
            .set_property("stages", r#"[{"title":"Kickoff"},{"title":"Launch"}]"#)
            .unwrap();

        let sequence = record.sequence("stages");
        assert_eq!(sequence.len(), 2);
        assert_eq!(sequence.item(1).unwrap().property("title"), Some("Launch"));

        record.set_property("stages", "not json").unwrap();
        assert!(record.sequence("stages").is_empty());
    }

    #[test]
    fn test_status_and_subtype_labels() {
        let mut record = Record::new(profiles(), "Agency 5").unwrap();
        assert!(record.status_label().is_none());

        record.set_property("status", "1").unwrap();
        assert_eq!(record.status_label(), Some("Draft"));

        record.set_property("status", "99").unwrap();
        assert!(record.status_label().is_none());

        record.set_property("subtype", "agency").unwrap();
        assert_eq!(record.subtype_label(), Some("Agency"));
    }

    #[test]
    fn test_new_record_is_unpersisted() {
        let record = Record::new(profiles(), "Agency 5").unwrap();
        assert!(record.id().is_none());
        assert_eq!(record.revision(), 1);
    }

    #[test]
    fn test_dimension_builders() {
        let record = Record::new(profiles(), "Agency 5")
            .unwrap()
            .with_workspace("draft")
            .with_language("de");
        assert_eq!(record.workspace(), "draft");
        assert_eq!(record.language(), "de");
    }
}
