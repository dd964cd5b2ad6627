//! Content-type definitions
//!
//! A [`ContentTypeDefinition`] declares which properties are valid for a class
//! of records, grouped into named clippings (views). It also carries the
//! status and subtype label maps and the set of protected (non-writable)
//! properties. Definitions are value objects: they are built once (usually by
//! an external schema-language parser, or programmatically through the
//! builder) and shared between records via `Arc`.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

use crate::ident::normalize_identifier;

/// Name of the clipping every content type has.
pub const DEFAULT_CLIPPING: &str = "default";

/// A named subset of a content type's properties.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClippingDefinition {
    /// Clipping name
    pub name: String,
    /// Declared property names (normalized identifiers)
    pub properties: BTreeSet<String>,
}

impl ClippingDefinition {
    /// Create a clipping with the given declared property names.
    pub fn new(name: impl Into<String>, properties: impl IntoIterator<Item = String>) -> Self {
        Self {
            name: name.into(),
            properties: properties
                .into_iter()
                .map(|p| normalize_identifier(&p))
                .collect(),
        }
    }

    /// Check whether the clipping declares the given (normalized) property.
    pub fn has_property(&self, property: &str) -> bool {
        self.properties.contains(property)
    }
}

/// Schema for a class of records.
///
/// Serializable so storage adapters can persist definitions in their schema
/// registry alongside the records they describe.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentTypeDefinition {
    /// Content type name
    name: String,
    /// Optional human-readable title
    #[serde(skip_serializing_if = "Option::is_none")]
    title: Option<String>,
    /// Clippings by name; always contains the `default` clipping
    clippings: BTreeMap<String, ClippingDefinition>,
    /// Properties that are never writable through a save
    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    protected_properties: BTreeSet<String>,
    /// Status value -> label
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    status_list: BTreeMap<String, String>,
    /// Subtype value -> label
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    subtypes: BTreeMap<String, String>,
}

impl ContentTypeDefinition {
    /// Start building a definition for the given content type name.
    ///
    /// The `name` property is declared implicitly on the default clipping;
    /// every record carries one.
    ///
    /// # Example
    /// ```
    /// use strata_core::ContentTypeDefinition;
    ///
    /// let profiles = ContentTypeDefinition::builder("profiles")
    ///     .property("claim")
    ///     .property("ranking")
    ///     .protected_property("ranking")
    ///     .status("1", "Draft")
    ///     .status("2", "Published")
    ///     .build();
    ///
    /// assert!(profiles.has_property("claim", "default"));
    /// assert!(!profiles.has_property("nonsense", "default"));
    /// ```
    pub fn builder(name: impl Into<String>) -> ContentTypeDefinitionBuilder {
        ContentTypeDefinitionBuilder::new(name)
    }

    /// Content type name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Human-readable title, when declared.
    pub fn title(&self) -> Option<&str> {
        self.title.as_deref()
    }

    /// Check whether `property` (a normalized identifier) is declared for the
    /// given clipping. Unknown clippings declare nothing.
    pub fn has_property(&self, property: &str, clipping: &str) -> bool {
        self.clippings
            .get(clipping)
            .is_some_and(|c| c.has_property(property))
    }

    /// The clipping with the given name.
    pub fn clipping(&self, name: &str) -> Option<&ClippingDefinition> {
        self.clippings.get(name)
    }

    /// Names of all declared clippings.
    pub fn clipping_names(&self) -> impl Iterator<Item = &str> {
        self.clippings.keys().map(String::as_str)
    }

    /// Properties that are ignored on save and read back as empty.
    pub fn protected_properties(&self) -> &BTreeSet<String> {
        &self.protected_properties
    }

    /// Whether the given property is protected (non-writable).
    pub fn is_protected(&self, property: &str) -> bool {
        self.protected_properties.contains(property)
    }

    /// Status value -> label map.
    pub fn status_list(&self) -> &BTreeMap<String, String> {
        &self.status_list
    }

    /// Subtype value -> label map.
    pub fn subtypes(&self) -> &BTreeMap<String, String> {
        &self.subtypes
    }
}

/// Builder for [`ContentTypeDefinition`].
#[derive(Debug, Clone)]
pub struct ContentTypeDefinitionBuilder {
    name: String,
    title: Option<String>,
    default_properties: Vec<String>,
    clippings: Vec<ClippingDefinition>,
    protected_properties: BTreeSet<String>,
    status_list: BTreeMap<String, String>,
    subtypes: BTreeMap<String, String>,
}

impl ContentTypeDefinitionBuilder {
    fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            title: None,
            default_properties: vec!["name".to_string()],
            clippings: Vec::new(),
            protected_properties: BTreeSet::new(),
            status_list: BTreeMap::new(),
            subtypes: BTreeMap::new(),
        }
    }

    /// Set a human-readable title.
    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    /// Declare a property on the default clipping.
    pub fn property(mut self, name: impl Into<String>) -> Self {
        self.default_properties.push(name.into());
        self
    }

    /// Declare several properties on the default clipping.
    pub fn properties<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.default_properties
            .extend(names.into_iter().map(Into::into));
        self
    }

    /// Declare an additional clipping. Its property set is independent of the
    /// default clipping.
    pub fn clipping<I, S>(mut self, name: impl Into<String>, properties: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.clippings.push(ClippingDefinition::new(
            name,
            properties.into_iter().map(Into::into),
        ));
        self
    }

    /// Mark a property as protected (ignored on save, read back empty).
    pub fn protected_property(mut self, name: impl Into<String>) -> Self {
        self.protected_properties
            .insert(normalize_identifier(&name.into()));
        self
    }

    /// Register a status value with its label.
    pub fn status(mut self, value: impl Into<String>, label: impl Into<String>) -> Self {
        self.status_list.insert(value.into(), label.into());
        self
    }

    /// Register a subtype value with its label.
    pub fn subtype(mut self, value: impl Into<String>, label: impl Into<String>) -> Self {
        self.subtypes.insert(value.into(), label.into());
        self
    }

    /// Finish building the definition.
    pub fn build(self) -> ContentTypeDefinition {
        let mut clippings = BTreeMap::new();
        clippings.insert(
            DEFAULT_CLIPPING.to_string(),
            ClippingDefinition::new(DEFAULT_CLIPPING, self.default_properties),
        );
        for clipping in self.clippings {
            clippings.insert(clipping.name.clone(), clipping);
        }

        ContentTypeDefinition {
            name: self.name,
            title: self.title,
            clippings,
            protected_properties: self.protected_properties,
            status_list: self.status_list,
            subtypes: self.subtypes,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn profiles() -> ContentTypeDefinition {
        ContentTypeDefinition::builder("profiles")
            .title("Profiles")
            .property("claim")
            .property("ranking")
            .protected_property("ranking")
            .clipping("teaser", ["name", "claim"].map(String::from))
            .status("1", "Draft")
            .subtype("agency", "Agency")
            .build()
    }

    #[test]
    fn test_default_clipping_always_present() {
        let definition = profiles();
        assert!(definition.clipping("default").is_some());
        assert!(definition.has_property("name", "default"));
    }

    #[test]
    fn test_property_declaration() {
        let definition = profiles();
        assert!(definition.has_property("claim", "default"));
        assert!(!definition.has_property("claim", "missing-clipping"));
        assert!(!definition.has_property("unknown", "default"));
    }

    #[test]
    fn test_clipping_scopes_properties() {
        let definition = profiles();
        assert!(definition.has_property("claim", "teaser"));
        assert!(!definition.has_property("ranking", "teaser"));
    }

    #[test]
    fn test_protected_properties() {
        let definition = profiles();
        assert!(definition.is_protected("ranking"));
        assert!(!definition.is_protected("claim"));
    }

    #[test]
    fn test_label_maps() {
        let definition = profiles();
        assert_eq!(definition.status_list().get("1").map(String::as_str), Some("Draft"));
        assert_eq!(definition.subtypes().get("agency").map(String::as_str), Some("Agency"));
    }

    #[test]
    fn test_serde_round_trip() {
        let definition = profiles();
        let json = serde_json::to_string(&definition).unwrap();
        let back: ContentTypeDefinition = serde_json::from_str(&json).unwrap();
        assert_eq!(definition, back);
    }
}
