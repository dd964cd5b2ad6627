//! Sequences: repeatable property groups
//!
//! A sequence is a read-only, ordered list view decoded from a JSON-encoded
//! property value. Decoding is forgiving: anything that is not a JSON array
//! of objects yields an empty sequence, never an error. Scalar item values
//! are coerced to strings.

use serde_json::Value;
use std::collections::BTreeMap;

/// One item of a sequence: a named sub-record's property map.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SequenceItem {
    properties: BTreeMap<String, String>,
}

impl SequenceItem {
    /// Value of a property, when present.
    pub fn property(&self, name: &str) -> Option<&str> {
        self.properties.get(name).map(String::as_str)
    }

    /// All properties of this item.
    pub fn properties(&self) -> &BTreeMap<String, String> {
        &self.properties
    }
}

/// Read-only ordered list of sub-records decoded from a JSON array.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Sequence {
    items: Vec<SequenceItem>,
}

impl Sequence {
    /// Decode a sequence from a JSON-encoded property value.
    ///
    /// Returns an empty sequence when the value is absent, not valid JSON,
    /// or not an array. Array elements that are not objects are skipped.
    pub fn from_json(value: Option<&str>) -> Self {
        let Some(raw) = value else {
            return Self::default();
        };

        let Ok(Value::Array(elements)) = serde_json::from_str::<Value>(raw) else {
            return Self::default();
        };

        let items = elements
            .into_iter()
            .filter_map(|element| match element {
                Value::Object(map) => {
                    let properties = map
                        .into_iter()
                        .map(|(key, value)| (key, scalar_to_string(value)))
                        .collect();
                    Some(SequenceItem { properties })
                }
                _ => None,
            })
            .collect();

        Self { items }
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Item at `index`, when in bounds.
    pub fn item(&self, index: usize) -> Option<&SequenceItem> {
        self.items.get(index)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, SequenceItem> {
        self.items.iter()
    }
}

impl<'a> IntoIterator for &'a Sequence {
    type Item = &'a SequenceItem;
    type IntoIter = std::slice::Iter<'a, SequenceItem>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}

fn scalar_to_string(value: Value) -> String {
    match value {
        Value::String(s) => s,
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decodes_array_of_objects() {
        let sequence =
            Sequence::from_json(Some(r#"[{"headline":"One"},{"headline":"Two","weight":3}]"#));

        assert_eq!(sequence.len(), 2);
        assert_eq!(sequence.item(0).unwrap().property("headline"), Some("One"));
        assert_eq!(sequence.item(1).unwrap().property("weight"), Some("3"));
    }

    #[test]
    fn test_absent_value_yields_empty() {
        assert!(Sequence::from_json(None).is_empty());
    }

    #[test]
    fn test_malformed_json_yields_empty() {
        assert!(Sequence::from_json(Some("{not json")).is_empty());
        assert!(Sequence::from_json(Some(r#"{"an":"object"}"#)).is_empty());
        assert!(Sequence::from_json(Some("42")).is_empty());
    }

    #[test]
    fn test_non_object_elements_are_skipped() {
        let sequence = Sequence::from_json(Some(r#"[1, "two", {"a":"b"}]"#));
        assert_eq!(sequence.len(), 1);
        assert_eq!(sequence.item(0).unwrap().property("a"), Some("b"));
    }

    #[test]
    fn test_iteration() {
        let sequence = Sequence::from_json(Some(r#"[{"n":"1"},{"n":"2"}]"#));
        let names: Vec<_> = sequence
            .iter()
            .filter_map(|item| item.property("n"))
            .collect();
        assert_eq!(names, vec!["1", "2"]);
    }
}
