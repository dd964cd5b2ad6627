//! Shared stored-row model and save pipeline
//!
//! Every backend persists the same logical row: one [`StoredRevision`] per
//! save or delete, addressable by (id, workspace, language, revision). The
//! helpers here implement the save semantics all writable backends share —
//! head resolution (including time-travel reads), omitted-property merging,
//! protected-property blanking, content fingerprints and tombstones — so the
//! backends only differ in how rows are kept.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;

use strata_core::{ContentTypeDefinition, DataDimensions, Record, UserInfo};

use crate::error::RepositoryResult;
use crate::models::RecordQuery;

/// One persisted revision of a record (or config), including tombstones.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub(crate) struct StoredRevision {
    /// Record id; 0 for singleton config rows
    pub id: i64,
    pub workspace: String,
    pub language: String,
    pub revision: i64,
    /// Microseconds since the epoch
    pub revision_timestamp: i64,
    /// Tombstone flag: a deletion revision
    #[serde(default)]
    pub deleted: bool,
    pub properties: BTreeMap<String, String>,
    /// Fingerprint of the property map
    pub hash: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub position: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent_record_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub level_within_sorted_tree: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub creation_user_info: Option<UserInfo>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_change_user_info: Option<UserInfo>,
}

/// Current time in microseconds since the epoch.
pub(crate) fn now_micros() -> i64 {
    Utc::now().timestamp_micros()
}

/// Next watermark value: strictly increasing even when the clock stalls.
pub(crate) fn next_watermark(previous: i64, now: i64) -> i64 {
    now.max(previous + 1)
}

/// Flat key for the last-change index: (kind, name, workspace, language).
pub(crate) fn watermark_key(kind: &str, name: &str, workspace: &str, language: &str) -> String {
    format!("{kind}:{name}:{workspace}:{language}")
}

/// Fingerprint of a property map (md5 over its JSON form; BTreeMap keeps the
/// key order deterministic).
pub(crate) fn fingerprint(properties: &BTreeMap<String, String>) -> String {
    let json = serde_json::to_string(properties).unwrap_or_default();
    format!("{:x}", md5::compute(json.as_bytes()))
}

/// The revision at or before the dimension's timeshift (or the latest one),
/// tombstones included. Callers decide how to treat a tombstone head.
pub(crate) fn head_of<'a>(
    rows: &'a [StoredRevision],
    id: i64,
    dimensions: &DataDimensions,
) -> Option<&'a StoredRevision> {
    rows.iter()
        .filter(|row| {
            row.id == id
                && row.workspace == dimensions.workspace()
                && row.language == dimensions.language()
        })
        .filter(|row| {
            dimensions
                .timeshift()
                .map_or(true, |t| row.revision_timestamp <= t)
        })
        .max_by_key(|row| row.revision)
}

/// The live (non-tombstone) head, when one exists.
pub(crate) fn live_head_of<'a>(
    rows: &'a [StoredRevision],
    id: i64,
    dimensions: &DataDimensions,
) -> Option<&'a StoredRevision> {
    head_of(rows, id, dimensions).filter(|row| !row.deleted)
}

/// Highest revision ever stored for (id, workspace, language), tombstones
/// included and ignoring any timeshift; 0 when the id was never seen.
pub(crate) fn revision_ceiling(
    rows: &[StoredRevision],
    id: i64,
    workspace: &str,
    language: &str,
) -> i64 {
    rows.iter()
        .filter(|row| row.id == id && row.workspace == workspace && row.language == language)
        .map(|row| row.revision)
        .max()
        .unwrap_or(0)
}

/// Highest revision timestamp stored for (id, workspace, language); 0 when
/// the id was never seen. Revision timestamps must be strictly increasing
/// per id so time-shifted reads resolve unambiguously.
pub(crate) fn timestamp_ceiling(
    rows: &[StoredRevision],
    id: i64,
    workspace: &str,
    language: &str,
) -> i64 {
    rows.iter()
        .filter(|row| row.id == id && row.workspace == workspace && row.language == language)
        .map(|row| row.revision_timestamp)
        .max()
        .unwrap_or(0)
}

/// Distinct ids with a live head in the given dimensions, ascending.
pub(crate) fn live_ids(rows: &[StoredRevision], dimensions: &DataDimensions) -> Vec<i64> {
    let mut ids: Vec<i64> = rows
        .iter()
        .filter(|row| {
            row.workspace == dimensions.workspace() && row.language == dimensions.language()
        })
        .map(|row| row.id)
        .collect();
    ids.sort_unstable();
    ids.dedup();
    ids.retain(|&id| live_head_of(rows, id, dimensions).is_some());
    ids
}

/// Build the next revision row for a save.
///
/// `previous_head` is the latest live revision of the same (id, workspace,
/// language), used as merge source: properties and tree metadata the caller
/// omitted carry over. A tombstone head must be passed as `None` so a
/// recreate starts from exactly the caller-supplied properties. Protected
/// properties are always blanked.
pub(crate) fn build_revision(
    definition: &ContentTypeDefinition,
    record: &Record,
    id: i64,
    previous_head: Option<&StoredRevision>,
    next_revision: i64,
    now: i64,
) -> StoredRevision {
    let mut properties = previous_head
        .map(|head| head.properties.clone())
        .unwrap_or_default();
    for (name, value) in record.properties() {
        properties.insert(name.clone(), value.clone());
    }
    for protected in definition.protected_properties() {
        properties.insert(protected.clone(), String::new());
    }

    let hash = fingerprint(&properties);
    let creation_user_info = previous_head
        .and_then(|head| head.creation_user_info.clone())
        .or_else(|| record.last_change_user_info().cloned());

    StoredRevision {
        id,
        workspace: record.workspace().to_string(),
        language: record.language().to_string(),
        revision: next_revision,
        revision_timestamp: now,
        deleted: false,
        properties,
        hash,
        position: record
            .position()
            .or_else(|| previous_head.and_then(|head| head.position)),
        parent_record_id: record
            .parent_record_id()
            .or_else(|| previous_head.and_then(|head| head.parent_record_id)),
        level_within_sorted_tree: record
            .level_within_sorted_tree()
            .or_else(|| previous_head.and_then(|head| head.level_within_sorted_tree)),
        creation_user_info,
        last_change_user_info: record.last_change_user_info().cloned(),
    }
}

/// Build a tombstone revision for a delete.
pub(crate) fn build_tombstone(
    id: i64,
    workspace: &str,
    language: &str,
    next_revision: i64,
    now: i64,
) -> StoredRevision {
    let properties = BTreeMap::new();
    let hash = fingerprint(&properties);
    StoredRevision {
        id,
        workspace: workspace.to_string(),
        language: language.to_string(),
        revision: next_revision,
        revision_timestamp: now,
        deleted: true,
        properties,
        hash,
        position: None,
        parent_record_id: None,
        level_within_sorted_tree: None,
        creation_user_info: None,
        last_change_user_info: None,
    }
}

/// Materialize a [`Record`] from a stored row.
pub(crate) fn materialize(
    definition: &Arc<ContentTypeDefinition>,
    row: &StoredRevision,
) -> RepositoryResult<Record> {
    let mut record = Record::new(Arc::clone(definition), "")?
        .with_workspace(row.workspace.clone())
        .with_language(row.language.clone());

    record.set_properties(row.properties.clone());
    if row.id != 0 {
        record.set_id(row.id);
    }
    record.set_revision(row.revision);
    record.set_revision_timestamp(Some(row.revision_timestamp));
    record.set_hash(Some(row.hash.clone()));
    record.set_position(row.position);
    record.set_parent_record_id(row.parent_record_id);
    record.set_level_within_sorted_tree(row.level_within_sorted_tree);
    record.set_creation_user_info(row.creation_user_info.clone());
    record.set_last_change_user_info(row.last_change_user_info.clone());
    Ok(record)
}

/// Apply filter, ordering and paging to materialized records.
///
/// Input must already be in ascending id order; that order is the fallback
/// when no `order_by` property is given.
pub(crate) fn apply_query(mut records: Vec<Record>, query: &RecordQuery) -> Vec<Record> {
    if let Some((property, value)) = &query.filter {
        records.retain(|record| record.property(property) == Some(value.as_str()));
    }

    if let Some(property) = &query.order_by {
        records.sort_by(|a, b| {
            a.property_or(property, "")
                .cmp(b.property_or(property, ""))
        });
    }
    if query.descending {
        records.reverse();
    }

    if let (Some(page), Some(page_size)) = (query.page, query.page_size) {
        let start = page.saturating_sub(1) * page_size;
        records = records.into_iter().skip(start).take(page_size).collect();
    }

    records
}

#[cfg(test)]
mod tests {
    use super::*;

    fn profiles() -> Arc<ContentTypeDefinition> {
        Arc::new(
            ContentTypeDefinition::builder("profiles")
                .property("claim")
                .property("ranking")
                .protected_property("ranking")
                .build(),
        )
    }

    fn record_with(claim: Option<&str>) -> Record {
        let mut record = Record::new(profiles(), "test").unwrap();
        if let Some(claim) = claim {
            record.set_property("claim", claim).unwrap();
        }
        record
    }

    #[test]
    fn test_build_revision_merges_omitted_properties() {
        let definition = profiles();
        let first = build_revision(&definition, &record_with(Some("A")), 1, None, 1, 10);
        assert_eq!(first.properties.get("claim").map(String::as_str), Some("A"));

        // partial re-save without the claim property
        let second = build_revision(&definition, &record_with(None), 1, Some(&first), 2, 20);
        assert_eq!(second.revision, 2);
        assert_eq!(second.properties.get("claim").map(String::as_str), Some("A"));
    }

    #[test]
    fn test_build_revision_blanks_protected_properties() {
        let definition = profiles();
        let mut record = record_with(None);
        record.set_property("ranking", "1").unwrap();

        let row = build_revision(&definition, &record, 1, None, 1, 10);
        assert_eq!(row.properties.get("ranking").map(String::as_str), Some(""));
    }

    #[test]
    fn test_head_resolution_with_timeshift() {
        let definition = profiles();
        let v1 = build_revision(&definition, &record_with(Some("A")), 1, None, 1, 10);
        let v2 = build_revision(&definition, &record_with(Some("B")), 1, Some(&v1), 2, 20);
        let rows = vec![v1, v2];

        let latest = DataDimensions::new();
        assert_eq!(head_of(&rows, 1, &latest).unwrap().revision, 2);

        let historical = DataDimensions::new().with_timeshift(15);
        assert_eq!(head_of(&rows, 1, &historical).unwrap().revision, 1);

        let before_creation = DataDimensions::new().with_timeshift(5);
        assert!(head_of(&rows, 1, &before_creation).is_none());
    }

    #[test]
    fn test_revision_ceiling_counts_tombstones() {
        let definition = profiles();
        let v1 = build_revision(&definition, &record_with(Some("A")), 1, None, 1, 10);
        let tombstone = build_tombstone(1, "default", "default", 2, 20);
        let rows = vec![v1, tombstone];

        assert_eq!(revision_ceiling(&rows, 1, "default", "default"), 2);
        assert!(live_head_of(&rows, 1, &DataDimensions::new()).is_none());
    }

    #[test]
    fn test_fingerprint_is_order_independent() {
        let mut a = BTreeMap::new();
        a.insert("x".to_string(), "1".to_string());
        a.insert("y".to_string(), "2".to_string());

        let mut b = BTreeMap::new();
        b.insert("y".to_string(), "2".to_string());
        b.insert("x".to_string(), "1".to_string());

        assert_eq!(fingerprint(&a), fingerprint(&b));
    }

    #[test]
    fn test_next_watermark_is_strictly_increasing() {
        assert_eq!(next_watermark(10, 100), 100);
        assert_eq!(next_watermark(100, 100), 101);
        assert_eq!(next_watermark(100, 50), 101);
    }

    #[test]
    fn test_apply_query_filter_order_page() {
        let definition = profiles();
        let mut records = Vec::new();
        for (i, claim) in ["beta", "alpha", "beta", "gamma"].iter().enumerate() {
            let mut record = Record::new(definition.clone(), &format!("r{i}")).unwrap();
            record.set_property("claim", *claim).unwrap();
            record.set_id(i as i64 + 1);
            records.push(record);
        }

        let filtered = apply_query(
            records.clone(),
            &RecordQuery::all().filter("claim", "beta"),
        );
        assert_eq!(filtered.len(), 2);

        let ordered = apply_query(records.clone(), &RecordQuery::all().order_by("claim"));
        assert_eq!(ordered[0].property("claim"), Some("alpha"));

        let paged = apply_query(records, &RecordQuery::all().page(2, 3));
        assert_eq!(paged.len(), 1);
        assert_eq!(paged[0].id(), Some(4));
    }
}
