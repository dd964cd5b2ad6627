//! Integration tests for FileSystemStorage
//!
//! Runs the shared adapter semantics against a temporary directory archive
//! and checks that state survives reopening the archive.

use std::sync::Arc;

use strata_core::{ContentTypeDefinition, DataDimensions, Record};
use strata_repository::{FileSystemStorage, RepositoryError, StorageAdapter};
use tempfile::TempDir;

fn profiles_definition() -> Arc<ContentTypeDefinition> {
    Arc::new(
        ContentTypeDefinition::builder("profiles")
            .property("claim")
            .property("ranking")
            .protected_property("ranking")
            .build(),
    )
}

async fn archive() -> (TempDir, FileSystemStorage, Arc<ContentTypeDefinition>) {
    let dir = TempDir::new().unwrap();
    let storage = FileSystemStorage::new("tests", dir.path()).await.unwrap();
    let definition = profiles_definition();
    storage.register_content_type(&definition).await.unwrap();
    (dir, storage, definition)
}

fn record(definition: &Arc<ContentTypeDefinition>, name: &str) -> Record {
    Record::new(Arc::clone(definition), name).unwrap()
}

#[tokio::test]
async fn test_missing_root_is_invalid_path() {
    let result = FileSystemStorage::new("tests", "/definitely/not/here").await;
    assert!(matches!(result, Err(RepositoryError::InvalidPath { .. })));
}

#[tokio::test]
async fn test_ids_and_revisions_issue_like_every_backend() {
    let (_dir, storage, definition) = archive().await;

    let id = storage
        .save_record("profiles", &record(&definition, "Agency 1"))
        .await
        .unwrap();
    assert_eq!(id, 1);

    let mut update = record(&definition, "Agency 1a");
    update.set_id(id);
    storage.save_record("profiles", &update).await.unwrap();

    let stored = storage
        .get_record("profiles", id, &DataDimensions::new())
        .await
        .unwrap();
    assert_eq!(stored.revision(), 2);
    assert_eq!(stored.name(), Some("Agency 1a"));
}

#[tokio::test]
async fn test_state_survives_reopening_the_archive() {
    let dir = TempDir::new().unwrap();
    let definition = profiles_definition();

    {
        let storage = FileSystemStorage::new("tests", dir.path()).await.unwrap();
        storage.register_content_type(&definition).await.unwrap();

        let mut record = record(&definition, "persisted");
        record.set_property("claim", "A").unwrap();
        let id = storage.save_record("profiles", &record).await.unwrap();
        assert_eq!(id, 1);
    }

    // Fresh adapter over the same directory sees everything
    let reopened = FileSystemStorage::new("tests", dir.path()).await.unwrap();

    let stored = reopened
        .get_record("profiles", 1, &DataDimensions::new())
        .await
        .unwrap();
    assert_eq!(stored.property("claim"), Some("A"));
    assert_eq!(stored.revision(), 1);

    // The counter is persisted too: the next insert continues at 2
    let next = reopened
        .save_record("profiles", &Record::new(profiles_definition(), "next").unwrap())
        .await
        .unwrap();
    assert_eq!(next, 2);

    assert_eq!(reopened.list_content_types().await.unwrap(), vec!["profiles"]);
}

#[tokio::test]
async fn test_revision_continues_after_delete_and_recreate() {
    let (_dir, storage, definition) = archive().await;

    let mut first = record(&definition, "test");
    first.set_property("claim", "A").unwrap();
    let id = storage.save_record("profiles", &first).await.unwrap();

    storage
        .delete_record("profiles", id, &DataDimensions::new())
        .await
        .unwrap();

    let mut recreated = record(&definition, "test");
    recreated.set_id(id);
    recreated.set_property("claim", "A").unwrap();
    storage.save_record("profiles", &recreated).await.unwrap();

    let stored = storage
        .get_record("profiles", id, &DataDimensions::new())
        .await
        .unwrap();
    assert_eq!(stored.revision(), 3);
}

#[tokio::test]
async fn test_protected_and_omitted_properties() {
    let (_dir, storage, definition) = archive().await;

    let mut record1 = record(&definition, "test");
    record1.set_property("claim", "A").unwrap();
    record1.set_property("ranking", "7").unwrap();
    let id = storage.save_record("profiles", &record1).await.unwrap();

    let stored = storage
        .get_record("profiles", id, &DataDimensions::new())
        .await
        .unwrap();
    assert_eq!(stored.property("ranking"), Some(""));
    assert_eq!(stored.property("claim"), Some("A"));

    let mut partial = record(&definition, "test");
    partial.set_id(id);
    storage.save_record("profiles", &partial).await.unwrap();

    let stored = storage
        .get_record("profiles", id, &DataDimensions::new())
        .await
        .unwrap();
    assert_eq!(stored.property("claim"), Some("A"));
}

#[tokio::test]
async fn test_delete_all_records_purges_dimension() {
    let (_dir, storage, definition) = archive().await;

    for i in 1..=3 {
        storage
            .save_record("profiles", &record(&definition, &format!("Test {i}")))
            .await
            .unwrap();
    }

    let deleted = storage
        .delete_all_records("profiles", &DataDimensions::new())
        .await
        .unwrap();
    assert_eq!(deleted.len(), 3);
    assert_eq!(
        storage
            .count_records("profiles", &DataDimensions::new())
            .await
            .unwrap(),
        0
    );
}

#[tokio::test]
async fn test_watermark_is_persisted() {
    let dir = TempDir::new().unwrap();
    let definition = profiles_definition();

    let before;
    {
        let storage = FileSystemStorage::new("tests", dir.path()).await.unwrap();
        storage.register_content_type(&definition).await.unwrap();
        storage
            .save_record("profiles", &record(&definition, "w"))
            .await
            .unwrap();
        before = storage
            .last_modified("profiles", &DataDimensions::new())
            .await
            .unwrap();
        assert!(before > 0);
    }

    let reopened = FileSystemStorage::new("tests", dir.path()).await.unwrap();
    let after = reopened
        .last_modified("profiles", &DataDimensions::new())
        .await
        .unwrap();
    assert_eq!(before, after);
}
