//! Integration tests for DirectoryFileAccess

use strata_repository::{DirectoryFileAccess, FileAccess, RepositoryError};
use tempfile::TempDir;

async fn access_with_fixture() -> (TempDir, DirectoryFileAccess) {
    let dir = TempDir::new().unwrap();
    std::fs::create_dir_all(dir.path().join("images/logos")).unwrap();
    std::fs::write(dir.path().join("readme.txt"), b"hello").unwrap();
    std::fs::write(dir.path().join("images/logos/a.png"), b"\x89PNG").unwrap();
    let access = DirectoryFileAccess::new(dir.path()).unwrap();
    (dir, access)
}

#[tokio::test]
async fn test_missing_root_is_invalid_path() {
    let result = DirectoryFileAccess::new("/definitely/not/here");
    assert!(matches!(result, Err(RepositoryError::InvalidPath { .. })));
}

#[tokio::test]
async fn test_folder_listing() {
    let (_dir, access) = access_with_fixture().await;

    let root = access.folder("").await.unwrap().unwrap();
    assert_eq!(root.folders, vec!["images"]);
    assert_eq!(root.files, vec!["readme.txt"]);

    let logos = access.folder("images/logos").await.unwrap().unwrap();
    assert_eq!(logos.files, vec!["images/logos/a.png"]);

    assert!(access.folder("nope").await.unwrap().is_none());
}

#[tokio::test]
async fn test_file_metadata_and_binary() {
    let (_dir, access) = access_with_fixture().await;

    let info = access.file("readme.txt").await.unwrap().unwrap();
    assert_eq!(info.name, "readme.txt");
    assert_eq!(info.size, 5);
    assert!(info.last_modified > 0);

    let bytes = access.binary(&info).await.unwrap().unwrap();
    assert_eq!(bytes, b"hello");

    assert!(access.file("missing.txt").await.unwrap().is_none());
}

#[tokio::test]
async fn test_save_and_delete_file() {
    let (_dir, access) = access_with_fixture().await;

    assert!(access.save_file("new/deep/file.bin", b"\x00\x01").await.unwrap());
    let info = access.file("new/deep/file.bin").await.unwrap().unwrap();
    assert_eq!(info.size, 2);

    assert!(access.delete_file("new/deep/file.bin").await.unwrap());
    assert!(!access.delete_file("new/deep/file.bin").await.unwrap());
}

#[tokio::test]
async fn test_traversal_is_rejected() {
    let (_dir, access) = access_with_fixture().await;

    assert!(access.file("../outside.txt").await.unwrap().is_none());
    assert!(!access.save_file("../outside.txt", b"x").await.unwrap());
}
