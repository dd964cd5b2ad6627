//! Unit tests for repository error types

use strata_repository::RepositoryError;

#[test]
fn test_record_not_found_display() {
    let error = RepositoryError::RecordNotFound {
        content_type: "profiles".to_string(),
        id: 42,
    };
    assert!(error.to_string().contains("Record not found"));
    assert!(error.to_string().contains("profiles/42"));
}

#[test]
fn test_content_type_not_found_display() {
    let error = RepositoryError::ContentTypeNotFound("profiles".to_string());
    assert!(error.to_string().contains("Content type not found"));
    assert!(error.to_string().contains("profiles"));
}

#[test]
fn test_schema_missing_display() {
    let error = RepositoryError::SchemaMissing {
        kind: "content".to_string(),
        name: "profiles".to_string(),
    };
    assert!(error.to_string().contains("No definition registered"));
    assert!(error.to_string().contains("content"));
    assert!(error.to_string().contains("profiles"));
}

#[test]
fn test_storage_unavailable_display() {
    let error = RepositoryError::StorageUnavailable("connection refused".to_string());
    assert!(error.to_string().contains("Storage unavailable"));
    assert!(error.to_string().contains("connection refused"));
}

#[test]
fn test_io_error_conversion() {
    let io_error = std::io::Error::new(std::io::ErrorKind::NotFound, "file missing");
    let error: RepositoryError = io_error.into();
    assert!(error.to_string().contains("I/O error"));
    assert!(error.to_string().contains("file missing"));
}

#[test]
fn test_serialization_error_conversion() {
    let json_error = serde_json::from_str::<serde_json::Value>("{broken").unwrap_err();
    let error: RepositoryError = json_error.into();
    assert!(error.to_string().contains("Serialization error"));
}

#[test]
fn test_record_error_conversion() {
    let core_error = strata_core::CoreError::UnknownProperty("bogus".to_string());
    let error: RepositoryError = core_error.into();
    assert!(error.to_string().contains("Record error"));
    assert!(error.to_string().contains("bogus"));
}

#[test]
fn test_invalid_path_display() {
    let error = RepositoryError::InvalidPath {
        path: std::path::PathBuf::from("/no/such/archive"),
    };
    assert!(error.to_string().contains("Invalid path"));
    assert!(error.to_string().contains("/no/such/archive"));
}

#[test]
fn test_error_debug_format() {
    let error = RepositoryError::Cache("poisoned".to_string());
    let debug_str = format!("{:?}", error);
    assert!(debug_str.contains("Cache"));
}
