//! SDK error types

use thiserror::Error;

/// SDK error type
#[derive(Error, Debug)]
pub enum SdkError {
    /// Configuration error
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// Record error from strata-core
    #[error("Record error: {0}")]
    RecordError(#[from] strata_core::CoreError),

    /// Storage error from strata-repository
    #[error("Storage error: {0}")]
    StorageError(#[from] strata_repository::RepositoryError),

    /// No content type selected on the repository
    #[error("No content type selected")]
    NoContentTypeSelected,

    /// Generic SDK error
    #[error("SDK error: {0}")]
    GenericError(String),
}

/// Result type for SDK operations
pub type Result<T> = std::result::Result<T, SdkError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_error() {
        let error = SdkError::ConfigError("Invalid configuration".to_string());
        assert!(error.to_string().contains("Configuration error"));
        assert!(error.to_string().contains("Invalid configuration"));
    }

    #[test]
    fn test_no_content_type_selected() {
        let error = SdkError::NoContentTypeSelected;
        assert_eq!(error.to_string(), "No content type selected");
    }

    #[test]
    fn test_record_error_conversion() {
        let core_error = strata_core::CoreError::UnknownProperty("bogus".to_string());
        let sdk_error: SdkError = core_error.into();
        assert!(sdk_error.to_string().contains("Unknown property"));
        assert!(sdk_error.to_string().contains("bogus"));
    }

    #[test]
    fn test_storage_error_conversion() {
        let storage_error = strata_repository::RepositoryError::ContentTypeNotFound(
            "profiles".to_string(),
        );
        let sdk_error: SdkError = storage_error.into();
        assert!(sdk_error.to_string().contains("Storage error"));
        assert!(sdk_error.to_string().contains("profiles"));
    }

    #[test]
    fn test_result_err() {
        let result: Result<i32> = Err(SdkError::NoContentTypeSelected);
        assert!(result.is_err());
    }
}
