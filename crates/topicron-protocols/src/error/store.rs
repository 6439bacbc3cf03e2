//! Persistence collaborator errors.

use thiserror::Error;

#[derive(Debug, Clone, Error)]
pub enum StoreError {
    #[error("Record not found: {0}")]
    NotFound(String),

    #[error("Record already exists: {0}")]
    AlreadyExists(String),

    #[error("Connection error: {0}")]
    Connection(String),

    #[error("Query error: {0}")]
    Query(String),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_error() {
        let err = StoreError::NotFound("schedule 42".to_string());
        let display = err.to_string();
        assert!(display.contains("not found"));
        assert!(display.contains("schedule 42"));
    }

    #[test]
    fn test_already_exists_error() {
        let err = StoreError::AlreadyExists("mapping-1".to_string());
        assert!(err.to_string().contains("already exists"));
    }

    #[test]
    fn test_all_error_variants_display() {
        let errors = vec![
            StoreError::NotFound("a".to_string()),
            StoreError::AlreadyExists("b".to_string()),
            StoreError::Connection("c".to_string()),
            StoreError::Query("d".to_string()),
            StoreError::Serialization("e".to_string()),
        ];

        for err in errors {
            assert!(!err.to_string().is_empty());
        }
    }
}
