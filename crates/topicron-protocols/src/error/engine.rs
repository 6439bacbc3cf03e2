//! Backend job engine errors.

use thiserror::Error;

#[derive(Debug, Clone, Error)]
pub enum EngineError {
    #[error("Job already exists: {0}")]
    JobExists(String),

    #[error("Job not found: {0}")]
    JobNotFound(String),

    #[error("Invalid trigger: {0}")]
    InvalidTrigger(String),

    #[error("Engine storage error: {0}")]
    Storage(String),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_job_exists_error() {
        let err = EngineError::JobExists("schedule-1".to_string());
        let display = err.to_string();
        assert!(display.contains("already exists"));
        assert!(display.contains("schedule-1"));
    }

    #[test]
    fn test_invalid_trigger_error() {
        let err = EngineError::InvalidTrigger("no future fire time".to_string());
        assert!(err.to_string().contains("no future fire time"));
    }

    #[test]
    fn test_storage_error() {
        let err = EngineError::Storage("database is locked".to_string());
        assert!(err.to_string().contains("storage"));
        assert!(err.to_string().contains("locked"));
    }
}
