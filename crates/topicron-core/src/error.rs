//! Registry errors.

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    #[error("Already registered: {0}")]
    AlreadyRegistered(String),

    #[error("Not registered: {0}")]
    NotFound(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_registry_error_display() {
        let err = RegistryError::AlreadyRegistered("audit".to_string());
        assert_eq!(err.to_string(), "Already registered: audit");

        let err = RegistryError::NotFound("audit".to_string());
        assert_eq!(err.to_string(), "Not registered: audit");
    }
}
