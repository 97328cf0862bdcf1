//! Error types for the practice engine.

use crate::{EntityName, RecordId};
use thiserror::Error;

/// All possible errors from the practice engine.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum Error {
    // Validation errors
    #[error("unknown entity type: {0}")]
    UnknownEntity(EntityName),

    #[error("unknown field '{field}' for {entity}")]
    UnknownField { entity: EntityName, field: String },

    #[error("{0} is required")]
    MissingRequiredField(String),

    #[error("type mismatch for field '{field}': expected {expected}, got {got}")]
    TypeMismatch {
        field: String,
        expected: String,
        got: String,
    },

    #[error("invalid value for '{field}': {reason}")]
    InvalidInput { field: String, reason: String },

    // Record errors
    #[error("invalid record: {0}")]
    InvalidRecord(String),

    #[error("record not found: {0}")]
    RecordNotFound(RecordId),

    // Storage errors
    #[error("storage error: {0}")]
    Storage(String),

    #[error("invalid data under storage key '{key}': {reason}")]
    InvalidStorage { key: String, reason: String },
}

impl Error {
    /// Whether this error was raised by input validation, before any
    /// request could be issued.
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            Error::UnknownField { .. }
                | Error::MissingRequiredField(_)
                | Error::TypeMismatch { .. }
                | Error::InvalidInput { .. }
        )
    }
}

/// Result type for engine operations.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display() {
        let err = Error::UnknownEntity("clinics".into());
        assert_eq!(err.to_string(), "unknown entity type: clinics");

        let err = Error::MissingRequiredField("name".into());
        assert_eq!(err.to_string(), "name is required");

        let err = Error::TypeMismatch {
            field: "locationId".into(),
            expected: "Int".into(),
            got: "String".into(),
        };
        assert_eq!(
            err.to_string(),
            "type mismatch for field 'locationId': expected Int, got String"
        );

        let err = Error::InvalidStorage {
            key: "locations".into(),
            reason: "expected array".into(),
        };
        assert_eq!(
            err.to_string(),
            "invalid data under storage key 'locations': expected array"
        );
    }

    #[test]
    fn validation_classification() {
        assert!(Error::MissingRequiredField("name".into()).is_validation());
        assert!(Error::InvalidInput {
            field: "active".into(),
            reason: "not a boolean".into()
        }
        .is_validation());
        assert!(!Error::RecordNotFound(3).is_validation());
        assert!(!Error::Storage("disk full".into()).is_validation());
    }
}
