//! Persistence layer error types

use thiserror::Error;

/// Persistence layer errors
#[derive(Debug, Error)]
pub enum PersistenceError {
    #[error("Storage backend error: {0}")]
    Backend(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("I/O error: {0}")]
    Io(String),

    #[error("Entity not found: {entity_type} with key {key}")]
    NotFound { entity_type: String, key: String },

    #[error("Write conflict: {0}")]
    WriteConflict(String),

    #[error("Invalid record: {0}")]
    InvalidRecord(String),
}

impl PersistenceError {
    pub(crate) fn not_found(entity_type: &str, key: impl ToString) -> Self {
        Self::NotFound {
            entity_type: entity_type.to_string(),
            key: key.to_string(),
        }
    }
}

impl From<serde_json::Error> for PersistenceError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

impl From<std::io::Error> for PersistenceError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err.to_string())
    }
}

impl From<fleet_domain::DomainError> for PersistenceError {
    fn from(err: fleet_domain::DomainError) -> Self {
        Self::InvalidRecord(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, PersistenceError>;
