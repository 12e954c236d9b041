//! Error types for chatgrade-store

use thiserror::Error;

/// Errors that can occur in the score persistence layer
#[derive(Error, Debug)]
pub enum StoreError {
    /// Could not reach or open the database
    #[error("Database connection failed: {0}")]
    Connection(String),

    /// Query or write rejected by the backend
    #[error("Storage backend error: {0}")]
    Backend(String),

    /// Schema setup error
    #[error("Schema setup failed: {0}")]
    SchemaSetup(String),

    /// No record with this ID exists
    #[error("Score record not found: {record_id}")]
    RecordNotFound { record_id: String },

    /// Record could not be converted to or from its stored form
    #[error("Serialization failed: {0}")]
    Serialization(String),
}

impl From<surrealdb::Error> for StoreError {
    fn from(err: surrealdb::Error) -> Self {
        StoreError::Backend(err.to_string())
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(err: serde_json::Error) -> Self {
        StoreError::Serialization(err.to_string())
    }
}
