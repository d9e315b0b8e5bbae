use common::Version;
use thiserror::Error;

/// Errors that can occur when interacting with the logistics store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The row was modified since it was read.
    #[error("Concurrency conflict on {entity} {id}: expected version {expected}, found {actual}")]
    ConcurrencyConflict {
        entity: &'static str,
        id: String,
        expected: Version,
        actual: Version,
    },

    /// The row does not exist.
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    /// A database error occurred.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A database migration error occurred.
    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    /// A serialization/deserialization error occurred.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Reference data could not be read.
    #[error("Reference data error: {0}")]
    ReferenceData(#[from] std::io::Error),
}

/// Result type for store operations.
pub type Result<T> = std::result::Result<T, StoreError>;
