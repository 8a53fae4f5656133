use crate::migrations::MigrationError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("connection pool error: {0}")]
    Pool(#[from] r2d2::Error),

    #[error(transparent)]
    Migration(#[from] MigrationError),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// A persisted row failed validation on read.
    #[error("corrupt record {id}: {reason}")]
    Corrupt { id: String, reason: String },
}
