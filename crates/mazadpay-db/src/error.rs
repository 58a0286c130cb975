//! Database error types

use thiserror::Error;

use mazadpay_types::ClearanceError;

/// Database operation errors
#[derive(Debug, Error)]
pub enum DbError {
    #[error("Connection error: {0}")]
    Connection(String),

    #[error("Migration error: {0}")]
    Migration(String),

    #[error("Query error: {0}")]
    Query(#[from] sqlx::Error),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl From<DbError> for ClearanceError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::NotFound(msg) => ClearanceError::NotFound(msg),
            other => ClearanceError::Storage(other.to_string()),
        }
    }
}

/// Result type for database operations
pub type DbResult<T> = Result<T, DbError>;
