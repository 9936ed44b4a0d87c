//! Error types for the persistence layer.

use boxoffice_core::DomainError;
use thiserror::Error;

/// Result type alias for store operations.
pub type Result<T> = std::result::Result<T, StoreError>;

/// Failure modes of the persistence layer.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The requested record does not exist.
    #[error("{entity} not found")]
    NotFound {
        /// Human-readable entity name.
        entity: &'static str,
    },

    /// The write lost to a concurrent state change (guarded update matched
    /// zero rows) or hit a uniqueness constraint.
    #[error("conflict: {0}")]
    Conflict(String),

    /// A domain invariant rejected the operation.
    #[error(transparent)]
    Domain(#[from] DomainError),

    /// A stored row failed to map back into a domain type.
    #[error("corrupt row: {0}")]
    Corrupt(String),

    /// The database itself failed.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl StoreError {
    /// Shorthand for [`StoreError::NotFound`].
    #[must_use]
    pub const fn not_found(entity: &'static str) -> Self {
        Self::NotFound { entity }
    }

    /// Whether `err` is a Postgres unique-constraint violation.
    #[must_use]
    pub fn is_unique_violation(err: &sqlx::Error) -> bool {
        matches!(
            err,
            sqlx::Error::Database(db_err) if db_err.code().as_deref() == Some("23505")
        )
    }
}
