//! Error types for authentication and session operations.

use thiserror::Error;

/// Result type alias for authentication operations.
pub type Result<T> = std::result::Result<T, AuthError>;

/// Failure modes of the authentication subsystem.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AuthError {
    /// Magic-link token is missing, malformed, already used, or expired.
    #[error("invalid or expired sign-in token")]
    InvalidToken,

    /// Session has expired.
    #[error("session has expired")]
    SessionExpired,

    /// Session not found.
    #[error("session not found")]
    SessionNotFound,

    /// A session write violated a store invariant (duplicate id on create,
    /// immutable field changed on update).
    #[error("session conflict: {0}")]
    SessionConflict(String),

    /// Too many attempts inside the rate-limit window.
    #[error("too many attempts, retry after {retry_after:?}")]
    TooManyAttempts {
        /// Time until the oldest attempt leaves the window.
        retry_after: std::time::Duration,
    },

    /// Email address failed validation.
    #[error("invalid email address")]
    InvalidEmail,

    /// Email delivery failed.
    #[error("failed to send email: {0}")]
    EmailError(String),

    /// Session payload could not be (de)serialized.
    #[error("serialization error: {0}")]
    SerializationError(String),

    /// The backing store (Redis) failed.
    #[error("storage error: {0}")]
    StorageError(String),
}

impl AuthError {
    /// Returns `true` if this error is the caller's fault rather than an
    /// infrastructure failure.
    #[must_use]
    pub const fn is_user_error(&self) -> bool {
        matches!(
            self,
            Self::InvalidToken
                | Self::SessionExpired
                | Self::SessionNotFound
                | Self::TooManyAttempts { .. }
                | Self::InvalidEmail
        )
    }
}
