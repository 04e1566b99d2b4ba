//! Storage error types.
//!
//! Repositories return these typed errors; the service layer classifies them
//! with [`StorageError::is_not_found`] and [`StorageError::is_conflict`] and
//! never forwards their text to callers.

use thiserror::Error;

/// Errors that can occur during repository operations.
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum StorageError {
    /// No user matched the lookup. Also returned for a wrong password, so the
    /// two cases cannot be told apart.
    #[error("user not found")]
    UserNotFound,

    /// No secret with this name for the owner.
    #[error("secret not found: {name}")]
    SecretNotFound { name: String },

    /// Email already registered.
    #[error("email already registered")]
    EmailTaken,

    /// The owner already has a secret with this name.
    #[error("secret already exists: {name}")]
    SecretNameTaken { name: String },

    /// A secret referenced an owner that has no user record.
    #[error("unknown secret owner")]
    UnknownOwner,

    /// Password hashing or hash parsing failed.
    #[error("password hashing failed: {reason}")]
    PasswordHash { reason: String },

    /// A stored row could not be decoded.
    #[error("corrupt record: {reason}")]
    CorruptRecord { reason: String },

    /// SQL driver error.
    #[cfg(any(feature = "sqlite", feature = "postgres"))]
    #[error("SQL error: {reason}")]
    SqlxError {
        reason: String,
        #[source]
        source: Option<sqlx::Error>,
    },
}

impl StorageError {
    /// Check if this error indicates a resource was not found.
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            StorageError::UserNotFound | StorageError::SecretNotFound { .. }
        )
    }

    /// Check if this error indicates a uniqueness violation.
    pub fn is_conflict(&self) -> bool {
        matches!(
            self,
            StorageError::EmailTaken | StorageError::SecretNameTaken { .. }
        )
    }
}
