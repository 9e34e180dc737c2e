//! # Error Module
//!
//! Errors produced by the domain and storage layers.

use thiserror::Error;

/// Result alias used throughout `lodgely-core`.
pub type Result<T> = std::result::Result<T, CoreError>;

/// Errors from the core crate.
#[derive(Debug, Error)]
pub enum CoreError {
    /// The requested row does not exist (or is not visible to the caller).
    #[error("record not found")]
    NotFound,

    /// Another user already owns this email address.
    #[error("duplicate email")]
    DuplicateEmail,

    /// The requested stay overlaps an existing booking of the same listing.
    #[error("listing is already booked for the requested dates")]
    BookingConflict,

    /// SQLite failure.
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// bcrypt failure (not a mismatch, which is `Ok(false)`).
    #[error("password hashing error: {0}")]
    Password(#[from] bcrypt::BcryptError),
}

impl CoreError {
    /// True for [`CoreError::NotFound`].
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound)
    }
}

/// Map `QueryReturnedNoRows` to [`CoreError::NotFound`].
pub(crate) fn not_found(err: rusqlite::Error) -> CoreError {
    match err {
        rusqlite::Error::QueryReturnedNoRows => CoreError::NotFound,
        other => CoreError::Database(other),
    }
}

/// Map a unique-constraint violation on `users.email` to [`CoreError::DuplicateEmail`].
pub(crate) fn duplicate_email(err: rusqlite::Error) -> CoreError {
    if let rusqlite::Error::SqliteFailure(code, Some(message)) = &err {
        if code.code == rusqlite::ErrorCode::ConstraintViolation
            && message.contains("users.email")
        {
            return CoreError::DuplicateEmail;
        }
    }
    CoreError::Database(err)
}
