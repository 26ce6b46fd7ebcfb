//! Error kinds returned by the store components.

/// Everything a store operation can fail with.
///
/// The transport layer decides how each kind is reported; the store only
/// guarantees that a failed operation left no partial effect behind.
#[derive(thiserror::Error, Debug)]
pub enum StoreError {
    /// Malformed input (bad code length, bad key pattern, blank field).
    #[error("Validation failed: {0}")]
    Validation(String),

    /// A language code or translation key is already taken.
    #[error("Conflict: {0}")]
    Conflict(String),

    /// The targeted id does not exist.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Backing store unavailable or transaction aborted.
    #[error("Storage failure: {0}")]
    Storage(#[from] sqlx::Error),
}

/// Result type for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// True when the driver rejected a write because of a UNIQUE constraint.
pub(crate) fn is_unique_violation(err: &sqlx::Error) -> bool {
    matches!(err, sqlx::Error::Database(db) if db.is_unique_violation())
}

/// True when the driver rejected a write because a referenced row is gone.
pub(crate) fn is_foreign_key_violation(err: &sqlx::Error) -> bool {
    matches!(err, sqlx::Error::Database(db) if db.is_foreign_key_violation())
}
