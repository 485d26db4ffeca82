use thiserror::Error;

/// Errors produced by the cache layer.
#[derive(Error, Debug)]
pub enum StoreError {
    /// SQLite error.
    #[error("Database error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// Generic I/O error (e.g. creating the database directory).
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// A cached row violates the message payload convention.
    #[error("Corrupt cache row for chat '{chat}', id {id}: {reason}")]
    CorruptRow {
        chat: String,
        id: i64,
        reason: String,
    },

    /// Migration failure.
    #[error("Migration error: {0}")]
    Migration(String),
}

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, StoreError>;
