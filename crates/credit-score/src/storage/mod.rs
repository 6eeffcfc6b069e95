//! Persistence adapters shared by the account and prediction collaborators.

pub mod sqlite;

pub use sqlite::SqliteStore;

/// Error enumeration for repository failures.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RepositoryError {
    #[error("record already exists")]
    Conflict,
    #[error("record not found")]
    NotFound,
    #[error("repository unavailable: {0}")]
    Unavailable(String),
}

/// Failure opening or migrating a storage backend.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("failed to open database {path}: {source}")]
    Open {
        path: String,
        #[source]
        source: rusqlite::Error,
    },
    #[error("failed to initialise schema: {0}")]
    Schema(#[source] rusqlite::Error),
}
