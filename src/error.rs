use std::path::PathBuf;

use thiserror::Error;

use crate::store::SyncReport;

/// Errors reported by a [`DocumentDatabase`](crate::DocumentDatabase) collection.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CollectionError {
    /// Insert of an id that already exists in the collection.
    #[error("duplicate key {id} in database {database}")]
    DuplicateKey { database: String, id: String },
    /// Update of an id the collection does not know.
    #[error("document {id} not found in database {database}")]
    NotFound { database: String, id: String },
    /// Document could not be encoded or decoded.
    #[error("document serialization error: {0}")]
    Serde(String),
    /// Any other backend failure (connection, lock, ...).
    #[error("database backend error: {0}")]
    Backend(String),
}

impl CollectionError {
    pub fn is_duplicate_key(&self) -> bool {
        matches!(self, CollectionError::DuplicateKey { .. })
    }
}

/// Error type for model store operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    #[error("model store lock poisoned during {0}")]
    LockPoisoned(&'static str),
    #[error(transparent)]
    Collection(#[from] CollectionError),
    #[error("storage error at {}: {message}", .path.display())]
    Storage { path: PathBuf, message: String },
    #[error("model serialization error: {0}")]
    Serde(String),
    #[error("invalid store configuration: {0}")]
    Config(String),
    #[error("sync worker already started for this store")]
    AlreadyRunning,
    #[error("sync task queue is closed")]
    QueueClosed,
    /// A sync, save or load ran to the end but some operations failed.
    #[error("{} operations failed, first: {first}", .report.failed)]
    Incomplete {
        report: SyncReport,
        first: Box<StoreError>,
    },
}

impl StoreError {
    pub(crate) fn storage(path: impl Into<PathBuf>, err: impl std::fmt::Display) -> Self {
        StoreError::Storage {
            path: path.into(),
            message: err.to_string(),
        }
    }
}
