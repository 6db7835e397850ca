//! Repository error types

use quorum_storage::StorageError;
use thiserror::Error;

use crate::validate::ValidationError;

#[derive(Error, Debug)]
pub enum RepositoryError {
    #[error("Validation failed: {0}")]
    Validation(#[from] ValidationError),

    #[error("{store} already contains this record: {detail}")]
    Duplicate { store: String, detail: String },

    #[error("{store} record not found: {key}")]
    NotFound { store: String, key: String },

    #[error("Storage unavailable: {0}")]
    Unavailable(String),

    #[error("Could not decode {store} record: {source}")]
    Decode {
        store: String,
        source: serde_json::Error,
    },

    #[error("Could not encode record: {0}")]
    Encode(serde_json::Error),

    #[error("Storage error: {0}")]
    Storage(StorageError),
}

impl From<StorageError> for RepositoryError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::DuplicateKey { store, detail } => {
                RepositoryError::Duplicate { store, detail }
            }
            StorageError::StorageUnavailable(msg) => RepositoryError::Unavailable(msg),
            other => RepositoryError::Storage(other),
        }
    }
}
