//! Transfer error types

use quorum_repo::RepositoryError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum TransferError {
    #[error("Invalid export document: {0}")]
    InvalidFormat(String),

    #[error("No store named '{0}' is registered for transfer")]
    UnknownStore(String),

    /// Records before `index` in `store` are already written.
    #[error("Failed to import {store} record #{index}: {source}")]
    Record {
        store: String,
        index: usize,
        #[source]
        source: RepositoryError,
    },

    #[error(transparent)]
    Repository(#[from] RepositoryError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
