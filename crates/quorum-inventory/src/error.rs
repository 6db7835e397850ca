//! Inventory error types

use quorum_repo::RepositoryError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum InventoryError {
    #[error("Item not found: {0}")]
    NotFound(i64),

    #[error("Item has not been saved yet")]
    Unsaved,

    #[error(transparent)]
    Repository(#[from] RepositoryError),
}
