//! Core error types

use thiserror::Error;

#[derive(Error, Debug)]
pub enum CoreError {
    #[error("Storage error: {0}")]
    Storage(#[from] quorum_storage::StorageError),

    #[error("Forum error: {0}")]
    Forum(#[from] quorum_forum::ForumError),

    #[error("Inventory error: {0}")]
    Inventory(#[from] quorum_inventory::InventoryError),

    #[error("Transfer error: {0}")]
    Transfer(#[from] quorum_transfer::TransferError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(String),
}
