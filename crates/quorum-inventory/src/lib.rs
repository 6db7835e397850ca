//! Quorum Inventory
//!
//! Household items keyed by store-assigned sequence numbers.

mod error;
mod item;
mod manager;

pub use error::InventoryError;
pub use item::Item;
pub use manager::{stores, Inventory};

pub type Result<T> = std::result::Result<T, InventoryError>;
