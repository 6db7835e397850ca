//! Quorum Storage Layer
//!
//! A versioned document store over SQLite. Each store holds JSON records
//! keyed by a primary key path, with optional secondary indexes declared
//! in the schema. Each call is atomic; nothing is retried.

mod client;
mod database;
mod error;
mod key;
mod migrations;
mod schema;

pub use client::{Location, StorageClient};
pub use database::Database;
pub use error::StorageError;
pub use key::{Bound, Key, KeyRange};
pub use schema::{DatabaseSchema, IndexSchema, StoreSchema};

pub type Result<T> = std::result::Result<T, StorageError>;
