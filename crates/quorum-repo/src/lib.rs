//! Quorum Repositories
//!
//! One repository per record type. Repositories validate before writing and
//! translate storage failures into domain error kinds.

mod entity;
mod error;
mod repository;
pub mod validate;

pub use entity::Entity;
pub use error::RepositoryError;
pub use repository::Repository;
pub use validate::{ValidationError, ValidationResult};

pub use quorum_storage::{Key, KeyRange, StorageClient};

pub type Result<T> = std::result::Result<T, RepositoryError>;
