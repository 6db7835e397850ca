//! Quorum Core
//!
//! The application context: configuration, the database layout and the
//! services sharing one storage connection.

mod app;
mod config;
mod error;
mod outcome;
mod schema;

pub use app::App;
pub use config::{Config, DATABASE_FILE};
pub use error::CoreError;
pub use outcome::OperationResult;
pub use schema::{database_schema, DATABASE_NAME, SCHEMA_VERSION};

// Re-export the services and their records
pub use quorum_forum::{
    Answer, CascadeReport, ForumError, ForumService, Question, QuestionDraft, Role, TargetType,
    User, Vote, VoteOutcome, VoteValue,
};
pub use quorum_inventory::{Inventory, InventoryError, Item};
pub use quorum_storage::{Location, StorageClient, StorageError};
pub use quorum_transfer::{ExportDocument, ImportMode, ImportReport, Transfer, TransferError};

pub type Result<T> = std::result::Result<T, CoreError>;

/// Initialize logging
pub fn init_logging() {
    use tracing_subscriber::{fmt, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    fmt().with_env_filter(filter).with_target(true).init();
}
