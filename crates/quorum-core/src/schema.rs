//! The application's database layout

use quorum_storage::DatabaseSchema;

pub const DATABASE_NAME: &str = "quorum";

/// Bump when a store or index is added.
pub const SCHEMA_VERSION: u32 = 1;

pub fn database_schema() -> DatabaseSchema {
    DatabaseSchema::new(DATABASE_NAME, SCHEMA_VERSION)
        .stores(quorum_forum::schema::stores())
        .stores(quorum_inventory::stores())
}
