//! Schema upgrades
//!
//! Upgrades are additive: missing stores and indexes are created, existing
//! documents are left as they are.

use rusqlite::{Connection, OptionalExtension};

use crate::error::StorageError;
use crate::schema::{json_expr, DatabaseSchema};
use crate::Result;

pub fn run_migrations(conn: &mut Connection, schema: &DatabaseSchema) -> Result<()> {
    conn.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS schema_version (
            name TEXT PRIMARY KEY,
            version INTEGER NOT NULL
        );

        CREATE TABLE IF NOT EXISTS key_generators (
            store TEXT PRIMARY KEY,
            current INTEGER NOT NULL
        );
    "#,
    )?;

    let current_version = get_schema_version(conn, &schema.name)?;

    if current_version > schema.version {
        return Err(StorageError::StorageUnavailable(format!(
            "database '{}' is at version {} which is newer than requested version {}",
            schema.name, current_version, schema.version
        )));
    }

    if current_version == schema.version {
        return Ok(());
    }

    tracing::info!(
        database = %schema.name,
        from = current_version,
        to = schema.version,
        "Upgrading database schema"
    );

    let tx = conn.transaction()?;
    for store in &schema.stores {
        tx.execute_batch(&format!(
            "CREATE TABLE IF NOT EXISTS {} (pk NOT NULL PRIMARY KEY, doc TEXT NOT NULL);",
            store.table_name()
        ))?;

        for index in &store.indexes {
            let unique = if index.unique { "UNIQUE " } else { "" };
            tx.execute_batch(&format!(
                "CREATE {unique}INDEX IF NOT EXISTS {} ON {} ({});",
                store.index_name(index),
                store.table_name(),
                json_expr(&index.key_path)
            ))?;
        }

        tracing::debug!(store = %store.name, indexes = store.indexes.len(), "Store ready");
    }
    set_schema_version(&tx, &schema.name, schema.version)?;
    tx.commit()?;

    Ok(())
}

fn get_schema_version(conn: &Connection, name: &str) -> Result<u32> {
    let version: Option<u32> = conn
        .query_row(
            "SELECT version FROM schema_version WHERE name = ?1",
            [name],
            |row| row.get(0),
        )
        .optional()?;
    Ok(version.unwrap_or(0))
}

fn set_schema_version(conn: &Connection, name: &str, version: u32) -> Result<()> {
    conn.execute(
        "INSERT OR REPLACE INTO schema_version (name, version) VALUES (?1, ?2)",
        rusqlite::params![name, version],
    )?;
    Ok(())
}
