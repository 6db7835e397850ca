//! Database connection and blocking document operations

use parking_lot::Mutex;
use rusqlite::{params, params_from_iter, Connection, OptionalExtension, Transaction};
use serde_json::Value;
use std::fmt;
use std::path::Path;
use std::sync::Arc;

use crate::error::StorageError;
use crate::key::{Key, KeyRange};
use crate::migrations::run_migrations;
use crate::schema::{json_expr, DatabaseSchema, StoreSchema};
use crate::Result;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum WriteMode {
    /// Insert only, fail on an existing key
    Add,
    /// Insert or replace by primary key
    Put,
}

/// Optional filter shared by `get_all`, `count` and `query`.
#[derive(Debug, Clone, Default)]
pub(crate) struct Filter {
    pub index: Option<String>,
    pub range: Option<KeyRange>,
}

pub struct Database {
    conn: Arc<Mutex<Connection>>,
    schema: Arc<DatabaseSchema>,
}

impl Database {
    pub fn open<P: AsRef<Path>>(path: P, schema: DatabaseSchema) -> Result<Self> {
        schema.validate()?;
        let mut conn = Connection::open(path)?;

        // WAL mode for better concurrent performance
        let _: String =
            conn.pragma_update_and_check(None, "journal_mode", "WAL", |row| row.get(0))?;

        run_migrations(&mut conn, &schema)?;

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
            schema: Arc::new(schema),
        })
    }

    pub fn open_in_memory(schema: DatabaseSchema) -> Result<Self> {
        schema.validate()?;
        let mut conn = Connection::open_in_memory()?;
        run_migrations(&mut conn, &schema)?;

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
            schema: Arc::new(schema),
        })
    }

    pub fn schema(&self) -> &DatabaseSchema {
        &self.schema
    }

    pub fn with_connection<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Connection) -> Result<T>,
    {
        let conn = self.conn.lock();
        f(&conn)
    }

    pub fn transaction<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Transaction<'_>) -> Result<T>,
    {
        let mut conn = self.conn.lock();
        let tx = conn.transaction()?;
        let result = f(&tx)?;
        tx.commit()?;
        Ok(result)
    }

    pub fn get(&self, store: &str, key: &Key) -> Result<Option<Value>> {
        let store = self.schema.find_store(store)?;
        self.with_connection(|conn| {
            let doc: Option<String> = conn
                .query_row(
                    &format!("SELECT doc FROM {} WHERE pk = ?1", store.table_name()),
                    [key],
                    |row| row.get(0),
                )
                .optional()?;
            doc.map(|d| decode(&d)).transpose()
        })
    }

    pub(crate) fn get_all(&self, store: &str, filter: &Filter) -> Result<Vec<Value>> {
        let store = self.schema.find_store(store)?;
        let (clause, params, order) = filter_sql(store, filter)?;
        let sql = format!(
            "SELECT doc FROM {}{} ORDER BY {}",
            store.table_name(),
            clause,
            order
        );

        self.with_connection(|conn| {
            let mut stmt = conn.prepare(&sql)?;
            let docs = stmt
                .query_map(params_from_iter(params.iter()), |row| row.get::<_, String>(0))?
                .collect::<rusqlite::Result<Vec<String>>>()?;
            docs.iter().map(|d| decode(d)).collect()
        })
    }

    pub(crate) fn get_all_keys(&self, store: &str, filter: &Filter) -> Result<Vec<Key>> {
        let store = self.schema.find_store(store)?;
        let (clause, params, order) = filter_sql(store, filter)?;
        let sql = format!(
            "SELECT pk FROM {}{} ORDER BY {}",
            store.table_name(),
            clause,
            order
        );

        self.with_connection(|conn| {
            let mut stmt = conn.prepare(&sql)?;
            let keys = stmt
                .query_map(params_from_iter(params.iter()), |row| row.get::<_, Key>(0))?
                .collect::<rusqlite::Result<Vec<Key>>>()?;
            Ok(keys)
        })
    }

    pub(crate) fn count(&self, store: &str, filter: &Filter) -> Result<u64> {
        let store = self.schema.find_store(store)?;
        let (clause, params, _) = filter_sql(store, filter)?;
        let sql = format!("SELECT COUNT(*) FROM {}{}", store.table_name(), clause);

        self.with_connection(|conn| {
            let count: i64 =
                conn.query_row(&sql, params_from_iter(params.iter()), |row| row.get(0))?;
            Ok(count as u64)
        })
    }

    pub(crate) fn write(&self, store: &str, doc: Value, mode: WriteMode) -> Result<Key> {
        let store = self.schema.find_store(store)?;
        self.transaction(|tx| write_record(tx, store, doc, mode))
            .map_err(|e| e.in_store(&store.name))
    }

    pub fn delete(&self, store: &str, key: &Key) -> Result<()> {
        let store = self.schema.find_store(store)?;
        self.with_connection(|conn| {
            conn.execute(
                &format!("DELETE FROM {} WHERE pk = ?1", store.table_name()),
                [key],
            )?;
            Ok(())
        })
    }

    /// Remove every record. The key generator keeps counting.
    pub fn clear(&self, store: &str) -> Result<()> {
        let store = self.schema.find_store(store)?;
        self.with_connection(|conn| {
            conn.execute(&format!("DELETE FROM {}", store.table_name()), [])?;
            Ok(())
        })
    }
}

impl fmt::Debug for Database {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Database")
            .field("name", &self.schema.name)
            .field("version", &self.schema.version)
            .finish_non_exhaustive()
    }
}

impl Clone for Database {
    fn clone(&self) -> Self {
        Self {
            conn: Arc::clone(&self.conn),
            schema: Arc::clone(&self.schema),
        }
    }
}

fn decode(doc: &str) -> Result<Value> {
    Ok(serde_json::from_str(doc)?)
}

/// WHERE clause, bound values and ORDER BY for a filter.
fn filter_sql(store: &StoreSchema, filter: &Filter) -> Result<(String, Vec<Key>, String)> {
    let expr = match &filter.index {
        Some(name) => json_expr(&store.find_index(name)?.key_path),
        None => "pk".to_string(),
    };
    let order = if filter.index.is_some() {
        format!("{expr}, pk")
    } else {
        "pk".to_string()
    };

    let (clause, params) = match (&filter.index, &filter.range) {
        (_, Some(range)) => {
            let (sql, params) = range.to_sql_filter(&expr, 1);
            (format!(" WHERE {sql}"), params)
        }
        // Records without the indexed field are not part of the index.
        (Some(_), None) => (format!(" WHERE {expr} IS NOT NULL"), Vec::new()),
        (None, None) => (String::new(), Vec::new()),
    };

    Ok((clause, params, order))
}

fn write_record(tx: &Transaction<'_>, store: &StoreSchema, mut doc: Value, mode: WriteMode) -> Result<Key> {
    let fields = doc.as_object().ok_or_else(|| {
        StorageError::InvalidRecord(format!("records in '{}' must be JSON objects", store.name))
    })?;

    let key = match fields.get(&store.key_path).filter(|v| !v.is_null()) {
        Some(value) => {
            let key = Key::from_json(value)?;
            if let (true, Key::Int(explicit)) = (store.auto_increment, &key) {
                advance_generator(tx, &store.name, *explicit)?;
            }
            key
        }
        None if store.auto_increment => {
            let key = Key::Int(next_generated_key(tx, &store.name)?);
            if let Some(fields) = doc.as_object_mut() {
                fields.insert(store.key_path.clone(), key.to_json());
            }
            key
        }
        None => {
            return Err(StorageError::InvalidRecord(format!(
                "record for '{}' has no '{}' key",
                store.name, store.key_path
            )))
        }
    };

    let body = serde_json::to_string(&doc)?;
    let sql = match mode {
        WriteMode::Add => format!("INSERT INTO {} (pk, doc) VALUES (?1, ?2)", store.table_name()),
        WriteMode::Put => format!(
            "INSERT INTO {} (pk, doc) VALUES (?1, ?2)
             ON CONFLICT(pk) DO UPDATE SET doc = excluded.doc",
            store.table_name()
        ),
    };
    tx.execute(&sql, params![key, body])?;

    Ok(key)
}

fn next_generated_key(tx: &Transaction<'_>, store: &str) -> Result<i64> {
    let next: i64 = tx.query_row(
        "INSERT INTO key_generators (store, current) VALUES (?1, 1)
         ON CONFLICT(store) DO UPDATE SET current = current + 1
         RETURNING current",
        [store],
        |row| row.get(0),
    )?;
    Ok(next)
}

/// Only explicit keys above the current position move the generator, which never
/// drops below zero.
fn advance_generator(tx: &Transaction<'_>, store: &str, explicit: i64) -> Result<()> {
    tx.execute(
        "INSERT INTO key_generators (store, current) VALUES (?1, MAX(?2, 0))
         ON CONFLICT(store) DO UPDATE SET current = MAX(current, excluded.current)",
        params![store, explicit],
    )?;
    Ok(())
}
