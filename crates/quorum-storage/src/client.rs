//! Async storage client
//!
//! Every call suspends the caller while the blocking SQLite work runs on the
//! tokio blocking pool. Calls are serialized by the connection mutex.

use serde_json::Value;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::OnceCell;

use crate::database::{Database, Filter, WriteMode};
use crate::error::StorageError;
use crate::key::{Key, KeyRange};
use crate::schema::DatabaseSchema;
use crate::Result;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Location {
    File(PathBuf),
    Memory,
}

#[derive(Clone)]
pub struct StorageClient {
    location: Location,
    schema: Arc<DatabaseSchema>,
    handle: Arc<OnceCell<Database>>,
}

impl StorageClient {
    pub fn new(location: Location, schema: DatabaseSchema) -> Self {
        Self {
            location,
            schema: Arc::new(schema),
            handle: Arc::new(OnceCell::new()),
        }
    }

    pub fn in_memory(schema: DatabaseSchema) -> Self {
        Self::new(Location::Memory, schema)
    }

    pub fn schema(&self) -> &DatabaseSchema {
        &self.schema
    }

    pub fn location(&self) -> &Location {
        &self.location
    }

    pub fn store_names(&self) -> Vec<String> {
        self.schema.store_names()
    }

    pub fn is_open(&self) -> bool {
        self.handle.initialized()
    }

    /// Open the database, creating and upgrading it as needed.
    ///
    /// Later calls return the cached handle.
    pub async fn open(&self) -> Result<Database> {
        let db = self
            .handle
            .get_or_try_init(|| async {
                let location = self.location.clone();
                let schema = DatabaseSchema::clone(&self.schema);
                let db = tokio::task::spawn_blocking(move || match location {
                    Location::File(path) => Database::open(path, schema),
                    Location::Memory => Database::open_in_memory(schema),
                })
                .await
                .map_err(|e| StorageError::StorageUnavailable(e.to_string()))?
                .map_err(|e| match e {
                    StorageError::TransactionAborted(msg) => StorageError::StorageUnavailable(msg),
                    // A new unique index over existing duplicates fails the upgrade.
                    StorageError::DuplicateKey { detail, .. } => {
                        StorageError::StorageUnavailable(format!("upgrade failed: {detail}"))
                    }
                    other => other,
                })?;

                tracing::info!(
                    database = %self.schema.name,
                    version = self.schema.version,
                    stores = self.schema.stores.len(),
                    "Opened database"
                );
                Ok::<_, StorageError>(db)
            })
            .await?;

        Ok(db.clone())
    }

    async fn run<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Database) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let db = self.open().await?;
        tokio::task::spawn_blocking(move || f(&db)).await?
    }

    pub async fn get(&self, store: &str, key: impl Into<Key>) -> Result<Option<Value>> {
        let store = store.to_string();
        let key = key.into();
        tracing::debug!(store = %store, key = %key, "get");
        self.run(move |db| db.get(&store, &key)).await
    }

    /// All records of a store, or those whose `index` value falls in `range`.
    ///
    /// Without an index the range applies to the primary key.
    pub async fn get_all(
        &self,
        store: &str,
        index: Option<&str>,
        range: Option<KeyRange>,
    ) -> Result<Vec<Value>> {
        let store = store.to_string();
        let filter = Filter {
            index: index.map(str::to_string),
            range,
        };
        tracing::debug!(store = %store, index = ?filter.index, "get_all");
        self.run(move |db| db.get_all(&store, &filter)).await
    }

    pub async fn get_all_keys(
        &self,
        store: &str,
        index: Option<&str>,
        range: Option<KeyRange>,
    ) -> Result<Vec<Key>> {
        let store = store.to_string();
        let filter = Filter {
            index: index.map(str::to_string),
            range,
        };
        self.run(move |db| db.get_all_keys(&store, &filter)).await
    }

    pub async fn query(&self, store: &str, index: &str, range: KeyRange) -> Result<Vec<Value>> {
        self.get_all(store, Some(index), Some(range)).await
    }

    /// Insert or replace by primary key.
    pub async fn put(&self, store: &str, record: Value) -> Result<Key> {
        let store = store.to_string();
        tracing::debug!(store = %store, "put");
        self.run(move |db| db.write(&store, record, WriteMode::Put))
            .await
    }

    /// Insert only; an existing primary key or unique index value is a `DuplicateKey`.
    pub async fn add(&self, store: &str, record: Value) -> Result<Key> {
        let store = store.to_string();
        tracing::debug!(store = %store, "add");
        self.run(move |db| db.write(&store, record, WriteMode::Add))
            .await
    }

    pub async fn delete(&self, store: &str, key: impl Into<Key>) -> Result<()> {
        let store = store.to_string();
        let key = key.into();
        tracing::debug!(store = %store, key = %key, "delete");
        self.run(move |db| db.delete(&store, &key)).await
    }

    pub async fn clear(&self, store: &str) -> Result<()> {
        let store = store.to_string();
        tracing::debug!(store = %store, "clear");
        self.run(move |db| db.clear(&store)).await
    }

    pub async fn count(
        &self,
        store: &str,
        index: Option<&str>,
        range: Option<KeyRange>,
    ) -> Result<u64> {
        let store = store.to_string();
        let filter = Filter {
            index: index.map(str::to_string),
            range,
        };
        self.run(move |db| db.count(&store, &filter)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{IndexSchema, StoreSchema};
    use serde_json::json;

    fn schema() -> DatabaseSchema {
        DatabaseSchema::new("qa", 1)
            .store(
                StoreSchema::new("users", "id").index(IndexSchema::unique("by_username", "username")),
            )
            .store(
                StoreSchema::new("answers", "id")
                    .index(IndexSchema::new("by_question", "questionId"))
                    .index(IndexSchema::new("by_score", "votesScore")),
            )
    }

    async fn seeded() -> StorageClient {
        let client = StorageClient::in_memory(schema());
        for (id, question, score) in [("a1", "q1", 3), ("a2", "q1", -1), ("a3", "q2", 7)] {
            client
                .put(
                    "answers",
                    json!({"id": id, "questionId": question, "votesScore": score}),
                )
                .await
                .unwrap();
        }
        client
    }

    #[tokio::test]
    async fn test_open_is_idempotent() {
        let client = StorageClient::in_memory(schema());
        assert!(!client.is_open());
        client.open().await.unwrap();
        client.put("users", json!({"id": "u1", "username": "ada"})).await.unwrap();

        // A second open must hand back the same database, not a fresh one.
        client.open().await.unwrap();
        assert!(client.is_open());
        assert_eq!(client.count("users", None, None).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_get_missing_is_none() {
        let client = StorageClient::in_memory(schema());
        assert_eq!(client.get("users", "nobody").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_unique_index_rejects_second_add() {
        let client = StorageClient::in_memory(schema());
        client.add("users", json!({"id": "u1", "username": "ada"})).await.unwrap();

        let err = client
            .add("users", json!({"id": "u2", "username": "ada"}))
            .await
            .unwrap_err();
        assert!(matches!(err, StorageError::DuplicateKey { .. }));

        let first = client.get("users", "u1").await.unwrap().unwrap();
        assert_eq!(first["username"], "ada");
        assert_eq!(client.get("users", "u2").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_query_by_index() {
        let client = seeded().await;

        let q1 = client
            .query("answers", "by_question", KeyRange::only("q1"))
            .await
            .unwrap();
        let ids: Vec<_> = q1.iter().map(|a| a["id"].as_str().unwrap()).collect();
        assert_eq!(ids, vec!["a1", "a2"]);

        let positive = client
            .query("answers", "by_score", KeyRange::lower_bound(0, true))
            .await
            .unwrap();
        let ids: Vec<_> = positive.iter().map(|a| a["id"].as_str().unwrap()).collect();
        assert_eq!(ids, vec!["a1", "a3"]);

        assert_eq!(
            client
                .count("answers", Some("by_question"), Some(KeyRange::only("q2")))
                .await
                .unwrap(),
            1
        );
        assert_eq!(client.count("answers", None, None).await.unwrap(), 3);
    }

    #[tokio::test]
    async fn test_primary_key_range_and_keys() {
        let client = seeded().await;
        let keys = client
            .get_all_keys("answers", None, Some(KeyRange::bound("a2", "a3", false, false)))
            .await
            .unwrap();
        assert_eq!(keys, vec![Key::from("a2"), Key::from("a3")]);
    }

    #[tokio::test]
    async fn test_unknown_index_is_not_found() {
        let client = seeded().await;
        let err = client
            .query("answers", "by_author", KeyRange::only("u1"))
            .await
            .unwrap_err();
        assert!(matches!(err, StorageError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_delete_and_clear() {
        let client = seeded().await;
        client.delete("answers", "a1").await.unwrap();
        client.delete("answers", "missing").await.unwrap();
        assert_eq!(client.get("answers", "a1").await.unwrap(), None);

        client.clear("answers").await.unwrap();
        assert!(client.get_all("answers", None, None).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_file_database_persists() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("qa.db");

        let client = StorageClient::new(Location::File(path.clone()), schema());
        client.put("users", json!({"id": "u1", "username": "ada"})).await.unwrap();
        drop(client);

        let reopened = StorageClient::new(Location::File(path), schema());
        let user = reopened.get("users", "u1").await.unwrap().unwrap();
        assert_eq!(user["username"], "ada");
    }

    #[tokio::test]
    async fn test_unopenable_path_is_unavailable() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing-dir").join("qa.db");

        let client = StorageClient::new(Location::File(path), schema());
        let err = client.open().await.unwrap_err();
        assert!(matches!(err, StorageError::StorageUnavailable(_)));
    }

    #[tokio::test]
    async fn test_unique_index_over_duplicates_fails_upgrade() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("qa.db");

        let v1 = DatabaseSchema::new("qa", 1).store(StoreSchema::new("people", "id"));
        let client = StorageClient::new(Location::File(path.clone()), v1);
        client.put("people", json!({"id": "p1", "email": "a@x"})).await.unwrap();
        client.put("people", json!({"id": "p2", "email": "a@x"})).await.unwrap();
        drop(client);

        let v2 = DatabaseSchema::new("qa", 2)
            .store(StoreSchema::new("people", "id").index(IndexSchema::unique("by_email", "email")));
        let client = StorageClient::new(Location::File(path), v2);
        let err = client.open().await.unwrap_err();
        assert!(matches!(err, StorageError::StorageUnavailable(ref m) if m.contains("UNIQUE")), "{err}");
        assert!(!client.is_open());
    }
}
