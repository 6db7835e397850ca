//! Generic repository
//!
//! The only path from domain code to a store. Does not cascade.

use quorum_storage::{Key, KeyRange, StorageClient};
use serde_json::Value;
use std::marker::PhantomData;

use crate::entity::Entity;
use crate::error::RepositoryError;
use crate::Result;

pub struct Repository<E: Entity> {
    client: StorageClient,
    _entity: PhantomData<fn() -> E>,
}

impl<E: Entity> Repository<E> {
    pub fn new(client: StorageClient) -> Self {
        Self {
            client,
            _entity: PhantomData,
        }
    }

    pub fn store(&self) -> &'static str {
        E::STORE
    }

    pub fn client(&self) -> &StorageClient {
        &self.client
    }

    /// Validate and insert. An existing key is a `Duplicate` error.
    pub async fn create(&self, mut entity: E) -> Result<E> {
        entity.validate()?;
        let key = self.client.add(E::STORE, encode(&entity)?).await?;
        entity.assign_key(key);
        Ok(entity)
    }

    /// Validate and insert or replace.
    pub async fn save(&self, mut entity: E) -> Result<E> {
        entity.validate()?;
        let key = self.client.put(E::STORE, encode(&entity)?).await?;
        entity.assign_key(key);
        Ok(entity)
    }

    /// Full replace of an existing record.
    pub async fn update(&self, entity: E) -> Result<E> {
        entity.validate()?;
        let key = entity.key().ok_or_else(|| self.not_found("<unassigned>"))?;
        if self.client.get(E::STORE, key.clone()).await?.is_none() {
            return Err(self.not_found(&key.to_string()));
        }
        self.client.put(E::STORE, encode(&entity)?).await?;
        Ok(entity)
    }

    pub async fn get_by_id(&self, id: impl Into<Key>) -> Result<Option<E>> {
        self.client
            .get(E::STORE, id)
            .await?
            .map(decode::<E>)
            .transpose()
    }

    /// Like `get_by_id`, but a missing record is a `NotFound` error.
    pub async fn require(&self, id: impl Into<Key>) -> Result<E> {
        let key = id.into();
        self.get_by_id(key.clone())
            .await?
            .ok_or_else(|| self.not_found(&key.to_string()))
    }

    pub async fn get_all(&self) -> Result<Vec<E>> {
        decode_all(self.client.get_all(E::STORE, None, None).await?)
    }

    pub async fn get_by_index(&self, index: &str, value: impl Into<Key>) -> Result<Vec<E>> {
        decode_all(
            self.client
                .query(E::STORE, index, KeyRange::only(value))
                .await?,
        )
    }

    pub async fn get_by_range(&self, index: &str, range: KeyRange) -> Result<Vec<E>> {
        decode_all(self.client.query(E::STORE, index, range).await?)
    }

    pub async fn find_one_by_index(&self, index: &str, value: impl Into<Key>) -> Result<Option<E>> {
        Ok(self.get_by_index(index, value).await?.into_iter().next())
    }

    /// Children of a parent record via the entity's parent index.
    pub async fn get_by_parent(&self, parent_id: impl Into<Key>) -> Result<Vec<E>> {
        let index = E::PARENT_INDEX.ok_or_else(|| {
            RepositoryError::Storage(quorum_storage::StorageError::NotFound(format!(
                "store '{}' has no parent index",
                E::STORE
            )))
        })?;
        self.get_by_index(index, parent_id).await
    }

    /// Decode a raw record and save it through the validating path.
    pub async fn save_value(&self, value: Value) -> Result<E> {
        self.save(decode::<E>(value)?).await
    }

    /// Raw stored documents, without decoding.
    pub async fn get_all_values(&self) -> Result<Vec<Value>> {
        Ok(self.client.get_all(E::STORE, None, None).await?)
    }

    pub async fn count(&self) -> Result<u64> {
        Ok(self.client.count(E::STORE, None, None).await?)
    }

    pub async fn delete(&self, id: impl Into<Key>) -> Result<()> {
        Ok(self.client.delete(E::STORE, id).await?)
    }

    pub async fn delete_all(&self) -> Result<()> {
        self.client.clear(E::STORE).await?;
        tracing::info!(store = E::STORE, "Cleared store");
        Ok(())
    }

    fn not_found(&self, key: &str) -> RepositoryError {
        RepositoryError::NotFound {
            store: E::STORE.to_string(),
            key: key.to_string(),
        }
    }
}

impl<E: Entity> Clone for Repository<E> {
    fn clone(&self) -> Self {
        Self::new(self.client.clone())
    }
}

fn encode<E: Entity>(entity: &E) -> Result<Value> {
    serde_json::to_value(entity).map_err(RepositoryError::Encode)
}

fn decode<E: Entity>(value: Value) -> Result<E> {
    serde_json::from_value(value).map_err(|source| RepositoryError::Decode {
        store: E::STORE.to_string(),
        source,
    })
}

fn decode_all<E: Entity>(values: Vec<Value>) -> Result<Vec<E>> {
    values.into_iter().map(decode::<E>).collect()
}
