//! Stores that take part in export and import

use futures_util::future::{BoxFuture, FutureExt};
use quorum_repo::{Entity, Repository};
use serde_json::Value;

/// One store, seen as raw records.
pub trait TransferTarget: Send + Sync {
    fn store(&self) -> &'static str;

    fn export_records(&self) -> BoxFuture<'_, quorum_repo::Result<Vec<Value>>>;

    /// Write one record through the validating path. Same key overwrites.
    fn import_record(&self, record: Value) -> BoxFuture<'_, quorum_repo::Result<()>>;

    fn clear(&self) -> BoxFuture<'_, quorum_repo::Result<()>>;
}

impl<E: Entity> TransferTarget for Repository<E> {
    fn store(&self) -> &'static str {
        E::STORE
    }

    fn export_records(&self) -> BoxFuture<'_, quorum_repo::Result<Vec<Value>>> {
        self.get_all_values().boxed()
    }

    fn import_record(&self, record: Value) -> BoxFuture<'_, quorum_repo::Result<()>> {
        async move { self.save_value(record).await.map(|_| ()) }.boxed()
    }

    fn clear(&self) -> BoxFuture<'_, quorum_repo::Result<()>> {
        self.delete_all().boxed()
    }
}
