use quorum_storage::Key;
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::validate::ValidationResult;

/// A record type owned by exactly one store.
pub trait Entity: Serialize + DeserializeOwned + Send + Sync + 'static {
    /// Store holding every record of this type
    const STORE: &'static str;

    /// Index over the parent's id, used by `Repository::get_by_parent`
    const PARENT_INDEX: Option<&'static str> = None;

    /// Primary key, or `None` when the store assigns one.
    fn key(&self) -> Option<Key>;

    /// Receive a key assigned by the store.
    fn assign_key(&mut self, _key: Key) {}

    fn validate(&self) -> ValidationResult;
}
