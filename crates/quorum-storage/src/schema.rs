//! Store and index declarations

use serde::{Deserialize, Serialize};

use crate::error::StorageError;
use crate::Result;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexSchema {
    pub name: String,
    /// Dotted path of the indexed field, e.g. `questionId` or `meta.owner`
    pub key_path: String,
    pub unique: bool,
}

impl IndexSchema {
    pub fn new(name: impl Into<String>, key_path: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            key_path: key_path.into(),
            unique: false,
        }
    }

    pub fn unique(name: impl Into<String>, key_path: impl Into<String>) -> Self {
        Self {
            unique: true,
            ..Self::new(name, key_path)
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreSchema {
    pub name: String,
    /// Top-level field holding the primary key
    pub key_path: String,
    /// Assign integer keys to records that arrive without one
    pub auto_increment: bool,
    pub indexes: Vec<IndexSchema>,
}

impl StoreSchema {
    pub fn new(name: impl Into<String>, key_path: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            key_path: key_path.into(),
            auto_increment: false,
            indexes: Vec::new(),
        }
    }

    pub fn auto_increment(mut self) -> Self {
        self.auto_increment = true;
        self
    }

    pub fn index(mut self, index: IndexSchema) -> Self {
        self.indexes.push(index);
        self
    }

    pub fn find_index(&self, name: &str) -> Result<&IndexSchema> {
        self.indexes
            .iter()
            .find(|i| i.name == name)
            .ok_or_else(|| {
                StorageError::NotFound(format!("index '{}' on store '{}'", name, self.name))
            })
    }

    pub(crate) fn table_name(&self) -> String {
        format!("\"store_{}\"", self.name)
    }

    pub(crate) fn index_name(&self, index: &IndexSchema) -> String {
        format!("\"idx_{}_{}\"", self.name, index.name)
    }
}

/// Extraction expression for a dotted key path inside the `doc` column.
pub(crate) fn json_expr(key_path: &str) -> String {
    format!("json_extract(doc, '$.{key_path}')")
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatabaseSchema {
    pub name: String,
    pub version: u32,
    pub stores: Vec<StoreSchema>,
}

impl DatabaseSchema {
    pub fn new(name: impl Into<String>, version: u32) -> Self {
        Self {
            name: name.into(),
            version,
            stores: Vec::new(),
        }
    }

    pub fn store(mut self, store: StoreSchema) -> Self {
        self.stores.push(store);
        self
    }

    pub fn stores(mut self, stores: impl IntoIterator<Item = StoreSchema>) -> Self {
        self.stores.extend(stores);
        self
    }

    pub fn find_store(&self, name: &str) -> Result<&StoreSchema> {
        self.stores
            .iter()
            .find(|s| s.name == name)
            .ok_or_else(|| StorageError::NotFound(format!("store '{name}'")))
    }

    pub fn store_names(&self) -> Vec<String> {
        self.stores.iter().map(|s| s.name.clone()).collect()
    }

    /// Names end up in SQL identifiers and JSON paths, so they are restricted.
    pub fn validate(&self) -> Result<()> {
        if self.version == 0 {
            return Err(StorageError::InvalidSchema(
                "schema version must be at least 1".to_string(),
            ));
        }

        let mut seen = std::collections::HashSet::new();
        for store in &self.stores {
            check_identifier("store", &store.name)?;
            check_identifier("key path", &store.key_path)?;
            if !seen.insert(store.name.as_str()) {
                return Err(StorageError::InvalidSchema(format!(
                    "store '{}' declared twice",
                    store.name
                )));
            }

            let mut index_names = std::collections::HashSet::new();
            for index in &store.indexes {
                check_identifier("index", &index.name)?;
                for part in index.key_path.split('.') {
                    check_identifier("index key path", part)?;
                }
                if !index_names.insert(index.name.as_str()) {
                    return Err(StorageError::InvalidSchema(format!(
                        "index '{}' declared twice on store '{}'",
                        index.name, store.name
                    )));
                }
            }
        }
        Ok(())
    }
}

fn check_identifier(kind: &str, name: &str) -> Result<()> {
    let mut chars = name.chars();
    let valid = match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {
            chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
        }
        _ => false,
    };

    if valid {
        Ok(())
    } else {
        Err(StorageError::InvalidSchema(format!(
            "invalid {kind} name '{name}'"
        )))
    }
}
