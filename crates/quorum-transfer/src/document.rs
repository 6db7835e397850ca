//! Export document format
//!
//! ```json
//! { "version": "1.0", "exportedAt": "...", "checksum": "...", "<store>": [ ... ] }
//! ```

use chrono::{DateTime, Utc};
use serde_json::{Map, Value};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;

use crate::error::TransferError;
use crate::Result;

pub const FORMAT_VERSION: &str = "1.0";

const VERSION_KEY: &str = "version";
const EXPORTED_AT_KEY: &str = "exportedAt";
const CHECKSUM_KEY: &str = "checksum";

#[derive(Debug, Clone, PartialEq)]
pub struct ExportDocument {
    pub version: String,
    pub exported_at: DateTime<Utc>,
    /// SHA-256 of the compact JSON of `stores`
    pub checksum: Option<String>,
    pub stores: BTreeMap<String, Vec<Value>>,
}

impl ExportDocument {
    pub fn new(stores: BTreeMap<String, Vec<Value>>) -> Self {
        Self {
            version: FORMAT_VERSION.to_string(),
            exported_at: Utc::now(),
            checksum: Some(checksum(&stores)),
            stores,
        }
    }

    pub fn records(&self, store: &str) -> &[Value] {
        self.stores.get(store).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn record_count(&self) -> usize {
        self.stores.values().map(Vec::len).sum()
    }

    pub fn to_value(&self) -> Value {
        let mut map = Map::new();
        map.insert(VERSION_KEY.into(), Value::from(self.version.as_str()));
        map.insert(
            EXPORTED_AT_KEY.into(),
            Value::from(self.exported_at.to_rfc3339()),
        );
        if let Some(checksum) = &self.checksum {
            map.insert(CHECKSUM_KEY.into(), Value::from(checksum.as_str()));
        }
        for (store, records) in &self.stores {
            map.insert(store.clone(), Value::Array(records.clone()));
        }
        Value::Object(map)
    }

    /// Check the whole shape before anything is written.
    pub fn parse(value: &Value) -> Result<Self> {
        let map = value
            .as_object()
            .ok_or_else(|| invalid("expected a JSON object at the top level"))?;

        let version = match map.get(VERSION_KEY) {
            Some(Value::String(v)) => v.clone(),
            Some(_) => return Err(invalid("version must be a string")),
            None => return Err(invalid("missing version tag")),
        };
        if version.split('.').next() != FORMAT_VERSION.split('.').next() {
            return Err(invalid(&format!("unsupported format version {version}")));
        }

        let exported_at = match map.get(EXPORTED_AT_KEY) {
            Some(Value::String(ts)) => DateTime::parse_from_rfc3339(ts)
                .map(|dt| dt.with_timezone(&Utc))
                .map_err(|e| invalid(&format!("exportedAt is not a timestamp: {e}")))?,
            Some(_) => return Err(invalid("exportedAt must be a string")),
            None => return Err(invalid("missing exportedAt")),
        };

        let checksum = match map.get(CHECKSUM_KEY) {
            Some(Value::String(c)) => Some(c.clone()),
            Some(Value::Null) | None => None,
            Some(_) => return Err(invalid("checksum must be a string")),
        };

        let mut stores = BTreeMap::new();
        for (key, value) in map {
            if matches!(key.as_str(), VERSION_KEY | EXPORTED_AT_KEY | CHECKSUM_KEY) {
                continue;
            }
            stores.insert(key.clone(), parse_records(key, value)?);
        }

        let document = Self {
            version,
            exported_at,
            checksum,
            stores,
        };
        document.verify()?;
        Ok(document)
    }

    pub fn verify(&self) -> Result<()> {
        match &self.checksum {
            Some(expected) if *expected != checksum(&self.stores) => {
                Err(invalid("checksum does not match the exported records"))
            }
            _ => Ok(()),
        }
    }
}

/// A bare array of records, as written by a single-store export.
pub fn parse_records(store: &str, value: &Value) -> Result<Vec<Value>> {
    let records = value
        .as_array()
        .ok_or_else(|| invalid(&format!("'{store}' must be an array of records")))?;
    if let Some(position) = records.iter().position(|r| !r.is_object()) {
        return Err(invalid(&format!(
            "'{store}' entry {position} is not a record object"
        )));
    }
    Ok(records.clone())
}

pub fn checksum(stores: &BTreeMap<String, Vec<Value>>) -> String {
    let mut hasher = Sha256::new();
    // Object keys serialize in sorted order, so this is stable.
    match serde_json::to_vec(stores) {
        Ok(bytes) => hasher.update(&bytes),
        Err(e) => tracing::warn!("Could not serialize records for checksum: {}", e),
    }

    let digest = hasher.finalize();
    let mut out = String::with_capacity(digest.len() * 2);
    for b in digest {
        out.push_str(&format!("{:02x}", b));
    }
    out
}

fn invalid(reason: &str) -> TransferError {
    TransferError::InvalidFormat(reason.to_string())
}
