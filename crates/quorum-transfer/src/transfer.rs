//! Export and import across registered stores

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::str::FromStr;
use std::sync::Arc;

use crate::document::{parse_records, ExportDocument};
use crate::error::TransferError;
use crate::target::TransferTarget;
use crate::Result;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImportMode {
    /// Clear every registered store first
    #[default]
    Replace,
    /// Keep existing records; same key overwrites
    Merge,
}

impl ImportMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ImportMode::Replace => "replace",
            ImportMode::Merge => "merge",
        }
    }
}

impl FromStr for ImportMode {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "replace" => Ok(ImportMode::Replace),
            "merge" => Ok(ImportMode::Merge),
            _ => Err(format!("Unknown import mode: {}", s)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportReport {
    pub mode: ImportMode,
    pub imported: BTreeMap<String, usize>,
    pub skipped_stores: Vec<String>,
}

impl ImportReport {
    fn new(mode: ImportMode) -> Self {
        Self {
            mode,
            imported: BTreeMap::new(),
            skipped_stores: Vec::new(),
        }
    }

    pub fn total(&self) -> usize {
        self.imported.values().sum()
    }
}

#[derive(Clone, Default)]
pub struct Transfer {
    targets: Vec<Arc<dyn TransferTarget>>,
}

impl Transfer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(mut self, target: impl TransferTarget + 'static) -> Self {
        self.targets.push(Arc::new(target));
        self
    }

    pub fn store_names(&self) -> Vec<&'static str> {
        self.targets.iter().map(|t| t.store()).collect()
    }

    /// Read every registered store. Writes nothing.
    pub async fn export(&self) -> Result<ExportDocument> {
        let mut stores = BTreeMap::new();
        for target in &self.targets {
            stores.insert(target.store().to_string(), target.export_records().await?);
        }

        let document = ExportDocument::new(stores);
        tracing::info!(
            stores = self.targets.len(),
            records = document.record_count(),
            "Exported data"
        );
        Ok(document)
    }

    pub async fn export_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(&self.export().await?.to_value())?)
    }

    pub async fn import(&self, document: &Value, mode: ImportMode) -> Result<ImportReport> {
        let document = ExportDocument::parse(document)?;
        self.import_document(&document, mode).await
    }

    pub async fn import_json(&self, json: &str, mode: ImportMode) -> Result<ImportReport> {
        let value: Value = serde_json::from_str(json)
            .map_err(|e| TransferError::InvalidFormat(e.to_string()))?;
        self.import(&value, mode).await
    }

    /// Not atomic: on a failing record, everything written before it stays.
    pub async fn import_document(
        &self,
        document: &ExportDocument,
        mode: ImportMode,
    ) -> Result<ImportReport> {
        document.verify()?;

        let mut report = ImportReport::new(mode);
        for store in document.stores.keys() {
            if self.find(store).is_none() {
                tracing::warn!(store = %store, "Skipping unknown store in import");
                report.skipped_stores.push(store.clone());
            }
        }

        if mode == ImportMode::Replace {
            for target in &self.targets {
                target.clear().await?;
            }
        }

        for target in &self.targets {
            let records = document.records(target.store());
            let written = write_records(target.as_ref(), records).await?;
            report.imported.insert(target.store().to_string(), written);
        }

        tracing::info!(
            mode = mode.as_str(),
            records = report.total(),
            skipped = report.skipped_stores.len(),
            "Imported data"
        );
        Ok(report)
    }

    /// One store as a bare array of records.
    pub async fn export_store(&self, store: &str) -> Result<Vec<Value>> {
        let target = self.require(store)?;
        Ok(target.export_records().await?)
    }

    pub async fn import_store(
        &self,
        store: &str,
        records: &Value,
        mode: ImportMode,
    ) -> Result<usize> {
        let target = self.require(store)?;
        let records = parse_records(store, records)?;

        if mode == ImportMode::Replace {
            target.clear().await?;
        }
        let written = write_records(target, &records).await?;

        tracing::info!(store = %store, mode = mode.as_str(), records = written, "Imported store");
        Ok(written)
    }

    fn find(&self, store: &str) -> Option<&dyn TransferTarget> {
        self.targets
            .iter()
            .find(|t| t.store() == store)
            .map(|t| t.as_ref())
    }

    fn require(&self, store: &str) -> Result<&dyn TransferTarget> {
        self.find(store)
            .ok_or_else(|| TransferError::UnknownStore(store.to_string()))
    }
}

async fn write_records(target: &dyn TransferTarget, records: &[Value]) -> Result<usize> {
    for (index, record) in records.iter().enumerate() {
        target
            .import_record(record.clone())
            .await
            .map_err(|source| TransferError::Record {
                store: target.store().to_string(),
                index,
                source,
            })?;
    }
    Ok(records.len())
}
