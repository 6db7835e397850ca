//! Application context
//!
//! One explicitly owned value holding the storage client and every service
//! built on it. Clone it to share; clones use the same connection.

use std::fmt::Display;
use std::future::Future;
use std::path::Path;

use quorum_forum::ForumService;
use quorum_inventory::Inventory;
use quorum_storage::StorageClient;
use quorum_transfer::{ExportDocument, ImportMode, ImportReport, Transfer};

use crate::config::Config;
use crate::error::CoreError;
use crate::outcome::OperationResult;
use crate::schema::database_schema;
use crate::Result;

#[derive(Clone)]
pub struct App {
    config: Config,
    client: StorageClient,
    forum: ForumService,
    inventory: Inventory,
    transfer: Transfer,
}

impl App {
    /// Create the data directory if needed and open the database.
    pub async fn open(config: Config) -> Result<Self> {
        let file = config.database_file.trim();
        if file.is_empty() || file.contains(['/', '\\']) {
            return Err(CoreError::Config(format!(
                "database file must be a plain file name, got '{}'",
                config.database_file
            )));
        }

        if let Some(dir) = &config.data_dir {
            tokio::fs::create_dir_all(dir).await?;
        }

        let client = StorageClient::new(config.location(), database_schema());
        client.open().await?;

        let forum = ForumService::new(client.clone());
        let inventory = Inventory::new(client.clone());
        let transfer = Transfer::new()
            .register(forum.users().clone())
            .register(forum.questions().clone())
            .register(forum.answers().clone())
            .register(forum.votes().clone())
            .register(inventory.items().clone());

        tracing::info!(location = ?client.location(), "Application ready");

        Ok(Self {
            config,
            client,
            forum,
            inventory,
            transfer,
        })
    }

    pub async fn in_memory() -> Result<Self> {
        Self::open(Config::in_memory()).await
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn client(&self) -> &StorageClient {
        &self.client
    }

    pub fn forum(&self) -> &ForumService {
        &self.forum
    }

    pub fn inventory(&self) -> &Inventory {
        &self.inventory
    }

    pub fn transfer(&self) -> &Transfer {
        &self.transfer
    }

    pub async fn export_to_file(&self, path: &Path) -> Result<ExportDocument> {
        let document = self.transfer.export().await?;
        let json = serde_json::to_string_pretty(&document.to_value())
            .map_err(quorum_transfer::TransferError::from)?;
        tokio::fs::write(path, json).await?;

        tracing::info!(path = %path.display(), records = document.record_count(), "Wrote export");

        Ok(document)
    }

    pub async fn import_from_file(&self, path: &Path, mode: ImportMode) -> Result<ImportReport> {
        let json = tokio::fs::read_to_string(path).await?;
        Ok(self.transfer.import_json(&json, mode).await?)
    }

    /// Empty every store. Key generators keep their position.
    pub async fn clear_all(&self) -> Result<()> {
        for store in self.client.store_names() {
            self.client.clear(&store).await?;
        }
        tracing::info!("Cleared all stores");
        Ok(())
    }

    /// Run an operation for a caller that only needs a notification line.
    pub async fn perform<T, E, F>(&self, operation: &str, fut: F) -> OperationResult<T>
    where
        E: Display,
        F: Future<Output = std::result::Result<T, E>>,
    {
        OperationResult::capture(operation, fut.await)
    }
}
