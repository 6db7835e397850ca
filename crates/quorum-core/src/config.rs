//! Application configuration

use quorum_storage::Location;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

pub const DATABASE_FILE: &str = "quorum.db";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    /// Directory holding the database, `None` for an in-memory database
    pub data_dir: Option<PathBuf>,
    /// Database file name inside `data_dir`
    pub database_file: String,
}

impl Config {
    pub fn new(data_dir: PathBuf) -> Self {
        Self {
            data_dir: Some(data_dir),
            database_file: DATABASE_FILE.to_string(),
        }
    }

    /// Nothing touches disk; data is gone with the process.
    pub fn in_memory() -> Self {
        Self {
            data_dir: None,
            database_file: DATABASE_FILE.to_string(),
        }
    }

    pub fn default_data_dir() -> PathBuf {
        dirs::data_local_dir()
            .map(|d| d.join("Quorum"))
            .unwrap_or_else(|| PathBuf::from(".quorum"))
    }

    pub fn database_path(&self) -> Option<PathBuf> {
        self.data_dir
            .as_ref()
            .map(|dir| dir.join(&self.database_file))
    }

    pub fn location(&self) -> Location {
        match self.database_path() {
            Some(path) => Location::File(path),
            None => Location::Memory,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::new(Self::default_data_dir())
    }
}
