//! Item data structure

use chrono::{DateTime, Utc};
use quorum_repo::{validate, Entity, Key, ValidationResult};
use serde::{Deserialize, Serialize};

pub const BY_CATEGORY: &str = "by_category";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Item {
    /// Assigned by the store on first insert
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    pub name: String,
    pub category: String,
    #[serde(default)]
    pub quantity: u32,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
    pub added_at: DateTime<Utc>,
}

impl Item {
    pub fn new(name: impl Into<String>, category: impl Into<String>, quantity: u32) -> Self {
        Self {
            id: None,
            name: name.into().trim().to_string(),
            category: normalize_category(&category.into()),
            quantity,
            location: None,
            notes: None,
            added_at: Utc::now(),
        }
    }

    pub fn with_location(mut self, location: impl Into<String>) -> Self {
        self.location = normalize_optional(Some(location.into()));
        self
    }

    pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = normalize_optional(Some(notes.into()));
        self
    }
}

pub fn normalize_category(category: &str) -> String {
    category.trim().to_lowercase()
}

fn normalize_optional(value: Option<String>) -> Option<String> {
    value
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

impl Entity for Item {
    const STORE: &'static str = "items";

    fn key(&self) -> Option<Key> {
        self.id.map(Key::Int)
    }

    fn assign_key(&mut self, key: Key) {
        self.id = key.as_i64();
    }

    fn validate(&self) -> ValidationResult {
        validate::text("name", &self.name, 120)?;
        validate::text("category", &self.category, 60)?;
        if let Some(location) = &self.location {
            validate::max_chars("location", location, 120)?;
        }
        if let Some(notes) = &self.notes {
            validate::max_chars("notes", notes, 2_000)?;
        }
        Ok(())
    }
}
