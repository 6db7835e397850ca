//! User accounts

use chrono::{DateTime, Utc};
use quorum_repo::{validate, Entity, Key, ValidationResult};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub const BY_USERNAME: &str = "by_username";

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Member,
    Moderator,
    Admin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Member => "member",
            Role::Moderator => "moderator",
            Role::Admin => "admin",
        }
    }

    /// May edit and delete content written by others
    pub fn is_elevated(&self) -> bool {
        *self >= Role::Moderator
    }
}

impl std::str::FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "member" => Ok(Role::Member),
            "moderator" => Ok(Role::Moderator),
            "admin" => Ok(Role::Admin),
            _ => Err(format!("Unknown role: {}", s)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: String,
    pub username: String,
    pub display_name: String,
    pub role: Role,
    pub created_at: DateTime<Utc>,
}

impl User {
    pub fn new(username: impl Into<String>, display_name: impl Into<String>, role: Role) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            username: username.into().trim().to_string(),
            display_name: display_name.into().trim().to_string(),
            role,
            created_at: Utc::now(),
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = id.into();
        self
    }

    /// The user wrote the record or holds an elevated role.
    pub fn can_modify(&self, owner_id: &str) -> bool {
        self.id == owner_id || self.role.is_elevated()
    }
}

impl Entity for User {
    const STORE: &'static str = "users";

    fn key(&self) -> Option<Key> {
        Some(Key::from(&self.id))
    }

    fn validate(&self) -> ValidationResult {
        validate::identifier("id", &self.id)?;
        validate::min_chars("username", &self.username, 3)?;
        validate::max_chars("username", &self.username, 32)?;
        validate::charset("username", &self.username, |c| {
            c.is_ascii_alphanumeric() || c == '_' || c == '-'
        })?;
        validate::text("displayName", &self.display_name, 64)
    }
}
