//! Vote ledger records
//!
//! A vote is keyed by (user, target type, target id), so the primary key
//! alone guarantees one vote per user per target.

use chrono::{DateTime, Utc};
use quorum_repo::{validate, Entity, Key, ValidationError, ValidationResult};
use serde::{Deserialize, Serialize};

pub const BY_USER: &str = "by_user";
pub const BY_TARGET: &str = "by_target";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TargetType {
    Question,
    Answer,
}

impl TargetType {
    pub fn as_str(&self) -> &'static str {
        match self {
            TargetType::Question => "question",
            TargetType::Answer => "answer",
        }
    }
}

impl std::fmt::Display for TargetType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for TargetType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "question" => Ok(TargetType::Question),
            "answer" => Ok(TargetType::Answer),
            _ => Err(format!("Unknown vote target: {}", s)),
        }
    }
}

/// +1 or -1, stored as a plain integer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "i64")]
pub enum VoteValue {
    Up,
    Down,
}

impl VoteValue {
    pub fn as_i64(&self) -> i64 {
        match self {
            VoteValue::Up => 1,
            VoteValue::Down => -1,
        }
    }
}

impl From<VoteValue> for i64 {
    fn from(value: VoteValue) -> Self {
        value.as_i64()
    }
}

impl TryFrom<i64> for VoteValue {
    type Error = ValidationError;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(VoteValue::Up),
            -1 => Ok(VoteValue::Down),
            _ => Err(ValidationError::new("value", format!("must be 1 or -1, got {value}"))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Vote {
    pub id: String,
    pub user_id: String,
    pub target_type: TargetType,
    pub target_id: String,
    pub value: VoteValue,
    pub created_at: DateTime<Utc>,
}

impl Vote {
    pub fn new(
        user_id: impl Into<String>,
        target_type: TargetType,
        target_id: impl Into<String>,
        value: VoteValue,
    ) -> Self {
        let user_id = user_id.into();
        let target_id = target_id.into();

        Self {
            id: Self::composite_id(&user_id, target_type, &target_id),
            user_id,
            target_type,
            target_id,
            value,
            created_at: Utc::now(),
        }
    }

    /// Unambiguous only for ids free of the separator, which validation enforces.
    pub fn composite_id(user_id: &str, target_type: TargetType, target_id: &str) -> String {
        let sep = validate::ID_SEPARATOR;
        format!("{}{sep}{}{sep}{}", user_id, target_type.as_str(), target_id)
    }
}

impl Entity for Vote {
    const STORE: &'static str = "votes";

    fn key(&self) -> Option<Key> {
        Some(Key::from(&self.id))
    }

    fn validate(&self) -> ValidationResult {
        validate::identifier("userId", &self.user_id)?;
        validate::identifier("targetId", &self.target_id)?;
        if self.id != Self::composite_id(&self.user_id, self.target_type, &self.target_id) {
            return Err(ValidationError::new(
                "id",
                "must be userId:targetType:targetId",
            ));
        }
        Ok(())
    }
}
