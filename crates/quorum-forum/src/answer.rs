use chrono::{DateTime, Utc};
use quorum_repo::{validate, Entity, Key, ValidationResult};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::question::MAX_BODY_CHARS;

pub const BY_QUESTION: &str = "by_question";
pub const BY_AUTHOR: &str = "by_author";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Answer {
    pub id: String,
    pub question_id: String,
    pub author_id: String,
    pub body: String,
    #[serde(default)]
    pub votes_score: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Answer {
    pub fn new(
        question_id: impl Into<String>,
        author_id: impl Into<String>,
        body: impl Into<String>,
    ) -> Self {
        let now = Utc::now();

        Self {
            id: Uuid::new_v4().to_string(),
            question_id: question_id.into(),
            author_id: author_id.into(),
            body: body.into().trim().to_string(),
            votes_score: 0,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = id.into();
        self
    }

    pub fn edit(&mut self, body: impl Into<String>) {
        self.body = body.into().trim().to_string();
        self.updated_at = Utc::now();
    }
}

impl Entity for Answer {
    const STORE: &'static str = "answers";
    const PARENT_INDEX: Option<&'static str> = Some(BY_QUESTION);

    fn key(&self) -> Option<Key> {
        Some(Key::from(&self.id))
    }

    fn validate(&self) -> ValidationResult {
        validate::identifier("id", &self.id)?;
        validate::identifier("questionId", &self.question_id)?;
        validate::identifier("authorId", &self.author_id)?;
        validate::text("body", &self.body, MAX_BODY_CHARS)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_and_edit() {
        let mut answer = Answer::new("q1", "u1", "  Use a reference.  ");
        assert_eq!(answer.body, "Use a reference.");
        assert!(answer.validate().is_ok());

        answer.edit("");
        assert_eq!(answer.validate().unwrap_err().field, "body");
    }
}
