//! Questions

use chrono::{DateTime, Utc};
use quorum_repo::{validate, Entity, Key, ValidationResult};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub const BY_AUTHOR: &str = "by_author";

pub const MAX_TITLE_CHARS: usize = 200;
pub const MAX_BODY_CHARS: usize = 20_000;
pub const MAX_TAGS: usize = 5;
pub const MAX_TAG_CHARS: usize = 32;

/// Caller-supplied question content.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QuestionDraft {
    pub title: String,
    pub body: String,
    #[serde(default)]
    pub tags: Vec<String>,
}

impl QuestionDraft {
    pub fn new(title: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            body: body.into(),
            tags: Vec::new(),
        }
    }

    pub fn with_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags = tags.into_iter().map(Into::into).collect();
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Question {
    pub id: String,
    pub author_id: String,
    pub title: String,
    pub body: String,
    #[serde(default)]
    pub tags: Vec<String>,
    /// Sum of vote values, cached on the record
    #[serde(default)]
    pub votes_score: i64,
    #[serde(default)]
    pub accepted_answer_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Question {
    pub fn new(author_id: impl Into<String>, draft: QuestionDraft) -> Self {
        let now = Utc::now();

        let mut question = Self {
            id: Uuid::new_v4().to_string(),
            author_id: author_id.into(),
            title: String::new(),
            body: String::new(),
            tags: Vec::new(),
            votes_score: 0,
            accepted_answer_id: None,
            created_at: now,
            updated_at: now,
        };
        question.apply(draft);
        question.updated_at = now;
        question
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = id.into();
        self
    }

    /// Replace the editable content. Tags are trimmed, lowercased and deduplicated.
    pub fn apply(&mut self, draft: QuestionDraft) {
        self.title = draft.title.trim().to_string();
        self.body = draft.body.trim().to_string();

        let mut tags: Vec<String> = Vec::new();
        for tag in draft.tags {
            let tag = tag.trim().to_lowercase();
            if !tag.is_empty() && !tags.contains(&tag) {
                tags.push(tag);
            }
        }
        self.tags = tags;
        self.updated_at = Utc::now();
    }
}

impl Entity for Question {
    const STORE: &'static str = "questions";

    fn key(&self) -> Option<Key> {
        Some(Key::from(&self.id))
    }

    fn validate(&self) -> ValidationResult {
        validate::identifier("id", &self.id)?;
        validate::identifier("authorId", &self.author_id)?;
        validate::text("title", &self.title, MAX_TITLE_CHARS)?;
        validate::text("body", &self.body, MAX_BODY_CHARS)?;
        validate::max_items("tags", &self.tags, MAX_TAGS)?;
        for tag in &self.tags {
            validate::text("tags", tag, MAX_TAG_CHARS)?;
        }
        Ok(())
    }
}
