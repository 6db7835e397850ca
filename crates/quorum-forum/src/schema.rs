use quorum_repo::Entity;
use quorum_storage::{IndexSchema, StoreSchema};

use crate::answer::{self, Answer};
use crate::question::{self, Question};
use crate::user::{self, User};
use crate::vote::{self, Vote};

/// Stores used by the forum, parents before children.
pub fn stores() -> Vec<StoreSchema> {
    vec![
        StoreSchema::new(User::STORE, "id").index(IndexSchema::unique(user::BY_USERNAME, "username")),
        StoreSchema::new(Question::STORE, "id").index(IndexSchema::new(question::BY_AUTHOR, "authorId")),
        StoreSchema::new(Answer::STORE, "id")
            .index(IndexSchema::new(answer::BY_QUESTION, "questionId"))
            .index(IndexSchema::new(answer::BY_AUTHOR, "authorId")),
        StoreSchema::new(Vote::STORE, "id")
            .index(IndexSchema::new(vote::BY_USER, "userId"))
            .index(IndexSchema::new(vote::BY_TARGET, "targetId")),
    ]
}
