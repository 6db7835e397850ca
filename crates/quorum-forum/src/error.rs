//! Forum error types

use quorum_repo::RepositoryError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ForumError {
    #[error("User not found: {0}")]
    UserNotFound(String),

    #[error("Question not found: {0}")]
    QuestionNotFound(String),

    #[error("Answer not found: {0}")]
    AnswerNotFound(String),

    #[error("Username already taken: {0}")]
    UsernameTaken(String),

    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    #[error(transparent)]
    Repository(#[from] RepositoryError),
}
