//! Quorum Forum
//!
//! Users ask questions, post answers and vote on both. Each question and
//! answer caches the sum of its votes; the vote ledger is the source of
//! that sum.

mod answer;
mod error;
mod question;
pub mod schema;
mod service;
mod user;
mod vote;

pub use answer::Answer;
pub use error::ForumError;
pub use question::{Question, QuestionDraft};
pub use service::{CascadeReport, ForumService, VoteOutcome};
pub use user::{Role, User};
pub use vote::{TargetType, Vote, VoteValue};

pub type Result<T> = std::result::Result<T, ForumError>;
