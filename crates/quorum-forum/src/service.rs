//! Forum service
//!
//! Owns the invariants that span repositories: the cached vote score on
//! questions and answers, and cascading deletes. Writes are issued one after
//! another; a failure part-way leaves earlier writes in place.

use quorum_repo::{Repository, RepositoryError, StorageClient};

use crate::answer::{self, Answer};
use crate::error::ForumError;
use crate::question::{self, Question, QuestionDraft};
use crate::user::{self, Role, User};
use crate::vote::{self, TargetType, Vote, VoteValue};
use crate::Result;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VoteOutcome {
    /// Cached score of the target after the vote
    pub score: i64,
    /// The user's vote after this call, `None` once retracted
    pub current: Option<VoteValue>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CascadeReport {
    pub answers: usize,
    pub votes: usize,
}

enum Target {
    Question(Question),
    Answer(Answer),
}

impl Target {
    fn score(&self) -> i64 {
        match self {
            Target::Question(q) => q.votes_score,
            Target::Answer(a) => a.votes_score,
        }
    }

    fn set_score(&mut self, score: i64) {
        match self {
            Target::Question(q) => q.votes_score = score,
            Target::Answer(a) => a.votes_score = score,
        }
    }
}

pub struct ForumService {
    users: Repository<User>,
    questions: Repository<Question>,
    answers: Repository<Answer>,
    votes: Repository<Vote>,
}

impl ForumService {
    pub fn new(client: StorageClient) -> Self {
        Self {
            users: Repository::new(client.clone()),
            questions: Repository::new(client.clone()),
            answers: Repository::new(client.clone()),
            votes: Repository::new(client),
        }
    }

    pub fn users(&self) -> &Repository<User> {
        &self.users
    }

    pub fn questions(&self) -> &Repository<Question> {
        &self.questions
    }

    pub fn answers(&self) -> &Repository<Answer> {
        &self.answers
    }

    pub fn votes(&self) -> &Repository<Vote> {
        &self.votes
    }

    // === Users ===

    pub async fn register_user(
        &self,
        username: &str,
        display_name: &str,
        role: Role,
    ) -> Result<User> {
        let user = User::new(username, display_name, role);
        let user = self.users.create(user).await.map_err(|e| match e {
            RepositoryError::Duplicate { .. } => ForumError::UsernameTaken(username.to_string()),
            other => other.into(),
        })?;

        tracing::info!(user_id = %user.id, username = %user.username, "Registered user");

        Ok(user)
    }

    pub async fn user(&self, user_id: &str) -> Result<User> {
        self.users
            .get_by_id(user_id)
            .await?
            .ok_or_else(|| ForumError::UserNotFound(user_id.to_string()))
    }

    pub async fn find_user(&self, username: &str) -> Result<Option<User>> {
        Ok(self
            .users
            .find_one_by_index(user::BY_USERNAME, username.trim())
            .await?)
    }

    // === Questions ===

    pub async fn ask_question(&self, author_id: &str, draft: QuestionDraft) -> Result<Question> {
        let author = self.user(author_id).await?;
        let question = self.questions.create(Question::new(author.id, draft)).await?;

        tracing::info!(question_id = %question.id, author_id = %author_id, "Created question");

        Ok(question)
    }

    pub async fn question(&self, question_id: &str) -> Result<Question> {
        self.questions
            .get_by_id(question_id)
            .await?
            .ok_or_else(|| ForumError::QuestionNotFound(question_id.to_string()))
    }

    /// Newest first.
    pub async fn list_questions(&self) -> Result<Vec<Question>> {
        let mut questions = self.questions.get_all().await?;
        questions.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(questions)
    }

    pub async fn questions_by(&self, author_id: &str) -> Result<Vec<Question>> {
        Ok(self
            .questions
            .get_by_index(question::BY_AUTHOR, author_id)
            .await?)
    }

    pub async fn edit_question(
        &self,
        actor_id: &str,
        question_id: &str,
        draft: QuestionDraft,
    ) -> Result<Question> {
        let actor = self.user(actor_id).await?;
        let mut question = self.question(question_id).await?;
        authorize(&actor, &question.author_id, "edit this question")?;

        question.apply(draft);
        Ok(self.questions.update(question).await?)
    }

    /// Delete a question with its answers and every vote on either.
    pub async fn delete_question(&self, actor_id: &str, question_id: &str) -> Result<CascadeReport> {
        let actor = self.user(actor_id).await?;
        let question = self.question(question_id).await?;
        authorize(&actor, &question.author_id, "delete this question")?;

        let mut report = CascadeReport::default();
        for answer in self.answers.get_by_parent(question.id.as_str()).await? {
            report.votes += self.delete_votes_for(TargetType::Answer, &answer.id).await?;
            self.answers.delete(answer.id.as_str()).await?;
            report.answers += 1;
        }
        report.votes += self
            .delete_votes_for(TargetType::Question, &question.id)
            .await?;
        self.questions.delete(question.id.as_str()).await?;

        tracing::info!(
            question_id = %question_id,
            answers = report.answers,
            votes = report.votes,
            "Deleted question"
        );

        Ok(report)
    }

    // === Answers ===

    pub async fn post_answer(&self, author_id: &str, question_id: &str, body: &str) -> Result<Answer> {
        let author = self.user(author_id).await?;
        let question = self.question(question_id).await?;
        let answer = self
            .answers
            .create(Answer::new(question.id, author.id, body))
            .await?;

        tracing::info!(answer_id = %answer.id, question_id = %question_id, "Posted answer");

        Ok(answer)
    }

    pub async fn answer(&self, answer_id: &str) -> Result<Answer> {
        self.answers
            .get_by_id(answer_id)
            .await?
            .ok_or_else(|| ForumError::AnswerNotFound(answer_id.to_string()))
    }

    pub async fn answers_by(&self, author_id: &str) -> Result<Vec<Answer>> {
        Ok(self.answers.get_by_index(answer::BY_AUTHOR, author_id).await?)
    }

    /// Highest score first, older answers first among equals.
    pub async fn answers_for(&self, question_id: &str) -> Result<Vec<Answer>> {
        let mut answers = self.answers.get_by_parent(question_id).await?;
        answers.sort_by(|a, b| {
            b.votes_score
                .cmp(&a.votes_score)
                .then_with(|| a.created_at.cmp(&b.created_at))
        });
        Ok(answers)
    }

    pub async fn edit_answer(&self, actor_id: &str, answer_id: &str, body: &str) -> Result<Answer> {
        let actor = self.user(actor_id).await?;
        let mut answer = self.answer(answer_id).await?;
        authorize(&actor, &answer.author_id, "edit this answer")?;

        answer.edit(body);
        Ok(self.answers.update(answer).await?)
    }

    pub async fn delete_answer(&self, actor_id: &str, answer_id: &str) -> Result<CascadeReport> {
        let actor = self.user(actor_id).await?;
        let answer = self.answer(answer_id).await?;
        authorize(&actor, &answer.author_id, "delete this answer")?;

        let votes = self.delete_votes_for(TargetType::Answer, &answer.id).await?;
        self.answers.delete(answer.id.as_str()).await?;

        if let Some(mut question) = self.questions.get_by_id(answer.question_id.as_str()).await? {
            if question.accepted_answer_id.as_deref() == Some(answer.id.as_str()) {
                question.accepted_answer_id = None;
                self.questions.update(question).await?;
            }
        }

        tracing::info!(answer_id = %answer_id, votes, "Deleted answer");

        Ok(CascadeReport { answers: 1, votes })
    }

    /// Mark an answer as accepted. Only the question's author or an elevated role may.
    pub async fn accept_answer(&self, actor_id: &str, answer_id: &str) -> Result<Question> {
        let actor = self.user(actor_id).await?;
        let answer = self.answer(answer_id).await?;
        let mut question = self.question(&answer.question_id).await?;
        authorize(&actor, &question.author_id, "accept an answer to this question")?;

        question.accepted_answer_id = Some(answer.id);
        Ok(self.questions.update(question).await?)
    }

    // === Votes ===

    /// Cast, retract or change a vote and return the target's new score.
    ///
    /// The same value twice retracts the vote. A different value replaces it
    /// and moves the score by the difference.
    pub async fn vote(
        &self,
        user_id: &str,
        target_type: TargetType,
        target_id: &str,
        value: VoteValue,
    ) -> Result<VoteOutcome> {
        self.user(user_id).await?;
        let mut target = self.load_target(target_type, target_id).await?;

        let vote_id = Vote::composite_id(user_id, target_type, target_id);
        let existing = self.votes.get_by_id(vote_id.as_str()).await?;

        let (delta, current) = match existing {
            None => {
                self.votes
                    .create(Vote::new(user_id, target_type, target_id, value))
                    .await?;
                (value.as_i64(), Some(value))
            }
            Some(vote) if vote.value == value => {
                self.votes.delete(vote.id.as_str()).await?;
                (-value.as_i64(), None)
            }
            Some(mut vote) => {
                let delta = value.as_i64() - vote.value.as_i64();
                vote.value = value;
                self.votes.update(vote).await?;
                (delta, Some(value))
            }
        };

        let score = target.score() + delta;
        target.set_score(score);
        self.save_target(target).await?;

        tracing::info!(
            user_id = %user_id,
            target = %target_type,
            target_id = %target_id,
            score,
            "Recorded vote"
        );

        Ok(VoteOutcome { score, current })
    }

    pub async fn vote_of(
        &self,
        user_id: &str,
        target_type: TargetType,
        target_id: &str,
    ) -> Result<Option<Vote>> {
        let vote_id = Vote::composite_id(user_id, target_type, target_id);
        Ok(self.votes.get_by_id(vote_id).await?)
    }

    pub async fn votes_for(&self, target_type: TargetType, target_id: &str) -> Result<Vec<Vote>> {
        let votes = self.votes.get_by_index(vote::BY_TARGET, target_id).await?;
        Ok(votes
            .into_iter()
            .filter(|v| v.target_type == target_type)
            .collect())
    }

    /// Every vote cast by a user, on questions and answers alike.
    pub async fn votes_by(&self, user_id: &str) -> Result<Vec<Vote>> {
        Ok(self.votes.get_by_index(vote::BY_USER, user_id).await?)
    }

    /// Score computed from the vote ledger instead of the cached field.
    pub async fn tally_score(&self, target_type: TargetType, target_id: &str) -> Result<i64> {
        let votes = self.votes_for(target_type, target_id).await?;
        Ok(votes.iter().map(|v| v.value.as_i64()).sum())
    }

    /// Overwrite the cached score with the ledger tally.
    pub async fn reconcile_score(&self, target_type: TargetType, target_id: &str) -> Result<i64> {
        let mut target = self.load_target(target_type, target_id).await?;
        let tally = self.tally_score(target_type, target_id).await?;

        if target.score() != tally {
            tracing::warn!(
                target = %target_type,
                target_id = %target_id,
                cached = target.score(),
                tally,
                "Cached score drifted from vote ledger"
            );
            target.set_score(tally);
            self.save_target(target).await?;
        }

        Ok(tally)
    }

    async fn delete_votes_for(&self, target_type: TargetType, target_id: &str) -> Result<usize> {
        let votes = self.votes_for(target_type, target_id).await?;
        for vote in &votes {
            self.votes.delete(vote.id.as_str()).await?;
        }
        Ok(votes.len())
    }

    async fn load_target(&self, target_type: TargetType, target_id: &str) -> Result<Target> {
        match target_type {
            TargetType::Question => Ok(Target::Question(self.question(target_id).await?)),
            TargetType::Answer => Ok(Target::Answer(self.answer(target_id).await?)),
        }
    }

    async fn save_target(&self, target: Target) -> Result<()> {
        match target {
            Target::Question(q) => {
                self.questions.update(q).await?;
            }
            Target::Answer(a) => {
                self.answers.update(a).await?;
            }
        }
        Ok(())
    }
}

impl Clone for ForumService {
    fn clone(&self) -> Self {
        Self {
            users: self.users.clone(),
            questions: self.questions.clone(),
            answers: self.answers.clone(),
            votes: self.votes.clone(),
        }
    }
}

fn authorize(actor: &User, owner_id: &str, action: &str) -> Result<()> {
    if actor.can_modify(owner_id) {
        Ok(())
    } else {
        Err(ForumError::PermissionDenied(format!(
            "{} may not {}",
            actor.username, action
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use quorum_storage::DatabaseSchema;

    fn service() -> ForumService {
        let schema = DatabaseSchema::new("forum-test", 1).stores(crate::schema::stores());
        ForumService::new(StorageClient::in_memory(schema))
    }

    async fn seed(service: &ForumService) {
        service
            .users()
            .create(User::new("user1", "User One", Role::Member).with_id("u1"))
            .await
            .unwrap();
        service
            .questions()
            .create(Question::new("u1", QuestionDraft::new("Title", "Body")).with_id("q1"))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_vote_scenario() {
        let service = service();
        seed(&service).await;

        let outcome = service
            .vote("u1", TargetType::Question, "q1", VoteValue::Up)
            .await
            .unwrap();
        assert_eq!(outcome.score, 1);
        assert_eq!(service.question("q1").await.unwrap().votes_score, 1);

        let outcome = service
            .vote("u1", TargetType::Question, "q1", VoteValue::Up)
            .await
            .unwrap();
        assert_eq!(outcome, VoteOutcome { score: 0, current: None });
        assert!(service
            .vote_of("u1", TargetType::Question, "q1")
            .await
            .unwrap()
            .is_none());

        let outcome = service
            .vote("u1", TargetType::Question, "q1", VoteValue::Down)
            .await
            .unwrap();
        assert_eq!(outcome.score, -1);
        let votes = service.votes_for(TargetType::Question, "q1").await.unwrap();
        assert_eq!(votes.len(), 1);
        assert_eq!(votes[0].value, VoteValue::Down);
    }

    #[tokio::test]
    async fn test_changing_vote_moves_score_by_difference() {
        let service = service();
        seed(&service).await;

        service
            .vote("u1", TargetType::Question, "q1", VoteValue::Down)
            .await
            .unwrap();
        let outcome = service
            .vote("u1", TargetType::Question, "q1", VoteValue::Up)
            .await
            .unwrap();

        assert_eq!(outcome, VoteOutcome { score: 1, current: Some(VoteValue::Up) });
        assert_eq!(service.votes().count().await.unwrap(), 1);
        assert_eq!(service.tally_score(TargetType::Question, "q1").await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_votes_from_several_users_on_answer() {
        let service = service();
        seed(&service).await;
        let other = service.register_user("user2", "User Two", Role::Member).await.unwrap();
        let answer = service.post_answer("u1", "q1", "An answer").await.unwrap();

        service
            .vote("u1", TargetType::Answer, &answer.id, VoteValue::Up)
            .await
            .unwrap();
        let outcome = service
            .vote(&other.id, TargetType::Answer, &answer.id, VoteValue::Up)
            .await
            .unwrap();
        assert_eq!(outcome.score, 2);
        assert_eq!(service.answer(&answer.id).await.unwrap().votes_score, 2);

        // Question score is untouched by answer votes.
        assert_eq!(service.question("q1").await.unwrap().votes_score, 0);
    }

    #[tokio::test]
    async fn test_vote_on_missing_target() {
        let service = service();
        seed(&service).await;
        let err = service
            .vote("u1", TargetType::Answer, "nope", VoteValue::Up)
            .await
            .unwrap_err();
        assert!(matches!(err, ForumError::AnswerNotFound(_)));

        let err = service
            .vote("ghost", TargetType::Question, "q1", VoteValue::Up)
            .await
            .unwrap_err();
        assert!(matches!(err, ForumError::UserNotFound(_)));
    }

    #[tokio::test]
    async fn test_reconcile_repairs_stale_score() {
        let service = service();
        seed(&service).await;
        service
            .vote("u1", TargetType::Question, "q1", VoteValue::Up)
            .await
            .unwrap();

        // Simulate a crash between the ledger write and the score write.
        let mut question = service.question("q1").await.unwrap();
        question.votes_score = 40;
        service.questions().update(question).await.unwrap();

        assert_eq!(service.reconcile_score(TargetType::Question, "q1").await.unwrap(), 1);
        assert_eq!(service.question("q1").await.unwrap().votes_score, 1);
    }

    #[tokio::test]
    async fn test_delete_question_cascades() {
        let service = service();
        seed(&service).await;
        let voter = service.register_user("voter", "Voter", Role::Member).await.unwrap();

        let a1 = service.post_answer("u1", "q1", "First").await.unwrap();
        let a2 = service.post_answer(&voter.id, "q1", "Second").await.unwrap();
        service
            .vote(&voter.id, TargetType::Question, "q1", VoteValue::Up)
            .await
            .unwrap();
        service
            .vote(&voter.id, TargetType::Answer, &a1.id, VoteValue::Up)
            .await
            .unwrap();
        service
            .vote("u1", TargetType::Answer, &a2.id, VoteValue::Down)
            .await
            .unwrap();

        let report = service.delete_question("u1", "q1").await.unwrap();
        assert_eq!(report, CascadeReport { answers: 2, votes: 3 });

        assert!(service.questions().get_by_id("q1").await.unwrap().is_none());
        assert!(service.answers().get_by_parent("q1").await.unwrap().is_empty());
        assert_eq!(service.votes().count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_permissions() {
        let service = service();
        seed(&service).await;
        let intruder = service.register_user("intruder", "Intruder", Role::Member).await.unwrap();
        let moderator = service
            .register_user("moderator", "Moderator", Role::Moderator)
            .await
            .unwrap();

        let err = service
            .edit_question(&intruder.id, "q1", QuestionDraft::new("Mine now", "Body"))
            .await
            .unwrap_err();
        assert!(matches!(err, ForumError::PermissionDenied(_)));

        let err = service.delete_question(&intruder.id, "q1").await.unwrap_err();
        assert!(matches!(err, ForumError::PermissionDenied(_)));
        assert!(service.questions().get_by_id("q1").await.unwrap().is_some());

        let edited = service
            .edit_question(&moderator.id, "q1", QuestionDraft::new("Tidied title", "Body"))
            .await
            .unwrap();
        assert_eq!(edited.title, "Tidied title");
    }

    #[tokio::test]
    async fn test_username_must_be_unique() {
        let service = service();
        service.register_user("ada", "Ada", Role::Member).await.unwrap();
        let err = service.register_user("ada", "Other Ada", Role::Member).await.unwrap_err();
        assert!(matches!(err, ForumError::UsernameTaken(ref name) if name == "ada"));

        let found = service.find_user("ada").await.unwrap().unwrap();
        assert_eq!(found.display_name, "Ada");
        assert_eq!(service.users().count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_accept_and_delete_answer() {
        let service = service();
        seed(&service).await;
        let helper = service.register_user("helper", "Helper", Role::Member).await.unwrap();
        let answer = service.post_answer(&helper.id, "q1", "Try this").await.unwrap();

        let err = service.accept_answer(&helper.id, &answer.id).await.unwrap_err();
        assert!(matches!(err, ForumError::PermissionDenied(_)));

        let question = service.accept_answer("u1", &answer.id).await.unwrap();
        assert_eq!(question.accepted_answer_id.as_deref(), Some(answer.id.as_str()));

        service.delete_answer(&helper.id, &answer.id).await.unwrap();
        assert!(service.question("q1").await.unwrap().accepted_answer_id.is_none());
    }

    #[tokio::test]
    async fn test_delete_answer_removes_its_votes() {
        let service = service();
        seed(&service).await;
        let helper = service.register_user("helper", "Helper", Role::Member).await.unwrap();
        let answer = service.post_answer(&helper.id, "q1", "Try this").await.unwrap();
        let other = service.post_answer("u1", "q1", "Or this").await.unwrap();

        service
            .vote("u1", TargetType::Answer, &answer.id, VoteValue::Up)
            .await
            .unwrap();
        service
            .vote(&helper.id, TargetType::Answer, &answer.id, VoteValue::Down)
            .await
            .unwrap();
        let changed = service
            .vote(&helper.id, TargetType::Answer, &answer.id, VoteValue::Up)
            .await
            .unwrap();
        assert_eq!(changed.score, 2);
        service
            .vote(&helper.id, TargetType::Answer, &other.id, VoteValue::Up)
            .await
            .unwrap();

        let report = service.delete_answer(&helper.id, &answer.id).await.unwrap();
        assert_eq!(report, CascadeReport { answers: 1, votes: 2 });
        assert!(service
            .votes_for(TargetType::Answer, &answer.id)
            .await
            .unwrap()
            .is_empty());
        assert_eq!(service.votes_by(&helper.id).await.unwrap().len(), 1);
        assert_eq!(service.votes_for(TargetType::Answer, &other.id).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_ids_cannot_collide_in_vote_keys() {
        let service = service();
        seed(&service).await;

        let err = service
            .users()
            .create(User::new("mallory", "Mallory", Role::Member).with_id("u1:question:q1"))
            .await
            .unwrap_err();
        assert!(matches!(err, RepositoryError::Validation(ref v) if v.field == "id"));

        let err = service
            .questions()
            .create(Question::new("u1", QuestionDraft::new("Title", "Body")).with_id("q1:answer:a1"))
            .await
            .unwrap_err();
        assert!(matches!(err, RepositoryError::Validation(ref v) if v.field == "id"));

        let err = service
            .answers()
            .create(Answer::new("q1", "u1", "Body").with_id("a:b"))
            .await
            .unwrap_err();
        assert!(matches!(err, RepositoryError::Validation(_)));

        let outcome = service
            .vote("u1", TargetType::Question, "q1", VoteValue::Up)
            .await
            .unwrap();
        assert_eq!(outcome.score, 1);
        assert_eq!(service.tally_score(TargetType::Question, "q1").await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_content_by_author() {
        let service = service();
        seed(&service).await;
        let helper = service.register_user("helper", "Helper", Role::Member).await.unwrap();
        service.post_answer(&helper.id, "q1", "One").await.unwrap();
        service.post_answer(&helper.id, "q1", "Two").await.unwrap();
        service.post_answer("u1", "q1", "Three").await.unwrap();

        assert_eq!(service.answers_by(&helper.id).await.unwrap().len(), 2);
        assert_eq!(service.answers_by("u1").await.unwrap().len(), 1);
        assert!(service.votes_by(&helper.id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_answers_ordered_by_score() {
        let service = service();
        seed(&service).await;
        let low = service.post_answer("u1", "q1", "Low").await.unwrap();
        let high = service.post_answer("u1", "q1", "High").await.unwrap();
        service
            .vote("u1", TargetType::Answer, &high.id, VoteValue::Up)
            .await
            .unwrap();

        let answers = service.answers_for("q1").await.unwrap();
        let ids: Vec<_> = answers.iter().map(|a| a.id.as_str()).collect();
        assert_eq!(ids, vec![high.id.as_str(), low.id.as_str()]);
    }

    #[tokio::test]
    async fn test_ask_requires_author_and_validates() {
        let service = service();
        let err = service
            .ask_question("ghost", QuestionDraft::new("Title", "Body"))
            .await
            .unwrap_err();
        assert!(matches!(err, ForumError::UserNotFound(_)));

        seed(&service).await;
        let err = service
            .ask_question("u1", QuestionDraft::new("", "Body"))
            .await
            .unwrap_err();
        assert!(matches!(err, ForumError::Repository(RepositoryError::Validation(_))));
        assert_eq!(service.questions_by("u1").await.unwrap().len(), 1);
    }
}
