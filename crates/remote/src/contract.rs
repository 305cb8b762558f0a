use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;

use exam_core::model::{
    ChoiceKey, ExamOutcome, FavoriteColor, MockQuestion, NoteEntry, OxItem, QuestionId,
    QuestionKey, QuestionStats, SessionMode, UserId,
};

/// Errors surfaced by remote collaborators.
///
/// Every contract call may fail; the engine propagates these rather than
/// masking them as empty results.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum RemoteError {
    #[error("not found")]
    NotFound,

    #[error("remote call failed with status {0}")]
    Status(u16),

    #[error("transport error: {0}")]
    Transport(String),

    #[error("decode error: {0}")]
    Decode(String),
}

/// A single choice-visibility row for one (year, subject) query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VisibilityRow {
    pub question_no: u32,
    pub choice_no: u32,
    pub hidden: bool,
}

/// Payload for creating or replacing a favorite.
#[derive(Debug, Clone, PartialEq)]
pub struct FavoriteUpsert {
    pub user: UserId,
    pub key: QuestionKey,
    pub color: FavoriteColor,
    pub memo: String,
    pub tags: Vec<String>,
    pub source: SessionMode,
}

/// The answers map plus attempt metadata for a mock grading call.
#[derive(Debug, Clone, PartialEq)]
pub struct MockSubmission {
    pub user: UserId,
    pub exam_year: i32,
    pub subject_code: String,
    pub answers: HashMap<QuestionId, String>,
    pub started_at: Option<DateTime<Utc>>,
    pub duration_seconds: u64,
}

/// The answers map plus attempt metadata for an OX grading call.
#[derive(Debug, Clone, PartialEq)]
pub struct OxSubmission {
    pub user: UserId,
    pub subject_code: String,
    pub answers: HashMap<QuestionId, String>,
    pub started_at: Option<DateTime<Utc>>,
    pub duration_seconds: u64,
}

/// Official answer and explanation text for one mock question.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Explanation {
    pub correct_answer: String,
    pub explanation_text: String,
}

/// Per-question statistics keyed by the mode-local id of the loaded set.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StatsRow {
    pub id: QuestionId,
    pub stats: QuestionStats,
}

/// Question-content provider.
#[async_trait]
pub trait QuestionSource: Send + Sync {
    /// Fetch the mock question set for an exact (year, subject), in exam order.
    ///
    /// # Errors
    ///
    /// Returns `RemoteError::NotFound` when the set does not exist, or other
    /// remote errors.
    async fn mock_questions(
        &self,
        exam_year: i32,
        subject_code: &str,
    ) -> Result<Vec<MockQuestion>, RemoteError>;

    /// Fetch all OX items for a subject, spanning years.
    ///
    /// # Errors
    ///
    /// Returns `RemoteError::NotFound` when the subject has no items, or
    /// other remote errors.
    async fn ox_items(&self, subject_code: &str) -> Result<Vec<OxItem>, RemoteError>;

    /// Fetch the official answer and explanation for one mock question.
    ///
    /// # Errors
    ///
    /// Returns `RemoteError::NotFound` for unknown ids, or other remote errors.
    async fn mock_explanation(&self, id: QuestionId) -> Result<Explanation, RemoteError>;
}

/// Remote owner of favorite rows.
#[async_trait]
pub trait FavoriteStore: Send + Sync {
    /// List active-color favorites for a user, optionally scoped to a
    /// year and/or subject.
    ///
    /// # Errors
    ///
    /// Returns `RemoteError` on remote failure.
    async fn list_favorites(
        &self,
        user: &UserId,
        exam_year: Option<i32>,
        subject_code: Option<&str>,
    ) -> Result<Vec<NoteEntry>, RemoteError>;

    /// Create or replace the favorite for the payload's question key.
    ///
    /// # Errors
    ///
    /// Returns `RemoteError` on remote failure.
    async fn upsert_favorite(&self, favorite: &FavoriteUpsert) -> Result<(), RemoteError>;

    /// Delete the favorite for a question key, if any.
    ///
    /// # Errors
    ///
    /// Returns `RemoteError` on remote failure.
    async fn delete_favorite(&self, user: &UserId, key: &QuestionKey) -> Result<(), RemoteError>;
}

/// Remote owner of per-choice concealment state.
#[async_trait]
pub trait VisibilityStore: Send + Sync {
    /// List visibility rows for one (year, subject).
    ///
    /// # Errors
    ///
    /// Returns `RemoteError` on remote failure.
    async fn list_visibility(
        &self,
        user: &UserId,
        exam_year: i32,
        subject_code: &str,
    ) -> Result<Vec<VisibilityRow>, RemoteError>;

    /// Record a choice's hidden flag. Setting `hidden = false` deletes the
    /// remote record; only currently-hidden choices are retained.
    ///
    /// # Errors
    ///
    /// Returns `RemoteError` on remote failure.
    async fn set_visibility(
        &self,
        user: &UserId,
        key: &ChoiceKey,
        hidden: bool,
    ) -> Result<(), RemoteError>;
}

/// The external scoring service. Correctness is computed here, never locally.
#[async_trait]
pub trait GradingService: Send + Sync {
    /// Grade a mock attempt.
    ///
    /// # Errors
    ///
    /// Returns `RemoteError` on remote failure; the caller must revert its
    /// grading phase in that case.
    async fn submit_mock(&self, submission: &MockSubmission) -> Result<ExamOutcome, RemoteError>;

    /// Grade an OX attempt.
    ///
    /// # Errors
    ///
    /// Returns `RemoteError` on remote failure; the caller must revert its
    /// grading phase in that case.
    async fn submit_ox(&self, submission: &OxSubmission) -> Result<ExamOutcome, RemoteError>;
}

/// Per-user answering-history statistics.
#[async_trait]
pub trait StatsSource: Send + Sync {
    /// Stats for a mock question set, keyed by mode-local question id.
    ///
    /// # Errors
    ///
    /// Returns `RemoteError` on remote failure.
    async fn mock_stats(
        &self,
        user: &UserId,
        exam_year: i32,
        subject_code: &str,
    ) -> Result<Vec<StatsRow>, RemoteError>;

    /// Stats for a subject's OX pool, keyed by mode-local item id.
    ///
    /// # Errors
    ///
    /// Returns `RemoteError` on remote failure.
    async fn ox_stats(&self, user: &UserId, subject_code: &str)
    -> Result<Vec<StatsRow>, RemoteError>;
}

/// Aggregates the collaborator contracts behind trait objects for easy
/// backend swapping.
#[derive(Clone)]
pub struct ExamApi {
    pub questions: Arc<dyn QuestionSource>,
    pub favorites: Arc<dyn FavoriteStore>,
    pub visibility: Arc<dyn VisibilityStore>,
    pub grading: Arc<dyn GradingService>,
    pub stats: Arc<dyn StatsSource>,
}

impl ExamApi {
    /// An in-memory backend for tests and prototyping.
    #[must_use]
    pub fn in_memory() -> Self {
        let api = crate::memory::InMemoryExamApi::new();
        Self::from_memory(api)
    }

    /// Wrap an existing in-memory backend (useful when the test needs to
    /// keep a handle for seeding).
    #[must_use]
    pub fn from_memory(api: crate::memory::InMemoryExamApi) -> Self {
        Self {
            questions: Arc::new(api.clone()),
            favorites: Arc::new(api.clone()),
            visibility: Arc::new(api.clone()),
            grading: Arc::new(api.clone()),
            stats: Arc::new(api),
        }
    }

    /// An HTTP/JSON backend talking to the exam service.
    #[must_use]
    pub fn http(config: crate::http::HttpConfig) -> Self {
        let api = crate::http::HttpExamApi::new(config);
        Self {
            questions: Arc::new(api.clone()),
            favorites: Arc::new(api.clone()),
            visibility: Arc::new(api.clone()),
            grading: Arc::new(api.clone()),
            stats: Arc::new(api),
        }
    }
}
