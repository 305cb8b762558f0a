use std::sync::Arc;

use tracing::{debug, warn};

use exam_core::model::{
    Answer, ChoiceKey, NoteEntry, OxAnswer, QuestionId, QuestionStats, SessionMode, UserId,
};
use exam_core::Clock;
use remote::{Explanation, ExamApi, MockSubmission, OxSubmission, RemoteError};

use crate::annotations::AnnotationStore;
use crate::error::{FetchError, SessionError};
use crate::loader::QuestionSetLoader;
use super::state::{AdvanceOutcome, ExamSession};

/// A freshly started session plus the annotation cache scoped to it.
pub struct SessionStart {
    pub session: ExamSession,
    pub annotations: AnnotationStore,
}

/// What a submit call did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitStatus {
    /// The outcome was graded and the session moved to review.
    Graded,
    /// Another submission was already in flight; this call was dropped.
    InFlight,
}

/// Where OX forward navigation left the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OxProgress {
    /// Still answering; unanswered items remain.
    Continue,
    /// Every item was answered, so the session auto-submitted and is now
    /// in review.
    AutoSubmitted,
    /// Every item was answered but a submission was already in flight.
    SubmitInFlight,
}

/// Whether a concealment toggle reached the remote store.
#[derive(Debug)]
pub enum SyncState {
    Synced,
    /// The local overlay changed but the remote write failed; the two
    /// reconverge on the next session load.
    Diverged(RemoteError),
}

/// Result of a concealment toggle: the new local state plus its sync fate.
#[derive(Debug)]
pub struct ConcealToggle {
    pub hidden: bool,
    pub sync: SyncState,
}

/// Drives exam sessions against the remote collaborators: loading,
/// answering, submission, concealment sync, and note re-entry.
#[derive(Clone)]
pub struct SessionWorkflow {
    api: ExamApi,
    clock: Clock,
    user: UserId,
}

impl SessionWorkflow {
    #[must_use]
    pub fn new(api: ExamApi, clock: Clock, user: UserId) -> Self {
        Self { api, clock, user }
    }

    fn loader(&self) -> QuestionSetLoader {
        QuestionSetLoader::new(
            Arc::clone(&self.api.questions),
            Arc::clone(&self.api.visibility),
            self.user.clone(),
        )
    }

    async fn annotations(
        &self,
        exam_year: Option<i32>,
        subject_code: &str,
    ) -> Result<AnnotationStore, FetchError> {
        let mut store = AnnotationStore::new(Arc::clone(&self.api.favorites), self.user.clone());
        store.refresh(exam_year, Some(subject_code)).await?;
        Ok(store)
    }

    /// Start a timed mock session for one (year, subject).
    ///
    /// The concealment overlay is preloaded; per-question stats are
    /// best-effort and default to empty when the stats fetch fails.
    ///
    /// # Errors
    ///
    /// Returns `SessionError` when the question, visibility, or favorite
    /// fetch fails.
    pub async fn start_mock(
        &self,
        exam_year: i32,
        subject_code: &str,
    ) -> Result<SessionStart, SessionError> {
        let loader = self.loader();
        let questions = loader.load_mock_set(exam_year, subject_code).await?;
        let hidden = loader
            .load_mock_concealment(&questions, exam_year, subject_code)
            .await?;

        let mut session = ExamSession::new_mock(
            exam_year,
            subject_code,
            questions,
            Some(self.clock.now()),
        );
        session.set_hidden_choices(hidden);
        session.set_stats(self.mock_stats_overlay(exam_year, subject_code).await);

        let annotations = self.annotations(Some(exam_year), subject_code).await?;
        Ok(SessionStart {
            session,
            annotations,
        })
    }

    /// Start a timed OX session over a subject's cross-year pool.
    ///
    /// # Errors
    ///
    /// Returns `SessionError` when the item, visibility, or favorite
    /// fetch fails.
    pub async fn start_ox(&self, subject_code: &str) -> Result<SessionStart, SessionError> {
        let items = self.loader().load_ox_set(subject_code).await?;
        let mut session = ExamSession::new_ox(subject_code, items, Some(self.clock.now()));
        session.set_stats(self.ox_stats_overlay(subject_code).await);

        let annotations = self.annotations(None, subject_code).await?;
        Ok(SessionStart {
            session,
            annotations,
        })
    }

    async fn mock_stats_overlay(
        &self,
        exam_year: i32,
        subject_code: &str,
    ) -> std::collections::HashMap<QuestionId, QuestionStats> {
        match self.api.stats.mock_stats(&self.user, exam_year, subject_code).await {
            Ok(rows) => rows.into_iter().map(|r| (r.id, r.stats)).collect(),
            Err(err) => {
                warn!(%err, "mock stats unavailable");
                std::collections::HashMap::new()
            }
        }
    }

    async fn ox_stats_overlay(
        &self,
        subject_code: &str,
    ) -> std::collections::HashMap<QuestionId, QuestionStats> {
        match self.api.stats.ox_stats(&self.user, subject_code).await {
            Ok(rows) => rows.into_iter().map(|r| (r.id, r.stats)).collect(),
            Err(err) => {
                warn!(%err, "ox stats unavailable");
                std::collections::HashMap::new()
            }
        }
    }

    /// Record a mock answer and step to the next question.
    pub fn answer_mock(&self, session: &mut ExamSession, choice_no: u32) -> AdvanceOutcome {
        session.answer_current(Answer::Choice(choice_no));
        session.advance()
    }

    /// Record an OX answer and open the item's explanation. The cursor
    /// stays put, and nothing submits; grading is triggered by forward
    /// navigation past the last item.
    pub fn answer_ox(&self, session: &mut ExamSession, answer: OxAnswer) {
        session.answer_current(Answer::Ox(answer));
        session.open_explanation();
    }

    /// OX forward navigation. Moving past the last item submits instead,
    /// provided every item has an answer; otherwise the call is a no-op.
    ///
    /// # Errors
    ///
    /// Returns `SessionError` when the auto-submission fails; the session
    /// reverts to answering.
    pub async fn advance_ox(
        &self,
        session: &mut ExamSession,
    ) -> Result<OxProgress, SessionError> {
        if session.advance() == AdvanceOutcome::Moved {
            return Ok(OxProgress::Continue);
        }
        if !session.all_answered() {
            return Ok(OxProgress::Continue);
        }
        match self.submit(session).await? {
            SubmitStatus::Graded => Ok(OxProgress::AutoSubmitted),
            SubmitStatus::InFlight => Ok(OxProgress::SubmitInFlight),
        }
    }

    /// Submit the session for grading. Re-entrant calls while a submission
    /// is in flight (or after review began) are dropped.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Empty` for an empty set, or the remote
    /// grading failure; in the latter case the session reverts to
    /// answering and may be resubmitted.
    pub async fn submit(&self, session: &mut ExamSession) -> Result<SubmitStatus, SessionError> {
        if session.is_empty() {
            return Err(SessionError::Empty);
        }
        if !session.begin_grading() {
            return Ok(SubmitStatus::InFlight);
        }

        let answers = session.answers_payload();
        let duration_seconds = session.elapsed_seconds(self.clock.now());
        let outcome = match session.mode() {
            SessionMode::Mock => {
                let submission = MockSubmission {
                    user: self.user.clone(),
                    exam_year: session.exam_year().unwrap_or_default(),
                    subject_code: session.subject_code().to_string(),
                    answers,
                    started_at: session.started_at(),
                    duration_seconds,
                };
                self.api.grading.submit_mock(&submission).await
            }
            SessionMode::Ox => {
                let submission = OxSubmission {
                    user: self.user.clone(),
                    subject_code: session.subject_code().to_string(),
                    answers,
                    started_at: session.started_at(),
                    duration_seconds,
                };
                self.api.grading.submit_ox(&submission).await
            }
        };

        match outcome {
            Ok(outcome) => {
                debug!(
                    correct = outcome.correct_count,
                    total = outcome.total_questions,
                    "session graded"
                );
                session.finish_grading(outcome);
                Ok(SubmitStatus::Graded)
            }
            Err(err) => {
                session.abort_grading();
                Err(err.into())
            }
        }
    }

    /// Flip a choice's concealment on the current mock question, then push
    /// the new state to the remote store. The local overlay keeps its new
    /// state even when the push fails. Returns `None` outside mock mode;
    /// OX pools consume concealment at load time and have no toggle of
    /// their own.
    pub async fn toggle_conceal(
        &self,
        session: &mut ExamSession,
        choice_no: u32,
    ) -> Option<ConcealToggle> {
        let question = session.current_mock()?;
        let key = ChoiceKey::new(
            question.exam_year,
            question.subject_code.clone(),
            question.question_no,
            choice_no,
        );
        let hidden = session.toggle_conceal(choice_no)?;

        let sync = match self
            .api
            .visibility
            .set_visibility(&self.user, &key, hidden)
            .await
        {
            Ok(()) => SyncState::Synced,
            Err(err) => {
                warn!(%err, "concealment write failed");
                SyncState::Diverged(err)
            }
        };
        Some(ConcealToggle { hidden, sync })
    }

    /// Fetch the official answer and explanation for the current mock
    /// question. OX items carry their explanation inline.
    ///
    /// # Errors
    ///
    /// Returns `FetchError` when the remote fetch fails, and `NotFound`
    /// when there is no current mock question.
    pub async fn fetch_explanation(
        &self,
        session: &ExamSession,
    ) -> Result<Explanation, FetchError> {
        let Some(question) = session.current_mock() else {
            return Err(RemoteError::NotFound.into());
        };
        Ok(self.api.questions.mock_explanation(question.id).await?)
    }

    /// Re-open the session a note points into and land on its question.
    /// No timer runs; the attempt replays old material.
    ///
    /// # Errors
    ///
    /// Returns `SessionError` when the set load fails.
    pub async fn open_from_note(&self, note: &NoteEntry) -> Result<SessionStart, SessionError> {
        let loader = self.loader();
        let mut session = match note.source {
            SessionMode::Mock => {
                let questions = loader
                    .load_mock_set(note.exam_year, &note.subject_code)
                    .await?;
                let hidden = loader
                    .load_mock_concealment(&questions, note.exam_year, &note.subject_code)
                    .await?;
                let mut session =
                    ExamSession::new_mock(note.exam_year, &note.subject_code, questions, None);
                session.set_hidden_choices(hidden);
                session.set_stats(
                    self.mock_stats_overlay(note.exam_year, &note.subject_code)
                        .await,
                );
                session
            }
            SessionMode::Ox => {
                let items = loader.load_ox_set(&note.subject_code).await?;
                let mut session = ExamSession::new_ox(&note.subject_code, items, None);
                session.set_stats(self.ox_stats_overlay(&note.subject_code).await);
                session
            }
        };
        if !session.seek(&note.key()) {
            debug!(key = %note.key(), "noted question absent from the loaded set");
        }

        let year_scope = match note.source {
            SessionMode::Mock => Some(note.exam_year),
            SessionMode::Ox => None,
        };
        let annotations = self.annotations(year_scope, &note.subject_code).await?;
        Ok(SessionStart {
            session,
            annotations,
        })
    }
}
