use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};

use exam_core::model::{
    ChoiceKey, ExamOutcome, GradedDetail, MockDetail, MockQuestion, NoteEntry, OxDetail, OxItem,
    QuestionId, QuestionKey, QuestionStats, UserId,
};

use crate::contract::{
    Explanation, FavoriteStore, FavoriteUpsert, GradingService, MockSubmission, OxSubmission,
    QuestionSource, RemoteError, StatsRow, StatsSource, VisibilityRow, VisibilityStore,
};

#[derive(Debug, Clone)]
struct StoredFavorite {
    user: UserId,
    entry: NoteEntry,
}

#[derive(Default)]
struct State {
    mock_questions: Vec<MockQuestion>,
    mock_answer_keys: HashMap<QuestionId, String>,
    mock_explanations: HashMap<QuestionId, String>,
    ox_items: Vec<OxItem>,
    favorites: Vec<StoredFavorite>,
    // Visibility invariant: only currently-hidden choices are retained.
    hidden: HashSet<(UserId, ChoiceKey)>,
    stats: HashMap<QuestionId, QuestionStats>,
    grading_unavailable: bool,
}

/// In-memory implementation of all remote contracts, for tests and
/// prototyping.
///
/// Grading mirrors the scoring service's documented semantics: iterate the
/// stored set in order, count a question correct only when an answer was
/// recorded and it equals the official one.
#[derive(Clone, Default)]
pub struct InMemoryExamApi {
    state: Arc<Mutex<State>>,
}

impl InMemoryExamApi {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, State>, RemoteError> {
        self.state
            .lock()
            .map_err(|e| RemoteError::Transport(e.to_string()))
    }

    /// Seed one mock question with its official answer and explanation.
    ///
    /// # Panics
    ///
    /// Panics if the state mutex is poisoned (test-seeding only).
    pub fn add_mock_question(
        &self,
        question: MockQuestion,
        official_answer: &str,
        explanation: &str,
    ) {
        let mut state = self.state.lock().expect("state lock");
        state
            .mock_answer_keys
            .insert(question.id, official_answer.to_string());
        state
            .mock_explanations
            .insert(question.id, explanation.to_string());
        state.mock_questions.push(question);
    }

    /// Seed one OX item.
    ///
    /// # Panics
    ///
    /// Panics if the state mutex is poisoned (test-seeding only).
    pub fn add_ox_item(&self, item: OxItem) {
        self.state.lock().expect("state lock").ox_items.push(item);
    }

    /// Seed a favorite row directly, bypassing the upsert path.
    ///
    /// # Panics
    ///
    /// Panics if the state mutex is poisoned (test-seeding only).
    pub fn seed_favorite(&self, user: &UserId, entry: NoteEntry) {
        self.state
            .lock()
            .expect("state lock")
            .favorites
            .push(StoredFavorite {
                user: user.clone(),
                entry,
            });
    }

    /// Seed per-question statistics for a mode-local id.
    ///
    /// # Panics
    ///
    /// Panics if the state mutex is poisoned (test-seeding only).
    pub fn seed_stats(&self, id: QuestionId, stats: QuestionStats) {
        self.state.lock().expect("state lock").stats.insert(id, stats);
    }

    /// Make subsequent grading calls fail, for failure-path tests.
    ///
    /// # Panics
    ///
    /// Panics if the state mutex is poisoned (test-seeding only).
    pub fn set_grading_unavailable(&self, unavailable: bool) {
        self.state.lock().expect("state lock").grading_unavailable = unavailable;
    }

    /// Whether a choice is currently recorded hidden, for assertions.
    ///
    /// # Panics
    ///
    /// Panics if the state mutex is poisoned (test-seeding only).
    #[must_use]
    pub fn is_hidden(&self, user: &UserId, key: &ChoiceKey) -> bool {
        self.state
            .lock()
            .expect("state lock")
            .hidden
            .contains(&(user.clone(), key.clone()))
    }

    /// The stored favorite color/memo for a key, for assertions.
    ///
    /// # Panics
    ///
    /// Panics if the state mutex is poisoned (test-seeding only).
    #[must_use]
    pub fn stored_favorite(&self, user: &UserId, key: &QuestionKey) -> Option<NoteEntry> {
        self.state
            .lock()
            .expect("state lock")
            .favorites
            .iter()
            .find(|f| &f.user == user && f.entry.key() == *key)
            .map(|f| f.entry.clone())
    }
}

#[async_trait]
impl QuestionSource for InMemoryExamApi {
    async fn mock_questions(
        &self,
        exam_year: i32,
        subject_code: &str,
    ) -> Result<Vec<MockQuestion>, RemoteError> {
        let state = self.lock()?;
        let set: Vec<MockQuestion> = state
            .mock_questions
            .iter()
            .filter(|q| q.exam_year == exam_year && q.subject_code == subject_code)
            .cloned()
            .collect();
        if set.is_empty() {
            return Err(RemoteError::NotFound);
        }
        Ok(set)
    }

    async fn ox_items(&self, subject_code: &str) -> Result<Vec<OxItem>, RemoteError> {
        let state = self.lock()?;
        let set: Vec<OxItem> = state
            .ox_items
            .iter()
            .filter(|i| i.subject_code == subject_code)
            .cloned()
            .collect();
        if set.is_empty() {
            return Err(RemoteError::NotFound);
        }
        Ok(set)
    }

    async fn mock_explanation(&self, id: QuestionId) -> Result<Explanation, RemoteError> {
        let state = self.lock()?;
        let correct_answer = state
            .mock_answer_keys
            .get(&id)
            .cloned()
            .ok_or(RemoteError::NotFound)?;
        let explanation_text = state.mock_explanations.get(&id).cloned().unwrap_or_default();
        Ok(Explanation {
            correct_answer,
            explanation_text,
        })
    }
}

#[async_trait]
impl FavoriteStore for InMemoryExamApi {
    async fn list_favorites(
        &self,
        user: &UserId,
        exam_year: Option<i32>,
        subject_code: Option<&str>,
    ) -> Result<Vec<NoteEntry>, RemoteError> {
        let state = self.lock()?;
        Ok(state
            .favorites
            .iter()
            .filter(|f| &f.user == user)
            .filter(|f| exam_year.is_none_or(|y| f.entry.exam_year == y))
            .filter(|f| subject_code.is_none_or(|s| f.entry.subject_code == s))
            .map(|f| f.entry.clone())
            .collect())
    }

    async fn upsert_favorite(&self, favorite: &FavoriteUpsert) -> Result<(), RemoteError> {
        let mut state = self.lock()?;
        let entry = NoteEntry {
            exam_year: favorite.key.exam_year,
            subject_code: favorite.key.subject_code.clone(),
            subject_name: favorite.key.subject_code.clone(),
            question_no: favorite.key.question_no,
            color: favorite.color,
            memo: favorite.memo.clone(),
            tags: favorite.tags.clone(),
            source: favorite.source,
        };
        let existing = state
            .favorites
            .iter_mut()
            .find(|f| f.user == favorite.user && f.entry.key() == favorite.key);
        match existing {
            Some(stored) => stored.entry = entry,
            None => state.favorites.push(StoredFavorite {
                user: favorite.user.clone(),
                entry,
            }),
        }
        Ok(())
    }

    async fn delete_favorite(&self, user: &UserId, key: &QuestionKey) -> Result<(), RemoteError> {
        let mut state = self.lock()?;
        state
            .favorites
            .retain(|f| !(&f.user == user && f.entry.key() == *key));
        Ok(())
    }
}

#[async_trait]
impl VisibilityStore for InMemoryExamApi {
    async fn list_visibility(
        &self,
        user: &UserId,
        exam_year: i32,
        subject_code: &str,
    ) -> Result<Vec<VisibilityRow>, RemoteError> {
        let state = self.lock()?;
        Ok(state
            .hidden
            .iter()
            .filter(|(u, key)| {
                u == user && key.exam_year == exam_year && key.subject_code == subject_code
            })
            .map(|(_, key)| VisibilityRow {
                question_no: key.question_no,
                choice_no: key.choice_no,
                hidden: true,
            })
            .collect())
    }

    async fn set_visibility(
        &self,
        user: &UserId,
        key: &ChoiceKey,
        hidden: bool,
    ) -> Result<(), RemoteError> {
        let mut state = self.lock()?;
        if hidden {
            state.hidden.insert((user.clone(), key.clone()));
        } else {
            state.hidden.remove(&(user.clone(), key.clone()));
        }
        Ok(())
    }
}

#[async_trait]
impl GradingService for InMemoryExamApi {
    async fn submit_mock(&self, submission: &MockSubmission) -> Result<ExamOutcome, RemoteError> {
        let state = self.lock()?;
        if state.grading_unavailable {
            return Err(RemoteError::Status(503));
        }
        let questions: Vec<&MockQuestion> = state
            .mock_questions
            .iter()
            .filter(|q| {
                q.exam_year == submission.exam_year && q.subject_code == submission.subject_code
            })
            .collect();
        if questions.is_empty() {
            return Err(RemoteError::NotFound);
        }

        let mut correct = 0u32;
        let mut details = Vec::with_capacity(questions.len());
        for question in questions.iter() {
            let chosen = submission
                .answers
                .get(&question.id)
                .map(|a| a.trim().to_string())
                .unwrap_or_default();
            let official = state
                .mock_answer_keys
                .get(&question.id)
                .cloned()
                .unwrap_or_default();
            let is_correct = !chosen.is_empty() && chosen == official;
            if is_correct {
                correct += 1;
            }
            details.push(GradedDetail::Mock(MockDetail {
                question_id: question.id,
                exam_year: question.exam_year,
                subject_code: question.subject_code.clone(),
                question_no: question.question_no,
                question_text: question.question_text.clone(),
                choices: question.choices.clone(),
                selected_answer: chosen,
                correct_answer: official,
                is_correct,
                explanation_text: state
                    .mock_explanations
                    .get(&question.id)
                    .cloned()
                    .unwrap_or_default(),
            }));
        }

        Ok(ExamOutcome {
            total_questions: u32::try_from(details.len()).unwrap_or(u32::MAX),
            correct_count: correct,
            details,
        })
    }

    async fn submit_ox(&self, submission: &OxSubmission) -> Result<ExamOutcome, RemoteError> {
        let state = self.lock()?;
        if state.grading_unavailable {
            return Err(RemoteError::Status(503));
        }
        let items: Vec<&OxItem> = state
            .ox_items
            .iter()
            .filter(|i| i.subject_code == submission.subject_code)
            .collect();
        if items.is_empty() {
            return Err(RemoteError::NotFound);
        }

        let mut correct = 0u32;
        let mut details = Vec::with_capacity(items.len());
        for item in items.iter() {
            let selected = submission
                .answers
                .get(&item.id)
                .and_then(|a| a.parse().ok());
            let is_correct = matches!(
                (selected, item.expected),
                (Some(s), Some(e)) if s == e
            );
            if is_correct {
                correct += 1;
            }
            details.push(GradedDetail::Ox(OxDetail {
                item_id: item.id,
                exam_year: item.exam_year,
                subject_code: item.subject_code.clone(),
                question_no: item.question_no,
                choice_no: item.choice_no,
                choice_text: item.choice_text.clone(),
                selected,
                expected: item.expected,
                is_correct,
                explanation: item.explanation.clone(),
            }));
        }

        Ok(ExamOutcome {
            total_questions: u32::try_from(details.len()).unwrap_or(u32::MAX),
            correct_count: correct,
            details,
        })
    }
}

#[async_trait]
impl StatsSource for InMemoryExamApi {
    async fn mock_stats(
        &self,
        _user: &UserId,
        exam_year: i32,
        subject_code: &str,
    ) -> Result<Vec<StatsRow>, RemoteError> {
        let state = self.lock()?;
        Ok(state
            .mock_questions
            .iter()
            .filter(|q| q.exam_year == exam_year && q.subject_code == subject_code)
            .filter_map(|q| {
                state
                    .stats
                    .get(&q.id)
                    .map(|s| StatsRow { id: q.id, stats: *s })
            })
            .collect())
    }

    async fn ox_stats(
        &self,
        _user: &UserId,
        subject_code: &str,
    ) -> Result<Vec<StatsRow>, RemoteError> {
        let state = self.lock()?;
        Ok(state
            .ox_items
            .iter()
            .filter(|i| i.subject_code == subject_code)
            .filter_map(|i| {
                state
                    .stats
                    .get(&i.id)
                    .map(|s| StatsRow { id: i.id, stats: *s })
            })
            .collect())
    }
}
