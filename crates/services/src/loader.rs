//! Builds the question sets a session runs over.

use std::collections::{BTreeSet, HashMap, HashSet};
use std::sync::Arc;

use rand::rng;
use rand::seq::SliceRandom;
use tracing::debug;

use exam_core::model::{ChoiceKey, MockQuestion, OxItem, QuestionId, UserId};
use remote::{QuestionSource, VisibilityStore};

use crate::error::FetchError;

/// Fetches question sets and folds in the user's concealment state.
#[derive(Clone)]
pub struct QuestionSetLoader {
    questions: Arc<dyn QuestionSource>,
    visibility: Arc<dyn VisibilityStore>,
    user: UserId,
}

impl QuestionSetLoader {
    #[must_use]
    pub fn new(
        questions: Arc<dyn QuestionSource>,
        visibility: Arc<dyn VisibilityStore>,
        user: UserId,
    ) -> Self {
        Self {
            questions,
            visibility,
            user,
        }
    }

    /// Load the mock set for one (year, subject), in exam order.
    ///
    /// # Errors
    ///
    /// Returns `FetchError` when the remote fetch fails.
    pub async fn load_mock_set(
        &self,
        exam_year: i32,
        subject_code: &str,
    ) -> Result<Vec<MockQuestion>, FetchError> {
        let questions = self.questions.mock_questions(exam_year, subject_code).await?;
        debug!(count = questions.len(), exam_year, subject_code, "mock set loaded");
        Ok(questions)
    }

    /// Load the OX pool for a subject: every year's items, minus the
    /// choices the user has hidden, in a fresh shuffled order.
    ///
    /// Hidden keys are fetched year by year; any failure aborts the load
    /// rather than serving a set with stale concealment.
    ///
    /// # Errors
    ///
    /// Returns `FetchError` when the item fetch or any per-year
    /// visibility fetch fails.
    pub async fn load_ox_set(&self, subject_code: &str) -> Result<Vec<OxItem>, FetchError> {
        let mut items = self.questions.ox_items(subject_code).await?;

        let mut years: Vec<i32> = Vec::new();
        for item in &items {
            if !years.contains(&item.exam_year) {
                years.push(item.exam_year);
            }
        }

        let mut hidden: HashSet<ChoiceKey> = HashSet::new();
        for year in years {
            hidden.extend(self.load_hidden_keys(year, subject_code).await?);
        }

        items.retain(|item| !hidden.contains(&item.choice_key()));
        items.shuffle(&mut rng());
        debug!(
            count = items.len(),
            hidden = hidden.len(),
            subject_code,
            "ox set loaded"
        );
        Ok(items)
    }

    /// Hidden choice keys for one (year, subject).
    ///
    /// # Errors
    ///
    /// Returns `FetchError` when the visibility fetch fails.
    pub async fn load_hidden_keys(
        &self,
        exam_year: i32,
        subject_code: &str,
    ) -> Result<HashSet<ChoiceKey>, FetchError> {
        let rows = self
            .visibility
            .list_visibility(&self.user, exam_year, subject_code)
            .await?;
        Ok(rows
            .into_iter()
            .filter(|row| row.hidden)
            .map(|row| ChoiceKey::new(exam_year, subject_code, row.question_no, row.choice_no))
            .collect())
    }

    /// Per-question hidden choice numbers for a mock set, keyed by the
    /// set's own question ids.
    ///
    /// # Errors
    ///
    /// Returns `FetchError` when the visibility fetch fails.
    pub async fn load_mock_concealment(
        &self,
        questions: &[MockQuestion],
        exam_year: i32,
        subject_code: &str,
    ) -> Result<HashMap<QuestionId, BTreeSet<u32>>, FetchError> {
        let ids_by_no: HashMap<u32, QuestionId> =
            questions.iter().map(|q| (q.question_no, q.id)).collect();
        let keys = self.load_hidden_keys(exam_year, subject_code).await?;

        let mut hidden: HashMap<QuestionId, BTreeSet<u32>> = HashMap::new();
        for key in keys {
            if let Some(id) = ids_by_no.get(&key.question_no) {
                hidden.entry(*id).or_default().insert(key.choice_no);
            }
        }
        Ok(hidden)
    }
}
