use chrono::{DateTime, Utc};
use std::collections::{BTreeSet, HashMap};

use exam_core::model::{
    Answer, ExamOutcome, MockQuestion, OxItem, QuestionId, QuestionKey, QuestionStats, SessionMode,
};

use super::review::ResultProjector;

//
// ─── QUESTION SET ──────────────────────────────────────────────────────────────
//

/// The material a session runs over, fixed at start.
pub enum QuestionSet {
    Mock(Vec<MockQuestion>),
    Ox(Vec<OxItem>),
}

impl QuestionSet {
    #[must_use]
    pub fn len(&self) -> usize {
        match self {
            QuestionSet::Mock(questions) => questions.len(),
            QuestionSet::Ox(items) => items.len(),
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn id_at(&self, index: usize) -> Option<QuestionId> {
        match self {
            QuestionSet::Mock(questions) => questions.get(index).map(|q| q.id),
            QuestionSet::Ox(items) => items.get(index).map(|i| i.id),
        }
    }

    fn key_at(&self, index: usize) -> Option<QuestionKey> {
        match self {
            QuestionSet::Mock(questions) => questions.get(index).map(MockQuestion::key),
            QuestionSet::Ox(items) => items.get(index).map(OxItem::key),
        }
    }
}

//
// ─── PHASES AND NAVIGATION ─────────────────────────────────────────────────────
//

/// Lifecycle of a session. Grading failures revert `Grading` back to
/// `Answering`; `Reviewing` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
    Answering,
    Grading,
    Reviewing,
}

/// What a forward navigation did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdvanceOutcome {
    /// Cursor moved to the next question.
    Moved,
    /// Already at the last question; the cursor stayed put.
    AtEnd,
}

//
// ─── SESSION ───────────────────────────────────────────────────────────────────
//

/// In-memory state of one exam attempt.
///
/// Holds the fixed question set, the user's answers keyed by mode-local id,
/// a navigation cursor, and the per-session concealment overlay. Submission
/// itself lives in the workflow layer; the session only tracks the phase.
pub struct ExamSession {
    set: QuestionSet,
    subject_code: String,
    exam_year: Option<i32>,
    answers: HashMap<QuestionId, Answer>,
    cursor: usize,
    phase: SessionPhase,
    started_at: Option<DateTime<Utc>>,
    explanation_open: bool,
    hidden_choices: HashMap<QuestionId, BTreeSet<u32>>,
    stats_by_id: HashMap<QuestionId, QuestionStats>,
    review: Option<ResultProjector>,
}

impl ExamSession {
    /// A mock session over one (year, subject) set, in exam order.
    ///
    /// `started_at` is `None` when the session replays old material and no
    /// timer should run.
    #[must_use]
    pub fn new_mock(
        exam_year: i32,
        subject_code: impl Into<String>,
        questions: Vec<MockQuestion>,
        started_at: Option<DateTime<Utc>>,
    ) -> Self {
        Self {
            set: QuestionSet::Mock(questions),
            subject_code: subject_code.into(),
            exam_year: Some(exam_year),
            answers: HashMap::new(),
            cursor: 0,
            phase: SessionPhase::Answering,
            started_at,
            explanation_open: false,
            hidden_choices: HashMap::new(),
            stats_by_id: HashMap::new(),
            review: None,
        }
    }

    /// An OX session over a subject's cross-year pool.
    #[must_use]
    pub fn new_ox(
        subject_code: impl Into<String>,
        items: Vec<OxItem>,
        started_at: Option<DateTime<Utc>>,
    ) -> Self {
        Self {
            set: QuestionSet::Ox(items),
            subject_code: subject_code.into(),
            exam_year: None,
            answers: HashMap::new(),
            cursor: 0,
            phase: SessionPhase::Answering,
            started_at,
            explanation_open: false,
            hidden_choices: HashMap::new(),
            stats_by_id: HashMap::new(),
            review: None,
        }
    }

    #[must_use]
    pub fn mode(&self) -> SessionMode {
        match self.set {
            QuestionSet::Mock(_) => SessionMode::Mock,
            QuestionSet::Ox(_) => SessionMode::Ox,
        }
    }

    #[must_use]
    pub fn subject_code(&self) -> &str {
        &self.subject_code
    }

    #[must_use]
    pub fn exam_year(&self) -> Option<i32> {
        self.exam_year
    }

    #[must_use]
    pub fn phase(&self) -> SessionPhase {
        self.phase
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.set.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.set.is_empty()
    }

    #[must_use]
    pub fn cursor(&self) -> usize {
        self.cursor
    }

    #[must_use]
    pub fn started_at(&self) -> Option<DateTime<Utc>> {
        self.started_at
    }

    /// Seconds since the session started, or 0 when no timer is running.
    #[must_use]
    pub fn elapsed_seconds(&self, now: DateTime<Utc>) -> u64 {
        let Some(started_at) = self.started_at else {
            return 0;
        };
        u64::try_from((now - started_at).num_seconds()).unwrap_or(0)
    }

    #[must_use]
    pub fn current_id(&self) -> Option<QuestionId> {
        self.set.id_at(self.cursor)
    }

    #[must_use]
    pub fn current_key(&self) -> Option<QuestionKey> {
        self.set.key_at(self.cursor)
    }

    #[must_use]
    pub fn current_mock(&self) -> Option<&MockQuestion> {
        match &self.set {
            QuestionSet::Mock(questions) => questions.get(self.cursor),
            QuestionSet::Ox(_) => None,
        }
    }

    #[must_use]
    pub fn current_ox(&self) -> Option<&OxItem> {
        match &self.set {
            QuestionSet::Ox(items) => items.get(self.cursor),
            QuestionSet::Mock(_) => None,
        }
    }

    #[must_use]
    pub fn mock_questions(&self) -> Option<&[MockQuestion]> {
        match &self.set {
            QuestionSet::Mock(questions) => Some(questions),
            QuestionSet::Ox(_) => None,
        }
    }

    #[must_use]
    pub fn ox_items(&self) -> Option<&[OxItem]> {
        match &self.set {
            QuestionSet::Ox(items) => Some(items),
            QuestionSet::Mock(_) => None,
        }
    }

    /// Record an answer for the question under the cursor. Re-answering
    /// replaces the previous choice. No-op once grading has begun or when
    /// the set is empty.
    pub fn answer_current(&mut self, answer: Answer) {
        if self.phase != SessionPhase::Answering {
            return;
        }
        if let Some(id) = self.current_id() {
            self.answers.insert(id, answer);
        }
    }

    #[must_use]
    pub fn answer_for(&self, id: QuestionId) -> Option<&Answer> {
        self.answers.get(&id)
    }

    /// Distinct questions answered so far.
    #[must_use]
    pub fn answered_count(&self) -> usize {
        self.answers.len()
    }

    /// True when every question has a recorded answer and the session is
    /// still answering. The submit guard lives in [`Self::begin_grading`].
    #[must_use]
    pub fn all_answered(&self) -> bool {
        !self.set.is_empty()
            && self.phase == SessionPhase::Answering
            && self.answers.len() >= self.set.len()
    }

    /// Move forward one question. Closes any open explanation.
    pub fn advance(&mut self) -> AdvanceOutcome {
        if self.cursor + 1 < self.set.len() {
            self.cursor += 1;
            self.explanation_open = false;
            AdvanceOutcome::Moved
        } else {
            AdvanceOutcome::AtEnd
        }
    }

    /// Move back one question. An open explanation stays open so the user
    /// can compare adjacent questions against it.
    pub fn retreat(&mut self) {
        self.cursor = self.cursor.saturating_sub(1);
    }

    /// Jump straight to an index, clamped into the set. Closes any open
    /// explanation.
    pub fn jump_to(&mut self, index: usize) {
        if self.set.is_empty() {
            return;
        }
        self.cursor = index.min(self.set.len() - 1);
        self.explanation_open = false;
    }

    /// Position the cursor on the first question matching `key`. Returns
    /// false and leaves the cursor alone when no question matches.
    pub fn seek(&mut self, key: &QuestionKey) -> bool {
        let found = match &self.set {
            QuestionSet::Mock(questions) => questions.iter().position(|q| &q.key() == key),
            QuestionSet::Ox(items) => items.iter().position(|i| &i.key() == key),
        };
        match found {
            Some(index) => {
                self.cursor = index;
                self.explanation_open = false;
                true
            }
            None => false,
        }
    }

    #[must_use]
    pub fn explanation_open(&self) -> bool {
        self.explanation_open
    }

    pub fn toggle_explanation(&mut self) {
        self.explanation_open = !self.explanation_open;
    }

    pub fn open_explanation(&mut self) {
        self.explanation_open = true;
    }

    /// Flip a choice's hidden flag on the question under the cursor.
    /// Returns the new hidden state, or `None` when the set is empty.
    pub fn toggle_conceal(&mut self, choice_no: u32) -> Option<bool> {
        let id = self.current_id()?;
        let choices = self.hidden_choices.entry(id).or_default();
        if choices.remove(&choice_no) {
            Some(false)
        } else {
            choices.insert(choice_no);
            Some(true)
        }
    }

    #[must_use]
    pub fn is_concealed(&self, id: QuestionId, choice_no: u32) -> bool {
        self.hidden_choices
            .get(&id)
            .is_some_and(|choices| choices.contains(&choice_no))
    }

    /// Preload the concealment overlay fetched at session start.
    pub fn set_hidden_choices(&mut self, hidden: HashMap<QuestionId, BTreeSet<u32>>) {
        self.hidden_choices = hidden;
    }

    /// Attach the per-question answering-history overlay.
    pub fn set_stats(&mut self, stats: HashMap<QuestionId, QuestionStats>) {
        self.stats_by_id = stats;
    }

    #[must_use]
    pub fn stats_for(&self, id: QuestionId) -> Option<&QuestionStats> {
        self.stats_by_id.get(&id)
    }

    /// Enter the grading phase. Returns false when a submission is already
    /// in flight or the session is done, so a second trigger cannot double
    /// submit.
    pub fn begin_grading(&mut self) -> bool {
        if self.phase == SessionPhase::Answering {
            self.phase = SessionPhase::Grading;
            true
        } else {
            false
        }
    }

    /// Revert a failed submission back to answering.
    pub fn abort_grading(&mut self) {
        if self.phase == SessionPhase::Grading {
            self.phase = SessionPhase::Answering;
        }
    }

    /// Accept the graded outcome and move to review.
    pub fn finish_grading(&mut self, outcome: ExamOutcome) {
        self.phase = SessionPhase::Reviewing;
        self.review = Some(ResultProjector::new(outcome));
    }

    /// Answers in wire form, keyed by mode-local id.
    #[must_use]
    pub fn answers_payload(&self) -> HashMap<QuestionId, String> {
        self.answers
            .iter()
            .map(|(id, answer)| (*id, answer.payload()))
            .collect()
    }

    #[must_use]
    pub fn review(&self) -> Option<&ResultProjector> {
        self.review.as_ref()
    }

    pub fn review_mut(&mut self) -> Option<&mut ResultProjector> {
        self.review.as_mut()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use exam_core::model::OxAnswer;
    use exam_core::time::fixed_now;

    fn mock_set(count: u32) -> Vec<MockQuestion> {
        (1..=count)
            .map(|no| MockQuestion {
                id: QuestionId::new(i64::from(no)),
                exam_year: 2021,
                subject_code: "TAX".into(),
                subject_name: "Tax Law".into(),
                question_no: no,
                question_text: format!("q{no}"),
                choices: vec!["a".into(), "b".into(), "c".into(), "d".into()],
            })
            .collect()
    }

    fn ox_set(count: u32) -> Vec<OxItem> {
        (1..=count)
            .map(|no| OxItem {
                id: QuestionId::new(i64::from(no)),
                exam_year: 2020,
                subject_code: "TAX".into(),
                question_no: no,
                choice_no: 1,
                choice_text: format!("statement {no}"),
                expected: Some(OxAnswer::O),
                explanation: None,
            })
            .collect()
    }

    #[test]
    fn advance_stops_at_the_last_question() {
        let mut session = ExamSession::new_mock(2021, "TAX", mock_set(2), Some(fixed_now()));
        assert_eq!(session.advance(), AdvanceOutcome::Moved);
        assert_eq!(session.advance(), AdvanceOutcome::AtEnd);
        assert_eq!(session.cursor(), 1);
    }

    #[test]
    fn retreat_saturates_at_zero() {
        let mut session = ExamSession::new_mock(2021, "TAX", mock_set(2), Some(fixed_now()));
        session.retreat();
        assert_eq!(session.cursor(), 0);
    }

    #[test]
    fn jump_is_clamped_into_the_set() {
        let mut session = ExamSession::new_mock(2021, "TAX", mock_set(3), Some(fixed_now()));
        session.jump_to(99);
        assert_eq!(session.cursor(), 2);
        assert_eq!(session.mock_questions().map(<[MockQuestion]>::len), Some(3));
        assert!(session.ox_items().is_none());
    }

    #[test]
    fn advance_closes_explanation_and_retreat_keeps_it() {
        let mut session = ExamSession::new_mock(2021, "TAX", mock_set(3), Some(fixed_now()));
        session.advance();
        session.toggle_explanation();
        assert!(session.explanation_open());
        session.retreat();
        assert!(session.explanation_open());
        session.advance();
        assert!(!session.explanation_open());
    }

    #[test]
    fn reanswering_replaces_not_duplicates() {
        let mut session = ExamSession::new_ox("TAX", ox_set(2), Some(fixed_now()));
        session.answer_current(Answer::Ox(OxAnswer::O));
        session.answer_current(Answer::Ox(OxAnswer::X));
        assert_eq!(session.answered_count(), 1);
        assert_eq!(
            session.answer_for(QuestionId::new(1)),
            Some(&Answer::Ox(OxAnswer::X))
        );
        assert!(!session.all_answered());
        session.advance();
        session.answer_current(Answer::Ox(OxAnswer::O));
        assert!(session.all_answered());
    }

    #[test]
    fn begin_grading_fires_once() {
        let mut session = ExamSession::new_ox("TAX", ox_set(1), Some(fixed_now()));
        session.answer_current(Answer::Ox(OxAnswer::O));
        assert!(session.begin_grading());
        assert!(!session.begin_grading());
        session.abort_grading();
        assert!(session.begin_grading());
    }

    #[test]
    fn answers_are_frozen_once_grading_begins() {
        let mut session = ExamSession::new_mock(2021, "TAX", mock_set(1), Some(fixed_now()));
        session.answer_current(Answer::Choice(2));
        session.begin_grading();
        session.answer_current(Answer::Choice(4));
        let payload = session.answers_payload();
        assert_eq!(payload.get(&QuestionId::new(1)).map(String::as_str), Some("2"));
    }

    #[test]
    fn ox_payload_has_one_entry_per_item() {
        let mut session = ExamSession::new_ox("TAX", ox_set(2), Some(fixed_now()));
        session.answer_current(Answer::Ox(OxAnswer::O));
        session.advance();
        assert_eq!(session.current_ox().map(|i| i.question_no), Some(2));
        session.answer_current(Answer::Ox(OxAnswer::X));
        let payload = session.answers_payload();
        assert_eq!(payload.len(), 2);
        assert_eq!(payload.get(&QuestionId::new(1)).map(String::as_str), Some("O"));
        assert_eq!(payload.get(&QuestionId::new(2)).map(String::as_str), Some("X"));
    }

    #[test]
    fn elapsed_is_zero_without_a_start_time() {
        let session = ExamSession::new_mock(2021, "TAX", mock_set(1), None);
        assert_eq!(session.elapsed_seconds(fixed_now()), 0);
    }

    #[test]
    fn elapsed_never_goes_negative() {
        let start = fixed_now();
        let session = ExamSession::new_mock(2021, "TAX", mock_set(1), Some(start));
        assert_eq!(session.elapsed_seconds(start), 0);
        assert_eq!(session.elapsed_seconds(start - Duration::seconds(5)), 0);
        assert_eq!(session.elapsed_seconds(start + Duration::seconds(90)), 90);
    }

    #[test]
    fn conceal_toggle_round_trips() {
        let mut session = ExamSession::new_mock(2021, "TAX", mock_set(1), Some(fixed_now()));
        let id = session.current_id().unwrap();
        assert_eq!(session.toggle_conceal(3), Some(true));
        assert!(session.is_concealed(id, 3));
        assert_eq!(session.toggle_conceal(3), Some(false));
        assert!(!session.is_concealed(id, 3));
    }

    #[test]
    fn seek_positions_on_the_matching_question() {
        let mut session = ExamSession::new_mock(2021, "TAX", mock_set(5), None);
        assert!(session.seek(&QuestionKey::new(2021, "TAX", 4)));
        assert_eq!(session.cursor(), 3);
        assert_eq!(session.current_key(), Some(QuestionKey::new(2021, "TAX", 4)));
        assert!(!session.seek(&QuestionKey::new(1999, "TAX", 4)));
        assert_eq!(session.cursor(), 3);
    }
}
