use exam_core::model::{ExamOutcome, GradedDetail, MockDetail, OxDetail};

/// One cell of the result grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReviewMark {
    Correct,
    Wrong,
    Unanswered,
}

impl ReviewMark {
    /// The grid glyph: correct, wrong, or skipped.
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            ReviewMark::Correct => "○",
            ReviewMark::Wrong => "X",
            ReviewMark::Unanswered => "-",
        }
    }
}

/// How one mock choice renders during review.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MockChoiceVerdict {
    /// This is the official answer.
    Correct,
    /// The user picked this one and it is not the official answer.
    SelectedWrong,
    Plain,
}

/// How one OX item renders during review. Neutral covers items where
/// either side (selection or official answer) is missing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OxVerdict {
    Correct,
    Wrong,
    Neutral,
}

/// Read-only projection over a graded outcome, with a cursor for stepping
/// through details during review.
pub struct ResultProjector {
    outcome: ExamOutcome,
    selected: usize,
}

impl ResultProjector {
    #[must_use]
    pub fn new(outcome: ExamOutcome) -> Self {
        Self {
            outcome,
            selected: 0,
        }
    }

    #[must_use]
    pub fn outcome(&self) -> &ExamOutcome {
        &self.outcome
    }

    #[must_use]
    pub fn total_questions(&self) -> u32 {
        self.outcome.total_questions
    }

    #[must_use]
    pub fn correct_count(&self) -> u32 {
        self.outcome.correct_count
    }

    /// Score scaled to 100, one decimal.
    #[must_use]
    pub fn score(&self) -> f64 {
        self.outcome.score_100()
    }

    /// One mark per detail, in grading order.
    #[must_use]
    pub fn grid(&self) -> Vec<ReviewMark> {
        self.outcome.details.iter().map(Self::mark).collect()
    }

    fn mark(detail: &GradedDetail) -> ReviewMark {
        if !detail.is_answered() {
            ReviewMark::Unanswered
        } else if detail.is_correct() {
            ReviewMark::Correct
        } else {
            ReviewMark::Wrong
        }
    }

    #[must_use]
    pub fn selected(&self) -> usize {
        self.selected
    }

    /// Focus a detail by grid index, clamped into range.
    pub fn select(&mut self, index: usize) {
        if self.outcome.details.is_empty() {
            return;
        }
        self.selected = index.min(self.outcome.details.len() - 1);
    }

    #[must_use]
    pub fn current_detail(&self) -> Option<&GradedDetail> {
        self.outcome.details.get(self.selected)
    }

    /// Verdict for one choice of a mock detail, by 1-based choice number.
    #[must_use]
    pub fn mock_choice_verdict(detail: &MockDetail, choice_no: u32) -> MockChoiceVerdict {
        let choice = choice_no.to_string();
        if detail.correct_answer == choice {
            MockChoiceVerdict::Correct
        } else if detail.selected_answer == choice {
            MockChoiceVerdict::SelectedWrong
        } else {
            MockChoiceVerdict::Plain
        }
    }

    /// Three-way verdict for an OX detail: scored only when both the
    /// selection and the official answer are present.
    #[must_use]
    pub fn ox_verdict(detail: &OxDetail) -> OxVerdict {
        match (detail.selected, detail.expected) {
            (Some(selected), Some(expected)) if selected == expected => OxVerdict::Correct,
            (Some(_), Some(_)) => OxVerdict::Wrong,
            _ => OxVerdict::Neutral,
        }
    }
}
