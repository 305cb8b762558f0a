use serde::{Deserialize, Serialize};

use crate::model::ids::QuestionId;
use crate::model::question::OxAnswer;

/// Graded detail for one mock question.
///
/// `selected_answer` and `correct_answer` are stringified 1-based choice
/// numbers; an empty `selected_answer` means the question went unanswered,
/// which is distinct from answered-incorrectly.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MockDetail {
    pub question_id: QuestionId,
    pub exam_year: i32,
    pub subject_code: String,
    pub question_no: u32,
    pub question_text: String,
    pub choices: Vec<String>,
    pub selected_answer: String,
    pub correct_answer: String,
    pub is_correct: bool,
    pub explanation_text: String,
}

/// Graded detail for one OX item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OxDetail {
    pub item_id: QuestionId,
    pub exam_year: i32,
    pub subject_code: String,
    pub question_no: u32,
    pub choice_no: u32,
    pub choice_text: String,
    pub selected: Option<OxAnswer>,
    pub expected: Option<OxAnswer>,
    pub is_correct: bool,
    pub explanation: Option<String>,
}

/// One per-question record inside a graded result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum GradedDetail {
    Mock(MockDetail),
    Ox(OxDetail),
}

impl GradedDetail {
    /// Whether any answer was recorded for this question.
    #[must_use]
    pub fn is_answered(&self) -> bool {
        match self {
            GradedDetail::Mock(d) => !d.selected_answer.trim().is_empty(),
            GradedDetail::Ox(d) => d.selected.is_some(),
        }
    }

    #[must_use]
    pub fn is_correct(&self) -> bool {
        match self {
            GradedDetail::Mock(d) => d.is_correct,
            GradedDetail::Ox(d) => d.is_correct,
        }
    }
}

/// The graded result of one submitted session.
///
/// The detail order is authoritative for review navigation; it is whatever
/// the grading service returned and need not match answering order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExamOutcome {
    pub total_questions: u32,
    pub correct_count: u32,
    pub details: Vec<GradedDetail>,
}

impl ExamOutcome {
    /// Score on a 100-point scale, rounded to one decimal place.
    #[must_use]
    pub fn score_100(&self) -> f64 {
        if self.total_questions == 0 {
            return 0.0;
        }
        let raw = f64::from(self.correct_count) / f64::from(self.total_questions) * 100.0;
        (raw * 10.0).round() / 10.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mock_detail(selected: &str, correct: &str) -> GradedDetail {
        GradedDetail::Mock(MockDetail {
            question_id: QuestionId::new(1),
            exam_year: 2021,
            subject_code: "TAX".into(),
            question_no: 1,
            question_text: "Q".into(),
            choices: vec!["a".into(), "b".into()],
            selected_answer: selected.into(),
            correct_answer: correct.into(),
            is_correct: !selected.is_empty() && selected == correct,
            explanation_text: String::new(),
        })
    }

    #[test]
    fn blank_selection_is_unanswered_not_wrong() {
        assert!(!mock_detail("", "2").is_answered());
        assert!(mock_detail("3", "2").is_answered());
        assert!(!mock_detail("3", "2").is_correct());
    }

    #[test]
    fn score_rounds_to_one_decimal() {
        let outcome = ExamOutcome {
            total_questions: 3,
            correct_count: 2,
            details: Vec::new(),
        };
        assert!((outcome.score_100() - 66.7).abs() < f64::EPSILON);

        let empty = ExamOutcome {
            total_questions: 0,
            correct_count: 0,
            details: Vec::new(),
        };
        assert!((empty.score_100() - 0.0).abs() < f64::EPSILON);
    }
}
