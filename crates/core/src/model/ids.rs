use serde::{Deserialize, Serialize};
use std::fmt;

/// Local user identity, provisioned outside the engine.
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UserId(String);

impl UserId {
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the underlying identifier string.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Mode-local surrogate identifier for a loaded question or OX item.
///
/// Valid only within one loaded question set; cross-mode correlation
/// always goes through [`QuestionKey`] / [`ChoiceKey`].
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct QuestionId(i64);

impl QuestionId {
    /// Creates a new `QuestionId`
    #[must_use]
    pub fn new(id: i64) -> Self {
        Self(id)
    }

    /// Returns the underlying i64 value
    #[must_use]
    pub fn value(&self) -> i64 {
        self.0
    }
}

/// Composite identity of an exam question: (exam year, subject, exam question number).
///
/// This is the join key for question content, favorites, and memos across
/// sessions and modes.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct QuestionKey {
    pub exam_year: i32,
    pub subject_code: String,
    pub question_no: u32,
}

impl QuestionKey {
    #[must_use]
    pub fn new(exam_year: i32, subject_code: impl Into<String>, question_no: u32) -> Self {
        Self {
            exam_year,
            subject_code: subject_code.into(),
            question_no,
        }
    }
}

/// Per-choice identity: a [`QuestionKey`] extended with the 1-based choice number.
///
/// Choice visibility state and OX items are addressed at this granularity.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ChoiceKey {
    pub exam_year: i32,
    pub subject_code: String,
    pub question_no: u32,
    pub choice_no: u32,
}

impl ChoiceKey {
    #[must_use]
    pub fn new(
        exam_year: i32,
        subject_code: impl Into<String>,
        question_no: u32,
        choice_no: u32,
    ) -> Self {
        Self {
            exam_year,
            subject_code: subject_code.into(),
            question_no,
            choice_no,
        }
    }

    /// The question-level key this choice belongs to.
    #[must_use]
    pub fn question_key(&self) -> QuestionKey {
        QuestionKey::new(self.exam_year, self.subject_code.clone(), self.question_no)
    }
}

impl fmt::Debug for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "UserId({})", self.0)
    }
}

impl fmt::Debug for QuestionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "QuestionId({})", self.0)
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for QuestionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for QuestionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}|{}|{}",
            self.exam_year, self.subject_code, self.question_no
        )
    }
}

impl fmt::Display for ChoiceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}|{}|{}|{}",
            self.exam_year, self.subject_code, self.question_no, self.choice_no
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn question_key_display_uses_pipe_separator() {
        let key = QuestionKey::new(2021, "TAX", 7);
        assert_eq!(key.to_string(), "2021|TAX|7");
    }

    #[test]
    fn choice_key_extends_question_key() {
        let key = ChoiceKey::new(2021, "TAX", 7, 2);
        assert_eq!(key.to_string(), "2021|TAX|7|2");
        assert_eq!(key.question_key(), QuestionKey::new(2021, "TAX", 7));
    }

    #[test]
    fn choice_keys_differ_by_choice_no() {
        let a = ChoiceKey::new(2021, "TAX", 7, 1);
        let b = ChoiceKey::new(2021, "TAX", 7, 2);
        assert_ne!(a, b);
    }
}
