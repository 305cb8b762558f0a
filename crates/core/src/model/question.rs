use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

use crate::model::ids::{ChoiceKey, QuestionId, QuestionKey};

//
// ─── ERRORS ───────────────────────────────────────────────────────────────────
//

/// Errors for parsing answer values from their wire form.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AnswerError {
    #[error("invalid OX answer: {0:?}")]
    InvalidOx(String),
    #[error("invalid choice answer: {0:?}")]
    InvalidChoice(String),
}

//
// ─── SESSION MODE ─────────────────────────────────────────────────────────────
//

/// The two practice-exam flavors the engine can drive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionMode {
    /// Fixed-order multiple-choice exam for one (year, subject).
    Mock,
    /// Shuffled cross-year true/false statement pool for one subject.
    Ox,
}

impl SessionMode {
    /// Lowercase wire name, as used in favorite source tags.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            SessionMode::Mock => "mock",
            SessionMode::Ox => "ox",
        }
    }

    /// Parses a source tag, case-insensitively. Unknown values fall back
    /// to `Mock`, matching how saved favorites without a source are read.
    #[must_use]
    pub fn from_source_tag(tag: &str) -> Self {
        if tag.trim().eq_ignore_ascii_case("ox") {
            SessionMode::Ox
        } else {
            SessionMode::Mock
        }
    }
}

impl fmt::Display for SessionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

//
// ─── ANSWERS ──────────────────────────────────────────────────────────────────
//

/// An O/X judgment on a single statement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OxAnswer {
    O,
    X,
}

impl OxAnswer {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            OxAnswer::O => "O",
            OxAnswer::X => "X",
        }
    }
}

impl FromStr for OxAnswer {
    type Err = AnswerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "O" => Ok(OxAnswer::O),
            "X" => Ok(OxAnswer::X),
            other => Err(AnswerError::InvalidOx(other.to_string())),
        }
    }
}

impl fmt::Display for OxAnswer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A recorded answer for one loaded question.
///
/// The wire payload is the stringified 1-based choice number for mock
/// questions and `"O"`/`"X"` for OX items.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Answer {
    Choice(u32),
    Ox(OxAnswer),
}

impl Answer {
    /// The string form carried in submission payloads.
    #[must_use]
    pub fn payload(&self) -> String {
        match self {
            Answer::Choice(no) => no.to_string(),
            Answer::Ox(ox) => ox.as_str().to_string(),
        }
    }
}

impl fmt::Display for Answer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Answer::Choice(no) => write!(f, "{no}"),
            Answer::Ox(ox) => f.write_str(ox.as_str()),
        }
    }
}

//
// ─── QUESTIONS ────────────────────────────────────────────────────────────────
//

/// A multiple-choice question as served for a mock session.
///
/// The official answer and explanation are withheld by the service until
/// grading; only the displayable content is present here.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MockQuestion {
    pub id: QuestionId,
    pub exam_year: i32,
    pub subject_code: String,
    pub subject_name: String,
    pub question_no: u32,
    pub question_text: String,
    /// Choice texts in display order; choice numbering is 1-based.
    pub choices: Vec<String>,
}

impl MockQuestion {
    /// The cross-session identity of this question.
    #[must_use]
    pub fn key(&self) -> QuestionKey {
        QuestionKey::new(self.exam_year, self.subject_code.clone(), self.question_no)
    }
}

/// A single statement to judge O or X, addressed at per-choice granularity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OxItem {
    pub id: QuestionId,
    pub exam_year: i32,
    pub subject_code: String,
    pub question_no: u32,
    pub choice_no: u32,
    pub choice_text: String,
    /// The expected judgment; absent when the source item is not yet keyed.
    pub expected: Option<OxAnswer>,
    /// Explanation or judge reason, when available.
    pub explanation: Option<String>,
}

impl OxItem {
    /// The question-level identity (favorites and memos attach here).
    #[must_use]
    pub fn key(&self) -> QuestionKey {
        QuestionKey::new(self.exam_year, self.subject_code.clone(), self.question_no)
    }

    /// The per-choice identity used for visibility filtering.
    #[must_use]
    pub fn choice_key(&self) -> ChoiceKey {
        ChoiceKey::new(
            self.exam_year,
            self.subject_code.clone(),
            self.question_no,
            self.choice_no,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ox_answer_parses_case_insensitively() {
        assert_eq!("o".parse::<OxAnswer>().unwrap(), OxAnswer::O);
        assert_eq!(" X ".parse::<OxAnswer>().unwrap(), OxAnswer::X);
        assert!("maybe".parse::<OxAnswer>().is_err());
    }

    #[test]
    fn answer_payloads_match_wire_form() {
        assert_eq!(Answer::Choice(3).payload(), "3");
        assert_eq!(Answer::Ox(OxAnswer::O).payload(), "O");
        assert_eq!(Answer::Ox(OxAnswer::X).payload(), "X");
    }

    #[test]
    fn source_tag_defaults_to_mock() {
        assert_eq!(SessionMode::from_source_tag("OX"), SessionMode::Ox);
        assert_eq!(SessionMode::from_source_tag("mock"), SessionMode::Mock);
        assert_eq!(SessionMode::from_source_tag(""), SessionMode::Mock);
    }

    #[test]
    fn ox_item_keys_carry_choice_granularity() {
        let item = OxItem {
            id: QuestionId::new(9),
            exam_year: 2022,
            subject_code: "ACC".into(),
            question_no: 4,
            choice_no: 3,
            choice_text: "A statement".into(),
            expected: Some(OxAnswer::X),
            explanation: None,
        };
        assert_eq!(item.key(), QuestionKey::new(2022, "ACC", 4));
        assert_eq!(item.choice_key(), ChoiceKey::new(2022, "ACC", 4, 3));
    }
}
