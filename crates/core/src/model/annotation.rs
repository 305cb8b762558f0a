use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::model::ids::QuestionKey;
use crate::model::question::SessionMode;

/// The three favorite colors a question can be tagged with.
///
/// A question holds at most one active color; absence means not favorited.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FavoriteColor {
    Red,
    Yellow,
    Green,
}

impl FavoriteColor {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            FavoriteColor::Red => "red",
            FavoriteColor::Yellow => "yellow",
            FavoriteColor::Green => "green",
        }
    }
}

impl FromStr for FavoriteColor {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "red" => Ok(FavoriteColor::Red),
            "yellow" => Ok(FavoriteColor::Yellow),
            "green" => Ok(FavoriteColor::Green),
            _ => Err(()),
        }
    }
}

impl fmt::Display for FavoriteColor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The tag list attached to a persisted favorite.
///
/// OX-sourced favorites carry an extra `"ox"` tag so the saved-items
/// browser can tell the two modes apart.
#[must_use]
pub fn favorite_tags(color: FavoriteColor, mode: SessionMode) -> Vec<String> {
    let mut tags = vec!["favorite".to_string(), color.as_str().to_string()];
    if mode == SessionMode::Ox {
        tags.push("ox".to_string());
    }
    tags
}

/// One favorited question as surfaced by the saved-items browser.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NoteEntry {
    pub exam_year: i32,
    pub subject_code: String,
    pub subject_name: String,
    pub question_no: u32,
    pub color: FavoriteColor,
    pub memo: String,
    pub tags: Vec<String>,
    pub source: SessionMode,
}

impl NoteEntry {
    /// The question identity this favorite points back at.
    #[must_use]
    pub fn key(&self) -> QuestionKey {
        QuestionKey::new(self.exam_year, self.subject_code.clone(), self.question_no)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn color_round_trips_through_str() {
        for color in [
            FavoriteColor::Red,
            FavoriteColor::Yellow,
            FavoriteColor::Green,
        ] {
            assert_eq!(color.as_str().parse::<FavoriteColor>().unwrap(), color);
        }
        assert!("blue".parse::<FavoriteColor>().is_err());
    }

    #[test]
    fn ox_favorites_carry_the_source_tag() {
        assert_eq!(
            favorite_tags(FavoriteColor::Red, SessionMode::Ox),
            vec!["favorite", "red", "ox"]
        );
        assert_eq!(
            favorite_tags(FavoriteColor::Green, SessionMode::Mock),
            vec!["favorite", "green"]
        );
    }
}
