mod annotation;
mod ids;
mod outcome;
mod question;
mod stats;

pub use annotation::{FavoriteColor, NoteEntry, favorite_tags};
pub use ids::{ChoiceKey, QuestionId, QuestionKey, UserId};
pub use outcome::{ExamOutcome, GradedDetail, MockDetail, OxDetail};
pub use question::{Answer, AnswerError, MockQuestion, OxAnswer, OxItem, SessionMode};
pub use stats::QuestionStats;
