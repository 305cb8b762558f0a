use serde::{Deserialize, Serialize};

/// Per-user answering history for one question or OX item.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct QuestionStats {
    pub solved_count: u32,
    pub correct_count: u32,
    /// Percentage in [0, 100], as reported by the statistics service.
    pub accuracy: f64,
}

impl QuestionStats {
    #[must_use]
    pub fn new(solved_count: u32, correct_count: u32, accuracy: f64) -> Self {
        Self {
            solved_count,
            correct_count,
            accuracy,
        }
    }
}
