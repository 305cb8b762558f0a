//! Exam session state, grading workflow, and result review.

pub mod review;
pub mod state;
pub mod workflow;

pub use review::{MockChoiceVerdict, OxVerdict, ResultProjector, ReviewMark};
pub use state::{AdvanceOutcome, ExamSession, QuestionSet, SessionPhase};
pub use workflow::{
    ConcealToggle, OxProgress, SessionStart, SessionWorkflow, SubmitStatus, SyncState,
};
