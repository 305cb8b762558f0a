#![forbid(unsafe_code)]

pub mod annotations;
pub mod error;
pub mod loader;
pub mod notes;
pub mod sessions;

pub use exam_core::Clock;

pub use annotations::{AnnotationStore, FavoriteToggle, MemoPersistence};
pub use error::{FetchError, SessionError};
pub use loader::QuestionSetLoader;
pub use notes::{NoteFilter, NotesAggregator};
pub use sessions::{
    AdvanceOutcome, ConcealToggle, ExamSession, MockChoiceVerdict, OxProgress, OxVerdict,
    QuestionSet, ResultProjector, ReviewMark, SessionPhase, SessionStart, SessionWorkflow,
    SubmitStatus, SyncState,
};
