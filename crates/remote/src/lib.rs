#![forbid(unsafe_code)]

pub mod contract;
pub mod http;
pub mod memory;

pub use contract::{
    ExamApi, Explanation, FavoriteStore, FavoriteUpsert, GradingService, MockSubmission,
    OxSubmission, QuestionSource, RemoteError, StatsRow, StatsSource, VisibilityRow,
    VisibilityStore,
};
pub use http::{HttpConfig, HttpExamApi};
pub use memory::InMemoryExamApi;
