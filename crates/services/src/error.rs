//! Shared error types for the services crate.

use thiserror::Error;

use remote::RemoteError;

/// Errors emitted while fetching question sets, annotations, or statistics.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum FetchError {
    #[error(transparent)]
    Remote(#[from] RemoteError),
}

/// Errors emitted by exam sessions.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum SessionError {
    #[error("no questions available for session")]
    Empty,
    #[error(transparent)]
    Fetch(#[from] FetchError),
}

impl From<RemoteError> for SessionError {
    fn from(err: RemoteError) -> Self {
        SessionError::Fetch(FetchError::Remote(err))
    }
}
