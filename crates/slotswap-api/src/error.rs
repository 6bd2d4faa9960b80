use reqwest::StatusCode;
use thiserror::Error;

/// Errors surfaced by [`crate::ApiClient`] calls.
#[derive(Debug, Error)]
pub enum ApiError {
    /// The request never produced a response, or the response body could
    /// not be decoded.
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),

    /// The server answered with a non-success status.
    #[error("server returned {status}: {body}")]
    Status { status: StatusCode, body: String },
}

impl ApiError {
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            ApiError::Transport(err) => err.status(),
            ApiError::Status { status, .. } => Some(*status),
        }
    }

    /// The stored credential is no longer accepted. Callers should discard
    /// it and send the user back through login.
    pub fn is_session_invalid(&self) -> bool {
        matches!(
            self.status(),
            Some(StatusCode::UNAUTHORIZED) | Some(StatusCode::FORBIDDEN)
        )
    }

    /// Another user's action got there first, e.g. a slot that was claimed
    /// while our request was in flight.
    pub fn is_conflict(&self) -> bool {
        self.status() == Some(StatusCode::CONFLICT)
    }
}
