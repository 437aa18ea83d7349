use axum::{http::StatusCode, response::{IntoResponse, Response}};
use thiserror::Error;

pub type ChatResult<T> = Result<T, ChatError>;

#[derive(Debug, Error)]
pub enum ChatError {
    #[error("store unavailable: {0}")]
    StoreUnavailable(#[from] sqlx::Error),

    #[error("user {0} not found")]
    NotFound(String),

    #[error("invalid `{event}` payload: {reason}")]
    Validation {
        event: String,
        reason: String,
    },
}

impl ChatError {
    pub fn validation(event: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Validation {
            event: event.into(),
            reason: reason.into(),
        }
    }
}

// the http surface only ever answers failures with a bare 400
impl IntoResponse for ChatError {
    fn into_response(self) -> Response {
        tracing::warn!(error = %self, "request failed");
        StatusCode::BAD_REQUEST.into_response()
    }
}
