use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;

/// Failures surfaced while building or running a quiz.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum QuizError {
    #[error("No reading plan found for today.")]
    NoPlanFound,

    #[error("No verses found for today's reading plan.")]
    NoVersesFound,

    #[error("Could not generate any valid quiz question.")]
    NoValidQuestion,

    #[error("Stored quiz state is invalid: {0}")]
    InvalidSessionState(String),
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Debug, Error)]
pub enum LineError {
    #[error("LINE request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("LINE API returned {status}: {body}")]
    Status { status: u16, body: String },
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{0} is not set")]
    Missing(&'static str),

    #[error("{name} is invalid: {value}")]
    Invalid { name: &'static str, value: String },
}

/// Error type for HTTP handlers, rendered as `{"error": ...}`.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    NotFound(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = match &self {
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
        };
        let body = serde_json::json!({ "error": self.to_string() });
        (status, axum::Json(body)).into_response()
    }
}
