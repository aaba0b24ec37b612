use axum::{http::StatusCode, response::{IntoResponse, Response}, Json};
use serde_json::json;
use thiserror::Error;

pub const GENERIC_FAILURE: &str = "Failed to generate story. Please try again.";

/// Failures that end a visit in the error state.
#[derive(Debug, Error)]
pub enum StoryError {
    #[error("OpenAI API key is not configured")]
    MissingApiKey,
    #[error("story response was not valid JSON: {0}")]
    MalformedResponse(String),
    #[error("story response is missing `{0}`")]
    MissingContent(&'static str),
    #[error("provider returned status {status}: {message}")]
    Provider { status: u16, message: String },
    #[error("transport error: {0}")]
    Transport(String),
}

impl StoryError {
    /// Text shown on the error panel.
    pub fn user_message(&self) -> String {
        match self {
            StoryError::MissingApiKey => {
                "Please set your OpenAI API key in the .env file".to_string()
            }
            StoryError::MalformedResponse(_) => {
                "Failed to parse story response. Please try again.".to_string()
            }
            StoryError::MissingContent(_) => {
                "Invalid story format received. Please try again.".to_string()
            }
            // Client-side rejections carry a message meant for the caller; server faults don't.
            StoryError::Provider { status, message }
                if (400..500).contains(status) && !message.is_empty() =>
            {
                message.clone()
            }
            StoryError::Provider { .. } | StoryError::Transport(_) => GENERIC_FAILURE.to_string(),
        }
    }
}

impl From<reqwest::Error> for StoryError {
    fn from(err: reqwest::Error) -> Self {
        StoryError::Transport(err.to_string())
    }
}

/// Errors returned by the HTTP API itself.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("not found")]
    NotFound,
    #[error("photo exceeds {0} bytes")]
    PhotoTooLarge(usize),
    #[error("bad upload: {0}")]
    BadUpload(String),
    #[error("story is not ready")]
    NotReady,
    #[error("internal error: {0}")]
    Internal(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self {
            ApiError::NotFound => StatusCode::NOT_FOUND,
            ApiError::PhotoTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
            ApiError::BadUpload(_) => StatusCode::BAD_REQUEST,
            ApiError::NotReady => StatusCode::CONFLICT,
            ApiError::Internal(msg) => {
                tracing::error!("❌ Internal error: {}", msg);
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };
        let message = match &self {
            ApiError::Internal(_) => "internal error".to_string(),
            other => other.to_string(),
        };
        (status, Json(json!({ "error": message }))).into_response()
    }
}
