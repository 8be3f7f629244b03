//! Feedback collaborator errors.

use thiserror::Error;

pub type FeedbackResult<T> = Result<T, FeedbackError>;

#[derive(Debug, Error)]
pub enum FeedbackError {
    #[error("Feedback service not configured (OPENAI_API_KEY is unset)")]
    NotConfigured,

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Feedback service returned {status}: {body}")]
    RequestFailed { status: u16, body: String },

    #[error("Feedback service returned no content")]
    EmptyResponse,
}

impl FeedbackError {
    /// Whether another attempt could succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            FeedbackError::Network(e) => e.is_timeout() || e.is_connect() || e.is_request(),
            FeedbackError::RequestFailed { status, .. } => *status == 429 || *status >= 500,
            FeedbackError::NotConfigured | FeedbackError::EmptyResponse => false,
        }
    }
}
