//! Coaching feedback for mismatched predictions.
//!
//! When the predicted emotion differs from the one the speaker declared, the
//! pipeline asks a [`FeedbackCollaborator`] for corrective advice. Failures
//! here never fail a request; callers turn them into a diagnostic string.

pub mod client;
pub mod error;
pub mod prompt;

use async_trait::async_trait;
use emo_models::{FeedbackPayload, PredictionResult};

pub use client::{FeedbackConfig, OpenAiFeedbackClient};
pub use error::{FeedbackError, FeedbackResult};
pub use prompt::{parse_feedback, KEY_SUMMARY_MARKER, MISSING_SUMMARY};

/// Source of corrective feedback.
#[async_trait]
pub trait FeedbackCollaborator: Send + Sync {
    async fn request_feedback(
        &self,
        prediction: &PredictionResult,
        user_emotion: &str,
    ) -> FeedbackResult<FeedbackPayload>;
}
