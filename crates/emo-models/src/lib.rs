//! Shared data models for the emotion check backend.
//!
//! This crate provides Serde-serializable types for:
//! - The fixed emotion label set
//! - Trim windows and clip bounds
//! - Feature tensor dimensions shared by extraction and fusion
//! - Fusion output, predictions and the public API response

pub mod emotion;
pub mod features;
pub mod prediction;
pub mod response;
pub mod window;

// Re-export common types
pub use emotion::{EmotionLabel, EmotionParseError};
pub use prediction::{FusionOutput, ModalitySummary, PredictionResult};
pub use response::{FeedbackPayload, PredictResponse, Recommendations};
pub use window::{TrimWindow, DEFAULT_MEDIA_DURATION_SECS, MAX_CLIP_SECS};
