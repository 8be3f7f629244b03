//! Error types for feature extraction setup.
//!
//! Extraction itself never fails: decode problems surface as
//! [`Extraction::Degraded`](crate::Extraction::Degraded). These errors cover
//! loading the resources extractors depend on.

use std::path::PathBuf;
use thiserror::Error;

pub type FeatureResult<T> = Result<T, FeatureError>;

#[derive(Debug, Error)]
pub enum FeatureError {
    #[error("Failed to load tokenizer {path}: {message}")]
    Load { path: PathBuf, message: String },

    #[error("Tokenizer error: {0}")]
    Tokenizer(String),

    #[error("Tokenizer is missing special token {0}")]
    MissingSpecialToken(&'static str),
}

impl FeatureError {
    pub fn tokenizer(err: impl std::fmt::Display) -> Self {
        Self::Tokenizer(err.to_string())
    }
}
