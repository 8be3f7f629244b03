//! Error types for model loading and inference.

use std::path::PathBuf;
use thiserror::Error;

pub type FusionResult<T> = Result<T, FusionError>;

#[derive(Debug, Error)]
pub enum FusionError {
    #[error("Failed to read weights {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Malformed weights file: {0}")]
    Safetensors(#[from] safetensors::SafeTensorError),

    #[error("Text encoder error: {0}")]
    Candle(#[from] candle_core::Error),

    #[error("Invalid text encoder config: {0}")]
    Config(String),

    #[error("Missing tensor: {0}")]
    MissingTensor(String),

    #[error("Tensor {name} has unsupported dtype {dtype}")]
    UnsupportedDtype { name: String, dtype: String },

    #[error("Tensor {name} has shape {actual:?}, expected {expected:?}")]
    ShapeMismatch {
        name: String,
        expected: Vec<usize>,
        actual: Vec<usize>,
    },

    #[error("Invalid model input: {0}")]
    InvalidInput(String),

    #[error("Model produced non-finite output")]
    NonFinite,
}

impl FusionError {
    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::InvalidInput(message.into())
    }
}
