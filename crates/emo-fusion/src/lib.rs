//! Multimodal fusion classifier.
//!
//! Loads the fusion weights once, runs the BERT text encoder through candle
//! and the audio and visual towers plus the fusion head on CPU via ndarray,
//! and applies the decision rule.

pub mod compute;
pub mod decision;
pub mod error;
pub mod layers;
pub mod model;
pub mod weights;

pub use compute::{ComputeMode, ComputePreference};
pub use decision::DecisionEngine;
pub use error::{FusionError, FusionResult};
pub use candle_transformers::models::bert::Config as TextEncoderConfig;
pub use model::{load_text_encoder_config, FusionClassifier};
pub use weights::TensorStore;
