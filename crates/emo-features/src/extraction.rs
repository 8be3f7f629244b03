//! Tagged extraction results and the feature set handed to fusion.

use ndarray::{Array1, Array4};

use crate::text::TextFeature;

/// Result of one extractor.
///
/// A degraded result still carries a tensor of the correct shape (all zeros
/// for audio and video) together with the reason extraction fell back.
#[derive(Debug, Clone, PartialEq)]
pub enum Extraction<T> {
    Ok(T),
    Degraded(T, String),
}

impl<T> Extraction<T> {
    pub fn degraded(value: T, reason: impl Into<String>) -> Self {
        Self::Degraded(value, reason.into())
    }

    pub fn value(&self) -> &T {
        match self {
            Self::Ok(v) | Self::Degraded(v, _) => v,
        }
    }

    pub fn into_value(self) -> T {
        match self {
            Self::Ok(v) | Self::Degraded(v, _) => v,
        }
    }

    pub fn is_degraded(&self) -> bool {
        matches!(self, Self::Degraded(..))
    }

    /// Fallback reason, if degraded.
    pub fn reason(&self) -> Option<&str> {
        match self {
            Self::Ok(_) => None,
            Self::Degraded(_, reason) => Some(reason),
        }
    }
}

/// Fixed-shape inputs for one classification.
#[derive(Debug, Clone)]
pub struct FeatureSet {
    /// Token ids and attention mask
    pub text: TextFeature,
    /// Mono waveform, `[AUDIO_SAMPLES]`
    pub audio: Array1<f32>,
    /// Frames, `[3, NUM_FRAMES, FRAME_SIZE, FRAME_SIZE]`
    pub visual: Array4<f32>,
}
