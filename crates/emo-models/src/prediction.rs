//! Fusion output and prediction types.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::emotion::EmotionLabel;

/// Probability vector over [`EmotionLabel::ALL`].
///
/// Entries are non-negative and sum to 1 within floating tolerance. The only
/// constructor is [`FusionOutput::from_logits`], which applies a numerically
/// stable softmax.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FusionOutput {
    probabilities: [f32; EmotionLabel::COUNT],
}

impl FusionOutput {
    /// Normalize classifier logits into probabilities.
    ///
    /// Returns `None` if the slice has the wrong length or contains a
    /// non-finite value.
    pub fn from_logits(logits: &[f32]) -> Option<Self> {
        if logits.len() != EmotionLabel::COUNT || logits.iter().any(|l| !l.is_finite()) {
            return None;
        }

        let max = logits.iter().copied().fold(f32::NEG_INFINITY, f32::max) as f64;
        let exps: Vec<f64> = logits.iter().map(|&l| (l as f64 - max).exp()).collect();
        let total: f64 = exps.iter().sum();

        let mut probabilities = [0.0f32; EmotionLabel::COUNT];
        for (p, e) in probabilities.iter_mut().zip(&exps) {
            *p = (e / total) as f32;
        }

        Some(Self { probabilities })
    }

    /// Probabilities in class index order.
    pub fn probabilities(&self) -> &[f32; EmotionLabel::COUNT] {
        &self.probabilities
    }

    /// Probability assigned to a label.
    pub fn probability(&self, label: EmotionLabel) -> f32 {
        self.probabilities[label.index()]
    }

    /// Highest-probability label and its probability. Ties resolve to the
    /// lowest class index.
    pub fn argmax(&self) -> (EmotionLabel, f32) {
        let mut best = 0;
        for (i, p) in self.probabilities.iter().enumerate().skip(1) {
            if *p > self.probabilities[best] {
                best = i;
            }
        }
        (EmotionLabel::ALL[best], self.probabilities[best])
    }

    /// Mean probability across classes.
    pub fn mean(&self) -> f32 {
        self.probabilities.iter().sum::<f32>() / EmotionLabel::COUNT as f32
    }
}

/// Per-modality summary scores.
///
/// All three values are the mean of the same fused probability vector, so they
/// are always equal. They are illustrative aggregates, not per-modality
/// attribution.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ModalitySummary {
    pub audio: f64,
    pub text: f64,
    pub visual: f64,
}

/// Outcome of one classification.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionResult {
    /// Highest-probability label
    pub predicted_label: EmotionLabel,
    /// Probability of the predicted label, in [0, 1]
    pub confidence: f32,
    /// Summary scores forwarded to the feedback collaborator
    pub modalities: ModalitySummary,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_logits_normalizes() {
        let output = FusionOutput::from_logits(&[1.0, -2.0, 0.5, 3.0, 0.0, 0.0, -1.0]).unwrap();
        let sum: f32 = output.probabilities().iter().sum();
        assert!((sum - 1.0).abs() < 1e-5);
        assert!(output.probabilities().iter().all(|p| *p >= 0.0));
        assert_eq!(output.argmax().0, EmotionLabel::Joy);
    }

    #[test]
    fn test_from_logits_large_values() {
        let output = FusionOutput::from_logits(&[1000.0, 999.0, 0.0, 0.0, 0.0, 0.0, 0.0]).unwrap();
        let sum: f32 = output.probabilities().iter().sum();
        assert!((sum - 1.0).abs() < 1e-5);
        assert_eq!(output.argmax().0, EmotionLabel::Anger);
    }

    #[test]
    fn test_from_logits_rejects_bad_input() {
        assert!(FusionOutput::from_logits(&[0.0; 6]).is_none());
        assert!(FusionOutput::from_logits(&[0.0, f32::NAN, 0.0, 0.0, 0.0, 0.0, 0.0]).is_none());
    }

    #[test]
    fn test_argmax_tie_takes_first() {
        let output = FusionOutput::from_logits(&[0.0; 7]).unwrap();
        let (label, confidence) = output.argmax();
        assert_eq!(label, EmotionLabel::Anger);
        assert!((confidence - 1.0 / 7.0).abs() < 1e-6);
    }

    #[test]
    fn test_mean_is_uniform() {
        let output = FusionOutput::from_logits(&[5.0, 1.0, 0.0, 2.0, 0.0, 3.0, 0.0]).unwrap();
        assert!((output.mean() - 1.0 / 7.0).abs() < 1e-6);
    }
}
