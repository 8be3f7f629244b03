//! Decision rule over a fused probability vector.

use emo_models::{EmotionLabel, FusionOutput, ModalitySummary, PredictionResult};

/// Picks the winning label and compares it with the caller's declared one.
#[derive(Debug, Clone, Copy, Default)]
pub struct DecisionEngine;

impl DecisionEngine {
    pub fn new() -> Self {
        Self
    }

    /// Argmax label with its probability as confidence.
    ///
    /// Every modality summary is the mean class probability of the fused
    /// output, rounded to three decimals.
    pub fn decide(&self, output: &FusionOutput) -> PredictionResult {
        let (predicted_label, confidence) = output.argmax();
        let summary = round3(output.mean() as f64);

        PredictionResult {
            predicted_label,
            confidence: confidence.clamp(0.0, 1.0),
            modalities: ModalitySummary {
                audio: summary,
                text: summary,
                visual: summary,
            },
        }
    }

    /// Case-insensitive, whitespace-trimmed label equality.
    pub fn matches(&self, predicted: EmotionLabel, declared: &str) -> bool {
        predicted.matches_declared(declared)
    }
}

fn round3(v: f64) -> f64 {
    (v * 1000.0).round() / 1000.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decide_picks_argmax() {
        let output = FusionOutput::from_logits(&[0.1, 0.2, 0.3, 4.0, 0.0, 0.0, 0.0]).unwrap();
        let result = DecisionEngine::new().decide(&output);
        assert_eq!(result.predicted_label, EmotionLabel::Joy);
        assert!((result.confidence - output.probability(EmotionLabel::Joy)).abs() < 1e-7);
        assert!((0.0..=1.0).contains(&result.confidence));
    }

    #[test]
    fn test_modality_summary_is_shared_mean() {
        let output = FusionOutput::from_logits(&[1.0, 2.0, 3.0, 0.0, 0.0, 0.0, 0.0]).unwrap();
        let result = DecisionEngine::new().decide(&output);
        assert_eq!(result.modalities.audio, 0.143);
        assert_eq!(result.modalities.audio, result.modalities.text);
        assert_eq!(result.modalities.text, result.modalities.visual);
    }

    #[test]
    fn test_matches_ignores_case_and_whitespace() {
        let engine = DecisionEngine::new();
        assert!(engine.matches(EmotionLabel::Joy, "Joy "));
        assert!(engine.matches(EmotionLabel::Joy, "  JOY"));
        assert!(!engine.matches(EmotionLabel::Joy, "sadness"));
        assert!(!engine.matches(EmotionLabel::Joy, "joyful"));
    }
}
