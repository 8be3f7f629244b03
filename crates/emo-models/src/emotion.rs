//! Emotion label set.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Emotion classes predicted by the fusion classifier.
///
/// The declaration order is the class index order of the classifier head.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum EmotionLabel {
    Anger,
    Disgust,
    Fear,
    Joy,
    Neutral,
    Sadness,
    Surprise,
}

impl EmotionLabel {
    /// Number of classes.
    pub const COUNT: usize = 7;

    /// All labels in class index order.
    pub const ALL: [EmotionLabel; Self::COUNT] = [
        EmotionLabel::Anger,
        EmotionLabel::Disgust,
        EmotionLabel::Fear,
        EmotionLabel::Joy,
        EmotionLabel::Neutral,
        EmotionLabel::Sadness,
        EmotionLabel::Surprise,
    ];

    /// Label for a class index.
    pub fn from_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }

    /// Class index of this label.
    pub fn index(&self) -> usize {
        *self as usize
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            EmotionLabel::Anger => "anger",
            EmotionLabel::Disgust => "disgust",
            EmotionLabel::Fear => "fear",
            EmotionLabel::Joy => "joy",
            EmotionLabel::Neutral => "neutral",
            EmotionLabel::Sadness => "sadness",
            EmotionLabel::Surprise => "surprise",
        }
    }

    /// Whether a user-declared label names this emotion.
    ///
    /// Comparison ignores case and surrounding whitespace. The declared label
    /// is free text, so anything outside the label set simply never matches.
    pub fn matches_declared(&self, declared: &str) -> bool {
        declared.trim().to_lowercase() == self.as_str()
    }
}

impl fmt::Display for EmotionLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for EmotionLabel {
    type Err = EmotionParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "anger" => Ok(EmotionLabel::Anger),
            "disgust" => Ok(EmotionLabel::Disgust),
            "fear" => Ok(EmotionLabel::Fear),
            "joy" => Ok(EmotionLabel::Joy),
            "neutral" => Ok(EmotionLabel::Neutral),
            "sadness" => Ok(EmotionLabel::Sadness),
            "surprise" => Ok(EmotionLabel::Surprise),
            _ => Err(EmotionParseError(s.to_string())),
        }
    }
}

#[derive(Debug, Error)]
#[error("Unknown emotion: {0}")]
pub struct EmotionParseError(String);
