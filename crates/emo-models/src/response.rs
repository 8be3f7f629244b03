//! Public API response types.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Corrective feedback returned by the generative collaborator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct FeedbackPayload {
    /// Full markdown feedback
    pub full_text: String,
    /// One-line takeaway
    pub key_summary: String,
}

/// Recommendations attached to a mismatched prediction.
///
/// Serialized untagged: either the feedback object or a plain diagnostic
/// string when the collaborator failed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(untagged)]
pub enum Recommendations {
    Feedback(FeedbackPayload),
    Diagnostic(String),
}

/// Response body of `POST /predict`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct PredictResponse {
    pub predicted_emotion: String,
    pub confidence: Option<f64>,
    /// User-declared label, echoed verbatim
    pub user_emotion: String,
    #[serde(rename = "match")]
    pub is_match: bool,
    /// `None` when the prediction matched
    pub recommendations: Option<Recommendations>,
    pub clip_duration_seconds: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_response_serialization() {
        let response = PredictResponse {
            predicted_emotion: "joy".to_string(),
            confidence: Some(0.8),
            user_emotion: "Joy ".to_string(),
            is_match: true,
            recommendations: None,
            clip_duration_seconds: 10.0,
        };

        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json["match"], true);
        assert!(json["recommendations"].is_null());
        assert_eq!(json["user_emotion"], "Joy ");
    }

    #[test]
    fn test_recommendations_untagged() {
        let diag = Recommendations::Diagnostic("Recommendation generation failed".to_string());
        assert_eq!(
            serde_json::to_value(&diag).unwrap(),
            serde_json::json!("Recommendation generation failed")
        );

        let feedback = Recommendations::Feedback(FeedbackPayload {
            full_text: "tips".to_string(),
            key_summary: "smile".to_string(),
        });
        let json = serde_json::to_value(&feedback).unwrap();
        assert_eq!(json["key_summary"], "smile");
    }
}
