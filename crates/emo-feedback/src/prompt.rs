//! Coaching prompt construction and response parsing.

use emo_models::{FeedbackPayload, PredictionResult};

/// Marker line the model is asked to end its answer with.
pub const KEY_SUMMARY_MARKER: &str = "KEY SUMMARY:";

/// Used when the answer carries no marker line.
pub const MISSING_SUMMARY: &str = "No summary provided.";

pub const SYSTEM_PROMPT: &str = "You are an expert communication and performance coach. \
You analyze emotion delivery in videos and provide detailed, structured feedback. \
Your goal is to help speakers express their intended emotions authentically and effectively. \
Always provide feedback in a structured, markdown-ready format with clear sections.";

/// Build the user message for a mismatched prediction.
pub fn user_prompt(prediction: &PredictionResult, user_emotion: &str) -> String {
    let m = &prediction.modalities;
    format!(
        "The speaker intended to express **{intended}**, but the multimodal model predicted **{predicted}**.\n\
Model confidence: {confidence:.4}\n\
Modalities observed: audio={audio}, text={text}, visual={visual}\n\
\n\
Please provide feedback with the following structure:\n\
\n\
### Explanation of Mismatch\n\
Briefly explain why the intended and detected emotions might differ.\n\
\n\
### Improvement Tips\n\
Give **5 specific, actionable** recommendations covering:\n\
- Voice & Tone\n\
- Facial Expression\n\
- Body Language\n\
- Word Choice / Delivery\n\
- Environmental or Technical Adjustments\n\
\n\
### Motivational Wrap-Up\n\
End with an encouraging message that motivates the speaker to improve, highlighting potential and progress.\n\
\n\
### Summary in 3 Bullet Points\n\
List exactly 3 short, action-oriented takeaways that summarize your feedback.\n\
\n\
**Finally**, conclude with a one-line takeaway starting with:\n\
`{marker}` (example: {marker} Add more vocal energy and maintain open body posture to express enthusiasm.)\n",
        intended = user_emotion.trim(),
        predicted = prediction.predicted_label,
        confidence = prediction.confidence,
        audio = m.audio,
        text = m.text,
        visual = m.visual,
        marker = KEY_SUMMARY_MARKER,
    )
}

/// Split a completion into the full text and its key summary line.
pub fn parse_feedback(content: &str) -> FeedbackPayload {
    let full_text = content.trim().to_string();

    let key_summary = full_text
        .lines()
        .map(str::trim)
        .find_map(|line| line.strip_prefix(KEY_SUMMARY_MARKER))
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .unwrap_or(MISSING_SUMMARY)
        .to_string();

    FeedbackPayload {
        full_text,
        key_summary,
    }
}
