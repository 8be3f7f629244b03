//! Emotion prediction handler.

use axum::extract::{Multipart, State};
use axum::{Extension, Json};
use emo_models::PredictResponse;
use tracing::debug;
use uuid::Uuid;

use crate::error::{ApiError, ApiResult};
use crate::middleware::RequestId;
use crate::pipeline::PredictRequest;
use crate::state::AppState;

/// Parse an optional seconds field; anything unusable means "not given".
pub fn parse_seconds(raw: &str) -> Option<f64> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }
    match trimmed.parse::<f64>() {
        Ok(v) if v.is_finite() => Some(v),
        _ => {
            debug!(value = trimmed, "Ignoring unparsable time value");
            None
        }
    }
}

/// Whether an upload's declared content type is a video type.
pub fn is_video_content_type(content_type: Option<&str>) -> bool {
    content_type
        .map(|ct| ct.trim().to_ascii_lowercase().starts_with("video/"))
        .unwrap_or(false)
}

/// Collect the multipart fields of a `/predict` submission.
async fn read_form(mut multipart: Multipart) -> ApiResult<PredictRequest> {
    let mut video: Option<(Option<String>, Vec<u8>)> = None;
    let mut user_emotion: Option<String> = None;
    let mut start = None;
    let mut end = None;
    let mut text_hint = String::new();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::bad_request(format!("Invalid multipart body: {}", e.body_text())))?
    {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "video" => {
                if !is_video_content_type(field.content_type()) {
                    return Err(ApiError::bad_request("Uploaded file must be a video"));
                }
                let filename = field.file_name().map(str::to_string);
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|e| ApiError::bad_request(format!("Failed to read video: {}", e.body_text())))?;
                video = Some((filename, bytes.to_vec()));
            }
            "user_emotion" | "start_time" | "start" | "end_time" | "end" | "text_hint" => {
                let value = field
                    .text()
                    .await
                    .map_err(|e| ApiError::bad_request(format!("Failed to read {}: {}", name, e.body_text())))?;
                match name.as_str() {
                    "user_emotion" => user_emotion = Some(value),
                    "start_time" | "start" => start = parse_seconds(&value),
                    "end_time" | "end" => end = parse_seconds(&value),
                    _ => text_hint = value,
                }
            }
            other => debug!(field = other, "Ignoring unknown multipart field"),
        }
    }

    let (filename, video) = video.ok_or_else(|| ApiError::bad_request("Missing video file"))?;
    if video.is_empty() {
        return Err(ApiError::bad_request("Uploaded video is empty"));
    }

    let user_emotion = user_emotion
        .filter(|e| !e.trim().is_empty())
        .ok_or_else(|| ApiError::bad_request("Missing user_emotion"))?;

    Ok(PredictRequest {
        filename,
        video,
        user_emotion,
        start,
        end,
        text_hint,
    })
}

/// `POST /predict`: classify the emotion conveyed by an uploaded clip.
pub async fn predict(
    State(state): State<AppState>,
    request_id: Option<Extension<RequestId>>,
    multipart: Multipart,
) -> ApiResult<Json<PredictResponse>> {
    let request_id = request_id
        .map(|Extension(RequestId(id))| id)
        .unwrap_or_else(|| Uuid::new_v4().to_string());

    let request = read_form(multipart).await?;
    state.pipeline.run(request, &request_id).await.map(Json)
}
