//! Per-request emotion check pipeline.
//!
//! Upload → planned window → normalized clip → three concurrent extractors →
//! fusion on the blocking pool → decision → feedback on mismatch. Scratch
//! files live in a [`RequestWorkspace`] that is removed on every exit path.
//!
//! The request deadline covers trim, extraction and fusion. Feedback has its
//! own deadline and degrades to a diagnostic instead of failing the request.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use emo_features::{
    AudioFeatureExtractor, Extraction, FeatureSet, TextFeatureExtractor, VisualFeatureExtractor,
};
use emo_feedback::FeedbackCollaborator;
use emo_fusion::{DecisionEngine, FusionClassifier};
use emo_media::{ClipDecoder, MediaTranscoder, RequestWorkspace, TrimPlanner};
use emo_models::{PredictResponse, PredictionResult, Recommendations};
use tracing::{info, info_span, warn, Instrument};

use crate::error::{ApiError, ApiResult};
use crate::metrics;

/// One validated `/predict` submission.
#[derive(Debug, Clone)]
pub struct PredictRequest {
    pub filename: Option<String>,
    pub video: Vec<u8>,
    pub user_emotion: String,
    pub start: Option<f64>,
    pub end: Option<f64>,
    pub text_hint: String,
}

/// Deadlines applied by the pipeline.
#[derive(Debug, Clone, Copy)]
pub struct PipelineLimits {
    /// Upper bound for trim, extraction and fusion.
    pub request_timeout: Duration,
    /// Upper bound for the feedback call.
    pub feedback_deadline: Duration,
}

impl Default for PipelineLimits {
    fn default() -> Self {
        Self {
            request_timeout: Duration::from_secs(300),
            feedback_deadline: Duration::from_secs(90),
        }
    }
}

/// Result of the trim → extract → fuse stages.
struct Analysis {
    prediction: PredictionResult,
    clip_duration: f64,
}

/// Shared, read-only pipeline components.
pub struct EmotionPipeline {
    work_dir: PathBuf,
    limits: PipelineLimits,
    planner: TrimPlanner,
    transcoder: Arc<dyn MediaTranscoder>,
    audio: AudioFeatureExtractor,
    visual: VisualFeatureExtractor,
    text: TextFeatureExtractor,
    classifier: Arc<FusionClassifier>,
    decision: DecisionEngine,
    feedback: Arc<dyn FeedbackCollaborator>,
}

impl EmotionPipeline {
    pub fn new(
        work_dir: impl Into<PathBuf>,
        transcoder: Arc<dyn MediaTranscoder>,
        decoder: Arc<dyn ClipDecoder>,
        text: TextFeatureExtractor,
        classifier: Arc<FusionClassifier>,
        feedback: Arc<dyn FeedbackCollaborator>,
        limits: PipelineLimits,
    ) -> Self {
        Self {
            work_dir: work_dir.into(),
            limits,
            planner: TrimPlanner::new(),
            transcoder,
            audio: AudioFeatureExtractor::new(Arc::clone(&decoder)),
            visual: VisualFeatureExtractor::new(decoder),
            text,
            classifier,
            decision: DecisionEngine::new(),
            feedback,
        }
    }

    pub fn classifier(&self) -> &FusionClassifier {
        &self.classifier
    }

    /// Run one prediction end to end.
    pub async fn run(&self, request: PredictRequest, request_id: &str) -> ApiResult<PredictResponse> {
        let span = info_span!("predict", request_id = %request_id);
        self.run_inner(request).instrument(span).await
    }

    async fn run_inner(&self, request: PredictRequest) -> ApiResult<PredictResponse> {
        let PredictRequest {
            filename,
            video,
            user_emotion,
            start,
            end,
            text_hint,
        } = request;

        let limit = self.limits.request_timeout;
        let analysis = tokio::time::timeout(limit, self.analyze(filename, video, start, end, &text_hint))
            .await
            .map_err(|_| {
                warn!(timeout_secs = limit.as_secs(), "Prediction exceeded request timeout");
                ApiError::Timeout(limit.as_secs())
            })??;
        let prediction = analysis.prediction;

        // Decide
        let is_match = self.decision.matches(prediction.predicted_label, &user_emotion);
        metrics::record_prediction(prediction.predicted_label.as_str(), is_match);
        info!(
            predicted = %prediction.predicted_label,
            confidence = prediction.confidence,
            is_match,
            "Prediction complete"
        );

        let recommendations = if is_match {
            None
        } else {
            Some(self.recommend(&prediction, &user_emotion).await)
        };

        Ok(PredictResponse {
            predicted_emotion: prediction.predicted_label.to_string(),
            confidence: Some(f64::from(prediction.confidence)),
            user_emotion,
            is_match,
            recommendations,
            clip_duration_seconds: analysis.clip_duration,
        })
    }

    /// Trim, extract and fuse. Dropping this future kills any running FFmpeg
    /// child and removes the request workspace.
    async fn analyze(
        &self,
        filename: Option<String>,
        video: Vec<u8>,
        start: Option<f64>,
        end: Option<f64>,
        text_hint: &str,
    ) -> ApiResult<Analysis> {
        let workspace = RequestWorkspace::create(&self.work_dir).await.map_err(|e| {
            warn!(error = %e, "Failed to create request workspace");
            ApiError::storage("failed to create request workspace")
        })?;

        let upload = workspace
            .write_upload(filename.as_deref(), &video)
            .await
            .map_err(|e| {
                warn!(error = %e, "Failed to store upload");
                ApiError::storage("failed to store upload")
            })?;
        drop(video);

        // Trim
        let started = Instant::now();
        let duration = match self.transcoder.probe_duration(&upload).await {
            Ok(d) => Some(d),
            Err(e) => {
                warn!(error = %e, "Duration probe failed, using default");
                None
            }
        };
        let window = self.planner.plan(start, end, duration);
        info!(
            start = window.start,
            end = window.end,
            transcoder = self.transcoder.name(),
            "Planned trim window"
        );

        let clip = self
            .transcoder
            .trim(&upload, window, &workspace.clip_path())
            .await
            .map_err(|e| ApiError::transcode(e.diagnostic()))?;
        metrics::record_stage_duration("transcode", started.elapsed().as_secs_f64());

        if let Err(e) = tokio::fs::remove_file(&upload).await {
            warn!(error = %e, "Failed to remove upload");
        }

        // Extract
        let started = Instant::now();
        let (audio, visual, text) = tokio::join!(
            self.audio.extract(&clip.path),
            self.visual.extract(&clip.path),
            async { self.text.extract(text_hint) },
        );
        metrics::record_stage_duration("extract", started.elapsed().as_secs_f64());

        let features = FeatureSet {
            audio: settle("audio", audio),
            visual: settle("visual", visual),
            text: settle("text", text),
        };
        drop(workspace);

        // Fuse
        let started = Instant::now();
        let classifier = Arc::clone(&self.classifier);
        let output = tokio::task::spawn_blocking(move || classifier.predict(&features))
            .await
            .map_err(|e| ApiError::inference(format!("fusion task failed: {}", e)))?
            .map_err(|e| ApiError::inference(e.to_string()))?;
        metrics::record_stage_duration("fusion", started.elapsed().as_secs_f64());

        Ok(Analysis {
            prediction: self.decision.decide(&output),
            clip_duration: clip.duration,
        })
    }

    /// Ask the feedback collaborator for coaching, bounded by its own deadline.
    async fn recommend(&self, prediction: &PredictionResult, user_emotion: &str) -> Recommendations {
        let started = Instant::now();
        let deadline = self.limits.feedback_deadline;
        let result = tokio::time::timeout(deadline, self.feedback.request_feedback(prediction, user_emotion)).await;
        metrics::record_stage_duration("feedback", started.elapsed().as_secs_f64());

        let reason = match result {
            Ok(Ok(payload)) => return Recommendations::Feedback(payload),
            Ok(Err(e)) => e.to_string(),
            Err(_) => format!("timed out after {} seconds", deadline.as_secs_f64()),
        };
        warn!(reason = %reason, "Feedback request failed");
        metrics::record_feedback_failure();
        Recommendations::Diagnostic(format!("Recommendation generation failed: {}", reason))
    }
}

/// Unwrap an extraction, logging and counting degradations.
fn settle<T>(modality: &'static str, extraction: Extraction<T>) -> T {
    if let Some(reason) = extraction.reason() {
        warn!(modality, reason, "Extraction degraded to zero tensor");
        metrics::record_degraded_extraction(modality);
    }
    extraction.into_value()
}
