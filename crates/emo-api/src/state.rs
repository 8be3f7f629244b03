//! Application state.

use std::sync::Arc;

use anyhow::{bail, Context};
use emo_features::{TextFeatureExtractor, TextTokenizer};
use emo_feedback::OpenAiFeedbackClient;
use emo_fusion::{load_text_encoder_config, ComputeMode, FusionClassifier};
use emo_media::{FfmpegDecoder, FfmpegTranscoder, TranscodeSettings};
use tracing::info;

use crate::config::ApiConfig;
use crate::pipeline::EmotionPipeline;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub config: ApiConfig,
    pub pipeline: Arc<EmotionPipeline>,
}

impl AppState {
    /// Load the model and tokenizer and wire the FFmpeg and feedback collaborators.
    pub fn new(config: ApiConfig) -> anyhow::Result<Self> {
        let tokenizer = TextTokenizer::from_file(&config.tokenizer_path)
            .with_context(|| format!("failed to load tokenizer from {}", config.tokenizer_path.display()))?;

        let encoder = load_text_encoder_config(&config.text_encoder_config_path).with_context(|| {
            format!(
                "failed to load text encoder config from {}",
                config.text_encoder_config_path.display()
            )
        })?;

        let mode = ComputeMode::resolve(config.inference_compute);
        let classifier = FusionClassifier::load(&config.model_path, &encoder, mode)
            .with_context(|| format!("failed to load fusion model from {}", config.model_path.display()))?;

        if tokenizer.vocab_size() > classifier.vocab_size() {
            bail!(
                "tokenizer vocabulary ({}) is larger than the text encoder vocabulary ({})",
                tokenizer.vocab_size(),
                classifier.vocab_size()
            );
        }
        info!(vocab_size = tokenizer.vocab_size(), "Loaded tokenizer");

        let transcoder = FfmpegTranscoder::new(TranscodeSettings {
            timeout: config.transcode_timeout,
            probe_timeout: config.probe_timeout,
            ..TranscodeSettings::default()
        });
        let decoder = FfmpegDecoder::new(config.transcode_timeout, config.probe_timeout);
        let feedback = OpenAiFeedbackClient::from_env().context("failed to build feedback client")?;

        let pipeline = EmotionPipeline::new(
            config.work_dir.clone(),
            Arc::new(transcoder),
            Arc::new(decoder),
            TextFeatureExtractor::new(Arc::new(tokenizer)),
            Arc::new(classifier),
            Arc::new(feedback),
            config.pipeline_limits(),
        );

        Ok(Self::with_pipeline(config, pipeline))
    }

    /// State around an already assembled pipeline.
    pub fn with_pipeline(config: ApiConfig, pipeline: EmotionPipeline) -> Self {
        Self {
            config,
            pipeline: Arc::new(pipeline),
        }
    }
}
