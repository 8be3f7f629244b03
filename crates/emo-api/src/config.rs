//! API configuration.

use std::path::PathBuf;
use std::time::Duration;

use emo_fusion::ComputePreference;
use tracing::warn;

use crate::pipeline::PipelineLimits;

/// API server configuration.
#[derive(Debug, Clone)]
pub struct ApiConfig {
    /// Server host
    pub host: String,
    /// Server port
    pub port: u16,
    /// CORS origins
    pub cors_origins: Vec<String>,
    /// Rate limit requests per second, per client IP
    pub rate_limit_rps: u32,
    /// Wall-clock limit for trim, extraction and fusion
    pub request_timeout: Duration,
    /// Wall-clock limit for the feedback call
    pub feedback_deadline: Duration,
    /// Max request body size
    pub max_body_size: usize,
    /// Root for per-request scratch directories
    pub work_dir: PathBuf,
    /// Fusion weights file
    pub model_path: PathBuf,
    /// Serialized `tokenizer.json` for the text encoder
    pub tokenizer_path: PathBuf,
    /// BERT configuration (`config.json`) for the text encoder
    pub text_encoder_config_path: PathBuf,
    /// Inference compute strategy
    pub inference_compute: ComputePreference,
    /// Limit for one FFmpeg re-encode or decode
    pub transcode_timeout: Duration,
    /// Limit for one FFprobe call
    pub probe_timeout: Duration,
    /// Serve Prometheus metrics at /metrics
    pub metrics_enabled: bool,
    /// Environment (development/production)
    pub environment: String,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8000,
            cors_origins: vec!["*".to_string()],
            rate_limit_rps: 10,
            request_timeout: Duration::from_secs(300),
            feedback_deadline: Duration::from_secs(90),
            max_body_size: 500 * 1024 * 1024, // 500MB
            work_dir: PathBuf::from("/tmp/multimodal_backend"),
            model_path: PathBuf::from("best_multimodal_model.safetensors"),
            tokenizer_path: PathBuf::from("tokenizer.json"),
            text_encoder_config_path: PathBuf::from("bert_config.json"),
            inference_compute: ComputePreference::Auto,
            transcode_timeout: Duration::from_secs(120),
            probe_timeout: Duration::from_secs(30),
            metrics_enabled: true,
            environment: "development".to_string(),
        }
    }
}

impl ApiConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            host: std::env::var("API_HOST").unwrap_or(defaults.host),
            port: env_parse("API_PORT").unwrap_or(defaults.port),
            cors_origins: std::env::var("CORS_ORIGINS")
                .map(|s| s.split(',').map(|s| s.trim().to_string()).collect())
                .unwrap_or(defaults.cors_origins),
            rate_limit_rps: env_parse("RATE_LIMIT_RPS").unwrap_or(defaults.rate_limit_rps),
            request_timeout: env_parse("REQUEST_TIMEOUT")
                .map(Duration::from_secs)
                .unwrap_or(defaults.request_timeout),
            feedback_deadline: env_parse("FEEDBACK_DEADLINE_SECS")
                .map(Duration::from_secs)
                .unwrap_or(defaults.feedback_deadline),
            max_body_size: env_parse("MAX_BODY_SIZE").unwrap_or(defaults.max_body_size),
            work_dir: std::env::var("WORK_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.work_dir),
            model_path: std::env::var("MODEL_PATH")
                .map(PathBuf::from)
                .unwrap_or(defaults.model_path),
            tokenizer_path: std::env::var("TOKENIZER_PATH")
                .map(PathBuf::from)
                .unwrap_or(defaults.tokenizer_path),
            text_encoder_config_path: std::env::var("TEXT_ENCODER_CONFIG_PATH")
                .map(PathBuf::from)
                .unwrap_or(defaults.text_encoder_config_path),
            inference_compute: std::env::var("INFERENCE_COMPUTE")
                .ok()
                .and_then(|s| match s.parse() {
                    Ok(p) => Some(p),
                    Err(e) => {
                        warn!("Ignoring INFERENCE_COMPUTE: {}", e);
                        None
                    }
                })
                .unwrap_or(defaults.inference_compute),
            transcode_timeout: env_parse("TRANSCODE_TIMEOUT_SECS")
                .map(Duration::from_secs)
                .unwrap_or(defaults.transcode_timeout),
            probe_timeout: env_parse("PROBE_TIMEOUT_SECS")
                .map(Duration::from_secs)
                .unwrap_or(defaults.probe_timeout),
            metrics_enabled: std::env::var("METRICS_ENABLED")
                .map(|v| v == "true" || v == "1")
                .unwrap_or(defaults.metrics_enabled),
            environment: std::env::var("ENVIRONMENT").unwrap_or(defaults.environment),
        }
    }

    /// Deadlines handed to the prediction pipeline.
    pub fn pipeline_limits(&self) -> PipelineLimits {
        PipelineLimits {
            request_timeout: self.request_timeout,
            feedback_deadline: self.feedback_deadline,
        }
    }

    /// Check if running in production mode.
    pub fn is_production(&self) -> bool {
        self.environment.to_lowercase() == "production"
    }
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok().and_then(|s| s.trim().parse().ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ApiConfig::default();
        assert_eq!(config.port, 8000);
        assert_eq!(config.max_body_size, 500 * 1024 * 1024);
        assert_eq!(config.model_path, PathBuf::from("best_multimodal_model.safetensors"));
        assert_eq!(config.inference_compute, ComputePreference::Auto);
        assert_eq!(config.tokenizer_path, PathBuf::from("tokenizer.json"));
        assert!(config.feedback_deadline < config.request_timeout);
        assert!(!config.is_production());
    }
}
