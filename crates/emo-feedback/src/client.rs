//! OpenAI-compatible chat completions client.

use std::time::Duration;

use async_trait::async_trait;
use emo_models::{FeedbackPayload, PredictionResult};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::error::{FeedbackError, FeedbackResult};
use crate::prompt::{parse_feedback, user_prompt, SYSTEM_PROMPT};
use crate::FeedbackCollaborator;

/// Longest error body kept in [`FeedbackError::RequestFailed`].
const MAX_ERROR_BODY_CHARS: usize = 300;

/// Configuration for the feedback client.
#[derive(Debug, Clone)]
pub struct FeedbackConfig {
    /// API key; requests fail with `NotConfigured` when absent
    pub api_key: Option<String>,
    /// Base URL, without the `/chat/completions` suffix
    pub base_url: String,
    pub model: String,
    pub max_tokens: u32,
    pub temperature: f32,
    /// Per-request timeout
    pub timeout: Duration,
    pub max_retries: u32,
    /// First retry delay; doubles per attempt
    pub retry_base_delay: Duration,
}

impl Default for FeedbackConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: "https://api.openai.com/v1".to_string(),
            model: "gpt-4o-mini".to_string(),
            max_tokens: 800,
            temperature: 0.7,
            timeout: Duration::from_secs(60),
            max_retries: 2,
            retry_base_delay: Duration::from_millis(500),
        }
    }
}

impl FeedbackConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            api_key: std::env::var("OPENAI_API_KEY")
                .ok()
                .filter(|k| !k.trim().is_empty()),
            base_url: std::env::var("OPENAI_BASE_URL").unwrap_or(defaults.base_url),
            model: std::env::var("FEEDBACK_MODEL").unwrap_or(defaults.model),
            timeout: Duration::from_secs(
                std::env::var("FEEDBACK_TIMEOUT_SECS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(60),
            ),
            max_retries: std::env::var("FEEDBACK_MAX_RETRIES")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.max_retries),
            ..defaults
        }
    }
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    max_tokens: u32,
    temperature: f32,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    content: Option<String>,
}

/// Feedback client for OpenAI-compatible endpoints.
pub struct OpenAiFeedbackClient {
    http: Client,
    config: FeedbackConfig,
}

impl OpenAiFeedbackClient {
    pub fn new(config: FeedbackConfig) -> FeedbackResult<Self> {
        let http = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(FeedbackError::Network)?;

        if config.api_key.is_none() {
            warn!("OPENAI_API_KEY not set, mismatch feedback will be unavailable");
        }

        Ok(Self { http, config })
    }

    pub fn from_env() -> FeedbackResult<Self> {
        Self::new(FeedbackConfig::from_env())
    }

    async fn complete(&self, api_key: &str, prompt: &str) -> FeedbackResult<String> {
        let url = format!("{}/chat/completions", self.config.base_url.trim_end_matches('/'));
        let request = ChatRequest {
            model: &self.config.model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: SYSTEM_PROMPT,
                },
                ChatMessage {
                    role: "user",
                    content: prompt,
                },
            ],
            max_tokens: self.config.max_tokens,
            temperature: self.config.temperature,
        };

        debug!(model = %self.config.model, "Requesting feedback completion");

        let response = self
            .http
            .post(&url)
            .bearer_auth(api_key)
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(FeedbackError::RequestFailed {
                status: status.as_u16(),
                body: body.chars().take(MAX_ERROR_BODY_CHARS).collect(),
            });
        }

        let parsed: ChatResponse = response.json().await?;
        parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .filter(|c| !c.trim().is_empty())
            .ok_or(FeedbackError::EmptyResponse)
    }

    /// Execute with retry logic.
    async fn with_retry<F, Fut, T>(&self, operation: F) -> FeedbackResult<T>
    where
        F: Fn() -> Fut,
        Fut: std::future::Future<Output = FeedbackResult<T>>,
    {
        let mut attempt = 0;
        loop {
            match operation().await {
                Ok(result) => return Ok(result),
                Err(e) if e.is_retryable() && attempt < self.config.max_retries => {
                    let delay = self.config.retry_base_delay * 2u32.pow(attempt);
                    warn!(
                        "Feedback request failed (attempt {}), retrying in {:?}: {}",
                        attempt + 1,
                        delay,
                        e
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }
}

#[async_trait]
impl FeedbackCollaborator for OpenAiFeedbackClient {
    async fn request_feedback(
        &self,
        prediction: &PredictionResult,
        user_emotion: &str,
    ) -> FeedbackResult<FeedbackPayload> {
        let api_key = self
            .config
            .api_key
            .as_deref()
            .ok_or(FeedbackError::NotConfigured)?;

        let prompt = user_prompt(prediction, user_emotion);
        let content = self.with_retry(|| self.complete(api_key, &prompt)).await?;

        info!(
            predicted = %prediction.predicted_label,
            chars = content.len(),
            "Feedback generated"
        );
        Ok(parse_feedback(&content))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use emo_models::{EmotionLabel, ModalitySummary};
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn prediction() -> PredictionResult {
        PredictionResult {
            predicted_label: EmotionLabel::Neutral,
            confidence: 0.4,
            modalities: ModalitySummary {
                audio: 0.143,
                text: 0.143,
                visual: 0.143,
            },
        }
    }

    fn client(server: &MockServer, api_key: Option<&str>) -> OpenAiFeedbackClient {
        OpenAiFeedbackClient::new(FeedbackConfig {
            api_key: api_key.map(str::to_string),
            base_url: server.uri(),
            retry_base_delay: Duration::from_millis(1),
            ..FeedbackConfig::default()
        })
        .unwrap()
    }

    fn completion(content: &str) -> serde_json::Value {
        serde_json::json!({
            "choices": [{"index": 0, "message": {"role": "assistant", "content": content}}]
        })
    }

    #[test]
    fn test_config_defaults() {
        let config = FeedbackConfig::default();
        assert_eq!(config.model, "gpt-4o-mini");
        assert_eq!(config.max_tokens, 800);
        assert_eq!(config.max_retries, 2);
    }

    #[tokio::test]
    async fn test_feedback_success() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .and(header("authorization", "Bearer test-key"))
            .and(body_partial_json(serde_json::json!({"model": "gpt-4o-mini", "max_tokens": 800})))
            .respond_with(ResponseTemplate::new(200).set_body_json(completion(
                "### Explanation of Mismatch\nFlat tone.\nKEY SUMMARY: Put more energy in your voice.",
            )))
            .expect(1)
            .mount(&server)
            .await;

        let payload = client(&server, Some("test-key"))
            .request_feedback(&prediction(), "joy")
            .await
            .unwrap();
        assert_eq!(payload.key_summary, "Put more energy in your voice.");
        assert!(payload.full_text.contains("Flat tone."));
    }

    #[tokio::test]
    async fn test_retries_server_errors() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(503))
            .up_to_n_times(1)
            .with_priority(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(completion("Tips only.")))
            .with_priority(2)
            .mount(&server)
            .await;

        let payload = client(&server, Some("k"))
            .request_feedback(&prediction(), "joy")
            .await
            .unwrap();
        assert_eq!(payload.key_summary, "No summary provided.");
    }

    #[tokio::test]
    async fn test_client_errors_not_retried() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(401).set_body_string("invalid api key"))
            .expect(1)
            .mount(&server)
            .await;

        let err = client(&server, Some("bad"))
            .request_feedback(&prediction(), "joy")
            .await
            .unwrap_err();
        assert!(matches!(err, FeedbackError::RequestFailed { status: 401, .. }));
    }

    #[tokio::test]
    async fn test_gives_up_after_max_retries() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(500))
            .expect(3)
            .mount(&server)
            .await;

        let err = client(&server, Some("k"))
            .request_feedback(&prediction(), "joy")
            .await
            .unwrap_err();
        assert!(err.is_retryable());
    }

    #[tokio::test]
    async fn test_empty_choices() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"choices": []})))
            .mount(&server)
            .await;

        let err = client(&server, Some("k"))
            .request_feedback(&prediction(), "joy")
            .await
            .unwrap_err();
        assert!(matches!(err, FeedbackError::EmptyResponse));
    }

    #[tokio::test]
    async fn test_missing_key() {
        let server = MockServer::start().await;
        let err = client(&server, None)
            .request_feedback(&prediction(), "joy")
            .await
            .unwrap_err();
        assert!(matches!(err, FeedbackError::NotConfigured));
    }
}
