//! Gemini REST client
//!
//! Every call is a single stateless request. Rate limits (429) surface as
//! [`TpubError::RateLimited`] and are retried by the caller's
//! [`RetryPolicy`]; anything else non-2xx is a permanent [`TpubError::Api`]
//! and counts against the shared circuit breaker.

use async_trait::async_trait;
use base64::Engine;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::sync::OnceLock;
use tpub_core::{retry_with_backoff, Result, RetryPolicy, TpubError};

use crate::auth;
use crate::circuit_breaker::CircuitBreaker;
use crate::types::{GenerateContentRequest, GenerateContentResponse, Model, PredictRequest, PredictResponse};

const GEMINI_API_URL: &str = "https://generativelanguage.googleapis.com/v1beta/models";

/// Characters of post text sent as hashtag context
pub const HASHTAG_CONTEXT_CHARS: usize = 2000;

// Shared by every client in the process
static CIRCUIT_BREAKER: OnceLock<CircuitBreaker> = OnceLock::new();

fn get_circuit_breaker() -> &'static CircuitBreaker {
    CIRCUIT_BREAKER.get_or_init(CircuitBreaker::default)
}

/// Content generation used by the draft repair commands
#[async_trait]
pub trait Generator: Send + Sync {
    /// PNG bytes for `prompt`
    async fn generate_image(&self, prompt: &str) -> Result<Vec<u8>>;

    /// One line of space-separated hashtags describing `text`
    async fn generate_hashtags(&self, text: &str) -> Result<String>;
}

#[derive(Debug, Clone)]
pub struct GeminiClient {
    http: reqwest::Client,
    api_key: String,
    base_url: String,
    retry: RetryPolicy,
}

impl GeminiClient {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            api_key: api_key.into(),
            base_url: GEMINI_API_URL.to_string(),
            retry: RetryPolicy::default(),
        }
    }

    /// Client keyed from `GOOGLE_API_KEY`
    pub fn from_env() -> Result<Self> {
        Ok(Self::new(auth::get_api_key()?))
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    fn endpoint(&self, model: Model) -> String {
        format!("{}/{}:{}", self.base_url, model.api_name(), model.method())
    }

    async fn call<Req, Resp>(&self, model: Model, body: &Req) -> Result<Resp>
    where
        Req: Serialize + Sync,
        Resp: DeserializeOwned,
    {
        let circuit_breaker = get_circuit_breaker();
        if !circuit_breaker.can_execute() {
            return Err(TpubError::Api(format!(
                "Circuit breaker is OPEN after repeated Gemini failures. Wait {} seconds.",
                circuit_breaker.time_until_retry().as_secs()
            )));
        }

        tracing::debug!("POST {}", model);
        let response = self
            .http
            .post(self.endpoint(model))
            .query(&[("key", self.api_key.as_str())])
            .json(body)
            .send()
            .await
            .map_err(|e| TpubError::Api(format!("Failed to send request: {}", e)))?;

        let status = response.status();
        if status.as_u16() == 429 {
            let retry_after = response
                .headers()
                .get("retry-after")
                .and_then(|v| v.to_str().ok())
                .map(str::to_string);
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown".to_string());
            if let Some(secs) = retry_after {
                tracing::warn!("Gemini quota exceeded, server asks to wait {}s", secs);
            }
            return Err(TpubError::RateLimited(format!("{}: {}", model, error_text)));
        }

        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown".to_string());
            circuit_breaker.record_failure();
            tracing::error!(
                "Circuit breaker: recorded failure (count: {})",
                circuit_breaker.failure_count()
            );
            return Err(TpubError::Api(format!(
                "Gemini API error {}: {}",
                status, error_text
            )));
        }

        let parsed = response
            .json()
            .await
            .map_err(|e| TpubError::Api(format!("Failed to parse response: {}", e)))?;
        circuit_breaker.record_success();
        Ok(parsed)
    }
}

#[async_trait]
impl Generator for GeminiClient {
    async fn generate_image(&self, prompt: &str) -> Result<Vec<u8>> {
        tracing::info!("Generating image for prompt: '{}'", prompt);
        let request = PredictRequest::single(prompt);
        let response: PredictResponse = retry_with_backoff("image generation", &self.retry, |_| {
            self.call(Model::Imagen, &request)
        })
        .await?;
        let bytes = decode_image(&response)?;
        tracing::info!("Image generated ({} bytes)", bytes.len());
        Ok(bytes)
    }

    async fn generate_hashtags(&self, text: &str) -> Result<String> {
        let request = GenerateContentRequest::text(hashtag_prompt(text));
        let response: GenerateContentResponse =
            retry_with_backoff("hashtag generation", &self.retry, |_| {
                self.call(Model::Flash, &request)
            })
            .await?;

        let hashtags = response
            .first_text()
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .ok_or_else(|| TpubError::Api("No text in hashtag response".to_string()))?;
        tracing::info!("Generated hashtags: {}", hashtags);
        Ok(hashtags.to_string())
    }
}

/// Bytes of the first prediction
pub fn decode_image(response: &PredictResponse) -> Result<Vec<u8>> {
    let encoded = response
        .predictions
        .first()
        .and_then(|p| p.bytes_base64_encoded.as_deref())
        .ok_or_else(|| TpubError::Api("No image in prediction response".to_string()))?;

    base64::engine::general_purpose::STANDARD
        .decode(encoded)
        .map_err(|e| TpubError::Api(format!("Invalid image payload: {}", e)))
}

/// Prompt asking for ten Korean hashtags about the first part of `text`
pub fn hashtag_prompt(text: &str) -> String {
    let context: String = text.chars().take(HASHTAG_CONTEXT_CHARS).collect();
    format!(
        "Analyze the following blog post content and generate 10 relevant, trending Korean \
         hashtags. Format the output as a single line of space-separated hashtags \
         (e.g., #Keyword1 #Keyword2). Do not include any other text or explanations.\n\n\
         Content:\n{}",
        context
    )
}
