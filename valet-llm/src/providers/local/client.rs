//! HTTP client for the local completion endpoint, with rate limiting.

use super::types::{ApiError, ChatMessage, CompletionRequest, CompletionResponse};
use crate::providers::{invalid_response, rate_limited, request_failed};
use crate::LanguageModel;
use ::async_trait::async_trait;
use reqwest::{Client, StatusCode};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Semaphore;
use valet_core::{LlmConfig, ValetResult};

const PROVIDER: &str = "local";

/// Client for a locally hosted OpenAI-compatible chat completions server.
///
/// Concurrency is bounded by a semaphore sized to the configured
/// requests-per-minute, and consecutive requests are paced a minimum
/// interval apart so a burst of agents cannot stampede the model.
pub struct LocalCompletionClient {
    client: Client,
    config: LlmConfig,
    rate_limiter: Arc<Semaphore>,
    last_request: Arc<AtomicU64>,
    min_request_interval_ms: u64,
    start_time: Instant,
}

impl LocalCompletionClient {
    /// Create a new client from configuration.
    pub fn new(config: LlmConfig) -> Self {
        let rpm = config.requests_per_minute.max(1);
        let permits = rpm as usize;
        let min_interval_ms = (60_000 / rpm as u64).max(10);

        Self {
            client: Client::new(),
            config,
            rate_limiter: Arc::new(Semaphore::new(permits)),
            last_request: Arc::new(AtomicU64::new(0)),
            min_request_interval_ms: min_interval_ms,
            start_time: Instant::now(),
        }
    }

    /// The model name requests are sent with.
    pub fn model(&self) -> &str {
        &self.config.model
    }

    /// Send a chat completion request and return the first choice's text.
    async fn complete(&self, messages: Vec<ChatMessage>) -> ValetResult<String> {
        let _permit = self
            .rate_limiter
            .acquire()
            .await
            .map_err(|e| request_failed(PROVIDER, 0, format!("Rate limiter error: {}", e)))?;

        // Enforce minimum interval between requests
        let now_ms = self.start_time.elapsed().as_millis() as u64;
        let last_ms = self.last_request.load(Ordering::Relaxed);
        let elapsed = now_ms.saturating_sub(last_ms);

        if elapsed < self.min_request_interval_ms {
            let wait_ms = self.min_request_interval_ms - elapsed;
            tokio::time::sleep(Duration::from_millis(wait_ms)).await;
        }

        self.last_request.store(now_ms, Ordering::Relaxed);

        let body = CompletionRequest {
            model: self.config.model.clone(),
            messages,
            temperature: self.config.temperature,
            max_tokens: self.config.max_tokens,
            stream: false,
        };

        let url = format!("{}/v1/chat/completions", self.config.base_url);
        let response = self
            .client
            .post(&url)
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| request_failed(PROVIDER, 0, format!("HTTP request failed: {}", e)))?;

        let status = response.status();
        let retry_after_ms = parse_retry_after_ms(response.headers()).unwrap_or(0);

        if status.is_success() {
            let parsed: CompletionResponse = response.json().await.map_err(|e| {
                invalid_response(PROVIDER, format!("Failed to parse response: {}", e))
            })?;

            parsed
                .choices
                .into_iter()
                .next()
                .map(|choice| choice.message.content)
                .ok_or_else(|| invalid_response(PROVIDER, "Response contained no choices"))
        } else {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());

            let error_msg = if let Ok(api_error) = serde_json::from_str::<ApiError>(&error_text) {
                api_error.error.message
            } else {
                error_text
            };

            Err(match status {
                StatusCode::TOO_MANY_REQUESTS => rate_limited(PROVIDER, retry_after_ms),
                _ => request_failed(PROVIDER, status.as_u16() as i32, error_msg),
            })
        }
    }
}

#[async_trait]
impl LanguageModel for LocalCompletionClient {
    async fn query(&self, prompt: &str) -> ValetResult<String> {
        self.complete(vec![ChatMessage::user(prompt)]).await
    }
}

fn parse_retry_after_ms(headers: &reqwest::header::HeaderMap) -> Option<i64> {
    headers
        .get("retry-after")
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.parse::<f64>().ok())
        .map(|seconds| (seconds * 1000.0) as i64)
}

impl std::fmt::Debug for LocalCompletionClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LocalCompletionClient")
            .field("base_url", &self.config.base_url)
            .field("model", &self.config.model)
            .finish()
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_retry_after_seconds() {
        let mut headers = reqwest::header::HeaderMap::new();
        headers.insert("retry-after", "2".parse().unwrap());
        assert_eq!(parse_retry_after_ms(&headers), Some(2000));

        headers.insert("retry-after", "0.5".parse().unwrap());
        assert_eq!(parse_retry_after_ms(&headers), Some(500));
    }

    #[test]
    fn test_parse_retry_after_missing_or_invalid() {
        let headers = reqwest::header::HeaderMap::new();
        assert_eq!(parse_retry_after_ms(&headers), None);

        let mut headers = reqwest::header::HeaderMap::new();
        headers.insert("retry-after", "soon".parse().unwrap());
        assert_eq!(parse_retry_after_ms(&headers), None);
    }

    #[test]
    fn test_min_interval_derived_from_rpm() {
        let client = LocalCompletionClient::new(LlmConfig {
            requests_per_minute: 120,
            ..Default::default()
        });
        assert_eq!(client.min_request_interval_ms, 500);

        // Floor keeps pathological configs from busy-spinning.
        let client = LocalCompletionClient::new(LlmConfig {
            requests_per_minute: 100_000,
            ..Default::default()
        });
        assert_eq!(client.min_request_interval_ms, 10);
    }

    #[test]
    fn test_debug_omits_nothing_sensitive_but_shows_target() {
        let client = LocalCompletionClient::new(LlmConfig::default());
        let debug = format!("{:?}", client);
        assert!(debug.contains("http://localhost:8000"));
        assert!(debug.contains("local-model"));
    }
}
