//! Perplexity chat completions client

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};
use tracing::{debug, error};

use super::{ChatMessage, Completion, CompletionRequest, LanguageModel, ResponseFormat, RetryPolicy, TokenUsage};
use crate::config::GenerationConfig;
use crate::errors::{AppError, Result};

const DEFAULT_ENDPOINT: &str = "https://api.perplexity.ai/chat/completions";
const SERVICE: &str = "perplexity";
const MAX_SEARCH_DOMAINS: usize = 20;

/// Perplexity API client
pub struct PerplexityClient {
    client: reqwest::Client,
    api_key: String,
    endpoint: String,
    model: String,
    temperature: f32,
    top_p: f32,
    disable_search: bool,
    timeout: Duration,
    retry: RetryPolicy,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    temperature: f32,
    top_p: f32,
    max_tokens: u32,
    disable_search: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_format: Option<ResponseFormat>,
    #[serde(skip_serializing_if = "Option::is_none")]
    search_domain_filter: Option<&'a [String]>,
}

#[derive(Deserialize)]
struct ChatResponse {
    #[serde(default)]
    model: String,
    #[serde(default)]
    choices: Vec<ChatChoice>,
    #[serde(default)]
    usage: TokenUsage,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChoiceMessage,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: String,
}

impl PerplexityClient {
    /// Create a new Perplexity client
    pub fn new(api_key: String, config: &GenerationConfig) -> Result<Self> {
        Self::with_timeout(api_key, config, config.timeout())
    }

    fn with_timeout(api_key: String, config: &GenerationConfig, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| AppError::Configuration {
                message: format!("Failed to create HTTP client: {}", e),
            })?;

        Ok(Self {
            client,
            api_key,
            endpoint: config
                .api_base
                .clone()
                .unwrap_or_else(|| DEFAULT_ENDPOINT.to_string()),
            model: config.model.clone(),
            temperature: config.temperature,
            top_p: config.top_p,
            disable_search: config.disable_search,
            timeout,
            retry: config.retry_policy(),
        })
    }

    /// Replace the retry policy
    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    fn payload<'a>(&'a self, request: &'a CompletionRequest) -> ChatRequest<'a> {
        // Domain filtering only applies when the provider may search
        let search_domain_filter = match (&request.domain_filter, self.disable_search) {
            (Some(domains), false) if !domains.is_empty() => {
                Some(&domains[..domains.len().min(MAX_SEARCH_DOMAINS)])
            }
            _ => None,
        };

        ChatRequest {
            model: &self.model,
            messages: &request.messages,
            temperature: request.temperature.unwrap_or(self.temperature),
            top_p: self.top_p,
            max_tokens: request.max_tokens,
            disable_search: self.disable_search,
            response_format: request.response_format,
            search_domain_filter,
        }
    }

    async fn make_request(&self, request: &CompletionRequest) -> Result<Completion> {
        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&self.payload(request))
            .send()
            .await
            .map_err(|e| AppError::from_transport(SERVICE, self.timeout.as_millis() as u64, e))?;

        let status = response.status();
        if status.as_u16() == 429 {
            return Err(AppError::RateLimited { service: SERVICE.to_string() });
        }

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            error!(status = status.as_u16(), body = %body, "Perplexity API error");
            return Err(AppError::upstream(SERVICE, status.as_u16(), body));
        }

        let result: ChatResponse = response.json().await.map_err(|e| {
            if e.is_timeout() {
                AppError::from_transport(SERVICE, self.timeout.as_millis() as u64, e)
            } else {
                AppError::MalformedResponse {
                    message: format!("Failed to parse completion envelope: {}", e),
                }
            }
        })?;

        let model = if result.model.is_empty() { self.model.clone() } else { result.model };
        let choice = result.choices.into_iter().next().ok_or_else(|| AppError::MalformedResponse {
            message: "Completion contained no choices".to_string(),
        })?;

        Ok(Completion {
            content: choice.message.content,
            usage: result.usage,
            model,
            finish_reason: choice.finish_reason.unwrap_or_default(),
        })
    }
}

#[async_trait]
impl LanguageModel for PerplexityClient {
    async fn complete(&self, request: &CompletionRequest) -> Result<Completion> {
        let start = Instant::now();

        let result = self
            .retry
            .run(SERVICE, AppError::is_retryable, || self.make_request(request))
            .await;

        let elapsed = start.elapsed();
        match &result {
            Ok(completion) => {
                debug!(
                    model = %completion.model,
                    max_tokens = request.max_tokens,
                    json = request.is_json(),
                    chars = completion.content.chars().count(),
                    total_tokens = completion.usage.total_tokens,
                    latency_ms = elapsed.as_millis() as u64,
                    "Completion received"
                );
                crate::metrics::record_generation(
                    elapsed.as_secs_f64(),
                    &self.model,
                    completion.usage.total_tokens,
                    true,
                );
            }
            Err(e) => {
                error!(error = %e, latency_ms = elapsed.as_millis() as u64, "Completion failed");
                crate::metrics::record_generation(elapsed.as_secs_f64(), &self.model, 0, false);
            }
        }

        result
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn fast_retry() -> RetryPolicy {
        RetryPolicy {
            max_attempts: 3,
            initial_backoff: Duration::from_millis(5),
            max_backoff: Duration::from_millis(10),
        }
    }

    fn client(server: &MockServer, disable_search: bool) -> PerplexityClient {
        let config = GenerationConfig {
            api_base: Some(format!("{}/chat/completions", server.uri())),
            disable_search,
            ..GenerationConfig::default()
        };
        PerplexityClient::new("pplx-test".into(), &config)
            .unwrap()
            .with_retry_policy(fast_retry())
    }

    fn ok_body(content: &str) -> serde_json::Value {
        serde_json::json!({
            "model": "sonar-pro",
            "choices": [{"message": {"role": "assistant", "content": content}, "finish_reason": "stop"}],
            "usage": {"prompt_tokens": 10, "completion_tokens": 20, "total_tokens": 30}
        })
    }

    #[tokio::test]
    async fn test_successful_completion() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .and(header("authorization", "Bearer pplx-test"))
            .and(body_partial_json(serde_json::json!({
                "model": "sonar-pro",
                "max_tokens": 2000,
                "top_p": 0.9,
                "disable_search": true,
                "response_format": {"type": "json_object"}
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(ok_body("{\"title\":\"t\"}")))
            .expect(1)
            .mount(&server)
            .await;

        let request = CompletionRequest::new("sys", "user", 2000).json();
        let completion = client(&server, true).complete(&request).await.unwrap();

        assert_eq!(completion.content, "{\"title\":\"t\"}");
        assert_eq!(completion.usage.total_tokens, 30);
        assert_eq!(completion.finish_reason, "stop");
    }

    #[tokio::test]
    async fn test_rate_limit_retried_then_exhausted() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(429))
            .expect(3)
            .mount(&server)
            .await;

        let request = CompletionRequest::new("sys", "user", 100);
        let result = client(&server, true).complete(&request).await;
        assert!(matches!(result, Err(AppError::RateLimited { .. })));
    }

    #[tokio::test]
    async fn test_upstream_error_not_retried() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(500).set_body_string("internal"))
            .expect(1)
            .mount(&server)
            .await;

        let request = CompletionRequest::new("sys", "user", 100);
        let result = client(&server, true).complete(&request).await;
        assert!(matches!(result, Err(AppError::Upstream { status: Some(500), .. })));
    }

    #[tokio::test]
    async fn test_timeout_is_retried() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(ok_body("late"))
                    .set_delay(Duration::from_millis(500)),
            )
            .mount(&server)
            .await;

        let config = GenerationConfig {
            api_base: Some(format!("{}/chat/completions", server.uri())),
            ..GenerationConfig::default()
        };
        let client = PerplexityClient::with_timeout("k".into(), &config, Duration::from_millis(100))
            .unwrap()
            .with_retry_policy(RetryPolicy { max_attempts: 2, ..fast_retry() });

        let result = client.complete(&CompletionRequest::new("s", "u", 10)).await;
        assert!(matches!(result, Err(AppError::Timeout { .. })));
    }

    #[tokio::test]
    async fn test_empty_choices_is_malformed() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"choices": []})))
            .mount(&server)
            .await;

        let result = client(&server, true)
            .complete(&CompletionRequest::new("s", "u", 10))
            .await;
        assert!(matches!(result, Err(AppError::MalformedResponse { .. })));
    }

    #[test]
    fn test_domain_filter_only_with_search() {
        let config = GenerationConfig::default();
        let mut request = CompletionRequest::new("s", "u", 10);
        request.domain_filter = Some((0..25).map(|i| format!("d{}.example.com", i)).collect());

        let disabled = PerplexityClient::new("k".into(), &config).unwrap();
        assert!(disabled.payload(&request).search_domain_filter.is_none());

        let enabled = PerplexityClient::new(
            "k".into(),
            &GenerationConfig { disable_search: false, ..GenerationConfig::default() },
        )
        .unwrap();
        assert_eq!(enabled.payload(&request).search_domain_filter.map(|d| d.len()), Some(20));
    }
}
