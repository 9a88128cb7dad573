//! Language generation client abstraction
//!
//! Provides a single completion interface over chat-style providers:
//! - Perplexity chat completions (sonar models)
//! - Scripted responses for tests and dry runs
//!
//! Retries for transient failures live here so callers see either a
//! completion or a final error.

mod perplexity;
mod retry;
mod scripted;

pub use perplexity::PerplexityClient;
pub use retry::RetryPolicy;
pub use scripted::ScriptedLanguageModel;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::config::GenerationConfig;
use crate::errors::{AppError, Result};

/// Message author
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self { role: Role::System, content: content.into() }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self { role: Role::User, content: content.into() }
    }
}

/// Structured output mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ResponseFormat {
    JsonObject,
}

/// One completion call
#[derive(Debug, Clone, PartialEq)]
pub struct CompletionRequest {
    pub messages: Vec<ChatMessage>,
    pub max_tokens: u32,
    /// Overrides the configured temperature when set
    pub temperature: Option<f32>,
    pub response_format: Option<ResponseFormat>,
    /// Hosts the provider may search
    pub domain_filter: Option<Vec<String>>,
}

impl CompletionRequest {
    /// System + user prompt pair
    pub fn new(system: impl Into<String>, user: impl Into<String>, max_tokens: u32) -> Self {
        Self {
            messages: vec![ChatMessage::system(system), ChatMessage::user(user)],
            max_tokens,
            temperature: None,
            response_format: None,
            domain_filter: None,
        }
    }

    /// Request a JSON object response
    pub fn json(mut self) -> Self {
        self.response_format = Some(ResponseFormat::JsonObject);
        self
    }

    pub fn with_domain_filter(mut self, domains: Option<Vec<String>>) -> Self {
        self.domain_filter = domains;
        self
    }

    pub fn is_json(&self) -> bool {
        self.response_format.is_some()
    }
}

/// Token accounting reported by the provider
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenUsage {
    #[serde(default)]
    pub prompt_tokens: u32,
    #[serde(default)]
    pub completion_tokens: u32,
    #[serde(default)]
    pub total_tokens: u32,
}

/// Completion result
#[derive(Debug, Clone, PartialEq)]
pub struct Completion {
    pub content: String,
    pub usage: TokenUsage,
    pub model: String,
    pub finish_reason: String,
}

impl Completion {
    /// Parse JSON-mode content.
    ///
    /// A surrounding Markdown code fence is tolerated; anything else that
    /// does not parse is a `MalformedResponse`.
    pub fn parse_json<T: DeserializeOwned>(&self) -> Result<T> {
        let body = strip_code_fence(&self.content);
        serde_json::from_str(body).map_err(|e| AppError::MalformedResponse {
            message: format!("Invalid JSON from {}: {}", self.model, e),
        })
    }
}

fn strip_code_fence(content: &str) -> &str {
    let trimmed = content.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let rest = rest.strip_prefix("json").unwrap_or(rest);
    rest.strip_suffix("```").unwrap_or(rest).trim()
}

/// Trait for text generation
#[async_trait]
pub trait LanguageModel: Send + Sync {
    /// Issue one completion, retrying transient failures internally
    async fn complete(&self, request: &CompletionRequest) -> Result<Completion>;

    /// Get the model name
    fn model_name(&self) -> &str;
}

/// Create a language model based on configuration
pub fn create_language_model(config: &GenerationConfig) -> Result<Arc<dyn LanguageModel>> {
    match config.provider.as_str() {
        "perplexity" => {
            let api_key = config.api_key.clone().ok_or_else(|| AppError::Configuration {
                message: "generation.api_key is required for the perplexity provider".to_string(),
            })?;
            Ok(Arc::new(PerplexityClient::new(api_key, config)?))
        }
        other => Err(AppError::Configuration {
            message: format!("Unknown generation provider: {}", other),
        }),
    }
}
