//! Configuration management for PostForge
//!
//! Supports loading configuration from:
//! - Environment variables (prefixed with APP__)
//! - Configuration files (config.toml, config.yaml)
//! - Default values

use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::llm::RetryPolicy;

/// Main application configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AppConfig {
    /// Language generation service configuration
    #[serde(default)]
    pub generation: GenerationConfig,

    /// WordPress REST API configuration
    #[serde(default)]
    pub wordpress: WordPressConfig,

    /// Taxonomy resolution configuration
    #[serde(default)]
    pub taxonomy: TaxonomyConfig,

    /// Redis configuration (taxonomy store)
    #[serde(default)]
    pub redis: RedisConfig,

    /// Pipeline tuning
    #[serde(default)]
    pub pipeline: PipelineConfig,

    /// Observability configuration
    #[serde(default)]
    pub observability: ObservabilityConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct GenerationConfig {
    /// Generation provider: perplexity
    #[serde(default = "default_generation_provider")]
    pub provider: String,

    /// API key for the generation service
    pub api_key: Option<String>,

    /// Chat completions endpoint override
    pub api_base: Option<String>,

    /// Model to use
    #[serde(default = "default_generation_model")]
    pub model: String,

    /// Request timeout in seconds
    #[serde(default = "default_generation_timeout")]
    pub timeout_secs: u64,

    /// Total attempts for transient failures
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// First retry delay in milliseconds
    #[serde(default = "default_generation_backoff_initial")]
    pub backoff_initial_ms: u64,

    /// Retry delay cap in milliseconds
    #[serde(default = "default_generation_backoff_max")]
    pub backoff_max_ms: u64,

    /// Disable web search on the provider side
    #[serde(default = "default_disable_search")]
    pub disable_search: bool,

    /// Sampling temperature
    #[serde(default = "default_temperature")]
    pub temperature: f32,

    /// Nucleus sampling
    #[serde(default = "default_top_p")]
    pub top_p: f32,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct WordPressConfig {
    /// Site base URL (without /wp-json)
    #[serde(default = "default_wp_base_url")]
    pub base_url: String,

    /// WordPress user name
    #[serde(default)]
    pub username: String,

    /// Application password for the user
    #[serde(default)]
    pub application_password: String,

    /// Request timeout in seconds
    #[serde(default = "default_wp_timeout")]
    pub timeout_secs: u64,

    /// Total attempts for timeouts and connection failures
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// First retry delay in milliseconds
    #[serde(default = "default_wp_backoff_initial")]
    pub backoff_initial_ms: u64,

    /// Retry delay cap in milliseconds
    #[serde(default = "default_wp_backoff_max")]
    pub backoff_max_ms: u64,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TaxonomyConfig {
    /// Create categories/tags missing from the cache
    #[serde(default = "default_enabled")]
    pub auto_create_missing: bool,

    /// Category used when resolution fails
    #[serde(default = "default_category_id")]
    pub default_category_id: u64,

    /// Store backend: memory, redis
    #[serde(default = "default_taxonomy_store")]
    pub store: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RedisConfig {
    /// Redis URL
    #[serde(default = "default_redis_url")]
    pub url: String,

    /// Key prefix for namespacing
    #[serde(default = "default_key_prefix")]
    pub key_prefix: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PipelineConfig {
    /// Accepted deviation from the target character count
    #[serde(default = "default_tolerance")]
    pub tolerance: usize,

    /// Sections that receive extra content when the article is short
    #[serde(default = "default_max_expansion_sections")]
    pub max_expansion_sections: usize,

    /// Lower bound of the per-section character target
    #[serde(default = "default_min_section_chars")]
    pub min_section_chars: usize,

    /// Upper bound of the per-section character target
    #[serde(default = "default_max_section_chars")]
    pub max_section_chars: usize,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ObservabilityConfig {
    /// Log level (debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Enable JSON logging
    #[serde(default = "default_json_logging")]
    pub json_logging: bool,

    /// Metrics port (0 to disable)
    #[serde(default = "default_metrics_port")]
    pub metrics_port: u16,

    /// Service name for tracing
    #[serde(default = "default_service_name")]
    pub service_name: String,
}

// Default value functions
fn default_generation_provider() -> String { "perplexity".to_string() }
fn default_generation_model() -> String { "sonar-pro".to_string() }
fn default_generation_timeout() -> u64 { 120 }
fn default_max_attempts() -> u32 { 3 }
fn default_generation_backoff_initial() -> u64 { 4_000 }
fn default_generation_backoff_max() -> u64 { 10_000 }
fn default_disable_search() -> bool { true }
fn default_temperature() -> f32 { 0.2 }
fn default_top_p() -> f32 { 0.9 }
fn default_wp_base_url() -> String { "http://localhost:8000".to_string() }
fn default_wp_timeout() -> u64 { 60 }
fn default_wp_backoff_initial() -> u64 { 2_000 }
fn default_wp_backoff_max() -> u64 { 8_000 }
fn default_enabled() -> bool { true }
fn default_category_id() -> u64 { 1 }
fn default_taxonomy_store() -> String { "memory".to_string() }
fn default_redis_url() -> String { "redis://localhost:6379".to_string() }
fn default_key_prefix() -> String { "postforge".to_string() }
fn default_tolerance() -> usize { 1000 }
fn default_max_expansion_sections() -> usize { 3 }
fn default_min_section_chars() -> usize { 1500 }
fn default_max_section_chars() -> usize { 3000 }
fn default_log_level() -> String { "info".to_string() }
fn default_json_logging() -> bool { true }
fn default_metrics_port() -> u16 { 0 }
fn default_service_name() -> String { "postforge".to_string() }

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            provider: default_generation_provider(),
            api_key: None,
            api_base: None,
            model: default_generation_model(),
            timeout_secs: default_generation_timeout(),
            max_attempts: default_max_attempts(),
            backoff_initial_ms: default_generation_backoff_initial(),
            backoff_max_ms: default_generation_backoff_max(),
            disable_search: default_disable_search(),
            temperature: default_temperature(),
            top_p: default_top_p(),
        }
    }
}

impl Default for WordPressConfig {
    fn default() -> Self {
        Self {
            base_url: default_wp_base_url(),
            username: String::new(),
            application_password: String::new(),
            timeout_secs: default_wp_timeout(),
            max_attempts: default_max_attempts(),
            backoff_initial_ms: default_wp_backoff_initial(),
            backoff_max_ms: default_wp_backoff_max(),
        }
    }
}

impl Default for TaxonomyConfig {
    fn default() -> Self {
        Self {
            auto_create_missing: default_enabled(),
            default_category_id: default_category_id(),
            store: default_taxonomy_store(),
        }
    }
}

impl Default for RedisConfig {
    fn default() -> Self {
        Self {
            url: default_redis_url(),
            key_prefix: default_key_prefix(),
        }
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            tolerance: default_tolerance(),
            max_expansion_sections: default_max_expansion_sections(),
            min_section_chars: default_min_section_chars(),
            max_section_chars: default_max_section_chars(),
        }
    }
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            json_logging: default_json_logging(),
            metrics_port: default_metrics_port(),
            service_name: default_service_name(),
        }
    }
}

impl GenerationConfig {
    /// Retry policy for the generation client
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.max_attempts,
            initial_backoff: Duration::from_millis(self.backoff_initial_ms),
            max_backoff: Duration::from_millis(self.backoff_max_ms),
        }
    }

    /// Get request timeout as Duration
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl WordPressConfig {
    /// Retry policy for the WordPress client
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.max_attempts,
            initial_backoff: Duration::from_millis(self.backoff_initial_ms),
            max_backoff: Duration::from_millis(self.backoff_max_ms),
        }
    }

    /// Get request timeout as Duration
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl AppConfig {
    /// Load configuration from environment and files
    pub fn load() -> Result<Self, ConfigError> {
        let env = std::env::var("APP_ENV").unwrap_or_else(|_| "development".to_string());

        let config = Config::builder()
            // Load base config file
            .add_source(File::with_name("config/default").required(false))

            // Load environment-specific config
            .add_source(File::with_name(&format!("config/{}", env)).required(false))

            // Load local overrides
            .add_source(File::with_name("config/local").required(false))

            // Load from environment variables with APP__ prefix
            // e.g., APP__GENERATION__API_KEY=pplx-...
            .add_source(
                Environment::with_prefix("APP")
                    .separator("__")
                    .try_parsing(true)
            )

            .build()?;

        config.try_deserialize()
    }

    /// Load from a specific TOML file
    pub fn from_file(path: &str) -> Result<Self, ConfigError> {
        let config = Config::builder()
            .add_source(File::with_name(path))
            .add_source(
                Environment::with_prefix("APP")
                    .separator("__")
                    .try_parsing(true)
            )
            .build()?;

        config.try_deserialize()
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            generation: GenerationConfig::default(),
            wordpress: WordPressConfig::default(),
            taxonomy: TaxonomyConfig::default(),
            redis: RedisConfig::default(),
            pipeline: PipelineConfig::default(),
            observability: ObservabilityConfig::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.generation.model, "sonar-pro");
        assert_eq!(config.generation.timeout(), Duration::from_secs(120));
        assert_eq!(config.pipeline.tolerance, 1000);
        assert_eq!(config.taxonomy.default_category_id, 1);
        assert!(config.taxonomy.auto_create_missing);
    }

    #[test]
    fn test_generation_retry_policy() {
        let policy = AppConfig::default().generation.retry_policy();
        assert_eq!(policy.max_attempts, 3);
        assert_eq!(policy.initial_backoff, Duration::from_secs(4));
        assert_eq!(policy.max_backoff, Duration::from_secs(10));
    }

    #[test]
    fn test_partial_sections_fill_defaults() {
        let config: AppConfig = Config::builder()
            .set_override("generation.api_key", "pplx-test")
            .unwrap()
            .set_override("pipeline.tolerance", 500)
            .unwrap()
            .build()
            .unwrap()
            .try_deserialize()
            .unwrap();

        assert_eq!(config.generation.api_key.as_deref(), Some("pplx-test"));
        assert_eq!(config.generation.max_attempts, 3);
        assert_eq!(config.pipeline.tolerance, 500);
        assert_eq!(config.wordpress.timeout_secs, 60);
    }
}
