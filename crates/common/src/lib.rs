//! PostForge Common Library
//!
//! Shared code for the PostForge article generator including:
//! - Character-count-controlled generation pipeline
//! - Language model client abstraction
//! - HTML sanitization and measurement
//! - Taxonomy resolution and local cache
//! - CMS client and publishing
//! - Error types, configuration and metrics

pub mod cache;
pub mod cms;
pub mod config;
pub mod content;
pub mod errors;
pub mod llm;
pub mod metrics;
pub mod models;
pub mod pipeline;
pub mod publish;
pub mod taxonomy;

// Re-export commonly used types
pub use config::AppConfig;
pub use errors::{AppError, Result};
pub use llm::LanguageModel;
pub use pipeline::{ArticlePipeline, GeneratedArticle};

/// Application version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
