//! Error types for PostForge
//!
//! Provides a single error enum shared by the pipeline and its clients:
//! - Distinct error kinds for each failure mode
//! - Retry classification for the HTTP clients
//! - Machine-readable error codes for callers that record failures

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result type alias using AppError
pub type Result<T> = std::result::Result<T, AppError>;

/// Error codes for machine-readable error identification
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    // Validation errors (1xxx)
    ValidationError,

    // Generation errors (2xxx)
    EmptyOutline,
    MalformedResponse,

    // Resource errors (4xxx)
    NotFound,

    // Conflict errors (5xxx)
    Conflict,

    // Rate limiting (6xxx)
    RateLimited,

    // External service errors (8xxx)
    UpstreamError,
    UpstreamTimeout,
    ConnectionError,
    CmsUnauthorized,
    CacheError,

    // Internal errors (9xxx)
    InternalError,
    ConfigurationError,
    SerializationError,
}

impl ErrorCode {
    /// Get the numeric code for this error
    pub fn as_code(&self) -> u16 {
        match self {
            ErrorCode::ValidationError => 1001,

            ErrorCode::EmptyOutline => 2001,
            ErrorCode::MalformedResponse => 2002,

            ErrorCode::NotFound => 4001,

            ErrorCode::Conflict => 5001,

            ErrorCode::RateLimited => 6001,

            ErrorCode::UpstreamError => 8001,
            ErrorCode::UpstreamTimeout => 8002,
            ErrorCode::ConnectionError => 8003,
            ErrorCode::CmsUnauthorized => 8004,
            ErrorCode::CacheError => 8005,

            ErrorCode::InternalError => 9001,
            ErrorCode::ConfigurationError => 9002,
            ErrorCode::SerializationError => 9003,
        }
    }
}

/// Application error types
#[derive(Error, Debug)]
pub enum AppError {
    // Validation errors
    #[error("Validation failed: {message}")]
    Validation {
        message: String,
        field: Option<String>
    },

    // Generation errors
    #[error("Outline contained no sections")]
    EmptyOutline,

    #[error("Malformed response: {message}")]
    MalformedResponse { message: String },

    // Upstream errors
    #[error("Rate limited by {service}")]
    RateLimited { service: String },

    #[error("{service} timed out after {timeout_ms}ms")]
    Timeout { service: String, timeout_ms: u64 },

    #[error("Connection to {service} failed: {message}")]
    Connection { service: String, message: String },

    #[error("{service} error{}: {message}", status_suffix(.status))]
    Upstream {
        service: String,
        status: Option<u16>,
        message: String
    },

    #[error("CMS authentication failed: {message}")]
    CmsAuth { message: String },

    // Resource errors
    #[error("Resource not found: {resource_type} {id}")]
    NotFound { resource_type: String, id: String },

    #[error("Duplicate resource: {message}")]
    Duplicate { message: String },

    #[error("Cache error: {message}")]
    CacheError { message: String },

    #[error("HTTP client error: {0}")]
    HttpClient(#[from] reqwest::Error),

    // Internal errors
    #[error("Internal error: {message}")]
    Internal { message: String },

    #[error("Configuration error: {message}")]
    Configuration { message: String },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    // Generic
    #[error("{0}")]
    Other(#[from] anyhow::Error),
}

fn status_suffix(status: &Option<u16>) -> String {
    status.map(|s| format!(" {}", s)).unwrap_or_default()
}

impl AppError {
    /// Get the error code for this error
    pub fn code(&self) -> ErrorCode {
        match self {
            AppError::Validation { .. } => ErrorCode::ValidationError,
            AppError::EmptyOutline => ErrorCode::EmptyOutline,
            AppError::MalformedResponse { .. } => ErrorCode::MalformedResponse,
            AppError::RateLimited { .. } => ErrorCode::RateLimited,
            AppError::Timeout { .. } => ErrorCode::UpstreamTimeout,
            AppError::Connection { .. } => ErrorCode::ConnectionError,
            AppError::Upstream { .. } => ErrorCode::UpstreamError,
            AppError::CmsAuth { .. } => ErrorCode::CmsUnauthorized,
            AppError::NotFound { .. } => ErrorCode::NotFound,
            AppError::Duplicate { .. } => ErrorCode::Conflict,
            AppError::CacheError { .. } => ErrorCode::CacheError,
            AppError::HttpClient(_) => ErrorCode::UpstreamError,
            AppError::Internal { .. } => ErrorCode::InternalError,
            AppError::Configuration { .. } => ErrorCode::ConfigurationError,
            AppError::Serialization(_) => ErrorCode::SerializationError,
            AppError::Other(_) => ErrorCode::InternalError,
        }
    }

    /// Transient generation failures: rate limiting and timeouts.
    ///
    /// Everything else (upstream errors, malformed responses) is permanent.
    pub fn is_retryable(&self) -> bool {
        matches!(self, AppError::RateLimited { .. } | AppError::Timeout { .. })
    }

    /// Transient transport failures: timeouts and refused/reset connections.
    pub fn is_transport_failure(&self) -> bool {
        matches!(self, AppError::Timeout { .. } | AppError::Connection { .. })
    }

    /// Build an upstream error for a non-success HTTP response
    pub fn upstream(service: &str, status: u16, body: String) -> Self {
        AppError::Upstream {
            service: service.to_string(),
            status: Some(status),
            message: body,
        }
    }

    /// Classify a transport-level reqwest failure
    pub fn from_transport(service: &str, timeout_ms: u64, err: reqwest::Error) -> Self {
        if err.is_timeout() {
            AppError::Timeout {
                service: service.to_string(),
                timeout_ms,
            }
        } else if err.is_connect() {
            AppError::Connection {
                service: service.to_string(),
                message: err.to_string(),
            }
        } else {
            AppError::Upstream {
                service: service.to_string(),
                status: None,
                message: format!("Request error: {}", err),
            }
        }
    }
}

impl From<validator::ValidationErrors> for AppError {
    fn from(err: validator::ValidationErrors) -> Self {
        let field = err.field_errors().keys().next().map(|f| f.to_string());
        AppError::Validation {
            message: err.to_string(),
            field,
        }
    }
}

impl From<redis::RedisError> for AppError {
    fn from(err: redis::RedisError) -> Self {
        AppError::CacheError {
            message: err.to_string()
        }
    }
}

impl From<config::ConfigError> for AppError {
    fn from(err: config::ConfigError) -> Self {
        AppError::Configuration {
            message: err.to_string(),
        }
    }
}
