//! Metrics and observability utilities
//!
//! Provides Prometheus metrics for the generation pipeline and its clients
//! with standardized naming conventions.

use metrics::{counter, describe_counter, describe_histogram, histogram, Unit};
use std::time::Instant;

/// Metrics prefix for all PostForge metrics
pub const METRICS_PREFIX: &str = "postforge";

/// Buckets for generation API latency (long completions)
pub const GENERATION_BUCKETS: &[f64] = &[
    1.0,   // 1s
    2.5,   // 2.5s
    5.0,   // 5s
    10.0,  // 10s
    20.0,  // 20s
    30.0,  // 30s
    60.0,  // 1m
    90.0,  // 1.5m
    120.0, // 2m - request timeout
];

/// Buckets for a full pipeline run
pub const PIPELINE_BUCKETS: &[f64] = &[
    30.0,   // 30s
    60.0,   // 1m
    120.0,  // 2m
    300.0,  // 5m
    600.0,  // 10m
    900.0,  // 15m
    1800.0, // 30m
];

/// Register all metric descriptions
pub fn register_metrics() {
    // Generation API
    describe_counter!(
        format!("{}_generation_requests_total", METRICS_PREFIX),
        Unit::Count,
        "Total generation API requests"
    );

    describe_histogram!(
        format!("{}_generation_duration_seconds", METRICS_PREFIX),
        Unit::Seconds,
        "Generation API latency in seconds"
    );

    describe_counter!(
        format!("{}_generation_tokens_total", METRICS_PREFIX),
        Unit::Count,
        "Total tokens reported by the generation API"
    );

    describe_counter!(
        format!("{}_retries_total", METRICS_PREFIX),
        Unit::Count,
        "Total retried outbound calls"
    );

    // Pipeline
    describe_counter!(
        format!("{}_articles_total", METRICS_PREFIX),
        Unit::Count,
        "Total pipeline runs by outcome"
    );

    describe_histogram!(
        format!("{}_pipeline_duration_seconds", METRICS_PREFIX),
        Unit::Seconds,
        "End-to-end pipeline latency in seconds"
    );

    describe_counter!(
        format!("{}_length_adjustments_total", METRICS_PREFIX),
        Unit::Count,
        "Length adjustment passes by action"
    );

    describe_histogram!(
        format!("{}_article_chars", METRICS_PREFIX),
        Unit::Count,
        "Character count of accepted article bodies"
    );

    // CMS
    describe_counter!(
        format!("{}_cms_requests_total", METRICS_PREFIX),
        Unit::Count,
        "Total CMS REST requests"
    );

    describe_histogram!(
        format!("{}_cms_request_duration_seconds", METRICS_PREFIX),
        Unit::Seconds,
        "CMS REST latency in seconds"
    );

    // Taxonomy
    describe_counter!(
        format!("{}_taxonomy_resolutions_total", METRICS_PREFIX),
        Unit::Count,
        "Taxonomy name resolutions by outcome"
    );

    describe_counter!(
        format!("{}_cache_hits_total", METRICS_PREFIX),
        Unit::Count,
        "Total cache hits"
    );

    describe_counter!(
        format!("{}_cache_misses_total", METRICS_PREFIX),
        Unit::Count,
        "Total cache misses"
    );

    // Worker
    describe_counter!(
        format!("{}_article_jobs_total", METRICS_PREFIX),
        Unit::Count,
        "Article jobs by final status"
    );

    tracing::info!("Metrics registered");
}

/// Helper to record CMS request metrics
pub struct RequestMetrics {
    start: Instant,
    endpoint: String,
    method: String,
}

impl RequestMetrics {
    /// Start tracking a request
    pub fn start(method: &str, endpoint: &str) -> Self {
        Self {
            start: Instant::now(),
            endpoint: endpoint.to_string(),
            method: method.to_string(),
        }
    }

    /// Record request completion; `status` 0 means no response
    pub fn finish(self, status: u16) {
        let duration = self.start.elapsed().as_secs_f64();

        counter!(
            format!("{}_cms_requests_total", METRICS_PREFIX),
            "method" => self.method.clone(),
            "endpoint" => self.endpoint.clone(),
            "status" => status.to_string()
        )
        .increment(1);

        histogram!(
            format!("{}_cms_request_duration_seconds", METRICS_PREFIX),
            "method" => self.method,
            "endpoint" => self.endpoint
        )
        .record(duration);
    }
}

/// Helper to record one generation API call
pub fn record_generation(duration_secs: f64, model: &str, total_tokens: u32, success: bool) {
    let status = if success { "success" } else { "error" };

    counter!(
        format!("{}_generation_requests_total", METRICS_PREFIX),
        "model" => model.to_string(),
        "status" => status
    )
    .increment(1);

    histogram!(
        format!("{}_generation_duration_seconds", METRICS_PREFIX),
        "model" => model.to_string()
    )
    .record(duration_secs);

    if success {
        counter!(
            format!("{}_generation_tokens_total", METRICS_PREFIX),
            "model" => model.to_string()
        )
        .increment(total_tokens as u64);
    }
}

/// Helper to record a retried call
pub fn record_retry(operation: &str) {
    counter!(
        format!("{}_retries_total", METRICS_PREFIX),
        "operation" => operation.to_string()
    )
    .increment(1);
}

/// Helper to record a finished pipeline run
pub fn record_pipeline(duration_secs: f64, outcome: &str, char_count: Option<usize>) {
    counter!(
        format!("{}_articles_total", METRICS_PREFIX),
        "outcome" => outcome.to_string()
    )
    .increment(1);

    histogram!(format!("{}_pipeline_duration_seconds", METRICS_PREFIX)).record(duration_secs);

    if let Some(chars) = char_count {
        histogram!(format!("{}_article_chars", METRICS_PREFIX)).record(chars as f64);
    }
}

/// Helper to record a length adjustment pass
pub fn record_length_adjustment(action: &str) {
    counter!(
        format!("{}_length_adjustments_total", METRICS_PREFIX),
        "action" => action.to_string()
    )
    .increment(1);
}

/// Helper to record a taxonomy resolution outcome
pub fn record_taxonomy(kind: &str, outcome: &str) {
    counter!(
        format!("{}_taxonomy_resolutions_total", METRICS_PREFIX),
        "kind" => kind.to_string(),
        "outcome" => outcome.to_string()
    )
    .increment(1);
}

/// Helper to record cache metrics
pub fn record_cache(hit: bool, cache_name: &str) {
    if hit {
        counter!(
            format!("{}_cache_hits_total", METRICS_PREFIX),
            "cache" => cache_name.to_string()
        )
        .increment(1);
    } else {
        counter!(
            format!("{}_cache_misses_total", METRICS_PREFIX),
            "cache" => cache_name.to_string()
        )
        .increment(1);
    }
}
