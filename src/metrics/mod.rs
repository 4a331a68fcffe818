// Metrics module for Prometheus observability
// Author: json2sheet contributors

mod registry;

pub use registry::{
    gather_metrics, CACHE_ENTRIES, CACHE_OPERATIONS, GEMINI_API_CALLS, GEMINI_API_DURATION,
    REQUESTS_TOTAL, REQUEST_DURATION, TOKENS_TOTAL,
};

/// Helper to record request metrics
pub fn record_request(endpoint: &str, status_code: u16, model: &str, duration_secs: f64) {
    REQUESTS_TOTAL
        .with_label_values(&[endpoint, &status_code.to_string(), model])
        .inc();

    REQUEST_DURATION
        .with_label_values(&[endpoint])
        .observe(duration_secs);
}

/// Helper to record Gemini API call metrics
pub fn record_gemini_call(operation: &str, model: &str, status_code: u16, duration_secs: f64) {
    GEMINI_API_CALLS
        .with_label_values(&[operation, model, &status_code.to_string()])
        .inc();

    GEMINI_API_DURATION
        .with_label_values(&[operation])
        .observe(duration_secs);
}

/// Helper to record token usage
pub fn record_tokens(model: &str, prompt: u64, completion: u64, cached: u64) {
    for (kind, count) in [("prompt", prompt), ("completion", completion), ("cached", cached)] {
        if count > 0 {
            TOKENS_TOTAL
                .with_label_values(&[model, kind])
                .inc_by(count as f64);
        }
    }
}

/// Helper to record content cache operations
pub fn record_cache_operation(operation: &str) {
    CACHE_OPERATIONS.with_label_values(&[operation]).inc();
}

pub fn update_cache_entries(count: usize) {
    CACHE_ENTRIES.with_label_values(&["resident"]).set(count as f64);
}
