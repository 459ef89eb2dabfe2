//! Metric names emitted by the engine. Exported through `tm-metrics` when a recorder is installed.

use std::time::Duration;

pub const EMBEDDING_CACHE_HITS: &str = "tm_embedding_cache_hits_total";
pub const EMBEDDING_CACHE_MISSES: &str = "tm_embedding_cache_misses_total";
pub const PROVIDER_FAILURES: &str = "tm_provider_failures_total";
pub const INDEX_FAILURES: &str = "tm_index_failures_total";
pub const EXPLANATION_FALLBACKS: &str = "tm_explanation_fallbacks_total";
pub const RECOMMENDATIONS_RETURNED: &str = "tm_recommendations_returned_total";
pub const RECOMMEND_DURATION: &str = "tm_recommend_duration_seconds";

pub(crate) fn increment(name: &'static str) {
    metrics::counter!(name).increment(1);
}

pub(crate) fn add(name: &'static str, value: u64) {
    metrics::counter!(name).increment(value);
}

pub(crate) fn record_recommend_duration(direction: &'static str, elapsed: Duration) {
    metrics::histogram!(RECOMMEND_DURATION, "direction" => direction).record(elapsed.as_secs_f64());
}

/// Register help text for every metric above. Call once after a recorder is installed.
pub fn describe() {
    metrics::describe_counter!(EMBEDDING_CACHE_HITS, "Embedding lookups served from the cache");
    metrics::describe_counter!(EMBEDDING_CACHE_MISSES, "Embedding lookups that missed the cache");
    metrics::describe_counter!(PROVIDER_FAILURES, "Embedding provider calls that failed after retries");
    metrics::describe_counter!(INDEX_FAILURES, "Search index calls that failed after retries");
    metrics::describe_counter!(EXPLANATION_FALLBACKS, "Explanations replaced by the deterministic fallback");
    metrics::describe_counter!(RECOMMENDATIONS_RETURNED, "Ranked entries handed back to callers");
    metrics::describe_histogram!(
        RECOMMEND_DURATION,
        metrics::Unit::Seconds,
        "Wall time of one recommendation pipeline"
    );
}
