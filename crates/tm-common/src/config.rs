use std::time::Duration;

use crate::EntityRole;
use crate::retry::RetryPolicy;

/// Runtime knobs for the recommendation engine, resolved from `TM_*` environment variables.
#[derive(Debug, Clone, PartialEq)]
pub struct EngineConfig {
    pub max_recommendations: usize,
    pub default_min_score: f64,
    pub cache_capacity: usize,
    pub embedding_model: String,
    pub embedding_dimension: usize,
    pub embedding_batch_size: usize,
    pub provider_timeout_secs: u64,
    pub provider_max_retries: u32,
    pub retry_backoff_ms: u64,
    pub batch_concurrency: usize,
    pub jobs_collection: String,
    pub profiles_collection: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_recommendations: 10,
            default_min_score: 0.7,
            cache_capacity: 1000,
            embedding_model: "hash-v1".into(),
            embedding_dimension: 256,
            embedding_batch_size: 100,
            provider_timeout_secs: 30,
            provider_max_retries: 3,
            retry_backoff_ms: 1000,
            batch_concurrency: 4,
            jobs_collection: "jobs".into(),
            profiles_collection: "profiles".into(),
        }
    }
}

impl EngineConfig {
    pub fn from_env() -> Self {
        fn parse_usize(key: &str, default: usize) -> usize {
            std::env::var(key)
                .ok()
                .and_then(|raw| raw.trim().parse::<usize>().ok())
                .unwrap_or(default)
        }

        fn parse_u64(key: &str, default: u64) -> u64 {
            std::env::var(key)
                .ok()
                .and_then(|raw| raw.trim().parse::<u64>().ok())
                .unwrap_or(default)
        }

        fn parse_u32(key: &str, default: u32) -> u32 {
            std::env::var(key)
                .ok()
                .and_then(|raw| raw.trim().parse::<u32>().ok())
                .unwrap_or(default)
        }

        fn parse_score(key: &str, default: f64) -> f64 {
            std::env::var(key)
                .ok()
                .and_then(|raw| raw.trim().parse::<f64>().ok())
                .filter(|value| value.is_finite())
                .map(|value| value.clamp(0.0, 1.0))
                .unwrap_or(default)
        }

        fn parse_string(key: &str, default: &str) -> String {
            std::env::var(key)
                .ok()
                .map(|raw| raw.trim().to_string())
                .filter(|raw| !raw.is_empty())
                .unwrap_or_else(|| default.to_string())
        }

        let defaults = Self::default();

        Self {
            max_recommendations: parse_usize("TM_MAX_RECOMMENDATIONS", defaults.max_recommendations),
            default_min_score: parse_score("TM_DEFAULT_MIN_SCORE", defaults.default_min_score),
            cache_capacity: parse_usize("TM_CACHE_CAPACITY", defaults.cache_capacity).max(1),
            embedding_model: parse_string("TM_EMBEDDING_MODEL", &defaults.embedding_model),
            embedding_dimension: parse_usize("TM_EMBEDDING_DIMENSION", defaults.embedding_dimension)
                .max(1),
            embedding_batch_size: parse_usize("TM_EMBEDDING_BATCH_SIZE", defaults.embedding_batch_size)
                .max(1),
            provider_timeout_secs: parse_u64("TM_PROVIDER_TIMEOUT_SECONDS", defaults.provider_timeout_secs)
                .max(1),
            provider_max_retries: parse_u32("TM_PROVIDER_MAX_RETRIES", defaults.provider_max_retries)
                .max(1),
            retry_backoff_ms: parse_u64("TM_RETRY_BACKOFF_MS", defaults.retry_backoff_ms),
            batch_concurrency: parse_usize("TM_BATCH_CONCURRENCY", defaults.batch_concurrency).max(1),
            jobs_collection: parse_string("TM_JOBS_COLLECTION", &defaults.jobs_collection),
            profiles_collection: parse_string("TM_PROFILES_COLLECTION", &defaults.profiles_collection),
        }
    }

    /// Index collection holding entities of `role`.
    pub fn collection_for(&self, role: EntityRole) -> &str {
        match role {
            EntityRole::Job => &self.jobs_collection,
            EntityRole::Profile => &self.profiles_collection,
        }
    }

    /// Retry policy applied to provider, explainer and index calls.
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.provider_max_retries.max(1),
            base_delay: Duration::from_millis(self.retry_backoff_ms),
            timeout: Duration::from_secs(self.provider_timeout_secs.max(1)),
            ..RetryPolicy::default()
        }
    }
}
