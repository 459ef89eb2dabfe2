//! Text embedding with caching.
//!
//! Every text is normalized, fingerprinted with the model name, and looked up
//! in the shared [`EmbeddingCache`] before the provider is called. Provider
//! output is L2-normalized before it is cached.

mod cache;
mod hash_provider;
mod provider;
pub mod text;

use std::sync::Arc;

use tracing::{debug, warn};

pub use cache::{CachePerformance, CacheStats, EmbeddingCache};
pub use hash_provider::HashEmbeddingProvider;
pub use provider::EmbeddingProvider;
pub use text::{normalize_text, text_fingerprint};

use crate::error::Result;
use crate::retry::{RetryPolicy, retry_with_backoff};
use crate::{Entity, EntityRole, telemetry, vector};

pub struct EmbeddingService {
    provider: Arc<dyn EmbeddingProvider>,
    cache: Arc<EmbeddingCache>,
    retry: RetryPolicy,
    batch_size: usize,
}

impl EmbeddingService {
    pub fn new(
        provider: Arc<dyn EmbeddingProvider>,
        cache: Arc<EmbeddingCache>,
        retry: RetryPolicy,
        batch_size: usize,
    ) -> Self {
        Self {
            provider,
            cache,
            retry,
            batch_size: batch_size.max(1),
        }
    }

    pub fn model(&self) -> &str {
        self.provider.model()
    }

    pub fn dimension(&self) -> usize {
        self.provider.dimension()
    }

    pub fn cache(&self) -> &Arc<EmbeddingCache> {
        &self.cache
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }

    pub fn clear_cache(&self) {
        self.cache.clear();
    }

    fn zero_vector(&self) -> Vec<f32> {
        vec![0.0; self.dimension()]
    }

    async fn call_provider(&self, normalized: &str) -> Result<Vec<f32>> {
        let provider = &self.provider;
        retry_with_backoff("embed", &self.retry, || provider.embed(normalized))
            .await
            .map_err(|err| {
                telemetry::increment(telemetry::PROVIDER_FAILURES);
                err.into_provider_unavailable()
            })
    }

    /// Embedding for arbitrary text.
    ///
    /// Empty text (after normalization) maps to the zero vector without touching
    /// the provider or the cache.
    pub async fn embed_text(&self, text: &str) -> Result<Vec<f32>> {
        let normalized = normalize_text(text);
        if normalized.is_empty() {
            return Ok(self.zero_vector());
        }

        let key = text_fingerprint(&normalized, self.model());
        if let Some(hit) = self.cache.get(&key) {
            return Ok(hit);
        }

        let mut embedding = self.call_provider(&normalized).await?;
        if embedding.len() != self.dimension() {
            warn!(
                expected = self.dimension(),
                actual = embedding.len(),
                model = self.model(),
                "provider returned unexpected embedding dimension"
            );
        }
        vector::normalize_in_place(&mut embedding);
        self.cache.add(&key, embedding.clone());
        Ok(embedding)
    }

    /// Embeddings for many texts, same order as the input.
    ///
    /// Cached texts are served from the cache; the rest go to the provider in
    /// chunks of the configured batch size. A chunk that fails after retries
    /// yields zero vectors for its texts instead of failing the whole call.
    pub async fn embed_texts(&self, texts: &[String]) -> Vec<Vec<f32>> {
        let mut results: Vec<Option<Vec<f32>>> = vec![None; texts.len()];
        let mut pending: Vec<(usize, String, String)> = Vec::new();

        for (idx, text) in texts.iter().enumerate() {
            let normalized = normalize_text(text);
            if normalized.is_empty() {
                results[idx] = Some(self.zero_vector());
                continue;
            }
            let key = text_fingerprint(&normalized, self.model());
            match self.cache.get(&key) {
                Some(hit) => results[idx] = Some(hit),
                None => pending.push((idx, normalized, key)),
            }
        }

        for chunk in pending.chunks(self.batch_size) {
            let inputs: Vec<String> = chunk.iter().map(|(_, normalized, _)| normalized.clone()).collect();
            let provider = &self.provider;
            let outcome = retry_with_backoff("embed_batch", &self.retry, || provider.embed_batch(&inputs))
                .await
                .and_then(|vectors| {
                    if vectors.len() == inputs.len() {
                        Ok(vectors)
                    } else {
                        Err(crate::MatchError::ProviderUnavailable(format!(
                            "provider returned {} embeddings for {} texts",
                            vectors.len(),
                            inputs.len()
                        )))
                    }
                });

            match outcome {
                Ok(vectors) => {
                    for ((idx, _, key), mut embedding) in chunk.iter().zip(vectors) {
                        vector::normalize_in_place(&mut embedding);
                        self.cache.add(key, embedding.clone());
                        results[*idx] = Some(embedding);
                    }
                }
                Err(err) => {
                    telemetry::increment(telemetry::PROVIDER_FAILURES);
                    warn!(
                        error = %err,
                        chunk_size = chunk.len(),
                        "batch embedding failed; substituting zero vectors"
                    );
                }
            }
        }

        results
            .into_iter()
            .map(|slot| slot.unwrap_or_else(|| self.zero_vector()))
            .collect()
    }

    pub async fn embed_job(&self, job: &Entity) -> Result<Vec<f32>> {
        self.embed_text(&text::job_text(job)).await
    }

    pub async fn embed_profile(&self, profile: &Entity) -> Result<Vec<f32>> {
        self.embed_text(&text::profile_text(profile)).await
    }

    pub async fn embed_skills(&self, skills: &[String]) -> Result<Vec<f32>> {
        self.embed_text(&text::skills_text(skills)).await
    }

    /// Supplied embedding when usable, otherwise one computed from the entity's text.
    pub async fn embedding_for(&self, entity: &Entity, role: EntityRole) -> Result<Vec<f32>> {
        if let Some(supplied) = entity.usable_embedding(Some(self.dimension())) {
            return Ok(supplied.to_vec());
        }
        if entity.embedding.is_some() {
            debug!(
                id = entity.id().unwrap_or(""),
                role = role.as_str(),
                "ignoring malformed supplied embedding"
            );
        }
        match role {
            EntityRole::Job => self.embed_job(entity).await,
            EntityRole::Profile => self.embed_profile(entity).await,
        }
    }
}
