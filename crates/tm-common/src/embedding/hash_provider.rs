use std::hash::{Hash, Hasher};

use async_trait::async_trait;
use siphasher::sip::SipHasher13;

use super::EmbeddingProvider;
use crate::error::Result;
use crate::vector;

/// Fixed keys so every build and platform produces the same vectors.
/// Changing them changes every embedding; bump the model name when you do.
const HASH_SEED_K0: u64 = 0x0123_4567_89ab_cdef;
const HASH_SEED_K1: u64 = 0xfedc_ba98_7654_3210;

/// Deterministic feature-hashing embedder.
///
/// No training and no network: each token is hashed into one of `dimension`
/// buckets with a hashed sign, then the vector is L2-normalized. Texts sharing
/// tokens land close together, which is enough for offline runs and tests.
#[derive(Debug, Clone)]
pub struct HashEmbeddingProvider {
    model: String,
    dimension: usize,
}

impl HashEmbeddingProvider {
    pub fn new(model: impl Into<String>, dimension: usize) -> Self {
        Self {
            model: model.into(),
            dimension: dimension.max(1),
        }
    }

    fn hash_token(&self, token: &str) -> u64 {
        let mut hasher = SipHasher13::new_with_keys(HASH_SEED_K0, HASH_SEED_K1);
        token.hash(&mut hasher);
        hasher.finish()
    }

    fn tokens(text: &str) -> impl Iterator<Item = String> + '_ {
        text.split_whitespace()
            .map(|raw| {
                raw.trim_matches(|c: char| !c.is_alphanumeric() && c != '+' && c != '#')
                    .to_lowercase()
            })
            .filter(|token| !token.is_empty())
    }

    pub fn embed_sync(&self, text: &str) -> Vec<f32> {
        let mut out = vec![0.0f32; self.dimension];

        for token in Self::tokens(text) {
            let idx = (self.hash_token(&token) % self.dimension as u64) as usize;
            // sign hashing keeps collisions from always adding up
            let sign = if self.hash_token(&format!("{token}_sign")) % 2 == 0 {
                1.0
            } else {
                -1.0
            };
            out[idx] += sign;
        }

        vector::normalize_in_place(&mut out);
        out
    }
}

#[async_trait]
impl EmbeddingProvider for HashEmbeddingProvider {
    fn model(&self) -> &str {
        &self.model
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        Ok(self.embed_sync(text))
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        Ok(texts.iter().map(|text| self.embed_sync(text)).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vector::{cosine_similarity, l2_norm};

    #[test]
    fn produces_normalized_vectors_of_configured_dimension() {
        let provider = HashEmbeddingProvider::new("hash-v1", 64);
        let v = provider.embed_sync("senior rust engineer");
        assert_eq!(v.len(), 64);
        assert!((l2_norm(&v) - 1.0).abs() < 1e-5);
    }

    #[test]
    fn is_deterministic() {
        let provider = HashEmbeddingProvider::new("hash-v1", 128);
        assert_eq!(provider.embed_sync("python django"), provider.embed_sync("python django"));
    }

    #[test]
    fn empty_text_gives_zero_vector() {
        let provider = HashEmbeddingProvider::new("hash-v1", 16);
        assert!(provider.embed_sync("  ").iter().all(|x| *x == 0.0));
    }

    #[test]
    fn overlapping_texts_are_more_similar() {
        let provider = HashEmbeddingProvider::new("hash-v1", 256);
        let job = provider.embed_sync("rust aws kubernetes backend");
        let close = provider.embed_sync("rust aws docker backend");
        let far = provider.embed_sync("cobol mainframe oracle");

        assert!(cosine_similarity(&job, &close) > cosine_similarity(&job, &far));
    }

    #[tokio::test]
    async fn batch_matches_single_calls() {
        let provider = HashEmbeddingProvider::new("hash-v1", 32);
        let texts = vec!["rust".to_string(), "go".to_string()];
        let batch = provider.embed_batch(&texts).await.unwrap();
        assert_eq!(batch[0], provider.embed_sync("rust"));
        assert_eq!(batch[1], provider.embed_sync("go"));
    }
}
