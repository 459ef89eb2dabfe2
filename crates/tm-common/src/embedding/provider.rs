use async_trait::async_trait;

use crate::error::Result;

/// Source of text embeddings (a hosted model, a local model, or the hash provider).
///
/// Implementations report transient failures as
/// [`MatchError::ProviderUnavailable`](crate::MatchError::ProviderUnavailable)
/// so the caller's retry policy applies.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Model identifier; part of every cache key.
    fn model(&self) -> &str;

    fn dimension(&self) -> usize;

    async fn embed(&self, text: &str) -> Result<Vec<f32>>;

    /// Embed several texts in one call. The default issues one `embed` per text.
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let mut out = Vec::with_capacity(texts.len());
        for text in texts {
            out.push(self.embed(text).await?);
        }
        Ok(out)
    }
}
