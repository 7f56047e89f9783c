pub mod cache;

use std::sync::Arc;
use std::time::Duration;

pub use cache::EmbeddingCache;

use crate::core::errors::ApiError;
use crate::llm::LlmProvider;

/// Embeds text through the provider, memoizing results in the shared cache.
#[derive(Clone)]
pub struct CachedEmbedder {
    provider: Arc<dyn LlmProvider>,
    cache: Arc<EmbeddingCache>,
    timeout: Duration,
}

impl CachedEmbedder {
    pub fn new(
        provider: Arc<dyn LlmProvider>,
        cache: Arc<EmbeddingCache>,
        timeout: Duration,
    ) -> Self {
        Self {
            provider,
            cache,
            timeout,
        }
    }

    /// Return the embedding for `text`, computing and caching it on a miss.
    pub async fn embed(&self, text: &str) -> Result<Vec<f32>, ApiError> {
        if let Some(vector) = self.cache.get(text).await {
            return Ok(vector);
        }

        let mut vectors = self
            .provider
            .embed(&[text.to_string()], self.timeout)
            .await?;
        let vector = vectors
            .pop()
            .ok_or_else(|| ApiError::Provider("provider returned no embedding".to_string()))?;

        self.cache.put(text, vector.clone()).await;
        Ok(vector)
    }
}
