use std::time::Duration;

use async_trait::async_trait;

use crate::core::errors::ApiError;

#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// return the provider name (e.g. "ollama", "openai")
    fn name(&self) -> &str;

    /// check if the provider is healthy/reachable
    async fn health_check(&self) -> Result<bool, ApiError>;

    /// list available models from the provider
    async fn list_models(&self) -> Result<Vec<String>, ApiError>;

    /// single-prompt completion; expiry of the deadline maps to ApiError::Provider
    async fn complete(&self, prompt: &str, timeout: Duration) -> Result<String, ApiError>;

    /// generate embeddings for a batch of inputs
    async fn embed(&self, inputs: &[String], timeout: Duration)
        -> Result<Vec<Vec<f32>>, ApiError>;
}

/// Run a provider call under a deadline, mapping expiry to a provider error
/// so callers can apply their fallback rules.
pub(crate) async fn with_timeout<T>(
    what: &str,
    timeout: Duration,
    fut: impl std::future::Future<Output = Result<T, ApiError>> + Send,
) -> Result<T, ApiError> {
    match tokio::time::timeout(timeout, fut).await {
        Ok(result) => result,
        Err(_) => Err(ApiError::Provider(format!(
            "{} timed out after {}s",
            what,
            timeout.as_secs()
        ))),
    }
}
