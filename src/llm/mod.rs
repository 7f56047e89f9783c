pub mod ollama;
pub mod openai;
pub mod provider;

use std::sync::Arc;

pub use ollama::OllamaProvider;
pub use openai::OpenAiProvider;
pub use provider::LlmProvider;

use crate::core::config::ProviderConfig;
use crate::core::errors::ApiError;

/// Build the configured provider.
pub fn build_provider(config: &ProviderConfig) -> Result<Arc<dyn LlmProvider>, ApiError> {
    match config.kind.as_str() {
        "ollama" => Ok(Arc::new(OllamaProvider::new(config))),
        "openai" => Ok(Arc::new(OpenAiProvider::new(config))),
        other => Err(ApiError::BadRequest(format!(
            "unknown provider kind '{}'",
            other
        ))),
    }
}
