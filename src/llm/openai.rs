use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;

use super::provider::{with_timeout, LlmProvider};
use crate::core::config::ProviderConfig;
use crate::core::errors::ApiError;

/// OpenAI-compatible chat/embeddings client. Works against the hosted API
/// and against local servers speaking the same protocol.
#[derive(Clone)]
pub struct OpenAiProvider {
    base_url: String,
    api_key: Option<String>,
    completion_model: String,
    embedding_model: String,
    client: Client,
}

impl OpenAiProvider {
    pub fn new(config: &ProviderConfig) -> Self {
        Self {
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
            completion_model: config.completion_model.clone(),
            embedding_model: config.embedding_model.clone(),
            client: Client::new(),
        }
    }

    fn request(&self, method: reqwest::Method, url: &str) -> reqwest::RequestBuilder {
        let mut builder = self.client.request(method, url);
        if let Some(key) = &self.api_key {
            builder = builder.bearer_auth(key);
        }
        builder
    }
}

#[derive(Deserialize)]
struct ModelsResponse {
    data: Vec<ModelInfo>,
}

#[derive(Deserialize)]
struct ModelInfo {
    id: String,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Deserialize)]
struct ChatChoiceMessage {
    content: String,
}

#[derive(Deserialize)]
struct EmbeddingsResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Deserialize)]
struct EmbeddingData {
    embedding: Vec<f32>,
}

#[async_trait]
impl LlmProvider for OpenAiProvider {
    fn name(&self) -> &str {
        "openai"
    }

    async fn health_check(&self) -> Result<bool, ApiError> {
        let url = format!("{}/v1/models", self.base_url);
        match self.request(reqwest::Method::GET, &url).send().await {
            Ok(resp) => Ok(resp.status().is_success()),
            Err(_) => Ok(false),
        }
    }

    async fn list_models(&self) -> Result<Vec<String>, ApiError> {
        let url = format!("{}/v1/models", self.base_url);
        let res = self
            .request(reqwest::Method::GET, &url)
            .send()
            .await
            .map_err(ApiError::provider)?;

        if !res.status().is_success() {
            return Err(ApiError::Provider(format!(
                "failed to list models: {}",
                res.status()
            )));
        }

        let payload: ModelsResponse = res.json().await.map_err(ApiError::provider)?;
        Ok(payload.data.into_iter().map(|m| m.id).collect())
    }

    async fn complete(&self, prompt: &str, timeout: Duration) -> Result<String, ApiError> {
        let url = format!("{}/v1/chat/completions", self.base_url);
        let body = json!({
            "model": self.completion_model,
            "messages": [{ "role": "user", "content": prompt }],
            "stream": false,
        });

        with_timeout("openai chat", timeout, async {
            let res = self
                .request(reqwest::Method::POST, &url)
                .json(&body)
                .send()
                .await
                .map_err(ApiError::provider)?;

            if !res.status().is_success() {
                let text = res.text().await.unwrap_or_default();
                return Err(ApiError::Provider(format!("openai chat error: {}", text)));
            }

            let payload: ChatResponse = res.json().await.map_err(ApiError::provider)?;
            let content = payload
                .choices
                .into_iter()
                .next()
                .map(|c| c.message.content)
                .unwrap_or_default();
            Ok(content.trim().to_string())
        })
        .await
    }

    async fn embed(
        &self,
        inputs: &[String],
        timeout: Duration,
    ) -> Result<Vec<Vec<f32>>, ApiError> {
        if inputs.is_empty() {
            return Ok(Vec::new());
        }

        let url = format!("{}/v1/embeddings", self.base_url);
        let body = json!({
            "model": self.embedding_model,
            "input": inputs,
        });

        with_timeout("openai embed", timeout, async {
            let res = self
                .request(reqwest::Method::POST, &url)
                .json(&body)
                .send()
                .await
                .map_err(ApiError::provider)?;

            if !res.status().is_success() {
                let text = res.text().await.unwrap_or_default();
                return Err(ApiError::Provider(format!("openai embed error: {}", text)));
            }

            let payload: EmbeddingsResponse = res.json().await.map_err(ApiError::provider)?;
            Ok(payload.data.into_iter().map(|d| d.embedding).collect())
        })
        .await
    }
}
