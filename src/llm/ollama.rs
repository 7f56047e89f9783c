use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;

use super::provider::{with_timeout, LlmProvider};
use crate::core::config::ProviderConfig;
use crate::core::errors::ApiError;

#[derive(Clone)]
pub struct OllamaProvider {
    base_url: String,
    completion_model: String,
    embedding_model: String,
    client: Client,
}

impl OllamaProvider {
    pub fn new(config: &ProviderConfig) -> Self {
        Self {
            base_url: config.base_url.trim_end_matches('/').to_string(),
            completion_model: config.completion_model.clone(),
            embedding_model: config.embedding_model.clone(),
            client: Client::new(),
        }
    }

    async fn embed_modern(&self, inputs: &[String]) -> Result<Vec<Vec<f32>>, ApiError> {
        #[derive(Deserialize)]
        struct EmbedResponse {
            embeddings: Vec<Vec<f32>>,
        }

        let url = format!("{}/api/embed", self.base_url);
        let res = self
            .client
            .post(&url)
            .json(&json!({ "model": self.embedding_model, "input": inputs }))
            .send()
            .await
            .map_err(ApiError::provider)?;

        if !res.status().is_success() {
            let text = res.text().await.unwrap_or_default();
            return Err(ApiError::Provider(format!(
                "ollama embed error: {}",
                normalize_error_body(&text)
            )));
        }

        let payload: EmbedResponse = res.json().await.map_err(ApiError::provider)?;
        Ok(payload.embeddings)
    }

    // Older Ollama releases only expose /api/embeddings, one prompt per call.
    async fn embed_legacy(&self, inputs: &[String]) -> Result<Vec<Vec<f32>>, ApiError> {
        #[derive(Deserialize)]
        struct EmbeddingResponse {
            embedding: Vec<f32>,
        }

        let url = format!("{}/api/embeddings", self.base_url);
        let mut vectors = Vec::with_capacity(inputs.len());

        for input in inputs {
            let res = self
                .client
                .post(&url)
                .json(&json!({ "model": self.embedding_model, "prompt": input }))
                .send()
                .await
                .map_err(ApiError::provider)?;

            if !res.status().is_success() {
                let text = res.text().await.unwrap_or_default();
                return Err(ApiError::Provider(format!(
                    "ollama embeddings error: {}",
                    normalize_error_body(&text)
                )));
            }

            let payload: EmbeddingResponse = res.json().await.map_err(ApiError::provider)?;
            vectors.push(payload.embedding);
        }

        Ok(vectors)
    }
}

#[async_trait]
impl LlmProvider for OllamaProvider {
    fn name(&self) -> &str {
        "ollama"
    }

    async fn health_check(&self) -> Result<bool, ApiError> {
        let url = format!("{}/api/tags", self.base_url);
        match self.client.get(&url).send().await {
            Ok(resp) => Ok(resp.status().is_success()),
            Err(_) => Ok(false),
        }
    }

    async fn list_models(&self) -> Result<Vec<String>, ApiError> {
        #[derive(Deserialize)]
        struct TagsResponse {
            models: Vec<TagModel>,
        }

        #[derive(Deserialize)]
        struct TagModel {
            name: String,
        }

        let url = format!("{}/api/tags", self.base_url);
        let res = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(ApiError::provider)?;

        if !res.status().is_success() {
            return Err(ApiError::Provider(format!(
                "failed to list models: {}",
                res.status()
            )));
        }

        let payload: TagsResponse = res.json().await.map_err(ApiError::provider)?;
        Ok(payload.models.into_iter().map(|m| m.name).collect())
    }

    async fn complete(&self, prompt: &str, timeout: Duration) -> Result<String, ApiError> {
        #[derive(Deserialize)]
        struct GenerateResponse {
            response: String,
        }

        let url = format!("{}/api/generate", self.base_url);
        let body = json!({
            "model": self.completion_model,
            "prompt": prompt,
            "stream": false,
        });

        with_timeout("ollama generate", timeout, async {
            let res = self
                .client
                .post(&url)
                .json(&body)
                .send()
                .await
                .map_err(ApiError::provider)?;

            if !res.status().is_success() {
                let text = res.text().await.unwrap_or_default();
                return Err(ApiError::Provider(format!(
                    "ollama generate error: {}",
                    normalize_error_body(&text)
                )));
            }

            let payload: GenerateResponse = res.json().await.map_err(ApiError::provider)?;
            Ok(payload.response.trim().to_string())
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

        with_timeout("ollama embed", timeout, async {
            match self.embed_modern(inputs).await {
                Ok(vectors) => Ok(vectors),
                Err(_) => self.embed_legacy(inputs).await,
            }
        })
        .await
    }
}

fn normalize_error_body(body: &str) -> String {
    let trimmed = body.trim();
    if trimmed.is_empty() {
        return "<empty body>".to_string();
    }

    if let Ok(json) = serde_json::from_str::<serde_json::Value>(trimmed) {
        if let Some(err) = json.get("error").and_then(|v| v.as_str()) {
            return err.to_string();
        }
    }

    trimmed.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalizes_json_error_bodies() {
        assert_eq!(
            normalize_error_body(r#"{"error":"model not found"}"#),
            "model not found"
        );
        assert_eq!(normalize_error_body("  "), "<empty body>");
        assert_eq!(normalize_error_body("plain failure"), "plain failure");
    }
}
