use std::sync::Arc;

use axum::extract::State;
use axum::response::IntoResponse;
use axum::Json;
use serde_json::json;

use crate::core::errors::ApiError;
use crate::state::AppState;

pub async fn health() -> impl IntoResponse {
    Json(json!({ "status": "ok" }))
}

pub async fn get_status(
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, ApiError> {
    let document_count = state.store.count().await?;
    let provider_healthy = state.provider.health_check().await.unwrap_or(false);
    let cached_embeddings = state.cache.len().await;

    Ok(Json(json!({
        "documents": document_count,
        "provider": state.provider.name(),
        "provider_healthy": provider_healthy,
        "cached_embeddings": cached_embeddings,
    })))
}
