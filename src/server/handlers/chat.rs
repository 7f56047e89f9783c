use std::sync::Arc;

use axum::extract::State;
use axum::response::IntoResponse;
use axum::Json;
use serde::Deserialize;
use serde_json::json;

use crate::core::errors::ApiError;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    pub question: String,
    pub session_id: Option<String>,
}

pub async fn chat(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<ChatRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let session_id = payload
        .session_id
        .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());

    let outcome = state.chatbot.answer(&payload.question, &session_id).await?;

    Ok(Json(json!({
        "session_id": session_id,
        "answer": outcome.answer,
        "sources": outcome.sources,
        "confidence": outcome.confidence,
        "should_show": outcome.should_show,
        "needs_feedback": outcome.needs_feedback,
    })))
}
