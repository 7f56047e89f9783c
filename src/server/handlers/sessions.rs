use std::sync::Arc;

use axum::extract::{Path, State};
use axum::response::IntoResponse;
use axum::Json;
use serde_json::json;

use crate::core::errors::ApiError;
use crate::state::AppState;

pub async fn list_sessions(
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, ApiError> {
    let sessions = state.sessions.list().await;
    Ok(Json(json!({ "sessions": sessions })))
}

pub async fn get_session(
    State(state): State<Arc<AppState>>,
    Path(session_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let turns = state.sessions.history(&session_id).await;
    if turns.is_empty() {
        return Err(ApiError::NotFound("Session not found".to_string()));
    }
    Ok(Json(json!({ "session_id": session_id, "turns": turns })))
}

pub async fn delete_session(
    State(state): State<Arc<AppState>>,
    Path(session_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    if !state.sessions.delete(&session_id).await {
        return Err(ApiError::NotFound("Session not found".to_string()));
    }
    Ok(Json(json!({ "success": true })))
}
