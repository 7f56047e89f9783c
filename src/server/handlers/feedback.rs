use std::sync::Arc;

use axum::extract::State;
use axum::response::IntoResponse;
use axum::Json;
use serde_json::json;

use crate::core::errors::ApiError;
use crate::feedback::FeedbackRecord;
use crate::state::AppState;

pub async fn submit_feedback(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<FeedbackRecord>,
) -> Result<impl IntoResponse, ApiError> {
    if payload.question.trim().is_empty() {
        return Err(ApiError::BadRequest("question must not be empty".to_string()));
    }

    let id = state.feedback.record(&payload).await?;
    tracing::info!(
        "Feedback recorded for session {} (helpful: {})",
        payload.session_id,
        payload.helpful
    );
    Ok(Json(json!({ "id": id })))
}
