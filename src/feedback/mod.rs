//! SQLite-backed feedback log.
//!
//! Stores the explicit user feedback the chat UI solicits for withheld or
//! borderline answers. Read back by offline review, not by the pipeline.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use sqlx::{Row, SqlitePool};

use crate::core::config::AppPaths;
use crate::core::errors::ApiError;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedbackRecord {
    pub session_id: String,
    pub question: String,
    pub answer: String,
    pub helpful: bool,
    pub comment: Option<String>,
    pub confidence: f32,
}

#[derive(Clone)]
pub struct FeedbackStore {
    pool: SqlitePool,
}

impl FeedbackStore {
    pub async fn new(paths: &AppPaths) -> Result<Self, ApiError> {
        Self::with_path(paths.feedback_db_path.clone()).await
    }

    pub async fn with_path(db_path: PathBuf) -> Result<Self, ApiError> {
        let options = SqliteConnectOptions::new()
            .filename(&db_path)
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal);

        let pool = SqlitePoolOptions::new()
            .max_connections(2)
            .connect_with(options)
            .await
            .map_err(ApiError::store)?;

        sqlx::query(
            "CREATE TABLE IF NOT EXISTS feedback (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                session_id TEXT NOT NULL,
                question TEXT NOT NULL,
                answer TEXT NOT NULL,
                helpful INTEGER NOT NULL,
                comment TEXT,
                confidence REAL NOT NULL,
                created_at TEXT NOT NULL DEFAULT (STRFTIME('%Y-%m-%dT%H:%M:%fZ', 'now'))
            )",
        )
        .execute(&pool)
        .await
        .map_err(ApiError::store)?;

        Ok(Self { pool })
    }

    pub async fn record(&self, feedback: &FeedbackRecord) -> Result<i64, ApiError> {
        let result = sqlx::query(
            "INSERT INTO feedback (session_id, question, answer, helpful, comment, confidence)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        )
        .bind(&feedback.session_id)
        .bind(&feedback.question)
        .bind(&feedback.answer)
        .bind(feedback.helpful as i64)
        .bind(feedback.comment.as_deref())
        .bind(feedback.confidence as f64)
        .execute(&self.pool)
        .await
        .map_err(ApiError::store)?;

        Ok(result.last_insert_rowid())
    }

    pub async fn count(&self) -> Result<usize, ApiError> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM feedback")
            .fetch_one(&self.pool)
            .await
            .map_err(ApiError::store)?;
        Ok(count as usize)
    }

    pub async fn recent(&self, limit: usize) -> Result<Vec<FeedbackRecord>, ApiError> {
        let rows = sqlx::query(
            "SELECT session_id, question, answer, helpful, comment, confidence
             FROM feedback ORDER BY id DESC LIMIT ?1",
        )
        .bind(limit.max(1) as i64)
        .fetch_all(&self.pool)
        .await
        .map_err(ApiError::store)?;

        Ok(rows
            .iter()
            .map(|row| FeedbackRecord {
                session_id: row.get("session_id"),
                question: row.get("question"),
                answer: row.get("answer"),
                helpful: row.get::<i64, _>("helpful") != 0,
                comment: row.get("comment"),
                confidence: row.get::<f64, _>("confidence") as f32,
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn test_store() -> FeedbackStore {
        let tmp = std::env::temp_dir().join(format!(
            "campus-answers-feedback-{}.db",
            uuid::Uuid::new_v4()
        ));
        FeedbackStore::with_path(tmp).await.unwrap()
    }

    #[tokio::test]
    async fn records_and_reads_back_feedback() {
        let store = test_store().await;

        store
            .record(&FeedbackRecord {
                session_id: "s1".to_string(),
                question: "What is tuition?".to_string(),
                answer: "60000 dollars".to_string(),
                helpful: true,
                comment: Some("exactly right".to_string()),
                confidence: 0.82,
            })
            .await
            .unwrap();

        assert_eq!(store.count().await.unwrap(), 1);
        let recent = store.recent(10).await.unwrap();
        assert_eq!(recent.len(), 1);
        assert!(recent[0].helpful);
        assert!((recent[0].confidence - 0.82).abs() < 1e-6);
    }
}
