//! SQLite-backed document store.
//!
//! In-process store using SQLite for document rows and brute-force cosine
//! similarity for vector search. Suitable for corpora in the tens of
//! thousands of documents.

use std::path::PathBuf;

use async_trait::async_trait;
use serde_json::Value;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use sqlx::{Row, SqlitePool};

use super::{Document, DocumentStore, ScoredDocument};
use crate::core::config::AppPaths;
use crate::core::errors::ApiError;

pub struct SqliteDocumentStore {
    pool: SqlitePool,
    #[allow(dead_code)]
    db_path: PathBuf,
}

impl SqliteDocumentStore {
    pub async fn new(paths: &AppPaths) -> Result<Self, ApiError> {
        Self::with_path(paths.db_path.clone()).await
    }

    pub async fn with_path(db_path: PathBuf) -> Result<Self, ApiError> {
        let options = SqliteConnectOptions::new()
            .filename(&db_path)
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal)
            .foreign_keys(true);

        let pool = SqlitePoolOptions::new()
            .min_connections(1)
            .max_connections(4)
            .connect_with(options)
            .await
            .map_err(ApiError::store)?;

        let store = Self { pool, db_path };
        store.init_schema().await?;
        Ok(store)
    }

    async fn init_schema(&self) -> Result<(), ApiError> {
        sqlx::query(
            "CREATE TABLE IF NOT EXISTS documents (
                id TEXT PRIMARY KEY,
                title TEXT NOT NULL DEFAULT '',
                content TEXT NOT NULL,
                source_url TEXT NOT NULL DEFAULT '',
                university_id TEXT NOT NULL DEFAULT '',
                metadata TEXT DEFAULT '{}',
                embedding BLOB,
                created_at TEXT NOT NULL DEFAULT (STRFTIME('%Y-%m-%dT%H:%M:%fZ', 'now'))
            )",
        )
        .execute(&self.pool)
        .await
        .map_err(ApiError::store)?;

        sqlx::query("CREATE INDEX IF NOT EXISTS idx_documents_university ON documents(university_id)")
            .execute(&self.pool)
            .await
            .map_err(ApiError::store)?;

        Ok(())
    }

    fn serialize_embedding(embedding: &[f32]) -> Vec<u8> {
        embedding.iter().flat_map(|f| f.to_le_bytes()).collect()
    }

    fn deserialize_embedding(bytes: &[u8]) -> Vec<f32> {
        bytes
            .chunks_exact(4)
            .map(|chunk| f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
            .collect()
    }

    fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
        if a.len() != b.len() || a.is_empty() {
            return 0.0;
        }

        let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
        let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
        let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
        let denom = norm_a * norm_b;

        if denom <= f32::EPSILON {
            0.0
        } else {
            dot / denom
        }
    }

    fn row_to_document(row: &sqlx::sqlite::SqliteRow) -> Document {
        let metadata_str: String = row.get("metadata");
        let metadata = serde_json::from_str::<Value>(&metadata_str).ok();

        Document {
            id: row.get("id"),
            title: row.get("title"),
            content: row.get("content"),
            source_url: row.get("source_url"),
            university_id: row.get("university_id"),
            embedding: None,
            metadata,
        }
    }

    async fn insert_in(
        document: &Document,
        executor: &mut sqlx::SqliteConnection,
    ) -> Result<(), ApiError> {
        let blob = document
            .embedding
            .as_deref()
            .map(Self::serialize_embedding)
            .unwrap_or_default();
        let metadata_str = document
            .metadata
            .as_ref()
            .map(|m| serde_json::to_string(m).unwrap_or_default())
            .unwrap_or_else(|| "{}".to_string());

        sqlx::query(
            "INSERT OR REPLACE INTO documents (id, title, content, source_url, university_id, metadata, embedding)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        )
        .bind(&document.id)
        .bind(&document.title)
        .bind(&document.content)
        .bind(&document.source_url)
        .bind(&document.university_id)
        .bind(&metadata_str)
        .bind(&blob)
        .execute(executor)
        .await
        .map_err(ApiError::store)?;

        Ok(())
    }
}

#[async_trait]
impl DocumentStore for SqliteDocumentStore {
    async fn insert(&self, document: Document) -> Result<(), ApiError> {
        let mut conn = self.pool.acquire().await.map_err(ApiError::store)?;
        Self::insert_in(&document, &mut *conn).await?;
        Ok(())
    }

    async fn insert_batch(&self, documents: Vec<Document>) -> Result<(), ApiError> {
        if documents.is_empty() {
            return Ok(());
        }

        let mut tx = self.pool.begin().await.map_err(ApiError::store)?;
        for document in &documents {
            Self::insert_in(document, &mut *tx).await?;
        }
        tx.commit().await.map_err(ApiError::store)?;
        Ok(())
    }

    async fn search(
        &self,
        query_embedding: &[f32],
        limit: usize,
    ) -> Result<Vec<ScoredDocument>, ApiError> {
        let rows = sqlx::query(
            "SELECT id, title, content, source_url, university_id, metadata, embedding
             FROM documents",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(ApiError::store)?;

        let mut scored: Vec<ScoredDocument> = rows
            .iter()
            .filter_map(|row| {
                let embedding_bytes: Vec<u8> = row.try_get("embedding").unwrap_or_default();
                if embedding_bytes.is_empty() {
                    return None;
                }
                let stored = Self::deserialize_embedding(&embedding_bytes);
                let score = Self::cosine_similarity(query_embedding, &stored);

                Some(ScoredDocument {
                    document: Self::row_to_document(row),
                    score,
                })
            })
            .collect();

        scored.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        scored.truncate(limit.max(1));

        Ok(scored)
    }

    async fn text_search(
        &self,
        terms: &[String],
        limit: usize,
    ) -> Result<Vec<Document>, ApiError> {
        let patterns: Vec<String> = terms
            .iter()
            .map(|t| t.trim())
            .filter(|t| !t.is_empty())
            .map(|t| format!("%{}%", t))
            .collect();
        if patterns.is_empty() {
            return Ok(Vec::new());
        }

        let mut sql = String::from(
            "SELECT id, title, content, source_url, university_id, metadata
             FROM documents WHERE ",
        );
        let clauses: Vec<&str> = patterns
            .iter()
            .map(|_| "(content LIKE ? OR title LIKE ?)")
            .collect();
        sql.push_str(&clauses.join(" OR "));
        sql.push_str(" LIMIT ?");

        let mut query = sqlx::query(&sql);
        for pattern in &patterns {
            query = query.bind(pattern).bind(pattern);
        }
        query = query.bind(limit.max(1) as i64);

        let rows = query.fetch_all(&self.pool).await.map_err(ApiError::store)?;
        Ok(rows.iter().map(Self::row_to_document).collect())
    }

    async fn get(&self, id: &str) -> Result<Option<Document>, ApiError> {
        let row = sqlx::query(
            "SELECT id, title, content, source_url, university_id, metadata
             FROM documents
             WHERE id = ?1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(ApiError::store)?;

        Ok(row.as_ref().map(Self::row_to_document))
    }

    async fn count(&self) -> Result<usize, ApiError> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM documents")
            .fetch_one(&self.pool)
            .await
            .map_err(ApiError::store)?;

        Ok(count as usize)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn test_store() -> SqliteDocumentStore {
        let tmp = std::env::temp_dir().join(format!(
            "campus-answers-test-{}.db",
            uuid::Uuid::new_v4()
        ));
        SqliteDocumentStore::with_path(tmp).await.unwrap()
    }

    fn make_document(id: &str, title: &str, content: &str, embedding: Vec<f32>) -> Document {
        Document {
            id: id.to_string(),
            title: title.to_string(),
            content: content.to_string(),
            source_url: format!("https://example.edu/{}", id),
            university_id: "northeastern".to_string(),
            embedding: Some(embedding),
            metadata: Some(serde_json::json!({ "section": "admissions" })),
        }
    }

    #[tokio::test]
    async fn insert_and_search() {
        let store = test_store().await;

        let doc = make_document("d1", "Tuition", "Tuition costs 60000 per year", vec![1.0, 0.0, 0.0]);
        store.insert(doc).await.unwrap();
        assert_eq!(store.count().await.unwrap(), 1);

        let results = store.search(&[1.0, 0.0, 0.0], 10).await.unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].document.id, "d1");
        assert!(results[0].score > 0.99);
    }

    #[tokio::test]
    async fn search_orders_by_similarity() {
        let store = test_store().await;

        store
            .insert_batch(vec![
                make_document("d1", "Housing", "Dorm information", vec![0.0, 1.0]),
                make_document("d2", "Tuition", "Tuition information", vec![1.0, 0.0]),
                make_document("d3", "Aid", "Financial aid", vec![0.7, 0.7]),
            ])
            .await
            .unwrap();

        let results = store.search(&[1.0, 0.0], 2).await.unwrap();
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].document.id, "d2");
        assert_eq!(results[1].document.id, "d3");
    }

    #[tokio::test]
    async fn text_search_matches_content_and_title() {
        let store = test_store().await;

        store
            .insert_batch(vec![
                make_document("d1", "Tuition and Fees", "Costs for 2025", vec![1.0]),
                make_document("d2", "Campus Map", "Buildings and tuition office", vec![1.0]),
                make_document("d3", "Athletics", "Sports teams", vec![1.0]),
            ])
            .await
            .unwrap();

        let results = store
            .text_search(&["tuition".to_string()], 10)
            .await
            .unwrap();
        let mut ids: Vec<String> = results.into_iter().map(|d| d.id).collect();
        ids.sort();
        assert_eq!(ids, vec!["d1", "d2"]);
    }

    #[tokio::test]
    async fn get_returns_stored_document() {
        let store = test_store().await;

        store
            .insert(make_document("d1", "Deadlines", "Apply by January 1", vec![1.0]))
            .await
            .unwrap();

        let doc = store.get("d1").await.unwrap().unwrap();
        assert_eq!(doc.title, "Deadlines");
        assert!(store.get("missing").await.unwrap().is_none());
    }
}
