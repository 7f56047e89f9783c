//! DocumentStore trait — abstract interface for the document corpus.
//!
//! The retrieval pipeline consumes this trait; the primary implementation
//! is `SqliteDocumentStore` in the `sqlite` module.

pub mod sqlite;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::core::errors::ApiError;

pub use sqlite::SqliteDocumentStore;

/// A stored document with metadata. Documents are immutable once written;
/// a revised page is ingested as a new document with a new id.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Document {
    /// Unique document identifier.
    pub id: String,
    /// Page or section title.
    pub title: String,
    /// The text content.
    pub content: String,
    /// Public URL the content was taken from.
    pub source_url: String,
    /// Which university this document belongs to.
    pub university_id: String,
    /// Embedding vector, if one has been computed.
    #[serde(default)]
    pub embedding: Option<Vec<f32>>,
    /// Optional extra metadata (JSON).
    #[serde(default)]
    pub metadata: Option<serde_json::Value>,
}

/// Result of a similarity search.
#[derive(Debug, Clone)]
pub struct ScoredDocument {
    pub document: Document,
    /// Cosine similarity against the query embedding (higher = better).
    pub score: f32,
}

/// Abstract trait for document storage backends.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Insert a document with its embedding.
    async fn insert(&self, document: Document) -> Result<(), ApiError>;

    /// Insert multiple documents in one transaction.
    async fn insert_batch(&self, documents: Vec<Document>) -> Result<(), ApiError>;

    /// Nearest-neighbor search against the query embedding.
    async fn search(
        &self,
        query_embedding: &[f32],
        limit: usize,
    ) -> Result<Vec<ScoredDocument>, ApiError>;

    /// Substring search over content and title; used by the keyword leg.
    async fn text_search(&self, terms: &[String], limit: usize)
        -> Result<Vec<Document>, ApiError>;

    /// Fetch a document by id.
    async fn get(&self, id: &str) -> Result<Option<Document>, ApiError>;

    /// Total number of stored documents.
    async fn count(&self) -> Result<usize, ApiError>;
}
