//! Hybrid retrieval: a semantic leg (vector similarity) and a keyword leg
//! (term overlap) per expanded query, fanned out concurrently, then merged,
//! deduplicated by document id, and reranked against the original question.

use std::collections::hash_map::Entry;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use futures_util::future::join_all;
use serde::Serialize;

use super::terms::{key_terms, term_overlap};
use crate::core::config::RetrievalConfig;
use crate::core::errors::ApiError;
use crate::embedding::CachedEmbedder;
use crate::store::{Document, DocumentStore};

/// Blend between vector similarity and original-question term overlap when
/// reranking the merged candidate pool.
const RERANK_SIMILARITY_WEIGHT: f32 = 0.6;
const RERANK_OVERLAP_WEIGHT: f32 = 0.4;

/// Keyword-leg boosts.
const EXACT_SUBSTRING_BOOST: f32 = 0.3;
const TITLE_OVERLAP_BOOST: f32 = 0.2;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SearchType {
    Semantic,
    Keyword,
    Combined,
}

/// One retrieval candidate. Ephemeral, created per query, never persisted.
#[derive(Debug, Clone)]
pub struct SearchResult {
    pub document_id: String,
    pub title: String,
    pub source_url: String,
    pub content: String,
    /// Best per-leg score in [0, 1].
    pub similarity: f32,
    /// Position after the final rerank, 0-based.
    pub rank: usize,
    pub search_type: SearchType,
}

struct LegOutcome {
    results: Vec<SearchResult>,
    store_error: Option<ApiError>,
}

pub struct HybridRetriever {
    store: Arc<dyn DocumentStore>,
    embedder: CachedEmbedder,
    config: RetrievalConfig,
}

impl HybridRetriever {
    pub fn new(
        store: Arc<dyn DocumentStore>,
        embedder: CachedEmbedder,
        config: RetrievalConfig,
    ) -> Self {
        Self {
            store,
            embedder,
            config,
        }
    }

    /// Retrieve up to `k` results for the expanded query set. The first
    /// query must be the original question; reranking scores against it so
    /// expansion cannot drift the ranking away from user intent.
    ///
    /// Returns `Ok(vec![])` when every leg legitimately found nothing;
    /// propagates a store error only when the store failed for every query
    /// and nothing at all was retrieved.
    pub async fn retrieve(
        &self,
        queries: &[String],
        k: usize,
    ) -> Result<Vec<SearchResult>, ApiError> {
        let Some(original) = queries.first() else {
            return Ok(Vec::new());
        };
        let fetch_k = k.max(1) * self.config.overfetch_factor.max(1);

        let legs = join_all(queries.iter().map(|query| self.run_legs(query, fetch_k))).await;

        let mut merged: HashMap<String, SearchResult> = HashMap::new();
        let mut store_errors = 0;
        let mut last_store_error = None;
        for outcome in legs {
            if let Some(err) = outcome.store_error {
                store_errors += 1;
                last_store_error = Some(err);
            }
            for candidate in outcome.results {
                match merged.entry(candidate.document_id.clone()) {
                    Entry::Occupied(mut slot) => {
                        let existing = slot.get_mut();
                        if existing.search_type != candidate.search_type {
                            existing.search_type = SearchType::Combined;
                        }
                        // Dedup keeps the best-scoring sighting of an id.
                        if candidate.similarity > existing.similarity {
                            existing.similarity = candidate.similarity;
                            existing.content = candidate.content;
                        }
                    }
                    Entry::Vacant(slot) => {
                        slot.insert(candidate);
                    }
                }
            }
        }

        if merged.is_empty() {
            if store_errors == queries.len() {
                if let Some(err) = last_store_error {
                    return Err(err);
                }
            }
            return Ok(Vec::new());
        }

        let mut ranked: Vec<SearchResult> = merged.into_values().collect();
        ranked.sort_by(|a, b| {
            let score_a = rerank_score(a, original);
            let score_b = rerank_score(b, original);
            score_b
                .partial_cmp(&score_a)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        ranked.truncate(k.max(1));
        for (rank, result) in ranked.iter_mut().enumerate() {
            result.rank = rank;
        }

        Ok(ranked)
    }

    async fn run_legs(&self, query: &str, fetch_k: usize) -> LegOutcome {
        let mut results = Vec::new();
        let mut store_error = None;

        match self.semantic_leg(query, fetch_k).await {
            Ok(hits) => results.extend(hits),
            Err(err @ ApiError::Store(_)) => {
                tracing::warn!("Semantic search failed for '{}': {}", query, err);
                store_error = Some(err);
            }
            Err(err) => {
                // Embedding failures degrade this leg only.
                tracing::warn!("Skipping semantic leg for '{}': {}", query, err);
            }
        }

        if self.config.keyword_leg_enabled {
            match self.keyword_leg(query, fetch_k).await {
                Ok(hits) => results.extend(hits),
                Err(err) => {
                    tracing::warn!("Skipping keyword leg for '{}': {}", query, err);
                }
            }
        }

        LegOutcome {
            results,
            store_error,
        }
    }

    async fn semantic_leg(&self, query: &str, fetch_k: usize) -> Result<Vec<SearchResult>, ApiError> {
        let embedding = self.embedder.embed(query).await?;
        let hits = self.store.search(&embedding, fetch_k).await?;

        Ok(hits
            .into_iter()
            .map(|hit| SearchResult {
                document_id: hit.document.id,
                title: hit.document.title,
                source_url: hit.document.source_url,
                content: hit.document.content,
                similarity: hit.score.clamp(0.0, 1.0),
                rank: 0,
                search_type: SearchType::Semantic,
            })
            .collect())
    }

    async fn keyword_leg(&self, query: &str, fetch_k: usize) -> Result<Vec<SearchResult>, ApiError> {
        let query_terms = key_terms(query);
        if query_terms.is_empty() {
            return Ok(Vec::new());
        }

        let documents = self.store.text_search(&query_terms, fetch_k).await?;
        let query_lower = query.trim().to_lowercase();

        Ok(documents
            .into_iter()
            .map(|doc| {
                let score = keyword_score(&doc, &query_terms, &query_lower);
                SearchResult {
                    document_id: doc.id,
                    title: doc.title,
                    source_url: doc.source_url,
                    content: doc.content,
                    similarity: score,
                    rank: 0,
                    search_type: SearchType::Keyword,
                }
            })
            .filter(|result| result.similarity > 0.0)
            .collect())
    }
}

fn keyword_score(doc: &Document, query_terms: &[String], query_lower: &str) -> f32 {
    let content_terms: HashSet<String> = key_terms(&doc.content).into_iter().collect();
    let matched = query_terms
        .iter()
        .filter(|term| content_terms.contains(*term))
        .count();
    let mut score = matched as f32 / query_terms.len() as f32;

    if doc.content.to_lowercase().contains(query_lower) {
        score += EXACT_SUBSTRING_BOOST;
    }

    let title_terms: HashSet<String> = key_terms(&doc.title).into_iter().collect();
    if query_terms.iter().any(|term| title_terms.contains(term)) {
        score += TITLE_OVERLAP_BOOST;
    }

    score.clamp(0.0, 1.0)
}

fn rerank_score(result: &SearchResult, original_question: &str) -> f32 {
    RERANK_SIMILARITY_WEIGHT * result.similarity
        + RERANK_OVERLAP_WEIGHT * term_overlap(&result.content, original_question)
}
