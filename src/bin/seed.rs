//! Seed the document store from a JSON file.
//!
//! Usage: `seed <documents.json>` where the file holds an array of
//! `{title, content, source_url, university_id, metadata?}` objects.
//! Embeds every document through the configured provider (warming the
//! embedding cache) and inserts them in one batch.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context};
use serde::Deserialize;

use campus_answers::core::config::{AppConfig, AppPaths};
use campus_answers::embedding::{CachedEmbedder, EmbeddingCache};
use campus_answers::llm::build_provider;
use campus_answers::store::{Document, DocumentStore, SqliteDocumentStore};

#[derive(Debug, Deserialize)]
struct SeedDocument {
    title: String,
    content: String,
    source_url: String,
    university_id: String,
    #[serde(default)]
    metadata: Option<serde_json::Value>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt().with_target(false).init();

    let Some(path) = std::env::args().nth(1) else {
        bail!("usage: seed <documents.json>");
    };

    let contents = std::fs::read_to_string(&path)
        .with_context(|| format!("failed to read {}", path))?;
    let seeds: Vec<SeedDocument> =
        serde_json::from_str(&contents).context("failed to parse documents file")?;
    if seeds.is_empty() {
        bail!("no documents in {}", path);
    }

    let paths = AppPaths::new();
    let config = AppConfig::load(&paths).map_err(|e| anyhow::anyhow!("{}", e))?;

    let store = SqliteDocumentStore::new(&paths)
        .await
        .map_err(|e| anyhow::anyhow!("{}", e))?;
    let provider = build_provider(&config.provider).map_err(|e| anyhow::anyhow!("{}", e))?;
    let cache = Arc::new(EmbeddingCache::load(paths.embedding_cache_path.clone()));
    let embedder = CachedEmbedder::new(
        provider,
        cache.clone(),
        Duration::from_secs(config.provider.embed_timeout_secs),
    );

    let total = seeds.len();
    let mut documents = Vec::with_capacity(total);
    for (index, seed) in seeds.into_iter().enumerate() {
        let embedding = embedder
            .embed(&seed.content)
            .await
            .map_err(|e| anyhow::anyhow!("embedding document {} failed: {}", index, e))?;

        documents.push(Document {
            id: uuid::Uuid::new_v4().to_string(),
            title: seed.title,
            content: seed.content,
            source_url: seed.source_url,
            university_id: seed.university_id,
            embedding: Some(embedding),
            metadata: seed.metadata,
        });

        if (index + 1) % 50 == 0 {
            tracing::info!("Embedded {}/{} documents", index + 1, total);
        }
    }

    store
        .insert_batch(documents)
        .await
        .map_err(|e| anyhow::anyhow!("{}", e))?;
    cache.flush().await.map_err(|e| anyhow::anyhow!("{}", e))?;

    let count = store.count().await.map_err(|e| anyhow::anyhow!("{}", e))?;
    tracing::info!("Store now holds {} documents", count);
    Ok(())
}
