use std::sync::Arc;
use std::time::Duration;

use crate::core::config::{AppConfig, AppPaths};
use crate::core::errors::ApiError;
use crate::embedding::{CachedEmbedder, EmbeddingCache};
use crate::feedback::FeedbackStore;
use crate::llm::{build_provider, LlmProvider};
use crate::pipeline::{
    AnswerGenerator, Chatbot, ContextAssembler, HybridRetriever, QueryExpander,
};
use crate::session::SessionStore;
use crate::store::{DocumentStore, SqliteDocumentStore};

pub struct AppState {
    pub paths: Arc<AppPaths>,
    pub config: AppConfig,
    pub store: Arc<dyn DocumentStore>,
    pub provider: Arc<dyn LlmProvider>,
    pub cache: Arc<EmbeddingCache>,
    pub sessions: Arc<SessionStore>,
    pub feedback: FeedbackStore,
    pub chatbot: Chatbot,
}

impl AppState {
    pub async fn initialize() -> Result<Arc<Self>, ApiError> {
        let paths = Arc::new(AppPaths::new());
        let config = AppConfig::load(&paths)?;

        let store: Arc<dyn DocumentStore> = Arc::new(SqliteDocumentStore::new(&paths).await?);
        let provider = build_provider(&config.provider)?;
        let cache = Arc::new(EmbeddingCache::load(paths.embedding_cache_path.clone()));
        let sessions = Arc::new(SessionStore::new(
            config.session.max_turns,
            config.session.idle_ttl_secs,
        ));
        let feedback = FeedbackStore::new(&paths).await?;

        let chatbot = build_chatbot(
            &config,
            store.clone(),
            provider.clone(),
            cache.clone(),
            sessions.clone(),
        );

        Ok(Arc::new(Self {
            paths,
            config,
            store,
            provider,
            cache,
            sessions,
            feedback,
            chatbot,
        }))
    }
}

pub fn build_chatbot(
    config: &AppConfig,
    store: Arc<dyn DocumentStore>,
    provider: Arc<dyn LlmProvider>,
    cache: Arc<EmbeddingCache>,
    sessions: Arc<SessionStore>,
) -> Chatbot {
    let completion_timeout = Duration::from_secs(config.provider.completion_timeout_secs);
    let embed_timeout = Duration::from_secs(config.provider.embed_timeout_secs);

    let embedder = CachedEmbedder::new(provider.clone(), cache, embed_timeout);
    let expander = QueryExpander::new(
        provider.clone(),
        config.expansion.clone(),
        completion_timeout,
    );
    let retriever = HybridRetriever::new(store, embedder, config.retrieval.clone());
    let assembler = ContextAssembler::new(config.context.clone());
    let generator = AnswerGenerator::new(provider, completion_timeout);

    Chatbot::new(
        expander,
        retriever,
        assembler,
        generator,
        sessions,
        config.retrieval.top_k,
    )
}
