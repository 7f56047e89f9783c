//! End-to-end pipeline tests with a scripted model provider and a real
//! SQLite document store.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Mutex;

use campus_answers::core::config::AppConfig;
use campus_answers::core::errors::ApiError;
use campus_answers::embedding::EmbeddingCache;
use campus_answers::llm::LlmProvider;
use campus_answers::pipeline::{Chatbot, QueryExpander};
use campus_answers::session::SessionStore;
use campus_answers::state::build_chatbot;
use campus_answers::store::{Document, DocumentStore, SqliteDocumentStore};

/// Provider with a queue of scripted completions and a fixed embedding for
/// every input, so vector similarity between query and documents is 1.0.
struct ScriptedProvider {
    completions: Mutex<Vec<Result<String, String>>>,
}

impl ScriptedProvider {
    fn new(completions: Vec<Result<String, String>>) -> Arc<Self> {
        Arc::new(Self {
            completions: Mutex::new(completions),
        })
    }

    /// A provider whose every completion fails; embeddings still work.
    fn failing() -> Arc<Self> {
        Self::new(Vec::new())
    }
}

#[async_trait]
impl LlmProvider for ScriptedProvider {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn health_check(&self) -> Result<bool, ApiError> {
        Ok(true)
    }

    async fn list_models(&self) -> Result<Vec<String>, ApiError> {
        Ok(vec![])
    }

    async fn complete(&self, _prompt: &str, _timeout: Duration) -> Result<String, ApiError> {
        let mut queue = self.completions.lock().await;
        if queue.is_empty() {
            return Err(ApiError::Provider("no scripted completion".to_string()));
        }
        queue.remove(0).map_err(ApiError::Provider)
    }

    async fn embed(
        &self,
        inputs: &[String],
        _timeout: Duration,
    ) -> Result<Vec<Vec<f32>>, ApiError> {
        Ok(inputs.iter().map(|_| vec![1.0, 0.0, 0.0]).collect())
    }
}

/// The TempDir must stay alive for the duration of the test; dropping it
/// deletes the database out from under the pool.
async fn empty_store() -> (Arc<SqliteDocumentStore>, tempfile::TempDir) {
    let dir = tempfile::tempdir().unwrap();
    let store = SqliteDocumentStore::with_path(dir.path().join("documents.db"))
        .await
        .unwrap();
    (Arc::new(store), dir)
}

fn campus_doc(id: &str, title: &str, content: &str) -> Document {
    Document {
        id: id.to_string(),
        title: title.to_string(),
        content: content.to_string(),
        source_url: format!("https://northeastern.edu/{}", id),
        university_id: "northeastern".to_string(),
        embedding: Some(vec![1.0, 0.0, 0.0]),
        metadata: None,
    }
}

fn pipeline(
    store: Arc<SqliteDocumentStore>,
    provider: Arc<ScriptedProvider>,
) -> (Chatbot, Arc<SessionStore>) {
    let config = AppConfig::default();
    let cache = Arc::new(EmbeddingCache::load(
        std::env::temp_dir().join(format!("pipeline-cache-{}.json", uuid::Uuid::new_v4())),
    ));
    let sessions = Arc::new(SessionStore::new(
        config.session.max_turns,
        config.session.idle_ttl_secs,
    ));
    let chatbot = build_chatbot(&config, store, provider, cache, sessions.clone());
    (chatbot, sessions)
}

#[tokio::test]
async fn zero_documents_refuses_with_zero_confidence() {
    let (store, _dir) = empty_store().await;
    let provider = ScriptedProvider::new(vec![Ok(
        "how much is tuition\nyearly tuition fees\ncost of attendance".to_string(),
    )]);
    let (chatbot, _) = pipeline(store, provider);

    let outcome = chatbot
        .answer("What is the tuition cost?", "session-1")
        .await
        .unwrap();

    assert!(!outcome.should_show);
    assert_eq!(outcome.confidence, 0.0);
    assert!(outcome.answer.contains("don't have enough information"));
    assert!(outcome.sources.is_empty());
    assert!(outcome.needs_feedback);
}

#[tokio::test]
async fn high_similarity_corpus_answers_open_ended_question() {
    let (store, _dir) = empty_store().await;
    store
        .insert_batch(vec![
            campus_doc(
                "about",
                "About Northeastern",
                "Northeastern University is a private research university in Boston.",
            ),
            campus_doc(
                "academics",
                "Academics",
                "Northeastern University offers over 90 undergraduate majors across nine colleges.",
            ),
            campus_doc(
                "coop",
                "Co-op Program",
                "The co-op program at Northeastern University places students in industry.",
            ),
            campus_doc(
                "campus",
                "Campus",
                "The Northeastern University campus sits in the Fenway neighborhood of Boston.",
            ),
            campus_doc(
                "research",
                "Research",
                "Northeastern University runs research institutes focused on security and health.",
            ),
        ])
        .await
        .unwrap();

    let provider = ScriptedProvider::new(vec![
        Ok("tell me about northeastern\nnortheastern university overview\nnortheastern profile"
            .to_string()),
        Ok("Northeastern University is a private research university in Boston known for its co-op program."
            .to_string()),
    ]);
    let (chatbot, sessions) = pipeline(store, provider);

    let outcome = chatbot
        .answer("What is Northeastern University?", "session-1")
        .await
        .unwrap();

    assert!(outcome.should_show, "confidence was {}", outcome.confidence);
    assert!(outcome.confidence >= 0.45);
    assert!(!outcome.sources.is_empty());
    assert!(outcome.answer.contains("Northeastern"));

    // The turn is recorded in the session history.
    let history = sessions.history("session-1").await;
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].question, "What is Northeastern University?");
}

#[tokio::test]
async fn generation_failure_returns_apology_with_zero_confidence() {
    let (store, _dir) = empty_store().await;
    store
        .insert(campus_doc(
            "tuition",
            "Tuition",
            "Tuition cost at Northeastern University is 60000 dollars per year.",
        ))
        .await
        .unwrap();

    // No scripted completions: expansion and generation both fail, so the
    // pipeline degrades to single-query retrieval and then the apology.
    let provider = ScriptedProvider::failing();
    let (chatbot, _) = pipeline(store, provider);

    let outcome = chatbot
        .answer("What is the tuition cost?", "session-1")
        .await
        .unwrap();

    assert!(!outcome.should_show);
    assert_eq!(outcome.confidence, 0.0);
    assert!(outcome.answer.contains("sorry"));
}

#[tokio::test]
async fn expansion_fallback_returns_only_the_original_question() {
    let provider = ScriptedProvider::failing();
    let expander = QueryExpander::new(
        provider,
        campus_answers::core::config::ExpansionConfig::default(),
        Duration::from_secs(5),
    );

    let queries = expander.expand("What is the tuition cost?", &[]).await;
    assert_eq!(queries, vec!["What is the tuition cost?".to_string()]);
}

#[tokio::test]
async fn empty_question_is_rejected() {
    let (store, _dir) = empty_store().await;
    let provider = ScriptedProvider::new(vec![]);
    let (chatbot, _) = pipeline(store, provider);

    let result = chatbot.answer("   ", "session-1").await;
    assert!(matches!(result, Err(ApiError::BadRequest(_))));
}
