//! LLM-powered query expansion: widens retrieval recall by rephrasing the
//! user's question before search.
//!
//! Short questions like "tuition cost" often miss documents that use
//! different phrasing. The expander asks the model for alternative
//! phrasings and retrieval runs every variant. Expansion is best-effort:
//! any model failure degrades to searching the original question alone.

use std::sync::Arc;
use std::time::Duration;

use regex::Regex;

use crate::core::config::ExpansionConfig;
use crate::llm::LlmProvider;
use crate::session::ConversationTurn;

/// Upper bound on queries handed to retrieval, original included.
const MAX_QUERIES: usize = 5;

pub struct QueryExpander {
    provider: Arc<dyn LlmProvider>,
    config: ExpansionConfig,
    timeout: Duration,
    list_prefix: Regex,
}

impl QueryExpander {
    pub fn new(provider: Arc<dyn LlmProvider>, config: ExpansionConfig, timeout: Duration) -> Self {
        Self {
            provider,
            config,
            timeout,
            list_prefix: Regex::new(r"^\s*(?:\d+[.)]|[-*•])\s*").expect("static regex"),
        }
    }

    /// Expand a question into 1..=5 search queries. The first entry is
    /// always the original question.
    pub async fn expand(&self, question: &str, history: &[ConversationTurn]) -> Vec<String> {
        if self.config.alternatives == 0 {
            return vec![question.to_string()];
        }

        let prompt = self.build_prompt(question, history);
        let raw = match self.provider.complete(&prompt, self.timeout).await {
            Ok(text) => text,
            Err(err) => {
                tracing::warn!("Query expansion failed, using original question: {}", err);
                return vec![question.to_string()];
            }
        };

        let mut queries = vec![question.to_string()];
        queries.extend(self.parse_alternatives(&raw, question));

        // Pad with copies of the original so downstream weighting sees a
        // consistent query count even when the model under-delivers.
        while queries.len() < self.config.alternatives + 1 {
            queries.push(question.to_string());
        }
        queries.truncate(MAX_QUERIES);
        queries
    }

    fn build_prompt(&self, question: &str, history: &[ConversationTurn]) -> String {
        let mut prompt = String::new();

        let recent: Vec<&ConversationTurn> = history
            .iter()
            .rev()
            .take(self.config.history_turns)
            .collect();
        if !recent.is_empty() {
            prompt.push_str("Recent conversation:\n");
            for turn in recent.into_iter().rev() {
                prompt.push_str(&format!("Q: {}\nA: {}\n", turn.question, turn.answer));
            }
            prompt.push('\n');
        }

        prompt.push_str(&format!(
            "Rewrite the following question {} different ways to improve document search recall. \
             Keep the same meaning. Output one rephrasing per line with no numbering or commentary.\n\
             Question: {}\n",
            self.config.alternatives, question
        ));
        prompt
    }

    fn parse_alternatives(&self, raw: &str, original: &str) -> Vec<String> {
        let original_lower = original.trim().to_lowercase();
        raw.lines()
            .map(|line| self.list_prefix.replace(line, "").trim().to_string())
            .filter(|line| !line.is_empty())
            .filter(|line| line.to_lowercase() != original_lower)
            .take(self.config.alternatives)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;

    use super::*;
    use crate::core::errors::ApiError;

    struct ScriptedProvider {
        response: Result<String, ()>,
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
            self.response
                .clone()
                .map_err(|_| ApiError::Provider("model offline".to_string()))
        }

        async fn embed(
            &self,
            _inputs: &[String],
            _timeout: Duration,
        ) -> Result<Vec<Vec<f32>>, ApiError> {
            Ok(vec![])
        }
    }

    fn expander(response: Result<String, ()>) -> QueryExpander {
        QueryExpander::new(
            Arc::new(ScriptedProvider { response }),
            ExpansionConfig::default(),
            Duration::from_secs(5),
        )
    }

    #[tokio::test]
    async fn strips_numbering_and_keeps_original_first() {
        let expander = expander(Ok(
            "1. How much does tuition cost?\n2) Yearly tuition fees\n- Cost of attendance"
                .to_string(),
        ));

        let queries = expander.expand("What is the tuition?", &[]).await;
        assert_eq!(queries[0], "What is the tuition?");
        assert_eq!(queries[1], "How much does tuition cost?");
        assert_eq!(queries[2], "Yearly tuition fees");
        assert_eq!(queries[3], "Cost of attendance");
        assert_eq!(queries.len(), 4);
    }

    #[tokio::test]
    async fn provider_failure_degrades_to_original() {
        let expander = expander(Err(()));
        let queries = expander.expand("What is the tuition?", &[]).await;
        assert_eq!(queries, vec!["What is the tuition?".to_string()]);
    }

    #[tokio::test]
    async fn duplicate_of_original_is_discarded_and_padded() {
        let expander = expander(Ok("What is the tuition?\nTuition amounts".to_string()));
        let queries = expander.expand("What is the tuition?", &[]).await;

        assert_eq!(queries[0], "What is the tuition?");
        assert_eq!(queries[1], "Tuition amounts");
        // Padded back up to alternatives + 1 with the original.
        assert_eq!(queries.len(), 4);
        assert_eq!(queries[2], "What is the tuition?");
    }

    #[tokio::test]
    async fn never_exceeds_five_queries() {
        let expander = expander(Ok("a1\na2\na3\na4\na5\na6".to_string()));
        let queries = expander.expand("original question", &[]).await;
        assert!(queries.len() <= 5);
        assert_eq!(queries[0], "original question");
    }
}
