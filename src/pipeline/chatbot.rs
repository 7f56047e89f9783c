//! The question-answering pipeline: expand, retrieve, assemble, generate,
//! score, gate, and record the turn.

use std::sync::Arc;

use chrono::Utc;
use serde::Serialize;

use super::confidence::{gate, score};
use super::context::ContextAssembler;
use super::expansion::QueryExpander;
use super::generator::{AnswerGenerator, APOLOGY_ANSWER, NO_INFORMATION_ANSWER};
use super::retriever::{HybridRetriever, SearchResult};
use crate::core::errors::ApiError;
use crate::session::{ConversationTurn, SessionStore, SourceRef};

const PREVIEW_CHARS: usize = 200;
const MAX_SOURCES_SHOWN: usize = 3;

#[derive(Debug, Clone, Serialize)]
pub struct ChatOutcome {
    pub answer: String,
    pub sources: Vec<SourceRef>,
    pub confidence: f32,
    pub should_show: bool,
    pub needs_feedback: bool,
}

pub struct Chatbot {
    expander: QueryExpander,
    retriever: HybridRetriever,
    assembler: ContextAssembler,
    generator: AnswerGenerator,
    sessions: Arc<SessionStore>,
    top_k: usize,
}

impl Chatbot {
    pub fn new(
        expander: QueryExpander,
        retriever: HybridRetriever,
        assembler: ContextAssembler,
        generator: AnswerGenerator,
        sessions: Arc<SessionStore>,
        top_k: usize,
    ) -> Self {
        Self {
            expander,
            retriever,
            assembler,
            generator,
            sessions,
            top_k,
        }
    }

    /// Answer a question within a session. Degraded stages fall back per
    /// stage; only a store outage for the whole request is an error.
    pub async fn answer(&self, question: &str, session_id: &str) -> Result<ChatOutcome, ApiError> {
        let question = question.trim();
        if question.is_empty() {
            return Err(ApiError::BadRequest("question must not be empty".to_string()));
        }

        let history = self.sessions.history(session_id).await;

        let queries = self.expander.expand(question, &history).await;
        tracing::debug!("Retrieving with {} queries", queries.len());

        let results = self.retriever.retrieve(&queries, self.top_k).await?;
        if results.is_empty() {
            tracing::info!("No documents retrieved for '{}'", question);
            let outcome = ChatOutcome {
                answer: NO_INFORMATION_ANSWER.to_string(),
                sources: Vec::new(),
                confidence: 0.0,
                should_show: false,
                needs_feedback: true,
            };
            self.record_turn(session_id, question, &outcome).await;
            return Ok(outcome);
        }

        let context = self.assembler.assemble(&results, question);
        let answer = self.generator.generate(&context, question, &history).await;

        let outcome = if answer == APOLOGY_ANSWER {
            ChatOutcome {
                answer,
                sources: Vec::new(),
                confidence: 0.0,
                should_show: false,
                needs_feedback: true,
            }
        } else {
            let confidence = score(&results, &answer);
            let decision = gate(confidence, question, &answer);
            let sources = if decision.should_show {
                build_source_refs(&results)
            } else {
                Vec::new()
            };
            ChatOutcome {
                answer: decision.displayed_answer,
                sources,
                confidence,
                should_show: decision.should_show,
                needs_feedback: decision.needs_feedback,
            }
        };

        self.record_turn(session_id, question, &outcome).await;
        Ok(outcome)
    }

    async fn record_turn(&self, session_id: &str, question: &str, outcome: &ChatOutcome) {
        self.sessions
            .append(
                session_id,
                ConversationTurn {
                    question: question.to_string(),
                    answer: outcome.answer.clone(),
                    sources: outcome.sources.clone(),
                    timestamp: Utc::now(),
                },
            )
            .await;
    }
}

fn build_source_refs(results: &[SearchResult]) -> Vec<SourceRef> {
    results
        .iter()
        .take(MAX_SOURCES_SHOWN)
        .map(|result| SourceRef {
            title: result.title.clone(),
            url: result.source_url.clone(),
            similarity: result.similarity,
            content_preview: preview(&result.content),
        })
        .collect()
}

fn preview(content: &str) -> String {
    if content.chars().count() <= PREVIEW_CHARS {
        return content.to_string();
    }
    let truncated: String = content.chars().take(PREVIEW_CHARS).collect();
    format!("{}…", truncated.trim_end())
}
