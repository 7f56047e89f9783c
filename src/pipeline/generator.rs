//! Answer generation.
//!
//! Formats the prompt (context + question + recent history), invokes the
//! model, and validates the result against generic-response heuristics.
//! A flagged answer is regenerated once with a stricter prompt; the second
//! attempt is accepted regardless. Model failures produce a fixed apology
//! rather than an error.

use std::sync::Arc;
use std::time::Duration;

use super::terms::{key_terms, term_overlap};
use crate::llm::LlmProvider;
use crate::session::ConversationTurn;

/// Returned when the model call itself fails.
pub const APOLOGY_ANSWER: &str =
    "I'm sorry, I ran into a problem while generating an answer. Please try again in a moment.";

/// Returned when retrieval produced nothing usable.
pub const NO_INFORMATION_ANSWER: &str =
    "I don't have enough information to answer that question.";

/// Boilerplate markers that flag an answer as generic filler.
const GENERIC_MARKERS: &[&str] = &[
    "the university offers",
    "based on the context",
    "based on the provided context",
    "as an ai",
    "i am an ai",
    "universities typically",
    "in general, universities",
    "please visit the official website",
];

const HISTORY_TURNS_IN_PROMPT: usize = 3;

pub struct AnswerGenerator {
    provider: Arc<dyn LlmProvider>,
    timeout: Duration,
}

impl AnswerGenerator {
    pub fn new(provider: Arc<dyn LlmProvider>, timeout: Duration) -> Self {
        Self { provider, timeout }
    }

    /// Generate an answer for `question` grounded in `context`.
    pub async fn generate(
        &self,
        context: &str,
        question: &str,
        history: &[ConversationTurn],
    ) -> String {
        if context.trim().is_empty() {
            return NO_INFORMATION_ANSWER.to_string();
        }

        let prompt = build_prompt(context, question, history, false);
        let first = match self.provider.complete(&prompt, self.timeout).await {
            Ok(answer) => answer,
            Err(err) => {
                tracing::error!("Answer generation failed: {}", err);
                return APOLOGY_ANSWER.to_string();
            }
        };

        if !is_generic_answer(&first, question) {
            return first;
        }

        tracing::debug!("Answer flagged as generic, regenerating once");
        let strict_prompt = build_prompt(context, question, history, true);
        match self.provider.complete(&strict_prompt, self.timeout).await {
            Ok(answer) => answer,
            Err(err) => {
                tracing::error!("Strict regeneration failed: {}", err);
                APOLOGY_ANSWER.to_string()
            }
        }
    }
}

fn build_prompt(
    context: &str,
    question: &str,
    history: &[ConversationTurn],
    strict: bool,
) -> String {
    let mut prompt = String::from(
        "You answer questions about a university using only the information below.\n\
         Answer the specific question asked, using exact details from the information \
         (names, numbers, dates, URLs). If the information is insufficient, say you \
         don't have enough information; do not guess.\n\n",
    );

    if strict {
        prompt.push_str(
            "Your previous answer was too generic. Do not use filler phrases. \
             State only specific facts found in the information, or decline.\n\n",
        );
    }

    let recent: Vec<&ConversationTurn> = history.iter().rev().take(HISTORY_TURNS_IN_PROMPT).collect();
    if !recent.is_empty() {
        prompt.push_str("Recent conversation:\n");
        for turn in recent.into_iter().rev() {
            prompt.push_str(&format!("Q: {}\nA: {}\n", turn.question, turn.answer));
        }
        prompt.push('\n');
    }

    prompt.push_str(&format!(
        "Information:\n{}\n\nQuestion: {}\nAnswer:",
        context, question
    ));
    prompt
}

/// An answer is generic when it leans on boilerplate phrasing or shares no
/// key terms with the question it claims to answer.
fn is_generic_answer(answer: &str, question: &str) -> bool {
    let answer_lower = answer.to_lowercase();
    if GENERIC_MARKERS
        .iter()
        .any(|marker| answer_lower.contains(marker))
    {
        return true;
    }

    !key_terms(question).is_empty() && term_overlap(answer, question) == 0.0
}
