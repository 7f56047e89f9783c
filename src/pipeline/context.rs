//! Context assembly.
//!
//! Splits retrieved documents into sentence-level sections, scores each
//! section against the question's key terms, and concatenates the best
//! sections into the prompt context. A question with no relevant sections
//! produces an empty context; the generator refuses rather than fabricates.

use super::retriever::SearchResult;
use super::terms::{key_terms, split_sentences};
use crate::core::config::ContextConfig;

struct ScoredSection {
    title: String,
    text: String,
    score: f32,
}

pub struct ContextAssembler {
    config: ContextConfig,
}

impl ContextAssembler {
    pub fn new(config: ContextConfig) -> Self {
        Self { config }
    }

    /// Build the prompt context for `question` from retrieved documents.
    /// Returns an empty string when no section clears the relevance
    /// threshold.
    pub fn assemble(&self, results: &[SearchResult], question: &str) -> String {
        let question_terms = key_terms(question);
        if results.is_empty() || question_terms.is_empty() {
            return String::new();
        }

        let mut sections: Vec<ScoredSection> = Vec::new();
        for result in results {
            for text in self.split_sections(&result.content) {
                let score = section_score(&text, &question_terms);
                if score > self.config.relevance_threshold {
                    sections.push(ScoredSection {
                        title: result.title.clone(),
                        text,
                        score,
                    });
                }
            }
        }

        sections.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        sections.truncate(self.config.max_sections);

        let mut context = String::new();
        for section in &sections {
            context.push_str(&format!("[{}] {}\n\n", section.title, section.text));
        }
        context.trim_end().to_string()
    }

    /// Group sentences into sections capped at `max_section_chars`. A single
    /// sentence longer than the cap becomes its own oversized section rather
    /// than being split mid-sentence.
    fn split_sections(&self, content: &str) -> Vec<String> {
        let cap = self.config.max_section_chars;
        let mut sections = Vec::new();
        let mut current = String::new();

        for sentence in split_sentences(content) {
            if !current.is_empty() && current.len() + sentence.len() + 1 > cap {
                sections.push(std::mem::take(&mut current));
            }
            if !current.is_empty() {
                current.push(' ');
            }
            current.push_str(&sentence);
        }
        if !current.is_empty() {
            sections.push(current);
        }

        sections
    }
}

fn section_score(section: &str, question_terms: &[String]) -> f32 {
    let section_lower = section.to_lowercase();
    let matched = question_terms
        .iter()
        .filter(|term| section_lower.contains(term.as_str()))
        .count();
    matched as f32 / question_terms.len() as f32
}
