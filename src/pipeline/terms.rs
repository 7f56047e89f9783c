//! Term extraction and sentence splitting shared across the pipeline.

use std::collections::HashSet;

/// Fixed English stopword list; question words are included so key terms
/// capture the subject of a question rather than its phrasing.
const STOPWORDS: &[&str] = &[
    "the", "and", "for", "are", "but", "not", "you", "all", "can", "had", "her", "was", "one",
    "our", "out", "has", "have", "him", "his", "how", "its", "may", "new", "now", "old", "see",
    "two", "way", "who", "did", "does", "get", "let", "say", "she", "too", "use", "what", "when",
    "where", "which", "while", "with", "would", "will", "this", "that", "these", "those", "there",
    "their", "them", "then", "than", "they", "about", "into", "over", "under", "also", "any",
    "some", "such", "only", "other", "more", "most", "much", "many", "each", "very", "from",
    "been", "being", "were", "your", "why", "whom", "whose",
];

/// Lowercased word tokens of length > 2 with stopwords removed, first
/// occurrence order preserved.
pub fn key_terms(text: &str) -> Vec<String> {
    let mut seen = HashSet::new();
    text.to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|token| token.len() > 2 && !STOPWORDS.contains(token))
        .filter(|token| seen.insert(token.to_string()))
        .map(|token| token.to_string())
        .collect()
}

/// Fraction of the question's key terms that occur in `content`.
/// Returns 0.0 when the question has no key terms.
pub fn term_overlap(content: &str, question: &str) -> f32 {
    let question_terms = key_terms(question);
    if question_terms.is_empty() {
        return 0.0;
    }

    let content_terms: HashSet<String> = key_terms(content).into_iter().collect();
    let matched = question_terms
        .iter()
        .filter(|term| content_terms.contains(*term))
        .count();

    matched as f32 / question_terms.len() as f32
}

/// Split text on sentence boundaries. Terminators stay attached to their
/// sentence; whitespace-only fragments are dropped.
pub fn split_sentences(text: &str) -> Vec<String> {
    let mut sentences = Vec::new();
    let mut current = String::new();

    for c in text.chars() {
        current.push(c);
        if matches!(c, '.' | '!' | '?') {
            let trimmed = current.trim();
            if !trimmed.is_empty() {
                sentences.push(trimmed.to_string());
            }
            current.clear();
        }
    }

    let trimmed = current.trim();
    if !trimmed.is_empty() {
        sentences.push(trimmed.to_string());
    }

    sentences
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_terms_drop_stopwords_and_short_tokens() {
        let terms = key_terms("What is the tuition cost at Northeastern?");
        assert_eq!(terms, vec!["tuition", "cost", "northeastern"]);
    }

    #[test]
    fn key_terms_dedupe_preserving_order() {
        let terms = key_terms("housing housing options and housing costs");
        assert_eq!(terms, vec!["housing", "options", "costs"]);
    }

    #[test]
    fn term_overlap_is_fractional() {
        let overlap = term_overlap(
            "Tuition for undergraduates is $60,000 per year.",
            "What is the tuition cost?",
        );
        assert!((overlap - 0.5).abs() < 1e-6);
    }

    #[test]
    fn term_overlap_empty_question_is_zero() {
        assert_eq!(term_overlap("some content", "is the a"), 0.0);
    }

    #[test]
    fn splits_on_sentence_terminators() {
        let sentences = split_sentences("First sentence. Second one! Third? Trailing words");
        assert_eq!(
            sentences,
            vec!["First sentence.", "Second one!", "Third?", "Trailing words"]
        );
    }
}
