//! Confidence scoring and the answer gate.
//!
//! The score blends retrieval quality (how well the corpus matched) with
//! answer-shape signals (length, hedging). The gate applies a
//! question-type-sensitive threshold: factual questions about costs and
//! deadlines demand more evidence than open-ended ones.

use super::retriever::SearchResult;

// Factor weights; similarity-dominant, sums to 1.0.
const WEIGHT_TOP_SIMILARITY: f32 = 0.35;
const WEIGHT_RANKED_AVERAGE: f32 = 0.20;
const WEIGHT_COVERAGE: f32 = 0.15;
const WEIGHT_ANSWER_LENGTH: f32 = 0.10;
const WEIGHT_CERTAINTY: f32 = 0.10;
const WEIGHT_DIVERSITY: f32 = 0.10;

/// Similarity at or above this counts toward coverage.
const GOOD_SIMILARITY: f32 = 0.6;
/// Results needed for full coverage credit.
const FULL_COVERAGE_COUNT: usize = 5;
/// Distinct sources needed for the full diversity bonus.
const FULL_DIVERSITY_COUNT: usize = 3;

const MIN_ANSWER_CHARS: usize = 40;
const MAX_ANSWER_CHARS: usize = 1500;

const UNCERTAINTY_PHRASES: &[&str] = &[
    "i'm not sure",
    "i am not sure",
    "i don't know",
    "not certain",
    "unclear",
    "might be",
    "may be",
    "possibly",
    "it seems",
    "don't have enough information",
];

const THRESHOLD_FACTUAL: f32 = 0.65;
const THRESHOLD_OPEN_ENDED: f32 = 0.45;
const THRESHOLD_GENERAL: f32 = 0.55;

/// Width of the band above the threshold where an answer is shown but
/// feedback is still solicited.
const FEEDBACK_BAND: f32 = 0.15;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuestionKind {
    /// Cost, deadline, requirement questions — wrong answers are costly.
    Factual,
    /// Broad what/how questions where a survey answer is acceptable.
    OpenEnded,
    General,
}

const FACTUAL_KEYWORDS: &[&str] = &[
    "cost", "tuition", "fee", "price", "deadline", "due date", "how much", "how many", "gpa",
    "requirement", "required", "score", "percentage",
];

const OPEN_ENDED_PREFIXES: &[&str] = &[
    "what is", "what are", "how do", "how does", "how can", "tell me about", "why",
];

pub fn classify_question(question: &str) -> QuestionKind {
    let lower = question.trim().to_lowercase();

    if FACTUAL_KEYWORDS.iter().any(|kw| lower.contains(kw)) {
        return QuestionKind::Factual;
    }
    if OPEN_ENDED_PREFIXES
        .iter()
        .any(|prefix| lower.starts_with(prefix))
    {
        return QuestionKind::OpenEnded;
    }
    QuestionKind::General
}

pub fn threshold_for(kind: QuestionKind) -> f32 {
    match kind {
        QuestionKind::Factual => THRESHOLD_FACTUAL,
        QuestionKind::OpenEnded => THRESHOLD_OPEN_ENDED,
        QuestionKind::General => THRESHOLD_GENERAL,
    }
}

/// Blend the retrieval and answer signals into a confidence in [0, 1].
/// No results means no evidence: always 0.0.
pub fn score(results: &[SearchResult], answer: &str) -> f32 {
    if results.is_empty() {
        return 0.0;
    }

    let top_similarity = results
        .iter()
        .map(|r| r.similarity)
        .fold(0.0f32, f32::max);

    let mut weighted_sum = 0.0f32;
    let mut weight_total = 0.0f32;
    for result in results {
        let weight = 1.0 / (result.rank as f32 + 1.0);
        weighted_sum += result.similarity * weight;
        weight_total += weight;
    }
    let ranked_average = if weight_total > 0.0 {
        weighted_sum / weight_total
    } else {
        0.0
    };

    let good_count = results
        .iter()
        .filter(|r| r.similarity >= GOOD_SIMILARITY)
        .count();
    let coverage = (good_count as f32 / FULL_COVERAGE_COUNT as f32).min(1.0);

    let length = answer.trim().len();
    let length_factor = if length < MIN_ANSWER_CHARS {
        0.3
    } else if length > MAX_ANSWER_CHARS {
        0.5
    } else {
        1.0
    };

    let answer_lower = answer.to_lowercase();
    let hedges = UNCERTAINTY_PHRASES
        .iter()
        .filter(|phrase| answer_lower.contains(*phrase))
        .count();
    let certainty_factor = (1.0 - 0.3 * hedges as f32).max(0.0);

    let mut sources: Vec<&str> = results
        .iter()
        .map(|r| {
            if r.source_url.is_empty() {
                r.document_id.as_str()
            } else {
                r.source_url.as_str()
            }
        })
        .collect();
    sources.sort_unstable();
    sources.dedup();
    let diversity = (sources.len() as f32 / FULL_DIVERSITY_COUNT as f32).min(1.0);

    let blended = WEIGHT_TOP_SIMILARITY * top_similarity
        + WEIGHT_RANKED_AVERAGE * ranked_average
        + WEIGHT_COVERAGE * coverage
        + WEIGHT_ANSWER_LENGTH * length_factor
        + WEIGHT_CERTAINTY * certainty_factor
        + WEIGHT_DIVERSITY * diversity;

    blended.clamp(0.0, 1.0)
}

#[derive(Debug, Clone)]
pub struct GateDecision {
    pub should_show: bool,
    /// True when the caller should solicit explicit user feedback: the
    /// answer was withheld, or confidence sits just above the threshold.
    pub needs_feedback: bool,
    pub displayed_answer: String,
}

pub fn gate(confidence: f32, question: &str, answer: &str) -> GateDecision {
    let threshold = threshold_for(classify_question(question));

    if confidence >= threshold {
        GateDecision {
            should_show: true,
            needs_feedback: confidence < threshold + FEEDBACK_BAND,
            displayed_answer: answer.to_string(),
        }
    } else {
        GateDecision {
            should_show: false,
            needs_feedback: true,
            displayed_answer: format!(
                "I'm not confident enough in what I found (confidence {:.2}) to answer that. \
                 Could you rephrase the question or make it more specific?",
                confidence
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::retriever::SearchType;

    fn result(id: &str, similarity: f32, rank: usize) -> SearchResult {
        SearchResult {
            document_id: id.to_string(),
            title: id.to_string(),
            source_url: format!("https://example.edu/{}", id),
            content: String::new(),
            similarity,
            rank,
            search_type: SearchType::Semantic,
        }
    }

    #[test]
    fn classifies_question_kinds() {
        assert_eq!(
            classify_question("What is the tuition cost?"),
            QuestionKind::Factual
        );
        assert_eq!(
            classify_question("When is the application deadline?"),
            QuestionKind::Factual
        );
        assert_eq!(
            classify_question("What is Northeastern University?"),
            QuestionKind::OpenEnded
        );
        assert_eq!(
            classify_question("Does the campus have a gym?"),
            QuestionKind::General
        );
    }

    #[test]
    fn no_results_scores_zero() {
        assert_eq!(score(&[], "some answer"), 0.0);
    }

    #[test]
    fn strong_retrieval_clears_open_ended_threshold() {
        let results: Vec<SearchResult> = (0..5)
            .map(|i| result(&format!("d{}", i), 0.85, i))
            .collect();
        let answer = "Northeastern University is a private research university in Boston \
                      with about 20000 undergraduates.";

        let confidence = score(&results, answer);
        assert!(confidence >= THRESHOLD_OPEN_ENDED);

        let decision = gate(confidence, "What is Northeastern University?", answer);
        assert!(decision.should_show);
        assert_eq!(decision.displayed_answer, answer);
    }

    #[test]
    fn hedged_answers_score_lower() {
        let results = vec![result("d0", 0.8, 0)];
        let confident = score(&results, "Tuition is 60000 dollars per year for undergraduates.");
        let hedged = score(
            &results,
            "I'm not sure, but tuition might be around 60000 dollars, possibly.",
        );
        assert!(hedged < confident);
    }

    #[test]
    fn very_short_answers_score_lower() {
        let results = vec![result("d0", 0.8, 0)];
        let normal = score(&results, "Tuition is 60000 dollars per year for undergraduates.");
        let terse = score(&results, "60000.");
        assert!(terse < normal);
    }

    #[test]
    fn diverse_sources_score_higher() {
        let one_source: Vec<SearchResult> = (0..3)
            .map(|i| {
                let mut r = result("same", 0.8, i);
                r.source_url = "https://example.edu/one".to_string();
                r.document_id = format!("d{}", i);
                r
            })
            .collect();
        let many_sources: Vec<SearchResult> =
            (0..3).map(|i| result(&format!("d{}", i), 0.8, i)).collect();

        let answer = "Tuition is 60000 dollars per year for undergraduates.";
        assert!(score(&many_sources, answer) > score(&one_source, answer));
    }

    #[test]
    fn gate_is_monotonic_in_confidence() {
        let question = "What is the tuition cost?";
        let mut previous_shown = false;
        for step in 0..=100 {
            let confidence = step as f32 / 100.0;
            let shown = gate(confidence, question, "answer").should_show;
            // Once shown, higher confidence can never hide it again.
            assert!(!previous_shown || shown);
            previous_shown = shown;
        }
    }

    #[test]
    fn withheld_answer_quotes_confidence_and_requests_feedback() {
        let decision = gate(0.2, "What is the tuition cost?", "answer");
        assert!(!decision.should_show);
        assert!(decision.needs_feedback);
        assert!(decision.displayed_answer.contains("0.20"));
    }

    #[test]
    fn medium_band_requests_feedback_even_when_shown() {
        // Factual threshold is 0.65; 0.70 is inside the feedback band.
        let shown = gate(0.70, "What is the tuition cost?", "answer");
        assert!(shown.should_show);
        assert!(shown.needs_feedback);

        let comfortable = gate(0.95, "What is the tuition cost?", "answer");
        assert!(comfortable.should_show);
        assert!(!comfortable.needs_feedback);
    }
}
