// Heuristic Scorer
// Deterministic lexical/structural AI-likelihood scoring.
//
// The same rule set runs at sentence and document scope; only the baseline,
// the length thresholds and the clamp range differ. No randomness and no I/O.

use crate::models::{ConfidenceLevel, DetectionMethod, DetectionResult};
use crate::services::text_processor::{compute_text_metrics, TextMetrics};
use regex::Regex;
use std::sync::OnceLock;

use super::severity::verdict_for;

const MARKER_INCREMENT: i32 = 12;
const FORMAL_INCREMENT: i32 = 8;
const IMPERSONAL_INCREMENT: i32 = 10;
const NO_CASUAL_INCREMENT: i32 = 8;
const BUZZWORD_INCREMENT: i32 = 10;

/// Documents shorter than this are reported as too short by the local estimate.
const DOCUMENT_MIN_WORDS: usize = 10;

/// Stock phrases associated with generated text. Every occurrence counts.
const AI_MARKERS: &[&str] = &[
    "important to note",
    "it is worth noting",
    "furthermore",
    "moreover",
    "in conclusion",
    "delve into",
    "dive into",
    "intricate",
    "multifaceted",
    "comprehensive",
    "crucial",
    "essential",
    "fundamental",
    "paramount",
    "demonstrates",
    "illustrates",
    "exemplifies",
    "highlighting",
    "showcases",
    "reimagined",
    "breakthrough",
    "innovative",
];

const FORMAL_WORDS: &[&str] = &[
    "utilize",
    "facilitate",
    "implement",
    "leverage",
    "paradigm",
    "synergy",
    "demonstrates",
    "showcases",
    "enhances",
    "optimizes",
    "transforms",
    "alongside",
    "reimagined",
    "breakthrough",
    "innovations",
];

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum ScoreScope {
    Document,
    Sentence,
}

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct ScoringProfile {
    pub baseline: i32,
    pub floor: i32,
    pub ceiling: i32,
    pub long_words: usize,
    pub long_increment: i32,
    pub very_long_words: usize,
    pub very_long_increment: i32,
    /// Minimum length before the absence of casual fillers counts against the text.
    pub casual_check_words: usize,
}

impl ScoreScope {
    pub fn profile(&self) -> ScoringProfile {
        match self {
            // Longer texts dilute markers, so the document baseline sits lower.
            ScoreScope::Document => ScoringProfile {
                baseline: 20,
                floor: 5,
                ceiling: 90,
                long_words: 250,
                long_increment: 8,
                very_long_words: 600,
                very_long_increment: 12,
                casual_check_words: 100,
            },
            ScoreScope::Sentence => ScoringProfile {
                baseline: 40,
                floor: 30,
                ceiling: 95,
                long_words: 20,
                long_increment: 8,
                very_long_words: 30,
                very_long_increment: 12,
                casual_check_words: 15,
            },
        }
    }
}

fn phrase_list_re(phrases: &[&str]) -> Regex {
    let alternation = phrases
        .iter()
        .map(|p| regex::escape(p))
        .collect::<Vec<_>>()
        .join("|");
    // Leading boundary only: "utilize" also catches "utilized".
    Regex::new(&format!(r"(?i)\b(?:{})", alternation)).expect("phrase list regex")
}

fn marker_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| phrase_list_re(AI_MARKERS))
}

fn formal_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| phrase_list_re(FORMAL_WORDS))
}

fn personal_voice_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)\b(i|me|my|we|us|our)\b").expect("personal voice regex"))
}

fn casual_filler_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)\b(like|kinda|sorta|lol|tbh|imo|actually|basically)\b")
            .expect("casual filler regex")
    })
}

fn buzzword_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r"(?i)\b(ai|technology|artificial intelligence|demonstrates|innovative|sustainable|efficient)\b",
        )
        .expect("buzzword regex")
    })
}

/// Number of AI marker occurrences in `text`.
pub fn marker_count(text: &str) -> usize {
    marker_re().find_iter(text).count()
}

/// AI-likelihood (0-100) of `text` at the given scope, clamped to the scope's range.
///
/// Sentence callers must not pass fragments under the minimum word count; those
/// are classified as unknown before scoring.
pub fn score(text: &str, scope: ScoreScope) -> u8 {
    let profile = scope.profile();
    let words = text.split_whitespace().count();
    let mut ai_score = profile.baseline;

    ai_score += MARKER_INCREMENT * marker_count(text) as i32;

    if words > profile.long_words {
        ai_score += profile.long_increment;
    }
    if words > profile.very_long_words {
        ai_score += profile.very_long_increment;
    }

    ai_score += FORMAL_INCREMENT * formal_re().find_iter(text).count() as i32;

    if !personal_voice_re().is_match(text) {
        ai_score += IMPERSONAL_INCREMENT;
    }

    if words > profile.casual_check_words && !casual_filler_re().is_match(text) {
        ai_score += NO_CASUAL_INCREMENT;
    }

    if buzzword_re().is_match(text) {
        ai_score += BUZZWORD_INCREMENT;
    }

    ai_score.clamp(profile.floor, profile.ceiling) as u8
}

pub fn score_sentence(text: &str) -> u8 {
    score(text, ScoreScope::Sentence)
}

pub fn score_document(text: &str) -> u8 {
    score(text, ScoreScope::Document)
}

fn formality_level(metrics: &TextMetrics, markers: usize) -> &'static str {
    if metrics.informal_count > 2 || metrics.conversational_count > 2 {
        "Informal"
    } else if markers >= 3 {
        "Formal"
    } else {
        "Moderate"
    }
}

/// Document-level result built from local signals only.
///
/// This is the degraded path used when the remote detector cannot answer and
/// policy allows a local estimate. It is always tagged low confidence and
/// `DetectionMethod::Degraded`; consumers must not treat it as a verdict of the
/// same standing as a remote result.
pub fn degraded_document_estimate(text: &str) -> DetectionResult {
    let metrics = compute_text_metrics(text);
    let markers = marker_count(text);

    let (ai, verdict) = if metrics.word_count < DOCUMENT_MIN_WORDS {
        (0.0, "Too short to analyze".to_string())
    } else {
        let ai = score_document(text) as f64;
        (ai, verdict_for(ai).to_string())
    };

    let mut result = local_metrics_result(&metrics, markers);
    result.ai_likelihood = ai;
    result.human_likelihood = 100.0 - ai;
    result.confidence = ConfidenceLevel::Low;
    result.verdict = verdict;
    result.detection_method = DetectionMethod::Degraded;
    result.timestamp = chrono::Utc::now();
    result
}

/// Structural and stylistic fields of a DetectionResult, without a score.
pub fn local_metrics_result(metrics: &TextMetrics, markers: usize) -> DetectionResult {
    DetectionResult {
        word_count: metrics.word_count,
        sentence_count: metrics.sentence_count,
        avg_words_per_sentence: metrics.avg_words_per_sentence,
        vocabulary_richness: metrics.vocabulary_richness,
        readability_score: metrics.readability_score,
        has_ai_markers: markers > 0,
        ai_marker_count: markers,
        has_personal_touch: metrics.has_personal_touch(),
        formality_level: formality_level(metrics, markers).to_string(),
        sentence_variation: metrics.sentence_variation,
        ..DetectionResult::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLES: &[&str] = &[
        "ok",
        "I went to the store with my brother and we bought some apples.",
        "Furthermore, it is important to note that innovative technology demonstrates paramount value.",
        "Moreover moreover moreover moreover moreover moreover moreover moreover moreover.",
        "lol tbh i kinda liked it",
    ];

    #[test]
    fn test_scores_stay_within_scope_range() {
        for scope in [ScoreScope::Sentence, ScoreScope::Document] {
            let p = scope.profile();
            for s in SAMPLES {
                let v = score(s, scope) as i32;
                assert!(v >= p.floor && v <= p.ceiling, "{:?} {} -> {}", scope, s, v);
            }
        }
    }

    #[test]
    fn test_sentence_range_sits_above_document_range() {
        let doc = ScoreScope::Document.profile();
        let sent = ScoreScope::Sentence.profile();
        assert!(sent.floor > doc.floor);
        assert!(sent.ceiling > doc.ceiling);
        assert!(sent.baseline > doc.baseline);
    }

    #[test]
    fn test_score_is_deterministic() {
        for s in SAMPLES {
            assert_eq!(score_sentence(s), score_sentence(s));
            assert_eq!(score_document(s), score_document(s));
        }
    }

    #[test]
    fn test_repeated_markers_each_add() {
        let once = score_sentence("Moreover the results were clear to everyone there.");
        let twice = score_sentence("Moreover the results were clear to everyone, moreover.");
        assert_eq!(twice as i32 - once as i32, MARKER_INCREMENT);
    }

    #[test]
    fn test_personal_voice_lowers_sentence_score() {
        let personal = score_sentence("I think our results were clear to everyone.");
        let impersonal = score_sentence("The results were clear to everyone involved.");
        assert_eq!(impersonal as i32 - personal as i32, IMPERSONAL_INCREMENT);
    }

    #[test]
    fn test_marker_and_buzzword_sentence() {
        // 40 base + 12 marker + 10 impersonal + 10 buzzword
        assert_eq!(score_sentence("AI is important to note and very beneficial for society."), 72);
        // 40 base, personal voice present
        assert_eq!(score_sentence("I love this topic."), 40);
    }

    #[test]
    fn test_formal_words_use_prefix_match() {
        assert_eq!(formal_re().find_iter("We utilized and leveraged tools").count(), 2);
    }

    #[test]
    fn test_score_clamps_to_ceiling() {
        let text = "Furthermore moreover crucial essential paramount intricate multifaceted comprehensive.";
        assert_eq!(score_sentence(text), 95);
    }

    #[test]
    fn test_degraded_estimate_shape() {
        let text = "Furthermore, the comprehensive framework demonstrates how innovative technology can \
                    facilitate sustainable outcomes across the multifaceted education landscape.";
        let result = degraded_document_estimate(text);
        assert_eq!(result.confidence, ConfidenceLevel::Low);
        assert_eq!(result.detection_method, DetectionMethod::Degraded);
        assert_eq!(result.ai_likelihood + result.human_likelihood, 100.0);
        assert!(result.has_ai_markers);
        assert!(result.word_count > 10);
    }

    #[test]
    fn test_degraded_estimate_too_short() {
        let result = degraded_document_estimate("Too short.");
        assert_eq!(result.ai_likelihood, 0.0);
        assert_eq!(result.human_likelihood, 100.0);
        assert_eq!(result.verdict, "Too short to analyze");
    }
}
