// Text Processing Service
// Sentence segmentation, word tokenisation and structural text metrics

use crate::models::Sentence;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::sync::OnceLock;

fn sentence_break_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"[.!?]\s+").expect("sentence break regex"))
}

fn punctuation_only_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[.!?\s]+$").expect("punctuation regex"))
}

fn metric_sentence_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"[.!?]+").expect("metric sentence regex"))
}

fn personal_pronoun_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)\b(i|me|my|mine|myself)\b").expect("pronoun regex"))
}

fn conversational_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)\b(honestly|actually|basically|literally|anyway|btw|lol|haha|you know)\b")
            .expect("conversational regex")
    })
}

fn informal_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)\b(gonna|wanna|kinda|sorta|dunno|gotta|cuz|coz|u|ur|thru)\b")
            .expect("informal regex")
    })
}

fn vowel_group_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)[aeiouy]+").expect("vowel regex"))
}

/// Split text into sentences on sentence-ending punctuation followed by whitespace.
///
/// Each sentence is trimmed; empty and punctuation-only fragments are not
/// emitted but their text is kept in the previous sentence's separator (or
/// the first sentence's `leading`) so that [`rejoin`] can rebuild the source.
/// Order follows the source.
pub fn segment(text: &str) -> Vec<Sentence> {
    let mut sentences: Vec<Sentence> = Vec::new();
    if text.trim().is_empty() {
        return sentences;
    }

    let mut pieces: Vec<(&str, &str)> = Vec::new();
    let mut cursor = 0usize;
    for m in sentence_break_re().find_iter(text) {
        // The punctuation char is ASCII, so +1 stays on a char boundary.
        let end = m.start() + 1;
        pieces.push((&text[cursor..end], &text[end..m.end()]));
        cursor = m.end();
    }
    if cursor < text.len() {
        pieces.push((&text[cursor..], ""));
    }

    // Fragments seen before the first real sentence.
    let mut prefix = String::new();
    for (raw, separator) in pieces {
        let trimmed = raw.trim();
        if trimmed.is_empty() || punctuation_only_re().is_match(trimmed) {
            match sentences.last_mut() {
                Some(prev) => {
                    prev.separator.push_str(raw);
                    prev.separator.push_str(separator);
                }
                None => {
                    prefix.push_str(raw);
                    prefix.push_str(separator);
                }
            }
            continue;
        }

        let leading_ws = &raw[..raw.len() - raw.trim_start().len()];
        let trailing = &raw[raw.trim_end().len()..];
        let leading = if sentences.is_empty() {
            format!("{}{}", std::mem::take(&mut prefix), leading_ws)
        } else {
            leading_ws.to_string()
        };
        sentences.push(Sentence {
            index: sentences.len(),
            text: trimmed.to_string(),
            word_count: count_words(trimmed),
            leading,
            separator: format!("{}{}", trailing, separator),
        });
    }

    sentences
}

/// Rebuild text from segmented sentences using their recorded separators.
pub fn rejoin(sentences: &[Sentence]) -> String {
    sentences
        .iter()
        .map(|s| format!("{}{}{}", s.leading, s.text, s.separator))
        .collect()
}

/// Word count by runs of whitespace.
pub fn count_words(text: &str) -> usize {
    text.split_whitespace().count()
}

/// Lower-cased whitespace tokens as a set.
pub fn word_set(text: &str) -> HashSet<String> {
    text.split_whitespace().map(|w| w.to_lowercase()).collect()
}

/// Collapse whitespace runs into single spaces and trim.
pub fn normalize_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Strip HTML, code, URLs and e-mail addresses so only prose reaches the detector.
pub fn strip_markup(text: &str) -> String {
    static PATTERNS: OnceLock<Vec<Regex>> = OnceLock::new();
    let patterns = PATTERNS.get_or_init(|| {
        [
            r"<[^>]*>",
            r"```[\s\S]*?```",
            r"`[^`]+`",
            r"https?://\S+",
            r"[\w.-]+@[\w.-]+\.\w+",
            r"[{}\[\]<>/\\|@#$%^&*=+]",
        ]
        .iter()
        .map(|p| Regex::new(p).expect("markup regex"))
        .collect()
    });

    let mut cleaned = text.to_string();
    for re in patterns {
        cleaned = re.replace_all(&cleaned, " ").to_string();
    }
    normalize_whitespace(&cleaned)
}

/// Structural metrics reported alongside a document-level score.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TextMetrics {
    pub word_count: usize,
    pub sentence_count: usize,
    pub avg_words_per_sentence: f64,
    pub vocabulary_richness: f64,
    /// Coefficient of variation of sentence lengths (std / mean).
    pub sentence_variation: f64,
    pub readability_score: f64,
    pub personal_pronoun_count: usize,
    pub conversational_count: usize,
    pub informal_count: usize,
    pub repetitive_starters: usize,
}

impl TextMetrics {
    pub fn has_personal_touch(&self) -> bool {
        self.personal_pronoun_count > 3
    }
}

pub fn compute_text_metrics(text: &str) -> TextMetrics {
    let words: Vec<&str> = text.split_whitespace().collect();
    if words.is_empty() {
        return TextMetrics::default();
    }

    let sentences: Vec<&str> = metric_sentence_re()
        .split(text)
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .collect();

    let lengths: Vec<f64> = sentences.iter().map(|s| count_words(s) as f64).collect();
    let avg_len = if lengths.is_empty() {
        0.0
    } else {
        lengths.iter().sum::<f64>() / lengths.len() as f64
    };
    let variance = if lengths.is_empty() {
        0.0
    } else {
        lengths.iter().map(|l| (l - avg_len).powi(2)).sum::<f64>() / lengths.len() as f64
    };
    let variation = if avg_len > 0.0 { variance.sqrt() / avg_len } else { 0.0 };

    let unique: HashSet<String> = words
        .iter()
        .map(|w| {
            w.chars()
                .filter(|c| c.is_ascii_alphabetic())
                .collect::<String>()
                .to_ascii_lowercase()
        })
        .collect();
    let vocabulary_richness = unique.len() as f64 / words.len() as f64;

    // Sentences opening with the same two words more than twice
    let mut starters: HashMap<String, usize> = HashMap::new();
    for s in &sentences {
        let key = s
            .split_whitespace()
            .take(2)
            .collect::<Vec<_>>()
            .join(" ")
            .to_lowercase();
        *starters.entry(key).or_insert(0) += 1;
    }
    let repetitive_starters = starters.values().filter(|&&c| c > 2).count();

    let syllables: usize = words.iter().map(|w| estimate_syllables(w)).sum();
    let avg_syllables = syllables as f64 / words.len() as f64;

    TextMetrics {
        word_count: words.len(),
        sentence_count: sentences.len(),
        avg_words_per_sentence: round_to(avg_len, 1),
        vocabulary_richness: round_to(vocabulary_richness, 2),
        sentence_variation: round_to(variation, 2),
        readability_score: readability(avg_len, avg_syllables),
        personal_pronoun_count: personal_pronoun_re().find_iter(text).count(),
        conversational_count: conversational_re().find_iter(text).count(),
        informal_count: informal_re().find_iter(text).count(),
        repetitive_starters,
    }
}

/// Flesch reading ease mapped onto 0-1.
fn readability(avg_words_per_sentence: f64, avg_syllables_per_word: f64) -> f64 {
    let flesch = 206.835 - 1.015 * avg_words_per_sentence - 84.6 * avg_syllables_per_word;
    round_to(flesch.clamp(0.0, 100.0) / 100.0, 2)
}

fn estimate_syllables(word: &str) -> usize {
    vowel_group_re().find_iter(word).count().max(1)
}

pub(crate) fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_segment_splits_on_terminal_punctuation() {
        let sentences = segment("First one here. Second one here! Third? Done");
        let texts: Vec<&str> = sentences.iter().map(|s| s.text.as_str()).collect();
        assert_eq!(texts, vec!["First one here.", "Second one here!", "Third?", "Done"]);
        assert_eq!(sentences[0].word_count, 3);
        assert_eq!(sentences[2].index, 2);
    }

    #[test]
    fn test_segment_keeps_decimals_and_abbreviation_free_text_together() {
        let sentences = segment("The value was 3.5 units overall. Next.");
        assert_eq!(sentences.len(), 2);
        assert_eq!(sentences[0].text, "The value was 3.5 units overall.");
    }

    #[test]
    fn test_segment_drops_punctuation_only_fragments() {
        let sentences = segment("Real sentence here. ... ! Another real one.");
        let texts: Vec<&str> = sentences.iter().map(|s| s.text.as_str()).collect();
        assert_eq!(texts, vec!["Real sentence here.", "Another real one."]);
        assert_eq!(sentences[1].index, 1);
    }

    #[test]
    fn test_segment_empty_and_whitespace() {
        assert!(segment("").is_empty());
        assert!(segment("   \n\t ").is_empty());
    }

    #[test]
    fn test_rejoin_reconstructs_source_modulo_whitespace() {
        let text = "I wrote this.  Then I   revised it!\nFinally? ... It was done.";
        let rebuilt = rejoin(&segment(text));
        assert_eq!(normalize_whitespace(&rebuilt), normalize_whitespace(text));
    }

    #[test]
    fn test_rejoin_keeps_leading_punctuation_fragment() {
        let text = "... Hello there my friend. Bye now.";
        let sentences = segment(text);
        assert_eq!(sentences.len(), 2);
        assert_eq!(sentences[0].text, "Hello there my friend.");
        assert_eq!(sentences[0].leading, "... ");
        assert!(sentences[1].leading.is_empty());
        assert_eq!(rejoin(&sentences), text);
    }

    #[test]
    fn test_rejoin_is_exact_for_leading_whitespace() {
        let text = "  \n First line here. Second line!  ";
        assert_eq!(rejoin(&segment(text)), text);
    }

    #[test]
    fn test_count_words_uses_whitespace_runs() {
        assert_eq!(count_words("  one   two\tthree\nfour "), 4);
        assert_eq!(count_words(""), 0);
    }

    #[test]
    fn test_strip_markup_removes_html_code_and_urls() {
        let input = "<p>Hello <b>world</b></p> see https://example.com and `code` or me@site.org ```block\nx```";
        let cleaned = strip_markup(input);
        assert_eq!(cleaned, "Hello world see and or");
    }

    #[test]
    fn test_compute_text_metrics_basic() {
        let m = compute_text_metrics("I like dogs. I like cats. Dogs are fun to watch.");
        assert_eq!(m.word_count, 11);
        assert_eq!(m.sentence_count, 3);
        assert_eq!(m.personal_pronoun_count, 2);
        assert!(m.vocabulary_richness > 0.0 && m.vocabulary_richness <= 1.0);
        assert!(m.readability_score >= 0.0 && m.readability_score <= 1.0);
    }

    #[test]
    fn test_compute_text_metrics_empty() {
        assert_eq!(compute_text_metrics("  "), TextMetrics::default());
    }
}
