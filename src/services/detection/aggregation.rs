// Aggregation Logic
// Resolves remote-vs-heuristic per unit of text and merges the results into
// canonical detection records.
//
// Document scope: one remote call, no silent heuristic substitute.
// Sentence scope: remote per sentence with heuristic fallback on any failure.

use crate::models::{
    ClassificationMethod, ConfidenceLevel, DetectionMethod, DetectionResult, RevisionDiff, Sentence,
    SentenceAnalysisResponse, SentenceClassification, SentenceType,
};
use crate::services::config_store::{AppConfig, DocumentFallback};
use crate::services::detector_client::{
    DetectorBackend, DetectorError, RemoteDocumentPayload, RemoteSentencePayload,
};
use crate::services::text_processor::{
    compute_text_metrics, round_to, segment, strip_markup, word_set,
};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

use super::heuristic::{degraded_document_estimate, local_metrics_result, marker_count, score_sentence};
use super::severity::verdict_for;

/// Sentence likelihood at or above which a sentence is typed as AI.
const SENTENCE_AI_CUTOFF: f64 = 50.0;

#[derive(Error, Debug)]
pub enum AnalysisError {
    #[error("{0}")]
    Validation(String),
    #[error("AI detection is temporarily unavailable. Please try again.")]
    Unavailable(#[source] DetectorError),
}

#[derive(Debug, Clone)]
pub struct AggregatorSettings {
    pub min_sentence_words: usize,
    pub unknown_midpoint: f64,
    pub sentence_remote_max_words: usize,
    pub sentence_timeout: Duration,
    pub sentence_concurrency: usize,
    pub document_fallback: DocumentFallback,
}

impl Default for AggregatorSettings {
    fn default() -> Self {
        Self::from_config(&AppConfig::default())
    }
}

impl AggregatorSettings {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            min_sentence_words: config.detection.min_sentence_words,
            unknown_midpoint: config.detection.unknown_midpoint,
            sentence_remote_max_words: config.detector.sentence_remote_max_words,
            sentence_timeout: Duration::from_secs(config.detector.sentence_timeout_secs),
            sentence_concurrency: config.detector.sentence_concurrency.max(1),
            document_fallback: config.detection.document_fallback,
        }
    }
}

pub struct DetectionAggregator {
    backend: Arc<dyn DetectorBackend>,
    settings: AggregatorSettings,
}

impl DetectionAggregator {
    pub fn new(backend: Arc<dyn DetectorBackend>, settings: AggregatorSettings) -> Self {
        Self { backend, settings }
    }

    /// Document-scope analysis.
    ///
    /// Any remote failure is returned as [`AnalysisError::Unavailable`] unless
    /// the degraded fallback is explicitly configured.
    pub async fn analyze_document(
        &self,
        text: &str,
        previous_text: Option<&str>,
    ) -> Result<DetectionResult, AnalysisError> {
        let cleaned = strip_markup(text);
        if cleaned.is_empty() {
            return Err(AnalysisError::Validation("Text is required".to_string()));
        }
        let previous = previous_text
            .map(strip_markup)
            .filter(|p| !p.is_empty());

        info!(
            chars = cleaned.chars().count(),
            has_previous = previous.is_some(),
            "detection.document.start"
        );

        let outcome = self
            .backend
            .detect_document(&cleaned, previous.as_deref())
            .await
            .and_then(RemoteDocumentPayload::into_checked);

        match outcome {
            Ok(payload) => {
                let result = merge_document_payload(payload, &cleaned, previous.as_deref());
                info!(
                    ai = result.ai_likelihood,
                    confidence = result.confidence.as_str(),
                    "detection.document.done"
                );
                Ok(result)
            }
            Err(e) => match self.settings.document_fallback {
                DocumentFallback::Fail => {
                    warn!(error = %e, "detection.document.unavailable");
                    Err(AnalysisError::Unavailable(e))
                }
                DocumentFallback::Degraded => {
                    warn!(error = %e, "detection.document.degraded");
                    let mut result = degraded_document_estimate(&cleaned);
                    if let Some(prev) = previous.as_deref() {
                        apply_revision_diff(&mut result, &revision_diff(prev, &cleaned));
                    }
                    Ok(result)
                }
            },
        }
    }

    /// Sentence-scope analysis. Never fails on detector errors; only on empty input.
    pub async fn analyze_sentences(&self, text: &str) -> Result<SentenceAnalysisResponse, AnalysisError> {
        if text.trim().is_empty() {
            return Err(AnalysisError::Validation("Text is required".to_string()));
        }

        let sentences = segment(text);
        info!(sentences = sentences.len(), "detection.sentences.start");

        let classifications = if self.settings.sentence_concurrency <= 1 || sentences.len() <= 1 {
            let mut out = Vec::with_capacity(sentences.len());
            for s in &sentences {
                out.push(classify_sentence(self.backend.as_ref(), &self.settings, s).await);
            }
            out
        } else {
            self.classify_concurrently(sentences).await
        };

        let response = summarize_sentences(classifications);
        info!(
            total = response.total_sentences,
            ai = response.ai_sentences,
            human = response.human_sentences,
            "detection.sentences.done"
        );
        Ok(response)
    }

    /// Classify sentences in parallel, bounded by `sentence_concurrency`,
    /// and return them in source order.
    async fn classify_concurrently(&self, sentences: Vec<Sentence>) -> Vec<SentenceClassification> {
        let semaphore = Arc::new(Semaphore::new(self.settings.sentence_concurrency));
        let mut slots: Vec<Option<SentenceClassification>> = vec![None; sentences.len()];
        let mut set = JoinSet::new();

        for sentence in sentences.iter().cloned() {
            let backend = Arc::clone(&self.backend);
            let settings = self.settings.clone();
            let semaphore = Arc::clone(&semaphore);
            set.spawn(async move {
                let _permit = semaphore.acquire_owned().await.ok();
                let classification = classify_sentence(backend.as_ref(), &settings, &sentence).await;
                (sentence.index, classification)
            });
        }

        while let Some(joined) = set.join_next().await {
            match joined {
                Ok((index, classification)) => {
                    if let Some(slot) = slots.get_mut(index) {
                        *slot = Some(classification);
                    }
                }
                Err(e) => warn!(error = %e, "detection.sentences.task_failed"),
            }
        }

        // A panicked task leaves its slot empty; score it locally.
        slots
            .into_iter()
            .zip(sentences.iter())
            .map(|(slot, s)| slot.unwrap_or_else(|| heuristic_classification(s)))
            .collect()
    }
}

async fn classify_sentence(
    backend: &dyn DetectorBackend,
    settings: &AggregatorSettings,
    sentence: &Sentence,
) -> SentenceClassification {
    if sentence.word_count < settings.min_sentence_words {
        return SentenceClassification {
            text: sentence.text.clone(),
            ai_likelihood: settings.unknown_midpoint,
            sentence_type: SentenceType::Unknown,
            confidence: ConfidenceLevel::Low,
            method: ClassificationMethod::InsufficientLength,
            score: None,
        };
    }

    if sentence.word_count <= settings.sentence_remote_max_words {
        let remote = tokio::time::timeout(settings.sentence_timeout, backend.detect_sentence(&sentence.text))
            .await
            .unwrap_or_else(|_| Err(DetectorError::Unavailable("sentence detector timed out".to_string())))
            .and_then(RemoteSentencePayload::into_checked);

        match remote {
            Ok(payload) => {
                return SentenceClassification {
                    text: sentence.text.clone(),
                    ai_likelihood: payload.ai_likelihood,
                    sentence_type: type_for(payload.ai_likelihood),
                    confidence: ConfidenceLevel::from_label(&payload.confidence),
                    method: ClassificationMethod::Remote,
                    score: Some(payload.score),
                };
            }
            Err(e) if e.is_unavailable() => {
                debug!(index = sentence.index, error = %e, "detection.sentence.fallback");
            }
            Err(e) => {
                warn!(index = sentence.index, error = %e, "detection.sentence.fallback_unexpected");
            }
        }
    }

    heuristic_classification(sentence)
}

fn heuristic_classification(sentence: &Sentence) -> SentenceClassification {
    let ai = score_sentence(&sentence.text) as f64;
    SentenceClassification {
        text: sentence.text.clone(),
        ai_likelihood: ai,
        sentence_type: type_for(ai),
        confidence: ConfidenceLevel::Medium,
        method: ClassificationMethod::Heuristic,
        score: None,
    }
}

fn type_for(ai_likelihood: f64) -> SentenceType {
    if ai_likelihood >= SENTENCE_AI_CUTOFF {
        SentenceType::Ai
    } else {
        SentenceType::Human
    }
}

/// Wrap classifications with their counts by type.
pub fn summarize_sentences(sentences: Vec<SentenceClassification>) -> SentenceAnalysisResponse {
    let ai_sentences = sentences
        .iter()
        .filter(|s| s.sentence_type == SentenceType::Ai)
        .count();
    let human_sentences = sentences
        .iter()
        .filter(|s| s.sentence_type == SentenceType::Human)
        .count();

    SentenceAnalysisResponse {
        total_sentences: sentences.len(),
        ai_sentences,
        human_sentences,
        sentences,
    }
}

/// Jaccard index of the lower-cased whitespace word sets of `a` and `b`.
/// Two texts without words are identical (1.0).
pub fn similarity(a: &str, b: &str) -> f64 {
    let set_a = word_set(a);
    let set_b = word_set(b);
    let union = set_a.union(&set_b).count();
    if union == 0 {
        return 1.0;
    }
    let intersection = set_a.intersection(&set_b).count();
    intersection as f64 / union as f64
}

/// Word-set difference from `previous` to `current`.
/// `percentage_change` is `(1 - similarity) * 100`, one decimal.
pub fn revision_diff(previous: &str, current: &str) -> RevisionDiff {
    let prev = word_set(previous);
    let cur = word_set(current);
    let sim = similarity(previous, current);
    RevisionDiff {
        words_added: cur.difference(&prev).count(),
        words_removed: prev.difference(&cur).count(),
        similarity: sim,
        percentage_change: round_to((1.0 - sim) * 100.0, 1),
    }
}

fn apply_revision_diff(result: &mut DetectionResult, diff: &RevisionDiff) {
    result.words_added = diff.words_added;
    result.words_removed = diff.words_removed;
    result.percentage_change = diff.percentage_change;
}

/// Build the canonical record from a remote payload, filling omitted fields
/// from local metrics. Remote likelihoods are taken as given.
fn merge_document_payload(
    payload: RemoteDocumentPayload,
    text: &str,
    previous: Option<&str>,
) -> DetectionResult {
    let metrics = compute_text_metrics(text);
    let local = local_metrics_result(&metrics, marker_count(text));
    let ai = payload.ai_likelihood;

    let mut result = DetectionResult {
        ai_likelihood: ai,
        human_likelihood: payload.human_likelihood.unwrap_or(100.0 - ai),
        confidence: payload
            .confidence
            .as_deref()
            .map(ConfidenceLevel::from_label)
            .unwrap_or(ConfidenceLevel::Low),
        verdict: payload
            .verdict
            .clone()
            .unwrap_or_else(|| verdict_for(ai).to_string()),
        word_count: payload.word_count.unwrap_or(local.word_count),
        sentence_count: payload.sentence_count.unwrap_or(local.sentence_count),
        avg_words_per_sentence: payload
            .avg_words_per_sentence
            .unwrap_or(local.avg_words_per_sentence),
        vocabulary_richness: payload.vocabulary_richness.unwrap_or(local.vocabulary_richness),
        readability_score: payload.readability_score.unwrap_or(local.readability_score),
        has_ai_markers: payload.has_ai_markers.unwrap_or(local.has_ai_markers),
        ai_marker_count: payload.ai_marker_count.unwrap_or(local.ai_marker_count),
        has_personal_touch: payload.has_personal_touch.unwrap_or(local.has_personal_touch),
        formality_level: payload
            .formality_level
            .clone()
            .unwrap_or(local.formality_level),
        sentence_variation: payload.sentence_variation.unwrap_or(local.sentence_variation),
        words_added: payload.words_added.unwrap_or(0),
        words_removed: payload.words_removed.unwrap_or(0),
        percentage_change: payload.percentage_change.unwrap_or(0.0),
        significantly_modified: payload.significantly_modified.unwrap_or(false),
        sentiment_score: payload.sentiment_score,
        sentiment_label: payload.sentiment_label.clone(),
        processing_time: payload.processing_time,
        detection_method: DetectionMethod::Remote,
        timestamp: chrono::Utc::now(),
    };

    if !payload.has_revision_metrics() {
        if let Some(prev) = previous {
            apply_revision_diff(&mut result, &revision_diff(prev, text));
        }
    }

    result
}
