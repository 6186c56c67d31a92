// Detection Module
// AI-authorship detection organized into specialized submodules:
// - heuristic: Deterministic rule-based scorer and local document metrics
// - aggregation: Remote-vs-heuristic resolution for documents and sentences
// - severity: Alert banding, verdict text and faculty alert summaries

pub mod heuristic;
pub mod aggregation;
pub mod severity;

pub use heuristic::{
    degraded_document_estimate,
    marker_count,
    score,
    score_document,
    score_sentence,
    ScoreScope,
};
pub use aggregation::{
    revision_diff,
    similarity,
    summarize_sentences,
    AggregatorSettings,
    AnalysisError,
    DetectionAggregator,
};
pub use severity::{build_alert_summary, severity_for, verdict_for};
