// DraftCheck Data Models
// Shared by the detection pipeline, the submission lifecycle and the API surface

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

// ============ Categorical Types ============

/// Reliability of the source that produced a score. Not a statistical confidence.
/// Deserializes leniently through [`ConfidenceLevel::from_label`].
#[derive(Debug, Copy, Clone, Eq, PartialEq, Serialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ConfidenceLevel {
    #[default]
    Low,
    Medium,
    High,
}

impl ConfidenceLevel {
    /// Lenient parse used at the remote boundary ("High", "medium ", ...).
    /// Anything unrecognised is treated as low.
    pub fn from_label(val: &str) -> Self {
        match val.trim().to_lowercase().as_str() {
            "high" => Self::High,
            "medium" => Self::Medium,
            _ => Self::Low,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
        }
    }
}

impl<'de> Deserialize<'de> for ConfidenceLevel {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let label = String::deserialize(deserializer)?;
        Ok(Self::from_label(&label))
    }
}

#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Stage {
    Draft,
    Final,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Draft => "draft",
            Self::Final => "final",
        }
    }
}

/// Where a document-level result came from.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum DetectionMethod {
    #[default]
    Remote,
    /// Local estimate produced while the remote detector was unavailable.
    Degraded,
}

#[derive(Debug, Copy, Clone, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SentenceType {
    Ai,
    Human,
    Unknown,
}

#[derive(Debug, Copy, Clone, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClassificationMethod {
    Remote,
    Heuristic,
    InsufficientLength,
}

// ============ Text ============

/// One sentence of the analysed text, in source order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Sentence {
    pub index: usize,
    pub text: String,
    pub word_count: usize,
    /// Source text before this sentence that belongs to no sentence. Only the
    /// first sentence can carry it.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub leading: String,
    /// Text that followed this sentence in the source (whitespace plus any
    /// dropped punctuation-only fragment). Concatenating
    /// `leading + text + separator` over all sentences rebuilds the source.
    #[serde(default)]
    pub separator: String,
}

// ============ Detection ============

/// Canonical document-scope detection record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DetectionResult {
    pub ai_likelihood: f64,
    pub human_likelihood: f64,
    pub confidence: ConfidenceLevel,
    pub verdict: String,

    pub word_count: usize,
    pub sentence_count: usize,
    pub avg_words_per_sentence: f64,
    pub vocabulary_richness: f64,
    pub readability_score: f64,

    #[serde(rename = "hasAIMarkers")]
    pub has_ai_markers: bool,
    pub ai_marker_count: usize,
    pub has_personal_touch: bool,
    pub formality_level: String,
    pub sentence_variation: f64,

    pub words_added: usize,
    pub words_removed: usize,
    pub percentage_change: f64,
    pub significantly_modified: bool,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub sentiment_score: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sentiment_label: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub processing_time: Option<f64>,

    pub detection_method: DetectionMethod,
    pub timestamp: DateTime<Utc>,
}

impl Default for DetectionResult {
    fn default() -> Self {
        Self {
            ai_likelihood: 0.0,
            human_likelihood: 0.0,
            confidence: ConfidenceLevel::Low,
            verdict: "Unknown".to_string(),
            word_count: 0,
            sentence_count: 0,
            avg_words_per_sentence: 0.0,
            vocabulary_richness: 0.0,
            readability_score: 0.0,
            has_ai_markers: false,
            ai_marker_count: 0,
            has_personal_touch: false,
            formality_level: "Moderate".to_string(),
            sentence_variation: 0.0,
            words_added: 0,
            words_removed: 0,
            percentage_change: 0.0,
            significantly_modified: false,
            sentiment_score: None,
            sentiment_label: None,
            processing_time: None,
            detection_method: DetectionMethod::Remote,
            timestamp: DateTime::<Utc>::default(),
        }
    }
}

/// A DetectionResult persisted against one stage of a submission.
/// Rows are append-only; nothing updates them once written.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DetectionRecord {
    pub id: String,
    pub submission_id: String,
    pub stage: Stage,
    #[serde(flatten)]
    pub result: DetectionResult,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SentenceClassification {
    pub text: String,
    pub ai_likelihood: f64,
    #[serde(rename = "type")]
    pub sentence_type: SentenceType,
    pub confidence: ConfidenceLevel,
    pub method: ClassificationMethod,
    /// Raw score reported by the remote detector, when it answered.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub score: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SentenceAnalysisResponse {
    pub sentences: Vec<SentenceClassification>,
    pub total_sentences: usize,
    pub ai_sentences: usize,
    pub human_sentences: usize,
}

/// Word-set difference between two revisions of the same text.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct RevisionDiff {
    pub words_added: usize,
    pub words_removed: usize,
    pub similarity: f64,
    pub percentage_change: f64,
}

// ============ Requests ============

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentDetectRequest {
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub previous_text: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SentenceDetectRequest {
    #[serde(default)]
    pub text: String,
}

#[derive(Debug, Copy, Clone, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SubmissionStep {
    Draft,
    Reflection,
    Final,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmissionStageRequest {
    #[serde(default)]
    pub assignment_id: String,
    pub step: SubmissionStep,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub ai_detection: Option<DetectionResult>,
}

// ============ Submission ============

#[derive(Debug, Copy, Clone, Eq, PartialEq, Serialize, Deserialize)]
pub enum SubmissionStatus {
    Draft,
    Submitted,
    Graded,
}

impl SubmissionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Draft => "Draft",
            Self::Submitted => "Submitted",
            Self::Graded => "Graded",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Submission {
    pub submission_id: String,
    pub assignment_id: String,
    pub student_id: String,
    pub faculty_id: Option<String>,
    pub status: SubmissionStatus,
    pub draft_content: Option<String>,
    pub final_content: Option<String>,
    pub uses_ai: bool,
    pub ai_detected: bool,
    /// 0-1 scale. Zero means "no score on the row".
    pub ai_confidence: f64,
    pub submission_date: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Assignment as seen by this core: referenced, never owned.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssignmentRef {
    pub assignment_id: String,
    pub faculty_id: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Reflection {
    pub reflection_id: String,
    pub submission_id: String,
    pub student_id: String,
    pub content: String,
    pub words: usize,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RubricEvaluation {
    #[serde(default)]
    pub rubric_id: String,
    #[serde(default)]
    pub submission_id: String,
    pub faculty_id: String,
    pub originality: f64,
    pub effort: f64,
    pub final_grade: f64,
    #[serde(default)]
    pub faculty_ai_identified: bool,
    #[serde(default = "default_rubric_confidence")]
    pub confidence: f64,
    pub feedback: String,
    #[serde(default)]
    pub assessment_date: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmissionUpdateResponse {
    pub success: bool,
    pub submission: Submission,
}

// ============ Faculty Alerts ============

/// Row of the faculty submission list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FacultySubmissionView {
    #[serde(flatten)]
    pub submission: Submission,
    /// Percent shown to faculty, see `display_confidence`.
    pub ai_score: u32,
}

#[derive(Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Medium,
    High,
    Critical,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct AlertCounts {
    pub critical: usize,
    pub high: usize,
    pub medium: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AiAlert {
    pub submission_id: String,
    pub student_id: String,
    pub assignment_id: String,
    pub submitted_at: DateTime<Utc>,
    pub ai_confidence: u32,
    pub severity: Severity,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct AlertSummary {
    pub counts: AlertCounts,
    pub alerts: Vec<AiAlert>,
}

// ============ Default Value Functions ============

fn default_rubric_confidence() -> f64 { 0.85 }

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_confidence_label_parsing() {
        assert_eq!(ConfidenceLevel::from_label("High"), ConfidenceLevel::High);
        assert_eq!(ConfidenceLevel::from_label(" medium "), ConfidenceLevel::Medium);
        assert_eq!(ConfidenceLevel::from_label("bogus"), ConfidenceLevel::Low);
    }

    #[test]
    fn test_ai_detection_payload_defaults_missing_fields() {
        let json = r#"{"aiLikelihood": 72, "verdict": "Likely AI-generated"}"#;
        let parsed: DetectionResult = serde_json::from_str(json).unwrap();
        assert_eq!(parsed.ai_likelihood, 72.0);
        assert_eq!(parsed.confidence, ConfidenceLevel::Low);
        assert_eq!(parsed.formality_level, "Moderate");
        assert!(!parsed.significantly_modified);
    }

    #[test]
    fn test_sentence_classification_uses_type_key() {
        let c = SentenceClassification {
            text: "Short one.".to_string(),
            ai_likelihood: 50.0,
            sentence_type: SentenceType::Unknown,
            confidence: ConfidenceLevel::Low,
            method: ClassificationMethod::InsufficientLength,
            score: None,
        };
        let json = serde_json::to_value(&c).unwrap();
        assert_eq!(json["type"], "unknown");
        assert_eq!(json["method"], "insufficient_length");
        assert!(json.get("score").is_none());
    }

    #[test]
    fn test_stage_request_parses_step() {
        let json = r#"{"assignmentId": "A1", "step": "reflection", "content": "I learned a lot."}"#;
        let parsed: SubmissionStageRequest = serde_json::from_str(json).unwrap();
        assert_eq!(parsed.step, SubmissionStep::Reflection);
        assert!(parsed.ai_detection.is_none());
    }

    #[test]
    fn test_stage_request_accepts_capitalized_confidence() {
        let json = r#"{"assignmentId":"A1","step":"draft","content":"x","aiDetection":{"aiLikelihood":64,"confidence":"High"}}"#;
        let parsed: SubmissionStageRequest = serde_json::from_str(json).unwrap();
        let detection = parsed.ai_detection.unwrap();
        assert_eq!(detection.confidence, ConfidenceLevel::High);
        assert_eq!(serde_json::to_value(detection.confidence).unwrap(), "high");

        let odd: DetectionResult = serde_json::from_str(r#"{"confidence":"Very High"}"#).unwrap();
        assert_eq!(odd.confidence, ConfidenceLevel::Low);
    }
}
