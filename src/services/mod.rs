// DraftCheck Core Services
// Text processing, remote detection, aggregation, persistence and the submission lifecycle

pub mod text_processor;
pub mod config_store;
pub mod detector_client;
pub mod detection;
pub mod store;
pub mod submission;

pub use config_store::{AppConfig, ConfigStore, DetectionConfig, DetectorConfig, DocumentFallback};
pub use detector_client::{DetectorBackend, DetectorClient, DetectorError};
pub use store::{InMemoryStore, StoreError, SubmissionStore};
pub use submission::{display_confidence, LifecycleError, SubmissionLifecycle};

// Re-export detection module functions
pub use detection::{
    revision_diff,
    score_document,
    score_sentence,
    severity_for,
    similarity,
    AnalysisError,
    DetectionAggregator,
};
