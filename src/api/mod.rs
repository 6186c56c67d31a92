// API Surface
// Request handlers served to the dashboard: document and sentence detection,
// submission stage updates, grading and faculty views.

pub mod error;

pub use error::{ApiError, ErrorResponse};

use crate::models::{
    AlertSummary, DetectionRecord, DetectionResult, DocumentDetectRequest, FacultySubmissionView,
    RubricEvaluation, SentenceAnalysisResponse, SentenceDetectRequest, SubmissionStageRequest,
    SubmissionUpdateResponse,
};
use crate::services::config_store::AppConfig;
use crate::services::detection::aggregation::{AggregatorSettings, DetectionAggregator};
use crate::services::detector_client::{DetectorBackend, DetectorClient};
use crate::services::store::SubmissionStore;
use crate::services::submission::SubmissionLifecycle;
use std::sync::Arc;
use std::time::Instant;
use tracing::info;

pub struct DraftCheckApi {
    aggregator: DetectionAggregator,
    lifecycle: SubmissionLifecycle,
    significant_change_threshold: f64,
}

impl DraftCheckApi {
    pub fn new(
        config: &AppConfig,
        backend: Arc<dyn DetectorBackend>,
        store: Arc<dyn SubmissionStore>,
    ) -> Self {
        Self {
            aggregator: DetectionAggregator::new(backend, AggregatorSettings::from_config(config)),
            lifecycle: SubmissionLifecycle::new(store, config.detection.ai_usage_threshold),
            significant_change_threshold: config.detection.significant_change_threshold,
        }
    }

    /// Build against the HTTP detector named in `config`.
    pub fn from_config(config: &AppConfig, store: Arc<dyn SubmissionStore>) -> Result<Self, ApiError> {
        let client = DetectorClient::new(&config.detector)?;
        Ok(Self::new(config, Arc::new(client), store))
    }

    /// Document-level detection. Nothing is persisted here; the result is
    /// attached to a submission by a later stage update.
    pub async fn detect_ai(&self, request: DocumentDetectRequest) -> Result<DetectionResult, ApiError> {
        if request.text.trim().is_empty() {
            return Err(ApiError::BadRequest("Text is required".to_string()));
        }
        let started = Instant::now();
        let previous = request
            .previous_text
            .as_deref()
            .filter(|p| !p.trim().is_empty());

        let mut result = self.aggregator.analyze_document(&request.text, previous).await?;
        if previous.is_some() {
            result.significantly_modified = result.significantly_modified
                || result.percentage_change >= self.significant_change_threshold;
        }
        if result.processing_time.is_none() {
            result.processing_time = Some(started.elapsed().as_secs_f64());
        }
        Ok(result)
    }

    pub async fn detect_sentences(
        &self,
        request: SentenceDetectRequest,
    ) -> Result<SentenceAnalysisResponse, ApiError> {
        if request.text.trim().is_empty() {
            return Err(ApiError::BadRequest("Text is required".to_string()));
        }
        Ok(self.aggregator.analyze_sentences(&request.text).await?)
    }

    pub async fn update_submission(
        &self,
        student_id: &str,
        request: SubmissionStageRequest,
    ) -> Result<SubmissionUpdateResponse, ApiError> {
        if student_id.trim().is_empty() {
            return Err(ApiError::BadRequest("Student ID is required".to_string()));
        }
        if request.assignment_id.trim().is_empty() {
            return Err(ApiError::BadRequest("Assignment ID is required".to_string()));
        }

        let submission = self.lifecycle.apply_stage(student_id, &request).await?;
        info!(
            submission_id = %submission.submission_id,
            step = ?request.step,
            status = submission.status.as_str(),
            "api.submission_updated"
        );
        Ok(SubmissionUpdateResponse {
            success: true,
            submission,
        })
    }

    pub async fn grade_submission(
        &self,
        submission_id: &str,
        rubric: RubricEvaluation,
    ) -> Result<SubmissionUpdateResponse, ApiError> {
        let submission = self.lifecycle.grade(submission_id, rubric).await?;
        Ok(SubmissionUpdateResponse {
            success: true,
            submission,
        })
    }

    pub async fn submission_detections(&self, submission_id: &str) -> Result<Vec<DetectionRecord>, ApiError> {
        if submission_id.trim().is_empty() {
            return Err(ApiError::BadRequest("Submission ID is required".to_string()));
        }
        Ok(self.lifecycle.detections_for(submission_id).await?)
    }

    pub async fn faculty_submissions(&self, faculty_id: &str) -> Result<Vec<FacultySubmissionView>, ApiError> {
        Ok(self.lifecycle.faculty_submissions(faculty_id).await?)
    }

    pub async fn faculty_alerts(&self, faculty_id: &str) -> Result<AlertSummary, ApiError> {
        Ok(self.lifecycle.alert_summary(faculty_id).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{AssignmentRef, SubmissionStatus, SubmissionStep};
    use crate::services::detector_client::{DetectorError, RemoteDocumentPayload, RemoteSentencePayload};
    use crate::services::store::InMemoryStore;
    use async_trait::async_trait;

    struct FixedDetector {
        document: Option<RemoteDocumentPayload>,
    }

    #[async_trait]
    impl DetectorBackend for FixedDetector {
        async fn detect_document(
            &self,
            _text: &str,
            _previous_text: Option<&str>,
        ) -> Result<RemoteDocumentPayload, DetectorError> {
            self.document.clone().ok_or(DetectorError::Api {
                status: 500,
                body: "boom".to_string(),
            })
        }

        async fn detect_sentence(&self, _text: &str) -> Result<RemoteSentencePayload, DetectorError> {
            Err(DetectorError::Unavailable("offline".to_string()))
        }
    }

    async fn api(document: Option<RemoteDocumentPayload>) -> (Arc<InMemoryStore>, DraftCheckApi) {
        let store = Arc::new(InMemoryStore::new());
        store
            .add_assignment(AssignmentRef {
                assignment_id: "A1".to_string(),
                faculty_id: "F1".to_string(),
            })
            .await;
        let api = DraftCheckApi::new(
            &AppConfig::default(),
            Arc::new(FixedDetector { document }),
            store.clone(),
        );
        (store, api)
    }

    fn detect_request(text: &str, previous: Option<&str>) -> DocumentDetectRequest {
        DocumentDetectRequest {
            text: text.to_string(),
            previous_text: previous.map(str::to_string),
        }
    }

    #[tokio::test]
    async fn test_detect_ai_http_500_surfaces_unavailable() {
        let (store, api) = api(None).await;
        let err = api
            .detect_ai(detect_request("An essay body that needs a score.", None))
            .await
            .unwrap_err();
        assert_eq!(err.status_code(), 503);
        assert!(err.to_response().message.contains("try again"));
        assert!(store.list_faculty_submissions("F1").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_detect_ai_applies_significance_threshold() {
        let payload = RemoteDocumentPayload {
            ai_likelihood: 30.0,
            ..RemoteDocumentPayload::default()
        };
        let (_, api) = api(Some(payload)).await;

        let changed = api
            .detect_ai(detect_request("entirely different words now", Some("old essay text")))
            .await
            .unwrap();
        assert_eq!(changed.percentage_change, 100.0);
        assert!(changed.significantly_modified);

        let same = api
            .detect_ai(detect_request("the same essay text", Some("the same essay text")))
            .await
            .unwrap();
        assert_eq!(same.percentage_change, 0.0);
        assert!(!same.significantly_modified);
    }

    #[tokio::test]
    async fn test_detect_rejects_empty_text() {
        let (_, api) = api(None).await;
        let err = api.detect_ai(detect_request("  ", None)).await.unwrap_err();
        assert_eq!(err.status_code(), 400);
        let err = api
            .detect_sentences(SentenceDetectRequest { text: String::new() })
            .await
            .unwrap_err();
        assert_eq!(err.status_code(), 400);
    }

    #[tokio::test]
    async fn test_detect_sentences_falls_back_silently() {
        let (_, api) = api(None).await;
        let resp = api
            .detect_sentences(SentenceDetectRequest {
                text: "I love this topic. AI is important to note and very beneficial for society.".to_string(),
            })
            .await
            .unwrap();
        assert_eq!(resp.total_sentences, 2);
        assert_eq!(resp.ai_sentences, 1);
    }

    #[tokio::test]
    async fn test_update_submission_flow_and_status_codes() {
        let (_, api) = api(None).await;
        let mut request = SubmissionStageRequest {
            assignment_id: "A1".to_string(),
            step: SubmissionStep::Final,
            content: "final".to_string(),
            ai_detection: None,
        };
        let err = api.update_submission("S1", request.clone()).await.unwrap_err();
        assert_eq!(err.status_code(), 404);

        request.step = SubmissionStep::Draft;
        let resp = api.update_submission("S1", request.clone()).await.unwrap();
        assert!(resp.success);
        assert_eq!(resp.submission.status, SubmissionStatus::Draft);

        request.step = SubmissionStep::Final;
        api.update_submission("S1", request.clone()).await.unwrap();
        let err = api.update_submission("S1", request.clone()).await.unwrap_err();
        assert_eq!(err.status_code(), 409);

        request.assignment_id = " ".to_string();
        let err = api.update_submission("S1", request).await.unwrap_err();
        assert_eq!(err.status_code(), 400);
    }

    #[tokio::test]
    async fn test_empty_draft_content_is_saved() {
        let (_, api) = api(None).await;
        let request = SubmissionStageRequest {
            assignment_id: "A1".to_string(),
            step: SubmissionStep::Draft,
            content: String::new(),
            ai_detection: None,
        };
        let resp = api.update_submission("S1", request).await.unwrap();
        assert_eq!(resp.submission.draft_content.as_deref(), Some(""));
        assert_eq!(resp.submission.status, SubmissionStatus::Draft);
    }

    #[tokio::test]
    async fn test_request_json_shape() {
        let json = r#"{"assignmentId":"A1","step":"draft","content":"hello","aiDetection":{"aiLikelihood":64,"humanLikelihood":36}}"#;
        let request: SubmissionStageRequest = serde_json::from_str(json).unwrap();
        let (_, api) = api(None).await;
        let resp = api.update_submission("S1", request).await.unwrap();
        let body = serde_json::to_value(&resp).unwrap();
        assert_eq!(body["success"], true);
        assert_eq!(body["submission"]["usesAi"], true);
        assert_eq!(body["submission"]["aiConfidence"], 0.64);
        assert_eq!(body["submission"]["status"], "Draft");
    }
}
