// API Error
// One error type for every handler, with its HTTP status and JSON body.

use crate::services::detection::aggregation::AnalysisError;
use crate::services::detector_client::DetectorError;
use crate::services::submission::LifecycleError;
use serde::Serialize;
use uuid::Uuid;

/// Body returned to clients for any failed request.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
    pub request_id: String,
}

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    NotFound(String),

    /// The submission is in a state that does not allow the requested step.
    #[error("{0}")]
    Conflict(String),

    #[error("{0}")]
    DetectorUnavailable(String),

    #[error("Internal server error: {0}")]
    Internal(String),
}

impl ApiError {
    pub fn status_code(&self) -> u16 {
        match self {
            ApiError::BadRequest(_) => 400,
            ApiError::NotFound(_) => 404,
            ApiError::Conflict(_) => 409,
            ApiError::DetectorUnavailable(_) => 503,
            ApiError::Internal(_) => 500,
        }
    }

    pub fn error_type(&self) -> &'static str {
        match self {
            ApiError::BadRequest(_) => "bad_request",
            ApiError::NotFound(_) => "not_found",
            ApiError::Conflict(_) => "conflict",
            ApiError::DetectorUnavailable(_) => "detector_unavailable",
            ApiError::Internal(_) => "internal_error",
        }
    }

    /// Log the failure and build the client-facing body.
    pub fn to_response(&self) -> ErrorResponse {
        let request_id = Uuid::new_v4().to_string();
        let status = self.status_code();
        if status >= 500 {
            tracing::error!(
                error_type = self.error_type(),
                status,
                request_id = %request_id,
                message = %self,
                "API error"
            );
        } else {
            tracing::warn!(
                error_type = self.error_type(),
                status,
                request_id = %request_id,
                message = %self,
                "API request rejected"
            );
        }

        ErrorResponse {
            error: self.error_type().to_string(),
            message: self.to_string(),
            request_id,
        }
    }
}

// ============ From conversions for service errors ============

impl From<AnalysisError> for ApiError {
    fn from(err: AnalysisError) -> Self {
        match err {
            AnalysisError::Validation(msg) => ApiError::BadRequest(msg),
            AnalysisError::Unavailable(_) => ApiError::DetectorUnavailable(err.to_string()),
        }
    }
}

impl From<LifecycleError> for ApiError {
    fn from(err: LifecycleError) -> Self {
        match err {
            LifecycleError::Validation(msg) => ApiError::BadRequest(msg),
            LifecycleError::NotFound(_) => ApiError::NotFound(err.to_string()),
            LifecycleError::InvalidTransition { .. } => ApiError::Conflict(err.to_string()),
            LifecycleError::Persistence(e) => ApiError::Internal(e.to_string()),
        }
    }
}

impl From<DetectorError> for ApiError {
    fn from(err: DetectorError) -> Self {
        ApiError::Internal(format!("Detector client setup failed: {}", err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::store::StoreError;

    #[test]
    fn test_analysis_errors_map_to_status() {
        let unavailable: ApiError =
            AnalysisError::Unavailable(DetectorError::Unavailable("timeout".to_string())).into();
        assert_eq!(unavailable.status_code(), 503);
        assert!(unavailable.to_string().contains("try again"));

        let invalid: ApiError = AnalysisError::Validation("Text is required".to_string()).into();
        assert_eq!(invalid.status_code(), 400);
    }

    #[test]
    fn test_lifecycle_errors_map_to_status() {
        let cases: Vec<(LifecycleError, u16)> = vec![
            (LifecycleError::Validation("x".to_string()), 400),
            (LifecycleError::NotFound("Submission".to_string()), 404),
            (
                LifecycleError::InvalidTransition {
                    action: "grade",
                    status: "Draft",
                },
                409,
            ),
            (LifecycleError::Persistence(StoreError::Backend("down".to_string())), 500),
        ];
        for (err, status) in cases {
            assert_eq!(ApiError::from(err).status_code(), status);
        }
    }

    #[test]
    fn test_error_response_shape() {
        let body = ApiError::NotFound("Submission not found".to_string()).to_response();
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["error"], "not_found");
        assert_eq!(json["message"], "Submission not found");
        assert_eq!(json["requestId"].as_str().unwrap().len(), 36);
    }
}
