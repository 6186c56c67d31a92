// Submission Lifecycle
// Draft -> Submitted -> Graded, with detection records attached per stage.
//
// Detection records are append-only. A failed record write is logged and does
// not fail the submission update.

use crate::models::{
    AlertSummary, DetectionRecord, DetectionResult, FacultySubmissionView, Reflection, RubricEvaluation,
    Stage, Submission, SubmissionStageRequest, SubmissionStatus, SubmissionStep,
};
use crate::services::detection::severity::build_alert_summary;
use crate::services::store::{StoreError, SubmissionStore};
use crate::services::text_processor::count_words;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use thiserror::Error;
use tracing::{error, info, warn};
use uuid::Uuid;

#[derive(Error, Debug)]
pub enum LifecycleError {
    #[error("{0}")]
    Validation(String),
    #[error("{0} not found")]
    NotFound(String),
    #[error("Cannot {action} a submission in status {status}")]
    InvalidTransition {
        action: &'static str,
        status: &'static str,
    },
    #[error("Persistence failed: {0}")]
    Persistence(#[from] StoreError),
}

pub struct SubmissionLifecycle {
    store: Arc<dyn SubmissionStore>,
    ai_usage_threshold: f64,
}

impl SubmissionLifecycle {
    pub fn new(store: Arc<dyn SubmissionStore>, ai_usage_threshold: f64) -> Self {
        Self {
            store,
            ai_usage_threshold,
        }
    }

    /// Route a stage payload to the matching transition.
    pub async fn apply_stage(
        &self,
        student_id: &str,
        request: &SubmissionStageRequest,
    ) -> Result<Submission, LifecycleError> {
        match request.step {
            SubmissionStep::Draft => {
                self.save_draft(
                    student_id,
                    &request.assignment_id,
                    &request.content,
                    request.ai_detection.clone(),
                )
                .await
            }
            SubmissionStep::Reflection => {
                self.save_reflection(student_id, &request.assignment_id, &request.content)
                    .await
            }
            SubmissionStep::Final => {
                self.submit_final(
                    student_id,
                    &request.assignment_id,
                    &request.content,
                    request.ai_detection.clone(),
                )
                .await
            }
        }
    }

    /// Save draft content, creating the submission on first save.
    pub async fn save_draft(
        &self,
        student_id: &str,
        assignment_id: &str,
        content: &str,
        detection: Option<DetectionResult>,
    ) -> Result<Submission, LifecycleError> {
        require("Student ID", student_id)?;
        require("Assignment ID", assignment_id)?;

        let now = Utc::now();
        let existing = self.store.find_submission(student_id, assignment_id).await?;

        let saved = match existing {
            Some(mut submission) => {
                if submission.status != SubmissionStatus::Draft {
                    return Err(LifecycleError::InvalidTransition {
                        action: "save a draft for",
                        status: submission.status.as_str(),
                    });
                }
                submission.draft_content = Some(content.to_string());
                submission.updated_at = now;
                if let Some(result) = &detection {
                    self.apply_detection(&mut submission, result);
                }
                self.store.update_submission(submission).await?
            }
            None => {
                let assignment = self
                    .store
                    .find_assignment(assignment_id)
                    .await?
                    .ok_or_else(|| LifecycleError::NotFound(format!("Assignment {}", assignment_id)))?;

                let mut submission = Submission {
                    submission_id: format!("SUB_{}", Uuid::new_v4().simple()),
                    assignment_id: assignment_id.to_string(),
                    student_id: student_id.to_string(),
                    faculty_id: Some(assignment.faculty_id),
                    status: SubmissionStatus::Draft,
                    draft_content: Some(content.to_string()),
                    final_content: None,
                    uses_ai: false,
                    ai_detected: false,
                    ai_confidence: 0.0,
                    submission_date: now,
                    created_at: now,
                    updated_at: now,
                };
                if let Some(result) = &detection {
                    self.apply_detection(&mut submission, result);
                }
                let created = self.store.create_submission(submission).await?;
                info!(submission_id = %created.submission_id, "submission.created");
                created
            }
        };

        if let Some(result) = detection {
            self.record_detection(&saved.submission_id, Stage::Draft, result).await;
        }
        info!(submission_id = %saved.submission_id, uses_ai = saved.uses_ai, "submission.draft_saved");
        Ok(saved)
    }

    /// Upsert the reflection attached to an existing submission. Status is unchanged.
    pub async fn save_reflection(
        &self,
        student_id: &str,
        assignment_id: &str,
        content: &str,
    ) -> Result<Submission, LifecycleError> {
        require("Student ID", student_id)?;
        require("Assignment ID", assignment_id)?;

        let submission = self.require_submission(student_id, assignment_id).await?;
        let now = Utc::now();

        let reflection = match self.store.find_reflection(&submission.submission_id).await? {
            Some(mut existing) => {
                existing.content = content.to_string();
                existing.words = count_words(content);
                existing.updated_at = now;
                existing
            }
            None => Reflection {
                reflection_id: format!("REF_{}", Uuid::new_v4().simple()),
                submission_id: submission.submission_id.clone(),
                student_id: student_id.to_string(),
                content: content.to_string(),
                words: count_words(content),
                created_at: now,
                updated_at: now,
            },
        };
        self.store.save_reflection(reflection).await?;
        info!(submission_id = %submission.submission_id, "submission.reflection_saved");
        Ok(submission)
    }

    /// Save final content and move the submission to Submitted.
    /// The submission must already exist from a draft save.
    pub async fn submit_final(
        &self,
        student_id: &str,
        assignment_id: &str,
        content: &str,
        detection: Option<DetectionResult>,
    ) -> Result<Submission, LifecycleError> {
        require("Student ID", student_id)?;
        require("Assignment ID", assignment_id)?;

        let mut submission = self.require_submission(student_id, assignment_id).await?;
        if submission.status != SubmissionStatus::Draft {
            return Err(LifecycleError::InvalidTransition {
                action: "submit",
                status: submission.status.as_str(),
            });
        }

        let now = Utc::now();
        submission.final_content = Some(content.to_string());
        submission.status = SubmissionStatus::Submitted;
        submission.submission_date = now;
        submission.updated_at = now;
        if let Some(result) = &detection {
            self.apply_detection(&mut submission, result);
        }
        let saved = self.store.update_submission(submission).await?;

        if let Some(result) = detection {
            self.record_detection(&saved.submission_id, Stage::Final, result).await;
        }
        info!(submission_id = %saved.submission_id, uses_ai = saved.uses_ai, "submission.submitted");
        Ok(saved)
    }

    /// Record the faculty rubric and move a Submitted submission to Graded.
    pub async fn grade(
        &self,
        submission_id: &str,
        mut rubric: RubricEvaluation,
    ) -> Result<Submission, LifecycleError> {
        require("Submission ID", submission_id)?;
        require("Faculty ID", &rubric.faculty_id)?;

        let mut submission = self
            .store
            .get_submission(submission_id)
            .await?
            .ok_or_else(|| LifecycleError::NotFound(format!("Submission {}", submission_id)))?;
        if submission.status != SubmissionStatus::Submitted {
            return Err(LifecycleError::InvalidTransition {
                action: "grade",
                status: submission.status.as_str(),
            });
        }

        rubric.rubric_id = match self.store.find_rubric(submission_id).await? {
            Some(existing) => existing.rubric_id,
            None => format!("RUB_{}", Uuid::new_v4().simple()),
        };
        rubric.submission_id = submission_id.to_string();
        rubric.assessment_date = Utc::now();
        self.store.save_rubric(rubric).await?;

        submission.status = SubmissionStatus::Graded;
        submission.updated_at = Utc::now();
        let saved = self.store.update_submission(submission).await?;
        info!(submission_id = %saved.submission_id, "submission.graded");
        Ok(saved)
    }

    pub async fn detections_for(&self, submission_id: &str) -> Result<Vec<DetectionRecord>, LifecycleError> {
        Ok(self.store.list_detections(submission_id).await?)
    }

    pub async fn latest_detection(&self, submission_id: &str) -> Result<Option<DetectionRecord>, LifecycleError> {
        Ok(self.store.list_detections(submission_id).await?.pop())
    }

    /// Faculty list rows with the display confidence resolved.
    pub async fn faculty_submissions(
        &self,
        faculty_id: &str,
    ) -> Result<Vec<FacultySubmissionView>, LifecycleError> {
        require("Faculty ID", faculty_id)?;
        let submissions = self.store.list_faculty_submissions(faculty_id).await?;
        let mut rows = Vec::with_capacity(submissions.len());
        for submission in submissions {
            let latest = self.latest_detection(&submission.submission_id).await?;
            let ai_score = display_confidence(&submission, latest.as_ref());
            rows.push(FacultySubmissionView { submission, ai_score });
        }
        Ok(rows)
    }

    /// Severity alerts over a faculty member's submissions, banded on the
    /// latest detection record of each. Submissions never analysed are skipped.
    pub async fn alert_summary(&self, faculty_id: &str) -> Result<AlertSummary, LifecycleError> {
        require("Faculty ID", faculty_id)?;
        let submissions = self.store.list_faculty_submissions(faculty_id).await?;
        let mut entries = Vec::with_capacity(submissions.len());
        for submission in submissions {
            if let Some(latest) = self.latest_detection(&submission.submission_id).await? {
                entries.push((submission, latest.result.ai_likelihood));
            }
        }
        let summary = build_alert_summary(&entries);
        info!(
            faculty_id = %faculty_id,
            flagged = summary.counts.total(),
            critical = summary.counts.critical,
            "submission.alert_summary"
        );
        Ok(summary)
    }

    fn apply_detection(&self, submission: &mut Submission, result: &DetectionResult) {
        let uses_ai = result.ai_likelihood >= self.ai_usage_threshold;
        submission.uses_ai = uses_ai;
        submission.ai_detected = uses_ai;
        submission.ai_confidence = result.ai_likelihood / 100.0;
    }

    async fn record_detection(&self, submission_id: &str, stage: Stage, mut result: DetectionResult) {
        let now = Utc::now();
        // Client-supplied results may omit the timestamp.
        if result.timestamp == DateTime::<Utc>::default() {
            result.timestamp = now;
        }
        let record = DetectionRecord {
            id: format!("DET_{}", Uuid::new_v4().simple()),
            submission_id: submission_id.to_string(),
            stage,
            result,
            created_at: now,
        };
        if let Err(e) = self.store.insert_detection(record).await {
            error!(
                submission_id = %submission_id,
                stage = stage.as_str(),
                error = %e,
                "submission.detection_record_failed"
            );
        }
    }

    async fn require_submission(
        &self,
        student_id: &str,
        assignment_id: &str,
    ) -> Result<Submission, LifecycleError> {
        match self.store.find_submission(student_id, assignment_id).await? {
            Some(submission) => Ok(submission),
            None => {
                warn!(student_id = %student_id, assignment_id = %assignment_id, "submission.missing");
                Err(LifecycleError::NotFound("Submission".to_string()))
            }
        }
    }
}

/// Percent shown in faculty views: the submission's own confidence when it
/// carries one, otherwise the latest detection record. Capped at 100.
pub fn display_confidence(submission: &Submission, latest: Option<&DetectionRecord>) -> u32 {
    let percent = if submission.ai_confidence != 0.0 {
        (submission.ai_confidence * 100.0).round()
    } else {
        latest.map(|r| r.result.ai_likelihood.round()).unwrap_or(0.0)
    };
    percent.clamp(0.0, 100.0) as u32
}

fn require(field: &str, value: &str) -> Result<(), LifecycleError> {
    if value.trim().is_empty() {
        return Err(LifecycleError::Validation(format!("{} is required", field)));
    }
    Ok(())
}
