// Record Store
// Persistence boundary for submissions, detection records, reflections and rubrics.
//
// The production store lives outside this crate; `InMemoryStore` backs the CLI
// and the tests.

use crate::models::{AssignmentRef, DetectionRecord, Reflection, RubricEvaluation, Submission};
use async_trait::async_trait;
use std::collections::HashMap;
use thiserror::Error;
use tokio::sync::RwLock;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Store backend error: {0}")]
    Backend(String),
}

#[async_trait]
pub trait SubmissionStore: Send + Sync {
    async fn find_assignment(&self, assignment_id: &str) -> Result<Option<AssignmentRef>, StoreError>;

    async fn find_submission(
        &self,
        student_id: &str,
        assignment_id: &str,
    ) -> Result<Option<Submission>, StoreError>;

    async fn get_submission(&self, submission_id: &str) -> Result<Option<Submission>, StoreError>;

    /// Submissions against assignments owned by `faculty_id`, newest first.
    async fn list_faculty_submissions(&self, faculty_id: &str) -> Result<Vec<Submission>, StoreError>;

    async fn create_submission(&self, submission: Submission) -> Result<Submission, StoreError>;

    async fn update_submission(&self, submission: Submission) -> Result<Submission, StoreError>;

    /// Delete a submission together with everything it owns.
    async fn delete_submission(&self, submission_id: &str) -> Result<bool, StoreError>;

    /// Append a detection record. Records are never updated.
    async fn insert_detection(&self, record: DetectionRecord) -> Result<(), StoreError>;

    /// Detection records for a submission, oldest first.
    async fn list_detections(&self, submission_id: &str) -> Result<Vec<DetectionRecord>, StoreError>;

    async fn find_reflection(&self, submission_id: &str) -> Result<Option<Reflection>, StoreError>;

    async fn save_reflection(&self, reflection: Reflection) -> Result<Reflection, StoreError>;

    async fn find_rubric(&self, submission_id: &str) -> Result<Option<RubricEvaluation>, StoreError>;

    async fn save_rubric(&self, rubric: RubricEvaluation) -> Result<RubricEvaluation, StoreError>;
}

#[derive(Default)]
struct Tables {
    assignments: HashMap<String, AssignmentRef>,
    submissions: HashMap<String, Submission>,
    detections: Vec<DetectionRecord>,
    reflections: HashMap<String, Reflection>,
    rubrics: HashMap<String, RubricEvaluation>,
}

#[derive(Default)]
pub struct InMemoryStore {
    tables: RwLock<Tables>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn add_assignment(&self, assignment: AssignmentRef) {
        let mut tables = self.tables.write().await;
        tables
            .assignments
            .insert(assignment.assignment_id.clone(), assignment);
    }
}

#[async_trait]
impl SubmissionStore for InMemoryStore {
    async fn find_assignment(&self, assignment_id: &str) -> Result<Option<AssignmentRef>, StoreError> {
        Ok(self.tables.read().await.assignments.get(assignment_id).cloned())
    }

    async fn find_submission(
        &self,
        student_id: &str,
        assignment_id: &str,
    ) -> Result<Option<Submission>, StoreError> {
        let tables = self.tables.read().await;
        Ok(tables
            .submissions
            .values()
            .find(|s| s.student_id == student_id && s.assignment_id == assignment_id)
            .cloned())
    }

    async fn get_submission(&self, submission_id: &str) -> Result<Option<Submission>, StoreError> {
        Ok(self.tables.read().await.submissions.get(submission_id).cloned())
    }

    async fn list_faculty_submissions(&self, faculty_id: &str) -> Result<Vec<Submission>, StoreError> {
        let tables = self.tables.read().await;
        let mut rows: Vec<Submission> = tables
            .submissions
            .values()
            .filter(|s| s.faculty_id.as_deref() == Some(faculty_id))
            .cloned()
            .collect();
        rows.sort_by(|a, b| b.submission_date.cmp(&a.submission_date));
        Ok(rows)
    }

    async fn create_submission(&self, submission: Submission) -> Result<Submission, StoreError> {
        let mut tables = self.tables.write().await;
        if tables.submissions.contains_key(&submission.submission_id) {
            return Err(StoreError::Backend(format!(
                "submission {} already exists",
                submission.submission_id
            )));
        }
        tables
            .submissions
            .insert(submission.submission_id.clone(), submission.clone());
        Ok(submission)
    }

    async fn update_submission(&self, submission: Submission) -> Result<Submission, StoreError> {
        let mut tables = self.tables.write().await;
        match tables.submissions.get_mut(&submission.submission_id) {
            Some(row) => {
                *row = submission.clone();
                Ok(submission)
            }
            None => Err(StoreError::Backend(format!(
                "submission {} does not exist",
                submission.submission_id
            ))),
        }
    }

    async fn delete_submission(&self, submission_id: &str) -> Result<bool, StoreError> {
        let mut tables = self.tables.write().await;
        let existed = tables.submissions.remove(submission_id).is_some();
        tables.detections.retain(|d| d.submission_id != submission_id);
        tables.reflections.remove(submission_id);
        tables.rubrics.remove(submission_id);
        Ok(existed)
    }

    async fn insert_detection(&self, record: DetectionRecord) -> Result<(), StoreError> {
        self.tables.write().await.detections.push(record);
        Ok(())
    }

    async fn list_detections(&self, submission_id: &str) -> Result<Vec<DetectionRecord>, StoreError> {
        let tables = self.tables.read().await;
        let mut rows: Vec<DetectionRecord> = tables
            .detections
            .iter()
            .filter(|d| d.submission_id == submission_id)
            .cloned()
            .collect();
        // Stable sort keeps insertion order for equal timestamps.
        rows.sort_by_key(|d| d.created_at);
        Ok(rows)
    }

    async fn find_reflection(&self, submission_id: &str) -> Result<Option<Reflection>, StoreError> {
        Ok(self.tables.read().await.reflections.get(submission_id).cloned())
    }

    async fn save_reflection(&self, reflection: Reflection) -> Result<Reflection, StoreError> {
        self.tables
            .write()
            .await
            .reflections
            .insert(reflection.submission_id.clone(), reflection.clone());
        Ok(reflection)
    }

    async fn find_rubric(&self, submission_id: &str) -> Result<Option<RubricEvaluation>, StoreError> {
        Ok(self.tables.read().await.rubrics.get(submission_id).cloned())
    }

    async fn save_rubric(&self, rubric: RubricEvaluation) -> Result<RubricEvaluation, StoreError> {
        self.tables
            .write()
            .await
            .rubrics
            .insert(rubric.submission_id.clone(), rubric.clone());
        Ok(rubric)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{DetectionResult, Stage, SubmissionStatus};
    use chrono::{Duration, Utc};

    fn submission(id: &str) -> Submission {
        let now = Utc::now();
        Submission {
            submission_id: id.to_string(),
            assignment_id: "A1".to_string(),
            student_id: "S1".to_string(),
            faculty_id: None,
            status: SubmissionStatus::Draft,
            draft_content: None,
            final_content: None,
            uses_ai: false,
            ai_detected: false,
            ai_confidence: 0.0,
            submission_date: now,
            created_at: now,
            updated_at: now,
        }
    }

    fn record(id: &str, submission_id: &str, offset_secs: i64) -> DetectionRecord {
        DetectionRecord {
            id: id.to_string(),
            submission_id: submission_id.to_string(),
            stage: Stage::Draft,
            result: DetectionResult::default(),
            created_at: Utc::now() + Duration::seconds(offset_secs),
        }
    }

    #[tokio::test]
    async fn test_create_find_and_update() {
        let store = InMemoryStore::new();
        store.create_submission(submission("SUB1")).await.unwrap();
        assert!(store.create_submission(submission("SUB1")).await.is_err());

        let mut found = store.find_submission("S1", "A1").await.unwrap().unwrap();
        found.status = SubmissionStatus::Submitted;
        store.update_submission(found).await.unwrap();
        let reread = store.get_submission("SUB1").await.unwrap().unwrap();
        assert_eq!(reread.status, SubmissionStatus::Submitted);

        assert!(store.update_submission(submission("missing")).await.is_err());
    }

    #[tokio::test]
    async fn test_detections_listed_oldest_first() {
        let store = InMemoryStore::new();
        store.insert_detection(record("late", "SUB1", 10)).await.unwrap();
        store.insert_detection(record("early", "SUB1", -10)).await.unwrap();
        store.insert_detection(record("other", "SUB2", 0)).await.unwrap();

        let rows = store.list_detections("SUB1").await.unwrap();
        let ids: Vec<&str> = rows.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["early", "late"]);
    }

    #[tokio::test]
    async fn test_faculty_listing_filters_by_owner() {
        let store = InMemoryStore::new();
        let mut owned = submission("SUB1");
        owned.faculty_id = Some("F1".to_string());
        store.create_submission(owned).await.unwrap();
        store.create_submission(submission("SUB2")).await.unwrap();

        let rows = store.list_faculty_submissions("F1").await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].submission_id, "SUB1");
        assert!(store.list_faculty_submissions("F2").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_delete_cascades_owned_rows() {
        let store = InMemoryStore::new();
        store.create_submission(submission("SUB1")).await.unwrap();
        store.insert_detection(record("d1", "SUB1", 0)).await.unwrap();

        assert!(store.delete_submission("SUB1").await.unwrap());
        assert!(store.list_detections("SUB1").await.unwrap().is_empty());
        assert!(!store.delete_submission("SUB1").await.unwrap());
    }
}
