// Severity utilities
// Fixed AI-likelihood bands for faculty alerting, and verdict text for local results.

use crate::models::{AiAlert, AlertCounts, AlertSummary, Severity, Submission};

const CRITICAL_MIN: f64 = 90.0;
const HIGH_MIN: f64 = 70.0;
const MEDIUM_MIN: f64 = 50.0;

/// Band a document-level AI-likelihood (0-100). `None` means unflagged.
pub fn severity_for(ai_likelihood: f64) -> Option<Severity> {
    if ai_likelihood >= CRITICAL_MIN {
        Some(Severity::Critical)
    } else if ai_likelihood >= HIGH_MIN {
        Some(Severity::High)
    } else if ai_likelihood >= MEDIUM_MIN {
        Some(Severity::Medium)
    } else {
        None
    }
}

pub fn verdict_for(ai_likelihood: f64) -> &'static str {
    if ai_likelihood >= 70.0 {
        "Highly likely AI-generated"
    } else if ai_likelihood >= 50.0 {
        "Likely AI-generated"
    } else if ai_likelihood >= 30.0 {
        "Mixed signals - possibly AI-assisted"
    } else {
        "Likely human-written"
    }
}

impl AlertCounts {
    pub fn record(&mut self, severity: Severity) {
        match severity {
            Severity::Critical => self.critical += 1,
            Severity::High => self.high += 1,
            Severity::Medium => self.medium += 1,
        }
    }

    pub fn total(&self) -> usize {
        self.critical + self.high + self.medium
    }
}

/// Build the faculty alert list from submissions paired with the AI-likelihood
/// of their latest detection record. Unflagged submissions are left out;
/// alerts are ordered by likelihood, highest first.
pub fn build_alert_summary(entries: &[(Submission, f64)]) -> AlertSummary {
    let mut scored: Vec<(&Submission, f64, Severity)> = entries
        .iter()
        .filter_map(|(sub, ai)| severity_for(*ai).map(|sev| (sub, *ai, sev)))
        .collect();
    scored.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));

    let mut summary = AlertSummary::default();
    for (sub, ai, severity) in scored {
        summary.counts.record(severity);
        summary.alerts.push(AiAlert {
            submission_id: sub.submission_id.clone(),
            student_id: sub.student_id.clone(),
            assignment_id: sub.assignment_id.clone(),
            submitted_at: sub.submission_date,
            ai_confidence: ai.round().clamp(0.0, 100.0) as u32,
            severity,
        });
    }
    summary
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::SubmissionStatus;
    use chrono::Utc;

    fn submission(id: &str) -> Submission {
        let now = Utc::now();
        Submission {
            submission_id: id.to_string(),
            assignment_id: "A1".to_string(),
            student_id: format!("S-{}", id),
            faculty_id: Some("F1".to_string()),
            status: SubmissionStatus::Submitted,
            draft_content: None,
            final_content: Some("text".to_string()),
            uses_ai: true,
            ai_detected: true,
            ai_confidence: 0.0,
            submission_date: now,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_severity_bands() {
        assert_eq!(severity_for(95.0), Some(Severity::Critical));
        assert_eq!(severity_for(75.0), Some(Severity::High));
        assert_eq!(severity_for(55.0), Some(Severity::Medium));
        assert_eq!(severity_for(30.0), None);
    }

    #[test]
    fn test_severity_band_edges() {
        assert_eq!(severity_for(90.0), Some(Severity::Critical));
        assert_eq!(severity_for(89.99), Some(Severity::High));
        assert_eq!(severity_for(70.0), Some(Severity::High));
        assert_eq!(severity_for(50.0), Some(Severity::Medium));
        assert_eq!(severity_for(49.9), None);
    }

    #[test]
    fn test_verdict_for() {
        assert_eq!(verdict_for(85.0), "Highly likely AI-generated");
        assert_eq!(verdict_for(50.0), "Likely AI-generated");
        assert_eq!(verdict_for(30.0), "Mixed signals - possibly AI-assisted");
        assert_eq!(verdict_for(10.0), "Likely human-written");
    }

    #[test]
    fn test_alert_summary_orders_and_counts() {
        let entries = vec![
            (submission("a"), 55.0),
            (submission("b"), 95.0),
            (submission("c"), 20.0),
            (submission("d"), 72.4),
        ];
        let summary = build_alert_summary(&entries);
        assert_eq!(summary.counts, AlertCounts { critical: 1, high: 1, medium: 1 });
        let ids: Vec<&str> = summary.alerts.iter().map(|a| a.submission_id.as_str()).collect();
        assert_eq!(ids, vec!["b", "d", "a"]);
        assert_eq!(summary.alerts[1].ai_confidence, 72);
        assert_eq!(summary.counts.total(), 3);
    }
}
