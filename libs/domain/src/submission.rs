//! The `Submission` entity (spec.md §3).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use typeshare::typeshare;

use crate::enums::{Priority, SubmissionStatus};
use crate::ids::{SubmissionId, UserId};

/// A logical batch of samples sharing submitter/project metadata.
#[typeshare]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Submission {
    pub submission_id: SubmissionId,
    /// Human-readable, unique submission number (e.g. `"SUB-2026-0042"`).
    pub submission_number: String,
    pub pdf_filename: String,
    pub submitter_name: String,
    pub submitter_email: String,
    pub organization: Option<String>,
    pub project: Option<String>,
    pub priority: Priority,
    pub status: SubmissionStatus,
    pub sample_count: i32,
    pub samples_completed: i32,
    pub owner_id: UserId,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Submission {
    /// Recompute `status` from sample-status counts, per spec.md §3
    /// invariant 6.
    #[must_use]
    pub fn derive_status(
        total_samples: i32,
        completed_samples: i32,
        failed_samples: i32,
        pending_samples: i32,
    ) -> SubmissionStatus {
        if failed_samples > 0 {
            SubmissionStatus::Failed
        } else if total_samples > 0 && completed_samples == total_samples {
            SubmissionStatus::Completed
        } else if pending_samples < total_samples {
            SubmissionStatus::Processing
        } else {
            SubmissionStatus::Pending
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn failed_sample_makes_submission_failed() {
        assert_eq!(
            Submission::derive_status(3, 1, 1, 1),
            SubmissionStatus::Failed
        );
    }

    #[test]
    fn all_completed_makes_submission_completed() {
        assert_eq!(
            Submission::derive_status(3, 3, 0, 0),
            SubmissionStatus::Completed
        );
    }

    #[test]
    fn some_started_makes_submission_processing() {
        assert_eq!(
            Submission::derive_status(3, 1, 0, 1),
            SubmissionStatus::Processing
        );
    }

    #[test]
    fn all_pending_makes_submission_pending() {
        assert_eq!(
            Submission::derive_status(3, 0, 0, 3),
            SubmissionStatus::Pending
        );
    }
}
