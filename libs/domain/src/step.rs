//! The `ProcessingStep` entity and its state machine (spec.md §3, §4.6).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use typeshare::typeshare;

use crate::enums::{StepStatus, WorkflowStage};
use crate::ids::{SampleId, StepId};

/// A per-sample instance of one stage, with its own state.
#[typeshare]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessingStep {
    pub step_id: StepId,
    pub sample_id: SampleId,
    pub step_name: WorkflowStage,
    pub step_order: i16,
    pub step_status: StepStatus,
    pub assignee: Option<String>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub estimated_duration_hours: f64,
    pub actual_duration_hours: Option<f64>,
    pub notes: Option<String>,
    pub results: serde_json::Value,
    pub qc_passed: Option<bool>,
    pub qc_notes: Option<String>,
}

/// Error returned when an attempted step-status transition is not one of
/// the valid edges listed in spec.md §4.6.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("invalid step transition: {from:?} -> {to:?}")]
pub struct InvalidStepTransition {
    pub from: StepStatus,
    pub to: StepStatus,
}

/// Validate a step-status transition against the state machine in
/// spec.md §4.6. Non-listed transitions (including self-transitions) are
/// rejected.
pub fn validate_step_transition(from: StepStatus, to: StepStatus) -> Result<(), InvalidStepTransition> {
    use StepStatus::{Completed, Failed, InProgress, Pending, Skipped};

    let allowed = matches!(
        (from, to),
        (Pending, InProgress)
            | (Pending, Skipped)
            | (InProgress, Completed)
            | (InProgress, Failed)
            | (Failed, Pending)
    );

    if allowed {
        Ok(())
    } else {
        Err(InvalidStepTransition { from, to })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pending_to_in_progress_is_valid() {
        assert!(validate_step_transition(StepStatus::Pending, StepStatus::InProgress).is_ok());
    }

    #[test]
    fn pending_to_completed_is_invalid() {
        assert!(validate_step_transition(StepStatus::Pending, StepStatus::Completed).is_err());
    }

    #[test]
    fn failed_to_pending_is_valid_retry() {
        assert!(validate_step_transition(StepStatus::Failed, StepStatus::Pending).is_ok());
    }

    #[test]
    fn completed_is_terminal() {
        for to in [
            StepStatus::Pending,
            StepStatus::InProgress,
            StepStatus::Completed,
            StepStatus::Failed,
            StepStatus::Skipped,
        ] {
            assert!(validate_step_transition(StepStatus::Completed, to).is_err());
        }
    }

    #[test]
    fn skipped_is_terminal() {
        for to in [
            StepStatus::Pending,
            StepStatus::InProgress,
            StepStatus::Completed,
            StepStatus::Failed,
            StepStatus::Skipped,
        ] {
            assert!(validate_step_transition(StepStatus::Skipped, to).is_err());
        }
    }

    #[test]
    fn self_transition_is_invalid() {
        assert!(validate_step_transition(StepStatus::Pending, StepStatus::Pending).is_err());
    }
}
