//! Workflow event types published to the Event Bus (spec.md §4.7).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use nanopore_domain::{Priority, SampleId, SampleStatus, StepId, SubmissionId, WorkflowStage};

/// A notification that some workflow state change was committed to
/// Postgres. Subscribers treat these as at-least-once and must be
/// idempotent — the publisher acks on commit, not on subscriber delivery.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum WorkflowEvent {
    SampleCreated {
        sample_id: SampleId,
        submission_id: SubmissionId,
        created_at: DateTime<Utc>,
    },
    SampleUpdated {
        sample_id: SampleId,
        updated_at: DateTime<Utc>,
    },
    SampleStatusChanged {
        sample_id: SampleId,
        from: SampleStatus,
        to: SampleStatus,
        changed_at: DateTime<Utc>,
    },
    StepStarted {
        step_id: StepId,
        sample_id: SampleId,
        stage: WorkflowStage,
        started_at: DateTime<Utc>,
    },
    StepCompleted {
        step_id: StepId,
        sample_id: SampleId,
        stage: WorkflowStage,
        qc_passed: Option<bool>,
        completed_at: DateTime<Utc>,
    },
    StepFailed {
        step_id: StepId,
        sample_id: SampleId,
        stage: WorkflowStage,
        reason: String,
        failed_at: DateTime<Utc>,
    },
    PriorityChanged {
        sample_id: SampleId,
        from: Priority,
        to: Priority,
        changed_at: DateTime<Utc>,
    },
    WorkflowCompleted {
        sample_id: SampleId,
        submission_id: SubmissionId,
        completed_at: DateTime<Utc>,
    },
}

impl WorkflowEvent {
    /// Stable event-type name, also used as the trailing NATS subject token.
    #[must_use]
    pub fn event_type(&self) -> &'static str {
        match self {
            Self::SampleCreated { .. } => "sample.created",
            Self::SampleUpdated { .. } => "sample.updated",
            Self::SampleStatusChanged { .. } => "sample.status_changed",
            Self::StepStarted { .. } => "step.started",
            Self::StepCompleted { .. } => "step.completed",
            Self::StepFailed { .. } => "step.failed",
            Self::PriorityChanged { .. } => "priority.changed",
            Self::WorkflowCompleted { .. } => "workflow.completed",
        }
    }

    #[must_use]
    pub fn occurred_at(&self) -> DateTime<Utc> {
        match self {
            Self::SampleCreated { created_at, .. } => *created_at,
            Self::SampleUpdated { updated_at, .. } => *updated_at,
            Self::SampleStatusChanged { changed_at, .. } => *changed_at,
            Self::StepStarted { started_at, .. } => *started_at,
            Self::StepCompleted { completed_at, .. } => *completed_at,
            Self::StepFailed { failed_at, .. } => *failed_at,
            Self::PriorityChanged { changed_at, .. } => *changed_at,
            Self::WorkflowCompleted { completed_at, .. } => *completed_at,
        }
    }

    /// The sample this event concerns, used to key the JetStream subject
    /// (spec.md §4.7's "ordered per subject") so events about one sample
    /// are always delivered in order.
    #[must_use]
    pub fn sample_id(&self) -> SampleId {
        match self {
            Self::SampleCreated { sample_id, .. }
            | Self::SampleUpdated { sample_id, .. }
            | Self::SampleStatusChanged { sample_id, .. }
            | Self::StepStarted { sample_id, .. }
            | Self::StepCompleted { sample_id, .. }
            | Self::StepFailed { sample_id, .. }
            | Self::PriorityChanged { sample_id, .. }
            | Self::WorkflowCompleted { sample_id, .. } => *sample_id,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn event_type_names_are_stable() {
        let event = WorkflowEvent::StepCompleted {
            step_id: StepId::new(),
            sample_id: SampleId::new(),
            stage: WorkflowStage::SampleQc,
            qc_passed: Some(true),
            completed_at: Utc::now(),
        };
        assert_eq!(event.event_type(), "step.completed");
    }

    #[test]
    fn roundtrips_through_json() {
        let event = WorkflowEvent::PriorityChanged {
            sample_id: SampleId::new(),
            from: Priority::Normal,
            to: Priority::Urgent,
            changed_at: Utc::now(),
        };
        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains("priority.changed") || json.contains("priority_changed"));
        let parsed: WorkflowEvent = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.event_type(), event.event_type());
    }
}
