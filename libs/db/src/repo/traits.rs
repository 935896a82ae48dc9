//! Repository trait definitions.
//!
//! These traits define the interface for data access operations; the
//! `pg_*` modules in this crate provide the PostgreSQL implementations.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use nanopore_domain::{
    Priority, ProcessingStep, Sample, SampleId, SampleQcInputs, SampleStatus, StepId, StepStatus,
    Submission, SubmissionId, SubmissionStatus, UserId, WorkflowStage,
};

use crate::pagination::{Page, Pagination};
use crate::repo::errors::*;

// =============================================================================
// Input Types
// =============================================================================

/// Input for creating a new submission.
#[derive(Debug, Clone)]
pub struct NewSubmission {
    pub submission_number: String,
    pub pdf_filename: String,
    pub submitter_name: String,
    pub submitter_email: String,
    pub organization: Option<String>,
    pub project: Option<String>,
    pub priority: Priority,
    pub owner_id: UserId,
}

/// Input for updating a submission's aggregate status (spec.md §3
/// invariant 6 — recomputed by the Submission Aggregator, not set directly).
#[derive(Debug, Clone, Default)]
pub struct SubmissionUpdate {
    pub status: Option<SubmissionStatus>,
    pub priority: Option<Priority>,
    pub sample_count: Option<i32>,
    pub samples_completed: Option<i32>,
}

/// Input for creating one sample, as part of a submission's bulk intake.
#[derive(Debug, Clone)]
pub struct NewSample {
    pub submission_id: SubmissionId,
    pub sample_number: i32,
    pub sample_name: String,
    pub sample_type: nanopore_domain::SampleType,
    pub qc_inputs: SampleQcInputs,
    pub priority: Priority,
    pub chart_field: Option<String>,
}

/// Input for updating a sample.
#[derive(Debug, Clone, Default)]
pub struct SampleUpdate {
    pub workflow_stage: Option<WorkflowStage>,
    pub status: Option<SampleStatus>,
    pub priority: Option<Priority>,
    pub assignee: Option<Option<String>>,
}

/// Input for creating one processing step.
#[derive(Debug, Clone)]
pub struct NewStep {
    pub sample_id: SampleId,
    pub step_name: WorkflowStage,
    pub step_order: i16,
    pub estimated_duration_hours: f64,
}

/// Input for updating a processing step. `None` fields are left unchanged;
/// absent vs. explicit-null is only meaningful for `Option<Option<_>>` fields.
#[derive(Debug, Clone, Default)]
pub struct StepUpdate {
    pub step_status: Option<StepStatus>,
    pub assignee: Option<Option<String>>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub actual_duration_hours: Option<f64>,
    pub notes: Option<String>,
    pub results: Option<serde_json::Value>,
    pub qc_passed: Option<Option<bool>>,
    pub qc_notes: Option<String>,
}

/// Per-status sample counts for a submission, used by the Submission
/// Aggregator to recompute `Submission::derive_status`.
#[derive(Debug, Clone, Copy, Default)]
pub struct SampleStatusCounts {
    pub total: i64,
    pub completed: i64,
    pub failed: i64,
    pub pending: i64,
}

/// System-wide sample counts, used by the `/api/workflow/status` aggregate
/// (spec.md §6). "Active" is any sample not yet `completed`, `failed` or
/// `archived`.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemSampleCounts {
    pub total: i64,
    pub active: i64,
    pub completed: i64,
}

// =============================================================================
// Repository Traits
// =============================================================================

/// Repository for submission operations (spec.md §4.2, §4.8).
#[async_trait]
pub trait SubmissionRepository: Send + Sync {
    async fn find_by_id(
        &self,
        id: &SubmissionId,
    ) -> Result<Option<Submission>, FindSubmissionError>;

    async fn create(&self, submission: &NewSubmission) -> Result<Submission, CreateSubmissionError>;

    async fn update(
        &self,
        id: &SubmissionId,
        update: &SubmissionUpdate,
    ) -> Result<Submission, UpdateSubmissionError>;

    async fn list(&self, pagination: Pagination) -> Result<Page<Submission>, ListSubmissionsError>;
}

/// Repository for sample operations (spec.md §4.2).
#[async_trait]
pub trait SampleRepository: Send + Sync {
    async fn get_sample(&self, id: &SampleId) -> Result<Option<Sample>, FindSampleError>;

    /// Insert all samples of a submission's intake in one transaction.
    async fn create_samples_bulk(
        &self,
        samples: &[NewSample],
    ) -> Result<Vec<Sample>, CreateSampleError>;

    async fn update_sample(
        &self,
        id: &SampleId,
        update: &SampleUpdate,
    ) -> Result<Sample, UpdateSampleError>;

    async fn list_by_submission(
        &self,
        submission_id: &SubmissionId,
        pagination: Pagination,
    ) -> Result<Page<Sample>, ListSamplesError>;

    /// Aggregate sample-status counts for a submission (spec.md §3 invariant 6).
    async fn count_samples_by_status(
        &self,
        submission_id: &SubmissionId,
    ) -> Result<SampleStatusCounts, ListSamplesError>;

    /// System-wide counts for the `/api/workflow/status` aggregate.
    async fn system_status_counts(&self) -> Result<SystemSampleCounts, ListSamplesError>;
}

/// Repository for processing-step operations (spec.md §4.2, §4.4, §4.5).
#[async_trait]
pub trait StepRepository: Send + Sync {
    async fn get_step(&self, id: &StepId) -> Result<Option<ProcessingStep>, FindStepError>;

    /// Insert all eight steps for a sample in one transaction.
    async fn create_steps_bulk(&self, steps: &[NewStep]) -> Result<Vec<ProcessingStep>, CreateStepError>;

    async fn get_sample_steps(
        &self,
        sample_id: &SampleId,
    ) -> Result<Vec<ProcessingStep>, ListStepsError>;

    /// The immediate prerequisite steps for `step_id`, used by the
    /// Dependency Resolver to check readiness (spec.md §4.4).
    async fn get_step_dependencies(
        &self,
        step_id: &StepId,
    ) -> Result<Vec<ProcessingStep>, FindStepError>;

    /// Pending steps for one stage, newest-submission-first tiebreak left
    /// to the caller (the Priority Queue orders these, not this query).
    async fn get_pending_steps(
        &self,
        stage: WorkflowStage,
        pagination: Pagination,
    ) -> Result<Page<ProcessingStep>, ListStepsError>;

    /// All steps currently `in_progress`, used by the reconciler to detect
    /// steps stuck past their estimated duration (spec.md §4.6).
    async fn get_in_progress_steps(&self) -> Result<Vec<ProcessingStep>, ListStepsError>;

    /// System-wide count of `failed` steps, used by the
    /// `/api/workflow/status` aggregate.
    async fn count_failed_steps(&self) -> Result<i64, ListStepsError>;

    async fn update_step(
        &self,
        id: &StepId,
        update: &StepUpdate,
    ) -> Result<ProcessingStep, UpdateStepError>;
}

/// Cross-table writes the Orchestrator needs to be atomic: a step
/// transition and the sample-row update it drives (stage advance, status
/// flip) must commit together under read-committed isolation, with the
/// sample row locked for the duration (spec.md §4.2, §5).
#[async_trait]
pub trait WorkflowRepository: Send + Sync {
    async fn update_step_and_sample(
        &self,
        step_id: &StepId,
        step_update: &StepUpdate,
        sample_id: &SampleId,
        sample_update: &SampleUpdate,
    ) -> Result<(ProcessingStep, Sample), UpdateStepError>;
}
