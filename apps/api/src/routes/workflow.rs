//! Per-sample workflow view and system-wide status (spec.md §6
//! `GET /api/samples/{id}/workflow`, `GET /api/workflow/status`).

use std::collections::HashMap;

use axum::extract::{Path, State};
use chrono::{DateTime, Utc};
use serde::Serialize;
use utoipa::ToSchema;

use nanopore_db::{SampleRepository, StepRepository};
use nanopore_domain::{
    Priority, SampleId, SampleStatus, SampleType, StepStatus, WorkflowStage,
};

use crate::error::{ApiError, SuccessEnvelope};
use crate::state::AppState;

#[derive(Debug, Serialize, ToSchema)]
pub struct SampleView {
    pub sample_id: String,
    pub submission_id: String,
    pub sample_number: i32,
    pub sample_name: String,
    pub sample_type: SampleType,
    pub workflow_stage: WorkflowStage,
    pub status: SampleStatus,
    pub priority: Priority,
    pub assignee: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct StepView {
    pub step_id: String,
    pub step_name: WorkflowStage,
    pub step_order: i16,
    pub step_status: StepStatus,
    pub assignee: Option<String>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub estimated_duration_hours: f64,
    pub actual_duration_hours: Option<f64>,
    pub qc_passed: Option<bool>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct SampleWorkflowResponse {
    pub sample: SampleView,
    pub steps: Vec<StepView>,
}

/// A sample's full eight-step workflow, in pipeline order.
#[utoipa::path(
    get,
    path = "/samples/{sample_id}/workflow",
    tag = "workflow",
    params(("sample_id" = String, Path, description = "Sample ID, e.g. sample_01234...")),
    responses(
        (status = 200, description = "Sample and its processing steps", body = SampleWorkflowResponse),
        (status = 404, description = "Sample not found")
    )
)]
pub async fn get_sample_workflow(
    State(state): State<AppState>,
    Path(sample_id): Path<SampleId>,
) -> Result<SuccessEnvelope<SampleWorkflowResponse>, ApiError> {
    let sample = state
        .samples
        .get_sample(&sample_id)
        .await
        .map_err(|e| ApiError::TransientBackend(e.to_string()))?
        .ok_or_else(|| ApiError::NotFound(format!("sample {sample_id} not found")))?;

    let mut steps = state
        .steps
        .get_sample_steps(&sample_id)
        .await
        .map_err(|e| ApiError::TransientBackend(e.to_string()))?;
    steps.sort_by_key(|s| s.step_order);

    let response = SampleWorkflowResponse {
        sample: SampleView {
            sample_id: sample.sample_id.to_string(),
            submission_id: sample.submission_id.to_string(),
            sample_number: sample.sample_number,
            sample_name: sample.sample_name,
            sample_type: sample.sample_type,
            workflow_stage: sample.workflow_stage,
            status: sample.status,
            priority: sample.priority,
            assignee: sample.assignee,
            created_at: sample.created_at,
            updated_at: sample.updated_at,
        },
        steps: steps
            .into_iter()
            .map(|s| StepView {
                step_id: s.step_id.to_string(),
                step_name: s.step_name,
                step_order: s.step_order,
                step_status: s.step_status,
                assignee: s.assignee,
                started_at: s.started_at,
                completed_at: s.completed_at,
                estimated_duration_hours: s.estimated_duration_hours,
                actual_duration_hours: s.actual_duration_hours,
                qc_passed: s.qc_passed,
            })
            .collect(),
    };

    Ok(SuccessEnvelope::new(response))
}

#[derive(Debug, Serialize, ToSchema)]
pub struct WorkflowStatusResponse {
    pub total_samples: i64,
    pub active_samples: i64,
    pub completed_samples: i64,
    pub failed_steps: i64,
    pub queue_lengths: HashMap<String, usize>,
}

/// System-wide dashboard snapshot: sample counts and current queue depth
/// per stage.
#[utoipa::path(
    get,
    path = "/workflow/status",
    tag = "workflow",
    responses((status = 200, description = "System-wide workflow status", body = WorkflowStatusResponse))
)]
pub async fn get_workflow_status(
    State(state): State<AppState>,
) -> Result<SuccessEnvelope<WorkflowStatusResponse>, ApiError> {
    let sample_counts = state
        .samples
        .system_status_counts()
        .await
        .map_err(|e| ApiError::TransientBackend(e.to_string()))?;

    let failed_steps = state
        .steps
        .count_failed_steps()
        .await
        .map_err(|e| ApiError::TransientBackend(e.to_string()))?;

    let queue_lengths = WorkflowStage::ALL
        .into_iter()
        .map(|stage| (stage.as_str().to_string(), state.queues.len(stage)))
        .collect();

    Ok(SuccessEnvelope::new(WorkflowStatusResponse {
        total_samples: sample_counts.total,
        active_samples: sample_counts.active,
        completed_samples: sample_counts.completed,
        failed_steps,
        queue_lengths,
    }))
}
