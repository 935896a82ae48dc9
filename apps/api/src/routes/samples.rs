//! Sample-level operator actions (spec.md §6 pause/resume/priority).

use axum::extract::{Path, State};
use serde::Deserialize;
use utoipa::ToSchema;

use nanopore_domain::{Priority, SampleId};

use crate::error::{ApiError, SuccessEnvelope};
use crate::state::AppState;

/// Pause a sample: its pending steps leave every queue and any in-progress
/// step is rolled back to `pending` after its lease is released.
#[utoipa::path(
    post,
    path = "/samples/{sample_id}/pause",
    tag = "workflow",
    params(("sample_id" = String, Path, description = "Sample ID")),
    responses(
        (status = 200, description = "Sample paused"),
        (status = 404, description = "Sample not found")
    )
)]
pub async fn pause_sample(
    State(state): State<AppState>,
    Path(sample_id): Path<SampleId>,
) -> Result<SuccessEnvelope<()>, ApiError> {
    state.orchestrator.pause_sample(&sample_id).await?;
    Ok(SuccessEnvelope::new(()))
}

/// Resume a paused sample: its first ready step is re-enqueued.
#[utoipa::path(
    post,
    path = "/samples/{sample_id}/resume",
    tag = "workflow",
    params(("sample_id" = String, Path, description = "Sample ID")),
    responses(
        (status = 200, description = "Sample resumed"),
        (status = 404, description = "Sample not found")
    )
)]
pub async fn resume_sample(
    State(state): State<AppState>,
    Path(sample_id): Path<SampleId>,
) -> Result<SuccessEnvelope<()>, ApiError> {
    state.orchestrator.resume_sample(&sample_id).await?;
    Ok(SuccessEnvelope::new(()))
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct PriorityChangeRequest {
    pub priority: Priority,
}

/// Change a sample's priority; every still-pending step is reordered in
/// its stage's queue to reflect the new priority immediately.
#[utoipa::path(
    patch,
    path = "/samples/{sample_id}/priority",
    tag = "workflow",
    params(("sample_id" = String, Path, description = "Sample ID")),
    request_body = PriorityChangeRequest,
    responses(
        (status = 200, description = "Priority changed"),
        (status = 404, description = "Sample not found")
    )
)]
pub async fn change_priority(
    State(state): State<AppState>,
    Path(sample_id): Path<SampleId>,
    axum::Json(body): axum::Json<PriorityChangeRequest>,
) -> Result<SuccessEnvelope<()>, ApiError> {
    state
        .orchestrator
        .handle_priority_changed(&sample_id, body.priority)
        .await?;
    Ok(SuccessEnvelope::new(()))
}
