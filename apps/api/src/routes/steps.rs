//! Step-level operator actions (spec.md §6 `POST /api/steps/{id}/retry`).

use axum::extract::{Path, State};

use nanopore_domain::StepId;

use crate::error::{ApiError, SuccessEnvelope};
use crate::state::AppState;

/// Retry a failed step: `failed -> pending`, re-enqueued if its
/// dependencies are satisfied (spec.md §9's resolved open question).
#[utoipa::path(
    post,
    path = "/steps/{step_id}/retry",
    tag = "workflow",
    params(("step_id" = String, Path, description = "Step ID")),
    responses(
        (status = 200, description = "Step queued for retry"),
        (status = 404, description = "Step not found"),
        (status = 409, description = "Step is not in a failed state")
    )
)]
pub async fn retry_step(
    State(state): State<AppState>,
    Path(step_id): Path<StepId>,
) -> Result<SuccessEnvelope<()>, ApiError> {
    state.orchestrator.retry_step(&step_id).await?;
    Ok(SuccessEnvelope::new(()))
}
