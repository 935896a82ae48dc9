//! Priority queue inspection (spec.md §6 `GET /api/queue`).
//!
//! The in-memory `PriorityQueues` never exposes a snapshot (spec.md §9: it
//! is a cache, not authoritative state), so this reads the pending steps
//! straight out of Postgres and orders them the same way the queue does.

use std::cmp::Reverse;

use axum::extract::State;
use chrono::{DateTime, Utc};
use serde::Serialize;
use utoipa::ToSchema;

use nanopore_db::{Pagination, SampleRepository, StepRepository};
use nanopore_domain::{Priority, WorkflowStage};

use crate::error::{ApiError, SuccessEnvelope};
use crate::state::AppState;

#[derive(Debug, Serialize, ToSchema)]
pub struct QueueEntry {
    pub step_id: String,
    pub sample_id: String,
    pub sample_number: i32,
    pub stage: WorkflowStage,
    pub priority: Priority,
    pub submission_date: DateTime<Utc>,
}

/// Every pending step across all eight stages, ordered the way the
/// per-stage priority queues order them: priority descending, then
/// submission date ascending, then sample number ascending (spec.md §4.5).
#[utoipa::path(
    get,
    path = "/queue",
    tag = "queue",
    responses((status = 200, description = "Pending steps across all stages", body = [QueueEntry]))
)]
pub async fn list_queue(
    State(state): State<AppState>,
) -> Result<SuccessEnvelope<Vec<QueueEntry>>, ApiError> {
    let mut entries = Vec::new();

    for stage in WorkflowStage::ALL {
        let page = state
            .steps
            .get_pending_steps(stage, Pagination::with_limit(100))
            .await
            .map_err(|e| ApiError::TransientBackend(e.to_string()))?;

        for step in page.items {
            let Some(sample) = state
                .samples
                .get_sample(&step.sample_id)
                .await
                .map_err(|e| ApiError::TransientBackend(e.to_string()))?
            else {
                continue;
            };

            entries.push((
                sample.priority,
                sample.created_at,
                sample.sample_number,
                QueueEntry {
                    step_id: step.step_id.to_string(),
                    sample_id: sample.sample_id.to_string(),
                    sample_number: sample.sample_number,
                    stage,
                    priority: sample.priority,
                    submission_date: sample.created_at,
                },
            ));
        }
    }

    entries.sort_by_key(|(priority, submission_date, sample_number, _)| {
        (Reverse(*priority), *submission_date, *sample_number)
    });

    Ok(SuccessEnvelope::new(
        entries.into_iter().map(|(.., entry)| entry).collect(),
    ))
}
