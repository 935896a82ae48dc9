//! PostgreSQL implementation of `WorkflowRepository`: the step+sample writes
//! the Orchestrator needs atomic, grounded on the same cross-table
//! transaction pattern `pg_submission.rs`/`pg_sample.rs` use for their own
//! bulk inserts, just spanning two tables instead of one.

use async_trait::async_trait;
use sqlx::PgPool;

use nanopore_domain::{ProcessingStep, Sample, SampleId, StepId, StepStatus, WorkflowStage};

use crate::repo::errors::UpdateStepError;
use crate::repo::pg_sample::{priority_to_str, status_to_str as sample_status_to_str, SampleRow, SAMPLE_COLUMNS};
use crate::repo::pg_step::{StepRow, STEP_COLUMNS};
use crate::repo::traits::{SampleUpdate, StepUpdate, WorkflowRepository};

pub struct PgWorkflowRepository {
    pool: PgPool,
}

impl PgWorkflowRepository {
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl WorkflowRepository for PgWorkflowRepository {
    async fn update_step_and_sample(
        &self,
        step_id: &StepId,
        step_update: &StepUpdate,
        sample_id: &SampleId,
        sample_update: &SampleUpdate,
    ) -> Result<(ProcessingStep, Sample), UpdateStepError> {
        let mut tx = self.pool.begin().await.map_err(UpdateStepError::Database)?;

        // Locks the sample row for the rest of the transaction so a
        // concurrent step completion on the same sample serializes instead
        // of racing on the subsequent UPDATE (spec.md §4.2, §5).
        sqlx::query_scalar::<_, uuid::Uuid>("SELECT sample_id FROM samples WHERE sample_id = $1 FOR UPDATE")
            .bind(sample_id.as_uuid())
            .fetch_optional(&mut *tx)
            .await
            .map_err(UpdateStepError::Database)?
            .ok_or_else(|| UpdateStepError::SampleNotFound(sample_id.clone()))?;

        let assignee_set = step_update.assignee.is_some();
        let assignee_value = step_update.assignee.clone().flatten();
        let qc_passed_set = step_update.qc_passed.is_some();
        let qc_passed_value = step_update.qc_passed.flatten();

        let step_row = sqlx::query_as::<_, StepRow>(&format!(
            r#"
            UPDATE processing_steps
            SET status = COALESCE($2::text, status::text)::step_status,
                assignee = CASE WHEN $3 THEN $4 ELSE assignee END,
                started_at = COALESCE($5, started_at),
                completed_at = COALESCE($6, completed_at),
                actual_duration_hours = COALESCE($7, actual_duration_hours),
                notes = COALESCE($8, notes),
                results = COALESCE($9, results),
                qc_passed = CASE WHEN $10 THEN $11 ELSE qc_passed END,
                qc_notes = COALESCE($12, qc_notes)
            WHERE step_id = $1
            RETURNING {STEP_COLUMNS}
            "#
        ))
        .bind(step_id.as_uuid())
        .bind(step_update.step_status.map(StepStatus::as_str))
        .bind(assignee_set)
        .bind(assignee_value)
        .bind(step_update.started_at)
        .bind(step_update.completed_at)
        .bind(step_update.actual_duration_hours)
        .bind(&step_update.notes)
        .bind(&step_update.results)
        .bind(qc_passed_set)
        .bind(qc_passed_value)
        .bind(&step_update.qc_notes)
        .fetch_optional(&mut *tx)
        .await
        .map_err(UpdateStepError::Database)?
        .ok_or_else(|| UpdateStepError::NotFound(step_id.clone()))?;

        let sample_assignee_set = sample_update.assignee.is_some();
        let sample_assignee_value = sample_update.assignee.clone().flatten();

        let sample_row = sqlx::query_as::<_, SampleRow>(&format!(
            r#"
            UPDATE samples
            SET workflow_stage = COALESCE($2::text, workflow_stage::text)::workflow_stage,
                status = COALESCE($3::text, status::text)::sample_status,
                priority = COALESCE($4::text, priority::text)::priority,
                assignee = CASE WHEN $5 THEN $6 ELSE assignee END,
                updated_at = NOW()
            WHERE sample_id = $1
            RETURNING {SAMPLE_COLUMNS}
            "#
        ))
        .bind(sample_id.as_uuid())
        .bind(sample_update.workflow_stage.map(WorkflowStage::as_str))
        .bind(sample_update.status.map(sample_status_to_str))
        .bind(sample_update.priority.map(priority_to_str))
        .bind(sample_assignee_set)
        .bind(sample_assignee_value)
        .fetch_optional(&mut *tx)
        .await
        .map_err(UpdateStepError::Database)?
        .ok_or_else(|| UpdateStepError::SampleNotFound(sample_id.clone()))?;

        tx.commit().await.map_err(UpdateStepError::Database)?;

        let step = step_row.try_into().map_err(|_| UpdateStepError::Database(sqlx::Error::RowNotFound))?;
        let sample = sample_row.try_into().map_err(|_| UpdateStepError::Database(sqlx::Error::RowNotFound))?;
        Ok((step, sample))
    }
}
