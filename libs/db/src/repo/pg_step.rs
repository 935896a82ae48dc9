//! PostgreSQL implementation of `StepRepository`.

use async_trait::async_trait;
use sqlx::PgPool;

use nanopore_domain::{stage_config, ProcessingStep, SampleId, StepId, StepStatus, WorkflowStage};

use crate::pagination::{Page, Pagination};
use crate::repo::errors::{CreateStepError, FindStepError, ListStepsError, UpdateStepError};
use crate::repo::traits::{NewStep, StepRepository, StepUpdate};

pub struct PgStepRepository {
    pool: PgPool,
}

impl PgStepRepository {
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

pub(crate) const STEP_COLUMNS: &str = r#"
    step_id::text, sample_id::text, step_name::text, step_order, status::text,
    assignee, started_at, completed_at, estimated_duration_hours, actual_duration_hours,
    notes, results, qc_passed, qc_notes
"#;

#[async_trait]
impl StepRepository for PgStepRepository {
    async fn get_step(&self, id: &StepId) -> Result<Option<ProcessingStep>, FindStepError> {
        let row = sqlx::query_as::<_, StepRow>(&format!(
            "SELECT {STEP_COLUMNS} FROM processing_steps WHERE step_id = $1"
        ))
        .bind(id.as_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(FindStepError::Database)?;

        row.map(TryInto::try_into)
            .transpose()
            .map_err(|_| FindStepError::NotFound(id.clone()))
    }

    async fn create_steps_bulk(&self, steps: &[NewStep]) -> Result<Vec<ProcessingStep>, CreateStepError> {
        let mut tx = self.pool.begin().await.map_err(CreateStepError::Database)?;
        let mut created = Vec::with_capacity(steps.len());

        for new in steps {
            let id = StepId::new();

            let row = sqlx::query_as::<_, StepRow>(&format!(
                r#"
                INSERT INTO processing_steps (
                    step_id, sample_id, step_name, step_order, status,
                    estimated_duration_hours, results
                )
                VALUES ($1, $2, $3::workflow_stage, $4, 'pending', $5, '{{}}'::jsonb)
                RETURNING {STEP_COLUMNS}
                "#
            ))
            .bind(id.as_uuid())
            .bind(new.sample_id.as_uuid())
            .bind(new.step_name.as_str())
            .bind(new.step_order)
            .bind(new.estimated_duration_hours)
            .fetch_one(&mut *tx)
            .await
            .map_err(|e| {
                if let Some(db_err) = e.as_database_error() {
                    if db_err.constraint() == Some("processing_steps_sample_id_fkey") {
                        return CreateStepError::SampleNotFound(new.sample_id.clone());
                    }
                }
                CreateStepError::Database(e)
            })?;

            created.push(row.try_into().map_err(|_| CreateStepError::Database(sqlx::Error::RowNotFound))?);
        }

        tx.commit().await.map_err(CreateStepError::Database)?;
        Ok(created)
    }

    async fn get_sample_steps(&self, sample_id: &SampleId) -> Result<Vec<ProcessingStep>, ListStepsError> {
        let rows = sqlx::query_as::<_, StepRow>(&format!(
            "SELECT {STEP_COLUMNS} FROM processing_steps WHERE sample_id = $1 ORDER BY step_order ASC"
        ))
        .bind(sample_id.as_uuid())
        .fetch_all(&self.pool)
        .await
        .map_err(ListStepsError::Database)?;

        Ok(rows.into_iter().filter_map(|r| r.try_into().ok()).collect())
    }

    async fn get_step_dependencies(&self, step_id: &StepId) -> Result<Vec<ProcessingStep>, FindStepError> {
        let step = self.get_step(step_id).await?.ok_or_else(|| FindStepError::NotFound(step_id.clone()))?;
        let dep_stages = stage_config(step.step_name).dependencies;

        if dep_stages.is_empty() {
            return Ok(Vec::new());
        }

        let dep_names: Vec<&'static str> = dep_stages.iter().map(|s| s.as_str()).collect();

        let rows = sqlx::query_as::<_, StepRow>(&format!(
            "SELECT {STEP_COLUMNS} FROM processing_steps WHERE sample_id = $1 AND step_name::text = ANY($2)"
        ))
        .bind(step.sample_id.as_uuid())
        .bind(&dep_names)
        .fetch_all(&self.pool)
        .await
        .map_err(FindStepError::Database)?;

        Ok(rows.into_iter().filter_map(|r| r.try_into().ok()).collect())
    }

    async fn get_pending_steps(
        &self,
        stage: WorkflowStage,
        pagination: Pagination,
    ) -> Result<Page<ProcessingStep>, ListStepsError> {
        let total = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM processing_steps WHERE step_name = $1::workflow_stage AND status = 'pending'",
        )
        .bind(stage.as_str())
        .fetch_one(&self.pool)
        .await
        .map_err(ListStepsError::Database)?;

        let rows = sqlx::query_as::<_, StepRow>(&format!(
            r#"
            SELECT {STEP_COLUMNS} FROM processing_steps
            WHERE step_name = $1::workflow_stage AND status = 'pending'
            ORDER BY step_order ASC
            LIMIT $2 OFFSET $3
            "#
        ))
        .bind(stage.as_str())
        .bind(pagination.clamped_limit())
        .bind(pagination.offset)
        .fetch_all(&self.pool)
        .await
        .map_err(ListStepsError::Database)?;

        let steps: Vec<ProcessingStep> = rows.into_iter().filter_map(|r| r.try_into().ok()).collect();

        Ok(Page::new(steps, total, &pagination))
    }

    async fn get_in_progress_steps(&self) -> Result<Vec<ProcessingStep>, ListStepsError> {
        let rows = sqlx::query_as::<_, StepRow>(&format!(
            "SELECT {STEP_COLUMNS} FROM processing_steps WHERE status = 'in_progress' ORDER BY started_at ASC"
        ))
        .fetch_all(&self.pool)
        .await
        .map_err(ListStepsError::Database)?;

        Ok(rows.into_iter().filter_map(|r| r.try_into().ok()).collect())
    }

    async fn count_failed_steps(&self) -> Result<i64, ListStepsError> {
        sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM processing_steps WHERE status = 'failed'")
            .fetch_one(&self.pool)
            .await
            .map_err(ListStepsError::Database)
    }

    async fn update_step(&self, id: &StepId, update: &StepUpdate) -> Result<ProcessingStep, UpdateStepError> {
        let assignee_set = update.assignee.is_some();
        let assignee_value = update.assignee.clone().flatten();
        let qc_passed_set = update.qc_passed.is_some();
        let qc_passed_value = update.qc_passed.flatten();

        let row = sqlx::query_as::<_, StepRow>(&format!(
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
        .bind(id.as_uuid())
        .bind(update.step_status.map(StepStatus::as_str))
        .bind(assignee_set)
        .bind(assignee_value)
        .bind(update.started_at)
        .bind(update.completed_at)
        .bind(update.actual_duration_hours)
        .bind(&update.notes)
        .bind(&update.results)
        .bind(qc_passed_set)
        .bind(qc_passed_value)
        .bind(&update.qc_notes)
        .fetch_optional(&self.pool)
        .await
        .map_err(UpdateStepError::Database)?
        .ok_or_else(|| UpdateStepError::NotFound(id.clone()))?;

        row.try_into().map_err(|_| UpdateStepError::Database(sqlx::Error::RowNotFound))
    }
}

#[derive(sqlx::FromRow)]
pub(crate) struct StepRow {
    step_id: String,
    sample_id: String,
    step_name: String,
    step_order: i16,
    status: String,
    assignee: Option<String>,
    started_at: Option<chrono::DateTime<chrono::Utc>>,
    completed_at: Option<chrono::DateTime<chrono::Utc>>,
    estimated_duration_hours: f64,
    actual_duration_hours: Option<f64>,
    notes: Option<String>,
    results: serde_json::Value,
    qc_passed: Option<bool>,
    qc_notes: Option<String>,
}

impl TryFrom<StepRow> for ProcessingStep {
    type Error = nanopore_domain::IdParseError;

    fn try_from(row: StepRow) -> Result<Self, Self::Error> {
        Ok(ProcessingStep {
            step_id: StepId::from_uuid(row.step_id.parse()?),
            sample_id: SampleId::from_uuid(row.sample_id.parse()?),
            step_name: WorkflowStage::from_str_opt(&row.step_name).unwrap_or(WorkflowStage::SampleQc),
            step_order: row.step_order,
            step_status: StepStatus::from_str_opt(&row.status).unwrap_or(StepStatus::Pending),
            assignee: row.assignee,
            started_at: row.started_at,
            completed_at: row.completed_at,
            estimated_duration_hours: row.estimated_duration_hours,
            actual_duration_hours: row.actual_duration_hours,
            notes: row.notes,
            results: row.results,
            qc_passed: row.qc_passed,
            qc_notes: row.qc_notes,
        })
    }
}
