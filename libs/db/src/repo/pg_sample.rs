//! PostgreSQL implementation of `SampleRepository`.

use async_trait::async_trait;
use sqlx::PgPool;

use nanopore_domain::{
    stage_config, Priority, Sample, SampleId, SampleQcInputs, SampleStatus, SampleType, StepId,
    SubmissionId, WorkflowStage,
};

use crate::pagination::{Page, Pagination};
use crate::repo::errors::{CreateSampleError, FindSampleError, ListSamplesError, UpdateSampleError};
use crate::repo::traits::{NewSample, SampleRepository, SampleStatusCounts, SampleUpdate, SystemSampleCounts};

pub struct PgSampleRepository {
    pool: PgPool,
}

impl PgSampleRepository {
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

pub(crate) const SAMPLE_COLUMNS: &str = r#"
    sample_id::text, submission_id::text, sample_number, sample_name,
    sample_type::text, concentration_ng_per_ul, volume_ul,
    qubit_concentration, nanodrop_concentration, a260_280, a260_230,
    workflow_stage::text, status::text, priority::text, assignee,
    chart_field, created_at, updated_at
"#;

#[async_trait]
impl SampleRepository for PgSampleRepository {
    async fn get_sample(&self, id: &SampleId) -> Result<Option<Sample>, FindSampleError> {
        let row = sqlx::query_as::<_, SampleRow>(&format!(
            "SELECT {SAMPLE_COLUMNS} FROM samples WHERE sample_id = $1"
        ))
        .bind(id.as_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(FindSampleError::Database)?;

        row.map(TryInto::try_into)
            .transpose()
            .map_err(|_| FindSampleError::NotFound(id.clone()))
    }

    /// Inserts each sample and its eight canonical `processing_steps` rows
    /// in one transaction, so a crash mid-batch never leaves a sample
    /// without steps (spec.md §4.2's "sample + 8 steps" atomicity).
    async fn create_samples_bulk(&self, samples: &[NewSample]) -> Result<Vec<Sample>, CreateSampleError> {
        let mut tx = self.pool.begin().await.map_err(CreateSampleError::Database)?;
        let mut created = Vec::with_capacity(samples.len());

        for new in samples {
            let id = SampleId::new();
            let qc = &new.qc_inputs;

            let row = sqlx::query_as::<_, SampleRow>(&format!(
                r#"
                INSERT INTO samples (
                    sample_id, submission_id, sample_number, sample_name, sample_type,
                    concentration_ng_per_ul, volume_ul, qubit_concentration,
                    nanodrop_concentration, a260_280, a260_230,
                    workflow_stage, status, priority, chart_field
                )
                VALUES ($1, $2, $3, $4, $5::sample_type, $6, $7, $8, $9, $10, $11,
                        'sample_qc', 'submitted', $12::priority, $13)
                RETURNING {SAMPLE_COLUMNS}
                "#
            ))
            .bind(id.as_uuid())
            .bind(new.submission_id.as_uuid())
            .bind(new.sample_number)
            .bind(&new.sample_name)
            .bind(sample_type_to_str(new.sample_type))
            .bind(qc.concentration_ng_per_ul)
            .bind(qc.volume_ul)
            .bind(qc.qubit_concentration)
            .bind(qc.nanodrop_concentration)
            .bind(qc.a260_280)
            .bind(qc.a260_230)
            .bind(priority_to_str(new.priority))
            .bind(&new.chart_field)
            .fetch_one(&mut *tx)
            .await
            .map_err(|e| {
                if let Some(db_err) = e.as_database_error() {
                    if db_err.constraint() == Some("samples_submission_id_fkey") {
                        return CreateSampleError::SubmissionNotFound(new.submission_id.clone());
                    }
                    if db_err.constraint() == Some("samples_submission_id_sample_number_key") {
                        return CreateSampleError::DuplicateSampleNumber {
                            submission_id: new.submission_id.clone(),
                            sample_number: new.sample_number,
                        };
                    }
                }
                CreateSampleError::Database(e)
            })?;

            for stage in WorkflowStage::ALL {
                let config = stage_config(stage);
                let step_id = StepId::new();
                sqlx::query(
                    r#"
                    INSERT INTO processing_steps (
                        step_id, sample_id, step_name, step_order, status,
                        estimated_duration_hours, results
                    )
                    VALUES ($1, $2, $3::workflow_stage, $4, 'pending', $5, '{}'::jsonb)
                    "#,
                )
                .bind(step_id.as_uuid())
                .bind(id.as_uuid())
                .bind(stage.as_str())
                .bind(stage.order() as i16)
                .bind(config.estimated_duration_hours)
                .execute(&mut *tx)
                .await
                .map_err(CreateSampleError::Database)?;
            }

            created.push(row.try_into().map_err(|_| CreateSampleError::Database(sqlx::Error::RowNotFound))?);
        }

        tx.commit().await.map_err(CreateSampleError::Database)?;
        Ok(created)
    }

    async fn update_sample(
        &self,
        id: &SampleId,
        update: &SampleUpdate,
    ) -> Result<Sample, UpdateSampleError> {
        let assignee_set = update.assignee.is_some();
        let assignee_value = update.assignee.clone().flatten();

        let row = sqlx::query_as::<_, SampleRow>(&format!(
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
        .bind(id.as_uuid())
        .bind(update.workflow_stage.map(WorkflowStage::as_str))
        .bind(update.status.map(status_to_str))
        .bind(update.priority.map(priority_to_str))
        .bind(assignee_set)
        .bind(assignee_value)
        .fetch_optional(&self.pool)
        .await
        .map_err(UpdateSampleError::Database)?
        .ok_or_else(|| UpdateSampleError::NotFound(id.clone()))?;

        row.try_into()
            .map_err(|_| UpdateSampleError::Database(sqlx::Error::RowNotFound))
    }

    async fn list_by_submission(
        &self,
        submission_id: &SubmissionId,
        pagination: Pagination,
    ) -> Result<Page<Sample>, ListSamplesError> {
        let total = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM samples WHERE submission_id = $1")
            .bind(submission_id.as_uuid())
            .fetch_one(&self.pool)
            .await
            .map_err(ListSamplesError::Database)?;

        let rows = sqlx::query_as::<_, SampleRow>(&format!(
            r#"
            SELECT {SAMPLE_COLUMNS} FROM samples
            WHERE submission_id = $1
            ORDER BY sample_number ASC
            LIMIT $2 OFFSET $3
            "#
        ))
        .bind(submission_id.as_uuid())
        .bind(pagination.clamped_limit())
        .bind(pagination.offset)
        .fetch_all(&self.pool)
        .await
        .map_err(ListSamplesError::Database)?;

        let samples: Vec<Sample> = rows.into_iter().filter_map(|r| r.try_into().ok()).collect();

        Ok(Page::new(samples, total, &pagination))
    }

    async fn count_samples_by_status(
        &self,
        submission_id: &SubmissionId,
    ) -> Result<SampleStatusCounts, ListSamplesError> {
        let row = sqlx::query_as::<_, CountsRow>(
            r#"
            SELECT
                COUNT(*) AS total,
                COUNT(*) FILTER (WHERE status = 'completed') AS completed,
                COUNT(*) FILTER (WHERE status = 'failed') AS failed,
                COUNT(*) FILTER (WHERE status = 'submitted') AS pending
            FROM samples
            WHERE submission_id = $1
            "#,
        )
        .bind(submission_id.as_uuid())
        .fetch_one(&self.pool)
        .await
        .map_err(ListSamplesError::Database)?;

        Ok(SampleStatusCounts {
            total: row.total,
            completed: row.completed,
            failed: row.failed,
            pending: row.pending,
        })
    }

    async fn system_status_counts(&self) -> Result<SystemSampleCounts, ListSamplesError> {
        let row = sqlx::query_as::<_, SystemCountsRow>(
            r#"
            SELECT
                COUNT(*) AS total,
                COUNT(*) FILTER (WHERE status = 'completed') AS completed,
                COUNT(*) FILTER (WHERE status NOT IN ('completed', 'failed', 'archived')) AS active
            FROM samples
            "#,
        )
        .fetch_one(&self.pool)
        .await
        .map_err(ListSamplesError::Database)?;

        Ok(SystemSampleCounts {
            total: row.total,
            active: row.active,
            completed: row.completed,
        })
    }
}

pub(crate) fn sample_type_to_str(t: SampleType) -> &'static str {
    match t {
        SampleType::Dna => "dna",
        SampleType::Rna => "rna",
        SampleType::Protein => "protein",
        SampleType::Other => "other",
    }
}

pub(crate) fn parse_sample_type(s: &str) -> SampleType {
    match s {
        "dna" => SampleType::Dna,
        "rna" => SampleType::Rna,
        "protein" => SampleType::Protein,
        _ => SampleType::Other,
    }
}

pub(crate) fn priority_to_str(priority: Priority) -> &'static str {
    match priority {
        Priority::Low => "low",
        Priority::Normal => "normal",
        Priority::High => "high",
        Priority::Urgent => "urgent",
    }
}

pub(crate) fn parse_priority(s: &str) -> Priority {
    match s {
        "low" => Priority::Low,
        "high" => Priority::High,
        "urgent" => Priority::Urgent,
        _ => Priority::Normal,
    }
}

pub(crate) fn status_to_str(status: SampleStatus) -> &'static str {
    match status {
        SampleStatus::Submitted => "submitted",
        SampleStatus::Prep => "prep",
        SampleStatus::Sequencing => "sequencing",
        SampleStatus::Analysis => "analysis",
        SampleStatus::Completed => "completed",
        SampleStatus::Distributed => "distributed",
        SampleStatus::Archived => "archived",
        SampleStatus::Failed => "failed",
    }
}

pub(crate) fn parse_sample_status(s: &str) -> SampleStatus {
    match s {
        "prep" => SampleStatus::Prep,
        "sequencing" => SampleStatus::Sequencing,
        "analysis" => SampleStatus::Analysis,
        "completed" => SampleStatus::Completed,
        "distributed" => SampleStatus::Distributed,
        "archived" => SampleStatus::Archived,
        "failed" => SampleStatus::Failed,
        _ => SampleStatus::Submitted,
    }
}

#[derive(sqlx::FromRow)]
struct CountsRow {
    total: i64,
    completed: i64,
    failed: i64,
    pending: i64,
}

#[derive(sqlx::FromRow)]
struct SystemCountsRow {
    total: i64,
    completed: i64,
    active: i64,
}

#[derive(sqlx::FromRow)]
pub(crate) struct SampleRow {
    sample_id: String,
    submission_id: String,
    sample_number: i32,
    sample_name: String,
    sample_type: String,
    concentration_ng_per_ul: Option<f64>,
    volume_ul: Option<f64>,
    qubit_concentration: Option<f64>,
    nanodrop_concentration: Option<f64>,
    a260_280: Option<f64>,
    a260_230: Option<f64>,
    workflow_stage: String,
    status: String,
    priority: String,
    assignee: Option<String>,
    chart_field: Option<String>,
    created_at: chrono::DateTime<chrono::Utc>,
    updated_at: chrono::DateTime<chrono::Utc>,
}

impl TryFrom<SampleRow> for Sample {
    type Error = nanopore_domain::IdParseError;

    fn try_from(row: SampleRow) -> Result<Self, Self::Error> {
        Ok(Sample {
            sample_id: SampleId::from_uuid(row.sample_id.parse()?),
            submission_id: SubmissionId::from_uuid(row.submission_id.parse()?),
            sample_number: row.sample_number,
            sample_name: row.sample_name,
            sample_type: parse_sample_type(&row.sample_type),
            qc_inputs: SampleQcInputs {
                concentration_ng_per_ul: row.concentration_ng_per_ul,
                volume_ul: row.volume_ul,
                qubit_concentration: row.qubit_concentration,
                nanodrop_concentration: row.nanodrop_concentration,
                a260_280: row.a260_280,
                a260_230: row.a260_230,
            },
            workflow_stage: WorkflowStage::from_str_opt(&row.workflow_stage).unwrap_or(WorkflowStage::SampleQc),
            status: parse_sample_status(&row.status),
            priority: parse_priority(&row.priority),
            assignee: row.assignee,
            chart_field: row.chart_field,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}
