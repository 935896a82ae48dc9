//! PostgreSQL implementation of `SubmissionRepository`.

use async_trait::async_trait;
use sqlx::PgPool;

use nanopore_domain::{Priority, Submission, SubmissionId, SubmissionStatus, UserId};

use crate::pagination::{Page, Pagination};
use crate::repo::errors::{CreateSubmissionError, FindSubmissionError, ListSubmissionsError, UpdateSubmissionError};
use crate::repo::traits::{NewSubmission, SubmissionRepository, SubmissionUpdate};
use crate::retry::retry_transient;

pub struct PgSubmissionRepository {
    pool: PgPool,
}

impl PgSubmissionRepository {
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SubmissionRepository for PgSubmissionRepository {
    async fn find_by_id(
        &self,
        id: &SubmissionId,
    ) -> Result<Option<Submission>, FindSubmissionError> {
        let row = retry_transient(|| {
            sqlx::query_as::<_, SubmissionRow>(
                r#"
                SELECT submission_id::text, submission_number, pdf_filename,
                       submitter_name, submitter_email, organization, project,
                       priority::text, status::text, sample_count, samples_completed,
                       owner_id::text, created_at, updated_at
                FROM submissions
                WHERE submission_id = $1
                "#,
            )
            .bind(id.as_uuid())
            .fetch_optional(&self.pool)
        })
        .await
        .map_err(FindSubmissionError::Database)?;

        row.map(TryInto::try_into)
            .transpose()
            .map_err(|_| FindSubmissionError::NotFound(id.clone()))
    }

    async fn create(&self, new: &NewSubmission) -> Result<Submission, CreateSubmissionError> {
        let id = SubmissionId::new();

        let row = sqlx::query_as::<_, SubmissionRow>(
            r#"
            INSERT INTO submissions (
                submission_id, submission_number, pdf_filename,
                submitter_name, submitter_email, organization, project,
                priority, status, sample_count, samples_completed, owner_id
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8::priority, 'pending', 0, 0, $9)
            RETURNING submission_id::text, submission_number, pdf_filename,
                      submitter_name, submitter_email, organization, project,
                      priority::text, status::text, sample_count, samples_completed,
                      owner_id::text, created_at, updated_at
            "#,
        )
        .bind(id.as_uuid())
        .bind(&new.submission_number)
        .bind(&new.pdf_filename)
        .bind(&new.submitter_name)
        .bind(&new.submitter_email)
        .bind(&new.organization)
        .bind(&new.project)
        .bind(priority_to_str(new.priority))
        .bind(new.owner_id.as_uuid())
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            if let Some(db_err) = e.as_database_error() {
                if db_err.constraint() == Some("submissions_submission_number_key") {
                    return CreateSubmissionError::NumberExists(new.submission_number.clone());
                }
            }
            CreateSubmissionError::Database(e)
        })?;

        row.try_into()
            .map_err(|_| CreateSubmissionError::Database(sqlx::Error::RowNotFound))
    }

    async fn update(
        &self,
        id: &SubmissionId,
        update: &SubmissionUpdate,
    ) -> Result<Submission, UpdateSubmissionError> {
        let row = sqlx::query_as::<_, SubmissionRow>(
            r#"
            UPDATE submissions
            SET status = COALESCE($2::text, status::text)::submission_status,
                priority = COALESCE($3::text, priority::text)::priority,
                sample_count = COALESCE($4, sample_count),
                samples_completed = COALESCE($5, samples_completed),
                updated_at = NOW()
            WHERE submission_id = $1
            RETURNING submission_id::text, submission_number, pdf_filename,
                      submitter_name, submitter_email, organization, project,
                      priority::text, status::text, sample_count, samples_completed,
                      owner_id::text, created_at, updated_at
            "#,
        )
        .bind(id.as_uuid())
        .bind(update.status.map(status_to_str))
        .bind(update.priority.map(priority_to_str))
        .bind(update.sample_count)
        .bind(update.samples_completed)
        .fetch_optional(&self.pool)
        .await
        .map_err(UpdateSubmissionError::Database)?
        .ok_or_else(|| UpdateSubmissionError::NotFound(id.clone()))?;

        row.try_into()
            .map_err(|_| UpdateSubmissionError::Database(sqlx::Error::RowNotFound))
    }

    async fn list(&self, pagination: Pagination) -> Result<Page<Submission>, ListSubmissionsError> {
        let total = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM submissions")
            .fetch_one(&self.pool)
            .await
            .map_err(ListSubmissionsError::Database)?;

        let rows = sqlx::query_as::<_, SubmissionRow>(
            r#"
            SELECT submission_id::text, submission_number, pdf_filename,
                   submitter_name, submitter_email, organization, project,
                   priority::text, status::text, sample_count, samples_completed,
                   owner_id::text, created_at, updated_at
            FROM submissions
            ORDER BY created_at DESC
            LIMIT $1 OFFSET $2
            "#,
        )
        .bind(pagination.clamped_limit())
        .bind(pagination.offset)
        .fetch_all(&self.pool)
        .await
        .map_err(ListSubmissionsError::Database)?;

        let submissions: Vec<Submission> = rows.into_iter().filter_map(|r| r.try_into().ok()).collect();

        Ok(Page::new(submissions, total, &pagination))
    }
}

fn priority_to_str(priority: Priority) -> &'static str {
    match priority {
        Priority::Low => "low",
        Priority::Normal => "normal",
        Priority::High => "high",
        Priority::Urgent => "urgent",
    }
}

fn parse_priority(s: &str) -> Priority {
    match s {
        "low" => Priority::Low,
        "high" => Priority::High,
        "urgent" => Priority::Urgent,
        _ => Priority::Normal,
    }
}

fn status_to_str(status: SubmissionStatus) -> &'static str {
    match status {
        SubmissionStatus::Pending => "pending",
        SubmissionStatus::Processing => "processing",
        SubmissionStatus::Completed => "completed",
        SubmissionStatus::Failed => "failed",
    }
}

fn parse_status(s: &str) -> SubmissionStatus {
    match s {
        "processing" => SubmissionStatus::Processing,
        "completed" => SubmissionStatus::Completed,
        "failed" => SubmissionStatus::Failed,
        _ => SubmissionStatus::Pending,
    }
}

#[derive(sqlx::FromRow)]
struct SubmissionRow {
    submission_id: String,
    submission_number: String,
    pdf_filename: String,
    submitter_name: String,
    submitter_email: String,
    organization: Option<String>,
    project: Option<String>,
    priority: String,
    status: String,
    sample_count: i32,
    samples_completed: i32,
    owner_id: String,
    created_at: chrono::DateTime<chrono::Utc>,
    updated_at: chrono::DateTime<chrono::Utc>,
}

impl TryFrom<SubmissionRow> for Submission {
    type Error = nanopore_domain::IdParseError;

    fn try_from(row: SubmissionRow) -> Result<Self, Self::Error> {
        Ok(Submission {
            submission_id: SubmissionId::from_uuid(row.submission_id.parse()?),
            submission_number: row.submission_number,
            pdf_filename: row.pdf_filename,
            submitter_name: row.submitter_name,
            submitter_email: row.submitter_email,
            organization: row.organization,
            project: row.project,
            priority: parse_priority(&row.priority),
            status: parse_status(&row.status),
            sample_count: row.sample_count,
            samples_completed: row.samples_completed,
            owner_id: UserId::from_uuid(row.owner_id.parse()?),
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}
