//! Submission intake (spec.md §6 `POST /api/submissions/ingest`).

use axum::{extract::State, http::StatusCode, Json};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use nanopore_db::{NewSample, NewSubmission, SubmissionRepository};
use nanopore_domain::{Priority, SampleQcInputs, SampleType};

use crate::error::{ApiError, SuccessEnvelope};
use crate::state::AppState;

#[derive(Debug, Deserialize, ToSchema)]
pub struct IngestSubmission {
    pub submission_number: String,
    pub pdf_filename: Option<String>,
    pub submitter_name: String,
    pub submitter_email: String,
    #[serde(default)]
    pub organization: Option<String>,
    #[serde(default)]
    pub project: Option<String>,
    #[serde(default)]
    pub priority: Priority,
    /// Prefixed user id, e.g. `user_01234...`.
    pub owner_id: String,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct IngestSample {
    pub sample_number: i32,
    pub sample_name: String,
    pub sample_type: SampleType,
    #[serde(default)]
    pub qc_inputs: SampleQcInputs,
    #[serde(default)]
    pub priority: Priority,
    #[serde(default)]
    pub chart_field: Option<String>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct IngestRequest {
    pub submission: IngestSubmission,
    pub samples: Vec<IngestSample>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct IngestResponse {
    pub submission_id: String,
    pub samples_created: usize,
    pub errors: Vec<String>,
}

/// Ingest one PDF submission's worth of samples.
///
/// Per-sample failures (e.g. a duplicate `sample_number`) are collected into
/// `errors` rather than aborting the whole batch; the submission itself is
/// only rejected outright when `pdf_filename` is missing (spec.md §6).
#[utoipa::path(
    post,
    path = "/submissions/ingest",
    tag = "intake",
    request_body = IngestRequest,
    responses(
        (status = 201, description = "Submission and samples ingested", body = IngestResponse),
        (status = 400, description = "Missing pdf_filename or other validation error")
    )
)]
pub async fn ingest(
    State(state): State<AppState>,
    Json(body): Json<IngestRequest>,
) -> Result<(StatusCode, SuccessEnvelope<IngestResponse>), ApiError> {
    let Some(pdf_filename) = body.submission.pdf_filename.filter(|s| !s.is_empty()) else {
        return Err(ApiError::Validation(vec!["pdf_filename is required".into()]));
    };

    let owner_id = body
        .submission
        .owner_id
        .parse()
        .map_err(|_| ApiError::Validation(vec!["owner_id is not a valid user id".into()]))?;

    let submission = state
        .submissions
        .create(&NewSubmission {
            submission_number: body.submission.submission_number,
            pdf_filename,
            submitter_name: body.submission.submitter_name,
            submitter_email: body.submission.submitter_email,
            organization: body.submission.organization,
            project: body.submission.project,
            priority: body.submission.priority,
            owner_id,
        })
        .await
        .map_err(map_create_submission_error)?;

    let new_samples: Vec<NewSample> = body
        .samples
        .iter()
        .map(|s| NewSample {
            submission_id: submission.submission_id,
            sample_number: s.sample_number,
            sample_name: s.sample_name.clone(),
            sample_type: s.sample_type,
            qc_inputs: s.qc_inputs,
            priority: s.priority,
            chart_field: s.chart_field.clone(),
        })
        .collect();

    let mut errors = Vec::new();
    let created = if new_samples.is_empty() {
        Vec::new()
    } else {
        match state.samples.create_samples_bulk(&new_samples).await {
            Ok(created) => created,
            Err(err) => {
                errors.push(err.to_string());
                Vec::new()
            }
        }
    };

    for sample in &created {
        if let Err(err) = state.orchestrator.handle_sample_created(sample).await {
            errors.push(format!("sample {}: {err}", sample.sample_id));
        }
    }

    let response = IngestResponse {
        submission_id: submission.submission_id.to_string(),
        samples_created: created.len(),
        errors,
    };

    Ok((StatusCode::CREATED, SuccessEnvelope::new(response)))
}

/// Submission creation is a plain repository call, not an Orchestrator
/// responsibility (spec.md §4.2), so its errors are mapped by hand here
/// rather than through `OrchestrationError`.
fn map_create_submission_error(err: nanopore_db::CreateSubmissionError) -> ApiError {
    match err {
        nanopore_db::CreateSubmissionError::NumberExists(number) => {
            ApiError::Conflict(format!("submission number {number} already exists"))
        }
        nanopore_db::CreateSubmissionError::Database(err) => {
            ApiError::TransientBackend(err.to_string())
        }
    }
}
