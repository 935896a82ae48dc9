//! Per-operation repository errors.
//!
//! Each repository operation has its own error type so callers can match
//! precisely instead of string-matching a generic database error.

use nanopore_domain::{SampleId, StepId, SubmissionId};
use thiserror::Error;

// =============================================================================
// Submission Repository Errors
// =============================================================================

#[derive(Debug, Error)]
pub enum CreateSubmissionError {
    #[error("submission number already exists: {0}")]
    NumberExists(String),
    #[error("database error")]
    Database(#[source] sqlx::Error),
}

#[derive(Debug, Error)]
pub enum FindSubmissionError {
    #[error("submission not found: {0}")]
    NotFound(SubmissionId),
    #[error("database error")]
    Database(#[source] sqlx::Error),
}

#[derive(Debug, Error)]
pub enum UpdateSubmissionError {
    #[error("submission not found: {0}")]
    NotFound(SubmissionId),
    #[error("database error")]
    Database(#[source] sqlx::Error),
}

#[derive(Debug, Error)]
pub enum ListSubmissionsError {
    #[error("database error")]
    Database(#[source] sqlx::Error),
}

// =============================================================================
// Sample Repository Errors
// =============================================================================

#[derive(Debug, Error)]
pub enum CreateSampleError {
    #[error("submission not found: {0}")]
    SubmissionNotFound(SubmissionId),
    #[error("duplicate sample_number {sample_number} within submission {submission_id}")]
    DuplicateSampleNumber {
        submission_id: SubmissionId,
        sample_number: i32,
    },
    #[error("database error")]
    Database(#[source] sqlx::Error),
}

#[derive(Debug, Error)]
pub enum FindSampleError {
    #[error("sample not found: {0}")]
    NotFound(SampleId),
    #[error("database error")]
    Database(#[source] sqlx::Error),
}

#[derive(Debug, Error)]
pub enum UpdateSampleError {
    #[error("sample not found: {0}")]
    NotFound(SampleId),
    #[error("database error")]
    Database(#[source] sqlx::Error),
}

#[derive(Debug, Error)]
pub enum ListSamplesError {
    #[error("database error")]
    Database(#[source] sqlx::Error),
}

// =============================================================================
// Step Repository Errors
// =============================================================================

#[derive(Debug, Error)]
pub enum CreateStepError {
    #[error("sample not found: {0}")]
    SampleNotFound(SampleId),
    #[error("database error")]
    Database(#[source] sqlx::Error),
}

#[derive(Debug, Error)]
pub enum FindStepError {
    #[error("step not found: {0}")]
    NotFound(StepId),
    #[error("database error")]
    Database(#[source] sqlx::Error),
}

#[derive(Debug, Error)]
pub enum UpdateStepError {
    #[error("step not found: {0}")]
    NotFound(StepId),
    #[error("sample not found: {0}")]
    SampleNotFound(SampleId),
    #[error("invalid step transition")]
    InvalidTransition,
    #[error("database error")]
    Database(#[source] sqlx::Error),
}

#[derive(Debug, Error)]
pub enum ListStepsError {
    #[error("database error")]
    Database(#[source] sqlx::Error),
}
