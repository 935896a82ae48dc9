//! Orchestration error taxonomy (spec.md §7).
//!
//! `ValidationError`, `NotFound` and `Conflict` map directly onto HTTP
//! statuses in `apps/api`. `TransientBackend` is what remains after
//! `nanopore_db::retry::retry_transient`'s budget is exhausted. `WorkerError`
//! and `InvariantViolation` never cross the HTTP boundary — they are
//! recorded on the step/sample and logged, never returned to a caller.

use thiserror::Error;

use nanopore_db::{
    CreateSampleError, CreateStepError, CreateSubmissionError, FindSampleError, FindStepError,
    FindSubmissionError, ListSamplesError, ListStepsError, ListSubmissionsError, UpdateSampleError,
    UpdateStepError, UpdateSubmissionError,
};
use nanopore_events::EventBusError;
use nanopore_registry::RegistryError;

#[derive(Debug, Error)]
pub enum OrchestrationError {
    #[error("validation error: {0}")]
    ValidationError(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("transient backend error: {0}")]
    TransientBackend(String),

    /// A stage worker failed or exceeded its deadline. Recorded on the step,
    /// not surfaced to an HTTP caller.
    #[error("worker error: {0}")]
    WorkerError(String),

    /// Internal inconsistency (e.g. a completed step with an already
    /// in-progress successor). The affected sample is paused for operator
    /// attention; this is logged at error level, never returned over HTTP.
    #[error("invariant violation: {0}")]
    InvariantViolation(String),
}

impl From<FindSubmissionError> for OrchestrationError {
    fn from(e: FindSubmissionError) -> Self {
        match e {
            FindSubmissionError::NotFound(id) => Self::NotFound(format!("submission {id} not found")),
            FindSubmissionError::Database(err) => Self::TransientBackend(err.to_string()),
        }
    }
}

impl From<CreateSubmissionError> for OrchestrationError {
    fn from(e: CreateSubmissionError) -> Self {
        match e {
            CreateSubmissionError::NumberExists(number) => {
                Self::Conflict(format!("submission number {number} already exists"))
            }
            CreateSubmissionError::Database(err) => Self::TransientBackend(err.to_string()),
        }
    }
}

impl From<UpdateSubmissionError> for OrchestrationError {
    fn from(e: UpdateSubmissionError) -> Self {
        match e {
            UpdateSubmissionError::NotFound(id) => Self::NotFound(format!("submission {id} not found")),
            UpdateSubmissionError::Database(err) => Self::TransientBackend(err.to_string()),
        }
    }
}

impl From<ListSubmissionsError> for OrchestrationError {
    fn from(e: ListSubmissionsError) -> Self {
        match e {
            ListSubmissionsError::Database(err) => Self::TransientBackend(err.to_string()),
        }
    }
}

impl From<FindSampleError> for OrchestrationError {
    fn from(e: FindSampleError) -> Self {
        match e {
            FindSampleError::NotFound(id) => Self::NotFound(format!("sample {id} not found")),
            FindSampleError::Database(err) => Self::TransientBackend(err.to_string()),
        }
    }
}

impl From<CreateSampleError> for OrchestrationError {
    fn from(e: CreateSampleError) -> Self {
        match e {
            CreateSampleError::SubmissionNotFound(id) => {
                Self::NotFound(format!("submission {id} not found"))
            }
            CreateSampleError::DuplicateSampleNumber { submission_id, sample_number } => {
                Self::Conflict(format!(
                    "sample_number {sample_number} already exists for submission {submission_id}"
                ))
            }
            CreateSampleError::Database(err) => Self::TransientBackend(err.to_string()),
        }
    }
}

impl From<UpdateSampleError> for OrchestrationError {
    fn from(e: UpdateSampleError) -> Self {
        match e {
            UpdateSampleError::NotFound(id) => Self::NotFound(format!("sample {id} not found")),
            UpdateSampleError::Database(err) => Self::TransientBackend(err.to_string()),
        }
    }
}

impl From<ListSamplesError> for OrchestrationError {
    fn from(e: ListSamplesError) -> Self {
        match e {
            ListSamplesError::Database(err) => Self::TransientBackend(err.to_string()),
        }
    }
}

impl From<FindStepError> for OrchestrationError {
    fn from(e: FindStepError) -> Self {
        match e {
            FindStepError::NotFound(id) => Self::NotFound(format!("step {id} not found")),
            FindStepError::Database(err) => Self::TransientBackend(err.to_string()),
        }
    }
}

impl From<CreateStepError> for OrchestrationError {
    fn from(e: CreateStepError) -> Self {
        match e {
            CreateStepError::SampleNotFound(id) => Self::NotFound(format!("sample {id} not found")),
            CreateStepError::Database(err) => Self::TransientBackend(err.to_string()),
        }
    }
}

impl From<ListStepsError> for OrchestrationError {
    fn from(e: ListStepsError) -> Self {
        match e {
            ListStepsError::Database(err) => Self::TransientBackend(err.to_string()),
        }
    }
}

impl From<UpdateStepError> for OrchestrationError {
    fn from(e: UpdateStepError) -> Self {
        match e {
            UpdateStepError::NotFound(id) => Self::NotFound(format!("step {id} not found")),
            UpdateStepError::SampleNotFound(id) => Self::NotFound(format!("sample {id} not found")),
            UpdateStepError::InvalidTransition => {
                Self::Conflict("invalid step transition".into())
            }
            UpdateStepError::Database(err) => Self::TransientBackend(err.to_string()),
        }
    }
}

impl From<RegistryError> for OrchestrationError {
    fn from(e: RegistryError) -> Self {
        Self::TransientBackend(e.to_string())
    }
}

impl From<EventBusError> for OrchestrationError {
    fn from(e: EventBusError) -> Self {
        Self::TransientBackend(e.to_string())
    }
}
