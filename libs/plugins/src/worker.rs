//! The Stage Worker contract (spec.md §4.3): one `StageWorker` per
//! `WorkflowStage`, invoked by `apps/worker`'s runtime after it has acquired
//! the step's lease and loaded the sample and step from `nanopore-db`.

use async_trait::async_trait;

use nanopore_domain::{ProcessingStep, QcResult, Sample, WorkflowStage};

/// What a stage worker did with a step. The runtime translates this into the
/// Orchestrator's `step.completed` / `step.failed` handlers — the worker
/// itself never touches the database or the event bus (contract, spec.md
/// §4.3).
#[derive(Debug, Clone)]
pub enum WorkerOutcome {
    /// The step finished successfully. `results` is persisted verbatim on
    /// `ProcessingStep.results`; `qc_result` is set only by the Sample QC
    /// worker and persisted on `qc_passed` / `qc_notes`.
    Completed {
        results: serde_json::Value,
        qc_result: Option<QcResult>,
    },
    /// The step failed; `reason` is persisted as the step's `notes`. A QC
    /// gate (spec.md §4.3) that failed still reports its `qc_result` so
    /// `qc_passed`/`qc_notes` can be persisted alongside the failure.
    Failed {
        reason: String,
        qc_result: Option<QcResult>,
    },
}

impl WorkerOutcome {
    #[must_use]
    pub fn completed(results: serde_json::Value) -> Self {
        Self::Completed { results, qc_result: None }
    }

    #[must_use]
    pub fn completed_with_qc(results: serde_json::Value, qc_result: QcResult) -> Self {
        Self::Completed { results, qc_result: Some(qc_result) }
    }

    #[must_use]
    pub fn failed(reason: impl Into<String>) -> Self {
        Self::Failed { reason: reason.into(), qc_result: None }
    }

    #[must_use]
    pub fn failed_with_qc(reason: impl Into<String>, qc_result: QcResult) -> Self {
        Self::Failed { reason: reason.into(), qc_result: Some(qc_result) }
    }
}

/// Executes one `WorkflowStage`'s work for a single sample.
///
/// Implementations MUST be idempotent (spec.md §4.3: "receiving the same
/// step twice must not corrupt state") and MUST NOT write to the database
/// directly — only the return value communicates the outcome.
#[async_trait]
pub trait StageWorker: Send + Sync {
    /// The stage this worker executes.
    fn stage(&self) -> WorkflowStage;

    async fn execute(&self, step: &ProcessingStep, sample: &Sample) -> WorkerOutcome;
}
