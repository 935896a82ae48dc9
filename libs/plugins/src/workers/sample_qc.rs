//! The Sample QC stage worker (spec.md §4.3): the one built-in worker with
//! real business logic — every other stage is a placeholder pending real
//! instrument/pipeline integration (see `super::workers` module docs).

use async_trait::async_trait;

use nanopore_domain::{ProcessingStep, Sample, WorkflowStage};

use crate::worker::{StageWorker, WorkerOutcome};

#[derive(Debug, Clone, Copy, Default)]
pub struct SampleQcWorker;

#[async_trait]
impl StageWorker for SampleQcWorker {
    fn stage(&self) -> WorkflowStage {
        WorkflowStage::SampleQc
    }

    async fn execute(&self, _step: &ProcessingStep, sample: &Sample) -> WorkerOutcome {
        let result = nanopore_quality::score_sample_qc(&sample.qc_inputs);
        let results = serde_json::json!({ "qc_result": result });

        if result.passed {
            WorkerOutcome::completed_with_qc(results, result)
        } else {
            let reason = result.notes();
            WorkerOutcome::failed_with_qc(reason, result)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nanopore_domain::{Priority, SampleId, SampleQcInputs, SampleStatus, SampleType, SubmissionId};

    fn sample_with(inputs: SampleQcInputs) -> Sample {
        Sample {
            sample_id: SampleId::new(),
            submission_id: SubmissionId::new(),
            sample_number: 1,
            sample_name: "s1".into(),
            sample_type: SampleType::Dna,
            qc_inputs: inputs,
            workflow_stage: WorkflowStage::SampleQc,
            status: SampleStatus::Submitted,
            priority: Priority::Normal,
            assignee: None,
            chart_field: None,
            created_at: chrono::Utc::now(),
            updated_at: chrono::Utc::now(),
        }
    }

    fn step() -> ProcessingStep {
        ProcessingStep {
            step_id: nanopore_domain::StepId::new(),
            sample_id: SampleId::new(),
            step_name: WorkflowStage::SampleQc,
            step_order: 1,
            step_status: nanopore_domain::StepStatus::InProgress,
            assignee: None,
            started_at: None,
            completed_at: None,
            estimated_duration_hours: 1.0,
            actual_duration_hours: None,
            notes: None,
            results: serde_json::Value::Null,
            qc_passed: None,
            qc_notes: None,
        }
    }

    #[tokio::test]
    async fn good_sample_completes() {
        let sample = sample_with(SampleQcInputs {
            concentration_ng_per_ul: Some(50.0),
            volume_ul: Some(20.0),
            ..Default::default()
        });
        let outcome = SampleQcWorker.execute(&step(), &sample).await;
        assert!(matches!(outcome, WorkerOutcome::Completed { qc_result: Some(r), .. } if r.passed));
    }

    #[tokio::test]
    async fn low_concentration_fails() {
        let sample = sample_with(SampleQcInputs {
            concentration_ng_per_ul: Some(0.5),
            volume_ul: Some(20.0),
            ..Default::default()
        });
        let outcome = SampleQcWorker.execute(&step(), &sample).await;
        assert!(matches!(outcome, WorkerOutcome::Failed { qc_result: Some(r), .. } if !r.passed));
    }
}
