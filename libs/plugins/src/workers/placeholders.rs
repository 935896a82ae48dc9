//! Placeholder workers for the seven stages with no wet-lab or instrument
//! integration in this repository. Each completes deterministically and
//! records a minimal results payload; a production deployment replaces
//! these with adapters to the lab's LIMS, sequencer control software, and
//! basecalling cluster.

use async_trait::async_trait;
use chrono::Utc;

use nanopore_domain::{ProcessingStep, Sample, WorkflowStage};

use crate::worker::{StageWorker, WorkerOutcome};

macro_rules! placeholder_worker {
    ($name:ident, $stage:expr, $label:expr) => {
        #[derive(Debug, Clone, Copy, Default)]
        pub struct $name;

        #[async_trait]
        impl StageWorker for $name {
            fn stage(&self) -> WorkflowStage {
                $stage
            }

            async fn execute(&self, _step: &ProcessingStep, _sample: &Sample) -> WorkerOutcome {
                WorkerOutcome::completed(serde_json::json!({
                    "stage": $label,
                    "completed_at": Utc::now(),
                }))
            }
        }
    };
}

placeholder_worker!(LibraryPrepWorker, WorkflowStage::LibraryPrep, "library_prep");
placeholder_worker!(LibraryQcWorker, WorkflowStage::LibraryQc, "library_qc");
placeholder_worker!(SequencingSetupWorker, WorkflowStage::SequencingSetup, "sequencing_setup");
placeholder_worker!(SequencingRunWorker, WorkflowStage::SequencingRun, "sequencing_run");
placeholder_worker!(BasecallingWorker, WorkflowStage::Basecalling, "basecalling");
placeholder_worker!(QualityAssessmentWorker, WorkflowStage::QualityAssessment, "quality_assessment");
placeholder_worker!(DataDeliveryWorker, WorkflowStage::DataDelivery, "data_delivery");

#[cfg(test)]
mod tests {
    use super::*;
    use nanopore_domain::{Priority, SampleId, SampleQcInputs, SampleStatus, SampleType, StepId, StepStatus, SubmissionId};

    fn sample() -> Sample {
        Sample {
            sample_id: SampleId::new(),
            submission_id: SubmissionId::new(),
            sample_number: 1,
            sample_name: "s1".into(),
            sample_type: SampleType::Dna,
            qc_inputs: SampleQcInputs::default(),
            workflow_stage: WorkflowStage::LibraryPrep,
            status: SampleStatus::Prep,
            priority: Priority::Normal,
            assignee: None,
            chart_field: None,
            created_at: chrono::Utc::now(),
            updated_at: chrono::Utc::now(),
        }
    }

    fn step(stage: WorkflowStage) -> ProcessingStep {
        ProcessingStep {
            step_id: StepId::new(),
            sample_id: SampleId::new(),
            step_name: stage,
            step_order: stage.order() as i16,
            step_status: StepStatus::InProgress,
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
    async fn every_placeholder_worker_completes() {
        let s = sample();
        assert!(matches!(
            LibraryPrepWorker.execute(&step(WorkflowStage::LibraryPrep), &s).await,
            WorkerOutcome::Completed { .. }
        ));
        assert!(matches!(
            DataDeliveryWorker.execute(&step(WorkflowStage::DataDelivery), &s).await,
            WorkerOutcome::Completed { .. }
        ));
    }

    #[test]
    fn stages_match_their_worker() {
        assert_eq!(LibraryPrepWorker.stage(), WorkflowStage::LibraryPrep);
        assert_eq!(LibraryQcWorker.stage(), WorkflowStage::LibraryQc);
        assert_eq!(SequencingSetupWorker.stage(), WorkflowStage::SequencingSetup);
        assert_eq!(SequencingRunWorker.stage(), WorkflowStage::SequencingRun);
        assert_eq!(BasecallingWorker.stage(), WorkflowStage::Basecalling);
        assert_eq!(QualityAssessmentWorker.stage(), WorkflowStage::QualityAssessment);
        assert_eq!(DataDeliveryWorker.stage(), WorkflowStage::DataDelivery);
    }
}
