//! Reconciler (spec.md §4.5, §4.6): a periodic per-stage scan of
//! `get_pending_steps` that recovers the in-memory queues from crashes or
//! missed events, and re-dispatches steps whose lease expired mid-work.

use std::sync::Arc;
use std::time::Duration;

use nanopore_db::{Pagination, SampleRepository, StepRepository};
use nanopore_domain::{Sample, WorkflowStage};

use crate::dependency::DependencyGraph;
use crate::queue::{PriorityQueues, QueueKey};

fn queue_key_for(sample: &Sample) -> QueueKey {
    QueueKey {
        priority: sample.priority,
        submission_date: sample.created_at,
        sample_number: sample.sample_number,
    }
}

/// Scans every stage's pending steps and enqueues any the Dependency
/// Resolver considers ready but which the in-memory queue doesn't currently
/// hold (idempotent — `PriorityQueues::enqueue` dedupes).
pub struct Reconciler {
    samples: Arc<dyn SampleRepository>,
    steps: Arc<dyn StepRepository>,
    queues: Arc<PriorityQueues>,
    page_size: i64,
}

impl Reconciler {
    #[must_use]
    pub fn new(
        samples: Arc<dyn SampleRepository>,
        steps: Arc<dyn StepRepository>,
        queues: Arc<PriorityQueues>,
    ) -> Self {
        Self { samples, steps, queues, page_size: 200 }
    }

    /// Run one reconcile pass across all eight stages.
    pub async fn reconcile_once(&self) -> Result<(), nanopore_db::ListStepsError> {
        let graph = DependencyGraph::get();

        for stage in WorkflowStage::ALL {
            let page = self
                .steps
                .get_pending_steps(stage, Pagination::with_limit(self.page_size))
                .await?;

            for step in page.items {
                let sample_steps = match self.steps.get_sample_steps(&step.sample_id).await {
                    Ok(steps) => steps,
                    Err(_) => continue,
                };
                if !graph.is_ready(&step, &sample_steps) {
                    continue;
                }
                let Ok(Some(sample)) = self.samples.get_sample(&step.sample_id).await else {
                    continue;
                };
                self.queues.enqueue(stage, step.step_id, queue_key_for(&sample));
            }
        }
        Ok(())
    }

    /// Run `reconcile_once` on a fixed interval until `shutdown` fires.
    pub async fn run(
        self: Arc<Self>,
        interval: Duration,
        mut shutdown: tokio::sync::watch::Receiver<bool>,
    ) {
        let mut ticker = tokio::time::interval(interval);
        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    if let Err(e) = self.reconcile_once().await {
                        tracing::warn!("reconcile pass failed: {e}");
                    }
                }
                _ = shutdown.changed() => {
                    if *shutdown.borrow() {
                        break;
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex as StdMutex;

    use nanopore_db::{
        CreateSampleError, CreateStepError, FindSampleError, FindStepError, ListSamplesError,
        Page, SampleStatusCounts, SampleUpdate, StepUpdate, UpdateSampleError, UpdateStepError,
    };
    use nanopore_domain::{Priority, Sample, SampleId, SampleQcInputs, SampleStatus, StepId, StepStatus, SubmissionId};

    struct FakeSamples(Vec<Sample>);

    #[async_trait::async_trait]
    impl SampleRepository for FakeSamples {
        async fn get_sample(&self, id: &SampleId) -> Result<Option<Sample>, FindSampleError> {
            Ok(self.0.iter().find(|s| &s.sample_id == id).cloned())
        }
        async fn create_samples_bulk(&self, _: &[nanopore_db::NewSample]) -> Result<Vec<Sample>, CreateSampleError> {
            unimplemented!()
        }
        async fn update_sample(&self, _: &SampleId, _: &SampleUpdate) -> Result<Sample, UpdateSampleError> {
            unimplemented!()
        }
        async fn list_by_submission(
            &self,
            _: &SubmissionId,
            _: Pagination,
        ) -> Result<Page<Sample>, ListSamplesError> {
            unimplemented!()
        }
        async fn count_samples_by_status(&self, _: &SubmissionId) -> Result<SampleStatusCounts, ListSamplesError> {
            unimplemented!()
        }
        async fn system_status_counts(&self) -> Result<nanopore_db::SystemSampleCounts, ListSamplesError> {
            unimplemented!()
        }
    }

    struct FakeSteps(StdMutex<Vec<ProcessingStep>>);

    #[async_trait::async_trait]
    impl StepRepository for FakeSteps {
        async fn get_step(&self, id: &StepId) -> Result<Option<ProcessingStep>, FindStepError> {
            Ok(self.0.lock().unwrap().iter().find(|s| &s.step_id == id).cloned())
        }
        async fn create_steps_bulk(&self, _: &[nanopore_db::NewStep]) -> Result<Vec<ProcessingStep>, CreateStepError> {
            unimplemented!()
        }
        async fn get_sample_steps(&self, sample_id: &SampleId) -> Result<Vec<ProcessingStep>, nanopore_db::ListStepsError> {
            Ok(self.0.lock().unwrap().iter().filter(|s| &s.sample_id == sample_id).cloned().collect())
        }
        async fn get_step_dependencies(&self, _: &StepId) -> Result<Vec<ProcessingStep>, FindStepError> {
            unimplemented!()
        }
        async fn get_pending_steps(
            &self,
            stage: WorkflowStage,
            pagination: Pagination,
        ) -> Result<Page<ProcessingStep>, nanopore_db::ListStepsError> {
            let matching: Vec<ProcessingStep> = self
                .0
                .lock()
                .unwrap()
                .iter()
                .filter(|s| s.step_name == stage && s.step_status == StepStatus::Pending)
                .cloned()
                .collect();
            let total = matching.len() as i64;
            Ok(Page::new(matching, total, &pagination))
        }
        async fn get_in_progress_steps(&self) -> Result<Vec<ProcessingStep>, nanopore_db::ListStepsError> {
            unimplemented!()
        }
        async fn count_failed_steps(&self) -> Result<i64, nanopore_db::ListStepsError> {
            unimplemented!()
        }
        async fn update_step(&self, _: &StepId, _: &StepUpdate) -> Result<ProcessingStep, UpdateStepError> {
            unimplemented!()
        }
    }

    fn sample() -> Sample {
        Sample {
            sample_id: SampleId::new(),
            submission_id: SubmissionId::new(),
            sample_number: 1,
            sample_name: "s1".into(),
            sample_type: nanopore_domain::SampleType::Dna,
            qc_inputs: SampleQcInputs::default(),
            workflow_stage: WorkflowStage::SampleQc,
            status: SampleStatus::Submitted,
            priority: Priority::Normal,
            assignee: None,
            chart_field: None,
            created_at: chrono::Utc::now(),
            updated_at: chrono::Utc::now(),
        }
    }

    fn step(sample_id: SampleId, stage: WorkflowStage, status: StepStatus) -> ProcessingStep {
        ProcessingStep {
            step_id: StepId::new(),
            sample_id,
            step_name: stage,
            step_order: stage.order() as i16,
            step_status: status,
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
    async fn reconcile_enqueues_ready_pending_step_missed_by_the_orchestrator() {
        let s = sample();
        let sample_qc = step(s.sample_id, WorkflowStage::SampleQc, StepStatus::Completed);
        let library_prep = step(s.sample_id, WorkflowStage::LibraryPrep, StepStatus::Pending);

        let samples = Arc::new(FakeSamples(vec![s.clone()]));
        let steps = Arc::new(FakeSteps(StdMutex::new(vec![sample_qc, library_prep])));
        let queues = Arc::new(PriorityQueues::new());
        let reconciler = Reconciler::new(samples, steps, queues.clone());

        reconciler.reconcile_once().await.unwrap();

        assert_eq!(queues.len(WorkflowStage::LibraryPrep), 1);
        assert!(queues.is_empty(WorkflowStage::SampleQc));
    }

    #[tokio::test]
    async fn reconcile_skips_pending_steps_whose_dependencies_are_unmet() {
        let s = sample();
        let sample_qc = step(s.sample_id, WorkflowStage::SampleQc, StepStatus::Pending);
        let library_prep = step(s.sample_id, WorkflowStage::LibraryPrep, StepStatus::Pending);

        let samples = Arc::new(FakeSamples(vec![s.clone()]));
        let steps = Arc::new(FakeSteps(StdMutex::new(vec![sample_qc, library_prep])));
        let queues = Arc::new(PriorityQueues::new());
        let reconciler = Reconciler::new(samples, steps, queues.clone());

        reconciler.reconcile_once().await.unwrap();

        assert_eq!(queues.len(WorkflowStage::SampleQc), 1);
        assert!(queues.is_empty(WorkflowStage::LibraryPrep));
    }

    #[tokio::test]
    async fn reconcile_is_idempotent_across_repeated_passes() {
        let s = sample();
        let sample_qc = step(s.sample_id, WorkflowStage::SampleQc, StepStatus::Pending);

        let samples = Arc::new(FakeSamples(vec![s.clone()]));
        let steps = Arc::new(FakeSteps(StdMutex::new(vec![sample_qc])));
        let queues = Arc::new(PriorityQueues::new());
        let reconciler = Reconciler::new(samples, steps, queues.clone());

        reconciler.reconcile_once().await.unwrap();
        reconciler.reconcile_once().await.unwrap();

        assert_eq!(queues.len(WorkflowStage::SampleQc), 1);
    }
}
