//! The Orchestrator (spec.md §4.6): the step state machine, the six event
//! handlers, and pause/resume.
//!
//! Every handler is written as a pure function of (event, persistence,
//! registry, queues) — no implicit globals — and is safe to run twice on
//! the same event, since every write is a conditional state transition
//! rather than an unconditional overwrite (spec.md §9's redesign guidance).

use std::sync::Arc;

use chrono::Utc;

use nanopore_db::{SampleRepository, SampleUpdate, StepRepository, StepUpdate, WorkflowRepository};
use nanopore_domain::step::validate_step_transition;
use nanopore_domain::{
    stage_config, Priority, ProcessingStep, QcResult, Sample, SampleId, SampleStatus, StepId,
    StepStatus, WorkflowStage,
};
use nanopore_events::{EventBus, WorkflowEvent};
use nanopore_registry::LeaseRegistry;

use crate::dependency::DependencyGraph;
use crate::error::OrchestrationError;
use crate::queue::{PriorityQueues, QueueKey};

/// `Sample` carries no separate submission-date field; `created_at` serves
/// as the submission_date tiebreak spec.md §4.5 orders on.
fn queue_key_for(sample: &Sample, _step: &ProcessingStep) -> QueueKey {
    QueueKey {
        priority: sample.priority,
        submission_date: sample.created_at,
        sample_number: sample.sample_number,
    }
}

/// Wires the Dependency Resolver, Priority Queues, Step Registry, Event Bus
/// and Persistence Adapter into the event-handling logic spec.md §4.6
/// describes. Constructor-injected so tests can supply in-memory fakes for
/// every collaborator (spec.md §9's testability guidance).
pub struct Orchestrator {
    samples: Arc<dyn SampleRepository>,
    steps: Arc<dyn StepRepository>,
    workflow: Arc<dyn WorkflowRepository>,
    registry: Arc<dyn LeaseRegistry>,
    events: Arc<dyn EventBus>,
    queues: Arc<PriorityQueues>,
}

impl Orchestrator {
    #[must_use]
    pub fn new(
        samples: Arc<dyn SampleRepository>,
        steps: Arc<dyn StepRepository>,
        workflow: Arc<dyn WorkflowRepository>,
        registry: Arc<dyn LeaseRegistry>,
        events: Arc<dyn EventBus>,
        queues: Arc<PriorityQueues>,
    ) -> Self {
        Self {
            samples,
            steps,
            workflow,
            registry,
            events,
            queues,
        }
    }

    /// Enqueue every step in `steps` that the Dependency Resolver considers
    /// ready given the sample's full step set.
    fn enqueue_ready(&self, sample: &Sample, candidates: &[WorkflowStage], all_steps: &[ProcessingStep]) {
        let graph = DependencyGraph::get();
        for &stage in candidates {
            let Some(step) = all_steps.iter().find(|s| s.step_name == stage) else {
                continue;
            };
            if graph.is_ready(step, all_steps) {
                self.queues.enqueue(stage, step.step_id, queue_key_for(sample, step));
            }
        }
    }

    /// **sample.created**: create the eight step rows, resolve ready steps,
    /// enqueue them.
    pub async fn handle_sample_created(&self, sample: &Sample) -> Result<(), OrchestrationError> {
        let existing = self.steps.get_sample_steps(&sample.sample_id).await?;
        let already_materialized = existing.len() == WorkflowStage::ALL.len();

        let steps = if already_materialized {
            existing
        } else {
            let new_steps: Vec<_> = WorkflowStage::ALL
                .into_iter()
                .map(|stage| {
                    let config = stage_config(stage);
                    nanopore_db::NewStep {
                        sample_id: sample.sample_id,
                        step_name: stage,
                        step_order: stage.order() as i16,
                        estimated_duration_hours: config.estimated_duration_hours,
                    }
                })
                .collect();
            self.steps.create_steps_bulk(&new_steps).await?
        };

        self.enqueue_ready(sample, &WorkflowStage::ALL, &steps);

        if !already_materialized {
            self.events
                .publish(&WorkflowEvent::SampleCreated {
                    sample_id: sample.sample_id,
                    submission_id: sample.submission_id,
                    created_at: sample.created_at,
                })
                .await?;
        }
        Ok(())
    }

    /// **step.started**: the Stage Worker Runtime calls this after
    /// successfully acquiring a lease.
    pub async fn handle_step_started(&self, step_id: &StepId) -> Result<(), OrchestrationError> {
        let step = self
            .steps
            .get_step(step_id)
            .await?
            .ok_or_else(|| OrchestrationError::NotFound(format!("step {step_id} not found")))?;

        if step.step_status != StepStatus::Pending {
            // Already started by a duplicate delivery; idempotent no-op.
            return Ok(());
        }
        validate_step_transition(step.step_status, StepStatus::InProgress)
            .map_err(|e| OrchestrationError::Conflict(e.to_string()))?;

        self.steps
            .update_step(
                step_id,
                &StepUpdate {
                    step_status: Some(StepStatus::InProgress),
                    started_at: Some(Utc::now()),
                    ..Default::default()
                },
            )
            .await?;

        self.events
            .publish(&WorkflowEvent::StepStarted {
                step_id: *step_id,
                sample_id: step.sample_id,
                stage: step.step_name,
                started_at: Utc::now(),
            })
            .await?;
        Ok(())
    }

    /// **step.completed**: marks the step completed, advances the sample to
    /// the next stage (stepwise — spec.md §9's chosen behavior), enqueues
    /// newly-ready steps, and completes the sample if this was the last one.
    pub async fn handle_step_completed(
        &self,
        step_id: &StepId,
        actual_duration_hours: f64,
        results: serde_json::Value,
        qc_passed: Option<bool>,
    ) -> Result<(), OrchestrationError> {
        let step = self
            .steps
            .get_step(step_id)
            .await?
            .ok_or_else(|| OrchestrationError::NotFound(format!("step {step_id} not found")))?;

        if step.step_status == StepStatus::Completed {
            return Ok(()); // duplicate delivery
        }
        validate_step_transition(step.step_status, StepStatus::Completed)
            .map_err(|e| OrchestrationError::Conflict(e.to_string()))?;

        let sample_before = self
            .samples
            .get_sample(&step.sample_id)
            .await?
            .ok_or_else(|| OrchestrationError::NotFound(format!("sample {} not found", step.sample_id)))?;

        // The step row hasn't been written yet (the combined update below
        // does that), so the completing step is patched in-memory before
        // computing readiness/completion against its siblings.
        let mut all_steps = self.steps.get_sample_steps(&step.sample_id).await?;
        if let Some(s) = all_steps.iter_mut().find(|s| s.step_id == *step_id) {
            s.step_status = StepStatus::Completed;
        }
        let all_completed = all_steps.iter().all(|s| s.step_status == StepStatus::Completed);

        let next_stage = step.step_name.next();
        let sample_update = SampleUpdate {
            workflow_stage: next_stage,
            status: all_completed.then_some(SampleStatus::Completed),
            ..Default::default()
        };

        let (_, sample) = self
            .workflow
            .update_step_and_sample(
                step_id,
                &StepUpdate {
                    step_status: Some(StepStatus::Completed),
                    completed_at: Some(Utc::now()),
                    actual_duration_hours: Some(actual_duration_hours),
                    results: Some(results),
                    qc_passed: Some(qc_passed),
                    ..Default::default()
                },
                &step.sample_id,
                &sample_update,
            )
            .await?;

        self.queues.remove(step.step_name, *step_id);

        let ready = DependencyGraph::get().newly_ready_after(step.step_name, &all_steps);
        self.enqueue_ready(&sample, &ready, &all_steps);

        self.events
            .publish(&WorkflowEvent::StepCompleted {
                step_id: *step_id,
                sample_id: step.sample_id,
                stage: step.step_name,
                qc_passed,
                completed_at: Utc::now(),
            })
            .await?;

        if all_completed && sample_before.status != SampleStatus::Completed {
            self.events
                .publish(&WorkflowEvent::SampleStatusChanged {
                    sample_id: step.sample_id,
                    from: sample_before.status,
                    to: SampleStatus::Completed,
                    changed_at: Utc::now(),
                })
                .await?;
            self.events
                .publish(&WorkflowEvent::WorkflowCompleted {
                    sample_id: step.sample_id,
                    submission_id: sample.submission_id,
                    completed_at: Utc::now(),
                })
                .await?;
        }

        Ok(())
    }

    /// **step.failed**: mark the step failed, surface the sample for manual
    /// intervention (`status = prep`). No automatic retry.
    pub async fn handle_step_failed(
        &self,
        step_id: &StepId,
        reason: &str,
        qc_result: Option<QcResult>,
    ) -> Result<(), OrchestrationError> {
        let step = self
            .steps
            .get_step(step_id)
            .await?
            .ok_or_else(|| OrchestrationError::NotFound(format!("step {step_id} not found")))?;

        if step.step_status == StepStatus::Failed {
            return Ok(()); // duplicate delivery
        }
        validate_step_transition(step.step_status, StepStatus::Failed)
            .map_err(|e| OrchestrationError::Conflict(e.to_string()))?;

        let sample_before = self
            .samples
            .get_sample(&step.sample_id)
            .await?
            .ok_or_else(|| OrchestrationError::NotFound(format!("sample {} not found", step.sample_id)))?;

        let qc_passed = qc_result.as_ref().map(|r| r.passed);
        let qc_notes = qc_result.as_ref().map(QcResult::notes);

        self.workflow
            .update_step_and_sample(
                step_id,
                &StepUpdate {
                    step_status: Some(StepStatus::Failed),
                    notes: Some(reason.to_string()),
                    qc_passed: Some(qc_passed),
                    qc_notes,
                    ..Default::default()
                },
                &step.sample_id,
                &SampleUpdate {
                    status: Some(SampleStatus::Prep),
                    ..Default::default()
                },
            )
            .await?;

        self.queues.remove(step.step_name, *step_id);
        self.registry
            .release_lease(step_id, &step_id.to_string())
            .await
            .ok(); // best-effort; registry disagreement resolves in favor of the database

        self.events
            .publish(&WorkflowEvent::StepFailed {
                step_id: *step_id,
                sample_id: step.sample_id,
                stage: step.step_name,
                reason: reason.to_string(),
                failed_at: Utc::now(),
            })
            .await?;

        if sample_before.status != SampleStatus::Prep {
            self.events
                .publish(&WorkflowEvent::SampleStatusChanged {
                    sample_id: step.sample_id,
                    from: sample_before.status,
                    to: SampleStatus::Prep,
                    changed_at: Utc::now(),
                })
                .await?;
        }
        Ok(())
    }

    /// **priority.changed**: update the sample priority, reorder its pending
    /// steps in every affected stage queue. In-progress steps are untouched.
    pub async fn handle_priority_changed(
        &self,
        sample_id: &SampleId,
        new_priority: Priority,
    ) -> Result<(), OrchestrationError> {
        let sample = self
            .samples
            .get_sample(sample_id)
            .await?
            .ok_or_else(|| OrchestrationError::NotFound(format!("sample {sample_id} not found")))?;

        let from = sample.priority;
        if from == new_priority {
            return Ok(()); // no-op per spec.md §8's idempotence law
        }

        let updated = self
            .samples
            .update_sample(
                sample_id,
                &SampleUpdate {
                    priority: Some(new_priority),
                    ..Default::default()
                },
            )
            .await?;

        let all_steps = self.steps.get_sample_steps(sample_id).await?;
        let entries: Vec<_> = all_steps
            .iter()
            .filter(|s| s.step_status == StepStatus::Pending)
            .map(|s| (s.step_name, s.step_id, queue_key_for(&updated, s)))
            .collect();
        self.queues.reorder(&entries);

        self.events
            .publish(&WorkflowEvent::PriorityChanged {
                sample_id: *sample_id,
                from,
                to: new_priority,
                changed_at: Utc::now(),
            })
            .await?;
        Ok(())
    }

    /// **sample.status_changed**: no-op unless the sample became `archived`,
    /// in which case its pending steps are dropped from every queue.
    pub async fn handle_sample_status_changed(
        &self,
        sample_id: &SampleId,
        to: SampleStatus,
    ) -> Result<(), OrchestrationError> {
        if to != SampleStatus::Archived {
            return Ok(());
        }
        let steps = self.steps.get_sample_steps(sample_id).await?;
        for step in steps.iter().filter(|s| s.step_status == StepStatus::Pending) {
            self.queues.remove(step.step_name, step.step_id);
        }
        Ok(())
    }

    /// Pause: remove pending steps from queues, move `in_progress` steps
    /// back to `pending` after revoking their leases.
    pub async fn pause_sample(&self, sample_id: &SampleId) -> Result<(), OrchestrationError> {
        let steps = self.steps.get_sample_steps(sample_id).await?;
        for step in &steps {
            match step.step_status {
                StepStatus::Pending => self.queues.remove(step.step_name, step.step_id),
                StepStatus::InProgress => {
                    self.registry
                        .release_lease(&step.step_id, &step.step_id.to_string())
                        .await
                        .ok();
                    self.steps
                        .update_step(
                            &step.step_id,
                            &StepUpdate {
                                step_status: Some(StepStatus::Pending),
                                started_at: None,
                                ..Default::default()
                            },
                        )
                        .await?;
                }
                StepStatus::Completed | StepStatus::Failed | StepStatus::Skipped => {}
            }
        }
        Ok(())
    }

    /// Resume: re-enqueue the sample's first ready step.
    pub async fn resume_sample(&self, sample_id: &SampleId) -> Result<(), OrchestrationError> {
        let sample = self
            .samples
            .get_sample(sample_id)
            .await?
            .ok_or_else(|| OrchestrationError::NotFound(format!("sample {sample_id} not found")))?;
        let steps = self.steps.get_sample_steps(sample_id).await?;
        let graph = DependencyGraph::get();

        if let Some(first_ready) = steps.iter().find(|s| graph.is_ready(s, &steps)) {
            self.queues.enqueue(
                first_ready.step_name,
                first_ready.step_id,
                queue_key_for(&sample, first_ready),
            );
        }
        Ok(())
    }

    /// Operator "retry step" action (spec.md §9's resolved open question):
    /// `failed -> pending`, clearing notes, then re-enqueuing if ready.
    pub async fn retry_step(&self, step_id: &StepId) -> Result<(), OrchestrationError> {
        let step = self
            .steps
            .get_step(step_id)
            .await?
            .ok_or_else(|| OrchestrationError::NotFound(format!("step {step_id} not found")))?;

        validate_step_transition(step.step_status, StepStatus::Pending)
            .map_err(|_| OrchestrationError::Conflict("step is not in a failed state".into()))?;

        self.steps
            .update_step(
                step_id,
                &StepUpdate {
                    step_status: Some(StepStatus::Pending),
                    notes: Some(String::new()),
                    ..Default::default()
                },
            )
            .await?;

        let sample = self
            .samples
            .get_sample(&step.sample_id)
            .await?
            .ok_or_else(|| OrchestrationError::NotFound(format!("sample {} not found", step.sample_id)))?;
        let all_steps = self.steps.get_sample_steps(&step.sample_id).await?;
        // `step` is now stale (still `Failed`); `is_ready` requires `Pending`,
        // so the readiness check must run against the refetched copy.
        if let Some(retried) = all_steps.iter().find(|s| s.step_id == *step_id) {
            if DependencyGraph::get().is_ready(retried, &all_steps) {
                self.queues.enqueue(retried.step_name, *step_id, queue_key_for(&sample, retried));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::sync::Mutex as StdMutex;

    use nanopore_db::{
        CreateSampleError, CreateStepError, ListSamplesError, ListStepsError, NewSample, NewStep,
        Page, Pagination, SampleStatusCounts,
    };
    use nanopore_domain::SubmissionId;
    use nanopore_events::InMemoryEventBus;
    use nanopore_registry::RegistryError;

    struct FakeSamples(StdMutex<HashMap<SampleId, Sample>>);

    impl FakeSamples {
        fn with(samples: Vec<Sample>) -> Self {
            Self(StdMutex::new(samples.into_iter().map(|s| (s.sample_id, s)).collect()))
        }

        fn get(&self, id: &SampleId) -> Sample {
            self.0.lock().unwrap().get(id).cloned().expect("sample present")
        }
    }

    #[async_trait]
    impl SampleRepository for FakeSamples {
        async fn get_sample(&self, id: &SampleId) -> Result<Option<Sample>, nanopore_db::FindSampleError> {
            Ok(self.0.lock().unwrap().get(id).cloned())
        }

        async fn create_samples_bulk(&self, _samples: &[NewSample]) -> Result<Vec<Sample>, CreateSampleError> {
            unimplemented!("orchestrator never bulk-creates samples")
        }

        async fn update_sample(
            &self,
            id: &SampleId,
            update: &SampleUpdate,
        ) -> Result<Sample, nanopore_db::UpdateSampleError> {
            let mut map = self.0.lock().unwrap();
            let sample = map.get_mut(id).ok_or(nanopore_db::UpdateSampleError::NotFound(*id))?;
            if let Some(stage) = update.workflow_stage {
                sample.workflow_stage = stage;
            }
            if let Some(status) = update.status {
                sample.status = status;
            }
            if let Some(priority) = update.priority {
                sample.priority = priority;
            }
            if let Some(assignee) = update.assignee.clone() {
                sample.assignee = assignee;
            }
            Ok(sample.clone())
        }

        async fn list_by_submission(
            &self,
            _submission_id: &SubmissionId,
            _pagination: Pagination,
        ) -> Result<Page<Sample>, ListSamplesError> {
            unimplemented!("not exercised by orchestrator tests")
        }

        async fn count_samples_by_status(
            &self,
            _submission_id: &SubmissionId,
        ) -> Result<SampleStatusCounts, ListSamplesError> {
            unimplemented!("not exercised by orchestrator tests")
        }

        async fn system_status_counts(
            &self,
        ) -> Result<nanopore_db::SystemSampleCounts, ListSamplesError> {
            unimplemented!("api-only, not exercised by orchestrator tests")
        }
    }

    struct FakeSteps(StdMutex<HashMap<StepId, ProcessingStep>>);

    impl FakeSteps {
        fn with(steps: Vec<ProcessingStep>) -> Self {
            Self(StdMutex::new(steps.into_iter().map(|s| (s.step_id, s)).collect()))
        }

        fn get(&self, id: &StepId) -> ProcessingStep {
            self.0.lock().unwrap().get(id).cloned().expect("step present")
        }
    }

    #[async_trait]
    impl StepRepository for FakeSteps {
        async fn get_step(&self, id: &StepId) -> Result<Option<ProcessingStep>, nanopore_db::FindStepError> {
            Ok(self.0.lock().unwrap().get(id).cloned())
        }

        async fn create_steps_bulk(&self, new: &[NewStep]) -> Result<Vec<ProcessingStep>, CreateStepError> {
            let mut map = self.0.lock().unwrap();
            let created: Vec<ProcessingStep> = new
                .iter()
                .map(|n| ProcessingStep {
                    step_id: StepId::new(),
                    sample_id: n.sample_id,
                    step_name: n.step_name,
                    step_order: n.step_order,
                    step_status: StepStatus::Pending,
                    assignee: None,
                    started_at: None,
                    completed_at: None,
                    estimated_duration_hours: n.estimated_duration_hours,
                    actual_duration_hours: None,
                    notes: None,
                    results: serde_json::Value::Null,
                    qc_passed: None,
                    qc_notes: None,
                })
                .collect();
            for step in &created {
                map.insert(step.step_id, step.clone());
            }
            Ok(created)
        }

        async fn get_sample_steps(&self, sample_id: &SampleId) -> Result<Vec<ProcessingStep>, ListStepsError> {
            Ok(self
                .0
                .lock()
                .unwrap()
                .values()
                .filter(|s| &s.sample_id == sample_id)
                .cloned()
                .collect())
        }

        async fn get_step_dependencies(
            &self,
            _step_id: &StepId,
        ) -> Result<Vec<ProcessingStep>, nanopore_db::FindStepError> {
            unimplemented!("orchestrator uses the Dependency Resolver's compiled-in table, not this query")
        }

        async fn get_pending_steps(
            &self,
            _stage: WorkflowStage,
            _pagination: Pagination,
        ) -> Result<Page<ProcessingStep>, ListStepsError> {
            unimplemented!("reconciler-only, not exercised here")
        }

        async fn get_in_progress_steps(&self) -> Result<Vec<ProcessingStep>, ListStepsError> {
            unimplemented!("reconciler-only, not exercised here")
        }

        async fn count_failed_steps(&self) -> Result<i64, ListStepsError> {
            unimplemented!("api-only, not exercised here")
        }

        async fn update_step(
            &self,
            id: &StepId,
            update: &StepUpdate,
        ) -> Result<ProcessingStep, nanopore_db::UpdateStepError> {
            let mut map = self.0.lock().unwrap();
            let step = map.get_mut(id).ok_or(nanopore_db::UpdateStepError::NotFound(*id))?;
            if let Some(status) = update.step_status {
                step.step_status = status;
            }
            if let Some(assignee) = update.assignee.clone() {
                step.assignee = assignee;
            }
            if update.started_at.is_some() {
                step.started_at = update.started_at;
            }
            if update.completed_at.is_some() {
                step.completed_at = update.completed_at;
            }
            if let Some(dur) = update.actual_duration_hours {
                step.actual_duration_hours = Some(dur);
            }
            if let Some(notes) = update.notes.clone() {
                step.notes = Some(notes);
            }
            if let Some(results) = update.results.clone() {
                step.results = results;
            }
            if let Some(qc) = update.qc_passed {
                step.qc_passed = qc;
            }
            if let Some(qc_notes) = update.qc_notes.clone() {
                step.qc_notes = Some(qc_notes);
            }
            Ok(step.clone())
        }
    }

    /// Delegates to the same `FakeSamples`/`FakeSteps` instances the test
    /// already holds, so the combined update mutates the maps the test
    /// assertions read from. Not transactional — good enough to exercise
    /// the orchestrator logic that calls it.
    struct FakeWorkflow {
        samples: Arc<FakeSamples>,
        steps: Arc<FakeSteps>,
    }

    #[async_trait]
    impl nanopore_db::WorkflowRepository for FakeWorkflow {
        async fn update_step_and_sample(
            &self,
            step_id: &StepId,
            step_update: &StepUpdate,
            sample_id: &SampleId,
            sample_update: &SampleUpdate,
        ) -> Result<(ProcessingStep, Sample), nanopore_db::UpdateStepError> {
            let step = self.steps.update_step(step_id, step_update).await?;
            let sample = self.samples.update_sample(sample_id, sample_update).await.map_err(|e| match e {
                nanopore_db::UpdateSampleError::NotFound(id) => nanopore_db::UpdateStepError::SampleNotFound(id),
                nanopore_db::UpdateSampleError::Database(err) => nanopore_db::UpdateStepError::Database(err),
            })?;
            Ok((step, sample))
        }
    }

    struct FakeRegistry;

    #[async_trait]
    impl LeaseRegistry for FakeRegistry {
        async fn acquire_lease(
            &self,
            _step_id: &StepId,
            _holder: &str,
            _ttl: std::time::Duration,
        ) -> Result<nanopore_registry::Lease, RegistryError> {
            unimplemented!("the orchestrator never acquires leases, only releases them")
        }

        async fn renew_lease(
            &self,
            _step_id: &StepId,
            _holder: &str,
            _ttl: std::time::Duration,
        ) -> Result<nanopore_registry::Lease, RegistryError> {
            unimplemented!("the orchestrator never renews leases")
        }

        async fn release_lease(&self, _step_id: &StepId, _holder: &str) -> Result<(), RegistryError> {
            Ok(())
        }

        async fn get_lease_holder(&self, _step_id: &StepId) -> Result<Option<String>, RegistryError> {
            Ok(None)
        }
    }

    fn sample(priority: Priority) -> Sample {
        Sample {
            sample_id: SampleId::new(),
            submission_id: SubmissionId::new(),
            sample_number: 1,
            sample_name: "s1".into(),
            sample_type: nanopore_domain::SampleType::Dna,
            qc_inputs: nanopore_domain::SampleQcInputs::default(),
            workflow_stage: WorkflowStage::SampleQc,
            status: SampleStatus::Submitted,
            priority,
            assignee: None,
            chart_field: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
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

    fn orchestrator(
        samples: Vec<Sample>,
        steps: Vec<ProcessingStep>,
    ) -> (Orchestrator, Arc<FakeSamples>, Arc<FakeSteps>, Arc<PriorityQueues>) {
        let samples = Arc::new(FakeSamples::with(samples));
        let steps = Arc::new(FakeSteps::with(steps));
        let queues = Arc::new(PriorityQueues::new());
        let workflow = Arc::new(FakeWorkflow { samples: samples.clone(), steps: steps.clone() });
        let orchestrator = Orchestrator::new(
            samples.clone(),
            steps.clone(),
            workflow,
            Arc::new(FakeRegistry),
            Arc::new(InMemoryEventBus::default()),
            queues.clone(),
        );
        (orchestrator, samples, steps, queues)
    }

    #[tokio::test]
    async fn sample_created_materializes_all_eight_steps_and_enqueues_only_sample_qc() {
        let s = sample(Priority::Normal);
        let (orchestrator, _samples, steps, queues) = orchestrator(vec![s.clone()], vec![]);

        orchestrator.handle_sample_created(&s).await.unwrap();

        assert_eq!(steps.0.lock().unwrap().len(), WorkflowStage::ALL.len());
        assert_eq!(queues.len(WorkflowStage::SampleQc), 1);
        for stage in WorkflowStage::ALL.into_iter().skip(1) {
            assert!(queues.is_empty(stage), "{stage:?} should not be ready yet");
        }
    }

    #[tokio::test]
    async fn sample_created_is_idempotent_on_duplicate_delivery() {
        let s = sample(Priority::Normal);
        let (orchestrator, _samples, steps, _queues) = orchestrator(vec![s.clone()], vec![]);

        orchestrator.handle_sample_created(&s).await.unwrap();
        orchestrator.handle_sample_created(&s).await.unwrap();

        assert_eq!(steps.0.lock().unwrap().len(), WorkflowStage::ALL.len());
    }

    #[tokio::test]
    async fn step_completed_advances_sample_and_enqueues_next_stage() {
        let s = sample(Priority::Normal);
        let sample_qc = step(s.sample_id, WorkflowStage::SampleQc, StepStatus::InProgress);
        let library_prep = step(s.sample_id, WorkflowStage::LibraryPrep, StepStatus::Pending);
        let sample_qc_id = sample_qc.step_id;
        let rest: Vec<ProcessingStep> = WorkflowStage::ALL
            .into_iter()
            .skip(2)
            .map(|stage| step(s.sample_id, stage, StepStatus::Pending))
            .collect();

        let mut all = vec![sample_qc, library_prep];
        all.extend(rest);
        let (orchestrator, samples, _steps, queues) = orchestrator(vec![s.clone()], all);

        orchestrator
            .handle_step_completed(&sample_qc_id, 1.0, serde_json::json!({"ok": true}), Some(true))
            .await
            .unwrap();

        let updated = samples.get(&s.sample_id);
        assert_eq!(updated.workflow_stage, WorkflowStage::LibraryPrep);
        assert_eq!(queues.len(WorkflowStage::LibraryPrep), 1);
        assert!(queues.is_empty(WorkflowStage::SampleQc));
    }

    #[tokio::test]
    async fn step_completed_is_idempotent_on_duplicate_delivery() {
        let s = sample(Priority::Normal);
        let mut sample_qc = step(s.sample_id, WorkflowStage::SampleQc, StepStatus::Completed);
        sample_qc.completed_at = Some(Utc::now());
        let sample_qc_id = sample_qc.step_id;
        let rest: Vec<ProcessingStep> = WorkflowStage::ALL
            .into_iter()
            .skip(1)
            .map(|stage| step(s.sample_id, stage, StepStatus::Pending))
            .collect();
        let mut all = vec![sample_qc];
        all.extend(rest);

        let (orchestrator, _samples, _steps, _queues) = orchestrator(vec![s.clone()], all);

        // Already completed: this must be a no-op, not a transition error.
        let result = orchestrator
            .handle_step_completed(&sample_qc_id, 1.0, serde_json::json!({}), Some(true))
            .await;
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn last_step_completed_marks_sample_completed_and_publishes_workflow_completed() {
        let s = sample(Priority::Normal);
        let mut steps: Vec<ProcessingStep> = WorkflowStage::ALL
            .into_iter()
            .map(|stage| step(s.sample_id, stage, StepStatus::Completed))
            .collect();
        let last = steps.last_mut().unwrap();
        last.step_status = StepStatus::InProgress;
        let last_id = last.step_id;

        let samples = Arc::new(FakeSamples::with(vec![s.clone()]));
        let steps_repo = Arc::new(FakeSteps::with(steps));
        let queues = Arc::new(PriorityQueues::new());
        let events = Arc::new(InMemoryEventBus::default());
        let mut rx = events.subscribe().await.unwrap();
        let workflow = Arc::new(FakeWorkflow { samples: samples.clone(), steps: steps_repo.clone() });
        let orchestrator = Orchestrator::new(
            samples.clone(),
            steps_repo,
            workflow,
            Arc::new(FakeRegistry),
            events,
            queues,
        );

        orchestrator
            .handle_step_completed(&last_id, 1.0, serde_json::json!({}), None)
            .await
            .unwrap();

        assert_eq!(samples.get(&s.sample_id).status, SampleStatus::Completed);

        let first = rx.recv().await.unwrap();
        assert_eq!(first.event_type(), "step.completed");
        let second = rx.recv().await.unwrap();
        assert_eq!(second.event_type(), "sample.status_changed");
        let third = rx.recv().await.unwrap();
        assert_eq!(third.event_type(), "workflow.completed");
    }

    #[tokio::test]
    async fn step_failed_moves_sample_to_prep_and_clears_queue() {
        let s = sample(Priority::Normal);
        let mut failing = step(s.sample_id, WorkflowStage::LibraryPrep, StepStatus::InProgress);
        failing.step_status = StepStatus::InProgress;
        let failing_id = failing.step_id;
        let (orchestrator, samples, _steps, queues) = orchestrator(vec![s.clone()], vec![failing]);
        queues.enqueue(
            WorkflowStage::LibraryPrep,
            failing_id,
            QueueKey {
                priority: Priority::Normal,
                submission_date: Utc::now(),
                sample_number: 1,
            },
        );

        orchestrator.handle_step_failed(&failing_id, "worker crashed", None).await.unwrap();

        assert_eq!(samples.get(&s.sample_id).status, SampleStatus::Prep);
        assert!(queues.is_empty(WorkflowStage::LibraryPrep));
    }

    #[tokio::test]
    async fn priority_changed_reorders_pending_steps_only() {
        let s = sample(Priority::Normal);
        let pending = step(s.sample_id, WorkflowStage::SampleQc, StepStatus::Pending);
        let pending_id = pending.step_id;
        let other_sample = sample(Priority::Normal);
        let other_pending = step(other_sample.sample_id, WorkflowStage::SampleQc, StepStatus::Pending);
        let other_id = other_pending.step_id;

        let (orchestrator, _samples, _steps, queues) =
            orchestrator(vec![s.clone(), other_sample], vec![pending, other_pending]);

        let now = Utc::now();
        queues.enqueue(
            WorkflowStage::SampleQc,
            other_id,
            QueueKey { priority: Priority::Normal, submission_date: now, sample_number: 2 },
        );
        queues.enqueue(
            WorkflowStage::SampleQc,
            pending_id,
            QueueKey { priority: Priority::Normal, submission_date: now, sample_number: 1 },
        );

        orchestrator.handle_priority_changed(&s.sample_id, Priority::Urgent).await.unwrap();

        // Urgent now outranks the untouched normal-priority sample.
        assert_eq!(queues.dequeue(WorkflowStage::SampleQc), Some(pending_id));
        assert_eq!(queues.dequeue(WorkflowStage::SampleQc), Some(other_id));
    }

    #[tokio::test]
    async fn priority_changed_to_same_priority_is_a_no_op() {
        let s = sample(Priority::High);
        let (orchestrator, _samples, _steps, _queues) = orchestrator(vec![s.clone()], vec![]);
        orchestrator.handle_priority_changed(&s.sample_id, Priority::High).await.unwrap();
    }

    #[tokio::test]
    async fn pause_then_resume_requeues_the_ready_step() {
        let s = sample(Priority::Normal);
        let mut in_progress = step(s.sample_id, WorkflowStage::SampleQc, StepStatus::InProgress);
        in_progress.started_at = Some(Utc::now());
        let step_id = in_progress.step_id;
        let rest: Vec<ProcessingStep> = WorkflowStage::ALL
            .into_iter()
            .skip(1)
            .map(|stage| step(s.sample_id, stage, StepStatus::Pending))
            .collect();
        let mut all = vec![in_progress];
        all.extend(rest);

        let (orchestrator, _samples, steps_repo, queues) = orchestrator(vec![s.clone()], all);

        orchestrator.pause_sample(&s.sample_id).await.unwrap();
        assert_eq!(steps_repo.get(&step_id).step_status, StepStatus::Pending);

        orchestrator.resume_sample(&s.sample_id).await.unwrap();
        assert_eq!(queues.len(WorkflowStage::SampleQc), 1);
    }

    #[tokio::test]
    async fn retry_step_moves_failed_step_back_to_pending_and_requeues() {
        let s = sample(Priority::Normal);
        let mut failed = step(s.sample_id, WorkflowStage::SampleQc, StepStatus::Failed);
        failed.notes = Some("boom".into());
        let step_id = failed.step_id;

        let (orchestrator, _samples, steps_repo, queues) = orchestrator(vec![s.clone()], vec![failed]);

        orchestrator.retry_step(&step_id).await.unwrap();

        let retried = steps_repo.get(&step_id);
        assert_eq!(retried.step_status, StepStatus::Pending);
        assert_eq!(queues.len(WorkflowStage::SampleQc), 1);
    }

    #[tokio::test]
    async fn sample_status_changed_to_archived_clears_pending_steps() {
        let s = sample(Priority::Normal);
        let pending = step(s.sample_id, WorkflowStage::LibraryPrep, StepStatus::Pending);
        let pending_id = pending.step_id;
        let (orchestrator, _samples, _steps, queues) = orchestrator(vec![s.clone()], vec![pending]);
        queues.enqueue(
            WorkflowStage::LibraryPrep,
            pending_id,
            QueueKey { priority: Priority::Normal, submission_date: Utc::now(), sample_number: 1 },
        );

        orchestrator
            .handle_sample_status_changed(&s.sample_id, SampleStatus::Archived)
            .await
            .unwrap();

        assert!(queues.is_empty(WorkflowStage::LibraryPrep));
    }
}
