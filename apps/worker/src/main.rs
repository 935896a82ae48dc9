//! Stage Worker Runtime binary (spec.md §4.7): pulls dequeued steps off the
//! scheduler, acquires a lease, runs the stage's `StageWorker`, and reports
//! the outcome back to the Orchestrator.
//!
//! This binary and `apps/api` both build the full engine (Orchestrator,
//! Priority Queues, Scheduler, Reconciler) against the same database, Redis
//! and event bus — they are self-sufficient replicas, not client/server.
//! `apps/worker` runs with no HTTP surface and exists so worker capacity can
//! scale independently of the HTTP front door (spec.md §9: "global
//! singletons for DB/cache/bus... process-wide state with documented
//! init/teardown").

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use tokio::signal;
use tokio::sync::watch;
use uuid::Uuid;

use nanopore_db::{
    create_pool, DatabaseConfig, PgSampleRepository, PgStepRepository, PgSubmissionRepository,
    PgWorkflowRepository, SampleRepository, StepRepository, SubmissionRepository, WorkflowRepository,
};
use nanopore_domain::{ProcessingStep, Sample, StepId, WorkflowStage};
use nanopore_events::{create_nats_client, EventBus, JetStreamEventBus, NatsConfig, WorkflowEvent};
use nanopore_plugins::{StageWorkerRegistry, WorkerOutcome};
use nanopore_registry::{create_redis_pool, Lease, LeaseRegistry, RedisConfig, StepRegistry};
use nanopore_workflow_engine::{
    spawn_scheduler_tasks, Dispatch, Orchestrator, PriorityQueues, Reconciler, SubmissionAggregator,
};

/// Dispatches a dequeued step to its `StageWorker`, owning the lease
/// lifecycle end to end (`nanopore_workflow_engine::scheduler` only hands
/// off a step id; it never talks to the registry directly).
struct WorkerDispatch {
    holder: String,
    samples: Arc<dyn SampleRepository>,
    steps: Arc<dyn StepRepository>,
    registry: Arc<dyn LeaseRegistry>,
    orchestrator: Arc<Orchestrator>,
    config: nanopore_workflow_engine::EngineConfig,
}

impl WorkerDispatch {
    async fn run_step(&self, stage: WorkflowStage, step_id: StepId) -> Result<(), String> {
        let step = self
            .steps
            .get_step(&step_id)
            .await
            .map_err(|e| e.to_string())?
            .ok_or_else(|| "step disappeared before dispatch".to_string())?;

        let ttl = self.config.lease_ttl_for(step.estimated_duration_hours);
        match self
            .registry
            .acquire_lease(&step_id, &self.holder, ttl)
            .await
            .map_err(|e| e.to_string())?
        {
            Lease::Held => {}
            Lease::HeldByOther(holder) => {
                tracing::debug!(%step_id, %holder, "lease held by another worker, skipping");
                return Ok(());
            }
        }

        let sample = self
            .samples
            .get_sample(&step.sample_id)
            .await
            .map_err(|e| e.to_string())?
            .ok_or_else(|| "sample disappeared before dispatch".to_string())?;

        self.orchestrator
            .handle_step_started(&step_id)
            .await
            .map_err(|e| e.to_string())?;

        let outcome = self.execute_with_lease_renewal(stage, &step, &sample).await;

        let started_at = step.started_at.unwrap_or_else(Utc::now);
        let actual_duration_hours = (Utc::now() - started_at).num_seconds() as f64 / 3600.0;

        match outcome {
            WorkerOutcome::Completed { results, qc_result } => {
                self.orchestrator
                    .handle_step_completed(
                        &step_id,
                        actual_duration_hours,
                        results,
                        qc_result.map(|r| r.passed),
                    )
                    .await
                    .map_err(|e| e.to_string())?;
            }
            WorkerOutcome::Failed { reason, qc_result } => {
                self.orchestrator
                    .handle_step_failed(&step_id, &reason, qc_result)
                    .await
                    .map_err(|e| e.to_string())?;
            }
        }

        self.registry.release_lease(&step_id, &self.holder).await.ok();
        Ok(())
    }

    /// Runs the worker while renewing the lease at half its TTL, so a stage
    /// worker that genuinely takes close to `estimated_duration_hours`
    /// doesn't lose its lease to a reconciler re-dispatch mid-work.
    async fn execute_with_lease_renewal(
        &self,
        stage: WorkflowStage,
        step: &ProcessingStep,
        sample: &Sample,
    ) -> WorkerOutcome {
        let worker = StageWorkerRegistry::get().worker_for(stage);
        let ttl = self.config.lease_ttl_for(step.estimated_duration_hours);
        let renew_every = ttl / 2;

        let registry = self.registry.clone();
        let holder = self.holder.clone();
        let step_id = step.step_id;
        let (stop_tx, mut stop_rx) = watch::channel(false);

        let renewal = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(renew_every);
            ticker.tick().await; // first tick fires immediately; skip it
            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        if registry.renew_lease(&step_id, &holder, ttl).await.is_err() {
                            tracing::warn!(%step_id, "failed to renew lease");
                        }
                    }
                    _ = stop_rx.changed() => break,
                }
            }
        });

        let outcome = worker.execute(step, sample).await;
        let _ = stop_tx.send(true);
        renewal.abort();
        outcome
    }
}

#[async_trait]
impl Dispatch for WorkerDispatch {
    async fn dispatch(&self, stage: WorkflowStage, step_id: StepId) {
        if let Err(err) = self.run_step(stage, step_id).await {
            tracing::warn!(%step_id, %stage, %err, "stage worker dispatch failed");
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    nanopore_common::init_tracing();
    let settings = nanopore_common::Settings::load()?;
    let engine_config = settings.engine_config();

    let db_pool = create_pool(&DatabaseConfig {
        url: settings.connections.database_url.clone(),
        ..Default::default()
    })
    .await?;
    let redis_pool = create_redis_pool(&RedisConfig {
        url: settings.connections.step_registry_url.clone(),
        ..Default::default()
    })?;

    let holder = format!("nanopore-worker-{}", Uuid::new_v4());
    let nats_config = NatsConfig {
        url: settings.connections.event_bus_url.clone(),
        consumer_name: holder.clone(),
        ..Default::default()
    };
    let nats_client = create_nats_client(&nats_config).await?;
    let events: Arc<dyn EventBus> = Arc::new(JetStreamEventBus::connect(nats_client, &nats_config).await?);

    let samples: Arc<dyn SampleRepository> = Arc::new(PgSampleRepository::new(db_pool.clone()));
    let steps: Arc<dyn StepRepository> = Arc::new(PgStepRepository::new(db_pool.clone()));
    let workflow: Arc<dyn WorkflowRepository> = Arc::new(PgWorkflowRepository::new(db_pool.clone()));
    let submissions: Arc<dyn SubmissionRepository> = Arc::new(PgSubmissionRepository::new(db_pool));
    let registry: Arc<dyn LeaseRegistry> = Arc::new(StepRegistry::new(redis_pool));
    let queues = Arc::new(PriorityQueues::new());

    let aggregator = Arc::new(SubmissionAggregator::new(submissions, samples.clone()));
    let aggregator_events = events.subscribe().await?;
    let aggregator_samples = samples.clone();
    let aggregator_handle = tokio::spawn(run_aggregator(aggregator, aggregator_samples, aggregator_events));

    let orchestrator = Arc::new(Orchestrator::new(
        samples.clone(),
        steps.clone(),
        workflow,
        registry.clone(),
        events,
        queues.clone(),
    ));

    let dispatch: Arc<dyn Dispatch> = Arc::new(WorkerDispatch {
        holder,
        samples: samples.clone(),
        steps: steps.clone(),
        registry,
        orchestrator,
        config: engine_config,
    });

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let scheduler_handles = spawn_scheduler_tasks(queues.clone(), dispatch, engine_config, shutdown_rx.clone());

    let reconciler = Arc::new(Reconciler::new(samples, steps, queues));
    let reconciler_handle = tokio::spawn(reconciler.run(engine_config.reconcile_interval, shutdown_rx));

    tracing::info!("nanopore-worker started");
    shutdown_signal().await;
    aggregator_handle.abort();
    tracing::info!("shutdown requested, draining in-flight steps");
    let _ = shutdown_tx.send(true);

    let grace = engine_config.shutdown_grace_period;
    for handle in scheduler_handles {
        let _ = tokio::time::timeout(grace, handle).await;
    }
    let _ = tokio::time::timeout(grace, reconciler_handle).await;

    Ok(())
}

/// Drives the Submission Aggregator off the event bus: every
/// `sample.status_changed` triggers a (possibly coalesced) recompute, and a
/// coalesced event schedules a trailing recompute so the submission's
/// `samples_completed`/`status` never settles on a stale value (spec.md
/// §4.8).
async fn run_aggregator(
    aggregator: Arc<SubmissionAggregator>,
    samples: Arc<dyn SampleRepository>,
    mut events: tokio::sync::broadcast::Receiver<WorkflowEvent>,
) {
    const TRAILING_DELAY: std::time::Duration = std::time::Duration::from_millis(1100);

    loop {
        let event = match events.recv().await {
            Ok(event) => event,
            Err(tokio::sync::broadcast::error::RecvError::Lagged(skipped)) => {
                tracing::warn!(skipped, "aggregator event receiver lagged");
                continue;
            }
            Err(tokio::sync::broadcast::error::RecvError::Closed) => break,
        };

        let WorkflowEvent::SampleStatusChanged { sample_id, .. } = event else {
            continue;
        };

        let submission_id = match samples.get_sample(&sample_id).await {
            Ok(Some(sample)) => sample.submission_id,
            Ok(None) => continue,
            Err(err) => {
                tracing::warn!(%sample_id, %err, "aggregator could not load sample");
                continue;
            }
        };

        match aggregator.handle_sample_status_changed(&submission_id).await {
            Ok(Some(_)) => {}
            Ok(None) => {
                let aggregator = aggregator.clone();
                tokio::spawn(async move {
                    tokio::time::sleep(TRAILING_DELAY).await;
                    if let Err(err) = aggregator.recompute(&submission_id).await {
                        tracing::warn!(%submission_id, %err, "trailing aggregator recompute failed");
                    }
                });
            }
            Err(err) => tracing::warn!(%submission_id, %err, "aggregator recompute failed"),
        }
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c().await.expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }
}
