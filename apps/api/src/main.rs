//! Nanopore API server entry point.
//!
//! This binary and `apps/worker` both build the full engine (Orchestrator,
//! Priority Queues, Scheduler, Reconciler) against the same database, Redis
//! and event bus. `apps/api` additionally serves the HTTP surface of
//! spec.md §6; it is not a thin client of `apps/worker`.

use std::sync::Arc;

use anyhow::Result;
use axum::Router;
use tokio::signal;
use tokio::sync::watch;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;
use uuid::Uuid;

use nanopore_api::{routes, AppState, ApiDoc};
use nanopore_db::{
    create_pool, DatabaseConfig, PgSampleRepository, PgStepRepository, PgSubmissionRepository,
    PgWorkflowRepository, SampleRepository, StepRepository, SubmissionRepository, WorkflowRepository,
};
use nanopore_events::{create_nats_client, EventBus, JetStreamEventBus, NatsConfig};
use nanopore_registry::{create_redis_pool, LeaseRegistry, RedisConfig, StepRegistry};
use nanopore_workflow_engine::{spawn_scheduler_tasks, Dispatch, Orchestrator, PriorityQueues, Reconciler};

/// The HTTP process dispatches dequeued steps to `apps/worker` instances
/// purely by leaving them in the queue/database for a worker to pick up; it
/// never runs a `StageWorker` itself. This no-op `Dispatch` exists only so
/// `apps/api` can run the scheduler loop (which drives queue depth metrics
/// and periodic reconciliation) without duplicating worker logic.
struct NoopDispatch;

#[async_trait::async_trait]
impl Dispatch for NoopDispatch {
    async fn dispatch(&self, _stage: nanopore_domain::WorkflowStage, _step_id: nanopore_domain::StepId) {}
}

#[tokio::main]
async fn main() -> Result<()> {
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

    let nats_config = NatsConfig {
        url: settings.connections.event_bus_url.clone(),
        consumer_name: format!("nanopore-api-{}", Uuid::new_v4()),
        ..Default::default()
    };
    let nats_client = create_nats_client(&nats_config).await?;
    let events: Arc<dyn EventBus> = Arc::new(JetStreamEventBus::connect(nats_client, &nats_config).await?);

    let submissions: Arc<dyn SubmissionRepository> = Arc::new(PgSubmissionRepository::new(db_pool.clone()));
    let samples: Arc<dyn SampleRepository> = Arc::new(PgSampleRepository::new(db_pool.clone()));
    let steps: Arc<dyn StepRepository> = Arc::new(PgStepRepository::new(db_pool.clone()));
    let workflow: Arc<dyn WorkflowRepository> = Arc::new(PgWorkflowRepository::new(db_pool.clone()));
    let registry: Arc<dyn LeaseRegistry> = Arc::new(StepRegistry::new(redis_pool));
    let queues = Arc::new(PriorityQueues::new());

    let orchestrator = Arc::new(Orchestrator::new(
        samples.clone(),
        steps.clone(),
        workflow,
        registry.clone(),
        events,
        queues.clone(),
    ));

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let scheduler_handles = spawn_scheduler_tasks(
        queues.clone(),
        Arc::new(NoopDispatch) as Arc<dyn Dispatch>,
        engine_config,
        shutdown_rx.clone(),
    );

    let reconciler = Arc::new(Reconciler::new(samples.clone(), steps.clone(), queues.clone()));
    let reconciler_handle = tokio::spawn(reconciler.run(engine_config.reconcile_interval, shutdown_rx));

    let state = AppState {
        orchestrator,
        submissions,
        samples,
        steps,
        registry,
        queues,
        engine_config,
    };

    let mut openapi = ApiDoc::openapi();
    openapi.paths = routes::openapi_paths();

    let app = Router::new()
        .merge(routes::api_routes())
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", openapi))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state);

    let listener = tokio::net::TcpListener::bind(&settings.connections.bind_addr).await?;
    tracing::info!(addr = %settings.connections.bind_addr, "nanopore-api listening");
    tracing::info!("Swagger UI available at /swagger-ui/");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    let _ = shutdown_tx.send(true);
    let grace = engine_config.shutdown_grace_period;
    for handle in scheduler_handles {
        let _ = tokio::time::timeout(grace, handle).await;
    }
    let _ = tokio::time::timeout(grace, reconciler_handle).await;

    Ok(())
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
