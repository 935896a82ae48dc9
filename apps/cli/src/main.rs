//! Nanopore operator CLI.
//!
//! A thin administrative front door onto the same Orchestrator and
//! repositories `apps/api` and `apps/worker` use — for the handful of
//! actions an operator needs without going through HTTP (spec.md §6's
//! pause/resume/retry/priority surface, plus queue/status inspection).

use std::cmp::Reverse;
use std::sync::Arc;

use clap::{Parser, Subcommand};

use nanopore_db::{
    create_pool, DatabaseConfig, Pagination, PgSampleRepository, PgStepRepository,
    PgWorkflowRepository, SampleRepository, StepRepository, WorkflowRepository,
};
use nanopore_domain::{Priority, SampleId, StepId, WorkflowStage};
use nanopore_events::{EventBus, InMemoryEventBus};
use nanopore_registry::{create_redis_pool, LeaseRegistry, RedisConfig, StepRegistry};
use nanopore_workflow_engine::{Orchestrator, PriorityQueues};

#[derive(Parser)]
#[command(name = "nanopore-cli")]
#[command(about = "Nanopore workflow engine administration CLI")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Sample-level operator actions
    Sample {
        #[command(subcommand)]
        action: SampleCommands,
    },
    /// Step-level operator actions
    Step {
        #[command(subcommand)]
        action: StepCommands,
    },
    /// List pending steps across all stages, in priority order
    Queue,
    /// Print system-wide sample and queue status
    Status,
}

#[derive(Subcommand)]
enum SampleCommands {
    /// Pause a sample: drain its pending steps, roll back any in-progress one
    Pause { sample_id: String },
    /// Resume a paused sample: re-enqueue its first ready step
    Resume { sample_id: String },
    /// Change a sample's priority
    SetPriority {
        sample_id: String,
        #[arg(value_enum)]
        priority: PriorityArg,
    },
}

#[derive(Subcommand)]
enum StepCommands {
    /// Retry a failed step: failed -> pending, re-enqueued if ready
    Retry { step_id: String },
}

#[derive(Clone, clap::ValueEnum)]
enum PriorityArg {
    Low,
    Normal,
    High,
    Urgent,
}

impl From<PriorityArg> for Priority {
    fn from(value: PriorityArg) -> Self {
        match value {
            PriorityArg::Low => Priority::Low,
            PriorityArg::Normal => Priority::Normal,
            PriorityArg::High => Priority::High,
            PriorityArg::Urgent => Priority::Urgent,
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    nanopore_common::init_tracing();
    let cli = Cli::parse();
    let settings = nanopore_common::Settings::load()?;

    let db_pool = create_pool(&DatabaseConfig {
        url: settings.connections.database_url.clone(),
        ..Default::default()
    })
    .await?;
    let redis_pool = create_redis_pool(&RedisConfig {
        url: settings.connections.step_registry_url.clone(),
        ..Default::default()
    })?;

    let samples: Arc<dyn SampleRepository> = Arc::new(PgSampleRepository::new(db_pool.clone()));
    let steps: Arc<dyn StepRepository> = Arc::new(PgStepRepository::new(db_pool.clone()));
    let workflow: Arc<dyn WorkflowRepository> = Arc::new(PgWorkflowRepository::new(db_pool.clone()));
    let registry: Arc<dyn LeaseRegistry> = Arc::new(StepRegistry::new(redis_pool));
    let events: Arc<dyn EventBus> = Arc::new(InMemoryEventBus::new(256));
    let queues = Arc::new(PriorityQueues::new());

    let orchestrator =
        Orchestrator::new(samples.clone(), steps.clone(), workflow, registry, events, queues.clone());

    match cli.command {
        Commands::Sample { action } => match action {
            SampleCommands::Pause { sample_id } => {
                let id: SampleId = sample_id.parse()?;
                orchestrator.pause_sample(&id).await?;
                println!("sample {id} paused");
            }
            SampleCommands::Resume { sample_id } => {
                let id: SampleId = sample_id.parse()?;
                orchestrator.resume_sample(&id).await?;
                println!("sample {id} resumed");
            }
            SampleCommands::SetPriority { sample_id, priority } => {
                let id: SampleId = sample_id.parse()?;
                orchestrator.handle_priority_changed(&id, priority.into()).await?;
                println!("sample {id} priority updated");
            }
        },
        Commands::Step { action } => match action {
            StepCommands::Retry { step_id } => {
                let id: StepId = step_id.parse()?;
                orchestrator.retry_step(&id).await?;
                println!("step {id} queued for retry");
            }
        },
        Commands::Queue => print_queue(&samples, &steps).await?,
        Commands::Status => print_status(&samples, &steps, &queues).await?,
    }

    Ok(())
}

async fn print_queue(
    samples: &Arc<dyn SampleRepository>,
    steps: &Arc<dyn StepRepository>,
) -> anyhow::Result<()> {
    let mut rows = Vec::new();
    for stage in WorkflowStage::ALL {
        let page = steps.get_pending_steps(stage, Pagination::with_limit(100)).await?;
        for step in page.items {
            let Some(sample) = samples.get_sample(&step.sample_id).await? else {
                continue;
            };
            rows.push((sample.priority, sample.created_at, sample.sample_number, stage, step.step_id));
        }
    }
    rows.sort_by_key(|(priority, submission_date, sample_number, ..)| {
        (Reverse(*priority), *submission_date, *sample_number)
    });

    println!("{:<40} {:<20} {:<10} priority", "step_id", "stage", "sample #");
    for (priority, _, sample_number, stage, step_id) in rows {
        println!("{step_id:<40} {stage:<20} {sample_number:<10} {priority:?}");
    }
    Ok(())
}

async fn print_status(
    samples: &Arc<dyn SampleRepository>,
    steps: &Arc<dyn StepRepository>,
    queues: &Arc<PriorityQueues>,
) -> anyhow::Result<()> {
    let counts = samples.system_status_counts().await?;
    let failed_steps = steps.count_failed_steps().await?;

    println!("total samples:     {}", counts.total);
    println!("active samples:    {}", counts.active);
    println!("completed samples: {}", counts.completed);
    println!("failed steps:      {failed_steps}");
    println!("queue lengths:");
    for stage in WorkflowStage::ALL {
        println!("  {:<20} {}", stage.as_str(), queues.len(stage));
    }
    Ok(())
}
