//! Workflow orchestration engine for the nanopore sample-tracking platform.
//!
//! Ties together the Dependency Resolver (`dependency`), the Priority
//! Queues (`queue`), the Orchestrator's event handlers (`orchestrator`),
//! the scheduling loop (`scheduler`), the crash-recovery reconciler
//! (`reconciler`) and the Submission Aggregator (`aggregator`) over the
//! `nanopore-db` / `nanopore-registry` / `nanopore-events` collaborators.

pub mod aggregator;
pub mod config;
pub mod dependency;
pub mod error;
pub mod orchestrator;
pub mod queue;
pub mod reconciler;
pub mod scheduler;

pub use aggregator::{AggregatorError, SubmissionAggregator};
pub use config::EngineConfig;
pub use dependency::DependencyGraph;
pub use error::OrchestrationError;
pub use orchestrator::Orchestrator;
pub use queue::{PriorityQueues, QueueKey};
pub use reconciler::Reconciler;
pub use scheduler::{spawn_scheduler_tasks, Dispatch};
