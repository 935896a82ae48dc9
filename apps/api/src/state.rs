//! Shared application state injected into every route handler.

use std::sync::Arc;

use nanopore_db::{SampleRepository, StepRepository, SubmissionRepository};
use nanopore_registry::LeaseRegistry;
use nanopore_workflow_engine::{EngineConfig, Orchestrator, PriorityQueues};

/// Everything a route handler needs: the Orchestrator for state-changing
/// actions, the raw repositories for read-only views the Orchestrator
/// doesn't itself expose, and the engine config for display purposes.
#[derive(Clone)]
pub struct AppState {
    pub orchestrator: Arc<Orchestrator>,
    pub submissions: Arc<dyn SubmissionRepository>,
    pub samples: Arc<dyn SampleRepository>,
    pub steps: Arc<dyn StepRepository>,
    pub registry: Arc<dyn LeaseRegistry>,
    pub queues: Arc<PriorityQueues>,
    pub engine_config: EngineConfig,
}
