//! Scheduling loop (spec.md §4.6): one task per stage, waking every
//! `reconcile_interval`, dispatching up to `max_in_flight_per_stage` via a
//! `tokio::sync::Semaphore`-bounded worker pool.
//!
//! The scheduler only dequeues and hands the step id off to a `Dispatch`
//! implementation (provided by `apps/worker`, which owns lease acquisition
//! and the actual `StageWorker::execute` call) — it never talks to the
//! database or the event bus directly.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Semaphore;
use tokio::task::JoinHandle;

use nanopore_domain::{StepId, WorkflowStage};

use crate::config::EngineConfig;
use crate::queue::PriorityQueues;

/// Hands a dequeued step id off for execution. Implemented by `apps/worker`;
/// an in-memory fake implements it for tests.
#[async_trait]
pub trait Dispatch: Send + Sync {
    async fn dispatch(&self, stage: WorkflowStage, step_id: StepId);
}

/// Spawn one scheduling task per stage. Returns the task handles so the
/// caller can await them during shutdown.
pub fn spawn_scheduler_tasks(
    queues: Arc<PriorityQueues>,
    dispatch: Arc<dyn Dispatch>,
    config: EngineConfig,
    shutdown: tokio::sync::watch::Receiver<bool>,
) -> Vec<JoinHandle<()>> {
    WorkflowStage::ALL
        .into_iter()
        .map(|stage| {
            let queues = queues.clone();
            let dispatch = dispatch.clone();
            let mut shutdown = shutdown.clone();
            let semaphore = Arc::new(Semaphore::new(config.max_in_flight_per_stage));
            let interval = config.reconcile_interval;

            tokio::spawn(async move {
                let mut ticker = tokio::time::interval(interval);
                loop {
                    tokio::select! {
                        _ = ticker.tick() => {
                            while let Ok(permit) = semaphore.clone().try_acquire_owned() {
                                let Some(step_id) = queues.dequeue(stage) else {
                                    drop(permit);
                                    break;
                                };
                                let dispatch = dispatch.clone();
                                tokio::spawn(async move {
                                    dispatch.dispatch(stage, step_id).await;
                                    drop(permit);
                                });
                            }
                        }
                        _ = shutdown.changed() => {
                            if *shutdown.borrow() {
                                break;
                            }
                        }
                    }
                }
            })
        })
        .collect()
}
