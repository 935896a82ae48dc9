//! Static registry mapping each `WorkflowStage` to its `StageWorker`
//! (spec.md §4.3). `apps/worker` looks a worker up by the stage it just
//! dequeued a step for; there's exactly one worker per stage.

use std::collections::HashMap;
use std::sync::{Arc, OnceLock};

use nanopore_domain::WorkflowStage;

use crate::worker::StageWorker;
use crate::workers::{
    BasecallingWorker, DataDeliveryWorker, LibraryPrepWorker, LibraryQcWorker,
    QualityAssessmentWorker, SampleQcWorker, SequencingRunWorker, SequencingSetupWorker,
};

pub struct StageWorkerRegistry {
    workers: HashMap<WorkflowStage, Arc<dyn StageWorker>>,
}

impl StageWorkerRegistry {
    fn built_in() -> Self {
        let mut workers: HashMap<WorkflowStage, Arc<dyn StageWorker>> = HashMap::new();
        workers.insert(WorkflowStage::SampleQc, Arc::new(SampleQcWorker));
        workers.insert(WorkflowStage::LibraryPrep, Arc::new(LibraryPrepWorker));
        workers.insert(WorkflowStage::LibraryQc, Arc::new(LibraryQcWorker));
        workers.insert(WorkflowStage::SequencingSetup, Arc::new(SequencingSetupWorker));
        workers.insert(WorkflowStage::SequencingRun, Arc::new(SequencingRunWorker));
        workers.insert(WorkflowStage::Basecalling, Arc::new(BasecallingWorker));
        workers.insert(WorkflowStage::QualityAssessment, Arc::new(QualityAssessmentWorker));
        workers.insert(WorkflowStage::DataDelivery, Arc::new(DataDeliveryWorker));
        Self { workers }
    }

    /// The shared, process-wide registry of the eight built-in workers.
    pub fn get() -> &'static StageWorkerRegistry {
        static REGISTRY: OnceLock<StageWorkerRegistry> = OnceLock::new();
        REGISTRY.get_or_init(StageWorkerRegistry::built_in)
    }

    #[must_use]
    pub fn worker_for(&self, stage: WorkflowStage) -> Arc<dyn StageWorker> {
        self.workers
            .get(&stage)
            .cloned()
            .unwrap_or_else(|| panic!("no stage worker registered for {stage}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_stage_has_a_registered_worker() {
        let registry = StageWorkerRegistry::get();
        for stage in WorkflowStage::ALL {
            assert_eq!(registry.worker_for(stage).stage(), stage);
        }
    }
}
