//! Dependency Resolver (spec.md §4.4).
//!
//! The eight-stage DAG is built once from `nanopore_domain::STAGE_CONFIGS`
//! with `petgraph::DiGraph`, so readiness checks are graph traversals rather
//! than hand-rolled match arms, and the table's acyclicity is asserted at
//! construction time instead of assumed.

use std::collections::HashMap;
use std::sync::OnceLock;

use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::algo::is_cyclic_directed;
use petgraph::Direction;

use nanopore_domain::{stage_config, ProcessingStep, StepStatus, WorkflowStage, STAGE_CONFIGS};

/// The compiled-in stage dependency graph. An edge `a -> b` means `a` must
/// complete before `b` can start.
pub struct DependencyGraph {
    graph: DiGraph<WorkflowStage, ()>,
    nodes: HashMap<WorkflowStage, NodeIndex>,
}

impl DependencyGraph {
    fn build() -> Self {
        let mut graph = DiGraph::new();
        let mut nodes = HashMap::new();

        for config in &STAGE_CONFIGS {
            nodes.insert(config.stage, graph.add_node(config.stage));
        }

        for config in &STAGE_CONFIGS {
            let to = nodes[&config.stage];
            for &dep in config.dependencies {
                let from = nodes[&dep];
                graph.add_edge(from, to, ());
            }
        }

        assert!(
            !is_cyclic_directed(&graph),
            "stage dependency graph in nanopore_domain::STAGE_CONFIGS must be acyclic"
        );

        Self { graph, nodes }
    }

    /// The shared, lazily-built instance — the graph never changes at
    /// runtime since the pipeline is fixed.
    pub fn get() -> &'static Self {
        static GRAPH: OnceLock<DependencyGraph> = OnceLock::new();
        GRAPH.get_or_init(Self::build)
    }

    /// The stages that must complete before `stage` may start.
    #[must_use]
    pub fn dependencies_of(&self, stage: WorkflowStage) -> Vec<WorkflowStage> {
        let node = self.nodes[&stage];
        self.graph
            .neighbors_directed(node, Direction::Incoming)
            .map(|n| self.graph[n])
            .collect()
    }

    /// The stages that cannot start until `stage` completes.
    #[must_use]
    pub fn dependents_of(&self, stage: WorkflowStage) -> Vec<WorkflowStage> {
        let node = self.nodes[&stage];
        self.graph
            .neighbors_directed(node, Direction::Outgoing)
            .map(|n| self.graph[n])
            .collect()
    }

    /// `ready(step)` per spec.md §4.4: the step is `pending` and every
    /// dependency stage's step for the same sample is `completed`.
    #[must_use]
    pub fn is_ready(&self, step: &ProcessingStep, sample_steps: &[ProcessingStep]) -> bool {
        if step.step_status != StepStatus::Pending {
            return false;
        }

        stage_config(step.step_name).dependencies.iter().all(|&dep| {
            sample_steps
                .iter()
                .any(|s| s.step_name == dep && s.step_status == StepStatus::Completed)
        })
    }

    /// Stages newly made ready by `completed_stage` finishing, i.e. the
    /// stepwise advancement spec.md §9 prescribes: only the immediate next
    /// stage, and only if every one of *its* other dependencies (there are
    /// none, in this linear pipeline) is also satisfied.
    #[must_use]
    pub fn newly_ready_after(
        &self,
        completed_stage: WorkflowStage,
        sample_steps: &[ProcessingStep],
    ) -> Vec<WorkflowStage> {
        self.dependents_of(completed_stage)
            .into_iter()
            .filter(|&candidate| {
                sample_steps
                    .iter()
                    .find(|s| s.step_name == candidate)
                    .is_some_and(|step| self.is_ready(step, sample_steps))
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nanopore_domain::{SampleId, StepId};

    fn step(stage: WorkflowStage, status: StepStatus) -> ProcessingStep {
        ProcessingStep {
            step_id: StepId::new(),
            sample_id: SampleId::new(),
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

    #[test]
    fn sample_qc_has_no_dependencies() {
        let graph = DependencyGraph::get();
        assert!(graph.dependencies_of(WorkflowStage::SampleQc).is_empty());
    }

    #[test]
    fn library_prep_depends_on_sample_qc() {
        let graph = DependencyGraph::get();
        assert_eq!(
            graph.dependencies_of(WorkflowStage::LibraryPrep),
            vec![WorkflowStage::SampleQc]
        );
    }

    #[test]
    fn ready_requires_all_deps_completed() {
        let graph = DependencyGraph::get();
        let all_pending: Vec<ProcessingStep> = WorkflowStage::ALL
            .into_iter()
            .map(|s| step(s, StepStatus::Pending))
            .collect();

        assert!(graph.is_ready(&all_pending[0], &all_pending)); // SampleQc, no deps
        assert!(!graph.is_ready(&all_pending[1], &all_pending)); // LibraryPrep, dep pending
    }

    #[test]
    fn newly_ready_after_is_stepwise_only() {
        let graph = DependencyGraph::get();
        let mut steps: Vec<ProcessingStep> = WorkflowStage::ALL
            .into_iter()
            .map(|s| step(s, StepStatus::Pending))
            .collect();
        steps[0].step_status = StepStatus::Completed; // SampleQc done

        let ready = graph.newly_ready_after(WorkflowStage::SampleQc, &steps);
        assert_eq!(ready, vec![WorkflowStage::LibraryPrep]);
    }

    #[test]
    fn data_delivery_has_no_dependents() {
        let graph = DependencyGraph::get();
        assert!(graph.dependents_of(WorkflowStage::DataDelivery).is_empty());
    }
}
