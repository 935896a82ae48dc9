//! Static stage configuration table (spec.md §3 `StageConfig`, §4.4).
//!
//! The eight-stage pipeline is fixed: there is no workflow-definition
//! language to parse here (see DESIGN.md for why the teacher's YAML
//! workflow parser has no counterpart in this system). Each stage's
//! estimated duration, dependency set and QC-gate flag are compiled in.

use crate::enums::WorkflowStage;

/// Static, compiled-in configuration for one pipeline stage.
#[derive(Debug, Clone, Copy)]
pub struct StageConfig {
    pub stage: WorkflowStage,
    /// Reference estimated duration, in hours.
    pub estimated_duration_hours: f64,
    /// Stages that must be `completed` before this one may start.
    pub dependencies: &'static [WorkflowStage],
    /// Whether this stage's worker produces a QC pass/fail verdict.
    pub qc_gate: bool,
}

const SAMPLE_QC_DEPS: &[WorkflowStage] = &[];
const LIBRARY_PREP_DEPS: &[WorkflowStage] = &[WorkflowStage::SampleQc];
const LIBRARY_QC_DEPS: &[WorkflowStage] = &[WorkflowStage::LibraryPrep];
const SEQUENCING_SETUP_DEPS: &[WorkflowStage] = &[WorkflowStage::LibraryQc];
const SEQUENCING_RUN_DEPS: &[WorkflowStage] = &[WorkflowStage::SequencingSetup];
const BASECALLING_DEPS: &[WorkflowStage] = &[WorkflowStage::SequencingRun];
const QUALITY_ASSESSMENT_DEPS: &[WorkflowStage] = &[WorkflowStage::Basecalling];
const DATA_DELIVERY_DEPS: &[WorkflowStage] = &[WorkflowStage::QualityAssessment];

/// The canonical stage configuration table (spec.md §4.4's dependency
/// graph, plus the reference durations from the GLOSSARY).
pub const STAGE_CONFIGS: [StageConfig; 8] = [
    StageConfig {
        stage: WorkflowStage::SampleQc,
        estimated_duration_hours: 1.0,
        dependencies: SAMPLE_QC_DEPS,
        qc_gate: true,
    },
    StageConfig {
        stage: WorkflowStage::LibraryPrep,
        estimated_duration_hours: 4.0,
        dependencies: LIBRARY_PREP_DEPS,
        qc_gate: false,
    },
    StageConfig {
        stage: WorkflowStage::LibraryQc,
        estimated_duration_hours: 1.0,
        dependencies: LIBRARY_QC_DEPS,
        qc_gate: false,
    },
    StageConfig {
        stage: WorkflowStage::SequencingSetup,
        estimated_duration_hours: 1.0,
        dependencies: SEQUENCING_SETUP_DEPS,
        qc_gate: false,
    },
    StageConfig {
        stage: WorkflowStage::SequencingRun,
        estimated_duration_hours: 48.0,
        dependencies: SEQUENCING_RUN_DEPS,
        qc_gate: false,
    },
    StageConfig {
        stage: WorkflowStage::Basecalling,
        estimated_duration_hours: 2.0,
        dependencies: BASECALLING_DEPS,
        qc_gate: false,
    },
    StageConfig {
        stage: WorkflowStage::QualityAssessment,
        estimated_duration_hours: 1.0,
        dependencies: QUALITY_ASSESSMENT_DEPS,
        qc_gate: false,
    },
    StageConfig {
        stage: WorkflowStage::DataDelivery,
        estimated_duration_hours: 1.0,
        dependencies: DATA_DELIVERY_DEPS,
        qc_gate: false,
    },
];

/// Look up the static configuration for a stage.
#[must_use]
pub fn stage_config(stage: WorkflowStage) -> &'static StageConfig {
    STAGE_CONFIGS
        .iter()
        .find(|c| c.stage == stage)
        .expect("STAGE_CONFIGS covers all WorkflowStage variants")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_stage_has_exactly_one_config() {
        for stage in WorkflowStage::ALL {
            let matches = STAGE_CONFIGS.iter().filter(|c| c.stage == stage).count();
            assert_eq!(matches, 1, "stage {stage:?} should have exactly one config");
        }
    }

    #[test]
    fn sample_qc_has_no_dependencies() {
        assert!(stage_config(WorkflowStage::SampleQc).dependencies.is_empty());
    }

    #[test]
    fn data_delivery_depends_on_quality_assessment() {
        assert_eq!(
            stage_config(WorkflowStage::DataDelivery).dependencies,
            &[WorkflowStage::QualityAssessment]
        );
    }

    #[test]
    fn only_sample_qc_is_a_qc_gate() {
        for config in &STAGE_CONFIGS {
            assert_eq!(config.qc_gate, config.stage == WorkflowStage::SampleQc);
        }
    }
}
