//! The eight built-in stage workers (spec.md §4.3).

mod placeholders;
mod sample_qc;

pub use placeholders::{
    BasecallingWorker, DataDeliveryWorker, LibraryPrepWorker, LibraryQcWorker,
    QualityAssessmentWorker, SequencingRunWorker, SequencingSetupWorker,
};
pub use sample_qc::SampleQcWorker;
