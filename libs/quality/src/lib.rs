//! Sample QC scoring (spec.md §4.3).

pub mod scoring;

pub use scoring::score_sample_qc;
