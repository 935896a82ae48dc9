//! Nanopore domain — core entities and types for the workflow orchestration engine.
//!
//! This crate contains the entities (`Submission`, `Sample`, `ProcessingStep`),
//! the static stage configuration table, and the shared enums/ids used
//! throughout the orchestrator, persistence, registry, and event bus crates.

pub mod enums;
pub mod ids;
pub mod qc;
pub mod sample;
pub mod stage_config;
pub mod step;
pub mod submission;

pub use enums::*;
pub use ids::*;
pub use qc::*;
pub use sample::*;
pub use stage_config::*;
pub use step::*;
pub use submission::*;
