//! Stage worker contract and built-in implementations (spec.md §4.3).
//!
//! `apps/worker` dequeues a step id from a stage's priority queue, acquires
//! its lease from `nanopore-registry`, loads the sample and step from
//! `nanopore-db`, then looks the stage's [`StageWorker`] up in
//! [`StageWorkerRegistry`] and calls `execute`. The `wasm` module is an
//! extension point for out-of-process workers and is not wired into that
//! default dispatch path.

pub mod registry;
pub mod wasm;
pub mod worker;
pub mod workers;

pub use registry::StageWorkerRegistry;
pub use worker::{StageWorker, WorkerOutcome};
