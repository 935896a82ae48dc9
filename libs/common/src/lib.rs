//! Common utilities shared across the nanopore workflow orchestration
//! platform's binaries: layered settings loading and telemetry setup.

pub mod config;
pub mod telemetry;

pub use config::Settings;
pub use telemetry::init_tracing;
