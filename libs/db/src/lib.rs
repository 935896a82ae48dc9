//! Persistence adapter for the workflow orchestration engine.
//!
//! Wraps a `sqlx::PgPool` and exposes one repository trait per aggregate
//! (`SubmissionRepository`, `SampleRepository`, `StepRepository`). Postgres
//! is the system of record: every write here is immediately consistent,
//! unlike the best-effort cache in `nanopore-registry`.

pub mod pagination;
pub mod pool;
pub mod repo;
pub mod retry;

pub use pagination::{Page, Pagination};
pub use pool::*;
pub use repo::*;
