//! Nanopore API - the External Interface Adapter (spec.md §4.9): HTTP
//! endpoints for queue/workflow status, pause/resume/retry/priority, and
//! submission intake.

pub mod error;
pub mod openapi;
pub mod routes;
pub mod state;

pub use error::ApiError;
pub use openapi::ApiDoc;
pub use state::AppState;
