//! API route definitions (spec.md §6 External Interfaces).

mod health;
mod ingest;
mod queue;
mod samples;
mod steps;
mod workflow;

use axum::{
    routing::{get, patch, post},
    Router,
};

use crate::state::AppState;

/// Build the API router with all routes, nested under `/api` to match
/// spec.md §6's paths exactly.
pub fn api_routes() -> Router<AppState> {
    Router::new().nest("/api", api_v1_routes())
}

fn api_v1_routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(health::health))
        .route("/queue", get(queue::list_queue))
        .route("/samples/{sample_id}/workflow", get(workflow::get_sample_workflow))
        .route("/samples/{sample_id}/pause", post(samples::pause_sample))
        .route("/samples/{sample_id}/resume", post(samples::resume_sample))
        .route("/samples/{sample_id}/priority", patch(samples::change_priority))
        .route("/steps/{step_id}/retry", post(steps::retry_step))
        .route("/workflow/status", get(workflow::get_workflow_status))
        .route("/submissions/ingest", post(ingest::ingest))
}

/// Collect paths from all route modules for the OpenAPI document.
pub fn openapi_paths() -> utoipa::openapi::Paths {
    use utoipa::OpenApi;

    #[derive(OpenApi)]
    #[openapi(paths(
        health::health,
        queue::list_queue,
        workflow::get_sample_workflow,
        workflow::get_workflow_status,
        samples::pause_sample,
        samples::resume_sample,
        samples::change_priority,
        steps::retry_step,
        ingest::ingest,
    ))]
    struct RoutePaths;

    RoutePaths::openapi().paths
}
