//! OpenAPI specification generation
//!
//! Configures the OpenAPI document for the Nanopore API.

use utoipa::OpenApi;

/// API documentation configuration
#[derive(OpenApi)]
#[openapi(
    info(
        title = "Nanopore Workflow Orchestration API",
        version = "1.0.0",
        description = "Tracks nanopore sequencing samples through the eight-stage processing workflow."
    ),
    servers(
        (url = "/api", description = "API")
    ),
    tags(
        (name = "health", description = "Liveness and dependency probes"),
        (name = "queue", description = "Priority queue inspection"),
        (name = "workflow", description = "Sample workflow status and control"),
        (name = "intake", description = "Submission ingest")
    )
)]
pub struct ApiDoc;
