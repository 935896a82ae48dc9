//! Liveness and dependency probes (spec.md §6 `GET /api/health`).

use axum::{extract::State, http::StatusCode};
use serde::Serialize;
use utoipa::ToSchema;

use nanopore_db::SampleRepository;
use nanopore_registry::LeaseRegistry;

use crate::error::SuccessEnvelope;
use crate::state::AppState;

#[derive(Debug, Serialize, ToSchema)]
pub struct HealthResponse {
    pub status: String,
    pub database: String,
    pub step_registry: String,
}

/// Probes Postgres and Redis directly rather than trusting cached state, so
/// a caller sees the same view an operator's dashboard would.
#[utoipa::path(
    get,
    path = "/health",
    tag = "health",
    responses(
        (status = 200, description = "All dependencies reachable", body = HealthResponse),
        (status = 503, description = "A dependency is unreachable", body = HealthResponse)
    )
)]
pub async fn health(State(state): State<AppState>) -> (StatusCode, SuccessEnvelope<HealthResponse>) {
    let database = state.samples.system_status_counts().await.is_ok();
    let step_registry = state.registry.get_lease_holder(&nanopore_domain::StepId::new()).await.is_ok();

    let status = if database && step_registry { "ok" } else { "degraded" };
    let code = if database && step_registry {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    let body = HealthResponse {
        status: status.to_string(),
        database: if database { "up".into() } else { "down".into() },
        step_registry: if step_registry { "up".into() } else { "down".into() },
    };

    (code, SuccessEnvelope::new(body))
}
