use axum::{extract::State, Json};

use crate::api::{HealthResponse, HealthState};
use crate::router;

/// Static liveness metadata. Deliberately independent of storage state: a
/// service in log-only mode still reports healthy.
pub async fn health(State(state): State<router::State>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: HealthState::Healthy,
        service: state.settings.service_name.clone(),
        version: env!("CARGO_PKG_VERSION").to_owned(),
    })
}
