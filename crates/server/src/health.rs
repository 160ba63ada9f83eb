use axum::{extract::State, http::StatusCode, routing::get, Json, Router};
use chrono::Utc;
use orderlink_core::config::RelayMode;
use serde::Serialize;

#[derive(Clone)]
pub struct HealthState {
    service_name: String,
    mode: RelayMode,
}

impl HealthState {
    pub fn new(service_name: impl Into<String>, mode: RelayMode) -> Self {
        Self { service_name: service_name.into(), mode }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct HealthCheck {
    pub status: &'static str,
    pub detail: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub service: HealthCheck,
    pub executor: HealthCheck,
    pub checked_at: String,
}

pub fn router(state: HealthState) -> Router {
    Router::new().route("/health", get(health)).with_state(state)
}

pub async fn health(State(state): State<HealthState>) -> (StatusCode, Json<HealthResponse>) {
    let payload = HealthResponse {
        status: "ready",
        service: HealthCheck {
            status: "ready",
            detail: format!("{} relay runtime initialized", state.service_name),
        },
        executor: HealthCheck {
            status: "ready",
            detail: format!("executing tasks in {} mode", state.mode.as_str()),
        },
        checked_at: Utc::now().to_rfc3339(),
    };

    (StatusCode::OK, Json(payload))
}
